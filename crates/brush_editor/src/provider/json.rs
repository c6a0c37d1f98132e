//! Reference map provider storing the object tree as JSON.

use std::fs;
use std::path::Path;

use brush_map::{MapTree, ObjectKind, ObjectSnapshot, Subtree};
use serde::{Deserialize, Serialize};

use super::{MapProvider, ProviderError, ProviderResult};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct MapFile {
    version: u32,
    root: ObjectSnapshot,
}

/// Saves the whole tree, keeping IDs, child order, variants and data.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMapProvider {
    pub pretty: bool,
}

impl JsonMapProvider {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn to_json(&self, map: &MapTree) -> ProviderResult<String> {
        let file = MapFile {
            version: FORMAT_VERSION,
            root: map.clone_object(map.root())?,
        };
        let json = if self.pretty {
            serde_json::to_string_pretty(&file)?
        } else {
            serde_json::to_string(&file)?
        };
        Ok(json)
    }

    pub fn from_json(&self, content: &str) -> ProviderResult<MapTree> {
        let file: MapFile = serde_json::from_str(content)?;
        if file.version != FORMAT_VERSION {
            return Err(ProviderError::Format(format!(
                "unsupported map version {}, expected {FORMAT_VERSION}",
                file.version
            )));
        }
        if file.root.kind() != ObjectKind::Root {
            return Err(ProviderError::Format(format!(
                "top-level object is a {}, expected Root",
                file.root.kind()
            )));
        }

        let ObjectSnapshot { id, data, children, .. } = file.root;
        let mut map = MapTree::with_root(id);
        *map.object_mut(id)?.data_mut() = data;
        for child in children {
            map.restore_subtree(id, None, Subtree::from(child))?;
        }
        map.validate().map_err(brush_map::MapError::from)?;
        map.take_changes();
        Ok(map)
    }
}

impl MapProvider for JsonMapProvider {
    fn extensions(&self) -> &[&str] {
        &["json", "bwm"]
    }

    fn save(&self, map: &MapTree, path: &Path) -> ProviderResult<()> {
        let content = self.to_json(map)?;
        fs::write(path, content)?;
        log::info!("Saved map to {:?}", path);
        Ok(())
    }

    fn load(&self, path: &Path) -> ProviderResult<MapTree> {
        let content = fs::read_to_string(path)?;
        let map = self.from_json(&content)?;
        log::info!("Loaded map from {:?} ({} objects)", path, map.object_count());
        Ok(map)
    }
}
