//! Game data: entity class definitions loaded from TOML files.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{GameDataProvider, ProviderResult};

/// Whether an entity class is placed as a point or tied to brushes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    #[default]
    Point,
    Solid,
}

/// A key an entity of this class may carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub description: String,
}

/// Definition of an entity class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityClass {
    pub name: String,
    #[serde(default)]
    pub kind: ClassKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
}

/// Entity definitions of the game being mapped.
///
/// An empty `GameData` is a valid configuration: the editor falls back to
/// it when the configured files cannot be read.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameData {
    #[serde(default, rename = "class")]
    pub classes: Vec<EntityClass>,
}

impl GameData {
    /// Case-insensitive class lookup.
    pub fn class(&self, name: &str) -> Option<&EntityClass> {
        self.classes.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Add the classes of `other`; later definitions replace earlier ones.
    pub fn merge(&mut self, other: GameData) {
        for class in other.classes {
            match self.classes.iter_mut().find(|c| c.name.eq_ignore_ascii_case(&class.name)) {
                Some(existing) => *existing = class,
                None => self.classes.push(class),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Reads `[[class]]` tables from TOML files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlGameDataProvider;

impl GameDataProvider for TomlGameDataProvider {
    fn load(&self, files: &[PathBuf]) -> ProviderResult<GameData> {
        let mut data = GameData::default();
        for path in files {
            let content = fs::read_to_string(path)?;
            let file: GameData = toml::from_str(&content)?;
            log::debug!("Loaded {} entity classes from {:?}", file.classes.len(), path);
            data.merge(file);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;

    const BASE: &str = r#"
[[class]]
name = "light"
description = "Point light"

[[class.properties]]
name = "_light"
default = "255 255 255 200"

[[class]]
name = "func_door"
kind = "solid"
"#;

    #[test]
    fn test_load_and_merge() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.toml");
        let overrides = dir.path().join("mod.toml");
        fs::write(&base, BASE).unwrap();
        fs::write(&overrides, "[[class]]\nname = \"LIGHT\"\ndescription = \"Patched\"\n").unwrap();

        let data = TomlGameDataProvider.load(&[base, overrides]).unwrap();
        assert_eq!(data.classes.len(), 2);
        assert_eq!(data.class("light").unwrap().description, "Patched");
        assert_eq!(data.class("func_door").unwrap().kind, ClassKind::Solid);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[[class]\nname = ").unwrap();

        let err = TomlGameDataProvider.load(&[path]).unwrap_err();
        assert!(matches!(err, ProviderError::TomlParse(_)));
    }
}
