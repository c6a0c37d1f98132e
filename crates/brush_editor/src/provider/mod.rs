//! Persistence boundary.
//!
//! The document hands its map to a [`MapProvider`] to save or load it and
//! asks a [`GameDataProvider`] for the entity class definitions of the game
//! being mapped. The formats themselves belong to the providers.

mod game_data;
mod json;

pub use game_data::{ClassKind, EntityClass, GameData, PropertyDef, TomlGameDataProvider};
pub use json::JsonMapProvider;

use std::path::{Path, PathBuf};

use brush_map::{MapError, MapTree};
use thiserror::Error;

/// Errors raised by providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("invalid map: {0}")]
    InvalidMap(#[from] MapError),

    #[error("unsupported format: {0}")]
    Format(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Reads and writes map files.
pub trait MapProvider {
    /// File extensions this provider handles, without the dot.
    fn extensions(&self) -> &[&str];

    fn save(&self, map: &MapTree, path: &Path) -> ProviderResult<()>;

    fn load(&self, path: &Path) -> ProviderResult<MapTree>;

    fn can_handle(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions().iter().any(|x| x.eq_ignore_ascii_case(e)))
    }
}

/// Loads the entity definitions of a game configuration.
pub trait GameDataProvider {
    fn load(&self, files: &[PathBuf]) -> ProviderResult<GameData>;
}
