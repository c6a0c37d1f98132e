//! The map document: a map, its undo history and its game data.
//!
//! [`MapDocument::perform`] is the one sanctioned way to change the map.
//! Operations receive only the tree, so an operation cannot dispatch
//! another top-level operation while it runs; composites nest through
//! [`Transaction`](crate::operations::Transaction) instead.

use std::path::{Path, PathBuf};

use brush_map::{MapTree, ObjectId};
use crossbeam_channel::Receiver;

use super::events::{DocumentEvent, EventBus};
use super::history::{HistoryEntry, HistoryManager};
use super::preferences::EditorPreferences;
use super::selection::Selection;
use crate::error::{EditorError, EditorResult};
use crate::operations::{error_chain, Operation};
use crate::provider::{GameData, GameDataProvider, MapProvider};

/// An open map.
pub struct MapDocument {
    map: MapTree,
    history: HistoryManager,
    game_data: GameData,
    path: Option<PathBuf>,
    grid_spacing: f32,
    events: EventBus<DocumentEvent>,
}

impl MapDocument {
    /// An empty, unsaved map.
    pub fn new(preferences: &EditorPreferences) -> Self {
        Self::from_map(MapTree::new(), GameData::default(), preferences)
    }

    pub fn from_map(map: MapTree, game_data: GameData, preferences: &EditorPreferences) -> Self {
        Self {
            map,
            history: HistoryManager::with_limit(preferences.history_limit),
            game_data,
            path: None,
            grid_spacing: preferences.grid_spacing,
            events: EventBus::new(),
        }
    }

    /// Load a map from disk.
    ///
    /// A map provider failure aborts the load. Game data that cannot be
    /// loaded is replaced by an empty definition set so the map still opens.
    pub fn open(
        path: &Path,
        map_provider: &dyn MapProvider,
        game_data_provider: &dyn GameDataProvider,
        preferences: &EditorPreferences,
    ) -> EditorResult<Self> {
        let map = map_provider.load(path).map_err(|e| {
            log::error!("Failed to open {:?}: {}", path, error_chain(&e));
            EditorError::Provider(e)
        })?;

        let game_data = match game_data_provider.load(&preferences.game_data_files) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Game data could not be loaded, using an empty set: {}", error_chain(&e));
                GameData::default()
            }
        };

        let mut doc = Self::from_map(map, game_data, preferences);
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Perform `operation` and record it under `name`.
    ///
    /// On failure nothing is recorded and the error, with its causes, is
    /// logged and returned. Operations restore the map before reporting a
    /// failure, so the document stays usable.
    pub fn perform(&mut self, name: impl Into<String>, operation: impl Operation + 'static) -> EditorResult<()> {
        self.perform_boxed(name, Box::new(operation))
    }

    pub fn perform_boxed(&mut self, name: impl Into<String>, mut operation: Box<dyn Operation>) -> EditorResult<()> {
        let name = name.into();
        if let Err(e) = operation.perform(&mut self.map) {
            log::error!("{} failed: {}", name, error_chain(&e));
            return Err(e.into());
        }

        log::info!("{}", name);
        let changed = self.map.take_changes();
        self.history.add_history_item(HistoryEntry::new(name.clone(), operation));
        self.events.publish(DocumentEvent::Performed { name, changed });
        Ok(())
    }

    /// Undo the last entry. Returns its name.
    pub fn undo(&mut self) -> EditorResult<String> {
        let name = self.history.undo(&mut self.map).map_err(|e| {
            log::error!("Undo failed: {}", error_chain(&e));
            e
        })?;
        let name = name.to_string();
        log::info!("Undo: {}", name);
        let changed = self.map.take_changes();
        self.events.publish(DocumentEvent::Undone {
            name: name.clone(),
            changed,
        });
        Ok(name)
    }

    /// Redo the last undone entry. Returns its name.
    pub fn redo(&mut self) -> EditorResult<String> {
        let name = self.history.redo(&mut self.map).map_err(|e| {
            log::error!("Redo failed: {}", error_chain(&e));
            e
        })?;
        let name = name.to_string();
        log::info!("Redo: {}", name);
        let changed = self.map.take_changes();
        self.events.publish(DocumentEvent::Redone {
            name: name.clone(),
            changed,
        });
        Ok(name)
    }

    /// Group the following performs into one history entry.
    pub fn begin_transaction(&mut self, name: impl Into<String>) -> EditorResult<()> {
        Ok(self.history.begin_transaction(name)?)
    }

    pub fn commit_transaction(&mut self) -> EditorResult<bool> {
        Ok(self.history.commit_transaction()?)
    }

    /// Undo everything performed since `begin_transaction`.
    pub fn rollback_transaction(&mut self) -> EditorResult<()> {
        self.history.rollback_transaction(&mut self.map)?;
        let changed = self.map.take_changes();
        self.events.publish(DocumentEvent::Undone {
            name: "Rollback".to_string(),
            changed,
        });
        Ok(())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Save to the document's path.
    pub fn save(&mut self, provider: &dyn MapProvider) -> EditorResult<()> {
        let path = self.path.clone().ok_or(EditorError::NoFilePath)?;
        provider.save(&self.map, &path)?;
        self.history.checkpoint();
        self.events.publish(DocumentEvent::Saved { path });
        Ok(())
    }

    pub fn save_as(&mut self, provider: &dyn MapProvider, path: impl Into<PathBuf>) -> EditorResult<()> {
        self.path = Some(path.into());
        self.save(provider)
    }

    /// Record a finished autosave.
    pub(crate) fn autosaved(&mut self, path: PathBuf) {
        self.history.checkpoint();
        self.events.publish(DocumentEvent::Autosaved { path });
    }

    /// Whether anything changed since the last save or autosave.
    pub fn is_modified(&self) -> bool {
        self.history.actions_since_checkpoint() > 0
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn map(&self) -> &MapTree {
        &self.map
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn game_data(&self) -> &GameData {
        &self.game_data
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    /// File name for window titles and logs.
    pub fn name(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string())
    }

    pub fn grid_spacing(&self) -> f32 {
        self.grid_spacing
    }

    pub fn set_grid_spacing(&mut self, spacing: f32) {
        self.grid_spacing = spacing.max(f32::EPSILON);
    }

    pub fn selection(&self) -> Selection {
        Selection::from_map(&self.map)
    }

    /// Snap a coordinate to the document grid.
    pub fn snap(&self, value: f32) -> f32 {
        (value / self.grid_spacing).round() * self.grid_spacing
    }

    pub fn subscribe(&mut self) -> Receiver<DocumentEvent> {
        self.events.subscribe()
    }

    /// Reserve an ID for an object an operation is about to attach.
    pub fn next_id(&mut self) -> ObjectId {
        self.map.next_id()
    }

    /// The IDs of every object reachable from the root, in tree order.
    pub fn all_objects(&self) -> Vec<ObjectId> {
        self.map.find_all().map(|o| o.id()).collect()
    }
}
