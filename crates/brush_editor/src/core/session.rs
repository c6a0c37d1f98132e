//! The editor session: open documents, the active one, and autosave timers.
//!
//! There is no global "current document" or scheduler. The shell owns one
//! `EditorSession` and passes it where it is needed; closing a document
//! drops its autosave deadline with it.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;

use super::autosave::{self, AutosaveError, AutosaveOutcome};
use super::document::MapDocument;
use super::events::{DocumentId, EventBus, SessionEvent};
use super::preferences::EditorPreferences;
use crate::error::{EditorError, EditorResult};
use crate::operations::error_chain;
use crate::provider::{GameDataProvider, MapProvider};

/// Recent files list with LRU behavior.
#[derive(Clone, Debug, Default)]
pub struct RecentFiles {
    files: VecDeque<PathBuf>,
    max_entries: usize,
}

impl RecentFiles {
    pub fn with_capacity(max: usize) -> Self {
        Self {
            files: VecDeque::new(),
            max_entries: max,
        }
    }

    pub fn add(&mut self, path: PathBuf) {
        self.files.retain(|p| p != &path);
        self.files.push_front(path);
        self.files.truncate(self.max_entries);
    }

    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

/// Explicitly passed editor context.
pub struct EditorSession {
    preferences: EditorPreferences,
    documents: BTreeMap<DocumentId, MapDocument>,
    autosave_due: HashMap<DocumentId, DateTime<Utc>>,
    active: Option<DocumentId>,
    next_id: u32,
    recent_files: RecentFiles,
    events: EventBus<SessionEvent>,
}

impl EditorSession {
    pub fn new(preferences: EditorPreferences) -> Self {
        Self {
            recent_files: RecentFiles::with_capacity(preferences.max_recent_files),
            preferences,
            documents: BTreeMap::new(),
            autosave_due: HashMap::new(),
            active: None,
            next_id: 1,
            events: EventBus::new(),
        }
    }

    pub fn preferences(&self) -> &EditorPreferences {
        &self.preferences
    }

    /// Replace the preferences and restart every autosave timer from `now`.
    pub fn set_preferences(&mut self, preferences: EditorPreferences, now: DateTime<Utc>) {
        self.preferences = preferences;
        self.autosave_due.clear();
        let ids: Vec<DocumentId> = self.documents.keys().copied().collect();
        for id in ids {
            self.schedule_autosave(id, now);
        }
    }

    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Take ownership of a document and make it active.
    pub fn add_document(&mut self, document: MapDocument, now: DateTime<Utc>) -> DocumentId {
        let id = DocumentId(self.next_id);
        self.next_id += 1;
        self.documents.insert(id, document);
        self.schedule_autosave(id, now);
        self.events.publish(SessionEvent::Opened(id));
        self.set_active(id);
        id
    }

    /// Open a map file as a new document.
    pub fn open_document(
        &mut self,
        path: &Path,
        map_provider: &dyn MapProvider,
        game_data_provider: &dyn GameDataProvider,
        now: DateTime<Utc>,
    ) -> EditorResult<DocumentId> {
        let document = MapDocument::open(path, map_provider, game_data_provider, &self.preferences)?;
        self.recent_files.add(path.to_path_buf());
        if let Some(dir) = path.parent() {
            self.preferences.last_map_directory = Some(dir.to_path_buf());
        }
        Ok(self.add_document(document, now))
    }

    /// Make `id` the active document.
    ///
    /// Subscribers are notified after the switch; they receive only the ID
    /// and cannot touch the map while an operation runs.
    pub fn activate(&mut self, id: DocumentId) -> EditorResult<()> {
        if !self.documents.contains_key(&id) {
            return Err(EditorError::DocumentNotFound(id));
        }
        if self.active != Some(id) {
            self.set_active(id);
        }
        Ok(())
    }

    fn set_active(&mut self, id: DocumentId) {
        self.active = Some(id);
        log::debug!("Activated {}", id);
        self.events.publish(SessionEvent::Activated(id));
    }

    /// Close a document, cancelling its autosave timer.
    pub fn close_document(&mut self, id: DocumentId) -> EditorResult<MapDocument> {
        let document = self.documents.remove(&id).ok_or(EditorError::DocumentNotFound(id))?;
        self.autosave_due.remove(&id);
        if document.is_modified() {
            log::warn!("Closing {} with unsaved changes", document.name());
        }
        self.events.publish(SessionEvent::Closed(id));

        if self.active == Some(id) {
            self.active = None;
            if let Some(&next) = self.documents.keys().next_back() {
                self.set_active(next);
            }
        }
        Ok(document)
    }

    pub fn active_id(&self) -> Option<DocumentId> {
        self.active
    }

    pub fn active(&self) -> Option<&MapDocument> {
        self.active.and_then(|id| self.documents.get(&id))
    }

    pub fn active_mut(&mut self) -> Option<&mut MapDocument> {
        self.active.and_then(|id| self.documents.get_mut(&id))
    }

    pub fn document(&self, id: DocumentId) -> Option<&MapDocument> {
        self.documents.get(&id)
    }

    pub fn document_mut(&mut self, id: DocumentId) -> Option<&mut MapDocument> {
        self.documents.get_mut(&id)
    }

    pub fn document_ids(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.documents.keys().copied()
    }

    pub fn recent_files(&self) -> &RecentFiles {
        &self.recent_files
    }

    /// When the next autosave of `id` is due, if one is scheduled.
    pub fn autosave_due(&self, id: DocumentId) -> Option<DateTime<Utc>> {
        self.autosave_due.get(&id).copied()
    }

    fn schedule_autosave(&mut self, id: DocumentId, now: DateTime<Utc>) {
        let settings = &self.preferences.autosave;
        if !settings.enabled {
            return;
        }
        self.autosave_due.insert(id, now + settings.interval());
    }

    /// Run every autosave that is due at `now` and schedule the next one.
    pub fn tick(
        &mut self,
        now: DateTime<Utc>,
        provider: &dyn MapProvider,
    ) -> Vec<(DocumentId, Result<AutosaveOutcome, AutosaveError>)> {
        let mut due: Vec<DocumentId> = self
            .autosave_due
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, _)| *id)
            .collect();
        due.sort();

        let mut results = Vec::with_capacity(due.len());
        for id in due {
            let Some(document) = self.documents.get_mut(&id) else {
                self.autosave_due.remove(&id);
                continue;
            };
            let result = autosave::run(document, provider, &self.preferences.autosave, now);
            if let Err(e) = &result {
                log::warn!("Autosave of {} failed: {}", document.name(), error_chain(e));
            }
            self.schedule_autosave(id, now);
            results.push((id, result));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::JsonMapProvider;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn prefs(interval_minutes: u32) -> EditorPreferences {
        let mut prefs = EditorPreferences::default();
        prefs.autosave.interval_minutes = interval_minutes;
        prefs.autosave.only_on_changed = false;
        prefs
    }

    #[test]
    fn test_recent_files_lru() {
        let mut recent = RecentFiles::with_capacity(2);
        recent.add(PathBuf::from("a"));
        recent.add(PathBuf::from("b"));
        recent.add(PathBuf::from("a"));
        recent.add(PathBuf::from("c"));

        let files: Vec<_> = recent.files().cloned().collect();
        assert_eq!(files, vec![PathBuf::from("c"), PathBuf::from("a")]);
    }

    #[test]
    fn test_activation_events() {
        let mut session = EditorSession::new(prefs(5));
        let events = session.subscribe();
        let a = session.add_document(MapDocument::new(&prefs(5)), t0());
        let b = session.add_document(MapDocument::new(&prefs(5)), t0());
        session.activate(a).unwrap();

        let seen: Vec<_> = events.try_iter().collect();
        assert_eq!(
            seen,
            vec![
                SessionEvent::Opened(a),
                SessionEvent::Activated(a),
                SessionEvent::Opened(b),
                SessionEvent::Activated(b),
                SessionEvent::Activated(a),
            ]
        );
        assert!(session.activate(DocumentId(99)).is_err());
    }

    #[test]
    fn test_close_cancels_timer_and_moves_focus() {
        let mut session = EditorSession::new(prefs(5));
        let a = session.add_document(MapDocument::new(&prefs(5)), t0());
        let b = session.add_document(MapDocument::new(&prefs(5)), t0());
        assert!(session.autosave_due(b).is_some());

        session.close_document(b).unwrap();
        assert!(session.autosave_due(b).is_none());
        assert_eq!(session.active_id(), Some(a));
        assert!(session.close_document(b).is_err());
    }

    #[test]
    fn test_tick_runs_due_autosaves_and_reschedules() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = EditorSession::new(prefs(0));
        let mut doc = MapDocument::new(session.preferences());
        doc.set_path(dir.path().join("arena.json"));
        let id = session.add_document(doc, t0());

        // Interval 0 is treated as one minute.
        assert_eq!(session.autosave_due(id), Some(t0() + Duration::minutes(1)));
        assert!(session.tick(t0(), &JsonMapProvider::new()).is_empty());

        let later = t0() + Duration::minutes(1);
        let results = session.tick(later, &JsonMapProvider::new());
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].1, Ok(AutosaveOutcome::Saved { .. })));
        assert_eq!(session.autosave_due(id), Some(later + Duration::minutes(1)));
    }
}
