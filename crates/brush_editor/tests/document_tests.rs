//! Integration tests for documents, history, commands and autosave.

use std::fs;

use brush_editor::commands::{default_registry, Command, SelectNone};
use brush_editor::core::autosave::{self, AutosaveOutcome};
use brush_editor::core::{AutosaveSettings, DocumentEvent, EditorPreferences, HistoryError, MapDocument};
use brush_editor::operations::{AddData, Detach, RemoveData, Reparent, Select, SetEntityOrigin, Transform};
use brush_editor::provider::{GameData, JsonMapProvider};
use brush_editor::EditorError;
use brush_map::glam::Vec3;
use brush_map::{DataKind, EntityData, MapTree, ObjectColor, ObjectId, Selected, Variant};
use chrono::{TimeZone, Utc};

/// Root -> [solid (1), entity (2)], both selected.
fn selected_pair() -> MapDocument {
    let mut map = MapTree::new();
    let root = map.root();
    let solid = map.new_object(Variant::Solid).with_data(Selected);
    map.insert(root, solid, None).unwrap();
    let entity = map
        .new_object(Variant::entity(Vec3::new(32.0, 0.0, 0.0)))
        .with_data(EntityData::new("info_player_start"))
        .with_data(Selected);
    map.insert(root, entity, None).unwrap();
    map.take_changes();
    MapDocument::from_map(map, GameData::default(), &EditorPreferences::default())
}

fn id(raw: u64) -> ObjectId {
    ObjectId::from_raw(raw)
}

// ============================================================================
// Select None
// ============================================================================

#[test]
fn select_none_clears_flags_and_undoes_exactly() {
    let mut doc = selected_pair();
    let events = doc.subscribe();
    assert!(doc.map().object(id(1)).unwrap().is_selected());
    assert!(doc.map().object(id(2)).unwrap().is_selected());
    let before = doc.map().clone();

    SelectNone.invoke(&mut doc).unwrap();

    assert!(!doc.map().object(id(1)).unwrap().is_selected());
    assert!(!doc.map().object(id(2)).unwrap().is_selected());
    assert_eq!(doc.history().len(), 1);
    assert_eq!(doc.history().entries()[0].name(), "Select None");
    match events.try_recv().unwrap() {
        DocumentEvent::Performed { name, changed } => {
            assert_eq!(name, "Select None");
            assert!(changed.contains(&id(1)));
            assert!(changed.contains(&id(2)));
        }
        other => panic!("unexpected event {other:?}"),
    }

    assert_eq!(doc.undo().unwrap(), "Select None");
    assert_eq!(doc.map(), &before);
}

#[test]
fn registry_invokes_by_id() {
    let mut doc = selected_pair();
    let registry = default_registry();

    registry.invoke("edit.select_none", &mut doc).unwrap();
    assert!(doc.selection().is_empty());
    registry.invoke("edit.undo", &mut doc).unwrap();
    assert_eq!(doc.selection().count(), 2);
    assert!(matches!(
        registry.invoke("edit.nonexistent", &mut doc),
        Err(EditorError::UnknownCommand(_))
    ));
}

// ============================================================================
// History
// ============================================================================

#[test]
fn undoing_everything_restores_the_map() {
    let mut doc = selected_pair();
    let before = doc.map().clone();

    doc.perform("Move", Transform::translate([id(1), id(2)], Vec3::new(16.0, 0.0, 0.0)))
        .unwrap();
    doc.perform("Move Entity", SetEntityOrigin::new(id(2), Vec3::ZERO)).unwrap();
    doc.perform("Color", AddData::new(id(1), ObjectColor { r: 255, g: 0, b: 0 }))
        .unwrap();
    doc.perform("Uncolor", RemoveData::kind(id(1), DataKind::Color)).unwrap();
    doc.perform("Parent", Reparent::new(id(1), [id(1)])).unwrap_err();
    doc.perform("Delete", Detach::new([id(2)])).unwrap();
    assert_eq!(doc.history().len(), 5);

    while doc.history().can_undo() {
        doc.undo().unwrap();
    }
    assert_eq!(doc.map(), &before);

    while doc.history().can_redo() {
        doc.redo().unwrap();
    }
    assert!(!doc.map().contains(id(2)));
}

#[test]
fn new_action_discards_redo_tail() {
    let mut doc = selected_pair();
    for _ in 0..3 {
        doc.perform("Select", Select::new([id(1)])).unwrap();
    }
    doc.undo().unwrap();
    doc.undo().unwrap();
    assert!(doc.history().can_redo());

    doc.perform("Delete", Detach::new([id(1)])).unwrap();
    assert_eq!(doc.history().len(), 2);
    assert!(matches!(
        doc.redo(),
        Err(EditorError::History(HistoryError::NothingToRedo))
    ));
}

#[test]
fn transaction_groups_performs() {
    let mut doc = selected_pair();
    let before = doc.map().clone();

    doc.begin_transaction("Rearrange").unwrap();
    doc.perform("Move", Transform::translate([id(1)], Vec3::X)).unwrap();
    doc.perform("Delete", Detach::new([id(2)])).unwrap();
    assert!(doc.commit_transaction().unwrap());

    assert_eq!(doc.history().len(), 1);
    assert_eq!(doc.history().undo_name(), Some("Rearrange"));
    doc.undo().unwrap();
    assert_eq!(doc.map(), &before);
}

#[test]
fn saved_map_reopens_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pair.json");
    let mut doc = selected_pair();
    let provider = JsonMapProvider::new();
    doc.save_as(&provider, &path).unwrap();

    let reopened = MapDocument::open(
        &path,
        &provider,
        &brush_editor::provider::TomlGameDataProvider,
        &EditorPreferences::default(),
    )
    .unwrap();
    assert_eq!(reopened.map(), doc.map());
    assert!(!reopened.is_modified());
}

// ============================================================================
// Autosave
// ============================================================================

#[test]
fn autosave_keeps_only_the_newest_files() {
    let dir = tempfile::tempdir().unwrap();
    let map_path = dir.path().join("arena.json");
    for stamp in ["2024-01-01-10-00-00", "2024-01-01-10-05-00", "2024-01-01-10-10-00"] {
        fs::write(dir.path().join(format!("arena.auto.{stamp}.json")), "{}").unwrap();
    }
    fs::write(dir.path().join("other.auto.2024-01-01-09-00-00.json"), "{}").unwrap();

    let mut doc = selected_pair();
    doc.set_path(&map_path);
    doc.perform("Select", Select::new([id(1)])).unwrap();

    let settings = AutosaveSettings {
        limit: 2,
        ..AutosaveSettings::default()
    };
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 15, 0).unwrap();
    let outcome = autosave::run(&mut doc, &JsonMapProvider::new(), &settings, now).unwrap();

    let saved = dir.path().join("arena.auto.2024-01-01-10-15-00.json");
    match outcome {
        AutosaveOutcome::Saved { path, deleted } => {
            assert_eq!(path, saved);
            assert_eq!(deleted.len(), 2);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let remaining = autosave::autosave_files(dir.path(), &map_path).unwrap();
    let names: Vec<_> = remaining.iter().map(|f| f.path.clone()).collect();
    assert_eq!(
        names,
        vec![saved, dir.path().join("arena.auto.2024-01-01-10-10-00.json")]
    );
    assert!(dir.path().join("other.auto.2024-01-01-09-00-00.json").exists());
    assert!(!doc.is_modified());
}

#[test]
fn autosave_skips_unchanged_documents() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = selected_pair();
    doc.set_path(dir.path().join("arena.json"));

    let outcome = autosave::run(
        &mut doc,
        &JsonMapProvider::new(),
        &AutosaveSettings::default(),
        Utc::now(),
    )
    .unwrap();
    assert!(matches!(outcome, AutosaveOutcome::Skipped(_)));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
