//! Periodic autosave with retention.
//!
//! Autosaves are written next to the map (or into a custom directory) as
//! `<basename>.auto.<timestamp><ext>`, with a UTC timestamp in
//! `yyyy-MM-dd-HH-mm-ss` form (24-hour clock). After each write the oldest
//! autosaves of the same map beyond the configured limit are deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use thiserror::Error;

use super::document::MapDocument;
use super::preferences::AutosaveSettings;
use crate::operations::error_chain;
use crate::provider::{MapProvider, ProviderError};

/// `chrono` format of the timestamp embedded in autosave names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// `<stem>.auto.<timestamp><ext>`, matched case-insensitively.
static AUTOSAVE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<stem>.+)\.auto\.(?P<stamp>\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2})(?P<ext>\.[^.]+)?$")
        .expect("Invalid autosave name regex")
});

/// Errors raised while writing or pruning autosaves.
#[derive(Debug, Error)]
pub enum AutosaveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("map provider failed")]
    Provider(#[from] ProviderError),
}

/// An autosave file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutosaveFile {
    pub path: PathBuf,
    pub timestamp: DateTime<Utc>,
}

/// Why an autosave pass did not write anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    NoFilePath,
    Unchanged,
}

/// Result of an autosave pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveOutcome {
    Skipped(SkipReason),
    Saved { path: PathBuf, deleted: Vec<PathBuf> },
}

fn split_name(map_path: &Path) -> Option<(String, String)> {
    let stem = map_path.file_stem()?.to_str()?.to_string();
    let ext = map_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    Some((stem, ext))
}

/// File name of the autosave of `map_path` taken at `at`.
pub fn autosave_name(map_path: &Path, at: DateTime<Utc>) -> Option<String> {
    let (stem, ext) = split_name(map_path)?;
    Some(format!("{stem}.auto.{}{ext}", at.format(TIMESTAMP_FORMAT)))
}

/// Directory autosaves of `map_path` go to.
///
/// The custom directory wins when it exists; otherwise the map's own
/// directory is used.
pub fn autosave_folder(map_path: &Path, settings: &AutosaveSettings) -> Option<PathBuf> {
    if let Some(custom) = settings.custom_directory.as_deref().filter(|d| d.is_dir()) {
        return Some(custom.to_path_buf());
    }
    let parent = map_path.parent()?;
    if parent.as_os_str().is_empty() {
        Some(PathBuf::from("."))
    } else {
        Some(parent.to_path_buf())
    }
}

/// Autosaves of `map_path` in `dir`, newest first.
pub fn autosave_files(dir: &Path, map_path: &Path) -> io::Result<Vec<AutosaveFile>> {
    let Some((stem, ext)) = split_name(map_path) else {
        return Ok(Vec::new());
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(caps) = AUTOSAVE_NAME.captures(name) else {
            continue;
        };
        let ext_matches = caps.name("ext").map_or("", |m| m.as_str()).eq_ignore_ascii_case(&ext);
        if !caps["stem"].eq_ignore_ascii_case(&stem) || !ext_matches {
            continue;
        }
        match NaiveDateTime::parse_from_str(&caps["stamp"], TIMESTAMP_FORMAT) {
            Ok(naive) => files.push(AutosaveFile {
                path: entry.path(),
                timestamp: Utc.from_utc_datetime(&naive),
            }),
            Err(e) => log::debug!("Ignoring {:?}: bad timestamp ({})", name, e),
        }
    }
    files.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.path.cmp(&a.path)));
    Ok(files)
}

/// Run one autosave pass for `document`.
pub fn run(
    document: &mut MapDocument,
    provider: &dyn MapProvider,
    settings: &AutosaveSettings,
    now: DateTime<Utc>,
) -> Result<AutosaveOutcome, AutosaveError> {
    if !settings.enabled {
        return Ok(AutosaveOutcome::Skipped(SkipReason::Disabled));
    }
    let Some(map_path) = document.path().map(Path::to_path_buf) else {
        return Ok(AutosaveOutcome::Skipped(SkipReason::NoFilePath));
    };
    let (Some(dir), Some(name)) = (autosave_folder(&map_path, settings), autosave_name(&map_path, now)) else {
        return Ok(AutosaveOutcome::Skipped(SkipReason::NoFilePath));
    };
    if settings.only_on_changed && !document.is_modified() {
        log::debug!("Autosave of {} skipped, no changes", document.name());
        return Ok(AutosaveOutcome::Skipped(SkipReason::Unchanged));
    }

    let path = dir.join(name);
    provider.save(document.map(), &path)?;

    let mut deleted = Vec::new();
    if settings.limit > 0 {
        for old in autosave_files(&dir, &map_path)?.into_iter().skip(settings.limit) {
            match fs::remove_file(&old.path) {
                Ok(()) => deleted.push(old.path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Could not delete old autosave {:?}: {}", old.path, error_chain(&e)),
            }
        }
    }

    log::info!("Autosaved {} to {:?}", document.name(), path);
    document.autosaved(path.clone());
    Ok(AutosaveOutcome::Saved { path, deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 21, 15, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn test_name_uses_24_hour_clock() {
        let name = autosave_name(Path::new("/maps/c1a0.json"), at(0)).unwrap();
        assert_eq!(name, "c1a0.auto.2024-03-09-21-15-00.json");
    }

    #[test]
    fn test_name_without_extension() {
        let name = autosave_name(Path::new("c1a0"), at(0)).unwrap();
        assert_eq!(name, "c1a0.auto.2024-03-09-21-15-00");
    }

    #[test]
    fn test_folder_prefers_existing_custom_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = AutosaveSettings::default();
        let map = Path::new("/maps/c1a0.json");

        assert_eq!(autosave_folder(map, &settings), Some(PathBuf::from("/maps")));
        settings.custom_directory = Some(dir.path().join("missing"));
        assert_eq!(autosave_folder(map, &settings), Some(PathBuf::from("/maps")));
        settings.custom_directory = Some(dir.path().to_path_buf());
        assert_eq!(autosave_folder(map, &settings), Some(dir.path().to_path_buf()));
        assert_eq!(autosave_folder(Path::new("c1a0.json"), &AutosaveSettings::default()), Some(PathBuf::from(".")));
    }

    #[test]
    fn test_files_only_match_the_same_map() {
        let dir = tempfile::tempdir().unwrap();
        let map = dir.path().join("c1a0.json");
        for name in [
            "c1a0.auto.2024-03-09-21-15-00.json",
            "c1a0.auto.2024-03-09-21-20-00.json",
            "c1a0b.auto.2024-03-09-21-25-00.json",
            "c1a0.auto.2024-03-09-21-25-00.bak",
            "c1a0.auto.yesterday.json",
            "c1a0.json",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }

        let files = autosave_files(dir.path(), &map).unwrap();
        let stamps: Vec<_> = files.iter().map(|f| f.timestamp).collect();
        assert_eq!(stamps, vec![at(300), at(0)]);
    }

    #[test]
    fn test_files_match_regardless_of_case() {
        let dir = tempfile::tempdir().unwrap();
        let map = dir.path().join("c1a0.json");
        fs::write(dir.path().join("C1A0.AUTO.2024-03-09-21-15-00.JSON"), "").unwrap();
        fs::write(dir.path().join("c1a0.Auto.2024-03-09-21-20-00.json"), "").unwrap();

        let files = autosave_files(dir.path(), &map).unwrap();
        let stamps: Vec<_> = files.iter().map(|f| f.timestamp).collect();
        assert_eq!(stamps, vec![at(300), at(0)]);
    }
}
