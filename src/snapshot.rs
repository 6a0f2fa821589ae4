use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::schema::PageCounts;

/// Baseline counts from the most recent run, keyed by URL.
pub type Snapshot = BTreeMap<String, PageCounts>;

/// File-resident snapshot store. The caller owns the merge policy: it
/// loads, overlays the current run's counts, and saves the whole
/// mapping back, so a URL that failed this run keeps its old entry.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted snapshot. A missing file is a first run, not
    /// an error, and yields an empty mapping.
    pub fn load(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            info!(
                action = "load",
                component = "snapshot_store",
                path = ?self.path,
                "No snapshot file yet, starting from an empty baseline"
            );
            return Ok(Snapshot::new());
        }

        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read snapshot file {:?}", self.path))?;
        let snapshot: Snapshot = serde_json::from_str(&text)
            .with_context(|| format!("Snapshot file {:?} is not valid JSON", self.path))?;

        info!(
            action = "load",
            component = "snapshot_store",
            path = ?self.path,
            url_count = snapshot.len(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Replaces the persisted snapshot with `snapshot`. The data is
    /// written to a sibling temp file and renamed into place, so a crash
    /// mid-write never leaves a partial mapping behind.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create snapshot directory {parent:?}"))?;
            }
        }

        let text = serde_json::to_string_pretty(snapshot).context("Failed to encode snapshot")?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)
            .with_context(|| format!("Failed to write snapshot temp file {tmp:?}"))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to move snapshot into place at {:?}", self.path))?;

        info!(
            action = "save",
            component = "snapshot_store",
            path = ?self.path,
            url_count = snapshot.len(),
            "Snapshot saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CountValue;

    fn counts(pairs: &[(&str, i64)]) -> PageCounts {
        pairs
            .iter()
            .map(|(field, n)| (field.to_string(), CountValue::Count(*n)))
            .collect()
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));

        let mut snapshot = Snapshot::new();
        snapshot.insert("https://a.example/".to_string(), counts(&[("h1_total", 2)]));
        store.save(&snapshot).unwrap();

        assert_eq!(store.load().unwrap(), snapshot);
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[test]
    fn save_fully_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));

        let mut first = Snapshot::new();
        first.insert("https://a.example/".to_string(), counts(&[("h1_total", 2)]));
        first.insert("https://b.example/".to_string(), counts(&[("h1_total", 1)]));
        store.save(&first).unwrap();

        let mut second = Snapshot::new();
        second.insert("https://a.example/".to_string(), counts(&[("h1_total", 3)]));
        store.save(&second).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded, second);
    }

    #[test]
    fn malformed_stored_values_survive_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        fs::write(
            &path,
            r#"{"https://a.example/": {"h1_total": "oops", "h2_total": 4}}"#,
        )
        .unwrap();

        let store = SnapshotStore::new(&path);
        let loaded = store.load().unwrap();
        let page = &loaded["https://a.example/"];
        assert_eq!(page["h1_total"], CountValue::Raw("oops".to_string()));
        assert_eq!(page["h2_total"], CountValue::Count(4));
    }
}
