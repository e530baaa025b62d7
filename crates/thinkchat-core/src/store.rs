//! Local key-value persistence for ThinkChat state.
//!
//! Three independent JSON records live under ${THINKCHAT_HOME}:
//! `auth.json`, `settings.json`, and `memory.json`. Each is read once at
//! startup and rewritten on every mutation. Corrupt or unparseable content
//! is discarded and the file removed; defaults take over.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::paths;

/// Persisted record names.
pub const AUTH_RECORD: &str = "auth";
pub const SETTINGS_RECORD: &str = "settings";
pub const MEMORY_RECORD: &str = "memory";

/// JSON record store rooted at a directory.
#[derive(Debug, Clone)]
pub struct Store {
    home: PathBuf,
}

impl Store {
    /// Opens the store at the default ThinkChat home.
    pub fn open() -> Self {
        Self::at(paths::thinkchat_home())
    }

    /// Opens the store at a specific directory (tests, alternate homes).
    pub fn at(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.home.join(format!("{name}.json"))
    }

    /// Loads a record, or None if it is absent.
    ///
    /// Unparseable content is treated as absent: the file is removed and a
    /// warning logged, matching the recovery behavior for corrupt state.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let path = self.record_path(name);
        let contents = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(
                    record = name,
                    error = %err,
                    "discarding corrupt persisted record"
                );
                let _ = fs::remove_file(&path);
                None
            }
        }
    }

    /// Writes a record, replacing any previous contents.
    ///
    /// The write goes through a temp file in the same directory followed by a
    /// rename, so readers never observe a half-written record.
    ///
    /// # Errors
    /// Returns an error if the record cannot be serialized or written.
    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.record_path(name);
        fs::create_dir_all(&self.home)
            .with_context(|| format!("create state directory {}", self.home.display()))?;

        let contents = serde_json::to_string_pretty(value)
            .with_context(|| format!("serialize record '{name}'"))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("replace {}", path.display()))?;
        Ok(())
    }

    /// Removes a record if present.
    pub fn remove(&self, name: &str) {
        let _ = fs::remove_file(self.record_path(name));
    }

    /// Returns the directory this store writes under.
    pub fn home(&self) -> &Path {
        &self.home
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::at(dir.path());

        let sample = Sample {
            name: "alex".to_string(),
            count: 3,
        };
        store.save("sample", &sample).unwrap();

        let loaded: Sample = store.load("sample").unwrap();
        assert_eq!(loaded, sample);
    }

    #[test]
    fn load_missing_record_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::at(dir.path());
        assert!(store.load::<Sample>("absent").is_none());
    }

    #[test]
    fn corrupt_record_is_discarded_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::at(dir.path());

        let path = dir.path().join("sample.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(store.load::<Sample>("sample").is_none());
        assert!(!path.exists(), "corrupt file should be removed");
    }

    #[test]
    fn save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::at(dir.path());

        store
            .save("sample", &Sample { name: "a".into(), count: 1 })
            .unwrap();
        store
            .save("sample", &Sample { name: "b".into(), count: 2 })
            .unwrap();

        let loaded: Sample = store.load("sample").unwrap();
        assert_eq!(loaded.name, "b");
        assert_eq!(loaded.count, 2);
    }
}
