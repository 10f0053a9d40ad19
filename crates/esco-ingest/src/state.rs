//! Replication state persisted between runs
//!
//! ```json
//! {
//!   "replication_key": "selectedVersion",
//!   "replication_key_value": "v1.2.0",
//!   "updated_at": "2026-10-18T09:12:44Z"
//! }
//! ```

use chrono::{DateTime, Utc};
use esco_common::Version;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;
use crate::esco::OutputRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationState {
    pub replication_key: String,

    /// Version of the last fully extracted taxonomy
    #[serde(default)]
    pub replication_key_value: Option<String>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ReplicationState {
    fn default() -> Self {
        Self {
            replication_key: OutputRecord::REPLICATION_KEY.to_string(),
            replication_key_value: None,
            updated_at: None,
        }
    }
}

impl ReplicationState {
    /// Load state from `path`; a missing file is an empty state
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No state file, starting fresh");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let state = serde_json::from_str(&content)?;
        Ok(state)
    }

    /// Write state atomically (temp file + rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = temp_path(path);
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, path)?;

        debug!(path = %path.display(), value = ?self.replication_key_value, "State saved");
        Ok(())
    }

    /// Last synced version; an unparsable value counts as none
    pub fn last_synced(&self) -> Option<Version> {
        let raw = self.replication_key_value.as_deref()?;
        match raw.parse() {
            Ok(version) => Some(version),
            Err(e) => {
                warn!(value = %raw, error = %e, "Ignoring invalid state value, running full extraction");
                None
            },
        }
    }

    pub fn advance(&mut self, version: &Version) {
        self.replication_key_value = Some(version.to_string());
        self.updated_at = Some(Utc::now());
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let state = ReplicationState::load(&dir.path().join("state.json")).unwrap();
        assert_eq!(state, ReplicationState::default());
        assert_eq!(state.replication_key, "selectedVersion");
        assert!(state.last_synced().is_none());
    }

    #[test]
    fn test_advance_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut state = ReplicationState::default();
        state.advance(&Version::new(1, 2, 0));
        state.save(&path).unwrap();

        let loaded = ReplicationState::load(&path).unwrap();
        assert_eq!(loaded.last_synced(), Some(Version::new(1, 2, 0)));
        assert!(loaded.updated_at.is_some());
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[test]
    fn test_invalid_value_means_full_run() {
        let state = ReplicationState {
            replication_key_value: Some("2024-01-01".to_string()),
            ..ReplicationState::default()
        };
        assert!(state.last_synced().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(ReplicationState::load(&path).is_err());
    }
}
