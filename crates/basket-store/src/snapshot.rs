//! # Local Snapshot
//!
//! Device-side persistence for the anonymous cart, so items added before
//! login survive a restart.
//!
//! ## File Format
//! ```json
//! {
//!   "formatVersion": 1,
//!   "savedAt": "2026-01-01T12:00:00Z",
//!   "items": [
//!     { "id": "…", "relationType": "product", "relationId": "p1",
//!       "quantity": 2, "addedAt": "…" }
//!   ]
//! }
//! ```
//!
//! ## Default Location
//! - **Linux**: `~/.local/share/basket-cart/local-cart.json`
//! - **macOS**: `~/Library/Application Support/com.basket.cart/local-cart.json`
//! - **Windows**: `%APPDATA%\basket\cart\data\local-cart.json`

use std::path::{Path, PathBuf};

use basket_core::CartItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// Current snapshot format version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// On-disk shape of the local cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalSnapshot {
    format_version: u32,
    saved_at: DateTime<Utc>,
    #[serde(default)]
    items: Vec<CartItem>,
}

/// A JSON snapshot file holding the local collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SnapshotFile { path: path.into() }
    }

    /// Snapshot at the platform data directory, if one can be determined.
    pub fn at_default_path() -> Option<Self> {
        Self::default_path().map(Self::new)
    }

    /// Returns the platform default snapshot path.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "basket", "cart")
            .map(|dirs| dirs.data_dir().join("local-cart.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored items. A missing file is an empty cart.
    pub fn load(&self) -> StoreResult<Vec<CartItem>> {
        if !self.path.exists() {
            debug!(path = ?self.path, "Local cart snapshot not found, starting empty");
            return Ok(Vec::new());
        }

        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| StoreError::SnapshotLoadFailed(format!("{}: {}", self.path.display(), e)))?;
        let snapshot: LocalSnapshot = serde_json::from_str(&contents)?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(StoreError::SnapshotLoadFailed(format!(
                "unsupported snapshot format version {}",
                snapshot.format_version
            )));
        }

        info!(path = ?self.path, count = snapshot.items.len(), "Loaded local cart snapshot");
        Ok(snapshot.items)
    }

    /// Writes `items`, replacing the previous snapshot.
    ///
    /// The file is written next to its target and renamed into place, so a
    /// reader never sees a half-written snapshot.
    pub fn save(&self, items: &[CartItem]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::SnapshotSaveFailed(e.to_string()))?;
        }

        let snapshot = LocalSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            saved_at: Utc::now(),
            items: items.to_vec(),
        };
        let contents = serde_json::to_string_pretty(&snapshot)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)
            .map_err(|e| StoreError::SnapshotSaveFailed(format!("{}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::SnapshotSaveFailed(format!("{}: {}", self.path.display(), e)))?;

        debug!(path = ?self.path, count = items.len(), "Saved local cart snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("none.json"));
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested").join("cart.json"));

        let items = vec![
            CartItem::local("product", "p1", 2),
            CartItem::local("subscription", "s1", 1),
        ];
        file.save(&items).unwrap();

        assert_eq!(file.load().unwrap(), items);
        assert!(!file.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");
        std::fs::write(&path, "not json").unwrap();

        let err = SnapshotFile::new(path).load().unwrap_err();
        assert!(err.is_snapshot_error());
    }

    #[test]
    fn test_future_format_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");
        std::fs::write(
            &path,
            r#"{"formatVersion": 99, "savedAt": "2026-01-01T00:00:00Z", "items": []}"#,
        )
        .unwrap();

        assert!(matches!(
            SnapshotFile::new(path).load(),
            Err(StoreError::SnapshotLoadFailed(_))
        ));
    }
}
