//! Baseline snapshot capture and storage
//!
//! The baseline is the remote's full settings object as it was immediately
//! before management began. It is captured once during create and read once
//! during restore. The engine owns the byte format ([`BaselineSnapshot`]);
//! durability belongs to the [`BaselineSlot`].

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tsr_tree::SettingsHash;

use crate::error::SnapshotError;

/// Byte slot scoped to one managed resource
#[async_trait]
pub trait BaselineSlot: Send + Sync {
    /// Store the snapshot bytes; all-or-nothing
    async fn put_baseline(&self, bytes: Vec<u8>) -> Result<(), SnapshotError>;

    /// Stored bytes, or `None` if nothing was ever stored
    async fn get_baseline(&self) -> Result<Option<Vec<u8>>, SnapshotError>;
}

#[async_trait]
impl<T: BaselineSlot + ?Sized> BaselineSlot for Arc<T> {
    async fn put_baseline(&self, bytes: Vec<u8>) -> Result<(), SnapshotError> {
        (**self).put_baseline(bytes).await
    }

    async fn get_baseline(&self) -> Result<Option<Vec<u8>>, SnapshotError> {
        (**self).get_baseline().await
    }
}

/// Serialized baseline: the remote object plus its hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    hash: SettingsHash,
    settings: Json,
}

impl BaselineSnapshot {
    /// Capture a remote settings object verbatim
    #[must_use]
    pub fn capture(settings: Json) -> Self {
        Self {
            hash: SettingsHash::of_json(&settings),
            settings,
        }
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> SettingsHash {
        self.hash
    }

    /// The captured object in wire form
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &Json {
        &self.settings
    }

    /// # Errors
    /// Returns [`SnapshotError::Encode`] if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        serde_json::to_vec(self).map_err(SnapshotError::Encode)
    }

    /// Parse and verify stored bytes
    ///
    /// # Errors
    /// Returns [`SnapshotError::Corrupt`] for unparseable bytes and
    /// [`SnapshotError::HashMismatch`] when the content does not match its
    /// recorded hash.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_slice(bytes).map_err(SnapshotError::Corrupt)?;
        let computed = SettingsHash::of_json(&snapshot.settings);
        if computed != snapshot.hash {
            return Err(SnapshotError::HashMismatch {
                recorded: snapshot.hash,
                computed,
            });
        }
        Ok(snapshot)
    }
}

/// Baseline stored in a single file, replaced atomically
#[derive(Debug, Clone)]
pub struct FileBaselineSlot {
    path: PathBuf,
}

impl FileBaselineSlot {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl BaselineSlot for FileBaselineSlot {
    async fn put_baseline(&self, bytes: Vec<u8>) -> Result<(), SnapshotError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| SnapshotError::Storage(e.to_string()))?
            .map_err(|e| SnapshotError::Storage(format!("{}: {e}", self.path.display())))
    }

    async fn get_baseline(&self) -> Result<Option<Vec<u8>>, SnapshotError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SnapshotError::Storage(format!("{}: {e}", self.path.display()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_bytes_round_trip() {
        let snapshot = BaselineSnapshot::capture(json!({ "walkMeOptOut": false }));
        let bytes = snapshot.to_bytes().unwrap();
        assert_eq!(BaselineSnapshot::from_bytes(&bytes).unwrap(), snapshot);
    }

    #[test]
    fn tampered_snapshot_is_rejected() {
        let snapshot = BaselineSnapshot::capture(json!({ "walkMeOptOut": false }));
        let mut doc: Json = serde_json::from_slice(&snapshot.to_bytes().unwrap()).unwrap();
        doc["settings"]["walkMeOptOut"] = json!(true);
        let bytes = serde_json::to_vec(&doc).unwrap();
        assert!(matches!(
            BaselineSnapshot::from_bytes(&bytes),
            Err(SnapshotError::HashMismatch { .. })
        ));
    }

    #[test]
    fn garbage_is_corrupt() {
        assert!(matches!(
            BaselineSnapshot::from_bytes(b"not json"),
            Err(SnapshotError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn file_slot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileBaselineSlot::new(dir.path().join("nested").join("baseline.json"));
        assert!(slot.get_baseline().await.unwrap().is_none());

        slot.put_baseline(b"first".to_vec()).await.unwrap();
        slot.put_baseline(b"second".to_vec()).await.unwrap();
        assert_eq!(slot.get_baseline().await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn file_slot_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileBaselineSlot::new(dir.path().join("baseline.json"));
        slot.put_baseline(b"{}".to_vec()).await.unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
