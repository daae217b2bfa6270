//! Crash-safe persistence of a node's `.nexec` status file.
//!
//! Grounded on the storage example pack's `CheckpointWriter` trait
//! (`write_tmp`/`fsync_file`/`rename`): every individual scope-value
//! completion is written through temp-file-then-rename so a crash
//! mid-run never leaves a corrupt or partially-written status file,
//! simplified to one small YAML file per node (no compression, no
//! directory fsync: a single `rename` within the same directory is
//! already atomic on the platforms presto targets).

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use presto_core::NodeStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Abstracts the filesystem operations a status store performs, so
/// tests can swap in an in-memory fake without touching disk.
pub trait CheckpointWriter: Send + Sync {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), StatusStoreError>;
    fn fsync_file(&self, path: &Path) -> Result<(), StatusStoreError>;
    fn rename(&self, from: &Path, to: &Path) -> Result<(), StatusStoreError>;
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, StatusStoreError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsCheckpointWriter;

impl CheckpointWriter for FsCheckpointWriter {
    fn write_tmp(&self, path: &Path, data: &[u8]) -> Result<(), StatusStoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(data)?;
        Ok(())
    }

    fn fsync_file(&self, path: &Path) -> Result<(), StatusStoreError> {
        File::open(path)?.sync_all()?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), StatusStoreError> {
        std::fs::rename(from, to)?;
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>, StatusStoreError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// One node's `.nexec` file under `.presto/`.
pub struct StatusStore<W: CheckpointWriter = FsCheckpointWriter> {
    writer: W,
    presto_dir: PathBuf,
}

impl StatusStore<FsCheckpointWriter> {
    pub fn new(presto_dir: PathBuf) -> Self {
        Self::with_writer(FsCheckpointWriter, presto_dir)
    }
}

impl<W: CheckpointWriter> StatusStore<W> {
    pub fn with_writer(writer: W, presto_dir: PathBuf) -> Self {
        Self { writer, presto_dir }
    }

    fn path_for(&self, node_name: &str) -> PathBuf {
        self.presto_dir.join(format!("{node_name}.nexec"))
    }

    /// Load a node's previous status, or an empty status if none
    /// exists yet.
    pub fn load(&self, node_name: &str) -> Result<NodeStatus, StatusStoreError> {
        let path = self.path_for(node_name);
        match self.writer.read(&path)? {
            Some(bytes) => Ok(serde_yaml::from_slice(&bytes)?),
            None => Ok(NodeStatus::default()),
        }
    }

    /// Persist a node's status via write-temp, fsync, rename.
    pub fn save(&self, node_name: &str, status: &NodeStatus) -> Result<(), StatusStoreError> {
        let path = self.path_for(node_name);
        let tmp_path = path.with_extension("nexec.tmp");
        let bytes = serde_yaml::to_vec(status)?;
        self.writer.write_tmp(&tmp_path, &bytes)?;
        self.writer.fsync_file(&tmp_path)?;
        self.writer.rename(&tmp_path, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presto_core::ScopeValueStatus;

    #[test]
    fn round_trips_through_a_real_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatusStore::new(dir.path().to_path_buf());

        let mut status = NodeStatus::default();
        status.by_value.insert(
            "a".to_string(),
            ScopeValueStatus::executed(&["echo".to_string()], true, "ok", chrono::Utc::now()),
        );
        store.save("build", &status).unwrap();

        let loaded = store.load("build").unwrap();
        assert!(loaded.by_value["a"].is_success());
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatusStore::new(dir.path().to_path_buf());
        let loaded = store.load("never-ran").unwrap();
        assert!(loaded.by_value.is_empty());
    }
}
