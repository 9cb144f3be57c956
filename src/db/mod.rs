//! Storage module for the patient registry.
//!
//! The whole collection lives in one JSON file mapping patient id to record.
//! Every operation reads and rewrites the full file; a process-wide lock
//! serializes them so concurrent requests cannot lose each other's writes.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::config::StorageConfig;
use crate::models::patient::PatientRecord;

/// Patient id -> stored record, in the order patients were added. Saving
/// keeps that order in the file.
pub type PatientCollection = IndexMap<String, PatientRecord>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed patient data in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode patient data: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Handle to the patients file. Cheap to clone; clones share the lock.
#[derive(Debug, Clone)]
pub struct PatientStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PatientStore {
    /// Create a handle for the file at `config.path`, writing an empty
    /// collection first when the file is absent and `create_if_missing` is set.
    pub async fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        let store = Self::new(&config.path);

        match tokio::fs::metadata(&config.path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound && config.create_if_missing => {
                if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| StoreError::io(parent, e))?;
                }
                store.write_file(&PatientCollection::new()).await?;
                info!(path = %config.path.display(), "created empty patients file");
            }
            Err(e) => return Err(StoreError::io(&config.path, e)),
        }

        Ok(store)
    }

    /// Handle for `path` without touching the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Read the entire collection.
    pub async fn load(&self) -> Result<PatientCollection, StoreError> {
        let _guard = self.inner.lock.lock().await;
        self.read_file().await
    }

    /// Replace the entire collection.
    pub async fn save(&self, patients: &PatientCollection) -> Result<(), StoreError> {
        let _guard = self.inner.lock.lock().await;
        self.write_file(patients).await
    }

    /// Run `f` against a freshly loaded collection while holding the lock.
    pub async fn read<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&PatientCollection) -> T,
    {
        let _guard = self.inner.lock.lock().await;
        let patients = self.read_file().await?;
        Ok(f(&patients))
    }

    /// Load, mutate and save as one critical section.
    ///
    /// The file is rewritten only when `f` returns `Ok`; on `Err` the stored
    /// collection is left exactly as it was.
    #[instrument(skip(self, f), fields(path = %self.inner.path.display()))]
    pub async fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut PatientCollection) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.inner.lock.lock().await;
        let mut patients = self.read_file().await?;
        let out = f(&mut patients)?;
        self.write_file(&patients).await?;
        Ok(out)
    }

    async fn read_file(&self) -> Result<PatientCollection, StoreError> {
        let path = &self.inner.path;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::io(path, e))?;
        let patients: PatientCollection =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?;
        debug!(count = patients.len(), "loaded patients");
        Ok(patients)
    }

    /// Write to a sibling temp file, then rename over the target so readers
    /// never see a partially written collection.
    async fn write_file(&self, patients: &PatientCollection) -> Result<(), StoreError> {
        let path = &self.inner.path;
        let tmp = temp_path(path);
        let bytes = serde_json::to_vec_pretty(patients)?;

        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| StoreError::io(path, e))?;
        debug!(count = patients.len(), "saved patients");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
