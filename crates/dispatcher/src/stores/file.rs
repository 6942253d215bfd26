//! FileStore - one JSON-lines file per application

use std::path::{Path, PathBuf};

use contracts::{ContractError, LogCollection, LogEntry, LogStore};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Store writing `<base_path>/<app>.log`, one serialized entry per line
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a new FileStore rooted at `base_path`
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// File holding `app_name`'s entries
    pub fn collection_path(&self, app_name: &str) -> PathBuf {
        self.base_path.join(format!("{}.log", file_stem(app_name)))
    }
}

impl LogStore for FileStore {
    type Collection = FileCollection;

    #[instrument(name = "file_store_open", skip(self))]
    async fn open(&self, app_name: &str) -> Result<FileCollection, ContractError> {
        let path = self.collection_path(app_name);
        let file = async {
            fs::create_dir_all(&self.base_path).await?;
            OpenOptions::new().create(true).append(true).open(&path).await
        }
        .await
        .map_err(|e| ContractError::storage_unavailable(app_name, format!("{}: {e}", path.display())))?;

        debug!(app = %app_name, path = %path.display(), "FileStore collection opened");

        Ok(FileCollection {
            app_name: app_name.to_string(),
            path,
            file: Some(file),
        })
    }
}

/// Append-only JSON-lines file for one application
#[derive(Debug)]
pub struct FileCollection {
    app_name: String,
    path: PathBuf,
    file: Option<File>,
}

impl FileCollection {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode(entries: &[LogEntry]) -> Result<Vec<u8>, ContractError> {
        let mut data = Vec::with_capacity(entries.len() * 128);
        for entry in entries {
            serde_json::to_writer(&mut data, entry)?;
            data.push(b'\n');
        }
        Ok(data)
    }
}

impl LogCollection for FileCollection {
    fn app_name(&self) -> &str {
        &self.app_name
    }

    #[instrument(
        name = "file_collection_bulk_insert",
        skip(self, entries),
        fields(app = %self.app_name, count = entries.len())
    )]
    async fn bulk_insert(&mut self, entries: &[LogEntry]) -> Result<(), ContractError> {
        let data = Self::encode(entries)?;
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| ContractError::storage_write(&self.app_name, "collection closed"))?;

        // One write per batch keeps a batch contiguous in the file
        file.write_all(&data)
            .await
            .map_err(|e| ContractError::storage_write(&self.app_name, e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| ContractError::storage_write(&self.app_name, e.to_string()))?;
        Ok(())
    }

    #[instrument(name = "file_collection_close", skip(self), fields(app = %self.app_name))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut file) = self.file.take() {
            file.sync_all().await?;
        }
        debug!(app = %self.app_name, "FileStore collection closed");
        Ok(())
    }
}

/// Encode an application name as a file stem
///
/// ASCII letters, digits and `-` pass through; every other byte, `_`
/// included, becomes `_XX` (hex). Distinct names map to distinct stems.
fn file_stem(app_name: &str) -> String {
    if app_name.is_empty() {
        return "_".to_string();
    }
    let mut stem = String::with_capacity(app_name.len());
    for byte in app_name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{byte:02x}"));
        }
    }
    stem
}
