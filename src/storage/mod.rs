//! On-disk storage for uploaded report files.
//!
//! Uploads are kept verbatim under a unique stored name; the original
//! filename only survives inside history entries. Stored files are served
//! back via `GET /files/{stored_name}`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// A stored upload: its on-disk name and the URL it is served under.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub stored_name: String,
    pub file_url: String,
}

pub struct FileStore {
    uploads_dir: PathBuf,
}

impl FileStore {
    /// Open the store, creating the uploads directory if needed.
    pub fn open(uploads_dir: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&uploads_dir)?;
        Ok(Self { uploads_dir })
    }

    /// Write one upload under a fresh unique name.
    pub fn save(&self, original_filename: &str, bytes: &[u8]) -> Result<StoredFile, StorageError> {
        let ext = Path::new(original_filename)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| ".pdf".to_string());
        let stored_name = format!(
            "{}-{}{ext}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );

        std::fs::write(self.uploads_dir.join(&stored_name), bytes)?;

        Ok(StoredFile {
            file_url: format!("/files/{stored_name}"),
            stored_name,
        })
    }

    /// Resolve a stored name back to its path. Returns `None` for names
    /// that escape the uploads directory or do not exist.
    pub fn resolve(&self, stored_name: &str) -> Option<PathBuf> {
        // Reject anything that is not a plain file name.
        if stored_name.contains('/') || stored_name.contains('\\') || stored_name.contains("..") {
            return None;
        }
        let path = self.uploads_dir.join(stored_name);
        path.is_file().then_some(path)
    }
}
