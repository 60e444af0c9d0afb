//! Upload storage.
//!
//! Uploads are stored under generated names. The client-supplied filename
//! is untrusted: only a short alphanumeric extension is kept from it, as a
//! format hint for the decoder.

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

const MAX_EXTENSION_LEN: usize = 8;

/// Writes uploaded files into a single directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Opens the store, creating `dir` if it doesn't exist.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Returns the upload directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `data` under a fresh name and returns its path.
    pub async fn save(&self, original_name: Option<&str>, data: &[u8]) -> io::Result<PathBuf> {
        let path = self.dir.join(storage_name(original_name));
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }

    /// Deletes a stored upload. Missing files are ignored.
    pub async fn remove(&self, path: &Path) -> io::Result<()> {
        match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Generates `<uuid>.<ext>`, or a bare `<uuid>` when the original name has
/// no usable extension.
pub fn storage_name(original_name: Option<&str>) -> String {
    let id = Uuid::new_v4();
    match original_name.and_then(safe_extension) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

fn safe_extension(name: &str) -> Option<String> {
    // Both separators count: browsers on Windows may send full paths.
    let base = name.rsplit(['/', '\\']).next()?;
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
