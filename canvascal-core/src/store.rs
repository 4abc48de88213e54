//! Persistence for the credential record.
//!
//! The broker only sees opaque bytes; encoding lives in `credential`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;

use crate::error::CanvasCalResult;

/// Where the single credential record lives.
pub trait CredentialStore: Send + Sync {
    /// Returns `None` when nothing has been saved yet.
    fn load(&self) -> CanvasCalResult<Option<Vec<u8>>>;

    /// Replaces whatever was stored before.
    fn save(&self, bytes: &[u8]) -> CanvasCalResult<()>;
}

/// Stores the credential as a file on disk (e.g. `tokens.json`).
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> CanvasCalResult<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, bytes: &[u8]) -> CanvasCalResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        // Each write gets its own temp file in the target directory, then an
        // atomic rename; concurrent savers are last-write-wins.
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;

        // Owner-only (0600) since the file contains OAuth tokens:
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        temp.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }
}

/// In-memory store, useful for tests and short-lived processes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        MemoryStore {
            data: Mutex::new(Some(bytes.into())),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> CanvasCalResult<Option<Vec<u8>>> {
        let data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(data.clone())
    }

    fn save(&self, bytes: &[u8]) -> CanvasCalResult<()> {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        *data = Some(bytes.to_vec());
        Ok(())
    }
}
