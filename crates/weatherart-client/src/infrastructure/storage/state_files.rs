//! Plain text state files: the pairing token and the last uploaded id.
//!
//! Each file holds a single trimmed line.  Reads never fail: a missing,
//! unreadable or empty file simply means "nothing stored".  Writes create
//! the parent directory; a failed write is logged and otherwise ignored,
//! since neither value is needed for the current run to succeed.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use weatherart_core::ContentId;

use crate::application::publish_artwork::LastUploadStore;

/// Reads the single value stored in `path`.
pub fn read_value(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let value = content.trim();
            (!value.is_empty()).then(|| value.to_string())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read state file");
            None
        }
    }
}

/// Writes `value` to `path`, creating the parent directory.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn write_value(path: &Path, value: &str) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, format!("{value}\n"))
}

/// Loads the pairing token from `path`.
pub fn load_token(path: &Path) -> Option<String> {
    read_value(path)
}

/// Stores a newly issued pairing token; failures are logged.
pub fn save_token(path: &Path, token: &str) {
    match write_value(path, token) {
        Ok(()) => debug!(path = %path.display(), "pairing token saved"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not save pairing token"),
    }
}

/// [`LastUploadStore`] backed by a text file.
#[derive(Debug, Clone)]
pub struct FileLastUploadStore {
    path: PathBuf,
}

impl FileLastUploadStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LastUploadStore for FileLastUploadStore {
    fn load(&self) -> Option<ContentId> {
        read_value(&self.path).map(ContentId::new)
    }

    fn save(&self, id: &ContentId) {
        if let Err(e) = write_value(&self.path, id.as_str()) {
            warn!(path = %self.path.display(), error = %e, "could not record last uploaded id");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
