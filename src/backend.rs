//! Storage backend trait and the bundled implementations
//!
//! The store never touches the filesystem directly. It reads the whole file
//! through [`StorageBackend::content`] and replaces it in one call to
//! [`StorageBackend::update`].

use crate::error::{IetError, IetResult};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Whole-file storage backend
///
/// Implement this trait to keep config files somewhere other than the local
/// filesystem (a remote host, a configuration service, ...).
pub trait StorageBackend {
    /// Read the full file text
    fn content(&self) -> IetResult<String>;

    /// Replace the full file text
    ///
    /// Must be all-or-nothing: on error the previous content stays visible.
    fn update(&mut self, text: &str) -> IetResult<()>;

    /// Location of the file, used in log and error messages
    fn path(&self) -> &Path;
}

/// Local file backend
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    create_missing: bool,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_missing: false,
        }
    }

    /// Treat a missing file as empty instead of failing on read
    pub fn create_missing(mut self, create: bool) -> Self {
        self.create_missing = create;
        self
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl StorageBackend for FileBackend {
    fn content(&self) -> IetResult<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && self.create_missing => {
                log::debug!("{} does not exist yet, starting empty", self.path.display());
                Ok(String::new())
            }
            Err(e) => Err(IetError::Io(e)),
        }
    }

    /// Write a temporary file next to the config and persist it over the
    /// original, keeping the original's permissions
    ///
    /// A file that does not exist yet is created owner-only, since it may
    /// end up holding CHAP secrets.
    fn update(&mut self, text: &str) -> IetResult<()> {
        let mut temp = NamedTempFile::new_in(self.dir())?;
        match fs::metadata(&self.path) {
            Ok(meta) => temp.as_file().set_permissions(meta.permissions())?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(IetError::Io(e)),
        }

        temp.write_all(text.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| IetError::Io(e.error))?;
        log::debug!("Replaced {}", self.path.display());
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// In-memory backend, handy for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    path: PathBuf,
    text: String,
    writes: usize,
}

impl MemoryBackend {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            path: PathBuf::from("memory:ietd.conf"),
            text: text.into(),
            writes: 0,
        }
    }

    /// Current stored text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of successful updates so far
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl StorageBackend for MemoryBackend {
    fn content(&self) -> IetResult<String> {
        Ok(self.text.clone())
    }

    fn update(&mut self, text: &str) -> IetResult<()> {
        self.text = text.to_string();
        self.writes += 1;
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
