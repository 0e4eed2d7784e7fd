use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use assistant_core::errors::StorageError;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

/// A JSON document on local disk.
///
/// Reads fail open: a missing or malformed file yields the default value.
/// Writes are atomic: the document is written to a temporary file in the same
/// directory, fsynced and renamed over the target, so a crash mid-write leaves
/// either the old or the new document in place.
#[derive(Debug)]
pub struct JsonFile {
    path: PathBuf,
    warned: bool,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            warned: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict read. `Ok(None)` when the file does not exist.
    pub fn read<T: DeserializeOwned>(&self) -> Result<Option<T>, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StorageError::Malformed {
                path: self.path.clone(),
                source,
            })
    }

    /// Fail-open read: any error is logged once and treated as empty state.
    pub fn load_or_default<T: DeserializeOwned + Default>(&mut self) -> T {
        match self.read() {
            Ok(Some(value)) => {
                debug!("Loaded {}", self.path.display());
                value
            }
            Ok(None) => {
                debug!("No file at {}, starting empty", self.path.display());
                T::default()
            }
            Err(e) => {
                self.report(&e);
                T::default()
            }
        }
    }

    /// Atomically replaces the document with `value`.
    pub fn save<T: Serialize>(&mut self, value: &T) -> Result<(), StorageError> {
        let result = self.write_atomic(value);
        match &result {
            Ok(()) => debug!("Saved {}", self.path.display()),
            Err(e) => self.report(e),
        }
        result
    }

    fn write_atomic<T: Serialize>(&self, value: &T) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Serialize {
            path: self.path.clone(),
            source,
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

        // Dropping the temp file on any early return removes it
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
        let fill = |tmp: &mut NamedTempFile| -> io::Result<()> {
            tmp.write_all(&bytes)?;
            tmp.write_all(b"\n")?;
            tmp.flush()?;
            tmp.as_file().sync_all()
        };
        fill(&mut tmp).map_err(|e| StorageError::io(&self.path, e))?;

        tmp.persist(&self.path)
            .map_err(|e| StorageError::io(&self.path, e.error))?;
        Ok(())
    }

    fn report(&mut self, err: &StorageError) {
        if self.warned {
            debug!("{}", err);
        } else {
            warn!("{} (continuing with in-memory state)", err);
            self.warned = true;
        }
    }
}
