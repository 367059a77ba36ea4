//! I/O boundary traits for testability
//!
//! A [`NodeStore`] is the table holding nested-set rows. It knows nothing about
//! coordinates: it hands out raw rows and accepts a full replacement set in one
//! call, which is the unit of atomicity every mutation relies on.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// One raw row: column name to value.
pub type Row = Map<String, Value>;

/// Row storage abstraction.
pub trait NodeStore: Send + Sync {
    /// Read every row.
    fn fetch(&self) -> io::Result<Vec<Row>>;

    /// Replace every row atomically: readers see either the old set or the new one.
    fn replace_all(&self, rows: Vec<Row>) -> io::Result<()>;
}

// ============================================================
// IMPLEMENTATIONS
// ============================================================

/// Process-local store, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Row>>,
}

impl MemoryStore {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }
}

fn poisoned<T>(_: T) -> io::Error {
    io::Error::new(io::ErrorKind::Other, "store lock poisoned")
}

impl NodeStore for MemoryStore {
    fn fetch(&self) -> io::Result<Vec<Row>> {
        Ok(self.rows.lock().map_err(poisoned)?.clone())
    }

    fn replace_all(&self, rows: Vec<Row>) -> io::Result<()> {
        *self.rows.lock().map_err(poisoned)? = rows;
        Ok(())
    }
}

/// Rows persisted as a JSON array in a single file.
///
/// A missing file reads as an empty table. Commits write a sibling temp file
/// and rename it over the target.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NodeStore for JsonFileStore {
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    fn fetch(&self) -> io::Result<Vec<Row>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("store file missing, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    #[instrument(level = "debug", skip(self, rows), fields(path = %self.path.display(), rows = rows.len()))]
    fn replace_all(&self, rows: Vec<Row>) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(&rows)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        io::Write::write_all(&mut tmp, json.as_bytes())?;
        io::Write::write_all(&mut tmp, b"\n")?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
