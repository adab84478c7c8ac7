//! Durable interactive history.
//!
//! One entry per line, append-only. Every append opens, writes, flushes and
//! closes the file so entries survive an abnormal exit.

use crate::paths::FabshPaths;
use fabsh_core::Result;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Header some line editors put at the top of their history files.
const EDITOR_HISTORY_HEADER: &str = "#V2";

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// History store at the location derived from the storage directory
    /// (see [`FabshPaths::history_file`]).
    pub fn for_storage_directory(storage_directory: Option<&Path>) -> Self {
        Self::new(FabshPaths::history_file(storage_directory))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all persisted entries, oldest first.
    ///
    /// A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .filter(|line| !line.is_empty() && *line != EDITOR_HISTORY_HEADER)
            .map(str::to_string)
            .collect())
    }

    /// Appends one entry. Empty lines are never persisted.
    pub fn append(&self, line: &str) -> Result<()> {
        if line.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}
