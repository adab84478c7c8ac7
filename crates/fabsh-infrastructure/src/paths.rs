//! Path management for fabsh configuration and history files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/fabsh/             # Config directory (dirs::config_dir)
//! └── config.toml              # Shell configuration
//!
//! <storage-directory>/         # Configured storage directory, or
//! ${TMPDIR:-/tmp}/             # the temp directory when none is configured
//! └── chip_tool_history        # Interactive history, one entry per line
//! ```

use fabsh_core::{FabshError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// File name of the interactive history file.
pub const HISTORY_FILE_NAME: &str = "chip_tool_history";

/// Used when neither a storage directory nor `TMPDIR` is available.
pub const FALLBACK_TMP_DIR: &str = "/tmp";

const APP_DIR_NAME: &str = "fabsh";
const CONFIG_FILE_NAME: &str = "config.toml";

pub struct FabshPaths;

impl FabshPaths {
    /// Returns the fabsh configuration directory (e.g. `~/.config/fabsh/`).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or_else(|| FabshError::config("Cannot find config directory"))
    }

    /// Returns the path to the default configuration file.
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Resolves the history file for this process from the configured
    /// storage directory and the `TMPDIR` environment variable.
    pub fn history_file(storage_directory: Option<&Path>) -> PathBuf {
        Self::resolve_history_file(storage_directory, std::env::var_os("TMPDIR"))
    }

    /// Resolves the history file path.
    ///
    /// Precedence: the storage directory, then `tmpdir`, then `/tmp`. An
    /// empty `tmpdir` counts as unset.
    pub fn resolve_history_file(
        storage_directory: Option<&Path>,
        tmpdir: Option<OsString>,
    ) -> PathBuf {
        let dir = match storage_directory {
            Some(dir) => dir.to_path_buf(),
            None => tmpdir
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(FALLBACK_TMP_DIR)),
        };
        dir.join(HISTORY_FILE_NAME)
    }
}
