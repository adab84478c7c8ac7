//! Configuration service implementation.
//!
//! Loads [`ShellConfig`] from a TOML file: an explicit `--config` path, or
//! `~/.config/fabsh/config.toml` when none is given.

use crate::paths::FabshPaths;
use fabsh_core::{FabshError, Result, ShellConfig};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub struct ConfigService;

impl ConfigService {
    /// Loads the shell configuration.
    ///
    /// An explicit path must exist. A missing default file yields
    /// [`ShellConfig::default`].
    pub fn load(explicit_path: Option<&Path>) -> Result<ShellConfig> {
        match explicit_path {
            Some(path) => Self::load_from(path),
            None => {
                let Ok(default_path) = FabshPaths::config_file() else {
                    tracing::debug!("No config directory available, using defaults");
                    return Ok(ShellConfig::default());
                };
                match Self::load_from(&default_path) {
                    Err(FabshError::Io { .. }) if !default_path.exists() => {
                        Ok(ShellConfig::default())
                    }
                    other => other,
                }
            }
        }
    }

    /// Parses the TOML file at `path`.
    pub fn load_from(path: &Path) -> Result<ShellConfig> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                FabshError::io(format!("Config file not found: {}", path.display()))
            } else {
                e.into()
            }
        })?;

        let config: ShellConfig = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded shell configuration");
        Ok(config)
    }
}
