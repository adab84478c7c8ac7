use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PROMPT: &str = ">>> ";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 2000;

/// Shell configuration, loaded from `config.toml` and overridden by CLI flags.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ShellConfig {
    /// Directory holding persistent storage, including the history file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_directory: Option<PathBuf>,
    /// Whether dispatched commands should advertise operationally.
    /// Unset means yes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertise_operational: Option<bool>,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// How long the process waits for the event processor after the
    /// interactive loop has returned.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_shutdown_grace_ms() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_MS
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            storage_directory: None,
            advertise_operational: None,
            prompt: default_prompt(),
            log_level: default_log_level(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl ShellConfig {
    pub fn storage_directory(&self) -> Option<&Path> {
        self.storage_directory.as_deref()
    }

    pub fn needs_operational_advertising(&self) -> bool {
        self.advertise_operational.unwrap_or(true)
    }
}
