//! Command domain models.

use std::path::Path;

/// Session settings forwarded to every dispatched command.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchContext<'a> {
    /// Storage directory hint, if one was configured.
    pub storage_directory: Option<&'a Path>,
    /// Whether the command should advertise operationally.
    pub advertise_operational: bool,
}

/// Result of executing one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status; zero means success.
    pub status: i32,
    /// Text to show the operator. May be empty.
    pub text: String,
}

impl CommandOutput {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            status: 0,
            text: text.into(),
        }
    }

    pub fn failure(status: i32, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    pub fn empty() -> Self {
        Self::success(String::new())
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Where command replies go. Replies share the terminal with log records, so
/// implementations must write each reply in one piece.
pub trait ReplySink: Send + Sync {
    fn write_reply(&self, text: &str);
}

/// A named command the operator can invoke from the shell.
pub trait Command: Send + Sync {
    /// Name typed at the prompt (first whitespace-separated token).
    fn name(&self) -> &'static str;
    /// Usage format, e.g. `echo <text...>`.
    fn usage(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// Runs the command synchronously with the remaining tokens.
    fn execute(&self, args: &[&str], ctx: &DispatchContext<'_>) -> CommandOutput;
}
