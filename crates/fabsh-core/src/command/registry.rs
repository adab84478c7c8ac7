use crate::command::model::{Command, CommandOutput, DispatchContext, ReplySink};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Status returned for lines naming no registered command.
pub const UNKNOWN_COMMAND_STATUS: i32 = 1;

/// Executes one raw command line and returns its status code.
///
/// Dispatch is synchronous: the call returns only once the command has
/// finished (asynchronous side effects of the command may outlive it).
pub trait CommandRegistry {
    fn run(
        &self,
        line: &str,
        storage_directory: Option<&Path>,
        advertise_operational: bool,
    ) -> i32;
}

/// Name-indexed set of [`Command`]s with a built-in `help`.
///
/// Successful replies go to the [`ReplySink`]; failures are logged.
pub struct CommandSet {
    commands: BTreeMap<&'static str, Arc<dyn Command>>,
    replies: Arc<dyn ReplySink>,
}

impl CommandSet {
    pub fn new(replies: Arc<dyn ReplySink>) -> Self {
        Self {
            commands: BTreeMap::new(),
            replies,
        }
    }

    pub fn with_commands(replies: Arc<dyn ReplySink>, commands: Vec<Arc<dyn Command>>) -> Self {
        let mut set = Self::new(replies);
        for command in commands {
            set.register(command);
        }
        set
    }

    /// Registers a command, replacing any previous command of the same name.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.insert(command.name(), command);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    /// Tokenizes `line` on whitespace and runs the named command.
    pub fn execute_line(&self, line: &str, ctx: &DispatchContext<'_>) -> CommandOutput {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((name, args)) = parts.split_first() else {
            return CommandOutput::empty();
        };

        if *name == "help" {
            return CommandOutput::success(self.help());
        }

        match self.commands.get(*name) {
            Some(command) => command.execute(args, ctx),
            None => CommandOutput::failure(
                UNKNOWN_COMMAND_STATUS,
                format!("Unknown command: {}", name),
            ),
        }
    }

    fn help(&self) -> String {
        let mut help = format!("{}\n\n", "Available Commands".bold());

        for command in self.commands.values() {
            help.push_str(&format!(
                "  {} - {}\n",
                command.usage().bright_cyan(),
                command.description().bright_black()
            ));
        }

        help.push_str(&format!(
            "  {} - {}\n",
            "help".bright_cyan(),
            "Show this help message".bright_black()
        ));
        help.push_str(&format!(
            "  {} - {}",
            "quit()".bright_cyan(),
            "Leave the interactive shell".bright_black()
        ));

        help
    }
}

impl CommandRegistry for CommandSet {
    fn run(
        &self,
        line: &str,
        storage_directory: Option<&Path>,
        advertise_operational: bool,
    ) -> i32 {
        let ctx = DispatchContext {
            storage_directory,
            advertise_operational,
        };
        let output = self.execute_line(line, &ctx);

        if output.is_success() {
            if !output.text.is_empty() {
                self.replies.write_reply(&output.text);
            }
        } else {
            // Goes through the log layer, which keeps the prompt intact.
            tracing::error!(status = output.status, "{}", output.text);
        }

        output.status
    }
}
