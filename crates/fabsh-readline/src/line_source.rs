use std::borrow::Cow::{self, Borrowed, Owned};

use colored::Colorize;
use fabsh_core::{FabshError, Result};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use crate::session::STOP_COMMAND;

/// One line of operator input. Owned by whoever holds it; handed back to the
/// [`LineSource`] on the next read.
#[derive(Debug, PartialEq, Eq)]
pub struct CommandLine(String);

impl CommandLine {
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Produces operator input one line at a time.
pub trait LineSource {
    /// Seeds the in-session recall list with persisted history.
    fn preload(&mut self, entries: &[String]);

    /// Releases `previous`, then blocks until the next line is available.
    ///
    /// `None` means the input is exhausted.
    fn next_line(&mut self, previous: Option<CommandLine>) -> Option<CommandLine>;
}

/// Completion and hints for the first token on the line.
#[derive(Clone)]
struct ShellHelper {
    commands: Vec<String>,
}

impl ShellHelper {
    fn new(mut commands: Vec<String>) -> Self {
        commands.push("help".to_string());
        commands.push(STOP_COMMAND.to_string());
        commands.sort();
        commands.dedup();
        Self { commands }
    }

    fn is_command(&self, word: &str) -> bool {
        self.commands.iter().any(|cmd| cmd == word)
    }
}

impl Helper for ShellHelper {}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.contains(char::is_whitespace) {
            return Ok((0, vec![]));
        }

        let candidates: Vec<Pair> = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd.clone(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ShellHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let word_end = line.find(char::is_whitespace).unwrap_or(line.len());
        let (word, rest) = line.split_at(word_end);
        if self.is_command(word) {
            Owned(format!("{}{}", word.bright_cyan(), rest))
        } else {
            Borrowed(line)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.is_empty() || line.contains(char::is_whitespace) {
            return None;
        }

        self.commands
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for ShellHelper {}

/// [`LineSource`] backed by a rustyline editor on the controlling terminal.
pub struct EditorLineSource {
    editor: Editor<ShellHelper, DefaultHistory>,
    prompt: String,
}

impl EditorLineSource {
    pub fn new(prompt: impl Into<String>, command_names: Vec<String>) -> Result<Self> {
        let mut editor = Editor::new().map_err(|e| FabshError::terminal(e.to_string()))?;
        editor.set_helper(Some(ShellHelper::new(command_names)));

        Ok(Self {
            editor,
            prompt: prompt.into(),
        })
    }
}

impl LineSource for EditorLineSource {
    fn preload(&mut self, entries: &[String]) {
        for entry in entries {
            let _ = self.editor.add_history_entry(entry.as_str());
        }
    }

    fn next_line(&mut self, previous: Option<CommandLine>) -> Option<CommandLine> {
        drop(previous);

        loop {
            match self.editor.readline(&self.prompt) {
                Ok(line) => {
                    if !line.is_empty() {
                        let _ = self.editor.add_history_entry(line.as_str());
                    }
                    return Some(CommandLine::new(line));
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", format!("Type {} to exit.", STOP_COMMAND).yellow());
                }
                Err(ReadlineError::Eof) => return None,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to read command line");
                    return None;
                }
            }
        }
    }
}
