//! Interactive shell front end: the rustyline line source and the command
//! loop that drives it.

pub mod line_source;
pub mod session;

pub use line_source::{CommandLine, EditorLineSource, LineSource};
pub use session::{InteractiveSession, LineKind, STOP_COMMAND, SessionState, StopReason, classify};
