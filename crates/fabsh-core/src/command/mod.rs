//! Command dispatch for the interactive shell.
//!
//! The interactive loop only knows about [`CommandRegistry`]: one call per
//! line, returning a status code. [`CommandSet`] is the registry the `fabsh`
//! binary ships with; device-specific commands plug into it through the
//! [`Command`] trait.

pub mod builtin;
pub mod model;
pub mod registry;

pub use builtin::{EchoCommand, LogCommand, SessionInfoCommand, SubscribeCommand};
pub use model::{Command, CommandOutput, DispatchContext, ReplySink};
pub use registry::{CommandRegistry, CommandSet};
