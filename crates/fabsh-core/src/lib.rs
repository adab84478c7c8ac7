//! Domain types shared by the fabsh crates: errors, shell configuration,
//! the command dispatch interface and the event processor interface.

pub mod command;
pub mod config;
pub mod error;
pub mod processor;

pub use command::{
    Command, CommandOutput, CommandRegistry, CommandSet, DispatchContext, ReplySink,
};
pub use config::ShellConfig;
pub use error::{FabshError, Result};
pub use processor::{DeferredCleanups, WorkItem, WorkScheduler};
