//! Builtin commands shipped with the `fabsh` binary.

use crate::command::model::{Command, CommandOutput, DispatchContext};
use crate::processor::{DeferredCleanups, WorkScheduler};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Prints its arguments joined by single spaces.
pub struct EchoCommand;

impl Command for EchoCommand {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn usage(&self) -> &'static str {
        "echo <text...>"
    }

    fn description(&self) -> &'static str {
        "Print the given text"
    }

    fn execute(&self, args: &[&str], _ctx: &DispatchContext<'_>) -> CommandOutput {
        CommandOutput::success(args.join(" "))
    }
}

/// Shows the session settings every command is dispatched with.
pub struct SessionInfoCommand;

impl Command for SessionInfoCommand {
    fn name(&self) -> &'static str {
        "session-info"
    }

    fn usage(&self) -> &'static str {
        "session-info"
    }

    fn description(&self) -> &'static str {
        "Show the storage directory and advertising settings"
    }

    fn execute(&self, _args: &[&str], ctx: &DispatchContext<'_>) -> CommandOutput {
        let storage = ctx
            .storage_directory
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "<not configured>".to_string());
        CommandOutput::success(format!(
            "storage directory: {}\nadvertise operational: {}",
            storage, ctx.advertise_operational
        ))
    }
}

/// Emits a log line from the event processor thread.
///
/// Useful for checking that background output does not garble a half-typed
/// command line.
pub struct LogCommand {
    scheduler: Arc<dyn WorkScheduler>,
}

impl LogCommand {
    pub fn new(scheduler: Arc<dyn WorkScheduler>) -> Self {
        Self { scheduler }
    }
}

impl Command for LogCommand {
    fn name(&self) -> &'static str {
        "log"
    }

    fn usage(&self) -> &'static str {
        "log <message...>"
    }

    fn description(&self) -> &'static str {
        "Log a message from the event processor thread"
    }

    fn execute(&self, args: &[&str], _ctx: &DispatchContext<'_>) -> CommandOutput {
        if args.is_empty() {
            return CommandOutput::failure(2, "Usage: log <message...>");
        }

        let message = args.join(" ");
        let work = Box::new(move || {
            tracing::info!(target: "fabsh::processor", "{}", message);
        });

        match self.scheduler.schedule_work(work) {
            Ok(()) => CommandOutput::empty(),
            Err(e) => CommandOutput::failure(1, format!("Failed to schedule log: {}", e)),
        }
    }
}

/// Opens a named subscription that stays active until the session ends.
///
/// Each subscription registers its own teardown with [`DeferredCleanups`], so
/// it is closed on the processor thread after `quit()`.
pub struct SubscribeCommand {
    cleanups: Arc<DeferredCleanups>,
    active: Arc<Mutex<BTreeMap<u32, String>>>,
    next_id: AtomicU32,
}

impl SubscribeCommand {
    pub fn new(cleanups: Arc<DeferredCleanups>) -> Self {
        Self {
            cleanups,
            active: Arc::new(Mutex::new(BTreeMap::new())),
            next_id: AtomicU32::new(1),
        }
    }

    /// Subscriptions not yet torn down, by id.
    pub fn active(&self) -> Vec<(u32, String)> {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.iter().map(|(id, path)| (*id, path.clone())).collect()
    }
}

impl Command for SubscribeCommand {
    fn name(&self) -> &'static str {
        "subscribe"
    }

    fn usage(&self) -> &'static str {
        "subscribe <path...>"
    }

    fn description(&self) -> &'static str {
        "Open a subscription that is closed when the shell exits"
    }

    fn execute(&self, args: &[&str], _ctx: &DispatchContext<'_>) -> CommandOutput {
        if args.is_empty() {
            return CommandOutput::failure(2, "Usage: subscribe <path...>");
        }

        let path = args.join(" ");
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, path.clone());

        let active = Arc::clone(&self.active);
        self.cleanups.register(
            format!("subscription-{id}"),
            Box::new(move || {
                let removed = active.lock().unwrap_or_else(|e| e.into_inner()).remove(&id);
                if let Some(path) = removed {
                    tracing::info!(id, path = %path, "Subscription closed");
                }
            }),
        );

        tracing::debug!(id, path = %path, "Subscription opened");
        CommandOutput::success(format!("Subscription {id} active: {path}"))
    }
}
