//! Interface to the asynchronous event processor.
//!
//! The interactive loop never runs cleanup work itself. It hands boxed
//! closures to a [`WorkScheduler`], which runs them on its own thread.

use crate::error::Result;
use std::fmt;
use std::sync::Mutex;

/// A unit of work executed on the event processor's thread.
pub type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// Accepts work items for execution on another thread.
///
/// `schedule_work` must not wait for the item to run.
pub trait WorkScheduler: Send + Sync {
    fn schedule_work(&self, work: WorkItem) -> Result<()>;
}

/// Cleanups registered by commands during the session and drained once at
/// shutdown, on the processor thread.
#[derive(Default)]
pub struct DeferredCleanups {
    pending: Mutex<Vec<(String, WorkItem)>>,
}

impl DeferredCleanups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a cleanup to run when the session ends.
    pub fn register(&self, name: impl Into<String>, cleanup: WorkItem) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.push((name.into(), cleanup));
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every registered cleanup in registration order and empties the
    /// list. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let drained: Vec<(String, WorkItem)> = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.drain(..).collect()
        };

        let count = drained.len();
        for (name, cleanup) in drained {
            tracing::debug!(cleanup = %name, "Running deferred cleanup");
            cleanup();
        }
        count
    }
}

impl fmt::Debug for DeferredCleanups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredCleanups")
            .field("pending", &self.len())
            .finish()
    }
}
