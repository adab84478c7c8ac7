//! The asynchronous event processor.
//!
//! A dedicated OS thread drives a current-thread tokio runtime and drains a
//! work queue. Work items run on that thread, in submission order, and may
//! `tokio::spawn` further tasks onto the processor's runtime.

use fabsh_core::{DeferredCleanups, FabshError, Result, WorkItem, WorkScheduler};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc;

const THREAD_NAME: &str = "event-processor";

enum ProcessorMessage {
    Work(WorkItem),
    Stop,
}

/// Cloneable, non-blocking submission handle for the processor queue.
#[derive(Clone)]
pub struct ProcessorHandle {
    sender: mpsc::UnboundedSender<ProcessorMessage>,
}

impl ProcessorHandle {
    /// Asks the processor to exit once the items queued before this call
    /// have run.
    pub fn stop(&self) -> Result<()> {
        self.sender
            .send(ProcessorMessage::Stop)
            .map_err(|_| FabshError::processor_unavailable("event processor has already stopped"))
    }

    /// Work item that runs every deferred cleanup and then stops the
    /// processor.
    pub fn shutdown_task(&self, cleanups: Arc<DeferredCleanups>) -> WorkItem {
        let handle = self.clone();
        Box::new(move || {
            let count = cleanups.run_all();
            tracing::debug!(count, "Deferred cleanups finished");
            if let Err(e) = handle.stop() {
                tracing::debug!(error = %e, "Event processor already stopped");
            }
        })
    }
}

impl WorkScheduler for ProcessorHandle {
    fn schedule_work(&self, work: WorkItem) -> Result<()> {
        self.sender
            .send(ProcessorMessage::Work(work))
            .map_err(|_| FabshError::processor_unavailable("event processor has already stopped"))
    }
}

/// Owns the processor thread.
pub struct EventProcessor {
    handle: ProcessorHandle,
    exited: std_mpsc::Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl EventProcessor {
    /// Spawns the processor thread and its runtime.
    pub fn start() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (sender, mut receiver) = mpsc::unbounded_channel::<ProcessorMessage>();
        let (exit_tx, exited) = std_mpsc::channel();

        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    tracing::debug!("Event processor started");
                    while let Some(message) = receiver.recv().await {
                        match message {
                            ProcessorMessage::Work(work) => run_work_item(work),
                            ProcessorMessage::Stop => break,
                        }
                    }
                    tracing::debug!("Event processor stopped");
                });
                let _ = exit_tx.send(());
            })?;

        Ok(Self {
            handle: ProcessorHandle { sender },
            exited,
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> ProcessorHandle {
        self.handle.clone()
    }

    /// Waits up to `timeout` for the processor thread to finish.
    ///
    /// Returns `false` when the thread is still running after the timeout; it
    /// is then left detached.
    pub fn wait_for_exit(mut self, timeout: Duration) -> bool {
        match self.exited.recv_timeout(timeout) {
            Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                if let Some(thread) = self.thread.take() {
                    if thread.join().is_err() {
                        tracing::error!("Event processor thread panicked");
                    }
                }
                true
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Event processor did not stop in time"
                );
                false
            }
        }
    }
}

fn run_work_item(work: WorkItem) {
    if panic::catch_unwind(AssertUnwindSafe(work)).is_err() {
        tracing::error!("Work item panicked on the event processor");
    }
}
