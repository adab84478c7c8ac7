//! The interactive command loop.
//!
//! Reads a line, persists it, dispatches it to the [`CommandRegistry`] and
//! waits for the dispatch to return before reading the next one. The stop
//! command hands the deferred cleanup to the event processor and ends the
//! loop without waiting for that cleanup to run.

use std::sync::Arc;

use fabsh_core::{CommandRegistry, ShellConfig, WorkItem, WorkScheduler};
use fabsh_execution::OutputCoordinator;
use fabsh_infrastructure::HistoryStore;

use crate::line_source::{CommandLine, LineSource};

/// Input line that ends the session. Matched exactly, without trimming.
pub const STOP_COMMAND: &str = "quit()";

/// What the loop does with a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Stop,
    Command,
}

pub fn classify(line: &str) -> LineKind {
    if line == STOP_COMMAND {
        LineKind::Stop
    } else {
        LineKind::Command
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    Dispatching,
    Stopped,
}

/// Why [`InteractiveSession::run`] returned. Both are successful exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfInput,
    StopCommand,
}

pub struct InteractiveSession {
    config: ShellConfig,
    history: HistoryStore,
    output: OutputCoordinator,
    registry: Arc<dyn CommandRegistry>,
    scheduler: Arc<dyn WorkScheduler>,
    cleanup: Option<WorkItem>,
    state: SessionState,
}

impl InteractiveSession {
    pub fn new(
        config: ShellConfig,
        history: HistoryStore,
        output: OutputCoordinator,
        registry: Arc<dyn CommandRegistry>,
        scheduler: Arc<dyn WorkScheduler>,
        cleanup: WorkItem,
    ) -> Self {
        Self {
            config,
            history,
            output,
            registry,
            scheduler,
            cleanup: Some(cleanup),
            state: SessionState::AwaitingInput,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Runs the loop until end of input or the stop command.
    pub fn run(&mut self, source: &mut dyn LineSource) -> StopReason {
        self.load_history(source);
        self.output.redirect_logs();

        let mut current: Option<CommandLine> = None;
        let reason = loop {
            self.state = SessionState::AwaitingInput;
            current = source.next_line(current.take());

            let Some(line) = current.as_ref() else {
                tracing::debug!("End of input");
                break StopReason::EndOfInput;
            };

            match classify(line.as_str()) {
                LineKind::Stop => {
                    self.schedule_cleanup();
                    break StopReason::StopCommand;
                }
                LineKind::Command => {
                    self.state = SessionState::Dispatching;
                    self.dispatch(line);
                }
            }
        };

        drop(current);
        self.state = SessionState::Stopped;
        reason
    }

    fn load_history(&self, source: &mut dyn LineSource) {
        match self.history.load() {
            Ok(entries) => {
                tracing::debug!(
                    path = %self.history.path().display(),
                    entries = entries.len(),
                    "Loaded command history"
                );
                source.preload(&entries);
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.history.path().display(),
                    error = %e,
                    "Failed to load command history"
                );
            }
        }
    }

    fn dispatch(&self, line: &CommandLine) {
        if !line.is_empty() {
            if let Err(e) = self.history.append(line.as_str()) {
                tracing::warn!(error = %e, "Failed to persist command history");
            }
        }

        self.output.clear_line();

        let status = self.registry.run(
            line.as_str(),
            self.config.storage_directory(),
            self.config.needs_operational_advertising(),
        );
        tracing::debug!(status, "Command returned");
    }

    /// Hands the cleanup to the event processor. Never waits for it.
    fn schedule_cleanup(&mut self) {
        let Some(cleanup) = self.cleanup.take() else {
            return;
        };

        // Not much to do if this fails while leaving, but it may explain
        // state that was not cleaned up.
        if let Err(e) = self.scheduler.schedule_work(cleanup) {
            tracing::error!(error = %e, "Failed to schedule deferred cleanup");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabsh_core::command::SubscribeCommand;
    use fabsh_core::{Command, CommandSet, DeferredCleanups, FabshError, Result};
    use fabsh_execution::{CLEAR_LINE, CaptureBuffer, EventProcessor};
    use std::collections::VecDeque;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    /// Hands out scripted lines and checks that each one comes back before
    /// the next is produced.
    struct ScriptedLineSource {
        lines: VecDeque<String>,
        preloaded: Vec<String>,
        outstanding: usize,
        handed_out: usize,
    }

    impl ScriptedLineSource {
        fn new(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|l| l.to_string()).collect(),
                preloaded: Vec::new(),
                outstanding: 0,
                handed_out: 0,
            }
        }
    }

    impl LineSource for ScriptedLineSource {
        fn preload(&mut self, entries: &[String]) {
            self.preloaded.extend_from_slice(entries);
        }

        fn next_line(&mut self, previous: Option<CommandLine>) -> Option<CommandLine> {
            if let Some(previous) = previous {
                drop(previous);
                self.outstanding -= 1;
            }
            assert_eq!(self.outstanding, 0, "previous line was not handed back");

            let line = self.lines.pop_front()?;
            self.outstanding += 1;
            self.handed_out += 1;
            Some(CommandLine::new(line))
        }
    }

    #[derive(Default)]
    struct RecordingRegistry {
        calls: Mutex<Vec<(String, Option<PathBuf>, bool)>>,
        events: Mutex<Vec<String>>,
        in_flight: AtomicBool,
    }

    impl RecordingRegistry {
        fn lines(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(line, _, _)| line.clone())
                .collect()
        }

        /// Dispatched lines that name a command.
        fn commands(&self) -> Vec<String> {
            self.lines()
                .into_iter()
                .filter(|line| !line.trim().is_empty())
                .collect()
        }
    }

    impl CommandRegistry for RecordingRegistry {
        fn run(
            &self,
            line: &str,
            storage_directory: Option<&Path>,
            advertise_operational: bool,
        ) -> i32 {
            assert!(!self.in_flight.swap(true, Ordering::SeqCst), "overlapping dispatch");
            self.events.lock().unwrap().push(format!("start {line}"));
            thread::sleep(Duration::from_millis(5));
            self.calls.lock().unwrap().push((
                line.to_string(),
                storage_directory.map(Path::to_path_buf),
                advertise_operational,
            ));
            self.events.lock().unwrap().push(format!("end {line}"));
            self.in_flight.store(false, Ordering::SeqCst);
            7
        }
    }

    /// Keeps scheduled work without running it.
    #[derive(Default)]
    struct HoldingScheduler {
        held: Mutex<Vec<WorkItem>>,
        delay: Duration,
    }

    impl WorkScheduler for HoldingScheduler {
        fn schedule_work(&self, work: WorkItem) -> Result<()> {
            thread::sleep(self.delay);
            self.held.lock().unwrap().push(work);
            Ok(())
        }
    }

    #[derive(Default)]
    struct ClosedScheduler {
        attempts: AtomicUsize,
    }

    impl WorkScheduler for ClosedScheduler {
        fn schedule_work(&self, _work: WorkItem) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(FabshError::processor_unavailable("stopped"))
        }
    }

    struct Harness {
        _dir: TempDir,
        registry: Arc<RecordingRegistry>,
        output: CaptureBuffer,
        cleanup_ran: Arc<AtomicBool>,
        session: InteractiveSession,
    }

    fn harness(config: ShellConfig, scheduler: Arc<dyn WorkScheduler>) -> Harness {
        let dir = TempDir::new().unwrap();
        let history = HistoryStore::new(dir.path().join("chip_tool_history"));
        let registry = Arc::new(RecordingRegistry::default());
        let output = CaptureBuffer::new();
        let cleanup_ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cleanup_ran);

        let session = InteractiveSession::new(
            config,
            history,
            OutputCoordinator::with_sink(Box::new(output.clone())),
            registry.clone(),
            scheduler,
            Box::new(move || flag.store(true, Ordering::SeqCst)),
        );

        Harness {
            _dir: dir,
            registry,
            output,
            cleanup_ran,
            session,
        }
    }

    #[test]
    fn test_classify_is_exact() {
        assert_eq!(classify("quit()"), LineKind::Stop);
        assert_eq!(classify("quit() "), LineKind::Command);
        assert_eq!(classify(" quit()"), LineKind::Command);
        assert_eq!(classify("QUIT()"), LineKind::Command);
        assert_eq!(classify("quit"), LineKind::Command);
        assert_eq!(classify(""), LineKind::Command);
    }

    #[test]
    fn test_end_to_end_commissioning_window_then_quit() {
        let scheduler = Arc::new(HoldingScheduler::default());
        let mut h = harness(ShellConfig::default(), scheduler.clone());
        let mut source = ScriptedLineSource::new(&["open-commissioning-window 1", "", "quit()"]);

        let reason = h.session.run(&mut source);

        assert_eq!(reason, StopReason::StopCommand);
        assert_eq!(h.session.state(), SessionState::Stopped);
        // The blank line reaches the registry too, where it names no command.
        assert_eq!(h.registry.commands(), vec!["open-commissioning-window 1"]);
        assert_eq!(h.registry.lines(), vec!["open-commissioning-window 1", ""]);
        let history = fs::read_to_string(h.session.history().path()).unwrap();
        assert_eq!(history, "open-commissioning-window 1\n");
        assert_eq!(scheduler.held.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_lines_are_dispatched_but_not_persisted() {
        let mut h = harness(ShellConfig::default(), Arc::new(HoldingScheduler::default()));
        let mut source = ScriptedLineSource::new(&["", "onoff on 1 1", "", "onoff off 1 1"]);

        assert_eq!(h.session.run(&mut source), StopReason::EndOfInput);

        assert_eq!(h.registry.lines(), vec!["", "onoff on 1 1", "", "onoff off 1 1"]);
        let history = fs::read_to_string(h.session.history().path()).unwrap();
        assert_eq!(history, "onoff on 1 1\nonoff off 1 1\n");
    }

    #[test]
    fn test_near_miss_stop_tokens_are_dispatched() {
        let scheduler = Arc::new(HoldingScheduler::default());
        let mut h = harness(ShellConfig::default(), scheduler.clone());
        let mut source = ScriptedLineSource::new(&["quit() ", "QUIT()"]);

        assert_eq!(h.session.run(&mut source), StopReason::EndOfInput);

        assert_eq!(h.registry.lines(), vec!["quit() ", "QUIT()"]);
        assert!(scheduler.held.lock().unwrap().is_empty());
    }

    #[test]
    fn test_lines_after_stop_are_not_read() {
        let mut h = harness(ShellConfig::default(), Arc::new(HoldingScheduler::default()));
        let mut source = ScriptedLineSource::new(&["quit()", "onoff on 1 1"]);

        assert_eq!(h.session.run(&mut source), StopReason::StopCommand);

        assert!(h.registry.lines().is_empty());
        assert_eq!(source.lines.len(), 1);
    }

    #[test]
    fn test_every_line_is_handed_back_before_the_next_read() {
        let mut h = harness(ShellConfig::default(), Arc::new(HoldingScheduler::default()));
        let script: Vec<String> = (0..25).map(|i| format!("read {i}")).collect();
        let script: Vec<&str> = script.iter().map(String::as_str).collect();
        let mut source = ScriptedLineSource::new(&script);

        h.session.run(&mut source);

        assert_eq!(source.handed_out, 25);
        // The final read returned None after taking back line 25.
        assert_eq!(source.outstanding, 0);
    }

    #[test]
    fn test_dispatch_is_sequential_and_in_order() {
        let mut h = harness(ShellConfig::default(), Arc::new(HoldingScheduler::default()));
        let mut source = ScriptedLineSource::new(&["first", "second"]);

        h.session.run(&mut source);

        assert_eq!(
            *h.registry.events.lock().unwrap(),
            vec!["start first", "end first", "start second", "end second"]
        );
    }

    #[test]
    fn test_cleanup_is_scheduled_once_and_not_awaited() {
        let scheduler = Arc::new(HoldingScheduler {
            held: Mutex::new(Vec::new()),
            delay: Duration::from_millis(50),
        });
        let mut h = harness(ShellConfig::default(), scheduler.clone());
        let mut source = ScriptedLineSource::new(&["quit()"]);

        let started = Instant::now();
        assert_eq!(h.session.run(&mut source), StopReason::StopCommand);
        assert!(started.elapsed() >= Duration::from_millis(50));

        assert!(!h.cleanup_ran.load(Ordering::SeqCst));
        let held: Vec<WorkItem> = scheduler.held.lock().unwrap().drain(..).collect();
        assert_eq!(held.len(), 1);
        for work in held {
            work();
        }
        assert!(h.cleanup_ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_scheduling_failure_does_not_block_stop() {
        let scheduler = Arc::new(ClosedScheduler::default());
        let mut h = harness(ShellConfig::default(), scheduler.clone());
        let mut source = ScriptedLineSource::new(&["quit()"]);

        assert_eq!(h.session.run(&mut source), StopReason::StopCommand);
        assert_eq!(scheduler.attempts.load(Ordering::SeqCst), 1);
        assert!(!h.cleanup_ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_session_settings_are_forwarded_to_dispatch() {
        let config = ShellConfig {
            storage_directory: Some(PathBuf::from("/var/lib/fabric")),
            advertise_operational: Some(false),
            ..ShellConfig::default()
        };
        let mut h = harness(config, Arc::new(HoldingScheduler::default()));
        let mut source = ScriptedLineSource::new(&["pairing onnetwork 1 20202021"]);

        h.session.run(&mut source);

        let calls = h.registry.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.as_deref(), Some(Path::new("/var/lib/fabric")));
        assert!(!calls[0].2);
    }

    #[test]
    fn test_advertising_defaults_to_true() {
        let mut h = harness(ShellConfig::default(), Arc::new(HoldingScheduler::default()));
        let mut source = ScriptedLineSource::new(&["onoff on 1 1"]);

        h.session.run(&mut source);

        let calls = h.registry.calls.lock().unwrap();
        assert_eq!(calls[0].1, None);
        assert!(calls[0].2);
    }

    #[test]
    fn test_history_is_preloaded_and_logs_redirected() {
        let mut h = harness(ShellConfig::default(), Arc::new(HoldingScheduler::default()));
        fs::write(h.session.history().path(), "onoff on 1 1\nonoff off 1 1\n").unwrap();
        let mut source = ScriptedLineSource::new(&["onoff toggle 1 1", "", "quit()"]);

        h.session.run(&mut source);

        assert_eq!(source.preloaded, vec!["onoff on 1 1", "onoff off 1 1"]);
        // One clear per dispatched line, stop command excluded.
        assert_eq!(h.output.contents().matches(CLEAR_LINE).count(), 2);
    }

    #[test]
    fn test_unreadable_history_does_not_stop_the_session() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(RecordingRegistry::default());
        let mut session = InteractiveSession::new(
            ShellConfig::default(),
            // A directory cannot be read as a history file.
            HistoryStore::new(dir.path().to_path_buf()),
            OutputCoordinator::with_sink(Box::new(CaptureBuffer::new())),
            registry.clone(),
            Arc::new(HoldingScheduler::default()),
            Box::new(|| {}),
        );
        let mut source = ScriptedLineSource::new(&["onoff on 1 1"]);

        assert_eq!(session.run(&mut source), StopReason::EndOfInput);
        assert!(source.preloaded.is_empty());
        assert_eq!(registry.lines(), vec!["onoff on 1 1"]);
    }

    #[test]
    fn test_cleanup_runs_on_the_event_processor_thread() {
        let dir = TempDir::new().unwrap();
        let processor = EventProcessor::start().unwrap();
        let handle = processor.handle();
        let ran_on = Arc::new(Mutex::new(None));
        let loop_thread = thread::current().id();

        let cleanup: WorkItem = {
            let ran_on = Arc::clone(&ran_on);
            Box::new(move || {
                let current = thread::current();
                assert_ne!(current.id(), loop_thread);
                *ran_on.lock().unwrap() = Some(current.name().map(str::to_string));
            })
        };
        let mut session = InteractiveSession::new(
            ShellConfig::default(),
            HistoryStore::new(dir.path().join("chip_tool_history")),
            OutputCoordinator::with_sink(Box::new(CaptureBuffer::new())),
            Arc::new(RecordingRegistry::default()),
            Arc::new(handle.clone()),
            cleanup,
        );
        let mut source = ScriptedLineSource::new(&["quit()"]);

        assert_eq!(session.run(&mut source), StopReason::StopCommand);
        handle.stop().unwrap();
        assert!(processor.wait_for_exit(Duration::from_secs(5)));

        assert_eq!(
            *ran_on.lock().unwrap(),
            Some(Some("event-processor".to_string()))
        );
    }

    #[test]
    fn test_quit_tears_down_subscriptions_opened_by_commands() {
        let dir = TempDir::new().unwrap();
        let processor = EventProcessor::start().unwrap();
        let handle = processor.handle();
        let output = OutputCoordinator::with_sink(Box::new(CaptureBuffer::new()));

        let cleanups = Arc::new(DeferredCleanups::new());
        let subscribe = Arc::new(SubscribeCommand::new(Arc::clone(&cleanups)));
        let commands = vec![subscribe.clone() as Arc<dyn Command>];
        let registry = Arc::new(CommandSet::with_commands(Arc::new(output.clone()), commands));

        let mut session = InteractiveSession::new(
            ShellConfig::default(),
            HistoryStore::new(dir.path().join("chip_tool_history")),
            output,
            registry,
            Arc::new(handle.clone()),
            handle.shutdown_task(Arc::clone(&cleanups)),
        );
        let mut source =
            ScriptedLineSource::new(&["subscribe onoff 1 1", "subscribe levelcontrol 1 1", "quit()"]);

        assert_eq!(session.run(&mut source), StopReason::StopCommand);
        let history = fs::read_to_string(session.history().path()).unwrap();
        assert_eq!(history.lines().count(), 2);

        // The shutdown task stops the processor once the cleanups have run.
        assert!(processor.wait_for_exit(Duration::from_secs(5)));
        assert!(subscribe.active().is_empty());
        assert!(cleanups.is_empty());
    }
}
