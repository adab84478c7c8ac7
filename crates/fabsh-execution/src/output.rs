//! Terminal output coordination.
//!
//! Log records can be emitted from the event processor thread while the
//! operator is typing at the prompt. Once redirection is enabled, every record
//! is wrapped in "clear line" sequences so it lands on a clean line and the
//! line editor can redraw the partial input on the next refresh.

use fabsh_core::ReplySink;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Carriage return, then clear from the cursor to the end of the screen.
pub const CLEAR_LINE: &str = "\r\x1B[0J";

/// Shared handle to the terminal sink.
///
/// Cloning is cheap; all clones write to the same sink. The sink lock only
/// keeps a record and a clear from interleaving mid-write.
#[derive(Clone)]
pub struct OutputCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    sink: Mutex<Box<dyn Write + Send>>,
    redirected: AtomicBool,
}

impl OutputCoordinator {
    /// Coordinator writing to the process's stdout.
    pub fn stdout() -> Self {
        Self::with_sink(Box::new(io::stdout()))
    }

    /// Coordinator writing to an arbitrary sink.
    pub fn with_sink(sink: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink: Mutex::new(sink),
                redirected: AtomicBool::new(false),
            }),
        }
    }

    /// Moves the cursor to the start of the line and clears to the end of
    /// the screen.
    pub fn clear_line(&self) {
        let mut sink = self.lock_sink();
        let _ = sink.write_all(CLEAR_LINE.as_bytes());
        let _ = sink.flush();
    }

    /// Starts wrapping log records in clear sequences. Stays on for the rest
    /// of the process.
    pub fn redirect_logs(&self) {
        if !self.inner.redirected.swap(true, Ordering::SeqCst) {
            tracing::trace!("Log output redirected through the output coordinator");
        }
    }

    pub fn is_redirected(&self) -> bool {
        self.inner.redirected.load(Ordering::SeqCst)
    }

    /// Writes one formatted log record followed by a newline.
    pub fn write_record(&self, record: &str) {
        let redirected = self.is_redirected();
        let mut sink = self.lock_sink();

        if redirected {
            let _ = sink.write_all(CLEAR_LINE.as_bytes());
        }
        let _ = sink.write_all(record.as_bytes());
        let _ = sink.write_all(b"\n");
        if redirected {
            let _ = sink.write_all(CLEAR_LINE.as_bytes());
        }
        let _ = sink.flush();
    }

    /// Writes a command reply followed by a newline, in one piece.
    pub fn write_reply(&self, reply: &str) {
        let mut sink = self.lock_sink();
        let _ = sink.write_all(reply.as_bytes());
        let _ = sink.write_all(b"\n");
        let _ = sink.flush();
    }

    fn lock_sink(&self) -> std::sync::MutexGuard<'_, Box<dyn Write + Send>> {
        // A panic mid-write leaves nothing worth protecting.
        self.inner.sink.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ReplySink for OutputCoordinator {
    fn write_reply(&self, text: &str) {
        OutputCoordinator::write_reply(self, text);
    }
}

impl std::fmt::Debug for OutputCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputCoordinator")
            .field("redirected", &self.is_redirected())
            .finish()
    }
}

/// In-memory sink for inspecting coordinator output.
#[derive(Clone, Default)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
