//! Runtime pieces of the shell that run beside the interactive loop: the
//! event processor thread and the terminal log rendering.

pub mod output;
pub mod processor;
pub mod terminal_layer;

pub use output::{CLEAR_LINE, CaptureBuffer, OutputCoordinator};
pub use processor::{EventProcessor, ProcessorHandle};
pub use terminal_layer::TerminalLogLayer;
