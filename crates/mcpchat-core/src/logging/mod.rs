//! Logging abstractions for runtime-agnostic logging
//!
//! Every component takes an `Arc<dyn Logger>` so the host decides where
//! messages go: stderr for the console client, nowhere or into memory for tests.

mod traits;
mod noop;
mod console;
mod memory;

pub use traits::{Logger, LogLevel, SharedLogger};
pub use noop::NoOpLogger;
pub use console::ConsoleLogger;
pub use memory::{LogEntry, MemoryLogger};
