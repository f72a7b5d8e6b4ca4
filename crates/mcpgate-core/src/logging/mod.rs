//! Logging abstractions
//!
//! Every component receives an `Arc<dyn Logger>` at construction time;
//! nothing in the crate logs through a global.

mod traits;
mod noop;
mod console;
mod memory;

pub use traits::{Logger, LoggerExt, SharedLogger};
pub use noop::NoOpLogger;
pub use console::ConsoleLogger;
pub use memory::{LogLevel, MemoryLogger};
