//! Sessions: one live transport connection each
//!
//! `SessionRegistry` is the shared table; `SessionManager` owns the
//! lifecycle and is the only writer.

mod manager;
mod model;
mod registry;

pub use manager::{SessionManager, SessionTimeouts};
pub use model::{Session, SessionStatus};
pub use registry::SessionRegistry;
