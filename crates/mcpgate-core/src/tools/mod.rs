//! Tool catalog and routing
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  ToolInvoker                                 │
//! │    - resolves the owning session by name     │
//! │    - validates arguments, measures latency   │
//! └──────────────────────────────────────────────┘
//!           │ find_owner / llm_tools
//!           ▼
//! ┌──────────────────────────────────────────────┐
//! │  ToolCatalog (view over SessionRegistry)     │
//! │    - connected sessions only, session order  │
//! │    - first session wins duplicate names      │
//! └──────────────────────────────────────────────┘
//!           │ tools/call
//!           ▼
//!     SessionManager ──► ToolProvider (rmcp)
//! ```

mod catalog;
mod invoker;

pub use catalog::{AggregatedTool, ToolCatalog};
pub use invoker::{ToolExecution, ToolInvoker};
