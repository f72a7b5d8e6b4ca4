//! Gateway configuration
//!
//! Settings and presets are read from YAML files at the user level and the
//! workspace level; see `FileConfig::merge` for how the two combine.

mod error;
mod file;
mod settings;

pub use error::{ConfigError, ConfigResult};
pub use file::{ConfigLevel, FileConfig};
pub use settings::{CompletionConfig, GatewayConfig, PresetConfig};
