//! Configuration for the skyisle world generator.
//!
//! Settings persist to disk as RON files. Every section is `#[serde(default)]`,
//! so older or partial files keep loading as new fields are added. CLI
//! arguments override whatever was loaded.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, GenerationConfig, MAX_OBJECTS_PER_SYSTEM, WorkerConfig, WorldConfig,
    default_config_dir,
};
pub use error::ConfigError;
