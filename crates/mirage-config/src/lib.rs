//! Configuration for the mirage world.
//!
//! Runtime-configurable settings persist to disk as RON. Every section has
//! defaults so partial or older files still load; CLI flags override the
//! loaded values.

mod cli;
mod config;
mod error;

pub use cli::{CliArgs, parse_tile};
pub use config::{
    BatchingConfig, CONFIG_FILE, Config, DebugConfig, GenerationConfig, LodConfig,
    MAX_LOAD_RADIUS, StreamingConfig,
};
pub use error::ConfigError;
