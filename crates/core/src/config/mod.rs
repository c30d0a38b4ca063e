//! Configuration loading.
//!
//! This module loads `GlobalConfig` from `.steplog/config.toml`, or from an
//! explicit file given on the command line.

pub mod error;
pub mod loader;

pub use error::ConfigError;
pub use error::ConfigResult;
pub use loader::load_config;
pub use loader::load_config_file;
