//! Application glue module
//!
//! Configuration and logging.

mod config;
pub mod logging;

pub use config::{ColorConfig, ConfigError, DisplayConfig, FontConfig, WindowConfig};
