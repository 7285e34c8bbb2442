//! SkeinPath Settings Crate
//!
//! Loads, validates and saves the run configuration consumed by the comb and
//! fillet stages.

pub mod config;
pub mod error;

pub use config::{
    default_config_path, CombSettings, Config, FilletSettings, OutputSettings, StreamSettings,
};
pub use error::{ConfigError, SettingsError, SettingsResult};
