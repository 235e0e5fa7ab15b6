//! Configuration module for pki-ops
//!
//! Handles loading settings from TOML files.

pub mod settings;

pub use settings::{
    BenchmarkSettings, CrlSettings, KeyType, LoggingSettings, OpensslSettings, ReloadMethod,
    RotationSettings, Settings,
};

use crate::utils::ConfigError;
use std::path::Path;

/// Load settings from an explicit file, or from the default path if present
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    match path {
        Some(path) => Settings::load_from_file(path),
        None => Settings::load_default(),
    }
}
