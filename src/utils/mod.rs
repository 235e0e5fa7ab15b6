//! Utility modules for pki-ops
//!
//! This module contains error types, size helpers, progress indicators,
//! and filesystem helpers shared by the runners.

pub mod error;
pub mod fs;
pub mod progress;
pub mod size;

pub use error::{
    BenchmarkError, CommandError, ConfigError, CrlError, DependencyError, Result, RotationError,
    ToolkitError, UsageError,
};
pub use size::{bytes_to_human, size_to_bytes};
