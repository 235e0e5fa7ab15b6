//! pki-ops library
//!
//! Operator tooling built on the `openssl` command line:
//! - Encryption and key derivation benchmarks (`openssl enc` / `openssl kdf`)
//! - Certificate rotation with timestamped backups, state file and rollback
//! - CRL generation for every CA in a directory, published via nginx and cron
//!
//! Every external tool runs through the [`process::CommandRunner`] trait, so
//! the runners can be driven by a fake in tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pki_ops::benchmark::{BenchmarkConfig, BenchmarkRunner};
//! use pki_ops::process::SystemRunner;
//!
//! let config = BenchmarkConfig {
//!     algorithms: vec!["aes-256-cbc".into()],
//!     file_size: 10 * 1024 * 1024,
//!     iterations: 5,
//!     include_kdf: false,
//!     kdf_algorithms: vec![],
//!     kdf_iterations: 100_000,
//!     show_progress: false,
//! };
//! let report = BenchmarkRunner::new(&SystemRunner, "openssl", config).run()?;
//! println!("fastest: {:?}", report.fastest);
//! ```

pub mod benchmark;
pub mod certificate;
pub mod cli;
pub mod commands;
pub mod config;
pub mod crl;
pub mod models;
pub mod openssl;
pub mod output;
pub mod process;
pub mod rotation;
pub mod service;
pub mod utils;

// Re-export commonly used types
pub use cli::Cli;
pub use config::Settings;
pub use models::{BenchmarkReport, CrlReport, RotationOutcome, StepRecord, StepStatus};
pub use process::{CommandOutput, CommandRunner, SystemRunner};
pub use utils::{Result, ToolkitError};
