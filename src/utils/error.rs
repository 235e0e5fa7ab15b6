//! Custom error types for pki-ops
//!
//! This module defines domain-specific error types using `thiserror` for
//! every failure family the operator tools can hit: missing tools, bad
//! arguments, failing subprocesses, and the benchmark/rotation/CRL domains.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for pki-ops
#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error("Missing dependency: {0}")]
    Dependency(#[from] DependencyError),

    #[error("Invalid usage: {0}")]
    Usage(#[from] UsageError),

    #[error("Command failed: {0}")]
    Command(#[from] CommandError),

    #[error("Benchmark error: {0}")]
    Benchmark(#[from] BenchmarkError),

    #[error("Rotation error: {0}")]
    Rotation(#[from] RotationError),

    #[error("CRL error: {0}")]
    Crl(#[from] CrlError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolkitError {
    /// Process exit code for this error: 2 for invalid arguments, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            ToolkitError::Usage(_) => 2,
            _ => 1,
        }
    }
}

/// A required external tool could not be located
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("'{tool}' not found in PATH ({purpose})")]
    NotFound { tool: String, purpose: String },
}

/// Invalid option values or option combinations
#[derive(Error, Debug)]
pub enum UsageError {
    #[error("invalid value '{value}' for {option}: {message}")]
    InvalidValue {
        option: String,
        value: String,
        message: String,
    },

    #[error("{option} is required {context}")]
    MissingOption { option: String, context: String },
}

/// Subprocess failures
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to spawn '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("'{command}' exited with status {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },
}

/// Benchmark failures
#[derive(Error, Debug)]
pub enum BenchmarkError {
    #[error("no algorithms could be benchmarked")]
    NothingBenchmarked,

    #[error("all iterations failed for: {algorithms}")]
    AllIterationsFailed { algorithms: String },

    #[error("failed to prepare plaintext: {message}")]
    Plaintext { message: String },
}

/// Certificate rotation and rollback failures
#[derive(Error, Debug)]
pub enum RotationError {
    #[error("certificate directory does not exist: {}", path.display())]
    CertDirMissing { path: PathBuf },

    #[error("no rotation state found at {}", path.display())]
    StateMissing { path: PathBuf },

    #[error("failed to read rotation state {}: {message}", path.display())]
    StateUnreadable { path: PathBuf, message: String },

    #[error("backup directory does not exist: {}", path.display())]
    BackupMissing { path: PathBuf },

    #[error("CA submission to {url} failed: {message}")]
    CaSubmission { url: String, message: String },

    #[error("{version} is too old to self-sign; OpenSSL 3.0 or newer is required")]
    OpensslTooOld { version: String },

    #[error("generated certificate is invalid: {message}")]
    InvalidCertificate { message: String },

    #[error("rollback aborted by operator")]
    RollbackDeclined,
}

/// CRL distribution failures
#[derive(Error, Debug)]
pub enum CrlError {
    #[error("CA directory does not exist: {}", path.display())]
    CaDirMissing { path: PathBuf },

    #[error("no CA certificate/key pairs found in {}", path.display())]
    NoCaPairs { path: PathBuf },

    #[error("template rendering failed: {message}")]
    Template { message: String },

    #[error("nginx rejected the generated configuration: {message}")]
    NginxConfig { message: String },
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias using ToolkitError
pub type Result<T> = std::result::Result<T, ToolkitError>;
