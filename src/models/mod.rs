//! Data models for pki-ops
//!
//! This module contains the serializable results of the three runners.

pub mod benchmark;
pub mod crl;
pub mod rotation;
pub mod step;

pub use benchmark::{BenchmarkKind, BenchmarkReport, BenchmarkResult, ResultStatus};
pub use crl::{CaPair, CrlReport, CrlResult};
pub use rotation::{RotationAction, RotationOutcome, RotationState};
pub use step::{StepLog, StepRecord, StepStatus};
