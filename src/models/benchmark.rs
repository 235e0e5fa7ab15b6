//! Benchmark result types

use crate::utils::{bytes_to_human, BenchmarkError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What was measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkKind {
    Cipher,
    Kdf,
}

/// Outcome of benchmarking one algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Completed,
    /// Not offered by this openssl build, or not usable with `openssl enc`
    Unsupported,
    /// Every iteration failed
    Failed,
}

impl ResultStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ResultStatus::Completed => "✓ completed",
            ResultStatus::Unsupported => "⚠ unsupported",
            ResultStatus::Failed => "✗ failed",
        }
    }
}

/// Mean, min and max of a set of millisecond samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSummary {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl TimingSummary {
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let sum: f64 = samples.iter().sum();
        let min_ms = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max_ms = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            avg_ms: sum / samples.len() as f64,
            min_ms,
            max_ms,
        })
    }
}

/// Result for a single cipher or KDF
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub algorithm: String,
    pub kind: BenchmarkKind,
    pub status: ResultStatus,
    pub iterations: u32,
    pub successful_iterations: u32,
    pub avg_time_ms: Option<f64>,
    pub min_time_ms: Option<f64>,
    pub max_time_ms: Option<f64>,
    /// Mean `openssl enc -d` time (ciphers only)
    pub avg_decrypt_ms: Option<f64>,
    /// Encryption throughput in MB/s (ciphers only)
    pub throughput_mbps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BenchmarkResult {
    /// An algorithm that was skipped before running
    pub fn unsupported(
        algorithm: impl Into<String>,
        kind: BenchmarkKind,
        iterations: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            algorithm: algorithm.into(),
            kind,
            status: ResultStatus::Unsupported,
            iterations,
            successful_iterations: 0,
            avg_time_ms: None,
            min_time_ms: None,
            max_time_ms: None,
            avg_decrypt_ms: None,
            throughput_mbps: None,
            error: Some(reason.into()),
        }
    }

    /// Build a result from the timings of the iterations that succeeded.
    ///
    /// `bytes` is the plaintext size for ciphers; throughput is only
    /// computed when it is given.
    pub fn from_timings(
        algorithm: impl Into<String>,
        kind: BenchmarkKind,
        iterations: u32,
        samples: &[f64],
        decrypt_samples: &[f64],
        bytes: Option<u64>,
        last_error: Option<String>,
    ) -> Self {
        let summary = TimingSummary::from_samples(samples);
        let status = if summary.is_some() {
            ResultStatus::Completed
        } else {
            ResultStatus::Failed
        };
        let throughput_mbps = match (summary, bytes) {
            (Some(s), Some(b)) => throughput_mbps(b, s.avg_ms),
            _ => None,
        };

        Self {
            algorithm: algorithm.into(),
            kind,
            status,
            iterations,
            successful_iterations: samples.len() as u32,
            avg_time_ms: summary.map(|s| s.avg_ms),
            min_time_ms: summary.map(|s| s.min_ms),
            max_time_ms: summary.map(|s| s.max_ms),
            avg_decrypt_ms: TimingSummary::from_samples(decrypt_samples).map(|s| s.avg_ms),
            throughput_mbps,
            error: if status == ResultStatus::Failed {
                last_error.or_else(|| Some("all iterations failed".to_string()))
            } else {
                None
            },
        }
    }
}

/// MB/s for `bytes` processed in `avg_ms`
pub fn throughput_mbps(bytes: u64, avg_ms: f64) -> Option<f64> {
    if avg_ms <= 0.0 {
        return None;
    }
    Some(bytes as f64 / (1024.0 * 1024.0) / (avg_ms / 1000.0))
}

/// Complete benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub generated_at: DateTime<Utc>,
    pub openssl_version: String,
    pub file_size_bytes: u64,
    pub file_size_human: String,
    pub iterations: u32,
    /// Cipher results in request order
    pub results: Vec<BenchmarkResult>,
    pub kdf_results: Vec<BenchmarkResult>,
    /// Completed cipher with the lowest mean encryption time
    pub fastest: Option<String>,
}

impl BenchmarkReport {
    pub fn new(
        openssl_version: String,
        file_size_bytes: u64,
        iterations: u32,
        results: Vec<BenchmarkResult>,
        kdf_results: Vec<BenchmarkResult>,
    ) -> Self {
        let fastest = fastest_algorithm(&results);
        Self {
            generated_at: Utc::now(),
            openssl_version,
            file_size_bytes,
            file_size_human: bytes_to_human(file_size_bytes),
            iterations,
            results,
            kdf_results,
            fastest,
        }
    }

    fn all_results(&self) -> impl Iterator<Item = &BenchmarkResult> {
        self.results.iter().chain(self.kdf_results.iter())
    }

    /// Err when any algorithm failed every iteration, or no cipher completed.
    ///
    /// A completed KDF alone does not count; the report is about ciphers.
    pub fn check(&self) -> Result<(), BenchmarkError> {
        let failed: Vec<&str> = self
            .all_results()
            .filter(|r| r.status == ResultStatus::Failed)
            .map(|r| r.algorithm.as_str())
            .collect();
        if !failed.is_empty() {
            return Err(BenchmarkError::AllIterationsFailed {
                algorithms: failed.join(", "),
            });
        }
        if !self
            .results
            .iter()
            .any(|r| r.status == ResultStatus::Completed)
        {
            return Err(BenchmarkError::NothingBenchmarked);
        }
        Ok(())
    }
}

/// First completed result with the minimum `avg_time_ms`
pub fn fastest_algorithm(results: &[BenchmarkResult]) -> Option<String> {
    results
        .iter()
        .filter(|r| r.status == ResultStatus::Completed)
        .filter_map(|r| r.avg_time_ms.map(|avg| (r, avg)))
        .fold(None, |best: Option<(&BenchmarkResult, f64)>, (r, avg)| match best {
            Some((_, best_avg)) if best_avg <= avg => best,
            _ => Some((r, avg)),
        })
        .map(|(r, _)| r.algorithm.clone())
}
