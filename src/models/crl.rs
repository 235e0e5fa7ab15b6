//! CRL distribution types

use super::{StepRecord, StepStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A CA certificate and its private key sharing a file stem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaPair {
    pub name: String,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// CRL produced (or planned) for one CA
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrlResult {
    pub ca_name: String,
    pub pem_path: PathBuf,
    pub der_path: PathBuf,
    pub status: StepStatus,
}

/// Result of `pki-ops crl`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrlReport {
    pub output_dir: PathBuf,
    pub dry_run: bool,
    pub crls: Vec<CrlResult>,
    /// CA certificates skipped because their key is missing
    pub skipped: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nginx_config: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_file: Option<PathBuf>,
    pub steps: Vec<StepRecord>,
}
