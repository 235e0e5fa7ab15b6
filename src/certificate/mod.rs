//! Certificate inspection
//!
//! Reads PEM certificate files with the `pem` and `x509-parser` crates to
//! decide whether a rotation is due and to verify what a rotation produced.

use crate::utils::RotationError;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use sha2::Digest;
use std::path::Path;
use x509_parser::prelude::*;

/// The parts of a certificate the rotation runner cares about
#[derive(Debug, Clone, Serialize)]
pub struct CertificateSummary {
    pub subject: String,
    pub issuer: String,
    pub not_after: DateTime<Utc>,
    pub days_until_expiry: i64,
    /// SHA-256 over the DER encoding, colon-separated upper-case hex
    pub fingerprint: String,
}

impl CertificateSummary {
    /// Whether the certificate expires within `days` (or already has)
    pub fn expires_within(&self, days: i64) -> bool {
        self.days_until_expiry <= days
    }
}

/// Inspect the first certificate in a PEM file
pub fn inspect_pem_file(path: &Path) -> Result<CertificateSummary, RotationError> {
    let data = std::fs::read(path).map_err(|e| RotationError::InvalidCertificate {
        message: format!("{}: {}", path.display(), e),
    })?;
    inspect_pem(&data)
}

/// Inspect the first `CERTIFICATE` block of PEM data
pub fn inspect_pem(data: &[u8]) -> Result<CertificateSummary, RotationError> {
    let der = first_certificate_der(data)?;
    inspect_der(&der)
}

/// DER bytes of the first `CERTIFICATE` block
pub fn first_certificate_der(data: &[u8]) -> Result<Vec<u8>, RotationError> {
    let blocks = ::pem::parse_many(data).map_err(|e| RotationError::InvalidCertificate {
        message: format!("failed to parse PEM: {}", e),
    })?;

    blocks
        .into_iter()
        .find(|p| p.tag() == "CERTIFICATE")
        .map(|p| p.into_contents())
        .ok_or_else(|| RotationError::InvalidCertificate {
            message: "no CERTIFICATE block found".to_string(),
        })
}

/// Inspect a DER-encoded certificate
pub fn inspect_der(der: &[u8]) -> Result<CertificateSummary, RotationError> {
    let (_, cert) =
        X509Certificate::from_der(der).map_err(|e| RotationError::InvalidCertificate {
            message: format!("failed to parse certificate: {:?}", e),
        })?;

    let not_after = asn1_time_to_datetime(cert.validity().not_after)?;
    let days_until_expiry = (not_after - Utc::now()).num_days();

    Ok(CertificateSummary {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        not_after,
        days_until_expiry,
        fingerprint: fingerprint(der),
    })
}

/// SHA-256 fingerprint in `AB:CD:...` form
pub fn fingerprint(der: &[u8]) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(der);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

fn asn1_time_to_datetime(time: ASN1Time) -> Result<DateTime<Utc>, RotationError> {
    Utc.timestamp_opt(time.timestamp(), 0)
        .single()
        .ok_or_else(|| RotationError::InvalidCertificate {
            message: "invalid timestamp in certificate".to_string(),
        })
}
