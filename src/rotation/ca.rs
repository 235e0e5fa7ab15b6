//! CA submission over HTTP
//!
//! The CA endpoint receives the CSR PEM as the request body
//! (`application/pkcs10`) and answers with the signed certificate in PEM.

use crate::certificate::first_certificate_der;
use crate::utils::RotationError;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, info};

/// Submit `csr_pem` to `url` and return the PEM certificate the CA issued
pub async fn submit_csr(url: &str, csr_pem: &str) -> Result<String, RotationError> {
    let failure = |message: String| RotationError::CaSubmission {
        url: url.to_string(),
        message,
    };

    let client = reqwest::Client::builder()
        .user_agent(concat!("pki-ops/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| failure(e.to_string()))?;

    info!(url, "Submitting CSR to CA");
    let response = client
        .post(url)
        .header(CONTENT_TYPE, "application/pkcs10")
        .header(ACCEPT, "application/x-pem-file")
        .body(csr_pem.to_string())
        .send()
        .await
        .map_err(|e| failure(e.to_string()))?;

    let status = response.status();
    let body = response.text().await.map_err(|e| failure(e.to_string()))?;
    debug!(url, %status, bytes = body.len(), "CA responded");

    if !status.is_success() {
        let snippet: String = body.chars().take(200).collect();
        return Err(failure(format!("HTTP {}: {}", status, snippet.trim())));
    }

    first_certificate_der(body.as_bytes())
        .map_err(|_| failure("response did not contain a PEM certificate".to_string()))?;

    Ok(body)
}
