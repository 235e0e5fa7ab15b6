//! Certificate rotation state and outcomes

use super::StepRecord;
use crate::utils::RotationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The single record persisted after a rotation and read back for rollback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationState {
    pub service: String,
    pub cert_dir: PathBuf,
    pub backup_path: PathBuf,
    pub timestamp: DateTime<Utc>,
    /// SHA-256 fingerprint of the certificate installed by the rotation
    #[serde(default)]
    pub fingerprint: Option<String>,
}

impl RotationState {
    /// Load the state file
    pub fn load(path: &Path) -> Result<Self, RotationError> {
        if !path.exists() {
            return Err(RotationError::StateMissing {
                path: path.to_path_buf(),
            });
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| RotationError::StateUnreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        serde_json::from_str(&content).map_err(|e| RotationError::StateUnreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write the state file as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, format!("{}\n", json))
    }
}

/// Which operation produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationAction {
    Rotate,
    Rollback,
}

/// Result of `pki-ops rotate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationOutcome {
    pub service: String,
    pub action: RotationAction,
    pub dry_run: bool,
    /// False when the run was skipped (certificate not due) or only planned
    pub changed: bool,
    pub steps: Vec<StepRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<RotationState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("web.state.json");
        let state = RotationState {
            service: "web".to_string(),
            cert_dir: PathBuf::from("/etc/ssl/web"),
            backup_path: PathBuf::from("/var/backups/pki-ops/web-20260101T000000Z"),
            timestamp: Utc::now(),
            fingerprint: Some("AB:CD".to_string()),
        };
        state.save(&path).unwrap();
        assert_eq!(RotationState::load(&path).unwrap(), state);
    }

    #[test]
    fn missing_state_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = RotationState::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, RotationError::StateMissing { .. }));
    }

    #[test]
    fn corrupt_state_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = RotationState::load(&path).unwrap_err();
        assert!(matches!(err, RotationError::StateUnreadable { .. }));
    }
}
