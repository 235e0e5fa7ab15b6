//! Certificate rotation runner
//!
//! Backs up a service's certificate directory, records a state file that
//! `rollback` reads to restore that backup, generates a fresh key, CSR and
//! certificate, swaps them in, and reloads the service.
//!
//! There is no transaction: a failure after files are swapped leaves the
//! directory as it is, and the operator runs `--rollback`.

pub mod ca;

use crate::certificate::{inspect_pem_file, CertificateSummary};
use crate::config::ReloadMethod;
use crate::models::{RotationAction, RotationOutcome, RotationState, StepLog, StepRecord};
use crate::openssl::{self, KeySpec, OpenSsl};
use crate::process::{require_tools, CommandRunner};
use crate::service;
use crate::utils::fs::{copy_files, display_name, set_private_permissions};
use crate::utils::{Result, RotationError};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Everything one rotation or rollback needs to know
#[derive(Debug, Clone)]
pub struct RotationConfig {
    pub service: String,
    pub cert_dir: PathBuf,
    pub backup_root: PathBuf,
    pub state_file: PathBuf,
    pub key: KeySpec,
    pub days: u32,
    pub subject: String,
    pub sans: Vec<String>,
    pub ca_url: Option<String>,
    pub reload: ReloadMethod,
    /// Only rotate when the current certificate expires within this many days
    pub renew_within: Option<i64>,
    pub force: bool,
    pub dry_run: bool,
}

impl RotationConfig {
    pub fn cert_path(&self) -> PathBuf {
        self.cert_dir.join(format!("{}.crt", self.service))
    }

    pub fn key_path(&self) -> PathBuf {
        self.cert_dir.join(format!("{}.key", self.service))
    }

    pub fn csr_path(&self) -> PathBuf {
        self.cert_dir.join(format!("{}.csr", self.service))
    }

    /// File names a rotation writes into the certificate directory
    fn artifact_names(&self) -> [String; 3] {
        [
            format!("{}.crt", self.service),
            format!("{}.key", self.service),
            format!("{}.csr", self.service),
        ]
    }

    fn key_description(&self) -> String {
        match &self.key {
            KeySpec::Rsa { bits } => format!("RSA {}-bit", bits),
            KeySpec::Ec { curve } => format!("EC {}", curve),
        }
    }
}

/// Default state file location for a service
pub fn default_state_file(backup_root: &Path, service: &str) -> PathBuf {
    backup_root.join(format!("{}.state.json", service))
}

/// Runs rotations and rollbacks for one service
pub struct Rotator<'a> {
    runner: &'a dyn CommandRunner,
    openssl: OpenSsl<'a>,
    config: RotationConfig,
}

impl<'a> Rotator<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        openssl_binary: &str,
        config: RotationConfig,
    ) -> Self {
        Self {
            runner,
            openssl: OpenSsl::new(runner, openssl_binary),
            config,
        }
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    fn check_dependencies(&self, with_openssl: bool) -> Result<StepRecord> {
        let mut tools = Vec::new();
        if with_openssl {
            tools.push((self.openssl.binary(), "key and certificate generation"));
        }
        if let Some(tool) = service::required_tool(self.config.reload) {
            tools.push(tool);
        }
        require_tools(self.runner, &tools)?;

        let names: Vec<&str> = tools.iter().map(|(tool, _)| *tool).collect();
        Ok(StepRecord::done("Check dependencies").with_details(if names.is_empty() {
            "none required".to_string()
        } else {
            names.join(", ")
        }))
    }

    fn outcome(&self, action: RotationAction, changed: bool, log: StepLog) -> RotationOutcome {
        RotationOutcome {
            service: self.config.service.clone(),
            action,
            dry_run: self.config.dry_run,
            changed,
            steps: log.into_steps(),
            state: None,
        }
    }

    /// Summary of the certificate currently installed, when there is one
    pub fn current_certificate(&self) -> Option<CertificateSummary> {
        let path = self.config.cert_path();
        if !path.exists() {
            return None;
        }
        match inspect_pem_file(&path) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Current certificate is unreadable");
                None
            }
        }
    }

    /// Rotate the service certificate
    pub async fn rotate(&self) -> Result<RotationOutcome> {
        let config = &self.config;
        let mut log = StepLog::new(config.dry_run);

        log.push(self.check_dependencies(true)?);

        if !config.cert_dir.is_dir() {
            return Err(RotationError::CertDirMissing {
                path: config.cert_dir.clone(),
            }
            .into());
        }

        if let (Some(days), false) = (config.renew_within, config.force) {
            if let Some(current) = self.current_certificate() {
                if !current.expires_within(days) {
                    info!(
                        service = %config.service,
                        days_left = current.days_until_expiry,
                        "Certificate not due for rotation"
                    );
                    log.push(StepRecord::skipped(
                        "Rotate certificate",
                        format!(
                            "{} days until expiry, threshold is {} (use --force to rotate anyway)",
                            current.days_until_expiry, days
                        ),
                    ));
                    return Ok(self.outcome(RotationAction::Rotate, false, log));
                }
            }
        }

        let timestamp = Utc::now();
        let backup_path = config.backup_root.join(format!(
            "{}-{}",
            config.service,
            timestamp.format("%Y%m%dT%H%M%S%.3fZ")
        ));

        if config.dry_run {
            self.plan(&mut log, &backup_path);
            return Ok(self.outcome(RotationAction::Rotate, false, log));
        }

        log.perform(
            format!(
                "Back up {} to {}",
                config.cert_dir.display(),
                backup_path.display()
            ),
            || copy_files(&config.cert_dir, &backup_path),
        )?;

        // written before the cert dir changes; --rollback restores this backup
        let mut state = RotationState {
            service: config.service.clone(),
            cert_dir: config.cert_dir.clone(),
            backup_path,
            timestamp,
            fingerprint: None,
        };
        log.perform(
            format!("Record rotation state in {}", config.state_file.display()),
            || state.save(&config.state_file),
        )?;

        let staging = tempfile::Builder::new()
            .prefix(".rotate-")
            .tempdir_in(&config.cert_dir)?;
        let staged_key = staging.path().join(display_name(&config.key_path()));
        let staged_csr = staging.path().join(display_name(&config.csr_path()));
        let staged_cert = staging.path().join(display_name(&config.cert_path()));

        log.perform(
            format!("Generate {} private key", config.key_description()),
            || self.openssl.genpkey(&config.key, &staged_key),
        )?;
        log.perform(
            format!("Create certificate signing request for {}", config.subject),
            || {
                self.openssl
                    .req_new(&staged_key, &config.subject, &config.sans, &staged_csr)
            },
        )?;

        match &config.ca_url {
            None => {
                log.perform(
                    format!("Self-sign certificate valid for {} days", config.days),
                    || -> Result<()> {
                        self.require_copy_extensions()?;
                        self.openssl.x509_self_sign(
                            &staged_csr,
                            &staged_key,
                            config.days,
                            &staged_cert,
                        )?;
                        Ok(())
                    },
                )?;
            }
            Some(url) => {
                let description = format!("Submit CSR to CA at {}", url);
                let csr_pem = fs::read_to_string(&staged_csr)?;
                match ca::submit_csr(url, &csr_pem).await {
                    Ok(cert_pem) => {
                        fs::write(&staged_cert, cert_pem)?;
                        log.push(StepRecord::done(description));
                    }
                    Err(e) => {
                        log.push(StepRecord::failed(description, e.to_string()));
                        return Err(e.into());
                    }
                }
            }
        }

        let summary = match inspect_pem_file(&staged_cert) {
            Ok(summary) => summary,
            Err(e) => {
                log.push(StepRecord::failed("Verify new certificate", e.to_string()));
                return Err(e.into());
            }
        };
        log.push(
            StepRecord::done("Verify new certificate").with_details(format!(
                "{}, expires {}, SHA-256 {}",
                summary.subject,
                summary.not_after.format("%Y-%m-%d"),
                summary.fingerprint
            )),
        );
        state.fingerprint = Some(summary.fingerprint);
        state.save(&config.state_file)?;

        log.perform(
            format!("Install new certificate and key into {}", config.cert_dir.display()),
            || -> std::io::Result<()> {
                set_private_permissions(&staged_key)?;
                fs::rename(&staged_cert, config.cert_path())?;
                fs::rename(&staged_key, config.key_path())?;
                fs::rename(&staged_csr, config.csr_path())?;
                Ok(())
            },
        )?;
        drop(staging);

        self.reload(&mut log)?;

        info!(service = %config.service, "Certificate rotated");
        let mut outcome = self.outcome(RotationAction::Rotate, true, log);
        outcome.state = Some(state);
        Ok(outcome)
    }

    /// Record what a real rotation would do, touching nothing
    fn plan(&self, log: &mut StepLog, backup_path: &Path) {
        let config = &self.config;
        log.push(StepRecord::planned(format!(
            "Back up {} to {}",
            config.cert_dir.display(),
            backup_path.display()
        )));
        log.push(StepRecord::planned(format!(
            "Record rotation state in {}",
            config.state_file.display()
        )));
        log.push(StepRecord::planned(format!(
            "Generate {} private key",
            config.key_description()
        )));
        log.push(StepRecord::planned(format!(
            "Create certificate signing request for {}",
            config.subject
        )));
        log.push(StepRecord::planned(match &config.ca_url {
            Some(url) => format!("Submit CSR to CA at {}", url),
            None => format!("Self-sign certificate valid for {} days", config.days),
        }));
        log.push(StepRecord::planned(format!(
            "Install new certificate and key into {}",
            config.cert_dir.display()
        )));
        if config.reload != ReloadMethod::None {
            log.push(StepRecord::planned(format!(
                "Reload {} via {}",
                config.service, config.reload
            )));
        }
    }

    /// `x509 -copy_extensions` first appeared in OpenSSL 3.0
    fn require_copy_extensions(&self) -> Result<()> {
        let version = self.openssl.version()?;
        match openssl::major_version(&version) {
            Some(major) if major < 3 => Err(RotationError::OpensslTooOld { version }.into()),
            _ => Ok(()),
        }
    }

    fn reload(&self, log: &mut StepLog) -> Result<()> {
        let config = &self.config;
        if config.reload == ReloadMethod::None {
            log.push(StepRecord::skipped(
                format!("Reload {}", config.service),
                "reload method is none",
            ));
            return Ok(());
        }
        log.perform(
            format!("Reload {} via {}", config.service, config.reload),
            || service::reload(self.runner, config.reload, &config.service),
        )?;
        Ok(())
    }

    /// Restore the backup recorded in the state file.
    ///
    /// `confirm` is asked before anything is changed; returning false aborts.
    pub fn rollback(
        &self,
        confirm: impl FnOnce(&RotationState) -> bool,
    ) -> Result<RotationOutcome> {
        let config = &self.config;
        let state = RotationState::load(&config.state_file)?;
        if state.service != config.service {
            warn!(
                recorded = %state.service,
                requested = %config.service,
                "State file belongs to a different service"
            );
        }

        let mut log = StepLog::new(config.dry_run);
        log.push(self.check_dependencies(false)?);

        if !state.backup_path.is_dir() {
            return Err(RotationError::BackupMissing {
                path: state.backup_path.clone(),
            }
            .into());
        }

        if !config.dry_run && !confirm(&state) {
            return Err(RotationError::RollbackDeclined.into());
        }

        let artifacts = self.config.artifact_names();
        log.perform(
            format!(
                "Restore {} from {}",
                state.cert_dir.display(),
                state.backup_path.display()
            ),
            || restore_backup(&state.backup_path, &state.cert_dir, &artifacts),
        )?;

        if config.dry_run && config.reload != ReloadMethod::None {
            log.push(StepRecord::planned(format!(
                "Reload {} via {}",
                config.service, config.reload
            )));
        } else if !config.dry_run {
            self.reload(&mut log)?;
        }

        info!(service = %config.service, dry_run = config.dry_run, "Rollback finished");
        let mut outcome = self.outcome(RotationAction::Rollback, !config.dry_run, log);
        outcome.state = Some(state);
        Ok(outcome)
    }
}

/// Copy the backup over `cert_dir` and remove rotation artifacts the backup
/// did not contain, so the directory's files match the backup again.
fn restore_backup(backup: &Path, cert_dir: &Path, artifacts: &[String]) -> std::io::Result<()> {
    copy_files(backup, cert_dir)?;
    for name in artifacts {
        if !backup.join(name).exists() {
            let path = cert_dir.join(name);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
    }
    Ok(())
}
