//! CRL distribution setup
//!
//! Generates a CRL for every CA certificate/key pair found in a directory,
//! publishes them in PEM and DER form, and optionally serves them through
//! nginx and regenerates them from cron.

pub mod templates;

use crate::models::{CaPair, CrlReport, CrlResult, StepLog, StepRecord, StepStatus};
use crate::openssl::OpenSsl;
use crate::process::{require_tools, CommandRunner};
use crate::service;
use crate::utils::fs::write_file;
use crate::utils::{CrlError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// First CRL number written to a fresh CA database
const INITIAL_CRL_NUMBER: &str = "1000";

/// Directory under the output dir holding per-CA `openssl ca` databases
const STATE_DIR: &str = ".ca";

/// nginx publishing options
#[derive(Debug, Clone)]
pub struct NginxOptions {
    pub domain: String,
    pub config_path: PathBuf,
    /// Run `nginx -s reload` after the config test passes
    pub reload: bool,
}

/// cron.d installation options
#[derive(Debug, Clone)]
pub struct CronOptions {
    pub schedule: String,
    pub cron_file: PathBuf,
    pub log_file: PathBuf,
    /// Binary the cron entry invokes
    pub executable: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CrlConfig {
    pub ca_dir: PathBuf,
    pub output_dir: PathBuf,
    pub crl_days: u32,
    pub nginx: Option<NginxOptions>,
    pub cron: Option<CronOptions>,
    pub dry_run: bool,
}

/// Find CA pairs in `dir`.
///
/// A pair is `<name>.crt` (or `<name>.pem`) with a sibling `<name>.key`. When
/// both `.crt` and `.pem` exist for a name the `.crt` wins. Certificates with
/// no key are returned separately. Pairs are sorted by name.
pub fn discover_ca_pairs(dir: &Path) -> std::io::Result<(Vec<CaPair>, Vec<PathBuf>)> {
    let mut certs: BTreeMap<String, PathBuf> = BTreeMap::new();
    for path in crate::utils::fs::list_files(dir)? {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext != "crt" && ext != "pem" {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match certs.get(stem) {
            Some(existing) if existing.extension().is_some_and(|e| e == "crt") => {}
            _ => {
                certs.insert(stem.to_string(), path.clone());
            }
        }
    }

    let mut pairs = Vec::new();
    let mut skipped = Vec::new();
    for (name, cert_path) in certs {
        let key_path = dir.join(format!("{}.key", name));
        if key_path.is_file() {
            pairs.push(CaPair {
                name,
                cert_path,
                key_path,
            });
        } else {
            skipped.push(cert_path);
        }
    }
    Ok((pairs, skipped))
}

/// Generates and publishes CRLs for one CA directory
pub struct CrlDistributor<'a> {
    runner: &'a dyn CommandRunner,
    openssl: OpenSsl<'a>,
    config: CrlConfig,
}

impl<'a> CrlDistributor<'a> {
    pub fn new(runner: &'a dyn CommandRunner, openssl_binary: &str, config: CrlConfig) -> Self {
        Self {
            runner,
            openssl: OpenSsl::new(runner, openssl_binary),
            config,
        }
    }

    pub fn config(&self) -> &CrlConfig {
        &self.config
    }

    pub fn run(&self) -> Result<CrlReport> {
        let config = &self.config;
        let mut log = StepLog::new(config.dry_run);

        let mut tools = vec![(self.openssl.binary(), "CRL generation")];
        if config.nginx.is_some() {
            tools.push(("nginx", "CRL publishing"));
        }
        require_tools(self.runner, &tools)?;
        log.push(StepRecord::done("Check dependencies").with_details(
            tools
                .iter()
                .map(|(tool, _)| *tool)
                .collect::<Vec<_>>()
                .join(", "),
        ));

        if !config.ca_dir.is_dir() {
            return Err(CrlError::CaDirMissing {
                path: config.ca_dir.clone(),
            }
            .into());
        }

        let (pairs, skipped) = discover_ca_pairs(&config.ca_dir)?;
        for cert in &skipped {
            warn!(cert = %cert.display(), "CA certificate has no matching key, skipping");
            log.push(StepRecord::skipped(
                format!("Generate CRL for {}", cert.display()),
                "no matching .key file",
            ));
        }
        if pairs.is_empty() {
            return Err(CrlError::NoCaPairs {
                path: config.ca_dir.clone(),
            }
            .into());
        }
        info!(count = pairs.len(), "Found CA pairs");

        log.perform(
            format!("Create output directory {}", config.output_dir.display()),
            || fs::create_dir_all(&config.output_dir),
        )?;

        let mut crls = Vec::with_capacity(pairs.len());
        for pair in &pairs {
            crls.push(self.generate(&mut log, pair)?);
        }

        let nginx_config = match &config.nginx {
            Some(nginx) => {
                self.publish(&mut log, nginx)?;
                Some(nginx.config_path.clone())
            }
            None => None,
        };

        let cron_file = match &config.cron {
            Some(cron) => {
                let entry = templates::render_cron_entry(
                    &cron.schedule,
                    &cron.executable,
                    &config.ca_dir,
                    &config.output_dir,
                    config.crl_days,
                    &cron.log_file,
                )?;
                log.perform(
                    format!("Install cron job {}", cron.cron_file.display()),
                    || write_file(&cron.cron_file, &entry),
                )?;
                Some(cron.cron_file.clone())
            }
            None => None,
        };

        Ok(CrlReport {
            output_dir: config.output_dir.clone(),
            dry_run: config.dry_run,
            crls,
            skipped,
            nginx_config,
            cron_file,
            steps: log.into_steps(),
        })
    }

    /// Produce `<name>.crl.pem` and `<name>.crl` for one CA
    fn generate(&self, log: &mut StepLog, pair: &CaPair) -> Result<CrlResult> {
        let config = &self.config;
        let state_dir = config.output_dir.join(STATE_DIR).join(&pair.name);
        let cnf_path = state_dir.join("openssl.cnf");
        let staged_pem = state_dir.join("crl.pem.tmp");
        let staged_der = state_dir.join("crl.der.tmp");
        let pem_path = config.output_dir.join(format!("{}.crl.pem", pair.name));
        let der_path = config.output_dir.join(format!("{}.crl", pair.name));

        let cnf = templates::render_openssl_config(&pair.name, &state_dir, config.crl_days)?;
        log.perform(
            format!("Prepare CA database for {}", pair.name),
            || prepare_ca_state(&state_dir, &cnf),
        )?;
        log.perform(
            format!("Generate CRL for {} valid for {} days", pair.name, config.crl_days),
            || {
                self.openssl.ca_gencrl(
                    &cnf_path,
                    &pair.key_path,
                    &pair.cert_path,
                    config.crl_days,
                    &staged_pem,
                )
            },
        )?;
        log.perform(format!("Convert {} CRL to DER", pair.name), || {
            self.openssl.crl_to_der(&staged_pem, &staged_der)
        })?;
        log.perform(
            format!("Publish {} and {}", pem_path.display(), der_path.display()),
            || -> std::io::Result<()> {
                fs::rename(&staged_pem, &pem_path)?;
                fs::rename(&staged_der, &der_path)
            },
        )?;

        Ok(CrlResult {
            ca_name: pair.name.clone(),
            pem_path,
            der_path,
            status: if log.is_dry_run() {
                StepStatus::Planned
            } else {
                StepStatus::Done
            },
        })
    }

    fn publish(&self, log: &mut StepLog, nginx: &NginxOptions) -> Result<()> {
        let vhost = templates::render_nginx_vhost(&nginx.domain, &self.config.output_dir)?;
        log.perform(
            format!("Write nginx vhost {}", nginx.config_path.display()),
            || write_file(&nginx.config_path, &vhost),
        )?;

        let checked = if nginx.reload {
            log.perform("Test and reload nginx", || service::nginx_reload(self.runner))
        } else {
            log.perform("Test nginx configuration", || service::nginx_test(self.runner))
        };
        checked.map_err(|e| CrlError::NginxConfig {
            message: e.to_string(),
        })?;

        if !nginx.reload {
            log.push(StepRecord::skipped("Reload nginx", "--no-reload given"));
        }
        Ok(())
    }
}

/// Create the `openssl ca` database files if missing and write the config.
///
/// An existing `crlnumber` is kept so CRL numbers keep increasing.
fn prepare_ca_state(state_dir: &Path, cnf: &str) -> std::io::Result<()> {
    fs::create_dir_all(state_dir)?;
    let index = state_dir.join("index.txt");
    if !index.exists() {
        fs::write(&index, "")?;
    }
    let crlnumber = state_dir.join("crlnumber");
    if !crlnumber.exists() {
        fs::write(&crlnumber, format!("{}\n", INITIAL_CRL_NUMBER))?;
    }
    fs::write(state_dir.join("openssl.cnf"), cnf)
}
