//! CRL command implementation

use crate::cli::CrlArgs;
use crate::config::Settings;
use crate::crl::{CronOptions, CrlConfig, CrlDistributor, NginxOptions};
use crate::output;
use crate::process::CommandRunner;
use crate::utils::{Result, UsageError};
use std::path::{Path, PathBuf};

/// Merge settings with the command line into a CRL configuration.
///
/// `executable` is the binary the cron entry re-invokes.
pub fn crl_config(args: &CrlArgs, settings: &Settings, executable: &Path) -> Result<CrlConfig> {
    let defaults = &settings.crl;
    // the nginx root and the cron entry need absolute paths
    let ca_dir = std::path::absolute(&args.ca_dir)?;
    let output_dir = std::path::absolute(&args.output_dir)?;

    let nginx = if args.nginx {
        let domain = args
            .domain
            .clone()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| UsageError::MissingOption {
                option: "--domain".to_string(),
                context: "with --nginx".to_string(),
            })?;
        if domain.contains(|c: char| c.is_whitespace() || c == ';' || c == '/') {
            return Err(UsageError::InvalidValue {
                option: "--domain".to_string(),
                value: domain,
                message: "not a valid server name".to_string(),
            }
            .into());
        }
        Some(NginxOptions {
            config_path: args
                .nginx_config
                .clone()
                .unwrap_or_else(|| default_vhost_path(&defaults.nginx_sites_dir, &domain)),
            domain,
            reload: !args.no_reload,
        })
    } else {
        None
    };

    let cron = if args.install_cron {
        let schedule = args
            .cron_schedule
            .clone()
            .unwrap_or_else(|| defaults.cron_schedule.clone());
        if schedule.split_whitespace().count() != 5 {
            return Err(UsageError::InvalidValue {
                option: "--cron-schedule".to_string(),
                value: schedule,
                message: "expected five cron fields".to_string(),
            }
            .into());
        }
        Some(CronOptions {
            schedule,
            cron_file: args
                .cron_file
                .clone()
                .unwrap_or_else(|| defaults.cron_file.clone()),
            log_file: defaults.cron_log.clone(),
            executable: executable.to_path_buf(),
        })
    } else {
        None
    };

    Ok(CrlConfig {
        ca_dir,
        output_dir,
        crl_days: args.crl_days.unwrap_or(defaults.crl_days),
        nginx,
        cron,
        dry_run: args.dry_run,
    })
}

fn default_vhost_path(sites_dir: &Path, domain: &str) -> PathBuf {
    sites_dir.join(format!("crl-{}.conf", domain))
}

/// Run the crl command
pub fn run_crl(args: &CrlArgs, settings: &Settings, runner: &dyn CommandRunner) -> Result<()> {
    let executable = std::env::current_exe()?;
    let config = crl_config(args, settings, &executable)?;

    if !args.json {
        output::print_header("CRL Distribution");
    }
    let report = CrlDistributor::new(runner, &settings.openssl.binary, config).run()?;

    if args.json {
        output::print_json(&report)?;
    } else {
        output::print_crl_report(&report);
    }
    Ok(())
}
