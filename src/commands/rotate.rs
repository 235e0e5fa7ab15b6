//! Rotate command implementation

use crate::cli::RotateArgs;
use crate::config::{KeyType, Settings};
use crate::models::RotationState;
use crate::openssl::KeySpec;
use crate::output;
use crate::process::CommandRunner;
use crate::rotation::{default_state_file, RotationConfig, Rotator};
use crate::utils::progress::create_spinner;
use crate::utils::{Result, UsageError};
use console::Term;
use dialoguer::Confirm;

/// Merge settings with the command line into a rotation configuration
pub fn rotation_config(args: &RotateArgs, settings: &Settings) -> Result<RotationConfig> {
    let service = args.service.trim();
    let path_like = service.contains(|c: char| c == '/' || c == '\\') || service.starts_with('.');
    if service.is_empty() || path_like {
        return Err(UsageError::InvalidValue {
            option: "--service".to_string(),
            value: args.service.clone(),
            message: "must be a plain service name".to_string(),
        }
        .into());
    }

    let defaults = &settings.rotation;
    let key = match args.key_type.unwrap_or(defaults.key_type) {
        KeyType::Rsa => KeySpec::Rsa {
            bits: args.key_size.unwrap_or(defaults.key_size),
        },
        KeyType::Ec => KeySpec::Ec {
            curve: args.curve.clone().unwrap_or_else(|| defaults.ec_curve.clone()),
        },
    };

    if let Some(url) = &args.ca_url {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(UsageError::InvalidValue {
                option: "--ca-url".to_string(),
                value: url.clone(),
                message: "expected an http(s) URL".to_string(),
            }
            .into());
        }
    }

    let backup_root = args
        .backup_root
        .clone()
        .unwrap_or_else(|| defaults.backup_root.clone());

    Ok(RotationConfig {
        service: service.to_string(),
        cert_dir: args
            .cert_dir
            .clone()
            .unwrap_or_else(|| defaults.cert_root.join(service)),
        state_file: args
            .state_file
            .clone()
            .unwrap_or_else(|| default_state_file(&backup_root, service)),
        backup_root,
        key,
        days: args.days.unwrap_or(defaults.days),
        subject: args
            .subject
            .clone()
            .unwrap_or_else(|| format!("/CN={}", service)),
        sans: args.sans.clone(),
        ca_url: args.ca_url.clone(),
        reload: args.reload.unwrap_or(defaults.reload),
        renew_within: args.renew_within,
        force: args.force,
        dry_run: args.dry_run,
    })
}

/// Run the rotate command
pub async fn run_rotate(
    args: &RotateArgs,
    settings: &Settings,
    runner: &dyn CommandRunner,
) -> Result<()> {
    let config = rotation_config(args, settings)?;
    let rotator = Rotator::new(runner, &settings.openssl.binary, config);
    let interactive = Term::stderr().is_term();

    let outcome = if args.rollback {
        if !args.json {
            output::print_header(&format!("Rollback: {}", rotator.config().service));
        }
        rotator.rollback(|state| args.yes || !interactive || confirm_rollback(state))?
    } else {
        if !args.json {
            output::print_header(&format!("Certificate Rotation: {}", rotator.config().service));
            if let Some(current) = rotator.current_certificate() {
                output::print_certificate_summary(&current);
            }
        }

        let spinner = (!args.json && interactive && !args.dry_run)
            .then(|| create_spinner("Rotating certificate..."));
        let result = rotator.rotate().await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        result?
    };

    if args.json {
        output::print_json(&outcome)?;
    } else {
        output::print_rotation_outcome(&outcome);
    }
    Ok(())
}

fn confirm_rollback(state: &RotationState) -> bool {
    Confirm::new()
        .with_prompt(format!(
            "Restore {} from the backup taken {}?",
            state.cert_dir.display(),
            state.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ))
        .default(false)
        .interact()
        .unwrap_or(false)
}
