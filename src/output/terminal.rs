//! Rich terminal output formatting

use super::tables::print_table;
use crate::certificate::CertificateSummary;
use crate::models::{
    BenchmarkReport, BenchmarkResult, CrlReport, RotationAction, RotationOutcome, StepRecord,
    StepStatus,
};
use console::style;

/// Print section header
pub fn print_header(title: &str) {
    println!();
    println!("{}", style(format!("━━━ {} ━━━", title)).cyan().bold());
    println!();
}

/// Print each step with its status icon
pub fn print_steps(steps: &[StepRecord]) {
    for step in steps {
        let icon = match step.status {
            StepStatus::Done => style(step.status.icon()).green(),
            StepStatus::Planned => style(step.status.icon()).cyan(),
            StepStatus::Skipped => style(step.status.icon()).yellow(),
            StepStatus::Failed => style(step.status.icon()).red(),
        };
        let description = if step.status == StepStatus::Planned {
            format!("{} {}", style("[dry-run]").dim(), step.description)
        } else {
            step.description.clone()
        };
        println!("  {} {}", icon, description);
        if let Some(details) = &step.details {
            println!("      {}", style(details).dim());
        }
    }
}

fn format_ms(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn result_row(result: &BenchmarkResult, fastest: Option<&str>) -> Vec<String> {
    let mut name = result.algorithm.clone();
    if fastest == Some(result.algorithm.as_str()) {
        name.push_str(" ★");
    }
    vec![
        name,
        result.status.label().to_string(),
        format!("{}/{}", result.successful_iterations, result.iterations),
        format_ms(result.avg_time_ms),
        format_ms(result.min_time_ms),
        format_ms(result.max_time_ms),
        format_ms(result.avg_decrypt_ms),
        result
            .throughput_mbps
            .map(|t| format!("{:.1}", t))
            .unwrap_or_else(|| "-".to_string()),
    ]
}

/// Print a benchmark report as tables
pub fn print_benchmark_report(report: &BenchmarkReport) {
    print_header("Encryption Benchmark");
    println!("  {} {}", style("OpenSSL:").bold(), report.openssl_version);
    println!(
        "  {} {} ({} bytes), {} iteration(s)",
        style("Payload:").bold(),
        report.file_size_human,
        report.file_size_bytes,
        report.iterations
    );
    println!();

    let fastest = report.fastest.as_deref();
    let rows: Vec<Vec<String>> = report
        .results
        .iter()
        .map(|r| result_row(r, fastest))
        .collect();
    print_table(
        &[
            "Cipher",
            "Status",
            "Runs",
            "Avg enc (ms)",
            "Min (ms)",
            "Max (ms)",
            "Avg dec (ms)",
            "MB/s",
        ],
        &rows,
    );

    if !report.kdf_results.is_empty() {
        println!();
        let rows: Vec<Vec<String>> = report
            .kdf_results
            .iter()
            .map(|r| {
                vec![
                    r.algorithm.clone(),
                    r.status.label().to_string(),
                    format!("{}/{}", r.successful_iterations, r.iterations),
                    format_ms(r.avg_time_ms),
                    format_ms(r.min_time_ms),
                    format_ms(r.max_time_ms),
                ]
            })
            .collect();
        print_table(
            &["KDF", "Status", "Runs", "Avg (ms)", "Min (ms)", "Max (ms)"],
            &rows,
        );
    }

    let notes: Vec<&BenchmarkResult> = report
        .results
        .iter()
        .chain(report.kdf_results.iter())
        .filter(|r| r.error.is_some())
        .collect();
    if !notes.is_empty() {
        println!();
        for result in notes {
            if let Some(error) = &result.error {
                println!("  {} {}: {}", style("⚠").yellow(), result.algorithm, error);
            }
        }
    }

    println!();
    match &report.fastest {
        Some(name) => print_success(&format!("Fastest cipher: {}", style(name).bold())),
        None => print_warning("No cipher completed"),
    }
}

/// Print the certificate a rotation starts from
pub fn print_certificate_summary(summary: &CertificateSummary) {
    println!("  {} {}", style("Subject:").bold(), summary.subject);
    println!("  {} {}", style("Issuer:").bold(), summary.issuer);
    println!(
        "  {} {} ({})",
        style("Expires:").bold(),
        summary.not_after.format("%Y-%m-%d %H:%M:%S UTC"),
        format_expiry_days(summary.days_until_expiry)
    );
    println!("  {} {}", style("SHA-256:").bold(), summary.fingerprint);
    println!();
}

fn format_expiry_days(days: i64) -> String {
    if days < 0 {
        style(format!("expired {} days ago", days.abs()))
            .red()
            .to_string()
    } else if days <= 7 {
        style(format!("{} days left", days)).red().bold().to_string()
    } else if days <= 30 {
        style(format!("{} days left", days)).yellow().to_string()
    } else {
        style(format!("{} days left", days)).green().to_string()
    }
}

/// Print the steps and result of a rotation or rollback
pub fn print_rotation_outcome(outcome: &RotationOutcome) {
    print_steps(&outcome.steps);
    println!();

    let verb = match outcome.action {
        RotationAction::Rotate => "rotation",
        RotationAction::Rollback => "rollback",
    };
    if outcome.dry_run {
        print_info(&format!("Dry run: {} planned, nothing changed", verb));
    } else if outcome.changed {
        print_success(&format!("{} {} complete", outcome.service, verb));
    } else {
        print_info(&format!("{}: nothing to do", outcome.service));
    }

    if let (Some(state), RotationAction::Rotate) = (&outcome.state, outcome.action) {
        println!(
            "  {} {}",
            style("Backup:").bold(),
            state.backup_path.display()
        );
    }
}

/// Print the steps and generated files of a CRL run
pub fn print_crl_report(report: &CrlReport) {
    print_steps(&report.steps);
    println!();

    let rows: Vec<Vec<String>> = report
        .crls
        .iter()
        .map(|crl| {
            vec![
                crl.ca_name.clone(),
                format!("{} {:?}", crl.status.icon(), crl.status).to_lowercase(),
                crl.pem_path.display().to_string(),
                crl.der_path.display().to_string(),
            ]
        })
        .collect();
    print_table(&["CA", "Status", "PEM", "DER"], &rows);
    println!();

    if report.dry_run {
        print_info("Dry run: nothing written");
    } else {
        print_success(&format!(
            "{} CRL(s) published in {}",
            report.crls.len(),
            report.output_dir.display()
        ));
    }
    if !report.skipped.is_empty() {
        print_warning(&format!(
            "{} certificate(s) skipped for lack of a key",
            report.skipped.len()
        ));
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", style("!").yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", style("ℹ").blue(), message);
}
