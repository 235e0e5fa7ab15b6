//! CLI argument definitions using clap

use crate::config::{KeyType, ReloadMethod};
use crate::utils::size::parse_size_arg;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pki-ops")]
#[command(version)]
#[command(about = "OpenSSL benchmarks, certificate rotation and CRL publishing", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Settings file (default: config/default.toml when present)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Also append log output to this file
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Benchmark openssl ciphers and key derivation functions
    Benchmark(BenchmarkArgs),

    /// Rotate (or roll back) a service certificate
    Rotate(RotateArgs),

    /// Generate CRLs for every CA in a directory and publish them
    Crl(CrlArgs),
}

#[derive(Args, Debug)]
pub struct BenchmarkArgs {
    /// Cipher to benchmark (repeatable or comma-separated)
    #[arg(short, long = "algorithm", value_name = "CIPHER", value_delimiter = ',')]
    pub algorithms: Vec<String>,

    /// Benchmark every catalogued cipher
    #[arg(long, conflicts_with = "algorithms")]
    pub all: bool,

    /// Plaintext size, e.g. 512K, 10M, 1G
    #[arg(short = 's', long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub file_size: Option<u64>,

    /// Timed runs per algorithm
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub iterations: Option<u32>,

    /// Also benchmark key derivation functions
    #[arg(long)]
    pub kdf: bool,

    /// PBKDF2 iteration count for the KDF benchmark
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub kdf_iterations: Option<u32>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the JSON report to a file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RotateArgs {
    /// Service whose certificate is rotated
    #[arg(long, required = true)]
    pub service: String,

    /// Certificate directory (default: /etc/ssl/<service>)
    #[arg(long = "cert-path", value_name = "DIR")]
    pub cert_dir: Option<PathBuf>,

    /// Submit the CSR to this CA endpoint instead of self-signing
    #[arg(long, value_name = "URL")]
    pub ca_url: Option<String>,

    /// Private key type
    #[arg(long, value_enum)]
    pub key_type: Option<KeyType>,

    /// RSA key size in bits
    #[arg(long, value_parser = clap::value_parser!(u32).range(1024..=16384))]
    pub key_size: Option<u32>,

    /// EC curve name
    #[arg(long, value_name = "CURVE")]
    pub curve: Option<String>,

    /// Validity of a self-signed certificate
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub days: Option<u32>,

    /// Certificate subject (default: /CN=<service>)
    #[arg(long)]
    pub subject: Option<String>,

    /// Subject alternative name (repeatable)
    #[arg(long = "san", value_name = "NAME")]
    pub sans: Vec<String>,

    /// Root directory for timestamped backups
    #[arg(long = "backup-dir", value_name = "DIR")]
    pub backup_root: Option<PathBuf>,

    /// State file recording the last rotation
    #[arg(long, value_name = "FILE")]
    pub state_file: Option<PathBuf>,

    /// How the service picks up the new certificate
    #[arg(long, value_enum)]
    pub reload: Option<ReloadMethod>,

    /// Only rotate when the certificate expires within DAYS
    #[arg(long, value_name = "DAYS")]
    pub renew_within: Option<i64>,

    /// Rotate even when the certificate is not due
    #[arg(long)]
    pub force: bool,

    /// Show what would happen without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Restore the backup recorded by the last rotation
    #[arg(long, conflicts_with_all = ["ca_url", "renew_within", "force", "sans", "subject"])]
    pub rollback: bool,

    /// Do not ask for confirmation before a rollback
    #[arg(short, long)]
    pub yes: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CrlArgs {
    /// Directory holding CA certificates (<name>.crt|.pem) and keys (<name>.key)
    #[arg(long, value_name = "DIR")]
    pub ca_dir: PathBuf,

    /// Directory the CRLs are published into
    #[arg(long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Days until the next CRL update
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub crl_days: Option<u32>,

    /// Serve the output directory through nginx
    #[arg(long, requires = "domain")]
    pub nginx: bool,

    /// Server name for the nginx vhost
    #[arg(long)]
    pub domain: Option<String>,

    /// Where to write the nginx vhost (default: <nginx_sites_dir>/crl-<domain>.conf)
    #[arg(long, value_name = "PATH", requires = "nginx")]
    pub nginx_config: Option<PathBuf>,

    /// Write the nginx vhost and test it, but do not reload nginx
    #[arg(long, requires = "nginx")]
    pub no_reload: bool,

    /// Install a cron.d entry that regenerates the CRLs
    #[arg(long)]
    pub install_cron: bool,

    /// Cron schedule (five fields)
    #[arg(long, value_name = "SCHEDULE", requires = "install_cron")]
    pub cron_schedule: Option<String>,

    /// cron.d file to write
    #[arg(long, value_name = "FILE", requires = "install_cron")]
    pub cron_file: Option<PathBuf>,

    /// Show what would happen without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn algorithms_split_on_commas() {
        let cli = Cli::try_parse_from([
            "pki-ops",
            "benchmark",
            "-a",
            "aes-128-cbc,aes-256-cbc",
            "--algorithm",
            "chacha20",
            "--file-size",
            "1M",
        ])
        .unwrap();
        let Commands::Benchmark(args) = cli.command else {
            panic!("expected benchmark");
        };
        assert_eq!(args.algorithms, vec!["aes-128-cbc", "aes-256-cbc", "chacha20"]);
        assert_eq!(args.file_size, Some(1_048_576));
    }

    #[test]
    fn zero_iterations_are_rejected() {
        let err = Cli::try_parse_from(["pki-ops", "benchmark", "-n", "0"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn rotate_requires_service() {
        let err = Cli::try_parse_from(["pki-ops", "rotate", "--dry-run"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn nginx_requires_domain() {
        let err = Cli::try_parse_from([
            "pki-ops",
            "crl",
            "--ca-dir",
            "/ca",
            "--output-dir",
            "/out",
            "--nginx",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "pki-ops",
            "rotate",
            "--service",
            "web",
            "--reload",
            "none",
            "-v",
            "--no-color",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(cli.no_color);
        let Commands::Rotate(args) = cli.command else {
            panic!("expected rotate");
        };
        assert_eq!(args.reload, Some(ReloadMethod::None));
    }
}
