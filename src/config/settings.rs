//! Application settings configuration
//!
//! Defines tool paths, benchmark defaults, rotation defaults and CRL
//! publishing defaults. Every value can be overridden on the command line.

use crate::utils::{size_to_bytes, ConfigError};
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// How a service picks up a rotated certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReloadMethod {
    /// `systemctl reload <service>`
    Systemctl,
    /// `nginx -t` then `nginx -s reload`
    Nginx,
    /// Leave the service alone
    None,
}

impl std::fmt::Display for ReloadMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReloadMethod::Systemctl => write!(f, "systemctl"),
            ReloadMethod::Nginx => write!(f, "nginx"),
            ReloadMethod::None => write!(f, "none"),
        }
    }
}

/// Private key family generated during rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Rsa,
    Ec,
}

/// openssl settings
#[derive(Debug, Clone, Deserialize)]
pub struct OpensslSettings {
    /// Binary name or absolute path
    #[serde(default = "default_openssl_binary")]
    pub binary: String,
}

fn default_openssl_binary() -> String {
    "openssl".to_string()
}

impl Default for OpensslSettings {
    fn default() -> Self {
        Self {
            binary: default_openssl_binary(),
        }
    }
}

/// Encryption benchmark defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BenchmarkSettings {
    pub algorithms: Vec<String>,
    pub kdf_algorithms: Vec<String>,
    /// Plaintext size, e.g. `10M`
    pub file_size: String,
    pub iterations: u32,
    /// PBKDF2 rounds
    pub kdf_iterations: u32,
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            algorithms: vec![
                "aes-128-cbc".to_string(),
                "aes-256-cbc".to_string(),
                "aes-256-ctr".to_string(),
                "chacha20".to_string(),
            ],
            kdf_algorithms: vec![
                "PBKDF2".to_string(),
                "SCRYPT".to_string(),
                "ARGON2ID".to_string(),
            ],
            file_size: "10M".to_string(),
            iterations: 5,
            kdf_iterations: 100_000,
        }
    }
}

impl BenchmarkSettings {
    /// Plaintext size in bytes
    pub fn file_size_bytes(&self) -> Result<u64, ConfigError> {
        size_to_bytes(&self.file_size).map_err(|e| ConfigError::InvalidValue {
            key: "benchmark.file_size".to_string(),
            message: e.to_string(),
        })
    }
}

/// Certificate rotation defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RotationSettings {
    /// Parent of per-service cert directories (`<cert_root>/<service>`)
    pub cert_root: PathBuf,
    /// Where timestamped backups and state files go
    pub backup_root: PathBuf,
    pub key_type: KeyType,
    pub key_size: u32,
    pub ec_curve: String,
    pub days: u32,
    pub reload: ReloadMethod,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self {
            cert_root: PathBuf::from("/etc/ssl"),
            backup_root: PathBuf::from("/var/backups/pki-ops"),
            key_type: KeyType::Rsa,
            key_size: 2048,
            ec_curve: "P-256".to_string(),
            days: 365,
            reload: ReloadMethod::Systemctl,
        }
    }
}

/// CRL distribution defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrlSettings {
    pub crl_days: u32,
    pub cron_schedule: String,
    pub cron_file: PathBuf,
    /// Directory the generated vhost is written to
    pub nginx_sites_dir: PathBuf,
    /// Log file the cron job appends to
    pub cron_log: PathBuf,
}

impl Default for CrlSettings {
    fn default() -> Self {
        Self {
            crl_days: 30,
            cron_schedule: "0 */6 * * *".to_string(),
            cron_file: PathBuf::from("/etc/cron.d/pki-ops-crl"),
            nginx_sites_dir: PathBuf::from("/etc/nginx/conf.d"),
            cron_log: PathBuf::from("/var/log/pki-ops-crl.log"),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Append logs to this file in addition to stderr
    pub file: Option<PathBuf>,
}

/// Application settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub openssl: OpensslSettings,
    #[serde(default)]
    pub benchmark: BenchmarkSettings,
    #[serde(default)]
    pub rotation: RotationSettings,
    #[serde(default)]
    pub crl: CrlSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load settings from the default config file
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_path = Path::new(DEFAULT_CONFIG_PATH);
        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.benchmark.file_size_bytes()?;
        if self.benchmark.iterations == 0 {
            return Err(ConfigError::InvalidValue {
                key: "benchmark.iterations".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.crl.cron_schedule.split_whitespace().count() != 5 {
            return Err(ConfigError::InvalidValue {
                key: "crl.cron_schedule".to_string(),
                message: "expected five cron fields".to_string(),
            });
        }
        Ok(())
    }
}
