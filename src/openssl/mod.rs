//! Typed wrappers over the `openssl` command line
//!
//! Each method maps to exactly one `openssl` invocation and fails with a
//! [`CommandError`] when the tool exits non-zero.

use crate::args;
use crate::process::{run_checked, CommandOutput, CommandRunner};
use crate::utils::CommandError;
use std::path::Path;

/// Key material handed to `openssl enc`
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    /// Raw hex key and optional IV (`-K` / `-iv`)
    Raw { key_hex: String, iv_hex: Option<String> },
    /// Password run through PBKDF2 by openssl itself
    Passphrase(String),
}

/// Private key algorithm for `openssl genpkey`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySpec {
    Rsa { bits: u32 },
    Ec { curve: String },
}

/// Facade over one `openssl` binary
pub struct OpenSsl<'a> {
    runner: &'a dyn CommandRunner,
    binary: String,
}

impl<'a> OpenSsl<'a> {
    pub fn new(runner: &'a dyn CommandRunner, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn run(&self, args: Vec<String>) -> Result<CommandOutput, CommandError> {
        run_checked(self.runner, &self.binary, &args)
    }

    /// `openssl version`
    pub fn version(&self) -> Result<String, CommandError> {
        Ok(self.run(args!["version"])?.stdout_text().trim().to_string())
    }

    /// Cipher names accepted by `openssl enc`, lower-case without the dash
    pub fn list_ciphers(&self) -> Result<Vec<String>, CommandError> {
        let output = self.run(args!["enc", "-list"])?;
        Ok(parse_cipher_list(&output.stdout_text()))
    }

    /// KDF names offered by the loaded providers, upper-case
    pub fn list_kdfs(&self) -> Result<Vec<String>, CommandError> {
        let output = self.run(args!["list", "-kdf-algorithms"])?;
        Ok(parse_kdf_list(&output.stdout_text()))
    }

    /// `openssl enc -e` (or `-d` when `decrypt`)
    pub fn enc(
        &self,
        cipher: &str,
        key: &KeyMaterial,
        input: &Path,
        output: &Path,
        decrypt: bool,
    ) -> Result<(), CommandError> {
        let mut args = args![
            "enc",
            if decrypt { "-d" } else { "-e" },
            format!("-{}", cipher),
            "-in",
            input.display(),
            "-out",
            output.display(),
        ];
        match key {
            KeyMaterial::Raw { key_hex, iv_hex } => {
                args.extend(args!["-K", key_hex]);
                if let Some(iv) = iv_hex {
                    args.extend(args!["-iv", iv]);
                }
            }
            KeyMaterial::Passphrase(pass) => {
                args.extend(args!["-pbkdf2", "-pass", format!("pass:{}", pass)]);
            }
        }
        self.run(args).map(|_| ())
    }

    /// `openssl kdf` deriving `key_len` bytes with the given `-kdfopt` values
    pub fn kdf(&self, name: &str, key_len: usize, options: &[String]) -> Result<(), CommandError> {
        let mut args = args!["kdf", "-keylen", key_len];
        for option in options {
            args.extend(args!["-kdfopt", option]);
        }
        args.push(name.to_string());
        self.run(args).map(|_| ())
    }

    /// `openssl genpkey` writing a PEM private key
    pub fn genpkey(&self, spec: &KeySpec, output: &Path) -> Result<(), CommandError> {
        let args = match spec {
            KeySpec::Rsa { bits } => args![
                "genpkey",
                "-algorithm",
                "RSA",
                "-pkeyopt",
                format!("rsa_keygen_bits:{}", bits),
                "-out",
                output.display(),
            ],
            KeySpec::Ec { curve } => args![
                "genpkey",
                "-algorithm",
                "EC",
                "-pkeyopt",
                format!("ec_paramgen_curve:{}", curve),
                "-out",
                output.display(),
            ],
        };
        self.run(args).map(|_| ())
    }

    /// `openssl req -new` producing a CSR for `subject` with optional SANs
    pub fn req_new(
        &self,
        key: &Path,
        subject: &str,
        sans: &[String],
        output: &Path,
    ) -> Result<(), CommandError> {
        let mut args = args!["req", "-new", "-key", key.display(), "-subj", subject];
        if !sans.is_empty() {
            let names: Vec<String> = sans.iter().map(|s| format_san(s)).collect();
            args.extend(args![
                "-addext",
                format!("subjectAltName={}", names.join(","))
            ]);
        }
        args.extend(args!["-out", output.display()]);
        self.run(args).map(|_| ())
    }

    /// `openssl x509 -req -signkey`: self-sign a CSR
    pub fn x509_self_sign(
        &self,
        csr: &Path,
        key: &Path,
        days: u32,
        output: &Path,
    ) -> Result<(), CommandError> {
        self.run(args![
            "x509",
            "-req",
            "-in",
            csr.display(),
            "-signkey",
            key.display(),
            "-days",
            days,
            "-copy_extensions",
            "copy",
            "-out",
            output.display(),
        ])
        .map(|_| ())
    }

    /// `openssl ca -gencrl` using a prepared CA database config
    pub fn ca_gencrl(
        &self,
        config: &Path,
        key: &Path,
        cert: &Path,
        crl_days: u32,
        output: &Path,
    ) -> Result<(), CommandError> {
        self.run(args![
            "ca",
            "-gencrl",
            "-batch",
            "-config",
            config.display(),
            "-keyfile",
            key.display(),
            "-cert",
            cert.display(),
            "-crldays",
            crl_days,
            "-out",
            output.display(),
        ])
        .map(|_| ())
    }

    /// `openssl crl -outform DER`: convert a PEM CRL
    pub fn crl_to_der(&self, input: &Path, output: &Path) -> Result<(), CommandError> {
        self.run(args![
            "crl",
            "-in",
            input.display(),
            "-outform",
            "DER",
            "-out",
            output.display(),
        ])
        .map(|_| ())
    }
}

/// Major version from `openssl version` output, e.g. 3 for
/// `OpenSSL 3.0.13 30 Jan 2024`. `None` for LibreSSL and unknown builds.
pub fn major_version(version: &str) -> Option<u32> {
    version
        .strip_prefix("OpenSSL ")?
        .split('.')
        .next()?
        .parse()
        .ok()
}

/// `subjectAltName` types openssl accepts as an entry prefix
const SAN_TYPES: &[&str] = &["DNS", "IP", "URI", "email", "RID", "dirName", "otherName"];

/// `DNS:` unless the entry already has a type prefix or is an IP address
fn format_san(entry: &str) -> String {
    let typed = entry.split_once(':').and_then(|(kind, value)| {
        SAN_TYPES
            .iter()
            .find(|t| t.eq_ignore_ascii_case(kind))
            .map(|t| (t, value))
    });
    if let Some((kind, value)) = typed {
        format!("{}:{}", kind, value)
    } else if entry.parse::<std::net::IpAddr>().is_ok() {
        format!("IP:{}", entry)
    } else {
        format!("DNS:{}", entry)
    }
}

/// Parse the output of `openssl enc -list`
pub fn parse_cipher_list(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("Supported ciphers"))
        .skip(1)
        .flat_map(str::split_whitespace)
        .filter_map(|token| token.strip_prefix('-'))
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Parse the output of `openssl list -kdf-algorithms`.
///
/// Lines look like `HKDF @ default` or `{ 1.2.840.113549.1.5.12, PBKDF2 } @ default`;
/// every alias on a line is returned.
pub fn parse_kdf_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_once(" @ ").map(|(names, _)| names))
        .flat_map(|names| {
            names
                .trim()
                .trim_start_matches('{')
                .trim_end_matches('}')
                .split(',')
                .map(|n| n.trim().to_ascii_uppercase())
                .filter(|n| !n.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENC_LIST: &str = "Supported ciphers:\n\
        -aes-128-cbc               -aes-128-cfb               -aes-128-cfb1\n\
        -aes-256-cbc               -chacha20\n";

    const KDF_LIST: &str = "Provided KDFs and PDFs:\n  \
        HKDF @ default\n  \
        { 1.2.840.113549.1.5.12, PBKDF2 } @ default\n  \
        { 1.3.6.1.4.1.11591.4.11, id-scrypt, SCRYPT } @ default\n";

    #[test]
    fn parses_enc_cipher_list() {
        let ciphers = parse_cipher_list(ENC_LIST);
        assert_eq!(
            ciphers,
            vec![
                "aes-128-cbc",
                "aes-128-cfb",
                "aes-128-cfb1",
                "aes-256-cbc",
                "chacha20"
            ]
        );
    }

    #[test]
    fn parses_kdf_aliases() {
        let kdfs = parse_kdf_list(KDF_LIST);
        assert!(kdfs.contains(&"HKDF".to_string()));
        assert!(kdfs.contains(&"PBKDF2".to_string()));
        assert!(kdfs.contains(&"SCRYPT".to_string()));
        assert!(kdfs.contains(&"ID-SCRYPT".to_string()));
        assert!(!kdfs.iter().any(|k| k.contains("PROVIDED")));
    }

    #[test]
    fn major_version_from_banner() {
        assert_eq!(major_version("OpenSSL 3.0.13 30 Jan 2024"), Some(3));
        assert_eq!(major_version("OpenSSL 1.1.1w  11 Sep 2023"), Some(1));
        assert_eq!(major_version("LibreSSL 3.3.6"), None);
    }

    #[test]
    fn san_entries_get_a_type_prefix() {
        assert_eq!(format_san("web.example.com"), "DNS:web.example.com");
        assert_eq!(format_san("10.0.0.1"), "IP:10.0.0.1");
        assert_eq!(format_san("::1"), "IP:::1");
        assert_eq!(format_san("email:ops@example.com"), "email:ops@example.com");
        assert_eq!(format_san("2001:db8::1"), "IP:2001:db8::1");
        assert_eq!(
            format_san("URI:https://web.example.com/"),
            "URI:https://web.example.com/"
        );
        assert_eq!(format_san("IP:2001:db8::1"), "IP:2001:db8::1");
        assert_eq!(format_san("dns:web.example.com"), "DNS:web.example.com");
    }
}
