//! Shared helpers for integration tests
//!
//! `FakeRunner` stands in for openssl, nginx and systemctl. It records every
//! invocation and produces plausible output files so the runners can be
//! exercised without any of those tools installed.

#![allow(dead_code)]

use pki_ops::process::{CommandOutput, CommandRunner};
use pki_ops::utils::CommandError;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENC_LIST: &str = "Supported ciphers:\n\
    -aes-128-cbc               -aes-192-cbc               -aes-256-cbc\n\
    -aes-256-ctr               -aes-256-gcm               -bf-cbc\n\
    -chacha20\n";

pub const KDF_LIST: &str = "Provided KDFs and PDFs:\n  \
    HKDF @ default\n  \
    { 1.2.840.113549.1.5.12, PBKDF2 } @ default\n  \
    { 1.3.6.1.4.1.11591.4.11, id-scrypt, SCRYPT } @ default\n";

pub const FAKE_CSR: &str = "-----BEGIN CERTIFICATE REQUEST-----\n\
    ZmFrZSBjc3I=\n\
    -----END CERTIFICATE REQUEST-----\n";

pub const FAKE_CRL: &str = "-----BEGIN X509 CRL-----\n\
    ZmFrZSBjcmw=\n\
    -----END X509 CRL-----\n";

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

pub fn fixture(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

#[derive(Default)]
pub struct FakeRunner {
    calls: RefCell<Vec<String>>,
    /// Ciphers whose `openssl enc` always exits non-zero
    pub failing_ciphers: HashSet<String>,
    /// Listed ciphers that fail to load, like legacy-provider ones on OpenSSL 3
    pub legacy_ciphers: HashSet<String>,
    /// Programs whose every invocation exits non-zero
    pub failing_programs: HashSet<String>,
    /// Tools `locate` reports as missing
    pub missing_tools: HashSet<String>,
    /// `openssl version` banner, a 3.0 build unless set
    pub version: Option<String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_cipher(mut self, cipher: &str) -> Self {
        self.failing_ciphers.insert(cipher.to_string());
        self
    }

    pub fn legacy_cipher(mut self, cipher: &str) -> Self {
        self.legacy_ciphers.insert(cipher.to_string());
        self
    }

    pub fn failing_program(mut self, program: &str) -> Self {
        self.failing_programs.insert(program.to_string());
        self
    }

    pub fn with_version(mut self, banner: &str) -> Self {
        self.version = Some(banner.to_string());
        self
    }

    pub fn missing_tool(mut self, tool: &str) -> Self {
        self.missing_tools.insert(tool.to_string());
        self
    }

    /// Every invocation as `program arg arg ...`
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Invocations of `program` whose first argument is `subcommand`
    pub fn calls_to(&self, program: &str, subcommand: &str) -> Vec<String> {
        let prefix = format!("{} {}", program, subcommand);
        self.calls()
            .into_iter()
            .filter(|c| c == &prefix || c.starts_with(&format!("{} ", prefix)))
            .collect()
    }

    fn respond(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        if self.failing_programs.contains(program) {
            return Ok(failure("simulated failure"));
        }
        if program != "openssl" {
            return Ok(CommandOutput::ok(""));
        }

        let out = value_after(args, "-out");
        match args.first().map(String::as_str) {
            Some("version") => Ok(CommandOutput::ok(format!(
                "{}\n",
                self.version
                    .as_deref()
                    .unwrap_or("OpenSSL 3.0.13 30 Jan 2024 (fake)")
            ))),
            Some("list") => Ok(CommandOutput::ok(KDF_LIST)),
            Some("enc") if args.iter().any(|a| a == "-list") => Ok(CommandOutput::ok(ENC_LIST)),
            Some("enc") => {
                let cipher = args.get(2).map(|c| c.trim_start_matches('-')).unwrap_or("");
                if self.legacy_ciphers.contains(cipher) {
                    return Ok(failure(&format!(
                        "Error setting cipher {}\n\
                         error:0308010C:digital envelope routines:\
                         inner_evp_generic_fetch:unsupported\n",
                        cipher.to_ascii_uppercase()
                    )));
                }
                if self.failing_ciphers.contains(cipher) {
                    return Ok(failure("bad decrypt"));
                }
                if let (Some(input), Some(out)) = (value_after(args, "-in"), out) {
                    fs::copy(input, out)?;
                }
                Ok(CommandOutput::ok(""))
            }
            Some("kdf") => Ok(CommandOutput::ok("00:11:22:33\n")),
            Some("genpkey") => write_out(out, &fs::read(fixture("expiring.key"))?),
            Some("req") => write_out(out, FAKE_CSR.as_bytes()),
            Some("x509") => write_out(out, &fs::read(fixture("expiring.crt"))?),
            Some("ca") => write_out(out, FAKE_CRL.as_bytes()),
            Some("crl") => write_out(out, b"\x30\x03\x02\x01\x00"),
            _ => Ok(failure("unexpected openssl invocation")),
        }
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        self.calls
            .borrow_mut()
            .push(format!("{} {}", program, args.join(" ")).trim().to_string());
        self.respond(program, args).map_err(|e| CommandError::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })
    }

    fn locate(&self, tool: &str) -> Option<PathBuf> {
        if self.missing_tools.contains(tool) {
            None
        } else {
            Some(PathBuf::from("/usr/bin").join(tool))
        }
    }
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn write_out(out: Option<&str>, contents: &[u8]) -> std::io::Result<CommandOutput> {
    if let Some(out) = out {
        fs::write(out, contents)?;
    }
    Ok(CommandOutput::ok(""))
}

fn failure(stderr: &str) -> CommandOutput {
    CommandOutput {
        status: 1,
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Every entry under `root` with file contents (`None` for directories),
/// for before/after comparisons
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    let mut files = BTreeMap::new();
    if root.exists() {
        collect(root, &mut files);
    }
    files
}

fn collect(dir: &Path, files: &mut BTreeMap<PathBuf, Option<Vec<u8>>>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.insert(path.clone(), None);
            collect(&path, files);
        } else {
            files.insert(path.clone(), Some(fs::read(&path).unwrap()));
        }
    }
}
