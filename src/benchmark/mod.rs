//! Encryption benchmark runner
//!
//! Times repeated `openssl enc` round trips over a random plaintext file
//! and, optionally, `openssl kdf` derivations. Algorithms run one after the
//! other; each subprocess is timed from spawn to exit.

pub mod catalog;

use crate::models::{BenchmarkKind, BenchmarkReport, BenchmarkResult};
use crate::openssl::{KeyMaterial, OpenSsl};
use crate::process::{require_tools, CommandRunner};
use crate::utils::progress::ProgressTracker;
use crate::utils::{BenchmarkError, CommandError, Result};
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

const CHUNK: usize = 1024 * 1024;
const KDF_KEY_LEN: usize = 32;

/// Parameters for one benchmark run
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    pub algorithms: Vec<String>,
    pub file_size: u64,
    pub iterations: u32,
    pub include_kdf: bool,
    pub kdf_algorithms: Vec<String>,
    pub kdf_iterations: u32,
    pub show_progress: bool,
}

/// Runs a [`BenchmarkConfig`] against one openssl binary
pub struct BenchmarkRunner<'a> {
    runner: &'a dyn CommandRunner,
    openssl: OpenSsl<'a>,
    config: BenchmarkConfig,
}

impl<'a> BenchmarkRunner<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        openssl_binary: &str,
        config: BenchmarkConfig,
    ) -> Self {
        Self {
            runner,
            openssl: OpenSsl::new(runner, openssl_binary),
            config,
        }
    }

    /// Run every requested benchmark and assemble the report.
    ///
    /// Unsupported algorithms are reported and skipped; the caller decides
    /// the exit status with [`BenchmarkReport::check`].
    pub fn run(&self) -> Result<BenchmarkReport> {
        require_tools(
            self.runner,
            &[(self.openssl.binary(), "encryption benchmarks")],
        )?;

        let version = self.openssl.version()?;
        info!(openssl = %version, "Starting encryption benchmark");
        let ciphers = self.openssl.list_ciphers()?;
        let kdfs = if self.config.include_kdf {
            self.openssl.list_kdfs()?
        } else {
            Vec::new()
        };

        let workdir = tempfile::Builder::new().prefix("pki-ops-bench").tempdir()?;
        let plaintext = workdir.path().join("plaintext.bin");
        let digest = write_plaintext(&plaintext, self.config.file_size)?;
        debug!(path = %plaintext.display(), bytes = self.config.file_size, "Plaintext ready");

        let kdf_count = if self.config.include_kdf {
            self.config.kdf_algorithms.len()
        } else {
            0
        };
        let total =
            (self.config.algorithms.len() + kdf_count) as u64 * self.config.iterations as u64;
        let progress = ProgressTracker::new(total, self.config.show_progress);

        let mut results = Vec::new();
        for name in &self.config.algorithms {
            let name = catalog::normalize(name);
            progress.set_message(&name);
            results.push(self.bench_cipher(
                &name,
                &ciphers,
                &plaintext,
                &digest,
                workdir.path(),
                &progress,
            ));
        }

        let mut kdf_results = Vec::new();
        if self.config.include_kdf {
            for name in &self.config.kdf_algorithms {
                let name = name.trim().to_ascii_uppercase();
                progress.set_message(&name);
                kdf_results.push(self.bench_kdf(&name, &kdfs, &progress));
            }
        }
        progress.finish_and_clear();

        Ok(BenchmarkReport::new(
            version,
            self.config.file_size,
            self.config.iterations,
            results,
            kdf_results,
        ))
    }

    fn bench_cipher(
        &self,
        name: &str,
        available: &[String],
        plaintext: &Path,
        digest: &[u8],
        workdir: &Path,
        progress: &ProgressTracker,
    ) -> BenchmarkResult {
        let iterations = self.config.iterations;

        if catalog::is_aead(name) {
            warn!(
                algorithm = name,
                "AEAD ciphers are not supported by openssl enc, skipping"
            );
            progress.skip(iterations as u64);
            return BenchmarkResult::unsupported(
                name,
                BenchmarkKind::Cipher,
                iterations,
                "AEAD ciphers are not supported by openssl enc",
            );
        }
        if !available.iter().any(|c| c == name) {
            warn!(
                algorithm = name,
                "Cipher not offered by this openssl build, skipping"
            );
            progress.skip(iterations as u64);
            return BenchmarkResult::unsupported(
                name,
                BenchmarkKind::Cipher,
                iterations,
                "not offered by this openssl build",
            );
        }

        let key = key_material(name);
        let encrypted = workdir.join(format!("{}.enc", name));
        let decrypted = workdir.join(format!("{}.dec", name));
        let mut encrypt_ms = Vec::new();
        let mut decrypt_ms = Vec::new();
        let mut last_error = None;

        for iteration in 1..=iterations {
            let started = Instant::now();
            if let Err(e) = self.openssl.enc(name, &key, plaintext, &encrypted, false) {
                if let (1, CommandError::NonZeroExit { stderr, .. }) = (iteration, &e) {
                    if catalog::is_unavailable(stderr) {
                        warn!(
                            algorithm = name,
                            "Cipher is listed but cannot be loaded, skipping"
                        );
                        progress.skip(iterations as u64);
                        return BenchmarkResult::unsupported(
                            name,
                            BenchmarkKind::Cipher,
                            iterations,
                            "listed by openssl but cannot be loaded (legacy provider?)",
                        );
                    }
                }
                warn!(algorithm = name, iteration, error = %e, "Encryption failed");
                last_error = Some(e.to_string());
                progress.advance();
                continue;
            }
            let enc_elapsed = elapsed_ms(started);

            let started = Instant::now();
            if let Err(e) = self.openssl.enc(name, &key, &encrypted, &decrypted, true) {
                warn!(algorithm = name, iteration, error = %e, "Decryption failed");
                last_error = Some(e.to_string());
                progress.advance();
                continue;
            }
            let dec_elapsed = elapsed_ms(started);

            match file_digest(&decrypted) {
                Ok(actual) if actual == digest => {
                    debug!(
                        algorithm = name,
                        iteration,
                        enc_ms = enc_elapsed,
                        dec_ms = dec_elapsed,
                        "Iteration complete"
                    );
                    encrypt_ms.push(enc_elapsed);
                    decrypt_ms.push(dec_elapsed);
                }
                Ok(_) => {
                    warn!(
                        algorithm = name,
                        iteration, "Decrypted output does not match plaintext"
                    );
                    last_error = Some("decrypted output does not match plaintext".to_string());
                }
                Err(e) => {
                    warn!(
                        algorithm = name,
                        iteration,
                        error = %e,
                        "Could not read decrypted output"
                    );
                    last_error = Some(e.to_string());
                }
            }
            progress.advance();
        }

        let _ = std::fs::remove_file(&encrypted);
        let _ = std::fs::remove_file(&decrypted);

        BenchmarkResult::from_timings(
            name,
            BenchmarkKind::Cipher,
            iterations,
            &encrypt_ms,
            &decrypt_ms,
            Some(self.config.file_size),
            last_error,
        )
    }

    fn bench_kdf(
        &self,
        name: &str,
        available: &[String],
        progress: &ProgressTracker,
    ) -> BenchmarkResult {
        let iterations = self.config.iterations;

        if !available.iter().any(|k| k == name) {
            warn!(algorithm = name, "KDF not offered by this openssl build, skipping");
            progress.skip(iterations as u64);
            return BenchmarkResult::unsupported(
                name,
                BenchmarkKind::Kdf,
                iterations,
                "not offered by this openssl build",
            );
        }

        let password = random_hex(16);
        let salt = random_hex(16);
        let Some(options) =
            catalog::kdf_options(name, self.config.kdf_iterations, &password, &salt)
        else {
            warn!(algorithm = name, "No benchmark parameters for this KDF, skipping");
            progress.skip(iterations as u64);
            return BenchmarkResult::unsupported(
                name,
                BenchmarkKind::Kdf,
                iterations,
                "no benchmark parameters for this KDF",
            );
        };

        let mut samples = Vec::new();
        let mut last_error = None;
        for iteration in 1..=iterations {
            let started = Instant::now();
            match self.openssl.kdf(name, KDF_KEY_LEN, &options) {
                Ok(()) => samples.push(elapsed_ms(started)),
                Err(e) => {
                    warn!(algorithm = name, iteration, error = %e, "Key derivation failed");
                    last_error = Some(e.to_string());
                }
            }
            progress.advance();
        }

        BenchmarkResult::from_timings(
            name,
            BenchmarkKind::Kdf,
            iterations,
            &samples,
            &[],
            None,
            last_error,
        )
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn random_hex(bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..bytes).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

/// Raw key/IV for catalogued ciphers, a passphrase for anything else
fn key_material(name: &str) -> KeyMaterial {
    match catalog::lookup(name) {
        Some(spec) => KeyMaterial::Raw {
            key_hex: random_hex(spec.key_len),
            iv_hex: (spec.iv_len > 0).then(|| random_hex(spec.iv_len)),
        },
        None => KeyMaterial::Passphrase(random_hex(16)),
    }
}

/// Fill `path` with `size` random bytes; returns their SHA-256
fn write_plaintext(path: &Path, size: u64) -> std::result::Result<Vec<u8>, BenchmarkError> {
    let plaintext_error = |e: std::io::Error| BenchmarkError::Plaintext {
        message: e.to_string(),
    };

    let file = File::create(path).map_err(plaintext_error)?;
    let mut writer = BufWriter::new(file);
    let mut hasher = Sha256::new();
    let mut rng = rand::thread_rng();
    let mut buffer = vec![0u8; CHUNK];
    let mut remaining = size;

    while remaining > 0 {
        let len = remaining.min(CHUNK as u64) as usize;
        rng.fill_bytes(&mut buffer[..len]);
        writer.write_all(&buffer[..len]).map_err(plaintext_error)?;
        hasher.update(&buffer[..len]);
        remaining -= len as u64;
    }
    writer.flush().map_err(plaintext_error)?;

    Ok(hasher.finalize().to_vec())
}

fn file_digest(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize().to_vec())
}
