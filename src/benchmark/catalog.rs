//! Known ciphers and KDF parameter sets

/// Key and IV sizes for a cipher usable with `openssl enc`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherSpec {
    pub name: &'static str,
    pub key_len: usize,
    /// Zero for modes without an IV (ECB)
    pub iv_len: usize,
}

const fn cipher(name: &'static str, key_len: usize, iv_len: usize) -> CipherSpec {
    CipherSpec {
        name,
        key_len,
        iv_len,
    }
}

/// Ciphers benchmarked by `--all`
pub const CIPHERS: &[CipherSpec] = &[
    cipher("aes-128-cbc", 16, 16),
    cipher("aes-192-cbc", 24, 16),
    cipher("aes-256-cbc", 32, 16),
    cipher("aes-128-ctr", 16, 16),
    cipher("aes-256-ctr", 32, 16),
    cipher("aes-256-cfb", 32, 16),
    cipher("aes-256-ofb", 32, 16),
    cipher("aes-256-ecb", 32, 0),
    cipher("aria-256-cbc", 32, 16),
    cipher("camellia-128-cbc", 16, 16),
    cipher("camellia-256-cbc", 32, 16),
    cipher("chacha20", 32, 16),
    cipher("des-ede3-cbc", 24, 8),
    cipher("sm4-cbc", 16, 16),
];

/// Mode suffixes `openssl enc` rejects ("AEAD ciphers not supported")
const AEAD_MODES: &[&str] = &["gcm", "ccm", "ocb", "siv", "poly1305"];

/// Look up a catalogued cipher by name
pub fn lookup(name: &str) -> Option<&'static CipherSpec> {
    CIPHERS.iter().find(|c| c.name == name)
}

/// Whether `name` is an AEAD cipher
pub fn is_aead(name: &str) -> bool {
    AEAD_MODES.iter().any(|mode| name.contains(mode))
}

/// Errors openssl prints when a listed cipher cannot be loaded, e.g. one
/// that lives in the OpenSSL 3 legacy provider
const UNAVAILABLE_MARKERS: &[&str] = &[
    "error setting cipher",
    "unsupported",
    "unknown cipher",
    "fetch failed",
];

/// Whether `openssl enc` stderr says the cipher itself is unavailable
pub fn is_unavailable(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    UNAVAILABLE_MARKERS.iter().any(|m| stderr.contains(m))
}

/// Normalise user input: trim, lower-case, drop a leading dash
pub fn normalize(name: &str) -> String {
    name.trim().trim_start_matches('-').to_ascii_lowercase()
}

/// `-kdfopt` values for a KDF, or `None` when no parameter set is known.
///
/// `iterations` only applies to PBKDF2; scrypt and Argon2 use fixed
/// interactive-login cost parameters.
pub fn kdf_options(name: &str, iterations: u32, password: &str, salt: &str) -> Option<Vec<String>> {
    let mut options = vec![format!("pass:{}", password), format!("salt:{}", salt)];
    match name {
        "PBKDF2" => {
            options.push(format!("iter:{}", iterations));
            options.push("digest:SHA256".to_string());
        }
        "SCRYPT" => {
            options.push("n:16384".to_string());
            options.push("r:8".to_string());
            options.push("p:1".to_string());
        }
        "ARGON2ID" | "ARGON2I" | "ARGON2D" => {
            options.push("iter:3".to_string());
            options.push("memcost:65536".to_string());
            options.push("lanes:1".to_string());
        }
        _ => return None,
    }
    Some(options)
}
