//! Human-readable byte sizes
//!
//! Sizes use binary multiples: `1K` is 1024 bytes.

use crate::utils::UsageError;

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;
const TIB: u64 = GIB * 1024;

/// Parse a size such as `512`, `64K`, `100M`, `1.5G` or `2GB` into bytes
pub fn size_to_bytes(input: &str) -> Result<u64, UsageError> {
    let invalid = |message: &str| UsageError::InvalidValue {
        option: "size".to_string(),
        value: input.to_string(),
        message: message.to_string(),
    };

    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    if number.is_empty() {
        return Err(invalid("expected a number followed by an optional unit"));
    }

    let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => KIB,
        "M" | "MB" | "MIB" => MIB,
        "G" | "GB" | "GIB" => GIB,
        "T" | "TB" | "TIB" => TIB,
        _ => return Err(invalid("unknown unit (use B, K, M, G or T)")),
    };

    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| invalid("size is too large"));
    }

    let value: f64 = number
        .parse()
        .map_err(|_| invalid("expected a number followed by an optional unit"))?;
    let bytes = value * multiplier as f64;
    if !bytes.is_finite() || bytes > u64::MAX as f64 {
        return Err(invalid("size is too large"));
    }
    Ok(bytes.round() as u64)
}

/// Format a byte count with two decimals in the largest fitting unit
pub fn bytes_to_human(bytes: u64) -> String {
    let units = [(TIB, "TB"), (GIB, "GB"), (MIB, "MB"), (KIB, "KB")];
    for (size, suffix) in units {
        if bytes >= size {
            return format!("{:.2}{}", bytes as f64 / size as f64, suffix);
        }
    }
    format!("{}B", bytes)
}

/// Clap value parser for size arguments; rejects zero
pub fn parse_size_arg(input: &str) -> Result<u64, String> {
    match size_to_bytes(input) {
        Ok(0) => Err("size must be greater than zero".to_string()),
        Ok(bytes) => Ok(bytes),
        Err(e) => Err(e.to_string()),
    }
}
