//! Kubernetes resource quantity parsing and formatting

use anyhow::{bail, Context, Result};

const KI: u64 = 1024;
const MI: u64 = 1024 * KI;
const GI: u64 = 1024 * MI;
const TI: u64 = 1024 * GI;

/// Parse a Kubernetes memory quantity string into bytes
///
/// Supports plain byte counts, binary suffixes (Ki, Mi, Gi, Ti) and
/// decimal suffixes (k, M, G, T), with an optional fractional part as
/// the API server preserves them ("1.5Gi").
pub fn parse_memory_bytes(quantity: &str) -> Result<u64> {
    let s = quantity.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);

    let multiplier: u64 = match suffix {
        "" => 1,
        "Ki" => KI,
        "Mi" => MI,
        "Gi" => GI,
        "Ti" => TI,
        "k" => 1_000,
        "M" => 1_000_000,
        "G" => 1_000_000_000,
        "T" => 1_000_000_000_000,
        _ => bail!("unsupported suffix in memory quantity '{}'", quantity),
    };

    // Whole values stay in integer math; fractions go through f64 once.
    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .with_context(|| format!("memory quantity '{}' overflows", quantity));
    }

    let fractional: f64 = number
        .parse()
        .with_context(|| format!("invalid memory quantity '{}'", quantity))?;
    Ok((fractional * multiplier as f64) as u64)
}

/// Format bytes as a Kubernetes memory quantity
///
/// Values of a mebibyte or more render in Mi, smaller ones in Ki, with
/// ceiling division so the rendered form is never below the input.
pub fn format_memory(bytes: u64) -> String {
    if bytes == 0 {
        return "0".to_string();
    }
    if bytes >= MI {
        format!("{}Mi", (bytes + MI - 1) / MI)
    } else if bytes >= KI {
        format!("{}Ki", (bytes + KI - 1) / KI)
    } else {
        bytes.to_string()
    }
}

/// Format millicores as a Kubernetes CPU quantity
///
/// Whole core counts render without a suffix ("2"), everything else in
/// millicores ("625m").
pub fn format_cpu(millicores: u32) -> String {
    if millicores == 0 {
        return "0".to_string();
    }
    if millicores % 1000 == 0 {
        format!("{}", millicores / 1000)
    } else {
        format!("{}m", millicores)
    }
}
