use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

const DATASET_ID_TOKEN_LEN: usize = 10;
const SHORT_ID_ALPHABET: &[u8] = b"23456789abcdefghijkmnpqrstuvwxyz";

pub fn system_time_to_datetime(time: SystemTime) -> Option<DateTime<Utc>> {
    Some(DateTime::<Utc>::from(time))
}

fn hash_path_metadata_digest(path: &Path, metadata: &Metadata) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(metadata.len().to_le_bytes());
    if let Ok(modified) = metadata.modified()
        && let Some(dt) = system_time_to_datetime(modified)
    {
        hasher.update(dt.to_rfc3339_opts(SecondsFormat::Micros, true).as_bytes());
    }
    hasher.finalize().into()
}

fn encode_base32_u64_prefix(value: u64, len: usize) -> String {
    let mut out = String::with_capacity(len);
    for i in 0..len {
        let shift = 64 - (i + 1) * 5;
        let idx = ((value >> shift) & 31) as usize;
        out.push(SHORT_ID_ALPHABET[idx] as char);
    }
    out
}

/// Stable identifier for a dataset file version: changes when path, size or mtime change.
pub fn hash_path_metadata(path: &Path, metadata: &Metadata) -> String {
    let digest = hash_path_metadata_digest(path, metadata);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    let value = u64::from_be_bytes(bytes);

    format!("ds-{}", encode_base32_u64_prefix(value, DATASET_ID_TOKEN_LEN))
}

pub fn column_number_to_name(column: u32) -> String {
    let mut column = column;
    let mut name = String::new();
    while column > 0 {
        let rem = ((column - 1) % 26) as u8;
        name.insert(0, (b'A' + rem) as char);
        column = (column - 1) / 26;
    }
    name
}

pub fn path_to_forward_slashes(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if raw.contains('\\') {
        raw.replace('\\', "/")
    } else {
        raw.into_owned()
    }
}

/// Rounds half-to-even to a whole number and groups digits by thousands: `12345.5` -> `"12,346"`.
pub fn format_thousands(amount: Decimal) -> String {
    let rounded = amount.round_dp(0);
    if rounded.is_zero() {
        return "0".to_string();
    }
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded.is_sign_negative() {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn column_names() {
        assert_eq!(column_number_to_name(1), "A");
        assert_eq!(column_number_to_name(26), "Z");
        assert_eq!(column_number_to_name(27), "AA");
    }

    #[test]
    fn thousands_formatting() {
        assert_eq!(format_thousands(Decimal::from(12345)), "12,345");
        assert_eq!(format_thousands(Decimal::from(999)), "999");
        assert_eq!(format_thousands(Decimal::from(1_000_000)), "1,000,000");
        assert_eq!(format_thousands(Decimal::ZERO), "0");
        assert_eq!(format_thousands(Decimal::from_str("2.5").unwrap()), "2");
        assert_eq!(format_thousands(Decimal::from_str("3.5").unwrap()), "4");
        assert_eq!(format_thousands(Decimal::from_str("-0.4").unwrap()), "0");
        assert_eq!(format_thousands(Decimal::from(-1234)), "-1,234");
    }

    #[test]
    fn forward_slashes() {
        assert_eq!(
            path_to_forward_slashes(Path::new("data\\budget.xlsx")),
            "data/budget.xlsx"
        );
    }
}
