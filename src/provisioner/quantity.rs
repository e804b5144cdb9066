//! Parsing of capacity quantities such as `5Gi` or `500M`.

use super::error::ProvisionError;

const BINARY: [(&str, u32); 6] = [
    ("Ki", 1),
    ("Mi", 2),
    ("Gi", 3),
    ("Ti", 4),
    ("Pi", 5),
    ("Ei", 6),
];

const DECIMAL: [(&str, u32); 6] = [
    ("k", 1),
    ("M", 2),
    ("G", 3),
    ("T", 4),
    ("P", 5),
    ("E", 6),
];

/// Parses a whole-byte quantity: plain digits, decimal suffixes
/// (`k M G T P E`) or binary suffixes (`Ki Mi Gi Ti Pi Ei`).
///
/// # Errors
///
/// Returns [`ProvisionError::InvalidQuantity`] for empty input, signs,
/// fractions, unknown suffixes and values that do not fit in `u64`.
pub fn parse_quantity(input: &str) -> Result<u64, ProvisionError> {
    let invalid = |reason: &str| ProvisionError::InvalidQuantity {
        input: input.to_owned(),
        reason: reason.to_owned(),
    };

    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(invalid("expected a whole number of bytes"));
    }

    let multiplier = if suffix.is_empty() {
        1
    } else if let Some((_, power)) = BINARY.iter().find(|(name, _)| *name == suffix) {
        1024_u64.pow(*power)
    } else if let Some((_, power)) = DECIMAL.iter().find(|(name, _)| *name == suffix) {
        1000_u64.pow(*power)
    } else {
        return Err(invalid("unsupported suffix"));
    };

    let value: u64 = digits.parse().map_err(|_| invalid("value is too large"))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| invalid("value is too large"))
}
