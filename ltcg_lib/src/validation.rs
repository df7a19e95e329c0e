use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::InvalidInput;
use crate::precision::{round3, round_integer};

pub const MAX_NAME_LENGTH: usize = 120;

/// Date layouts accepted in trade logs, tried in order.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%d-%b-%Y"];

fn symbol_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(NSE|BSE|BOM):[A-Z0-9][A-Z0-9&._-]{0,19}$").expect("symbol pattern is valid")
    })
}

/// Strip ASCII control characters (0x00-0x1F except space 0x20), trim whitespace,
/// and enforce a byte-length limit.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, InvalidInput> {
    if input.len() > max_len {
        return Err(InvalidInput(format!(
            "input exceeds maximum length of {} bytes",
            max_len
        )));
    }
    let sanitized: String = input
        .chars()
        .filter(|c| !c.is_ascii_control() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized.is_empty() {
        return Err(InvalidInput("input is empty after sanitization".to_string()));
    }
    Ok(sanitized)
}

/// Validate a security name.
pub fn validate_name(input: &str) -> Result<String, InvalidInput> {
    sanitize_text(input, MAX_NAME_LENGTH)
}

/// Validate an exchange-qualified symbol (e.g., `NSE:INFY`, `BSE:500209`).
/// Returns the symbol uppercased. Legacy `BOM:` prefixes are accepted here
/// and normalised later by the alias table.
pub fn validate_symbol(input: &str) -> Result<String, InvalidInput> {
    let upper = input.trim().to_uppercase();
    if symbol_regex().is_match(&upper) {
        Ok(upper)
    } else {
        Err(InvalidInput(format!(
            "invalid symbol '{}'. Expected EXCHANGE:CODE (e.g., NSE:INFY, BSE:500209)",
            input.trim()
        )))
    }
}

/// Validate a trade date in any of [`DATE_FORMATS`].
pub fn validate_date(input: &str) -> Result<NaiveDate, InvalidInput> {
    let trimmed = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| {
            InvalidInput(format!(
                "invalid date '{}'. Expected YYYY-MM-DD, DD-MM-YYYY, DD/MM/YYYY or DD-Mon-YYYY",
                trimmed
            ))
        })
}

fn parse_decimal(input: &str, field: &str) -> Result<Decimal, InvalidInput> {
    let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| InvalidInput(format!("{} '{}' is not a number", field, input.trim())))
}

/// Parse a money amount, rounded to 3 places. Thousands separators are ignored.
pub fn parse_amount(input: &str, field: &str) -> Result<Decimal, InvalidInput> {
    parse_decimal(input, field).map(round3)
}

/// Parse a share count, rounded half-up to a whole number.
pub fn parse_shares(input: &str) -> Result<u64, InvalidInput> {
    let value = round_integer(parse_decimal(input, "shares")?);
    if value < Decimal::ZERO {
        return Err(InvalidInput(format!(
            "shares must not be negative, got {}",
            input.trim()
        )));
    }
    value
        .to_u64()
        .ok_or_else(|| InvalidInput(format!("shares '{}' out of range", input.trim())))
}
