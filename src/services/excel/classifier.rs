use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{CellValue, DataType, TypeHistogram};

pub const CURRENCY_SYMBOLS: [char; 5] = ['$', '\u{20ac}', '\u{a3}', '\u{a5}', '\u{20b9}'];

/// Share of non-empty cells a single type needs to claim a mixed column.
const DOMINANT_NUMERATOR: usize = 4;
const DOMINANT_DENOMINATOR: usize = 5;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email pattern")
});
static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://\S+$").expect("valid url pattern"));
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?\(?[0-9]{1,4}\)?[-\s./0-9]{6,}$").expect("valid phone pattern")
});
static PERCENTAGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+\.?\d*\s*%$").expect("valid percentage pattern"));
static CURRENCY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[$\x{20ac}\x{a3}\x{a5}\x{20b9}]\s*-?\d[\d,]*\.?\d*$|^-?\d[\d,]*\.?\d*\s*[$\x{20ac}\x{a3}\x{a5}\x{20b9}]$",
    )
    .expect("valid currency pattern")
});
static INTEGER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("valid integer pattern"));

/// Classify a single cell. Total: every value maps to exactly one type.
pub fn classify(value: &CellValue) -> DataType {
    match value {
        CellValue::Null => DataType::Empty,
        CellValue::Bool(_) => DataType::Boolean,
        CellValue::Int(_) => DataType::Integer,
        CellValue::Float(_) => DataType::Float,
        CellValue::DateTime(_) => DataType::DateTime,
        CellValue::Date(_) => DataType::Date,
        CellValue::Time(_) => DataType::Time,
        CellValue::Text(s) => classify_text(s),
    }
}

fn classify_text(raw: &str) -> DataType {
    let s = raw.trim();
    if s.is_empty() {
        return DataType::Empty;
    }

    let lowered = s.to_lowercase();
    if matches!(lowered.as_str(), "true" | "false" | "yes" | "no") {
        return DataType::Boolean;
    }

    // Order matters: "50%" and "$100" would otherwise parse as plain numbers.
    if PERCENTAGE_PATTERN.is_match(s) {
        return DataType::Percentage;
    }
    if CURRENCY_PATTERN.is_match(s) {
        return DataType::Currency;
    }
    if EMAIL_PATTERN.is_match(s) {
        return DataType::Email;
    }
    if URL_PATTERN.is_match(s) {
        return DataType::Url;
    }
    if PHONE_PATTERN.is_match(s) {
        return DataType::Phone;
    }

    let unseparated = s.replace(',', "");
    if INTEGER_PATTERN.is_match(&unseparated) {
        return DataType::Integer;
    }
    if unseparated.parse::<f64>().is_ok() {
        return DataType::Float;
    }

    DataType::Text
}

/// Resolve a column's type from the histogram of its cell types.
pub fn resolve(histogram: &TypeHistogram) -> DataType {
    let present: Vec<(DataType, usize)> = histogram
        .iter()
        .filter(|(data_type, count)| **data_type != DataType::Empty && **count > 0)
        .map(|(data_type, count)| (*data_type, *count))
        .collect();

    // Histogram keys iterate in declaration order: Integer < Float, Date < DateTime.
    match present.as_slice() {
        [] => DataType::Empty,
        [(only, _)] => *only,
        [(DataType::Integer, _), (DataType::Float, _)] => DataType::Float,
        [(DataType::Date, _), (DataType::DateTime, _)] => DataType::DateTime,
        _ => dominant_type(&present).unwrap_or(DataType::Mixed),
    }
}

fn dominant_type(present: &[(DataType, usize)]) -> Option<DataType> {
    let total: usize = present.iter().map(|(_, count)| count).sum();
    let mut by_count = present.to_vec();
    // Stable sort keeps declaration order among equal counts.
    by_count.sort_by(|a, b| b.1.cmp(&a.1));
    by_count
        .into_iter()
        .find(|(_, count)| count * DOMINANT_DENOMINATOR >= total * DOMINANT_NUMERATOR)
        .map(|(data_type, _)| data_type)
}
