use serde::ser::SerializeSeq;
use serde::Serializer;

use super::types::CellValue;

/// Spreadsheet column letter for a 1-based column position (1 -> A, 27 -> AA).
pub fn column_letter(position: usize) -> String {
    let mut n = position;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Last path segment, accepting both separators.
pub fn file_name_from_path(path: &str) -> String {
    path.rsplit(&['/', '\\'][..])
        .next()
        .unwrap_or(path)
        .to_string()
}

/// Integral floats keep a trailing `.0` so they stay distinguishable from integers.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn round_1<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 1))
}

pub fn round_4<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 4))
}

pub fn serialize_display_values<S: Serializer>(
    values: &[CellValue],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for value in values {
        seq.serialize_element(&value.to_string())?;
    }
    seq.end()
}
