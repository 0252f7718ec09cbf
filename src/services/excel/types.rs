use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use smallvec::SmallVec;

use super::utils::{format_float, serialize_display_values};

pub const SAMPLE_SIZE: usize = 5;

/// Semantic type of a cell or, once resolved, of a whole column.
///
/// Declaration order is significant: histograms and type summaries are keyed
/// by this ordering, which also fixes the tie-break for dominant types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DataType {
    Integer,
    Float,
    Percentage,
    Currency,
    Text,
    Boolean,
    Date,
    Time,
    DateTime,
    Email,
    #[serde(rename = "URL")]
    Url,
    Phone,
    Empty,
    Mixed,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Integer => "Integer",
            DataType::Float => "Float",
            DataType::Percentage => "Percentage",
            DataType::Currency => "Currency",
            DataType::Text => "Text",
            DataType::Boolean => "Boolean",
            DataType::Date => "Date",
            DataType::Time => "Time",
            DataType::DateTime => "DateTime",
            DataType::Email => "Email",
            DataType::Url => "URL",
            DataType::Phone => "Phone",
            DataType::Empty => "Empty",
            DataType::Mixed => "Mixed",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Integer | DataType::Float | DataType::Currency | DataType::Percentage
        )
    }

    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            DataType::Text | DataType::Email | DataType::Url | DataType::Phone
        )
    }

    /// Date and DateTime columns; bare times carry no calendar position.
    pub fn is_calendar(&self) -> bool {
        matches!(self, DataType::Date | DataType::DateTime)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell as read from a workbook.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Null, or text that is blank once trimmed.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Hashable identity used for distinct-value counting. Integral floats
    /// share a key with the equal integer.
    pub fn unique_key(&self) -> ValueKey {
        match self {
            CellValue::Null => ValueKey::Null,
            CellValue::Bool(b) => ValueKey::Bool(*b),
            CellValue::Int(i) => ValueKey::Int(*i),
            CellValue::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    ValueKey::Int(*f as i64)
                } else {
                    ValueKey::Float(f.to_bits())
                }
            }
            CellValue::Text(s) => ValueKey::Text(s.clone()),
            CellValue::Date(d) => ValueKey::Date(*d),
            CellValue::DateTime(dt) => ValueKey::DateTime(*dt),
            CellValue::Time(t) => ValueKey::Time(*t),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => f.write_str(&format_float(*v)),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
        }
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Int(value as i64)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

impl From<NaiveTime> for CellValue {
    fn from(value: NaiveTime) -> Self {
        CellValue::Time(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

/// Occurrences of each cell type within one column.
pub type TypeHistogram = BTreeMap<DataType, usize>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub index: usize,
    pub letter: String,
    pub header: String,
    pub detected_type: DataType,
    pub total_count: usize,
    pub non_empty_count: usize,
    pub empty_count: usize,
    pub unique_count: usize,
    #[serde(serialize_with = "serialize_display_values")]
    pub sample_values: SmallVec<[CellValue; SAMPLE_SIZE]>,
    pub type_counts: TypeHistogram,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetData {
    pub name: String,
    pub row_count: usize,
    pub col_count: usize,
    pub headers: Vec<String>,
    pub columns: Vec<ColumnInfo>,
    #[serde(skip)]
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetData {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            row_count: 0,
            col_count: 0,
            headers: Vec::new(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).unwrap_or(&NULL_CELL))
    }

    /// First `limit` data rows rendered for display.
    pub fn preview(&self, limit: usize) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }
}

pub(crate) static NULL_CELL: CellValue = CellValue::Null;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportResult {
    pub file_path: String,
    pub file_name: String,
    pub import_time: DateTime<Utc>,
    pub total_rows: usize,
    pub total_columns: usize,
    pub sheet_count: usize,
    pub sheets: Vec<SheetData>,
}

impl ImportResult {
    pub fn new(file_path: &str, file_name: &str, sheets: Vec<SheetData>) -> Self {
        Self {
            file_path: file_path.to_string(),
            file_name: file_name.to_string(),
            import_time: Utc::now(),
            total_rows: sheets.iter().map(|s| s.row_count).sum(),
            total_columns: sheets.iter().map(|s| s.col_count).sum(),
            sheet_count: sheets.len(),
            sheets,
        }
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetData> {
        self.sheets.iter().find(|s| s.name == name)
    }
}
