use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use bytes::Bytes;
use calamine::{
    open_workbook_auto, open_workbook_auto_from_rs, Data, ExcelDateTime, Range, Reader, Sheets,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::types::CellValue;
use crate::error::ImportError;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Anything the importer can pull named sheets of cell rows from.
pub trait WorkbookSource {
    fn sheet_names(&self) -> Vec<String>;

    /// Rows of the named sheet anchored at A1. Rows may be ragged.
    fn read_sheet(&mut self, name: &str) -> Result<Vec<Vec<CellValue>>, ImportError>;
}

/// Open any calamine-supported container (xlsx, xlsm, xlsb, xls, ods) from disk.
pub fn open_path(path: &Path) -> Result<Sheets<BufReader<File>>, ImportError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(ImportError::Open(format!("{} is not a file", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ImportError::NotFound(path.display().to_string()))
        }
        Err(e) => return Err(ImportError::Io(e)),
    }

    open_workbook_auto(path).map_err(|e| {
        tracing::error!("Failed to open workbook {}: {}", path.display(), e);
        ImportError::Open(e.to_string())
    })
}

/// Open a workbook held in memory, e.g. an uploaded or downloaded file. The
/// container format is sniffed from the bytes, so xls, xlsx, xlsb and ods all work.
pub fn open_bytes(data: Bytes) -> Result<Sheets<Cursor<Bytes>>, ImportError> {
    open_workbook_auto_from_rs(Cursor::new(data)).map_err(|e| {
        tracing::error!("Failed to open Excel file: {}", e);
        ImportError::Open(e.to_string())
    })
}

fn read_calamine_sheet<RS, R>(reader: &mut R, name: &str) -> Result<Vec<Vec<CellValue>>, ImportError>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let range = reader
        .worksheet_range(name)
        .map_err(|e| ImportError::Sheet {
            sheet: name.to_string(),
            message: e.to_string(),
        })?;
    Ok(range_to_rows(&range))
}

/// Covers both on-disk (`BufReader<File>`) and in-memory (`Cursor<Bytes>`) workbooks.
impl<RS: Read + Seek> WorkbookSource for Sheets<RS> {
    fn sheet_names(&self) -> Vec<String> {
        <Self as Reader<RS>>::sheet_names(self).to_vec()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Vec<Vec<CellValue>>, ImportError> {
        read_calamine_sheet::<RS, Self>(self, name)
    }
}

/// Calamine ranges start at the first used cell; pad back to A1 so column
/// letters match the sheet.
fn range_to_rows(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    if range.is_empty() {
        return Vec::new();
    }
    let (row_offset, col_offset) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![CellValue::Null; col_offset];
        cells.extend(row.iter().map(CellValue::from));
        rows.push(cells);
    }
    rows
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => CellValue::Null,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Int(i) => CellValue::Int(*i),
            Data::Float(f) => number_cell(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => excel_datetime_cell(dt),
            Data::DateTimeIso(s) => iso_cell(s),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(e) => CellValue::Text(e.to_string()),
        }
    }
}

/// Workbook containers store every number as a float; integral values are
/// surfaced as integers.
fn number_cell(value: f64) -> CellValue {
    if value.is_finite()
        && value.fract() == 0.0
        && value >= i64::MIN as f64
        && value < i64::MAX as f64
    {
        CellValue::Int(value as i64)
    } else {
        CellValue::Float(value)
    }
}

fn excel_datetime_cell(dt: &ExcelDateTime) -> CellValue {
    let serial = dt.as_f64();
    if dt.is_duration() || (0.0..1.0).contains(&serial) {
        if let Some(time) = time_from_day_fraction(serial) {
            return CellValue::Time(time);
        }
        return CellValue::Float(serial);
    }
    dt.as_datetime()
        .map(CellValue::DateTime)
        .unwrap_or(CellValue::Float(serial))
}

fn time_from_day_fraction(serial: f64) -> Option<NaiveTime> {
    if !(0.0..1.0).contains(&serial) {
        return None;
    }
    let seconds = (serial * SECONDS_PER_DAY).round() as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds % 86_400, 0)
}

fn iso_cell(s: &str) -> CellValue {
    if let Ok(dt) = s.parse::<NaiveDateTime>() {
        CellValue::DateTime(dt)
    } else if let Ok(d) = s.parse::<NaiveDate>() {
        CellValue::Date(d)
    } else if let Ok(t) = s.parse::<NaiveTime>() {
        CellValue::Time(t)
    } else {
        CellValue::Text(s.to_string())
    }
}

/// Sheets held directly in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<(String, Vec<Vec<CellValue>>)>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: &str, rows: Vec<Vec<CellValue>>) -> Self {
        self.sheets.push((name.to_string(), rows));
        self
    }
}

impl WorkbookSource for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Vec<Vec<CellValue>>, ImportError> {
        self.sheets
            .iter()
            .find(|(sheet, _)| sheet == name)
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| ImportError::Sheet {
                sheet: name.to_string(),
                message: "no such sheet".to_string(),
            })
    }
}
