use std::collections::HashSet;
use std::path::Path;

use bytes::Bytes;
use rayon::prelude::*;
use smallvec::SmallVec;

use super::classifier::{classify, resolve};
use super::source::{open_bytes, open_path, WorkbookSource};
use super::types::*;
use super::utils::{column_letter, file_name_from_path};
use crate::error::ImportError;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Sheets to import, in order. `None` imports every sheet.
    pub sheet_names: Option<Vec<String>>,
    pub has_header: bool,
    /// Per-sheet cap on data rows, applied after the header row is taken.
    pub max_rows: Option<usize>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            sheet_names: None,
            has_header: true,
            max_rows: None,
        }
    }
}

impl ImportOptions {
    pub fn with_sheets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sheet_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn without_header(mut self) -> Self {
        self.has_header = false;
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExcelImporter {
    options: ImportOptions,
}

impl ExcelImporter {
    pub fn new(options: ImportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Import a workbook from disk. The file handle is released before this returns.
    pub fn import_path(&self, path: impl AsRef<Path>) -> Result<ImportResult, ImportError> {
        let path = path.as_ref();
        let display = path.to_string_lossy();
        let mut workbook = open_path(path)?;
        self.import_source(&mut workbook, &display, &file_name_from_path(&display))
    }

    /// Import a workbook from an in-memory buffer; the format is sniffed from the bytes.
    pub fn import_bytes(&self, data: Bytes, file_name: &str) -> Result<ImportResult, ImportError> {
        tracing::info!("Opening workbook {} ({}KB)", file_name, data.len() / 1024);
        let mut workbook = open_bytes(data)?;
        self.import_source(&mut workbook, file_name, file_name)
    }

    pub fn import_source<S: WorkbookSource>(
        &self,
        source: &mut S,
        file_path: &str,
        file_name: &str,
    ) -> Result<ImportResult, ImportError> {
        let start = std::time::Instant::now();
        let available = source.sheet_names();
        tracing::info!("Found {} sheets: {:?}", available.len(), available);

        let mut sheets = Vec::new();
        for name in self.sheets_to_process(&available) {
            let rows = source.read_sheet(&name)?;
            let sheet = process_sheet(&name, rows, self.options.has_header, self.options.max_rows);
            tracing::debug!(
                "Imported sheet {}: {} rows, {} columns",
                sheet.name,
                sheet.row_count,
                sheet.col_count
            );
            sheets.push(sheet);
        }

        let result = ImportResult::new(file_path, file_name, sheets);
        tracing::info!(
            "Imported {} in {:?}: {} sheets, {} rows, {} columns",
            result.file_name,
            start.elapsed(),
            result.sheet_count,
            result.total_rows,
            result.total_columns
        );
        Ok(result)
    }

    /// Requested names in request order, minus duplicates and names the
    /// workbook does not have.
    fn sheets_to_process(&self, available: &[String]) -> Vec<String> {
        match &self.options.sheet_names {
            Some(requested) if !requested.is_empty() => {
                let mut seen = HashSet::new();
                requested
                    .iter()
                    .filter(|name| seen.insert(name.as_str()))
                    .filter(|name| {
                        let present = available.contains(name);
                        if !present {
                            tracing::debug!("Skipping unknown sheet {}", name);
                        }
                        present
                    })
                    .cloned()
                    .collect()
            }
            _ => available.to_vec(),
        }
    }
}

/// Normalise one sheet's raw rows into a rectangular table and profile each column.
pub fn process_sheet(
    name: &str,
    all_rows: Vec<Vec<CellValue>>,
    has_header: bool,
    max_rows: Option<usize>,
) -> SheetData {
    if all_rows.is_empty() {
        tracing::warn!("Sheet {} is empty", name);
        return SheetData::empty(name);
    }

    let col_count = all_rows.iter().map(Vec::len).max().unwrap_or(0);

    let mut rows = all_rows.into_iter();
    let raw_headers = if has_header { rows.next() } else { None };
    let data_rows: Vec<Vec<CellValue>> = rows
        .take(max_rows.unwrap_or(usize::MAX))
        .map(|mut row| {
            row.resize(col_count, CellValue::Null);
            row
        })
        .collect();

    let headers: Vec<String> = (0..col_count)
        .map(|idx| header_label(raw_headers.as_deref(), idx))
        .collect();

    let columns: Vec<ColumnInfo> = (0..col_count)
        .into_par_iter()
        .map(|idx| profile_column(idx, &headers[idx], &data_rows))
        .collect();

    SheetData {
        name: name.to_string(),
        row_count: data_rows.len(),
        col_count,
        headers,
        columns,
        rows: data_rows,
    }
}

fn header_label(raw_headers: Option<&[CellValue]>, idx: usize) -> String {
    match raw_headers.and_then(|row| row.get(idx)) {
        Some(cell) if !cell.is_blank() => cell.to_string(),
        _ => format!("Column_{}", column_letter(idx + 1)),
    }
}

fn profile_column(index: usize, header: &str, rows: &[Vec<CellValue>]) -> ColumnInfo {
    let mut type_counts = TypeHistogram::new();
    let mut distinct = HashSet::new();
    let mut sample_values = SmallVec::<[CellValue; SAMPLE_SIZE]>::new();
    let mut non_empty_count = 0;
    let mut empty_count = 0;

    for value in rows.iter().map(|row| row.get(index).unwrap_or(&NULL_CELL)) {
        let cell_type = classify(value);
        *type_counts.entry(cell_type).or_insert(0) += 1;

        if cell_type == DataType::Empty {
            empty_count += 1;
            continue;
        }
        non_empty_count += 1;
        if sample_values.len() < SAMPLE_SIZE {
            sample_values.push(value.clone());
        }
        distinct.insert(value.unique_key());
    }

    ColumnInfo {
        index,
        letter: column_letter(index + 1),
        header: header.to_string(),
        detected_type: resolve(&type_counts),
        total_count: rows.len(),
        non_empty_count,
        empty_count,
        unique_count: distinct.len(),
        sample_values,
        type_counts,
    }
}
