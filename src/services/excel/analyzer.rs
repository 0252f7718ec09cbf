use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use rayon::prelude::*;

use super::classifier::CURRENCY_SYMBOLS;
use super::stats::*;
use super::types::{CellValue, ColumnInfo, DataType, ImportResult, SheetData};

/// Upper bound on how many points duplicate rows can take off a sheet score.
const MAX_DUPLICATE_PENALTY: f64 = 30.0;

/// Turns an `ImportResult` into per-column statistics and quality scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataAnalyzer;

impl DataAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Stamps the result with `Utc::now()`, so two runs over the same import
    /// differ in `analysis_time`. Use [`analyze_at`](Self::analyze_at) when the
    /// output has to be bit-identical across runs.
    pub fn analyze(&self, import: &ImportResult) -> AnalysisResult {
        self.analyze_at(import, Utc::now())
    }

    /// Same as [`analyze`](Self::analyze) with a caller-supplied timestamp,
    /// making the whole result reproducible.
    pub fn analyze_at(&self, import: &ImportResult, analysis_time: DateTime<Utc>) -> AnalysisResult {
        let start = std::time::Instant::now();
        let sheets: Vec<SheetAnalysis> = import
            .sheets
            .iter()
            .map(|sheet| self.analyze_sheet(sheet))
            .collect();

        let overall_quality_score = if sheets.is_empty() {
            0.0
        } else {
            sheets.iter().map(|s| s.data_quality_score).sum::<f64>() / sheets.len() as f64
        };

        tracing::info!(
            "Analyzed {} in {:?}: {} sheets, overall quality {:.1}",
            import.file_name,
            start.elapsed(),
            sheets.len(),
            overall_quality_score
        );

        AnalysisResult {
            file_name: import.file_name.clone(),
            analysis_time,
            overall_quality_score,
            total_rows: import.total_rows,
            total_columns: import.total_columns,
            sheet_count: sheets.len(),
            sheets,
        }
    }

    pub fn analyze_sheet(&self, sheet: &SheetData) -> SheetAnalysis {
        let (duplicate_rows, completely_empty_rows) = count_row_issues(&sheet.rows);

        let column_stats: Vec<ColumnStats> = sheet
            .columns
            .par_iter()
            .map(|info| self.analyze_column(info, sheet.column_values(info.index).collect()))
            .collect();

        let mut type_summary = BTreeMap::new();
        for info in &sheet.columns {
            *type_summary.entry(info.detected_type).or_insert(0) += 1;
        }

        let data_quality_score = quality_score(&column_stats, duplicate_rows, sheet.row_count);
        tracing::debug!(
            "Sheet {}: quality {:.1}, {} duplicate rows, {} empty rows",
            sheet.name,
            data_quality_score,
            duplicate_rows,
            completely_empty_rows
        );

        SheetAnalysis {
            sheet_name: sheet.name.clone(),
            row_count: sheet.row_count,
            col_count: sheet.col_count,
            data_quality_score,
            type_summary,
            duplicate_rows,
            completely_empty_rows,
            column_stats,
        }
    }

    pub fn analyze_column(&self, info: &ColumnInfo, values: Vec<&CellValue>) -> ColumnStats {
        let completeness = if info.total_count > 0 {
            info.non_empty_count as f64 / info.total_count as f64 * 100.0
        } else {
            0.0
        };

        let non_empty: Vec<&CellValue> = values.iter().copied().filter(|v| !v.is_blank()).collect();
        let frequencies = value_frequencies(&non_empty);
        let duplicate_count = frequencies
            .iter()
            .map(|(_, count)| count.saturating_sub(1))
            .sum();

        let dtype = info.detected_type;
        let type_stats = if dtype.is_numeric() {
            NumericStats::from_values(values.iter().filter_map(|v| to_numeric(v)).collect())
                .map(TypeStats::Numeric)
        } else if dtype.is_textual() {
            let lengths: Vec<usize> = non_empty
                .iter()
                .map(|v| v.to_string().trim().chars().count())
                .collect();
            TextStats::from_lengths(&lengths).map(TypeStats::Text)
        } else if dtype == DataType::Boolean {
            Some(TypeStats::Boolean(boolean_stats(&non_empty, info.non_empty_count)))
        } else if dtype.is_calendar() {
            date_stats(&values).map(TypeStats::Date)
        } else {
            None
        };

        ColumnStats {
            header: info.header.clone(),
            data_type: dtype,
            total_count: info.total_count,
            non_empty_count: info.non_empty_count,
            empty_count: info.empty_count,
            unique_count: info.unique_count,
            completeness,
            duplicate_count,
            top_values: top_values(frequencies),
            type_stats,
        }
    }
}

/// Returns `(duplicate_rows, completely_empty_rows)`. The first occurrence of
/// a row is never a duplicate.
fn count_row_issues(rows: &[Vec<CellValue>]) -> (usize, usize) {
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut duplicates = 0;
    let mut empty = 0;

    for row in rows {
        let fingerprint: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
        if fingerprint.iter().all(|part| part.is_empty()) {
            empty += 1;
        } else if !seen.insert(fingerprint) {
            duplicates += 1;
        }
    }
    (duplicates, empty)
}

fn quality_score(columns: &[ColumnStats], duplicate_rows: usize, row_count: usize) -> f64 {
    if columns.is_empty() {
        return 0.0;
    }
    let avg_completeness =
        columns.iter().map(|c| c.completeness).sum::<f64>() / columns.len() as f64;
    let penalty =
        (duplicate_rows as f64 / row_count.max(1) as f64 * 100.0).min(MAX_DUPLICATE_PENALTY);
    (avg_completeness - penalty).max(0.0)
}

/// Stringified value counts in first-encountered order.
fn value_frequencies(values: &[&CellValue]) -> Vec<(String, usize)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in values {
        let key = value.to_string();
        match positions.get(&key) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }
    counts
}

fn top_values(mut frequencies: Vec<(String, usize)>) -> Vec<ValueCount> {
    // Stable: equal counts stay in first-encountered order.
    frequencies.sort_by(|a, b| b.1.cmp(&a.1));
    frequencies
        .into_iter()
        .take(TOP_VALUES_LIMIT)
        .map(|(value, count)| ValueCount { value, count })
        .collect()
}

/// Numeric reading of a cell. Booleans and unparseable text are excluded.
pub fn to_numeric(value: &CellValue) -> Option<f64> {
    let number = match value {
        CellValue::Int(i) => *i as f64,
        CellValue::Float(f) => *f,
        CellValue::Text(s) => {
            let cleaned = s.trim().replace(',', "").replace(&CURRENCY_SYMBOLS[..], "");
            cleaned.trim_end_matches('%').trim().parse::<f64>().ok()?
        }
        _ => return None,
    };
    number.is_finite().then_some(number)
}

pub fn is_truthy(value: &CellValue) -> bool {
    match value {
        CellValue::Bool(b) => *b,
        CellValue::Text(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes"),
        _ => false,
    }
}

fn boolean_stats(non_empty: &[&CellValue], non_empty_count: usize) -> BooleanStats {
    let true_count = non_empty.iter().filter(|v| is_truthy(v)).count();
    let false_count = non_empty.len() - true_count;
    let true_pct = if non_empty_count > 0 {
        true_count as f64 / non_empty_count as f64 * 100.0
    } else {
        0.0
    };
    BooleanStats {
        true_count,
        false_count,
        true_pct,
    }
}

fn to_datetime(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Date(d) => d.and_hms_opt(0, 0, 0),
        _ => None,
    }
}

fn date_stats(values: &[&CellValue]) -> Option<DateStats> {
    let dates: Vec<NaiveDateTime> = values.iter().filter_map(|v| to_datetime(v)).collect();
    let earliest = dates.iter().min()?;
    let latest = dates.iter().max()?;
    Some(DateStats {
        earliest: earliest.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        latest: latest.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::excel::importer::process_sheet;
    use chrono::NaiveDate;

    fn sheet(rows: Vec<Vec<CellValue>>) -> SheetData {
        process_sheet("Test", rows, true, None)
    }

    #[test]
    fn test_to_numeric() {
        assert_eq!(to_numeric(&CellValue::Int(3)), Some(3.0));
        assert_eq!(to_numeric(&CellValue::from("$1,234.50")), Some(1234.5));
        assert_eq!(to_numeric(&CellValue::from("12.5%")), Some(12.5));
        assert_eq!(to_numeric(&CellValue::from("50 \u{20ac}")), Some(50.0));
        assert_eq!(to_numeric(&CellValue::from("n/a")), None);
        assert_eq!(to_numeric(&CellValue::Bool(true)), None);
        assert_eq!(to_numeric(&CellValue::Null), None);
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(&CellValue::Bool(true)));
        assert!(is_truthy(&CellValue::from(" YES ")));
        assert!(!is_truthy(&CellValue::from("no")));
        assert!(!is_truthy(&CellValue::Int(1)));
    }

    #[test]
    fn test_outlier_scenario() {
        let data = sheet(vec![
            vec!["N".into()],
            vec![1.into()],
            vec![2.into()],
            vec![3.into()],
            vec![4.into()],
            vec![100.into()],
        ]);
        let analysis = DataAnalyzer::new().analyze_sheet(&data);
        let numeric = analysis.column("N").and_then(|c| c.numeric()).unwrap();
        assert!(numeric.has_outliers);
        assert_eq!(numeric.outlier_count, 1);
    }

    #[test]
    fn test_stray_text_excluded_from_numeric_stats() {
        let mut rows = vec![vec![CellValue::from("Qty")]];
        rows.extend((1..=9).map(|i| vec![CellValue::Int(i)]));
        rows.push(vec!["unknown".into()]);
        let analysis = DataAnalyzer::new().analyze_sheet(&sheet(rows));
        let column = analysis.column("Qty").unwrap();
        assert_eq!(column.data_type, DataType::Integer);
        assert_eq!(column.non_empty_count, 10);
        let numeric = column.numeric().unwrap();
        assert_eq!(numeric.count, 9);
        assert_eq!(numeric.sum, 45.0);
    }

    #[test]
    fn test_currency_and_percentage_columns_are_numeric() {
        let analysis = DataAnalyzer::new().analyze_sheet(&sheet(vec![
            vec!["Price".into(), "Rate".into()],
            vec!["$100".into(), "50%".into()],
            vec!["$200".into(), "75%".into()],
            vec!["$300".into(), "90%".into()],
        ]));
        let price = analysis.column("Price").unwrap();
        assert_eq!(price.data_type, DataType::Currency);
        assert_eq!(price.numeric().unwrap().sum, 600.0);
        let rate = analysis.column("Rate").unwrap();
        assert_eq!(rate.data_type, DataType::Percentage);
        assert_eq!(rate.numeric().unwrap().max, 90.0);
    }

    #[test]
    fn test_text_lengths_are_trimmed_char_counts() {
        let analysis = DataAnalyzer::new().analyze_sheet(&sheet(vec![
            vec!["City".into()],
            vec!["  Oslo ".into()],
            vec!["M\u{fc}nchen".into()],
            vec!["Rome".into()],
        ]));
        let text = analysis.column("City").and_then(|c| c.text()).unwrap();
        assert_eq!(text.min_length, 4);
        assert_eq!(text.max_length, 7);
        assert!((text.avg_length - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_boolean_counts_mixed_representations() {
        let analysis = DataAnalyzer::new().analyze_sheet(&sheet(vec![
            vec!["Active".into()],
            vec![true.into()],
            vec!["yes".into()],
            vec![false.into()],
            vec!["No".into()],
            vec![CellValue::Null],
        ]));
        let stats = analysis.column("Active").and_then(|c| c.boolean()).unwrap();
        assert_eq!(stats.true_count, 2);
        assert_eq!(stats.false_count, 2);
        assert!((stats.true_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_date_range_in_iso_format() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        let analysis = DataAnalyzer::new().analyze_sheet(&sheet(vec![
            vec!["Joined".into()],
            vec![d(2021, 3, 22).into()],
            vec![d(2019, 7, 10).and_hms_opt(9, 30, 0).unwrap().into()],
            vec![d(2022, 11, 5).into()],
        ]));
        let column = analysis.column("Joined").unwrap();
        assert_eq!(column.data_type, DataType::DateTime);
        let dates = column.dates().unwrap();
        assert_eq!(dates.earliest, "2019-07-10T09:30:00");
        assert_eq!(dates.latest, "2022-11-05T00:00:00");
    }

    #[test]
    fn test_date_range_keeps_fractional_seconds() {
        let at = |ms| {
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_milli_opt(9, 30, 0, ms)
                .unwrap()
        };
        let analysis = DataAnalyzer::new().analyze_sheet(&sheet(vec![
            vec!["Logged".into()],
            vec![at(500).into()],
            vec![at(100).into()],
        ]));
        let dates = analysis.column("Logged").and_then(|c| c.dates()).unwrap();
        assert_eq!(dates.earliest, "2024-01-01T09:30:00.100");
        assert_eq!(dates.latest, "2024-01-01T09:30:00.500");
        assert_ne!(dates.earliest, dates.latest);
    }

    #[test]
    fn test_top_values_tie_break_by_first_seen() {
        let analysis = DataAnalyzer::new().analyze_sheet(&sheet(vec![
            vec!["Tag".into()],
            vec!["b".into()],
            vec!["a".into()],
            vec!["a".into()],
            vec!["b".into()],
            vec!["c".into()],
        ]));
        let column = analysis.column("Tag").unwrap();
        let top: Vec<(&str, usize)> = column
            .top_values
            .iter()
            .map(|v| (v.value.as_str(), v.count))
            .collect();
        assert_eq!(top, vec![("b", 2), ("a", 2), ("c", 1)]);
        assert_eq!(column.duplicate_count, 2);
    }

    #[test]
    fn test_top_values_capped_at_ten() {
        let mut rows = vec![vec![CellValue::from("Code")]];
        rows.extend((0..25).map(|i| vec![CellValue::from(format!("code-{}", i))]));
        let analysis = DataAnalyzer::new().analyze_sheet(&sheet(rows));
        assert_eq!(analysis.column("Code").unwrap().top_values.len(), TOP_VALUES_LIMIT);
    }

    #[test]
    fn test_duplicate_penalty_is_capped() {
        let mut rows = vec![vec![CellValue::from("X")]];
        rows.extend((0..10).map(|_| vec![CellValue::Int(7)]));
        let analysis = DataAnalyzer::new().analyze_sheet(&sheet(rows));
        assert_eq!(analysis.duplicate_rows, 9);
        assert!((analysis.data_quality_score - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_mixed_and_empty_columns_have_no_type_stats() {
        let analysis = DataAnalyzer::new().analyze_sheet(&sheet(vec![
            vec!["M".into(), "E".into()],
            vec!["text".into(), CellValue::Null],
            vec![1.into(), CellValue::Null],
            vec!["a@b.com".into(), CellValue::Null],
        ]));
        let mixed = analysis.column("M").unwrap();
        assert_eq!(mixed.data_type, DataType::Mixed);
        assert!(mixed.type_stats.is_none());
        let empty = analysis.column("E").unwrap();
        assert_eq!(empty.data_type, DataType::Empty);
        assert!(empty.type_stats.is_none());
        assert_eq!(empty.completeness, 0.0);
    }
}
