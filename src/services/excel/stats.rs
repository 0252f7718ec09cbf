use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::DataType;
use super::utils::{round_1, round_4};

pub const TOP_VALUES_LIMIT: usize = 10;
/// Minimum sample size before the IQR outlier rule is applied.
const MIN_OUTLIER_SAMPLE: usize = 4;
const IQR_FENCE: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    #[serde(serialize_with = "round_4")]
    pub sum: f64,
    #[serde(serialize_with = "round_4")]
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (N-1 denominator); 0 for a single value.
    #[serde(serialize_with = "round_4")]
    pub std_dev: f64,
    pub has_outliers: bool,
    pub outlier_count: usize,
}

impl NumericStats {
    /// `None` when there is nothing to describe.
    pub fn from_values(values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let count = values.len();
        let sum: f64 = values.iter().sum();
        let mean = sum / count as f64;
        let std_dev = sample_std_dev(&values, mean);

        let mut sorted = values;
        sorted.sort_by(f64::total_cmp);
        let median = median(&sorted)?;
        let outlier_count = iqr_outlier_count(&sorted);

        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            sum,
            mean,
            median,
            std_dev,
            has_outliers: outlier_count > 0,
            outlier_count,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextStats {
    pub min_length: usize,
    pub max_length: usize,
    #[serde(serialize_with = "round_1")]
    pub avg_length: f64,
}

impl TextStats {
    pub fn from_lengths(lengths: &[usize]) -> Option<Self> {
        let min_length = *lengths.iter().min()?;
        let max_length = *lengths.iter().max()?;
        let avg_length = lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;
        Some(Self {
            min_length,
            max_length,
            avg_length,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BooleanStats {
    pub true_count: usize,
    pub false_count: usize,
    #[serde(serialize_with = "round_1")]
    pub true_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateStats {
    pub earliest: String,
    pub latest: String,
}

/// Statistics that only exist for one family of column types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeStats {
    #[serde(rename = "numeric_stats")]
    Numeric(NumericStats),
    #[serde(rename = "text_stats")]
    Text(TextStats),
    #[serde(rename = "boolean_stats")]
    Boolean(BooleanStats),
    #[serde(rename = "date_stats")]
    Date(DateStats),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub header: String,
    pub data_type: DataType,
    pub total_count: usize,
    pub non_empty_count: usize,
    pub empty_count: usize,
    pub unique_count: usize,
    #[serde(serialize_with = "round_1")]
    pub completeness: f64,
    pub duplicate_count: usize,
    pub top_values: Vec<ValueCount>,
    #[serde(flatten)]
    pub type_stats: Option<TypeStats>,
}

impl ColumnStats {
    pub fn numeric(&self) -> Option<&NumericStats> {
        match &self.type_stats {
            Some(TypeStats::Numeric(stats)) => Some(stats),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&TextStats> {
        match &self.type_stats {
            Some(TypeStats::Text(stats)) => Some(stats),
            _ => None,
        }
    }

    pub fn boolean(&self) -> Option<&BooleanStats> {
        match &self.type_stats {
            Some(TypeStats::Boolean(stats)) => Some(stats),
            _ => None,
        }
    }

    pub fn dates(&self) -> Option<&DateStats> {
        match &self.type_stats {
            Some(TypeStats::Date(stats)) => Some(stats),
            _ => None,
        }
    }

    pub fn outlier_count(&self) -> usize {
        self.numeric().map_or(0, |stats| stats.outlier_count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetAnalysis {
    pub sheet_name: String,
    pub row_count: usize,
    pub col_count: usize,
    #[serde(serialize_with = "round_1")]
    pub data_quality_score: f64,
    pub type_summary: BTreeMap<DataType, usize>,
    pub duplicate_rows: usize,
    pub completely_empty_rows: usize,
    #[serde(rename = "columns")]
    pub column_stats: Vec<ColumnStats>,
}

impl SheetAnalysis {
    pub fn column(&self, header: &str) -> Option<&ColumnStats> {
        self.column_stats.iter().find(|c| c.header == header)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub file_name: String,
    pub analysis_time: DateTime<Utc>,
    #[serde(serialize_with = "round_1")]
    pub overall_quality_score: f64,
    pub total_rows: usize,
    pub total_columns: usize,
    pub sheet_count: usize,
    pub sheets: Vec<SheetAnalysis>,
}

/// Middle element, or the mean of the two middle elements. Input must be sorted.
pub fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

pub fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Tukey fences over positional quartiles (no interpolation). Input must be sorted.
pub fn iqr_outlier_count(sorted: &[f64]) -> usize {
    let n = sorted.len();
    if n < MIN_OUTLIER_SAMPLE {
        return 0;
    }
    let q1 = sorted[n / 4];
    let q3 = sorted[3 * n / 4];
    let iqr = q3 - q1;
    let lower = q1 - IQR_FENCE * iqr;
    let upper = q3 + IQR_FENCE * iqr;
    sorted.iter().filter(|x| **x < lower || **x > upper).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[25.0, 28.0, 30.0, 35.0, 40.0]), Some(30.0));
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
    }

    #[test]
    fn test_sample_std_dev() {
        assert_eq!(sample_std_dev(&[5.0], 5.0), 0.0);
        // 2, 4, 4, 4, 5, 5, 7, 9: sample variance 32/7
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(approx(sample_std_dev(&values, 5.0), (32.0f64 / 7.0).sqrt()));
    }

    #[test]
    fn test_iqr_outliers() {
        assert_eq!(iqr_outlier_count(&[1.0, 2.0, 3.0, 4.0, 100.0]), 1);
        assert_eq!(iqr_outlier_count(&[1.0, 2.0, 3.0, 4.0, 5.0]), 0);
        // Too few values to judge.
        assert_eq!(iqr_outlier_count(&[1.0, 2.0, 1000.0]), 0);
    }

    #[test]
    fn test_numeric_stats_from_values() {
        let stats = NumericStats::from_values(vec![30.0, 25.0, 35.0, 28.0, 40.0]).unwrap();
        assert_eq!(stats.min, 25.0);
        assert_eq!(stats.max, 40.0);
        assert_eq!(stats.median, 30.0);
        assert_eq!(stats.sum, 158.0);
        assert!(approx(stats.mean, 31.6));
        assert!(!stats.has_outliers);
        assert!(NumericStats::from_values(Vec::new()).is_none());
    }

    #[test]
    fn test_text_stats_from_lengths() {
        let stats = TextStats::from_lengths(&[3, 5, 10]).unwrap();
        assert_eq!(stats.min_length, 3);
        assert_eq!(stats.max_length, 10);
        assert!(approx(stats.avg_length, 6.0));
        assert!(TextStats::from_lengths(&[]).is_none());
    }

    #[test]
    fn test_type_stats_flatten_under_family_key() {
        let column = ColumnStats {
            header: "Active".to_string(),
            data_type: DataType::Boolean,
            total_count: 3,
            non_empty_count: 3,
            empty_count: 0,
            unique_count: 2,
            completeness: 100.0,
            duplicate_count: 1,
            top_values: Vec::new(),
            type_stats: Some(TypeStats::Boolean(BooleanStats {
                true_count: 2,
                false_count: 1,
                true_pct: 200.0 / 3.0,
            })),
        };
        let json = serde_json::to_value(&column).unwrap();
        assert_eq!(json["boolean_stats"]["true_count"], 2);
        assert_eq!(json["boolean_stats"]["true_pct"], 66.7);
        assert_eq!(json["data_type"], "Boolean");
        assert!(json.get("numeric_stats").is_none());
    }
}
