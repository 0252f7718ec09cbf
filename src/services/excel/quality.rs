//! Quality ratings and issue lists derived from an [`AnalysisResult`].
//!
//! Report builders render these verbatim; nothing here changes a score.

use serde::Serialize;

use super::stats::{AnalysisResult, ColumnStats, SheetAnalysis};
use super::utils::round_1;

const CRITICAL_COMPLETENESS: f64 = 50.0;
const WARNING_COMPLETENESS: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityRating {
    pub fn from_completeness(completeness: f64) -> Self {
        if completeness >= 95.0 {
            QualityRating::Excellent
        } else if completeness >= 80.0 {
            QualityRating::Good
        } else if completeness >= 60.0 {
            QualityRating::Fair
        } else {
            QualityRating::Poor
        }
    }
}

/// Coarse band for a 0-100 quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreBand {
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            ScoreBand::Good
        } else if score >= 60.0 {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DuplicateRows,
    EmptyRows,
    LowCompleteness,
    ModerateCompleteness,
    Outliers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnQuality {
    pub header: String,
    #[serde(serialize_with = "round_1")]
    pub completeness: f64,
    pub unique_count: usize,
    pub duplicate_count: usize,
    pub rating: QualityRating,
}

impl From<&ColumnStats> for ColumnQuality {
    fn from(stats: &ColumnStats) -> Self {
        Self {
            header: stats.header.clone(),
            completeness: stats.completeness,
            unique_count: stats.unique_count,
            duplicate_count: stats.duplicate_count,
            rating: QualityRating::from_completeness(stats.completeness),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetQuality {
    pub sheet_name: String,
    #[serde(serialize_with = "round_1")]
    pub score: f64,
    pub band: ScoreBand,
    pub columns: Vec<ColumnQuality>,
    /// Empty when nothing was found.
    pub issues: Vec<QualityIssue>,
}

impl From<&SheetAnalysis> for SheetQuality {
    fn from(sheet: &SheetAnalysis) -> Self {
        Self {
            sheet_name: sheet.sheet_name.clone(),
            score: sheet.data_quality_score,
            band: ScoreBand::from_score(sheet.data_quality_score),
            columns: sheet.column_stats.iter().map(ColumnQuality::from).collect(),
            issues: sheet_issues(sheet),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    #[serde(serialize_with = "round_1")]
    pub overall_score: f64,
    pub overall_band: ScoreBand,
    pub sheets: Vec<SheetQuality>,
}

impl From<&AnalysisResult> for QualityReport {
    fn from(analysis: &AnalysisResult) -> Self {
        Self {
            overall_score: analysis.overall_quality_score,
            overall_band: ScoreBand::from_score(analysis.overall_quality_score),
            sheets: analysis.sheets.iter().map(SheetQuality::from).collect(),
        }
    }
}

/// Sheet-level issues first, then per-column issues in column order.
pub fn sheet_issues(sheet: &SheetAnalysis) -> Vec<QualityIssue> {
    let mut issues = Vec::new();

    if sheet.duplicate_rows > 0 {
        issues.push(QualityIssue {
            kind: IssueKind::DuplicateRows,
            severity: Severity::Warning,
            column: None,
            details: format!("{} duplicate row(s) found", sheet.duplicate_rows),
        });
    }

    if sheet.completely_empty_rows > 0 {
        issues.push(QualityIssue {
            kind: IssueKind::EmptyRows,
            severity: Severity::Info,
            column: None,
            details: format!("{} completely empty row(s)", sheet.completely_empty_rows),
        });
    }

    for column in &sheet.column_stats {
        if column.completeness < CRITICAL_COMPLETENESS {
            issues.push(QualityIssue {
                kind: IssueKind::LowCompleteness,
                severity: Severity::Critical,
                column: Some(column.header.clone()),
                details: format!(
                    "Column '{}' is only {:.1}% complete",
                    column.header, column.completeness
                ),
            });
        } else if column.completeness < WARNING_COMPLETENESS {
            issues.push(QualityIssue {
                kind: IssueKind::ModerateCompleteness,
                severity: Severity::Warning,
                column: Some(column.header.clone()),
                details: format!(
                    "Column '{}' is {:.1}% complete",
                    column.header, column.completeness
                ),
            });
        }

        let outliers = column.outlier_count();
        if outliers > 0 {
            issues.push(QualityIssue {
                kind: IssueKind::Outliers,
                severity: Severity::Info,
                column: Some(column.header.clone()),
                details: format!("Column '{}' has {} outlier(s)", column.header, outliers),
            });
        }
    }

    issues
}
