use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::excel::{AnalysisResult, ImportOptions, ImportResult, QualityReport};

fn default_has_header() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct FileInfo {
    #[serde(rename = "type")]
    pub file_type: String,
    pub signed_url: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub files: Vec<FileInfo>,
    #[serde(default)]
    pub sheet_names: Option<Vec<String>>,
    #[serde(default = "default_has_header")]
    pub has_header: bool,
    #[serde(default)]
    pub max_rows: Option<usize>,
}

impl AnalyzeRequest {
    pub fn import_options(&self) -> Result<ImportOptions, AppError> {
        build_options(self.sheet_names.clone(), self.has_header, self.max_rows)
    }
}

/// Query string of the raw-upload endpoint. `sheet` is a comma separated list.
#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    pub file_name: Option<String>,
    pub sheet: Option<String>,
    pub has_header: Option<bool>,
    pub max_rows: Option<usize>,
}

impl UploadParams {
    pub fn import_options(&self) -> Result<ImportOptions, AppError> {
        let sheets = self.sheet.as_ref().map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect()
        });
        build_options(sheets, self.has_header.unwrap_or(true), self.max_rows)
    }

    pub fn file_name(&self) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| "upload.xlsx".to_string())
    }
}

fn build_options(
    sheet_names: Option<Vec<String>>,
    has_header: bool,
    max_rows: Option<usize>,
) -> Result<ImportOptions, AppError> {
    if max_rows == Some(0) {
        return Err(AppError::InvalidInput(
            "max_rows must be a positive integer".to_string(),
        ));
    }
    Ok(ImportOptions {
        sheet_names,
        has_header,
        max_rows,
    })
}

#[derive(Debug, Serialize)]
pub struct SheetPreview {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub import: ImportResult,
    pub analysis: AnalysisResult,
    pub quality: QualityReport,
    pub previews: Vec<SheetPreview>,
}

impl AnalyzeResponse {
    pub fn build(import: ImportResult, analysis: AnalysisResult, preview_rows: usize) -> Self {
        let previews = import
            .sheets
            .iter()
            .map(|sheet| SheetPreview {
                sheet_name: sheet.name.clone(),
                headers: sheet.headers.clone(),
                rows: sheet.preview(preview_rows),
            })
            .collect();
        let quality = QualityReport::from(&analysis);
        Self {
            import,
            analysis,
            quality,
            previews,
        }
    }
}
