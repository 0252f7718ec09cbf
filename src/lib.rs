//! Spreadsheet profiling: per-column type detection, descriptive statistics
//! and data-quality scoring for workbooks, plus a small HTTP service around it.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

pub use error::{AppError, ImportError};
pub use services::excel::{
    AnalysisResult, CellValue, DataAnalyzer, DataType, ExcelImporter, ImportOptions, ImportResult,
    MemoryWorkbook,
};

// Application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: config::Config,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        Self { config }
    }
}
