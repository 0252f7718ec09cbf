pub mod analyzer;
pub mod classifier;
pub mod importer;
pub mod quality;
pub mod source;
pub mod stats;
pub mod types;
pub mod utils;

pub use analyzer::DataAnalyzer;
pub use classifier::{classify, resolve};
pub use importer::{ExcelImporter, ImportOptions};
pub use quality::QualityReport;
pub use source::{MemoryWorkbook, WorkbookSource};
pub use stats::{AnalysisResult, ColumnStats, SheetAnalysis, TypeStats};
pub use types::{CellValue, ColumnInfo, DataType, ImportResult, SheetData, TypeHistogram};
