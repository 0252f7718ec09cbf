use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::Method,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::AppError,
    models::{AnalyzeRequest, AnalyzeResponse, UploadParams},
    services::{
        excel::{DataAnalyzer, ExcelImporter, ImportOptions},
        file_loader,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/sheets/analyze", post(analyze_sheet))
        .route("/sheets/upload", post(upload_sheet))
        .layer(cors)
}

async fn analyze_sheet(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let file_info = request
        .files
        .first()
        .ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    if !file_loader::is_spreadsheet_type(&file_info.file_type) {
        return Err(AppError::InvalidInput(format!(
            "Unsupported file type: {}",
            file_info.file_type
        )));
    }
    let options = request.import_options()?;

    tracing::info!("Downloading file from URL...");
    let download_start = std::time::Instant::now();
    let data =
        file_loader::load_file_from_url(&file_info.signed_url, state.config.max_file_size).await?;
    tracing::info!(
        "File downloaded, size: {}KB, took: {:?}",
        data.len() / 1024,
        download_start.elapsed()
    );

    let file_name = file_loader::file_name_from_url(&file_info.signed_url);
    run_pipeline(data, file_name, options, state.config.preview_rows)
        .await
        .map(Json)
}

async fn upload_sheet(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<AnalyzeResponse>, AppError> {
    if body.is_empty() {
        return Err(AppError::InvalidInput("Empty upload".to_string()));
    }
    if body.len() > state.config.max_file_size {
        return Err(AppError::InvalidInput(format!(
            "File is {} bytes, limit is {} bytes",
            body.len(),
            state.config.max_file_size
        )));
    }
    let options = params.import_options()?;
    run_pipeline(body, params.file_name(), options, state.config.preview_rows)
        .await
        .map(Json)
}

/// Import and analyze off the async runtime; both stages are CPU bound.
pub async fn run_pipeline(
    data: Bytes,
    file_name: String,
    options: ImportOptions,
    preview_rows: usize,
) -> Result<AnalyzeResponse, AppError> {
    let start = std::time::Instant::now();
    let response = tokio::task::spawn_blocking(move || {
        let import = ExcelImporter::new(options).import_bytes(data, &file_name)?;
        let analysis = DataAnalyzer::new().analyze(&import);
        Ok::<_, AppError>(AnalyzeResponse::build(import, analysis, preview_rows))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Analysis task failed: {}", e)))??;

    tracing::info!("Total processing completed in {:?}", start.elapsed());
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(Config {
            max_file_size: 64,
            ..Config::default()
        }))
    }

    #[test]
    fn test_upload_rejects_empty_body() {
        let result = tokio_test::block_on(upload_sheet(
            State(state()),
            Query(UploadParams::default()),
            Bytes::new(),
        ));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_upload_rejects_oversized_body() {
        let result = tokio_test::block_on(upload_sheet(
            State(state()),
            Query(UploadParams::default()),
            Bytes::from(vec![0u8; 65]),
        ));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_upload_of_non_workbook_is_import_error() {
        let result = tokio_test::block_on(upload_sheet(
            State(state()),
            Query(UploadParams::default()),
            Bytes::from_static(b"id,name\n1,alice\n"),
        ));
        match result {
            Err(err @ AppError::Import(_)) => {
                assert_eq!(err.status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY)
            }
            other => panic!("expected import error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_upload_of_real_workbook_is_analyzed() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Units").unwrap();
        sheet.write_number(1, 0, 3).unwrap();
        sheet.write_number(2, 0, 4).unwrap();
        let body = Bytes::from(workbook.save_to_buffer().unwrap());

        let state = Arc::new(AppState::new(Config::default()));
        let Json(response) = tokio_test::block_on(upload_sheet(
            State(state),
            Query(UploadParams::default()),
            body,
        ))
        .unwrap();
        assert_eq!(response.import.sheet_count, 1);
        assert_eq!(response.analysis.sheets[0].row_count, 2);
        assert_eq!(response.previews[0].rows.len(), 2);
    }

    #[test]
    fn test_analyze_rejects_non_spreadsheet_type() {
        let request: AnalyzeRequest = serde_json::from_str(
            r#"{"files": [{"type": "application/pdf", "signed_url": "https://x/y.pdf"}]}"#,
        )
        .unwrap();
        let result = tokio_test::block_on(analyze_sheet(State(state()), Json(request)));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
