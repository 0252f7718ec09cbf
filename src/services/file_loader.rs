use bytes::Bytes;
use reqwest::Client;

use crate::error::AppError;

const SPREADSHEET_HINTS: [&str; 5] = ["xlsx", "xlsm", "spreadsheetml", "excel", "sheet"];

pub fn is_spreadsheet_type(file_type: &str) -> bool {
    let lowered = file_type.to_lowercase();
    SPREADSHEET_HINTS.iter().any(|hint| lowered.contains(hint))
}

/// File name from the last path segment of a URL, ignoring any query string.
pub fn file_name_from_url(url: &str) -> String {
    let without_query = url.split(&['?', '#'][..]).next().unwrap_or(url);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && !name.contains(':'))
        .unwrap_or("workbook.xlsx")
        .to_string()
}

pub async fn load_file_from_url(url: &str, max_size: usize) -> Result<Bytes, AppError> {
    let client = Client::new();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Download(format!("Failed to fetch file: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::Download(format!(
            "Failed to fetch file. Status: {}",
            response.status()
        )));
    }

    if let Some(length) = response.content_length() {
        if length as usize > max_size {
            return Err(AppError::InvalidInput(format!(
                "File is {} bytes, limit is {} bytes",
                length, max_size
            )));
        }
    }

    let data = response
        .bytes()
        .await
        .map_err(|e| AppError::Download(format!("Failed to read response bytes: {}", e)))?;

    if data.len() > max_size {
        return Err(AppError::InvalidInput(format!(
            "File is {} bytes, limit is {} bytes",
            data.len(),
            max_size
        )));
    }
    Ok(data)
}
