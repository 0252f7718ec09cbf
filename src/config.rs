use std::net::SocketAddr;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;

const DEFAULT_ADDR: &str = "127.0.0.1:3000";
// 10 MB in bytes
const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
const DEFAULT_PREVIEW_ROWS: usize = 20;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub max_file_size: usize,
    pub preview_rows: usize,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file first
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("SHEET_PROFILER_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.to_string())
            .parse()
            .context("SHEET_PROFILER_ADDR must be a socket address")?;

        let max_file_size = match lookup("SHEET_PROFILER_MAX_FILE_SIZE") {
            Some(raw) => raw
                .parse()
                .context("SHEET_PROFILER_MAX_FILE_SIZE must be a byte count")?,
            None => DEFAULT_MAX_FILE_SIZE,
        };

        let preview_rows = match lookup("SHEET_PROFILER_PREVIEW_ROWS") {
            Some(raw) => raw
                .parse()
                .context("SHEET_PROFILER_PREVIEW_ROWS must be a row count")?,
            None => DEFAULT_PREVIEW_ROWS,
        };

        let log_filter =
            lookup("SHEET_PROFILER_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Config {
            bind_addr,
            max_file_size,
            preview_rows,
            log_filter,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 3000)));
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.preview_rows, 20);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("SHEET_PROFILER_ADDR", "0.0.0.0:8080"),
            ("SHEET_PROFILER_MAX_FILE_SIZE", "1024"),
            ("SHEET_PROFILER_PREVIEW_ROWS", "5"),
            ("SHEET_PROFILER_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_file_size, 1024);
        assert_eq!(config.preview_rows, 5);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_malformed_value_is_an_error() {
        let result = Config::from_lookup(lookup_from(&[("SHEET_PROFILER_MAX_FILE_SIZE", "lots")]));
        assert!(result.is_err());
    }
}
