use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::SheetsConfig;
use crate::schema::Grid;

/// Where snapshot grids come from.
///
/// Implementations never fail: an unreachable or unreadable source yields an
/// empty grid, which every query treats as "no data".
pub trait SheetSource {
    fn fetch(&self, range: &str) -> Grid;
}

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("request to sheets api failed")]
    Http(#[source] reqwest::Error),
    #[error("sheets api answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("unexpected sheets api response")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Read-only Google Sheets client keyed by an API key.
pub struct GoogleSheetsClient {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    api_key: String,
}

impl GoogleSheetsClient {
    pub fn new(cfg: &SheetsConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout)
            .connect_timeout(cfg.timeout.min(Duration::from_secs(5)))
            .build()
            .context("failed to create http client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: cfg.spreadsheet_id.clone(),
            api_key: cfg.api_key.clone(),
        })
    }

    pub fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url,
            utf8_percent_encode(&self.spreadsheet_id, NON_ALPHANUMERIC),
            utf8_percent_encode(range, NON_ALPHANUMERIC)
        )
    }

    pub fn try_fetch(&self, range: &str) -> Result<Grid, SheetsError> {
        let resp = self
            .http
            .get(self.values_url(range))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .map_err(SheetsError::Http)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(SheetsError::Status { status, body });
        }

        let payload: ValueRange = resp.json().map_err(SheetsError::Decode)?;
        Ok(into_grid(payload.values))
    }
}

impl SheetSource for GoogleSheetsClient {
    fn fetch(&self, range: &str) -> Grid {
        match self.try_fetch(range) {
            Ok(grid) if grid.is_empty() => {
                tracing::warn!(range, "no data found in spreadsheet range");
                grid
            }
            Ok(grid) => {
                tracing::debug!(range, rows = grid.len(), "fetched spreadsheet values");
                grid
            }
            Err(err) => {
                tracing::error!(error = %err, range, "failed to fetch spreadsheet");
                Vec::new()
            }
        }
    }
}

/// A fixed grid, used for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    grid: Grid,
}

impl StaticSource {
    pub fn new(grid: Grid) -> Self {
        Self { grid }
    }

    /// Loads a grid saved as a JSON array of string arrays, the shape the
    /// sheets API returns under `values`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data =
            std::fs::read(path).with_context(|| format!("read grid file {}", path.display()))?;
        let values: Vec<Vec<serde_json::Value>> =
            serde_json::from_slice(&data).context("parse grid json")?;
        Ok(Self::new(into_grid(values)))
    }
}

impl SheetSource for StaticSource {
    fn fetch(&self, _range: &str) -> Grid {
        self.grid.clone()
    }
}

/// The API formats cells as strings, but tolerate raw numbers and booleans.
fn into_grid(values: Vec<Vec<serde_json::Value>>) -> Grid {
    values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}
