//! Alpha Vantage upstream adapter (TIME_SERIES_DAILY).
//!
//! Transport failures, non-success statuses and undecodable bodies are
//! retried with a linear back-off (`attempt * backoff_unit`). A well-formed
//! response is returned as is, even when it only carries a provider error;
//! deciding what that means is left to ingestion.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::error::StockdeskError;
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::{DailySeries, OutputSize, QuotePort, RawQuote};

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

const MAX_TIMEOUT_SECS: i64 = 300;
const MAX_ATTEMPTS: i64 = 10;
const MAX_BACKOFF_MS: i64 = 60_000;
const REDACTED_KEY: &str = "REDACTED";

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// Checked when a fetch is attempted, not when the adapter is built.
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl UpstreamSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let defaults = Self::default();
        Self {
            api_key: config
                .get_string("upstream", "api_key")
                .filter(|k| !k.trim().is_empty()),
            base_url: config
                .get_string("upstream", "base_url")
                .unwrap_or(defaults.base_url),
            timeout: Duration::from_secs(
                config
                    .get_int("upstream", "timeout_secs", 30)
                    .clamp(1, MAX_TIMEOUT_SECS) as u64,
            ),
            max_attempts: config
                .get_int("upstream", "max_attempts", 3)
                .clamp(1, MAX_ATTEMPTS) as u32,
            backoff_unit: Duration::from_millis(
                config
                    .get_int("upstream", "backoff_ms", 1000)
                    .clamp(0, MAX_BACKOFF_MS) as u64,
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyQuote>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyQuote {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

impl TimeSeriesResponse {
    fn into_series(self, symbol: &str) -> DailySeries {
        // "Note" / "Information" usually mean the free-tier quota ran out
        for notice in [&self.note, &self.information].into_iter().flatten() {
            warn!(symbol, %notice, "alpha vantage notice");
        }

        let quotes = self
            .time_series
            .unwrap_or_default()
            .into_iter()
            .map(|(date, q)| {
                (
                    date,
                    RawQuote {
                        open: q.open,
                        high: q.high,
                        low: q.low,
                        close: q.close,
                        volume: q.volume,
                    },
                )
            })
            .collect();

        DailySeries {
            quotes,
            error_message: self.error_message,
        }
    }
}

pub struct AlphaVantageAdapter {
    client: Client,
    settings: UpstreamSettings,
}

impl AlphaVantageAdapter {
    pub fn new(settings: UpstreamSettings) -> Result<Self, StockdeskError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| StockdeskError::Upstream {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, settings })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockdeskError> {
        Self::new(UpstreamSettings::from_config(config))
    }

    fn request_url(
        &self,
        api_key: &str,
        symbol: &str,
        size: OutputSize,
    ) -> Result<Url, StockdeskError> {
        let size = size.to_string();
        Url::parse_with_params(
            &self.settings.base_url,
            &[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("apikey", api_key),
                ("outputsize", size.as_str()),
            ],
        )
        .map_err(|e| StockdeskError::ConfigInvalid {
            section: "upstream".into(),
            key: "base_url".into(),
            reason: e.to_string(),
        })
    }

    async fn fetch_once(&self, url: Url) -> Result<TimeSeriesResponse, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("failed to get stock data: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("API error: {status}"));
        }

        response
            .json::<TimeSeriesResponse>()
            .await
            .map_err(|e| format!("failed to decode response: {e}"))
    }
}

#[async_trait]
impl QuotePort for AlphaVantageAdapter {
    async fn daily_series(
        &self,
        symbol: &str,
        size: OutputSize,
    ) -> Result<DailySeries, StockdeskError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| StockdeskError::ConfigMissing {
                section: "upstream".into(),
                key: "api_key".into(),
            })?;

        let url = self.request_url(api_key, symbol, size)?;
        let logged = self.request_url(REDACTED_KEY, symbol, size)?;
        debug!(url = %logged, "alpha vantage request");

        let attempts = self.settings.max_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.fetch_once(url.clone()).await {
                Ok(response) => return Ok(response.into_series(symbol)),
                Err(reason) => {
                    warn!(symbol, attempt, %reason, "upstream request failed");
                    last_error = format!("attempt {attempt}: {reason}");
                    if attempt < attempts {
                        let delay = self
                            .settings
                            .backoff_unit
                            .checked_mul(attempt)
                            .unwrap_or(Duration::MAX);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(StockdeskError::Upstream { reason: last_error })
    }
}
