//! Upstream quote provider port.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::error::StockdeskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSize {
    /// Latest ~100 sessions.
    Compact,
    Full,
}

impl fmt::Display for OutputSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSize::Compact => f.write_str("compact"),
            OutputSize::Full => f.write_str("full"),
        }
    }
}

/// One session exactly as the provider sent it; numbers are still strings.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuote {
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

/// A daily series keyed by `YYYY-MM-DD`. Key order carries no meaning.
#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    pub quotes: HashMap<String, RawQuote>,
    /// Provider-level error reported inside an otherwise successful response.
    pub error_message: Option<String>,
}

impl DailySeries {
    /// True when the provider reported an error or sent no sessions.
    pub fn is_unusable(&self) -> bool {
        self.error_message.is_some() || self.quotes.is_empty()
    }
}

#[async_trait]
pub trait QuotePort {
    /// Daily series for `symbol`. Transport failures are retried inside the
    /// implementation; provider-level errors come back inside `DailySeries`.
    async fn daily_series(
        &self,
        symbol: &str,
        size: OutputSize,
    ) -> Result<DailySeries, StockdeskError>;
}

pub type SharedQuotes = Arc<dyn QuotePort + Send + Sync>;
