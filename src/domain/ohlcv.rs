//! Daily OHLCV record and symbol handling.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::error::StockdeskError;

/// One stored trading day for one symbol. `(date, symbol)` is the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    /// Set by the store on every write; `None` until persisted.
    pub last_updated: Option<NaiveDateTime>,
}

impl DailyBar {
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
    ) -> Self {
        Self {
            date,
            symbol: symbol.into(),
            open,
            high,
            low,
            close,
            volume,
            last_updated: None,
        }
    }
}

/// Trim and upper-case a ticker. Empty input is a validation error.
pub fn normalize_symbol(input: &str) -> Result<String, StockdeskError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(StockdeskError::validation("Symbol is required"));
    }
    Ok(trimmed.to_uppercase())
}
