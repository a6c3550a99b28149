//! Range queries over stored daily history.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::domain::error::StockdeskError;
use crate::domain::ingestion::Ingestor;
use crate::domain::ohlcv::{normalize_symbol, DailyBar};
use crate::domain::window::HistoryWindow;
use crate::ports::price_store::{with_store, SharedStore};

/// One history entry as handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl From<&DailyBar> for PriceRow {
    fn from(bar: &DailyBar) -> Self {
        Self {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

pub struct HistoryService {
    store: SharedStore,
    ingestor: Arc<Ingestor>,
}

impl HistoryService {
    pub fn new(store: SharedStore, ingestor: Arc<Ingestor>) -> Self {
        Self { store, ingestor }
    }

    pub async fn history(&self, symbol: &str, window: &str) -> Result<Vec<PriceRow>, StockdeskError> {
        self.history_as_of(symbol, window, Utc::now().date_naive())
            .await
    }

    /// History for `symbol` over `window`, newest first. Calendar windows are
    /// measured back from `today`.
    ///
    /// A symbol with no stored rows is ingested first. Data that is merely
    /// old is served as is; refreshing it is an explicit operation.
    pub async fn history_as_of(
        &self,
        symbol: &str,
        window: &str,
        today: NaiveDate,
    ) -> Result<Vec<PriceRow>, StockdeskError> {
        let symbol = normalize_symbol(symbol)?;
        let window: HistoryWindow = window.parse()?;

        let key = symbol.clone();
        let count = with_store(&self.store, move |s| s.count_rows(&key)).await?;
        if count == 0 {
            info!(symbol = %symbol, "symbol not stored yet, ingesting");
            self.ingestor.ingest(&symbol).await?;
        }

        let key = symbol.clone();
        let bound = window.bound(today);
        let bars = with_store(&self.store, move |s| s.scan(&key, bound)).await?;

        if bars.is_empty() {
            return Err(StockdeskError::NoData { symbol });
        }

        info!(symbol = %symbol, %window, rows = bars.len(), "served history");
        Ok(bars.iter().map(PriceRow::from).collect())
    }
}
