//! Price store port trait.

use crate::domain::error::StockdeskError;
use crate::domain::ohlcv::DailyBar;
use crate::domain::window::RowBound;
use chrono::NaiveDate;
use std::sync::Arc;

/// Persistent daily price table keyed by `(date, symbol)`.
pub trait PriceStore {
    /// Create the price table if it does not exist yet.
    fn initialize_schema(&self) -> Result<(), StockdeskError>;

    fn count_rows(&self, symbol: &str) -> Result<usize, StockdeskError>;

    /// Newest stored date for `symbol`, `None` if the symbol has no rows.
    fn latest_date(&self, symbol: &str) -> Result<Option<NaiveDate>, StockdeskError>;

    /// Insert or overwrite each bar by `(date, symbol)`, refreshing
    /// `last_updated`. Returns the number of rows written.
    fn upsert_bars(&self, bars: &[DailyBar]) -> Result<usize, StockdeskError>;

    /// Rows for `symbol` within `bound`, newest first.
    fn scan(&self, symbol: &str, bound: RowBound) -> Result<Vec<DailyBar>, StockdeskError>;

    /// Up to `limit` closing prices for `symbol`, newest first.
    fn recent_closes(&self, symbol: &str, limit: usize) -> Result<Vec<f64>, StockdeskError>;

    /// Distinct symbols present in the store.
    fn list_symbols(&self) -> Result<Vec<String>, StockdeskError>;

    /// `(first date, last date, row count)`, or `None` when nothing is stored.
    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockdeskError>;
}

/// Shared store handle injected into every component.
pub type SharedStore = Arc<dyn PriceStore + Send + Sync>;

/// Run a synchronous store call on the blocking pool so pooled database I/O
/// never stalls the async workers.
pub async fn with_store<T, F>(store: &SharedStore, f: F) -> Result<T, StockdeskError>
where
    F: FnOnce(&dyn PriceStore) -> Result<T, StockdeskError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| StockdeskError::Database {
            reason: format!("store task failed: {e}"),
        })?
}
