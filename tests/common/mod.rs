#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use stockdesk::domain::error::StockdeskError;
use stockdesk::domain::ohlcv::DailyBar;
use stockdesk::domain::window::RowBound;
use stockdesk::ports::price_store::{PriceStore, SharedStore};
use stockdesk::ports::quote_port::{DailySeries, OutputSize, QuotePort, RawQuote};

pub const UNKNOWN_SYMBOL: &str =
    "Invalid API call. Please retry or visit the documentation (https://www.alphavantage.co/documentation/) for TIME_SERIES_DAILY.";

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn raw(close: f64, volume: &str) -> RawQuote {
    RawQuote {
        open: format!("{close:.4}"),
        high: format!("{:.4}", close + 1.0),
        low: format!("{:.4}", close - 1.0),
        close: format!("{close:.4}"),
        volume: volume.to_string(),
    }
}

/// One session per calendar day starting at `start`, `closes` oldest first.
pub fn series_from(start: &str, closes: &[f64]) -> DailySeries {
    let start = date(start);
    let quotes = closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            let day = start.checked_add_days(Days::new(i as u64)).unwrap();
            (day.format("%Y-%m-%d").to_string(), raw(*close, "1000"))
        })
        .collect();

    DailySeries {
        quotes,
        error_message: None,
    }
}

pub fn unknown_symbol_series() -> DailySeries {
    DailySeries {
        quotes: HashMap::new(),
        error_message: Some(UNKNOWN_SYMBOL.to_string()),
    }
}

/// Scripted upstream. Symbols without a script answer like the provider does
/// for an unknown ticker.
pub struct FakeQuotes {
    series: Mutex<HashMap<String, DailySeries>>,
    failures: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
}

impl FakeQuotes {
    pub fn new() -> Self {
        Self {
            series: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_series(self, symbol: &str, series: DailySeries) -> Self {
        self.set_series(symbol, series);
        self
    }

    pub fn with_failure(self, symbol: &str, reason: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn set_series(&self, symbol: &str, series: DailySeries) {
        self.series
            .lock()
            .unwrap()
            .insert(symbol.to_string(), series);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuotePort for FakeQuotes {
    async fn daily_series(
        &self,
        symbol: &str,
        _size: OutputSize,
    ) -> Result<DailySeries, StockdeskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = self.failures.lock().unwrap().get(symbol) {
            return Err(StockdeskError::Upstream {
                reason: reason.clone(),
            });
        }

        Ok(self
            .series
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .unwrap_or_else(unknown_symbol_series))
    }
}

/// Counts every store call before delegating.
pub struct CountingStore {
    inner: SharedStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: SharedStore) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl PriceStore for CountingStore {
    fn initialize_schema(&self) -> Result<(), StockdeskError> {
        self.tick();
        self.inner.initialize_schema()
    }

    fn count_rows(&self, symbol: &str) -> Result<usize, StockdeskError> {
        self.tick();
        self.inner.count_rows(symbol)
    }

    fn latest_date(&self, symbol: &str) -> Result<Option<NaiveDate>, StockdeskError> {
        self.tick();
        self.inner.latest_date(symbol)
    }

    fn upsert_bars(&self, bars: &[DailyBar]) -> Result<usize, StockdeskError> {
        self.tick();
        self.inner.upsert_bars(bars)
    }

    fn scan(&self, symbol: &str, bound: RowBound) -> Result<Vec<DailyBar>, StockdeskError> {
        self.tick();
        self.inner.scan(symbol, bound)
    }

    fn recent_closes(&self, symbol: &str, limit: usize) -> Result<Vec<f64>, StockdeskError> {
        self.tick();
        self.inner.recent_closes(symbol, limit)
    }

    fn list_symbols(&self) -> Result<Vec<String>, StockdeskError> {
        self.tick();
        self.inner.list_symbols()
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockdeskError> {
        self.tick();
        self.inner.data_range(symbol)
    }
}

#[cfg(feature = "sqlite")]
pub fn memory_store() -> SharedStore {
    use stockdesk::adapters::sqlite_adapter::SqliteAdapter;

    let store = SqliteAdapter::in_memory().unwrap();
    store.initialize_schema().unwrap();
    Arc::new(store)
}

pub fn shared_quotes(fake: FakeQuotes) -> (Arc<FakeQuotes>, stockdesk::ports::quote_port::SharedQuotes) {
    let fake = Arc::new(fake);
    let shared: stockdesk::ports::quote_port::SharedQuotes = fake.clone();
    (fake, shared)
}
