//! Ingestion: merge an upstream daily series into the price store.
//!
//! The upstream series is parsed record by record, sorted by date and
//! filtered against the newest stored date before anything is written, so a
//! second pass with no new upstream sessions writes nothing. Records with an
//! unparsable field are dropped individually and never fail the merge.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::error::StockdeskError;
use crate::domain::ohlcv::{normalize_symbol, DailyBar};
use crate::ports::price_store::{with_store, SharedStore};
use crate::ports::quote_port::{DailySeries, OutputSize, RawQuote, SharedQuotes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestMode {
    /// Only sessions newer than the latest stored date are written.
    #[default]
    Incremental,
    /// Every parsed upstream session is upserted, re-applying provider
    /// corrections to dates that are already stored.
    Reconcile,
}

pub struct Ingestor {
    store: SharedStore,
    quotes: SharedQuotes,
}

impl Ingestor {
    pub fn new(store: SharedStore, quotes: SharedQuotes) -> Self {
        Self { store, quotes }
    }

    /// Incremental ingestion for an already-normalised symbol.
    pub async fn ingest(&self, symbol: &str) -> Result<usize, StockdeskError> {
        self.ingest_with(symbol, IngestMode::Incremental).await
    }

    /// Explicit refresh: always runs a pass, whatever is already stored.
    pub async fn refresh(&self, symbol: &str, mode: IngestMode) -> Result<usize, StockdeskError> {
        let symbol = normalize_symbol(symbol)?;
        self.ingest_with(&symbol, mode).await
    }

    pub async fn ingest_with(
        &self,
        symbol: &str,
        mode: IngestMode,
    ) -> Result<usize, StockdeskError> {
        let series = self.quotes.daily_series(symbol, OutputSize::Compact).await?;

        if series.is_unusable() {
            if let Some(ref msg) = series.error_message {
                warn!(symbol, provider_error = %msg, "upstream rejected symbol");
            }
            return Err(StockdeskError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let key = symbol.to_string();
        let latest = with_store(&self.store, move |s| s.latest_date(&key)).await?;

        let bars = select_bars(parse_series(symbol, &series), latest, mode);
        if bars.is_empty() {
            info!(symbol, ?latest, "no new sessions upstream");
            return Ok(0);
        }

        let first = bars[0].date;
        let last = bars[bars.len() - 1].date;
        let written = with_store(&self.store, move |s| s.upsert_bars(&bars)).await?;

        info!(symbol, written, %first, %last, ?mode, "ingested daily bars");
        Ok(written)
    }
}

/// Parse every upstream session, dropping records with any bad field.
/// The result is sorted by date ascending.
pub fn parse_series(symbol: &str, series: &DailySeries) -> Vec<DailyBar> {
    let mut bars: Vec<DailyBar> = series
        .quotes
        .iter()
        .filter_map(|(date_str, raw)| match parse_quote(symbol, date_str, raw) {
            Ok(bar) => Some(bar),
            Err(reason) => {
                warn!(symbol, date = %date_str, %reason, "skipping malformed session");
                None
            }
        })
        .collect();

    bars.sort_by_key(|b| b.date);
    bars
}

/// Apply the date cutoff. `bars` must already be sorted ascending.
pub fn select_bars(
    bars: Vec<DailyBar>,
    latest: Option<NaiveDate>,
    mode: IngestMode,
) -> Vec<DailyBar> {
    match (mode, latest) {
        (IngestMode::Reconcile, _) | (IngestMode::Incremental, None) => bars,
        (IngestMode::Incremental, Some(latest)) => {
            let before = bars.len();
            let fresh: Vec<DailyBar> = bars.into_iter().filter(|b| b.date > latest).collect();
            debug!(%latest, skipped = before - fresh.len(), "applied date cutoff");
            fresh
        }
    }
}

fn parse_quote(symbol: &str, date_str: &str, raw: &RawQuote) -> Result<DailyBar, String> {
    let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|e| format!("bad date: {e}"))?;
    let open = parse_price("open", &raw.open)?;
    let high = parse_price("high", &raw.high)?;
    let low = parse_price("low", &raw.low)?;
    let close = parse_price("close", &raw.close)?;
    let volume = raw
        .volume
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("bad volume {:?}: {e}", raw.volume))?;

    Ok(DailyBar::new(symbol, date, open, high, low, close, volume))
}

fn parse_price(field: &str, value: &str) -> Result<f64, String> {
    let parsed = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad {field} {value:?}: {e}"))?;
    if !parsed.is_finite() {
        return Err(format!("bad {field} {value:?}: not a finite number"));
    }
    Ok(parsed)
}
