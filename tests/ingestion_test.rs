#![cfg(feature = "sqlite")]
//! Ingestion against an in-memory SQLite store and a scripted upstream.

mod common;

use common::*;
use stockdesk::domain::error::StockdeskError;
use stockdesk::domain::ingestion::{IngestMode, Ingestor};
use stockdesk::domain::window::RowBound;
use stockdesk::ports::price_store::PriceStore;

#[tokio::test]
async fn second_pass_without_new_sessions_writes_nothing() {
    let store = memory_store();
    let (fake, quotes) = shared_quotes(
        FakeQuotes::new().with_series("ABC", series_from("2024-01-01", &[10.0, 11.0, 12.0])),
    );
    let ingestor = Ingestor::new(store.clone(), quotes);

    assert_eq!(ingestor.ingest("ABC").await.unwrap(), 3);
    assert_eq!(ingestor.ingest("ABC").await.unwrap(), 0);
    assert_eq!(store.count_rows("ABC").unwrap(), 3);
    assert_eq!(fake.calls(), 2);
}

#[tokio::test]
async fn only_newer_sessions_are_appended() {
    let store = memory_store();
    let (fake, quotes) = shared_quotes(
        FakeQuotes::new().with_series("ABC", series_from("2024-01-01", &[10.0, 11.0])),
    );
    let ingestor = Ingestor::new(store.clone(), quotes);
    ingestor.ingest("ABC").await.unwrap();

    // upstream now reports a corrected 01-02 plus a new 01-03
    fake.set_series("ABC", series_from("2024-01-01", &[10.0, 99.0, 12.0]));
    assert_eq!(ingestor.ingest("ABC").await.unwrap(), 1);

    let bars = store.scan("ABC", RowBound::Latest(10)).unwrap();
    assert_eq!(bars.len(), 3);
    assert_eq!(bars[0].date, date("2024-01-03"));
    assert_eq!(bars[1].close, 11.0);
}

#[tokio::test]
async fn reconcile_rewrites_corrected_sessions() {
    let store = memory_store();
    let (fake, quotes) = shared_quotes(
        FakeQuotes::new().with_series("ABC", series_from("2024-01-01", &[10.0, 11.0])),
    );
    let ingestor = Ingestor::new(store.clone(), quotes);
    ingestor.ingest("ABC").await.unwrap();

    fake.set_series("ABC", series_from("2024-01-01", &[10.0, 99.0]));
    let written = ingestor.refresh("abc", IngestMode::Reconcile).await.unwrap();
    assert_eq!(written, 2);

    let bars = store.scan("ABC", RowBound::Latest(10)).unwrap();
    assert_eq!(bars.len(), 2, "upsert must not duplicate keys");
    assert_eq!(bars[0].date, date("2024-01-02"));
    assert_eq!(bars[0].close, 99.0);
}

#[tokio::test]
async fn one_bad_volume_drops_only_that_session() {
    let store = memory_store();
    let mut series = series_from("2024-01-01", &[10.0, 11.0, 12.0, 13.0, 14.0]);
    series
        .quotes
        .insert("2024-01-03".to_string(), raw(12.0, "not-a-number"));
    let (_fake, quotes) = shared_quotes(FakeQuotes::new().with_series("ABC", series));
    let ingestor = Ingestor::new(store.clone(), quotes);

    assert_eq!(ingestor.ingest("ABC").await.unwrap(), 4);

    let dates: Vec<_> = store
        .scan("ABC", RowBound::Latest(10))
        .unwrap()
        .into_iter()
        .map(|b| b.date)
        .collect();
    assert!(!dates.contains(&date("2024-01-03")));
    assert_eq!(dates.len(), 4);
}

#[tokio::test]
async fn non_finite_close_drops_only_that_session() {
    let store = memory_store();
    let mut series = series_from("2024-01-01", &[10.0, 11.0, 12.0, 13.0, 14.0]);
    let mut bad = raw(12.0, "1000");
    bad.close = "NaN".to_string();
    series.quotes.insert("2024-01-03".to_string(), bad);
    let (_fake, quotes) = shared_quotes(FakeQuotes::new().with_series("ABC", series));
    let ingestor = Ingestor::new(store.clone(), quotes);

    assert_eq!(ingestor.ingest("ABC").await.unwrap(), 4);

    let bars = store.scan("ABC", RowBound::Latest(10)).unwrap();
    assert_eq!(bars.len(), 4);
    assert!(bars.iter().all(|b| b.date != date("2024-01-03")));
    assert!(bars.iter().all(|b| b.close.is_finite()));
}

#[tokio::test]
async fn refresh_twice_returns_zero_the_second_time() {
    let store = memory_store();
    let (_fake, quotes) = shared_quotes(
        FakeQuotes::new().with_series("ABC", series_from("2024-02-01", &[5.0, 6.0, 7.0, 8.0])),
    );
    let ingestor = Ingestor::new(store.clone(), quotes);

    let first = ingestor.refresh("ABC", IngestMode::Incremental).await.unwrap();
    let second = ingestor.refresh(" abc ", IngestMode::Incremental).await.unwrap();
    assert_eq!(first, 4);
    assert_eq!(second, 0);
    assert_eq!(store.list_symbols().unwrap(), vec!["ABC".to_string()]);
}

#[tokio::test]
async fn provider_error_is_symbol_not_found() {
    let store = memory_store();
    let (_fake, quotes) = shared_quotes(FakeQuotes::new());
    let ingestor = Ingestor::new(store.clone(), quotes);

    let err = ingestor.ingest("ZZZZ").await.unwrap_err();
    assert!(matches!(err, StockdeskError::SymbolNotFound { ref symbol } if symbol == "ZZZZ"));
    assert_eq!(store.count_rows("ZZZZ").unwrap(), 0);
}

#[tokio::test]
async fn upstream_failure_writes_nothing() {
    let store = memory_store();
    let (_fake, quotes) =
        shared_quotes(FakeQuotes::new().with_failure("ABC", "attempt 3: API error: 503"));
    let ingestor = Ingestor::new(store.clone(), quotes);

    let err = ingestor.refresh("ABC", IngestMode::Incremental).await.unwrap_err();
    assert!(matches!(err, StockdeskError::Upstream { .. }));
    assert_eq!(store.count_rows("ABC").unwrap(), 0);
}

#[tokio::test]
async fn blank_symbol_is_rejected_before_fetching() {
    let store = memory_store();
    let (fake, quotes) = shared_quotes(FakeQuotes::new());
    let ingestor = Ingestor::new(store, quotes);

    let err = ingestor.refresh("   ", IngestMode::Incremental).await.unwrap_err();
    assert!(matches!(err, StockdeskError::Validation { .. }));
    assert_eq!(fake.calls(), 0);
}
