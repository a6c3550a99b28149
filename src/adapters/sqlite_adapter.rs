//! SQLite price store adapter.

use crate::domain::error::StockdeskError;
use crate::domain::ohlcv::DailyBar;
use crate::domain::window::RowBound;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_store::PriceStore;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Row};

const DATE_FMT: &str = "%Y-%m-%d";
const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S%.f";

const UPSERT_SQL: &str = "INSERT INTO stock_data (date, symbol, open, high, low, close, volume, last_updated)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
     ON CONFLICT (date, symbol) DO UPDATE SET
         open = excluded.open,
         high = excluded.high,
         low = excluded.low,
         close = excluded.close,
         volume = excluded.volume,
         last_updated = excluded.last_updated";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> StockdeskError {
    StockdeskError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> StockdeskError {
    StockdeskError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_column<T, E>(raw: &str, parsed: Result<T, E>) -> rusqlite::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    parsed.map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            raw.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

fn row_to_bar(row: &Row<'_>) -> rusqlite::Result<DailyBar> {
    let date_str: String = row.get(0)?;
    let date = parse_column(&date_str, NaiveDate::parse_from_str(&date_str, DATE_FMT))?;
    let updated_str: Option<String> = row.get(7)?;
    let last_updated = match updated_str {
        Some(s) => Some(parse_column(
            &s,
            NaiveDateTime::parse_from_str(&s, TIMESTAMP_FMT),
        )?),
        None => None,
    };

    Ok(DailyBar {
        date,
        symbol: row.get(1)?,
        open: row.get(2)?,
        high: row.get(3)?,
        low: row.get(4)?,
        close: row.get(5)?,
        volume: row.get(6)?,
        last_updated,
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockdeskError> {
        let db_path = config.require_string("sqlite", "path")?;
        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path)
            .with_init(|conn| conn.busy_timeout(std::time::Duration::from_secs(5)));
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    /// Single-connection in-memory database; every pooled handle sees the
    /// same data.
    pub fn in_memory() -> Result<Self, StockdeskError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StockdeskError> {
        self.pool.get().map_err(pool_err)
    }
}

impl PriceStore for SqliteAdapter {
    fn initialize_schema(&self) -> Result<(), StockdeskError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS stock_data (
                date TEXT NOT NULL,
                symbol TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume INTEGER NOT NULL,
                last_updated TEXT,
                PRIMARY KEY (date, symbol)
            );
            CREATE INDEX IF NOT EXISTS idx_stock_data_symbol_date ON stock_data(symbol, date);",
        )
        .map_err(query_err)?;

        Ok(())
    }

    fn count_rows(&self, symbol: &str) -> Result<usize, StockdeskError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM stock_data WHERE symbol = ?1",
                params![symbol],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        Ok(count as usize)
    }

    fn latest_date(&self, symbol: &str) -> Result<Option<NaiveDate>, StockdeskError> {
        let conn = self.conn()?;
        let max: Option<String> = conn
            .query_row(
                "SELECT MAX(date) FROM stock_data WHERE symbol = ?1",
                params![symbol],
                |row| row.get(0),
            )
            .map_err(query_err)?;

        max.map(|s| {
            NaiveDate::parse_from_str(&s, DATE_FMT).map_err(|e| StockdeskError::Database {
                reason: e.to_string(),
            })
        })
        .transpose()
    }

    fn upsert_bars(&self, bars: &[DailyBar]) -> Result<usize, StockdeskError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        let now = Utc::now().naive_utc().format(TIMESTAMP_FMT).to_string();

        let mut written = 0;
        {
            let mut stmt = tx.prepare_cached(UPSERT_SQL).map_err(query_err)?;
            for bar in bars {
                written += stmt
                    .execute(params![
                        bar.date.format(DATE_FMT).to_string(),
                        bar.symbol,
                        bar.open,
                        bar.high,
                        bar.low,
                        bar.close,
                        bar.volume,
                        now,
                    ])
                    .map_err(query_err)?;
            }
        }

        tx.commit().map_err(query_err)?;
        Ok(written)
    }

    fn scan(&self, symbol: &str, bound: RowBound) -> Result<Vec<DailyBar>, StockdeskError> {
        let conn = self.conn()?;
        let select = "SELECT date, symbol, open, high, low, close, volume, last_updated
                      FROM stock_data";

        let bars = match bound {
            RowBound::Latest(limit) => {
                let mut stmt = conn
                    .prepare(&format!(
                        "{select} WHERE symbol = ?1 ORDER BY date DESC LIMIT ?2"
                    ))
                    .map_err(query_err)?;
                let rows = stmt
                    .query_map(params![symbol, limit as i64], row_to_bar)
                    .map_err(query_err)?
                    .collect::<rusqlite::Result<Vec<_>>>();
                rows
            }
            RowBound::Since(from) => {
                let mut stmt = conn
                    .prepare(&format!(
                        "{select} WHERE symbol = ?1 AND date >= ?2 ORDER BY date DESC"
                    ))
                    .map_err(query_err)?;
                let rows = stmt
                    .query_map(
                        params![symbol, from.format(DATE_FMT).to_string()],
                        row_to_bar,
                    )
                    .map_err(query_err)?
                    .collect::<rusqlite::Result<Vec<_>>>();
                rows
            }
        };

        bars.map_err(query_err)
    }

    fn recent_closes(&self, symbol: &str, limit: usize) -> Result<Vec<f64>, StockdeskError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT close FROM stock_data WHERE symbol = ?1 ORDER BY date DESC LIMIT ?2")
            .map_err(query_err)?;

        let closes = stmt
            .query_map(params![symbol, limit as i64], |row| row.get(0))
            .map_err(query_err)?
            .collect::<rusqlite::Result<Vec<f64>>>()
            .map_err(query_err)?;

        Ok(closes)
    }

    fn list_symbols(&self) -> Result<Vec<String>, StockdeskError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM stock_data ORDER BY symbol")
            .map_err(query_err)?;

        let symbols = stmt
            .query_map([], |row| row.get(0))
            .map_err(query_err)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(query_err)?;

        Ok(symbols)
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockdeskError> {
        let conn = self.conn()?;

        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM stock_data WHERE symbol = ?1",
                params![symbol],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match result {
            (Some(min_str), Some(max_str), count) if count > 0 => {
                let min = NaiveDate::parse_from_str(&min_str, DATE_FMT).map_err(
                    |e: chrono::ParseError| StockdeskError::Database {
                        reason: e.to_string(),
                    },
                )?;
                let max = NaiveDate::parse_from_str(&max_str, DATE_FMT).map_err(
                    |e: chrono::ParseError| StockdeskError::Database {
                        reason: e.to_string(),
                    },
                )?;
                Ok(Some((min, max, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bar(symbol: &str, day: u32, close: f64) -> DailyBar {
        DailyBar::new(symbol, date(2024, 1, day), close - 1.0, close + 1.0, close - 2.0, close, 1000)
    }

    fn store() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        adapter
    }

    #[test]
    fn from_config_missing_path() {
        let result = SqliteAdapter::from_config(&EmptyConfig);
        match result {
            Err(StockdeskError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let adapter = store();
        adapter.initialize_schema().unwrap();
    }

    #[test]
    fn upsert_then_count_and_latest() {
        let adapter = store();
        assert_eq!(adapter.count_rows("ABC").unwrap(), 0);
        assert_eq!(adapter.latest_date("ABC").unwrap(), None);

        let written = adapter
            .upsert_bars(&[bar("ABC", 2, 10.0), bar("ABC", 3, 11.0), bar("XYZ", 3, 50.0)])
            .unwrap();
        assert_eq!(written, 3);
        assert_eq!(adapter.count_rows("ABC").unwrap(), 2);
        assert_eq!(adapter.latest_date("ABC").unwrap(), Some(date(2024, 1, 3)));
    }

    #[test]
    fn upsert_overwrites_existing_key() {
        let adapter = store();
        adapter.upsert_bars(&[bar("ABC", 2, 10.0)]).unwrap();

        let mut corrected = bar("ABC", 2, 12.0);
        corrected.volume = 4242;
        adapter.upsert_bars(&[corrected]).unwrap();

        assert_eq!(adapter.count_rows("ABC").unwrap(), 1);
        let rows = adapter.scan("ABC", RowBound::Latest(10)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].close, 12.0);
        assert_eq!(rows[0].volume, 4242);
        assert!(rows[0].last_updated.is_some());
    }

    #[test]
    fn scan_latest_is_newest_first_and_limited() {
        let adapter = store();
        let bars: Vec<DailyBar> = (1..=10).map(|d| bar("ABC", d, 100.0 + d as f64)).collect();
        adapter.upsert_bars(&bars).unwrap();

        let rows = adapter.scan("ABC", RowBound::Latest(7)).unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].date, date(2024, 1, 10));
        assert_eq!(rows[6].date, date(2024, 1, 4));
    }

    #[test]
    fn scan_since_is_inclusive() {
        let adapter = store();
        let bars: Vec<DailyBar> = (1..=10).map(|d| bar("ABC", d, 100.0)).collect();
        adapter.upsert_bars(&bars).unwrap();

        let rows = adapter.scan("ABC", RowBound::Since(date(2024, 1, 8))).unwrap();
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 10), date(2024, 1, 9), date(2024, 1, 8)]);
    }

    #[test]
    fn recent_closes_newest_first() {
        let adapter = store();
        adapter
            .upsert_bars(&[bar("ABC", 1, 10.0), bar("ABC", 2, 11.0), bar("ABC", 3, 12.0)])
            .unwrap();
        assert_eq!(adapter.recent_closes("ABC", 2).unwrap(), vec![12.0, 11.0]);
        assert!(adapter.recent_closes("NOPE", 2).unwrap().is_empty());
    }

    #[test]
    fn list_symbols_distinct_sorted() {
        let adapter = store();
        adapter
            .upsert_bars(&[bar("XYZ", 1, 10.0), bar("ABC", 1, 10.0), bar("ABC", 2, 10.0)])
            .unwrap();
        assert_eq!(adapter.list_symbols().unwrap(), vec!["ABC", "XYZ"]);
    }

    #[test]
    fn data_range_reports_bounds() {
        let adapter = store();
        adapter
            .upsert_bars(&[bar("ABC", 1, 10.0), bar("ABC", 5, 10.0)])
            .unwrap();
        let (min, max, count) = adapter.data_range("ABC").unwrap().unwrap();
        assert_eq!(min, date(2024, 1, 1));
        assert_eq!(max, date(2024, 1, 5));
        assert_eq!(count, 2);
    }

    #[test]
    fn data_range_no_data() {
        let adapter = store();
        assert!(adapter.data_range("ABC").unwrap().is_none());
    }
}
