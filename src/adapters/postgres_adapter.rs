//! PostgreSQL / CockroachDB price store adapter.

use crate::domain::error::StockdeskError;
use crate::domain::ohlcv::DailyBar;
use crate::domain::window::RowBound;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_store::PriceStore;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use postgres::types::ToSql;
use postgres::{NoTls, Row};
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;

type Manager = PostgresConnectionManager<NoTls>;

pub struct PostgresAdapter {
    pool: Pool<Manager>,
}

fn pool_err(e: r2d2::Error) -> StockdeskError {
    StockdeskError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: postgres::Error) -> StockdeskError {
    StockdeskError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn row_to_bar(row: &Row) -> DailyBar {
    DailyBar {
        date: row.get(0),
        symbol: row.get(1),
        open: row.get(2),
        high: row.get(3),
        low: row.get(4),
        close: row.get(5),
        volume: row.get(6),
        last_updated: row.get(7),
    }
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockdeskError> {
        // Try [postgres] connection_string first, fall back to [database] conninfo
        let connection_string = config
            .get_string("postgres", "connection_string")
            .or_else(|| config.get_string("database", "conninfo"))
            .ok_or_else(|| StockdeskError::ConfigMissing {
                section: "postgres".into(),
                key: "connection_string".into(),
            })?;

        let pg_config = connection_string
            .parse::<postgres::Config>()
            .map_err(|e| StockdeskError::ConfigInvalid {
                section: "postgres".into(),
                key: "connection_string".into(),
                reason: e.to_string(),
            })?;

        let pool_size = config.get_int("postgres", "pool_size", 4).max(1) as u32;
        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<Manager>, StockdeskError> {
        self.pool.get().map_err(pool_err)
    }
}

impl PriceStore for PostgresAdapter {
    fn initialize_schema(&self) -> Result<(), StockdeskError> {
        self.conn()?
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS stock_data (
                    date DATE NOT NULL,
                    symbol TEXT NOT NULL,
                    open DOUBLE PRECISION NOT NULL,
                    high DOUBLE PRECISION NOT NULL,
                    low DOUBLE PRECISION NOT NULL,
                    close DOUBLE PRECISION NOT NULL,
                    volume BIGINT NOT NULL,
                    last_updated TIMESTAMP DEFAULT now(),
                    PRIMARY KEY (date, symbol)
                );
                CREATE INDEX IF NOT EXISTS idx_stock_data_symbol_date ON stock_data (symbol, date);",
            )
            .map_err(query_err)
    }

    fn count_rows(&self, symbol: &str) -> Result<usize, StockdeskError> {
        let row = self
            .conn()?
            .query_one("SELECT COUNT(*) FROM stock_data WHERE symbol = $1", &[&symbol])
            .map_err(query_err)?;
        let count: i64 = row.get(0);
        Ok(count as usize)
    }

    fn latest_date(&self, symbol: &str) -> Result<Option<NaiveDate>, StockdeskError> {
        let row = self
            .conn()?
            .query_one("SELECT MAX(date) FROM stock_data WHERE symbol = $1", &[&symbol])
            .map_err(query_err)?;
        Ok(row.get(0))
    }

    fn upsert_bars(&self, bars: &[DailyBar]) -> Result<usize, StockdeskError> {
        let mut conn = self.conn()?;
        let mut tx = conn.transaction().map_err(query_err)?;
        let stmt = tx
            .prepare(
                "INSERT INTO stock_data (date, symbol, open, high, low, close, volume, last_updated)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (date, symbol) DO UPDATE SET
                     open = EXCLUDED.open,
                     high = EXCLUDED.high,
                     low = EXCLUDED.low,
                     close = EXCLUDED.close,
                     volume = EXCLUDED.volume,
                     last_updated = EXCLUDED.last_updated",
            )
            .map_err(query_err)?;

        let now: NaiveDateTime = Utc::now().naive_utc();
        let mut written = 0;
        for bar in bars {
            let params: &[&(dyn ToSql + Sync)] = &[
                &bar.date,
                &bar.symbol,
                &bar.open,
                &bar.high,
                &bar.low,
                &bar.close,
                &bar.volume,
                &now,
            ];
            written += tx.execute(&stmt, params).map_err(query_err)? as usize;
        }

        tx.commit().map_err(query_err)?;
        Ok(written)
    }

    fn scan(&self, symbol: &str, bound: RowBound) -> Result<Vec<DailyBar>, StockdeskError> {
        let mut conn = self.conn()?;
        let rows = match bound {
            RowBound::Latest(limit) => conn.query(
                "SELECT date, symbol, open, high, low, close, volume, last_updated
                 FROM stock_data WHERE symbol = $1 ORDER BY date DESC LIMIT $2",
                &[&symbol, &(limit as i64)],
            ),
            RowBound::Since(from) => conn.query(
                "SELECT date, symbol, open, high, low, close, volume, last_updated
                 FROM stock_data WHERE symbol = $1 AND date >= $2 ORDER BY date DESC",
                &[&symbol, &from],
            ),
        }
        .map_err(query_err)?;

        Ok(rows.iter().map(row_to_bar).collect())
    }

    fn recent_closes(&self, symbol: &str, limit: usize) -> Result<Vec<f64>, StockdeskError> {
        let rows = self
            .conn()?
            .query(
                "SELECT close FROM stock_data WHERE symbol = $1 ORDER BY date DESC LIMIT $2",
                &[&symbol, &(limit as i64)],
            )
            .map_err(query_err)?;

        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, StockdeskError> {
        let rows = self
            .conn()?
            .query("SELECT DISTINCT symbol FROM stock_data ORDER BY symbol", &[])
            .map_err(query_err)?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, StockdeskError> {
        let row = self
            .conn()?
            .query_one(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM stock_data WHERE symbol = $1",
                &[&symbol],
            )
            .map_err(query_err)?;

        let min: Option<NaiveDate> = row.get(0);
        let max: Option<NaiveDate> = row.get(1);
        let count: i64 = row.get(2);

        match (min, max) {
            (Some(min), Some(max)) if count > 0 => Ok(Some((min, max, count as usize))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MapConfig(Vec<(&'static str, &'static str, &'static str)>);

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.0
                .iter()
                .find(|(s, k, _)| *s == section && *k == key)
                .map(|(_, _, v)| v.to_string())
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    #[test]
    fn from_config_missing_connection_string() {
        let result = PostgresAdapter::from_config(&MapConfig(vec![]));
        match result {
            Err(StockdeskError::ConfigMissing { section, key }) => {
                assert_eq!(section, "postgres");
                assert_eq!(key, "connection_string");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn from_config_rejects_malformed_connection_string() {
        let config = MapConfig(vec![("postgres", "connection_string", "host=localhost port=notaport")]);
        assert!(matches!(
            PostgresAdapter::from_config(&config),
            Err(StockdeskError::ConfigInvalid { .. })
        ));
    }
}
