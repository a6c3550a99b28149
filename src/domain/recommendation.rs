//! Momentum ranking across every stored symbol.

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::error::StockdeskError;
use crate::domain::indicator;
use crate::domain::window::RecommendationWindow;
use crate::ports::price_store::{with_store, SharedStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub symbol: String,
    /// Closes used for the readings, newest first.
    #[serde(rename = "data")]
    pub closes: Vec<f64>,
    pub momentum: f64,
    pub rsi: f64,
}

pub struct Recommender {
    store: SharedStore,
}

impl Recommender {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Score every stored symbol over `window` and rank by momentum.
    ///
    /// A symbol whose closes cannot be read is logged and left out; only a
    /// failure to list symbols at all is returned as an error.
    pub async fn recommend(&self, window: &str) -> Result<Vec<Recommendation>, StockdeskError> {
        let window: RecommendationWindow = window.parse()?;
        let limit = window.closes();

        let symbols = with_store(&self.store, |s| s.list_symbols()).await?;

        let mut results = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let key = symbol.clone();
            let closes = match with_store(&self.store, move |s| s.recent_closes(&key, limit)).await
            {
                Ok(c) => c,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "skipping symbol");
                    continue;
                }
            };

            if closes.is_empty() {
                continue;
            }

            let reading = indicator::evaluate(&closes);
            results.push(Recommendation {
                symbol,
                closes,
                momentum: reading.momentum,
                rsi: reading.rsi,
            });
        }

        rank(&mut results);
        info!(%window, count = results.len(), "computed recommendations");
        Ok(results)
    }
}

/// Momentum descending; ties keep encounter order.
pub fn rank(results: &mut [Recommendation]) {
    results.sort_by(|a, b| b.momentum.total_cmp(&a.momentum));
}
