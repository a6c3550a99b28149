//! HTTP request handlers for the web adapter.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::history::PriceRow;
use crate::domain::ingestion::IngestMode;
use crate::domain::recommendation::Recommendation;

use super::{AppState, WebError};

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    #[serde(default)]
    pub range: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    #[serde(default)]
    pub reconcile: bool,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: &'static str,
    #[serde(rename = "newRecords")]
    pub new_records: usize,
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<PriceRow>>, WebError> {
    let rows = state.history.history(&symbol, &query.range).await?;
    Ok(Json(rows))
}

pub async fn get_recommendations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<Recommendation>>, WebError> {
    let results = state.recommender.recommend(&query.range).await?;
    Ok(Json(results))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<RefreshResponse>, WebError> {
    let mode = if query.reconcile {
        IngestMode::Reconcile
    } else {
        IngestMode::Incremental
    };
    let new_records = state.ingestor.refresh(&symbol, mode).await?;
    Ok(Json(RefreshResponse {
        message: "Stock data refreshed",
        new_records,
    }))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn not_found() -> WebError {
    WebError::not_found("Not found")
}
