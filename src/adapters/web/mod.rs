//! HTTP JSON API adapter.
//!
//! Thin axum layer over the domain services: extracts path and query
//! parameters, calls the service, maps `StockdeskError` to a status code.

mod error;
mod handlers;

pub use error::{status_from_error, WebError};
pub use handlers::*;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::domain::history::HistoryService;
use crate::domain::ingestion::Ingestor;
use crate::domain::recommendation::Recommender;
use crate::ports::price_store::SharedStore;
use crate::ports::quote_port::SharedQuotes;

pub struct AppState {
    pub history: HistoryService,
    pub recommender: Recommender,
    pub ingestor: Arc<Ingestor>,
}

impl AppState {
    /// Wire every service over one store and one upstream.
    pub fn new(store: SharedStore, quotes: SharedQuotes) -> Self {
        let ingestor = Arc::new(Ingestor::new(Arc::clone(&store), quotes));
        Self {
            history: HistoryService::new(Arc::clone(&store), Arc::clone(&ingestor)),
            recommender: Recommender::new(store),
            ingestor,
        }
    }
}

pub fn build_router(state: AppState, permissive_cors: bool) -> Router {
    let router = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/stocks/{symbol}", get(handlers::get_history))
        .route("/api/stocks/{symbol}/refresh", post(handlers::refresh))
        .route("/api/stocksRecommend", get(handlers::get_recommendations))
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-cache, no-store, must-revalidate"),
                )),
        )
        .with_state(Arc::new(state));

    let router = if permissive_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}
