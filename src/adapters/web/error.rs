//! HTTP error responses for the web adapter.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::domain::error::StockdeskError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<StockdeskError> for WebError {
    fn from(err: StockdeskError) -> Self {
        let status = status_from_error(&err);
        if status.is_server_error() {
            error!(error = %err, "request failed");
        } else {
            warn!(error = %err, status = status.as_u16(), "request rejected");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

pub fn status_from_error(err: &StockdeskError) -> StatusCode {
    match err {
        StockdeskError::Validation { .. } => StatusCode::BAD_REQUEST,
        StockdeskError::SymbolNotFound { .. } | StockdeskError::NoData { .. } => {
            StatusCode::NOT_FOUND
        }
        StockdeskError::Upstream { .. }
        | StockdeskError::Database { .. }
        | StockdeskError::DatabaseQuery { .. }
        | StockdeskError::ConfigParse { .. }
        | StockdeskError::ConfigMissing { .. }
        | StockdeskError::ConfigInvalid { .. }
        | StockdeskError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
