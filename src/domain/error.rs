//! Domain error types.

/// Top-level error type for stockdesk.
#[derive(Debug, thiserror::Error)]
pub enum StockdeskError {
    #[error("{reason}")]
    Validation { reason: String },

    #[error("stock symbol '{symbol}' not found")]
    SymbolNotFound { symbol: String },

    #[error("no data found for symbol '{symbol}'")]
    NoData { symbol: String },

    #[error("upstream error: {reason}")]
    Upstream { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StockdeskError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// True for both "unknown upstream" and "no rows matched".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SymbolNotFound { .. } | Self::NoData { .. })
    }
}

impl From<&StockdeskError> for std::process::ExitCode {
    fn from(err: &StockdeskError) -> Self {
        let code: u8 = match err {
            StockdeskError::Io(_) => 1,
            StockdeskError::ConfigParse { .. }
            | StockdeskError::ConfigMissing { .. }
            | StockdeskError::ConfigInvalid { .. } => 2,
            StockdeskError::Database { .. } | StockdeskError::DatabaseQuery { .. } => 3,
            StockdeskError::Validation { .. } => 4,
            StockdeskError::SymbolNotFound { .. } | StockdeskError::NoData { .. } => 5,
            StockdeskError::Upstream { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
