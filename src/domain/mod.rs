//! Core domain types and logic.

pub mod ohlcv;
pub mod window;
pub mod indicator;
pub mod ingestion;
pub mod history;
pub mod recommendation;
pub mod error;
