//! Concrete adapter implementations for ports.

pub mod alpha_vantage_adapter;
pub mod env_config_adapter;
pub mod file_config_adapter;
#[cfg(feature = "postgres")]
pub mod postgres_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
#[cfg(feature = "web")]
pub mod web;
