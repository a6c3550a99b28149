//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use crate::adapters::alpha_vantage_adapter::AlphaVantageAdapter;
use crate::adapters::env_config_adapter::EnvConfigAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::error::StockdeskError;
use crate::domain::history::HistoryService;
use crate::domain::ingestion::{IngestMode, Ingestor};
use crate::domain::ohlcv::normalize_symbol;
use crate::domain::recommendation::Recommender;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_store::{with_store, SharedStore};
use crate::ports::quote_port::SharedQuotes;

pub const DEFAULT_LOG_FILTER: &str = "stockdesk=info,tower_http=info";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

#[derive(Parser, Debug)]
#[command(name = "stockdesk", about = "Daily stock history cache and momentum ranking")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API
    Serve {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print daily history for a symbol as JSON
    History {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        range: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Rank every stored symbol by momentum
    Recommend {
        #[arg(long)]
        range: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Pull the latest sessions for a symbol from upstream
    Refresh {
        #[arg(long)]
        symbol: String,
        /// Re-apply every upstream session, not just the new ones
        #[arg(long)]
        reconcile: bool,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List stored symbols
    Symbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show the stored date range for a symbol
    Info {
        #[arg(long)]
        symbol: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl Command {
    fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Command::Serve { config }
            | Command::History { config, .. }
            | Command::Recommend { config, .. }
            | Command::Refresh { config, .. }
            | Command::Symbols { config }
            | Command::Info { config, .. } => config.as_ref(),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing();
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
    }
}

/// Install the stderr subscriber. A second call is a no-op.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub fn execute(command: Command) -> Result<(), StockdeskError> {
    let config = load_config(command.config_path())?;
    let store = open_store(&config)?;
    store.initialize_schema()?;

    let runtime = tokio::runtime::Runtime::new()?;

    match command {
        Command::Serve { .. } => run_serve(&runtime, &config, store),
        Command::History { symbol, range, .. } => {
            let quotes = open_quotes(&config)?;
            let ingestor = Arc::new(Ingestor::new(Arc::clone(&store), quotes));
            let service = HistoryService::new(store, ingestor);
            let rows = runtime.block_on(service.history(&symbol, &range))?;
            print_json(&rows)
        }
        Command::Recommend { range, .. } => {
            let recommender = Recommender::new(store);
            let results = runtime.block_on(recommender.recommend(&range))?;
            print_json(&results)
        }
        Command::Refresh {
            symbol, reconcile, ..
        } => {
            let mode = if reconcile {
                IngestMode::Reconcile
            } else {
                IngestMode::Incremental
            };
            let ingestor = Ingestor::new(store, open_quotes(&config)?);
            let written = runtime.block_on(ingestor.refresh(&symbol, mode))?;
            println!("{written} new records");
            Ok(())
        }
        Command::Symbols { .. } => {
            let symbols = runtime.block_on(with_store(&store, |s| s.list_symbols()))?;
            for symbol in symbols {
                println!("{symbol}");
            }
            Ok(())
        }
        Command::Info { symbol, .. } => {
            let symbol = normalize_symbol(&symbol)?;
            let key = symbol.clone();
            let range = runtime.block_on(with_store(&store, move |s| s.data_range(&key)))?;
            match range {
                Some((first, last, rows)) => {
                    println!("{symbol}: {first} to {last} ({rows} rows)");
                    Ok(())
                }
                None => Err(StockdeskError::NoData { symbol }),
            }
        }
    }
}

/// Environment variables layered over the optional INI file.
pub fn load_config(path: Option<&PathBuf>) -> Result<EnvConfigAdapter, StockdeskError> {
    let file = match path {
        Some(path) => {
            let adapter =
                FileConfigAdapter::from_file(path).map_err(|e| StockdeskError::ConfigParse {
                    file: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            Some(adapter)
        }
        None => None,
    };
    Ok(EnvConfigAdapter::from_env(file))
}

/// Build the store named by `[database] backend` (default `sqlite`).
pub fn open_store(config: &dyn ConfigPort) -> Result<SharedStore, StockdeskError> {
    let backend = config
        .get_string("database", "backend")
        .unwrap_or_else(|| "sqlite".to_string())
        .trim()
        .to_ascii_lowercase();

    let store: SharedStore = match backend.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" => Arc::new(crate::adapters::sqlite_adapter::SqliteAdapter::from_config(
            config,
        )?),
        #[cfg(feature = "postgres")]
        "postgres" | "cockroachdb" => Arc::new(
            crate::adapters::postgres_adapter::PostgresAdapter::from_config(config)?,
        ),
        other => {
            return Err(StockdeskError::ConfigInvalid {
                section: "database".into(),
                key: "backend".into(),
                reason: format!("unsupported or disabled backend '{other}'"),
            });
        }
    };

    info!(%backend, "opened price store");
    Ok(store)
}

fn open_quotes(config: &dyn ConfigPort) -> Result<SharedQuotes, StockdeskError> {
    Ok(Arc::new(AlphaVantageAdapter::from_config(config)?))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), StockdeskError> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{json}");
    Ok(())
}

fn run_serve(
    runtime: &tokio::runtime::Runtime,
    config: &dyn ConfigPort,
    store: SharedStore,
) -> Result<(), StockdeskError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{build_router, AppState};
        use std::net::SocketAddr;

        let listen = config
            .get_string("web", "listen")
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let addr: SocketAddr = listen.trim().parse().map_err(|e: std::net::AddrParseError| {
            StockdeskError::ConfigInvalid {
                section: "web".into(),
                key: "listen".into(),
                reason: e.to_string(),
            }
        })?;

        let state = AppState::new(store, open_quotes(config)?);
        let router = build_router(state, config.get_bool("web", "cors", true));

        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(%addr, "listening");
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                    info!("shutting down");
                })
                .await?;
            Ok::<(), StockdeskError>(())
        })
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = (runtime, config, store);
        Err(StockdeskError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: "built without the web feature".into(),
        })
    }
}
