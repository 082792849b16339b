use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use quoting_engine::application::service::QuotingService;
use quoting_engine::config::QuotingConfig;
use quoting_engine::domain::ports::QuoteStoreRef;
use quoting_engine::infrastructure::http::ReqwestCallbackClient;
use quoting_engine::infrastructure::in_memory::InMemoryQuoteStore;
use quoting_engine::infrastructure::reference::ReferenceCatalog;
#[cfg(feature = "storage-rocksdb")]
use quoting_engine::infrastructure::rocksdb::RocksDbQuoteStore;
use quoting_engine::infrastructure::rules::PermitAllRules;
use quoting_engine::interfaces::csv::endpoint_reader::EndpointReader;
use quoting_engine::interfaces::json::operation_reader::OperationReader;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Inbound operations, one JSON object per line
    input: PathBuf,

    /// Participant endpoints CSV (participant,endpoint_type,value)
    #[arg(long, env = "QUOTING_ENDPOINTS")]
    endpoints: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "QUOTING_DB_PATH")]
    db_path: Option<PathBuf>,

    #[arg(long, env = "QUOTING_CACHE_TTL_SECONDS", default_value_t = 60)]
    cache_ttl_seconds: u64,

    /// Delivery attempts per error callback
    #[arg(long, env = "QUOTING_ERROR_CALLBACK_ATTEMPTS", default_value_t = 1)]
    error_callback_attempts: u32,

    /// Bound on concurrently running forwards and callbacks
    #[arg(long, env = "QUOTING_MAX_IN_FLIGHT")]
    max_in_flight: Option<usize>,

    #[arg(long, env = "QUOTING_OUTBOUND_TIMEOUT_MS", default_value_t = 10_000)]
    outbound_timeout_ms: u64,

    /// Participant name used as FSPIOP-Source on switch-originated callbacks
    #[arg(long, env = "QUOTING_SWITCH_ID", default_value = "switch")]
    switch_id: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

impl Cli {
    fn config(&self) -> QuotingConfig {
        QuotingConfig {
            cache_ttl_seconds: self.cache_ttl_seconds,
            error_callback_attempts: self.error_callback_attempts,
            max_in_flight: self.max_in_flight,
            outbound_timeout_ms: self.outbound_timeout_ms,
            switch_id: self.switch_id.clone(),
        }
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    match format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn open_store(db_path: Option<&Path>) -> Result<QuoteStoreRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Arc::new(RocksDbQuoteStore::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryQuoteStore::new()))
        }
        None => Ok(Arc::new(InMemoryQuoteStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);
    let config = cli.config();

    let store = open_store(cli.db_path.as_deref())?;

    let catalog = ReferenceCatalog::with_defaults();
    if let Some(path) = &cli.endpoints {
        let file = File::open(path).into_diagnostic()?;
        let count = EndpointReader::new(file)
            .register_all(&catalog)
            .await
            .into_diagnostic()?;
        info!(count, "participant endpoints registered");
    }

    let client = ReqwestCallbackClient::new(config.outbound_timeout()).into_diagnostic()?;
    let service = QuotingService::new(
        store,
        Arc::new(catalog),
        Arc::new(client),
        Arc::new(PermitAllRules),
        &config,
    );

    let file = File::open(&cli.input).into_diagnostic()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for operation in OperationReader::new(BufReader::new(file)).operations() {
        let operation = match operation {
            Ok(operation) => operation,
            Err(e) => {
                eprintln!("Error reading operation: {}", e);
                continue;
            }
        };
        let name = operation.name();
        let quote_id = operation.quote_id().to_string();
        match operation.apply(&service).await {
            Ok(ack) => writeln!(out, "{ack}").into_diagnostic()?,
            Err(e) => {
                error!(operation = name, %quote_id, error = %e, "operation failed");
                eprintln!("Error processing {name} for quote {quote_id}: {e}");
            }
        }
    }
    out.flush().into_diagnostic()?;

    // Scheduled forwards and error callbacks finish before exit.
    service.scheduler().wait_idle().await;
    Ok(())
}
