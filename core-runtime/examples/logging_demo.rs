//! Logging setup for an ingest host
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example logging_demo
//!
//! # JSON format, mirrored to a console sink
//! cargo run --example logging_demo -- json
//!
//! # Compact format with a custom filter
//! cargo run --example logging_demo -- compact "core_runtime=trace"
//! ```

use bridge_traits::log::{ConsoleLogger, LogLevel};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::env;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Debug)
        .with_spans(true)
        .with_logger_sink(Arc::new(ConsoleLogger {
            min_level: LogLevel::Warn,
        }));

    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    if let Err(e) = init_logging(config) {
        eprintln!("Failed to initialize logging: {}", e);
        return;
    }

    info!(format = ?format, "Logging initialized");

    for name in ["beach.heic", "notes.pdf", "broken.png"] {
        ingest_file(name).await;
    }

    info!(ingested = 2, failed = 1, "Demo run completed");
}

#[instrument]
async fn ingest_file(name: &str) {
    debug!(path = %name, "Copying into managed storage");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    if name.starts_with("broken") {
        // Mirrored to the console sink as well
        error!(path = %name, stage = "convert", error = "invalid PNG signature", "File failed");
        return;
    }

    if name.ends_with(".heic") {
        warn!(path = %name, "HEIF decode unavailable, keeping original");
    }
    info!(path = %name, "File ingested");
}
