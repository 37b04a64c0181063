//! Integration tests for logging setup and sink mirroring

use bridge_traits::log::{LogLevel, LoggerSink, RecordingLogger};
use core_runtime::logging::{init_logging, LogFormat, LoggerSinkLayer, LoggingConfig};
use core_runtime::Error;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
    assert!(config.logger_sink.is_none());
}

#[test]
fn test_sink_entry_carries_span_name() {
    let sink = Arc::new(RecordingLogger::new(LogLevel::Debug));
    let trait_sink: Arc<dyn LoggerSink> = sink.clone();
    let subscriber = tracing_subscriber::registry().with(LoggerSinkLayer::new(Some(trait_sink)));
    let _guard = tracing::subscriber::set_default(subscriber);

    let span = tracing::info_span!("ingest_file");
    let _enter = span.enter();
    tracing::error!(
        target: "core_ingest",
        path = "/in/a.png",
        stage = "copy",
        "File failed"
    );

    let errors = sink.entries_at(LogLevel::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].span_id.as_deref(), Some("ingest_file"));
    assert_eq!(errors[0].fields["stage"], "copy");
}

#[test]
fn test_layer_without_sink_is_inert() {
    let subscriber = tracing_subscriber::registry().with(LoggerSinkLayer::new(None));
    let _guard = tracing::subscriber::set_default(subscriber);

    tracing::info!(path = "/in/a.png", "Nothing to forward to");
}

#[test]
fn test_global_init_only_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_filter("core_runtime=debug");

    init_logging(config.clone()).unwrap();
    let second = init_logging(config);

    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_invalid_filter_fails_before_init() {
    let config = LoggingConfig::default().with_filter("core_ingest=loud");
    assert!(matches!(init_logging(config), Err(Error::Config(_))));
}
