//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the media ingest core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Retry policy for rate-limited collaborators
//!
//! ## Overview
//!
//! This crate contains the runtime utilities every other core crate depends
//! on. It establishes the logging conventions, the fail-fast configuration
//! builder and the shared retry behaviour.

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;

pub use error::{Error, Result};
