//! # Media Conversion Module
//!
//! Owns every write into managed storage: verified copies of source files
//! and their AVIF/JPEG renditions.

pub mod converter;
pub mod error;

pub use converter::{ByteCopier, ConversionPlan, FormatConverter, ManagedCopy, TokioCopier};
pub use error::{ConversionError, Result};
