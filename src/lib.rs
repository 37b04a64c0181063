//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-ingest`, `bridge-desktop`). Host applications can
//! depend on `media-ingest-workspace` and enable `desktop-shims` or `heif`
//! without wiring each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_ingest::*;
