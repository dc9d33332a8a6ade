//! Resolve, rank and verify disk image downloads across mirrors
//!
//! # Modules
//!
//! - [`version`]: Version parsing and total ordering
//! - [`integrity`]: Digests and OpenPGP signatures
//! - [`fetch`]: HTTP transport, run-scoped page cache and cancellation
//! - [`mirror`]: Mirror sources and per-mirror resolution
//! - [`manager`]: Multi-mirror coordination with fallback
//! - [`installer`]: Local files and safe replacement
//! - [`config`]: Constants, paths and the TOML catalogue
//! - [`logging`]: Tracing setup for the binary

pub mod config;
pub mod fetch;
pub mod installer;
pub mod integrity;
pub mod logging;
pub mod manager;
pub mod mirror;
pub mod version;
