//! hostcheck-core: host environment diagnostics and live data-store sampling.
//!
//! Provides:
//! - `catalog`: required/recommended baselines for versions, extensions, config knobs
//! - `value`: requirement values and unit conversions (sizes, versions)
//! - `analysis`: threshold classification, checklists, health verdict, recommendations,
//!   performance heuristics
//! - `collector`: probe traits consumed by the engine, test doubles, file-backed facts,
//!   and (with `postgres` feature, default) a PostgreSQL live metrics source
//! - `live`: rate-limited live metrics sampler with TTL cache and persisted settings
//! - `slowlog`: slow-query normalization and signature aggregation
//! - `fmt`: shared formatting helpers (bytes, megabytes)

pub mod analysis;
pub mod catalog;
pub mod collector;
pub mod fmt;
pub mod live;
pub mod slowlog;
pub mod value;

/// Crate version, reported by the web transport.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Source revision from `git describe` (or `HOSTCHECK_GIT_SHA` at build time), `unknown` otherwise.
pub const GIT_SHA: &str = env!("GIT_SHA");
