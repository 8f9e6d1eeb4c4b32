//! Probe infrastructure.
//!
//! The engine never touches the host directly. It reads current values
//! through traits, with swappable implementations for production and tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │     DiagnosticEvaluator      │   │      LiveMetricsSampler      │
//! └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                │                                  │
//!       ┌────────▼─────────┐           ┌────────────▼─────────────┐
//!       │ EnvironmentProbe │ (trait)   │ LiveMetricsSource (trait)│
//!       └────────┬─────────┘           │ SlowQuerySource   (trait)│
//!                │                     └────────────┬─────────────┘
//!     ┌──────────┼───────────┐             ┌────────┴────────┐
//!     │          │           │             │                 │
//! ┌───▼──────┐ ┌─▼────────┐ ┌▼──────────┐ ┌▼────────────────┐ ┌▼──────────────┐
//! │FactsProbe│ │CachedProbe│ │ MockProbe │ │PostgresCollector│ │MockLiveSource │
//! │ (JSON)   │ │ (1h TTL)  │ │ (Testing) │ │ (postgres)      │ │ (Testing)     │
//! └──────────┘ └───────────┘ └───────────┘ └─────────────────┘ └───────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use hostcheck_core::collector::{EnvironmentProbe, MockProbe};
//!
//! let probe = MockProbe::typical_host();
//! assert_eq!(probe.version("php").unwrap(), "8.2.12");
//! ```

mod cached;
mod detached;
mod facts;
pub mod mock;
#[cfg(feature = "postgres")]
mod pg_collector;
pub mod traits;

pub use cached::{CachedProbe, VERSION_CACHE_TTL};
pub use detached::DetachedSource;
pub use facts::{EnvironmentFacts, FactsProbe};
pub use mock::{MockLiveSource, MockProbe, MockSlowQuerySource};
#[cfg(feature = "postgres")]
pub use pg_collector::{PgCollectError, PostgresCollector};
pub use traits::{
    EnvironmentProbe, HostFacts, LiveMetricsSource, ProbeError, ResourceCounters, SecurityFacts,
    ServerFacts, SiteFacts, SlowQuerySource, StatusCounters,
};
