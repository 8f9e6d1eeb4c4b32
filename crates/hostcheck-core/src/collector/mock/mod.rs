//! Test doubles for the probe traits.

mod live;
mod probe;
mod scenarios;

pub use live::{LiveCallCounts, MockLiveSource, MockSlowQuerySource, PROBE_NAMES};
pub use probe::MockProbe;
