//! Background warmer: keeps the live snapshot fresh while clients are polling.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use hostcheck_core::live::LiveMetricsSampler;
use hostcheck_core::live::settings::LiveDbSettings;

use crate::state::{LAST_CLIENT_ACTIVITY, now_epoch};

/// Stop warming after this many seconds without an API request.
pub(crate) const CLIENT_IDLE_SECS: i64 = 60;

pub(crate) fn is_idle(last_activity: i64, now: i64) -> bool {
    now.saturating_sub(last_activity) > CLIENT_IDLE_SECS
}

/// Re-reads settings every cycle and sleeps for the configured interval.
///
/// Uses `refresh()`, so a cycle that overlaps a client-triggered sample is skipped.
pub(crate) async fn warm_loop(sampler: Arc<LiveMetricsSampler>) {
    let mut interval = Duration::from_secs(LiveDbSettings::default().interval_seconds);
    let mut cycles: u64 = 0;

    loop {
        tokio::time::sleep(interval).await;

        let idle = is_idle(LAST_CLIENT_ACTIVITY.load(Ordering::Relaxed), now_epoch());
        let s = sampler.clone();
        let t0 = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            let settings = s.settings();
            let outcome = (settings.enabled && !idle).then(|| s.refresh());
            (settings, outcome)
        })
        .await;

        let (settings, outcome) = match result {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "warm cycle panicked in spawn_blocking");
                continue;
            }
        };
        interval = Duration::from_secs(settings.interval_seconds);

        let Some(outcome) = outcome else {
            continue;
        };
        cycles += 1;
        let duration_ms = t0.elapsed().as_millis() as u64;
        if cycles == 1 {
            info!(duration_ms, status = outcome.status(), "first live sample collected");
        } else {
            debug!(duration_ms, status = outcome.status(), cycles, "warm cycle completed");
        }
    }
}
