//! Slow-query signature aggregation.
//!
//! Raw query samples are normalized into signatures ([`normalize`]), bucketed
//! by exact signature, and ranked by total elapsed time.

pub mod normalize;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use normalize::{SqlDialect, normalize_query, normalize_query_as};

/// Bounds applied to any caller-supplied pattern limit.
pub const MIN_PATTERNS: usize = 1;
pub const MAX_PATTERNS: usize = 20;

/// One raw slow-query record from a sample source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlowQuerySample {
    pub query: String,
    pub elapsed_seconds: f64,
}

impl SlowQuerySample {
    pub fn new(query: impl Into<String>, elapsed_seconds: f64) -> Self {
        Self {
            query: query.into(),
            elapsed_seconds,
        }
    }
}

/// Aggregate statistics for one normalized signature.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct SlowQueryPattern {
    pub signature: String,
    pub occurrence_count: u64,
    pub total_elapsed: f64,
    pub max_elapsed: f64,
    pub avg_elapsed: f64,
}

/// Groups samples by signature and returns the top `limit` patterns.
///
/// Ordering is total elapsed time descending; equal totals keep the order in
/// which their signatures were first seen. `limit` is clamped to
/// [`MIN_PATTERNS`]..=[`MAX_PATTERNS`]. Non-finite or negative elapsed times
/// count as zero.
pub fn aggregate(samples: &[SlowQuerySample], limit: usize) -> Vec<SlowQueryPattern> {
    aggregate_as(samples, limit, SqlDialect::MySql)
}

/// [`aggregate`] for query text written in `dialect`.
pub fn aggregate_as(
    samples: &[SlowQuerySample],
    limit: usize,
    dialect: SqlDialect,
) -> Vec<SlowQueryPattern> {
    let limit = limit.clamp(MIN_PATTERNS, MAX_PATTERNS);

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut patterns: Vec<SlowQueryPattern> = Vec::new();

    for sample in samples {
        let signature = normalize_query_as(&sample.query, dialect);
        let elapsed = if sample.elapsed_seconds.is_finite() && sample.elapsed_seconds > 0.0 {
            sample.elapsed_seconds
        } else {
            0.0
        };

        let pos = *index.entry(signature.clone()).or_insert_with(|| {
            patterns.push(SlowQueryPattern {
                signature,
                occurrence_count: 0,
                total_elapsed: 0.0,
                max_elapsed: 0.0,
                avg_elapsed: 0.0,
            });
            patterns.len() - 1
        });

        let p = &mut patterns[pos];
        p.occurrence_count += 1;
        p.total_elapsed += elapsed;
        p.max_elapsed = p.max_elapsed.max(elapsed);
    }

    for p in &mut patterns {
        p.avg_elapsed = p.total_elapsed / p.occurrence_count as f64;
    }

    // sort_by is stable: ties keep first-seen order
    patterns.sort_by(|a, b| b.total_elapsed.total_cmp(&a.total_elapsed));
    patterns.truncate(limit);
    patterns
}
