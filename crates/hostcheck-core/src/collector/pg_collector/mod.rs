//! PostgreSQL live metrics source.
//!
//! Serves the live sampler's probes from a single connection:
//! - `SELECT 1` round trip for response time
//! - `{prefix}options` / `{prefix}posts` for autoload size and revision count
//! - `pg_database_size()` for the schema-wide size
//! - `pg_stat_user_tables` for the dead-tuple overhead estimate
//! - `pg_stat_activity` for connection count, long-running statement count and
//!   slow-query samples
//!
//! Every statement runs under `statement_timeout`, and the connection itself
//! under `connect_timeout`, so a stalled server cannot block a sampling cycle
//! indefinitely. A cancelled statement surfaces as [`ProbeError::TimedOut`].

mod queries;

use std::time::{Duration, Instant};

use postgres::error::SqlState;
use postgres::{Client, Config, NoTls};
use tracing::{debug, warn};

use super::traits::{LiveMetricsSource, ProbeError, SlowQuerySource, StatusCounters};
use crate::slowlog::{SlowQuerySample, SqlDialect};

const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_secs(1);
const DEFAULT_TABLE_PREFIX: &str = "wp_";

/// Error type for PostgreSQL collection.
#[derive(Debug)]
pub enum PgCollectError {
    /// Environment variable not set.
    EnvNotSet(String),
    /// Connection failed.
    ConnectionError(String),
    /// Query execution failed.
    QueryError(String),
    /// Statement cancelled by `statement_timeout`.
    Timeout(Duration),
}

impl std::fmt::Display for PgCollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PgCollectError::EnvNotSet(var) => write!(f, "PostgreSQL: {} not set", var),
            PgCollectError::ConnectionError(msg) => write!(f, "PostgreSQL: {}", msg),
            PgCollectError::QueryError(msg) => write!(f, "PostgreSQL query error: {}", msg),
            PgCollectError::Timeout(d) => {
                write!(f, "PostgreSQL: statement timed out after {} ms", d.as_millis())
            }
        }
    }
}

impl std::error::Error for PgCollectError {}

impl From<PgCollectError> for ProbeError {
    fn from(e: PgCollectError) -> Self {
        match e {
            PgCollectError::Timeout(d) => ProbeError::TimedOut(d),
            PgCollectError::EnvNotSet(_) | PgCollectError::ConnectionError(_) => {
                ProbeError::Unavailable(e.to_string())
            }
            PgCollectError::QueryError(_) => ProbeError::Failed(e.to_string()),
        }
    }
}

/// PostgreSQL live metrics collector.
///
/// Connects to PostgreSQL using standard environment variables:
/// - PGHOST (default: localhost)
/// - PGPORT (default: 5432)
/// - PGUSER (default: $USER)
/// - PGPASSWORD (default: empty)
/// - PGDATABASE (default: same as PGUSER)
pub struct PostgresCollector {
    connection_string: String,
    client: Option<Client>,
    last_error: Option<String>,
    server_version_num: Option<i32>,
    table_prefix: String,
    statement_timeout: Duration,
    connect_timeout: Duration,
    slow_threshold: Duration,
}

impl PostgresCollector {
    /// Creates a new PostgreSQL collector from environment variables.
    ///
    /// Uses $USER as default if PGUSER is not set.
    pub fn from_env() -> Result<Self, PgCollectError> {
        let user = std::env::var("PGUSER")
            .or_else(|_| std::env::var("USER"))
            .map_err(|_| PgCollectError::EnvNotSet("PGUSER or USER".to_string()))?;

        let host = std::env::var("PGHOST").unwrap_or_else(|_| "localhost".to_string());
        let port = std::env::var("PGPORT").unwrap_or_else(|_| "5432".to_string());
        let password = std::env::var("PGPASSWORD").unwrap_or_default();
        let database = std::env::var("PGDATABASE").unwrap_or_else(|_| user.clone());

        let connection_string = if password.is_empty() {
            format!("host={} port={} user={} dbname={}", host, port, user, database)
        } else {
            format!(
                "host={} port={} user={} password={} dbname={}",
                host, port, user, password, database
            )
        };

        Ok(Self::with_connection_string(connection_string))
    }

    /// Creates a collector with explicit connection string.
    pub fn with_connection_string(connection_string: String) -> Self {
        Self {
            connection_string,
            client: None,
            last_error: None,
            server_version_num: None,
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
        }
    }

    /// Sets the application table prefix. Characters outside `[A-Za-z0-9_]` are dropped.
    pub fn with_table_prefix(mut self, prefix: &str) -> Self {
        self.table_prefix = queries::sanitize_prefix(prefix);
        self
    }

    /// Per-statement limit applied with `SET statement_timeout` after connecting.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Minimum running time for a statement to count as slow.
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    /// Attempts to connect to PostgreSQL.
    ///
    /// Useful for startup checks before serving requests.
    pub fn try_connect(&mut self) -> Result<(), PgCollectError> {
        self.ensure_connected().map(|_| ())
    }

    /// Returns the last error message, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Ensures the connection is established, reconnecting if needed.
    fn ensure_connected(&mut self) -> Result<&mut Client, PgCollectError> {
        if self.client.is_none() {
            let client = self.connect()?;
            self.client = Some(client);
            self.last_error = None;
        }
        self.client
            .as_mut()
            .ok_or_else(|| PgCollectError::ConnectionError("not connected".to_string()))
    }

    fn connect(&mut self) -> Result<Client, PgCollectError> {
        let mut config: Config = self.connection_string.parse().map_err(|e| {
            PgCollectError::ConnectionError(format!("invalid connection string: {e}"))
        })?;
        config.connect_timeout(self.connect_timeout);

        let mut client = config.connect(NoTls).map_err(|e| {
            let msg = format_postgres_error(&e);
            self.last_error = Some(msg.clone());
            self.server_version_num = None;
            PgCollectError::ConnectionError(msg)
        })?;

        let timeout_ms = self.statement_timeout.as_millis();
        client
            .batch_execute(&format!("SET statement_timeout = {timeout_ms}"))
            .map_err(|e| PgCollectError::QueryError(format_postgres_error(&e)))?;

        // Determine server version once per (re)connect.
        self.server_version_num = client
            .query_one("SHOW server_version_num", &[])
            .ok()
            .and_then(|row| row.try_get::<_, String>(0).ok())
            .and_then(|v| v.parse::<i32>().ok());

        debug!(
            server_version_num = ?self.server_version_num,
            statement_timeout_ms = timeout_ms as u64,
            "PostgreSQL connection established"
        );
        Ok(client)
    }

    /// Maps a query error, dropping the connection if it was closed.
    fn query_error(&mut self, e: postgres::Error) -> PgCollectError {
        if e.code() == Some(&SqlState::QUERY_CANCELED) {
            return PgCollectError::Timeout(self.statement_timeout);
        }
        let msg = format_postgres_error(&e);
        if e.is_closed() {
            warn!(error = %msg, "PostgreSQL connection lost");
            self.client = None;
        }
        self.last_error = Some(msg.clone());
        PgCollectError::QueryError(msg)
    }

    fn query_i64(&mut self, sql: &str) -> Result<i64, PgCollectError> {
        let client = self.ensure_connected()?;
        match client.query_one(sql, &[]) {
            Ok(row) => row
                .try_get::<_, i64>(0)
                .map_err(|e| PgCollectError::QueryError(e.to_string())),
            Err(e) => Err(self.query_error(e)),
        }
    }

    fn slow_threshold_secs(&self) -> f64 {
        self.slow_threshold.as_secs_f64()
    }
}

impl LiveMetricsSource for PostgresCollector {
    fn response_time_ms(&mut self) -> Result<f64, ProbeError> {
        let client = self.ensure_connected()?;
        let start = Instant::now();
        match client.simple_query(queries::PING_QUERY) {
            Ok(_) => Ok(start.elapsed().as_secs_f64() * 1000.0),
            Err(e) => Err(self.query_error(e).into()),
        }
    }

    fn autoload_bytes(&mut self) -> Result<u64, ProbeError> {
        let sql = queries::build_autoload_query(&self.table_prefix);
        Ok(self.query_i64(&sql)?.max(0) as u64)
    }

    fn revision_count(&mut self) -> Result<u64, ProbeError> {
        let sql = queries::build_revision_count_query(&self.table_prefix);
        Ok(self.query_i64(&sql)?.max(0) as u64)
    }

    fn database_size_bytes(&mut self) -> Result<u64, ProbeError> {
        Ok(self.query_i64(queries::DATABASE_SIZE_QUERY)?.max(0) as u64)
    }

    fn status_counters(&mut self) -> Result<StatusCounters, ProbeError> {
        let sql = queries::build_status_counters_query(self.server_version_num);
        let threshold = self.slow_threshold_secs();
        let client = self.ensure_connected()?;
        match client.query_one(&sql, &[&threshold]) {
            Ok(row) => Ok(status_counters_from(row.try_get(0), row.try_get(1))?),
            Err(e) => Err(self.query_error(e).into()),
        }
    }

    fn table_overhead_bytes(&mut self) -> Result<u64, ProbeError> {
        Ok(self.query_i64(queries::TABLE_OVERHEAD_QUERY)?.max(0) as u64)
    }
}

impl SlowQuerySource for PostgresCollector {
    fn slow_query_samples(&mut self) -> Result<Vec<SlowQuerySample>, ProbeError> {
        let threshold = self.slow_threshold_secs();
        let client = self.ensure_connected()?;
        match client.query(queries::SLOW_ACTIVITY_QUERY, &[&threshold]) {
            Ok(rows) => {
                let samples: Vec<SlowQuerySample> = rows
                    .iter()
                    .filter_map(|row| {
                        Some(SlowQuerySample {
                            query: row.try_get(0).ok()?,
                            elapsed_seconds: row.try_get(1).ok()?,
                        })
                    })
                    .collect();
                if samples.len() < rows.len() {
                    debug!(
                        skipped = rows.len() - samples.len(),
                        "undecodable slow query rows skipped"
                    );
                }
                Ok(samples)
            }
            Err(e) => Err(self.query_error(e).into()),
        }
    }

    fn dialect(&self) -> SqlDialect {
        SqlDialect::Postgres
    }
}

/// Builds counters from the two decoded columns. A column that failed to
/// decode fails the probe rather than reading as zero.
fn status_counters_from<E: std::fmt::Display>(
    threads: Result<i64, E>,
    slow: Result<i64, E>,
) -> Result<StatusCounters, PgCollectError> {
    let decode = |column: &str, e: E| PgCollectError::QueryError(format!("{column}: {e}"));
    let threads = threads.map_err(|e| decode("threads_connected", e))?;
    let slow = slow.map_err(|e| decode("slow_queries", e))?;
    Ok(StatusCounters {
        threads_connected: threads.max(0) as u64,
        slow_queries: slow.max(0) as u64,
    })
}

pub(crate) fn format_postgres_error(e: &postgres::Error) -> String {
    if let Some(db_error) = e.as_db_error() {
        format!("{}: {}", db_error.severity(), db_error.message())
    } else {
        let msg = e.to_string();
        if msg.contains("Connection refused") {
            "connection refused".to_string()
        } else if msg.contains("password authentication failed") {
            "password authentication failed".to_string()
        } else if msg.contains("does not exist") {
            msg.split("FATAL:")
                .last()
                .unwrap_or(&msg)
                .trim()
                .to_string()
        } else {
            msg
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sanitizes_prefix() {
        let c = PostgresCollector::with_connection_string("host=localhost".to_string())
            .with_table_prefix("blog-2_");
        assert_eq!(c.table_prefix, "blog2_");
    }

    #[test]
    fn test_invalid_connection_string_is_unavailable() {
        let mut c = PostgresCollector::with_connection_string("host='unterminated".to_string());
        let err: ProbeError = c.revision_count().unwrap_err();
        assert!(matches!(err, ProbeError::Unavailable(_)));
    }

    #[test]
    fn test_status_counters_reject_undecodable_columns() {
        let counters = status_counters_from::<&str>(Ok(7), Ok(-1)).unwrap();
        assert_eq!(counters.threads_connected, 7);
        assert_eq!(counters.slow_queries, 0);

        let err = status_counters_from(Ok(7), Err("cannot convert NUMERIC to BIGINT")).unwrap_err();
        assert!(matches!(err, PgCollectError::QueryError(ref m) if m.starts_with("slow_queries")));
        assert!(matches!(ProbeError::from(err), ProbeError::Failed(_)));
    }

    #[test]
    fn test_reports_postgres_dialect() {
        let c = PostgresCollector::with_connection_string("host=localhost".to_string());
        assert_eq!(c.dialect(), SqlDialect::Postgres);
    }

    #[test]
    fn test_collect_errors_map_to_probe_errors() {
        let timeout = Duration::from_millis(1500);
        assert_eq!(
            ProbeError::from(PgCollectError::Timeout(timeout)),
            ProbeError::TimedOut(timeout)
        );
        assert!(matches!(
            ProbeError::from(PgCollectError::QueryError("boom".to_string())),
            ProbeError::Failed(_)
        ));
        assert!(matches!(
            ProbeError::from(PgCollectError::ConnectionError("refused".to_string())),
            ProbeError::Unavailable(_)
        ));
    }
}
