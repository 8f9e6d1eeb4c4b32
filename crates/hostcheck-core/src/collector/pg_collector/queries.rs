//! SQL query builders for the live data-store probes.

/// Trivial round-trip used to measure response time.
pub(super) const PING_QUERY: &str = "SELECT 1";

pub(super) const DATABASE_SIZE_QUERY: &str =
    "SELECT pg_database_size(current_database())::bigint";

/// Estimated space held by dead tuples: each table's size scaled by its dead share.
pub(super) const TABLE_OVERHEAD_QUERY: &str = r#"
    SELECT COALESCE(SUM(
        pg_relation_size(relid)::numeric * n_dead_tup
            / NULLIF(n_live_tup + n_dead_tup, 0)
    ), 0)::bigint
    FROM pg_stat_user_tables
"#;

/// Keeps only `[A-Za-z0-9_]` so the prefix can be spliced into identifiers.
pub(super) fn sanitize_prefix(prefix: &str) -> String {
    prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Total size of options loaded on every request.
pub(super) fn build_autoload_query(prefix: &str) -> String {
    format!(
        r#"
            SELECT COALESCE(SUM(LENGTH(option_value)), 0)::bigint
            FROM {prefix}options
            WHERE autoload IN ('yes', 'on', 'auto-on', 'auto')
        "#
    )
}

pub(super) fn build_revision_count_query(prefix: &str) -> String {
    format!("SELECT COUNT(*)::bigint FROM {prefix}posts WHERE post_type = 'revision'")
}

/// Client connections and long-running statements in the current database.
///
/// `backend_type` exists from PostgreSQL 10; older servers count every backend.
/// `$1` is the slow threshold in seconds.
pub(super) fn build_status_counters_query(server_version_num: Option<i32>) -> String {
    let client_filter = if server_version_num.unwrap_or(0) >= 100000 {
        "AND backend_type = 'client backend'"
    } else {
        ""
    };

    format!(
        r#"
            SELECT
                COUNT(*)::bigint AS threads_connected,
                COUNT(*) FILTER (
                    WHERE state = 'active'
                      AND now() - query_start > make_interval(secs => $1)
                )::bigint AS slow_queries
            FROM pg_stat_activity
            WHERE datname = current_database()
              {client_filter}
        "#
    )
}

/// Statements currently running longer than `$1` seconds, excluding our own backend.
pub(super) const SLOW_ACTIVITY_QUERY: &str = r#"
    SELECT
        COALESCE(query, '') AS query,
        EXTRACT(EPOCH FROM now() - query_start)::float8 AS elapsed
    FROM pg_stat_activity
    WHERE state = 'active'
      AND pid <> pg_backend_pid()
      AND query_start IS NOT NULL
      AND now() - query_start > make_interval(secs => $1)
    ORDER BY query_start
    LIMIT 500
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_sanitized() {
        assert_eq!(sanitize_prefix("wp_"), "wp_");
        assert_eq!(sanitize_prefix("wp_; DROP TABLE x"), "wp_DROPTABLEx");
    }

    #[test]
    fn test_table_queries_use_prefix() {
        assert!(build_autoload_query("site2_").contains("FROM site2_options"));
        assert!(build_revision_count_query("wp_").contains("FROM wp_posts"));
    }

    #[test]
    fn test_status_query_is_version_aware() {
        assert!(build_status_counters_query(Some(160002)).contains("backend_type"));
        assert!(!build_status_counters_query(Some(90624)).contains("backend_type"));
        assert!(!build_status_counters_query(None).contains("backend_type"));
    }
}
