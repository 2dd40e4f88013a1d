//! Login and persistence metrics.
//!
//! Recorded through the `metrics` facade. Without an installed recorder
//! every call is a no-op; the embedding application chooses the exporter.
//!
//! # Metrics
//!
//! - `scraper_login_attempts_total` - Counter of login attempts by outcome
//! - `scraper_login_attempt_duration_seconds` - Histogram of attempt latencies by outcome
//! - `scraper_db_query_duration_seconds` - Histogram of status query latencies by query

use std::time::{Duration, Instant};

use metrics::{counter, histogram};

use crate::auth::LoginOutcome;

/// Metric name for total login attempts.
pub const LOGIN_ATTEMPTS_TOTAL: &str = "scraper_login_attempts_total";

/// Metric name for the login attempt duration histogram.
pub const LOGIN_ATTEMPT_DURATION_SECONDS: &str = "scraper_login_attempt_duration_seconds";

/// Metric name for the database query duration histogram.
pub const DB_QUERY_DURATION_SECONDS: &str = "scraper_db_query_duration_seconds";

/// Status queries, used as the `query` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    SaveProcessedDate,
    GetLastProcessedDate,
}

impl Query {
    /// Get the query name as a string for metrics labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SaveProcessedDate => "save_processed_date",
            Self::GetLastProcessedDate => "get_last_processed_date",
        }
    }
}

/// Record one finished login attempt.
pub fn record_login_attempt(outcome: LoginOutcome, duration: Duration) {
    counter!(LOGIN_ATTEMPTS_TOTAL, "outcome" => outcome.as_str()).increment(1);
    histogram!(LOGIN_ATTEMPT_DURATION_SECONDS, "outcome" => outcome.as_str())
        .record(duration.as_secs_f64());
}

/// Record one status query, successful or not.
pub fn record_query(query: Query, duration: Duration) {
    histogram!(DB_QUERY_DURATION_SECONDS, "query" => query.as_str())
        .record(duration.as_secs_f64());
}

/// Timer guard that records a query duration when dropped.
///
/// ```ignore
/// let _timer = QueryTimer::start(Query::SaveProcessedDate);
/// sqlx::query(...).execute(pool).await?;
/// // duration recorded here, on success and on early return alike
/// ```
#[must_use]
pub struct QueryTimer {
    query: Query,
    start: Instant,
}

impl QueryTimer {
    /// Start timing `query`.
    pub fn start(query: Query) -> Self {
        Self {
            query,
            start: Instant::now(),
        }
    }
}

impl Drop for QueryTimer {
    fn drop(&mut self) {
        record_query(self.query, self.start.elapsed());
    }
}

/// Describe all metrics for registration with a recorder.
///
/// Call once during application startup, after installing the recorder.
pub fn describe_metrics() {
    use metrics::{Unit, describe_counter, describe_histogram};

    describe_counter!(
        LOGIN_ATTEMPTS_TOTAL,
        Unit::Count,
        "Total number of login attempts, labelled by outcome"
    );

    describe_histogram!(
        LOGIN_ATTEMPT_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of single login attempts in seconds"
    );

    describe_histogram!(
        DB_QUERY_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of scraper status queries in seconds"
    );
}

#[cfg(test)]
pub(crate) mod tests {
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    use super::*;

    /// One captured metric: name, labels and value.
    pub(crate) type Captured = (String, Vec<(String, String)>, DebugValue);

    /// Runs `record` against a thread-local debugging recorder.
    pub(crate) fn capture<T>(record: impl FnOnce() -> T) -> (T, Vec<Captured>) {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let output = metrics::with_local_recorder(&recorder, record);
        let captured = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _unit, _description, value)| {
                let labels = key
                    .key()
                    .labels()
                    .map(|label| (label.key().to_string(), label.value().to_string()))
                    .collect();
                (key.key().name().to_string(), labels, value)
            })
            .collect();
        (output, captured)
    }

    pub(crate) fn find<'a>(
        captured: &'a [Captured],
        name: &str,
        label: (&str, &str),
    ) -> Option<&'a DebugValue> {
        captured
            .iter()
            .find(|(metric, labels, _)| {
                metric == name
                    && labels
                        .iter()
                        .any(|(key, value)| key == label.0 && value == label.1)
            })
            .map(|(_, _, value)| value)
    }

    #[test]
    fn test_query_names() {
        assert_eq!(Query::SaveProcessedDate.as_str(), "save_processed_date");
        assert_eq!(
            Query::GetLastProcessedDate.as_str(),
            "get_last_processed_date"
        );
    }

    #[test]
    fn test_record_login_attempt_counts_by_outcome() {
        let ((), captured) = capture(|| {
            record_login_attempt(LoginOutcome::Success, Duration::from_millis(12));
            record_login_attempt(LoginOutcome::UnexpectedStatus(500), Duration::from_secs(1));
            record_login_attempt(LoginOutcome::UnexpectedStatus(503), Duration::ZERO);
        });

        assert!(matches!(
            find(&captured, LOGIN_ATTEMPTS_TOTAL, ("outcome", "success")),
            Some(DebugValue::Counter(1))
        ));
        assert!(matches!(
            find(&captured, LOGIN_ATTEMPTS_TOTAL, ("outcome", "unexpected_status")),
            Some(DebugValue::Counter(2))
        ));
        match find(&captured, LOGIN_ATTEMPT_DURATION_SECONDS, ("outcome", "success")) {
            Some(DebugValue::Histogram(samples)) => {
                assert_eq!(samples.len(), 1);
                assert!((samples[0].into_inner() - 0.012).abs() < 1e-9);
            }
            other => panic!("expected success histogram, got {other:?}"),
        }
        assert!(
            find(&captured, LOGIN_ATTEMPTS_TOTAL, ("outcome", "transport_failure")).is_none()
        );
    }

    #[test]
    fn test_query_timer_records_on_drop() {
        let ((), captured) = capture(|| {
            let timer = QueryTimer::start(Query::GetLastProcessedDate);
            drop(timer);
        });

        match find(
            &captured,
            DB_QUERY_DURATION_SECONDS,
            ("query", "get_last_processed_date"),
        ) {
            Some(DebugValue::Histogram(samples)) => assert_eq!(samples.len(), 1),
            other => panic!("expected query histogram, got {other:?}"),
        }
        assert!(
            find(&captured, DB_QUERY_DURATION_SECONDS, ("query", "save_processed_date")).is_none()
        );
    }

    #[test]
    fn test_describe_metrics_does_not_panic() {
        describe_metrics();
    }
}
