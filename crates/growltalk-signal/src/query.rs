//! Caller queries with optional long-poll
//!
//! Operators look for kiosks with `callers?callerType=kiosk&callerStatus=AVAILABLE`.
//! Results are ordered oldest-connected first so the kiosk that has waited
//! longest is served first. When nothing matches and a wait was requested,
//! the query re-checks once per second until a match shows up or the wait
//! runs out. The wait is a plain future: dropping it (the client hung up)
//! abandons the retries.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tracing::debug;

use growltalk_core::{CallerId, CallerRecord, MAX_WAIT_SECS};

use crate::registry::Registry;

/// Delay between long-poll re-checks
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Conjunction of exact-match predicates; absent fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerFilter {
    pub caller_id: Option<String>,
    pub caller_type: Option<String>,
    pub caller_status: Option<String>,
}

impl CallerFilter {
    pub fn matches(&self, record: &CallerRecord) -> bool {
        if let Some(id) = &self.caller_id {
            match id.parse::<CallerId>() {
                Ok(id) if id == record.caller_id => {}
                _ => return false,
            }
        }
        if let Some(caller_type) = &self.caller_type {
            if record.caller_type.as_str() != caller_type {
                return false;
            }
        }
        if let Some(status) = &self.caller_status {
            if record.caller_status.as_str() != status {
                return false;
            }
        }
        true
    }
}

/// A callers query
#[derive(Debug, Clone, Default)]
pub struct CallerQuery {
    pub filter: CallerFilter,
    pub limit: Option<usize>,
    pub wait: Option<Duration>,
}

impl CallerQuery {
    pub fn new(filter: CallerFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Long-poll for up to `secs` seconds, capped at [`MAX_WAIT_SECS`]
    pub fn wait_secs(mut self, secs: u64) -> Self {
        self.wait = Some(Duration::from_secs(secs.min(MAX_WAIT_SECS)));
        self
    }

    fn wait(&self) -> Duration {
        self.wait
            .unwrap_or(Duration::ZERO)
            .min(Duration::from_secs(MAX_WAIT_SECS))
    }
}

/// Outcome of a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Callers in the registry when the result was taken
    pub total: usize,
    /// Matching callers, oldest-connected first, limited
    pub callers: Vec<CallerRecord>,
}

/// Filters, orders and limits registry contents
#[derive(Clone)]
pub struct QueryEngine {
    registry: Arc<Registry>,
}

impl QueryEngine {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Evaluate the query once against the current registry
    pub fn evaluate(&self, query: &CallerQuery) -> QueryResult {
        let snapshot = self.registry.all();
        let total = snapshot.len();

        let mut callers: Vec<CallerRecord> = snapshot
            .into_iter()
            .filter(|record| query.filter.matches(record))
            .collect();
        // Stable sort keeps id order among callers connected in the same millisecond
        callers.sort_by_key(|record| record.caller_connected_on);
        if let Some(limit) = query.limit {
            callers.truncate(limit);
        }

        QueryResult { total, callers }
    }

    /// Evaluate the query, long-polling while nothing matches
    pub async fn query(&self, query: &CallerQuery) -> QueryResult {
        let result = self.evaluate(query);
        let wait = query.wait();
        if !result.callers.is_empty() || wait.is_zero() {
            return result;
        }

        let deadline = Instant::now() + wait;
        debug!("No callers match {:?}, waiting up to {:?}", query.filter, wait);

        loop {
            let next = (Instant::now() + RETRY_INTERVAL).min(deadline);
            sleep_until(next).await;

            let result = self.evaluate(query);
            if !result.callers.is_empty() {
                debug!("Long-poll matched {} caller(s)", result.callers.len());
                return result;
            }
            if Instant::now() >= deadline {
                debug!("Long-poll for {:?} timed out", query.filter);
                return result;
            }
        }
    }
}
