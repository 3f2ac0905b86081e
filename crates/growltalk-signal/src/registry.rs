//! Caller registry
//!
//! The registry owns every [`CallerRecord`] and is the only place the
//! collection is mutated. Each method takes the lock for one short,
//! synchronous step; nothing holds it across an `.await`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use growltalk_core::{
    CallerId, CallerRecord, CallerStatus, CallerType, Clock, Millis, SystemClock, MAX_TTL_MS,
    MIN_TTL_MS,
};

/// In-memory store of signed-in callers
pub struct Registry {
    inner: RwLock<Inner>,
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
}

struct Inner {
    callers: BTreeMap<CallerId, CallerRecord>,
    /// Highest id ever issued; ids are never reused
    last_issued: u64,
}

/// Caller counts for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub callers: usize,
    pub kiosks: usize,
    pub operators: usize,
    pub available: usize,
    pub busy: usize,
}

impl Registry {
    /// Create a registry on the system clock
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a registry on a custom clock
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                callers: BTreeMap::new(),
                last_issued: 0,
            }),
            ttl_ms: (ttl.as_millis() as u64).clamp(MIN_TTL_MS, MAX_TTL_MS),
            clock,
        }
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Half of the TTL: sweep interval and allowed staleness
    pub fn half_life(&self) -> Duration {
        Duration::from_millis(self.ttl_ms / 2)
    }

    pub fn now(&self) -> Millis {
        self.clock.now_millis()
    }

    /// Register a new caller.
    ///
    /// The id is `now + TTL`, bumped past the last issued id when two
    /// sign-ins land in the same millisecond.
    pub fn create(&self, caller_type: CallerType, caller_name: &str) -> CallerRecord {
        let now = self.now();
        let stamp = now.saturating_add(self.ttl_ms);

        let mut inner = self.inner.write();
        let id = CallerId(stamp.max(inner.last_issued.saturating_add(1)));
        inner.last_issued = id.0;

        let record = CallerRecord::new(id, caller_type, caller_name, now, stamp);
        inner.callers.insert(id, record.clone());
        record
    }

    /// Look up a caller by id
    pub fn find(&self, id: CallerId) -> Option<CallerRecord> {
        self.inner.read().callers.get(&id).cloned()
    }

    /// Snapshot of every caller
    pub fn all(&self) -> Vec<CallerRecord> {
        self.inner.read().callers.values().cloned().collect()
    }

    /// Number of callers
    pub fn len(&self) -> usize {
        self.inner.read().callers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().callers.is_empty()
    }

    /// Remove a caller, returning whether it existed
    pub fn remove(&self, id: CallerId) -> bool {
        self.inner.write().callers.remove(&id).is_some()
    }

    /// Push the caller's refresh stamp to `now + TTL`.
    ///
    /// The stamp never moves backwards.
    pub fn touch(&self, id: CallerId) -> Option<CallerRecord> {
        let stamp = self.now().saturating_add(self.ttl_ms);
        self.update_with(id, |record| {
            record.caller_last_message_on = record.caller_last_message_on.max(stamp);
        })
    }

    /// Mutate one caller in place and return the post-update record
    pub fn update_with<F>(&self, id: CallerId, f: F) -> Option<CallerRecord>
    where
        F: FnOnce(&mut CallerRecord),
    {
        let mut inner = self.inner.write();
        let record = inner.callers.get_mut(&id)?;
        f(record);
        Some(record.clone())
    }

    /// Drop every caller that has not touched its session for more than half
    /// a TTL.
    ///
    /// Runs under a single write lock, so readers see either the whole
    /// collection or the retained subset. Returns the number evicted.
    pub fn sweep(&self) -> usize {
        let now = self.now();
        let half_life = self.ttl_ms / 2;

        let mut inner = self.inner.write();
        let before = inner.callers.len();
        let retained: BTreeMap<CallerId, CallerRecord> = std::mem::take(&mut inner.callers)
            .into_iter()
            .filter(|(id, record)| {
                let age = record.age(now, self.ttl_ms);
                let keep = age <= half_life;
                if !keep {
                    debug!("Caller {} expired (age {} ms)", id, age);
                }
                keep
            })
            .collect();
        inner.callers = retained;
        before - inner.callers.len()
    }

    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.read();
        let mut stats = RegistryStats {
            callers: inner.callers.len(),
            ..RegistryStats::default()
        };
        for record in inner.callers.values() {
            match record.caller_type {
                CallerType::Kiosk => stats.kiosks += 1,
                CallerType::Operator => stats.operators += 1,
            }
            match record.caller_status {
                CallerStatus::Available => stats.available += 1,
                CallerStatus::Busy => stats.busy += 1,
                CallerStatus::Other(_) => {}
            }
        }
        stats
    }
}
