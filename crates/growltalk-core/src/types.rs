//! Core type definitions for GrowlTalk
//!
//! A [`CallerRecord`] is the relay's view of one signed-in peer. Field names
//! on the wire are camelCase because browser clients read them verbatim.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Milliseconds since the Unix epoch
pub type Millis = u64;

/// Source of wall-clock time for the registry
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> Millis;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Millis {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, now: Millis) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

/// Caller identifier, derived from the sign-in time plus the TTL
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(pub u64);

impl CallerId {
    /// Parse an id as a client sent it.
    ///
    /// Clients round-trip ids through both numbers and strings, so a JSON
    /// number, a numeric string and a padded numeric string all resolve to the
    /// same id. Anything else cannot name a caller.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(CallerId),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CallerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(CallerId)
    }
}

/// Class of peer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerType {
    /// Unattended kiosk requesting help
    Kiosk,
    /// Human operator answering calls
    Operator,
}

impl CallerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallerType::Kiosk => "kiosk",
            CallerType::Operator => "operator",
        }
    }
}

impl fmt::Display for CallerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kiosk" => Ok(CallerType::Kiosk),
            "operator" => Ok(CallerType::Operator),
            other => Err(format!("unknown caller type: {}", other)),
        }
    }
}

/// Caller availability.
///
/// `AVAILABLE` and `BUSY` drive matching; any other value is carried through
/// untouched.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallerStatus {
    Available,
    Busy,
    Other(String),
}

impl CallerStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CallerStatus::Available => "AVAILABLE",
            CallerStatus::Busy => "BUSY",
            CallerStatus::Other(s) => s,
        }
    }
}

impl From<String> for CallerStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "AVAILABLE" => CallerStatus::Available,
            "BUSY" => CallerStatus::Busy,
            _ => CallerStatus::Other(s),
        }
    }
}

impl From<&str> for CallerStatus {
    fn from(s: &str) -> Self {
        CallerStatus::from(s.to_string())
    }
}

impl From<CallerStatus> for String {
    fn from(status: CallerStatus) -> Self {
        match status {
            CallerStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CallerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One signed-in peer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerRecord {
    pub caller_id: CallerId,
    pub caller_type: CallerType,
    pub caller_name: String,
    pub caller_status: CallerStatus,
    /// Refresh stamp, one TTL past the last touch
    pub caller_last_message_on: Millis,
    /// Set once at sign-in; queue order
    pub caller_connected_on: Millis,
    pub sdp_offer: Option<Value>,
    pub sdp_answer: Option<Value>,
    pub caller_ice_candidate: Option<Value>,
    pub callee_ice_candidate: Option<Value>,
}

impl CallerRecord {
    /// A freshly signed-in caller with no negotiation state
    pub fn new(
        caller_id: CallerId,
        caller_type: CallerType,
        caller_name: impl Into<String>,
        connected_on: Millis,
        last_message_on: Millis,
    ) -> Self {
        Self {
            caller_id,
            caller_type,
            caller_name: caller_name.into(),
            caller_status: CallerStatus::Available,
            caller_last_message_on: last_message_on,
            caller_connected_on: connected_on,
            sdp_offer: None,
            sdp_answer: None,
            caller_ice_candidate: None,
            callee_ice_candidate: None,
        }
    }

    /// Milliseconds since the caller last touched its session.
    ///
    /// The refresh stamp runs one TTL ahead of the touch that wrote it.
    pub fn age(&self, now: Millis, ttl_ms: u64) -> u64 {
        let touched_on = self.caller_last_message_on.saturating_sub(ttl_ms);
        now.saturating_sub(touched_on)
    }
}
