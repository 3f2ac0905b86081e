//! HTTP request and response bodies
//!
//! Browser clients depend on these shapes verbatim, so every name is the
//! camelCase (or upper-case, for `/env`) key the clients read.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use growltalk_core::{CallerId, CallerRecord, CallerStatus, ErrorCode, ProxyConfig, SessionError};

use crate::query::{CallerFilter, CallerQuery};
use crate::registry::RegistryStats;
use crate::relay::CallerFields;

/// `GET /sign-in` query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInParams {
    pub caller_type: Option<String>,
    pub caller_name: Option<String>,
}

/// `GET /keep-session` and `GET /sign-out` query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdParams {
    pub caller_id: Option<String>,
}

/// `GET /callers` query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallersParams {
    pub caller_id: Option<String>,
    pub caller_type: Option<String>,
    pub caller_status: Option<String>,
    pub limit: Option<String>,
    pub wait: Option<String>,
}

impl CallersParams {
    /// Build the query; blank parameters count as absent and unparseable
    /// numbers are ignored
    pub fn into_query(self) -> CallerQuery {
        let mut query = CallerQuery::new(CallerFilter {
            caller_id: non_blank(self.caller_id),
            caller_type: non_blank(self.caller_type),
            caller_status: non_blank(self.caller_status),
        });
        if let Some(limit) = non_blank(self.limit).and_then(|v| v.parse::<usize>().ok()) {
            query = query.limit(limit);
        }
        if let Some(wait) = non_blank(self.wait).and_then(|v| v.parse::<u64>().ok()) {
            query = query.wait_secs(wait);
        }
        query
    }
}

/// Trim a parameter, treating an empty value as missing
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `PUT /caller` body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCallerRequest {
    #[serde(default)]
    pub caller_id: Option<Value>,
    /// `Some(None)` records an explicit `null`, which is rejected
    #[serde(default, deserialize_with = "present")]
    pub caller_status: Option<Option<CallerStatus>>,
    #[serde(default, deserialize_with = "present")]
    pub sdp_offer: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub sdp_answer: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub caller_ice_candidate: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub callee_ice_candidate: Option<Value>,
}

impl UpdateCallerRequest {
    /// Split the body into the target id and the fields to apply.
    ///
    /// Status cannot be cleared, so a `null` callerStatus is an invalid request.
    pub fn into_parts(self) -> Result<(Option<Value>, CallerFields), SessionError> {
        let caller_status = match self.caller_status {
            Some(None) => return Err(SessionError::invalid("callerStatus cannot be null")),
            Some(status) => status,
            None => None,
        };
        let fields = CallerFields {
            caller_status,
            sdp_offer: self.sdp_offer,
            sdp_answer: self.sdp_answer,
            caller_ice_candidate: self.caller_ice_candidate,
            callee_ice_candidate: self.callee_ice_candidate,
        };
        Ok((self.caller_id, fields))
    }
}

/// A key that is present maps to `Some`, even when its value is `null`
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// `GET /sign-in` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub caller_id: CallerId,
}

/// `GET /sign-out` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOutResponse {
    pub caller_id: CallerId,
    pub message: String,
}

/// `GET /callers` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallersResponse {
    pub total_clients: usize,
    pub filtered_sdp_clients: Vec<CallerRecord>,
}

/// `GET /env` response, read by clients at start-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvResponse {
    #[serde(rename = "DELETE_TIMER")]
    pub delete_timer: u64,
    #[serde(rename = "PROXY_SERVER_IP")]
    pub proxy_server_ip: Option<String>,
    #[serde(rename = "PROXY_SERVER_PORT")]
    pub proxy_server_port: Option<u16>,
}

impl EnvResponse {
    pub fn new(ttl_ms: u64, proxy: &ProxyConfig) -> Self {
        Self {
            delete_timer: ttl_ms,
            proxy_server_ip: proxy.server_ip.clone(),
            proxy_server_port: proxy.server_port,
        }
    }
}

/// `GET /health` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub callers: usize,
    pub kiosks: usize,
    pub operators: usize,
}

/// `GET /stats` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub callers: usize,
    pub kiosks: usize,
    pub operators: usize,
    pub available: usize,
    pub busy: usize,
}

impl From<RegistryStats> for HealthResponse {
    fn from(stats: RegistryStats) -> Self {
        Self {
            status: "healthy".into(),
            callers: stats.callers,
            kiosks: stats.kiosks,
            operators: stats.operators,
        }
    }
}

impl From<RegistryStats> for StatsResponse {
    fn from(stats: RegistryStats) -> Self {
        Self {
            callers: stats.callers,
            kiosks: stats.kiosks,
            operators: stats.operators,
            available: stats.available,
            busy: stats.busy,
        }
    }
}

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
}
