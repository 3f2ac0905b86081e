//! Session lifecycle
//!
//! The five operations peers call, mapped onto the registry, query engine
//! and update relay. There is no state here beyond what those own.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use growltalk_core::{CallerId, CallerRecord, CallerType, SessionError};

use crate::query::{CallerQuery, QueryEngine, QueryResult};
use crate::registry::Registry;
use crate::relay::{CallerFields, UpdateRelay};
use crate::sweeper::ExpirySweeper;

/// Sign-in, keep-session, sign-out, callers and caller
pub struct SessionLifecycle {
    registry: Arc<Registry>,
    queries: QueryEngine,
    relay: UpdateRelay,
}

impl SessionLifecycle {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            queries: QueryEngine::new(registry.clone()),
            relay: UpdateRelay::new(registry.clone()),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Start evicting expired sessions in the background
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        ExpirySweeper::new(self.registry.clone()).spawn()
    }

    /// Register a kiosk or operator
    pub fn sign_in(
        &self,
        caller_type: Option<&str>,
        caller_name: Option<&str>,
    ) -> Result<CallerRecord, SessionError> {
        let caller_type = caller_type
            .ok_or_else(|| SessionError::invalid("callerType is required"))?
            .parse::<CallerType>()
            .map_err(SessionError::invalid)?;
        let caller_name = caller_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| SessionError::invalid("callerName is required"))?;

        let record = self.registry.create(caller_type, caller_name);
        info!(
            "{} {} signed in as {}",
            record.caller_type, record.caller_name, record.caller_id
        );
        Ok(record)
    }

    /// Refresh a caller's session
    pub fn keep_session(&self, caller_id: Option<&str>) -> Result<CallerRecord, SessionError> {
        let id = require_id(caller_id)?;
        let record = self
            .registry
            .touch(id)
            .ok_or_else(|| SessionError::not_found(id.to_string()))?;
        debug!("Session refreshed: {}", id);
        Ok(record)
    }

    /// Remove a caller
    pub fn sign_out(&self, caller_id: Option<&str>) -> Result<CallerId, SessionError> {
        let id = require_id(caller_id)?;
        if !self.registry.remove(id) {
            return Err(SessionError::not_found(id.to_string()));
        }
        info!("Caller {} signed out", id);
        Ok(id)
    }

    /// Query callers, long-polling if the query asks for it
    pub async fn callers(&self, query: &CallerQuery) -> QueryResult {
        self.queries.query(query).await
    }

    /// Apply a partial update to one caller
    pub fn caller(
        &self,
        caller_id: Option<&Value>,
        fields: CallerFields,
    ) -> Result<CallerRecord, SessionError> {
        self.relay.update(caller_id, fields)
    }
}

/// Resolve a query-string id; a malformed id cannot name any caller
fn require_id(raw: Option<&str>) -> Result<CallerId, SessionError> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| SessionError::invalid("callerId is required"))?;
    raw.parse::<CallerId>()
        .map_err(|_| SessionError::not_found(raw))
}
