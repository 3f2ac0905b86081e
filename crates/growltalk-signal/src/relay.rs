//! Update relay
//!
//! Peers hand negotiation artifacts to each other by writing them onto a
//! caller record: the operator PUTs its SDP answer onto the kiosk, both sides
//! trickle ICE candidates, and each flips its own status. Every present field
//! replaces the stored value wholesale. Pairing a kiosk with an operator is
//! two independent updates; the relay never links records.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use growltalk_core::{CallerId, CallerRecord, CallerStatus, SessionError};

use crate::registry::Registry;

/// Fields an update may carry.
///
/// `Some(Value::Null)` is an explicit clear; `None` leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallerFields {
    pub caller_status: Option<CallerStatus>,
    pub sdp_offer: Option<Value>,
    pub sdp_answer: Option<Value>,
    pub caller_ice_candidate: Option<Value>,
    pub callee_ice_candidate: Option<Value>,
}

impl CallerFields {
    pub fn is_empty(&self) -> bool {
        self.caller_status.is_none()
            && self.sdp_offer.is_none()
            && self.sdp_answer.is_none()
            && self.caller_ice_candidate.is_none()
            && self.callee_ice_candidate.is_none()
    }

    /// Overwrite each present field on the record
    pub fn apply(self, record: &mut CallerRecord) {
        if let Some(status) = self.caller_status {
            record.caller_status = status;
        }
        replace(&mut record.sdp_offer, self.sdp_offer);
        replace(&mut record.sdp_answer, self.sdp_answer);
        replace(&mut record.caller_ice_candidate, self.caller_ice_candidate);
        replace(&mut record.callee_ice_candidate, self.callee_ice_candidate);
    }

    fn names(&self) -> Vec<&'static str> {
        [
            ("callerStatus", self.caller_status.is_some()),
            ("sdpOffer", self.sdp_offer.is_some()),
            ("sdpAnswer", self.sdp_answer.is_some()),
            ("callerIceCandidate", self.caller_ice_candidate.is_some()),
            ("calleeIceCandidate", self.callee_ice_candidate.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

fn replace(slot: &mut Option<Value>, update: Option<Value>) {
    match update {
        Some(Value::Null) => *slot = None,
        Some(value) => *slot = Some(value),
        None => {}
    }
}

/// Applies partial updates to single caller records
#[derive(Clone)]
pub struct UpdateRelay {
    registry: Arc<Registry>,
}

impl UpdateRelay {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Apply `fields` to the caller named by `caller_id` and return the
    /// post-update record
    pub fn update(
        &self,
        caller_id: Option<&Value>,
        fields: CallerFields,
    ) -> Result<CallerRecord, SessionError> {
        let raw_id = match caller_id {
            Some(Value::Null) | None => {
                return Err(SessionError::invalid("callerId is required"));
            }
            Some(raw) => raw,
        };
        if fields.is_empty() {
            return Err(SessionError::invalid(
                "at least one of callerStatus, sdpOffer, sdpAnswer, callerIceCandidate, calleeIceCandidate is required",
            ));
        }

        let id = CallerId::from_value(raw_id).ok_or_else(|| SessionError::not_found(id_text(raw_id)))?;
        let names = fields.names();
        let record = self
            .registry
            .update_with(id, |record| fields.apply(record))
            .ok_or_else(|| SessionError::not_found(id.to_string()))?;

        debug!("Caller {} updated: {}", id, names.join(", "));
        Ok(record)
    }
}

fn id_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
