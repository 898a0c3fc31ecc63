
use super::{ProcessOutcome, process_event, replay};
use crate::event::AgentEvent;
use crate::session::SessionState;
use crate::types::SessionId;
use serde_json::Value;
use std::sync::Arc;

pub(super) const SESSION: &str = "s1";

pub(super) fn fresh() -> Arc<SessionState> {
    SessionState::new(SessionId::from(SESSION)).into_shared()
}

/// Builds an event from its wire form, filling in `sessionId`.
pub(super) fn ev(mut value: Value) -> AgentEvent {
    value
        .as_object_mut()
        .unwrap()
        .entry("sessionId")
        .or_insert_with(|| Value::from(SESSION));
    AgentEvent::from_value(value).unwrap()
}

pub(super) fn fold(events: impl IntoIterator<Item = Value>) -> Arc<SessionState> {
    replay(&fresh(), events.into_iter().map(ev)).state
}

pub(super) fn step(state: &Arc<SessionState>, value: Value) -> ProcessOutcome {
    process_event(state, ev(value))
}
