use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Ingress,
    Form,
    Resolution,
    Session,
    System,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// Who and what a dialog turn is about; copied onto every event it emits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    pub session_id: String,
    pub action_name: Option<String>,
    pub correlation_id: String,
    pub actor: String,
}

impl AuditContext {
    pub fn new(
        session_id: impl Into<String>,
        action_name: Option<String>,
        correlation_id: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            action_name,
            correlation_id: correlation_id.into(),
            actor: actor.into(),
        }
    }

    /// Starts an event stamped with this context and a fresh id.
    pub fn event(
        &self,
        event_type: impl Into<String>,
        category: AuditCategory,
        outcome: AuditOutcome,
    ) -> AuditEvent {
        AuditEvent {
            event_id: Uuid::new_v4().to_string(),
            context: self.clone(),
            event_type: event_type.into(),
            category,
            outcome,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    #[serde(flatten)]
    pub context: AuditContext,
    pub event_type: String,
    pub category: AuditCategory,
    pub outcome: AuditOutcome,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events().into_iter().map(|event| event.event_type).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Forwards audit events to the tracing subscriber as structured log lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let metadata = serde_json::to_string(&event.metadata).unwrap_or_default();
        let context = &event.context;
        info!(
            event_name = %event.event_type,
            correlation_id = %context.correlation_id,
            session_id = %context.session_id,
            action_name = context.action_name.as_deref().unwrap_or(""),
            actor = %context.actor,
            category = ?event.category,
            outcome = event.outcome.as_str(),
            metadata = %metadata,
            "audit event"
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::audit::{
        AuditCategory, AuditContext, AuditOutcome, AuditSink, InMemoryAuditSink, TracingAuditSink,
    };

    #[test]
    fn in_memory_sink_keeps_events_in_emission_order() {
        let sink = InMemoryAuditSink::default();
        let action = Some("product_form".to_owned());
        let context = AuditContext::new("user-42", action, "req-123", "product-form");
        sink.emit(
            context
                .event("form.transition_applied", AuditCategory::Form, AuditOutcome::Success)
                .with_metadata("from", "Inactive")
                .with_metadata("to", "Collecting"),
        );
        sink.emit(context.event(
            "form.validation_rejected",
            AuditCategory::Form,
            AuditOutcome::Rejected,
        ));

        let events = sink.events();
        assert_eq!(sink.event_types(), vec!["form.transition_applied", "form.validation_rejected"]);
        assert_eq!(events[0].context.correlation_id, "req-123");
        assert_eq!(events[0].context.action_name.as_deref(), Some("product_form"));
        assert_eq!(events[0].metadata.get("to").map(String::as_str), Some("Collecting"));
        assert_ne!(events[0].event_id, events[1].event_id);
    }

    #[test]
    fn events_serialize_with_flat_context_fields() {
        let context = AuditContext::new("user-7", None, "req-9", "webhook");
        let event =
            context.event("session.record_written", AuditCategory::Session, AuditOutcome::Success);

        let json = serde_json::to_value(&event).expect("event serializes");
        assert_eq!(json["session_id"], "user-7");
        assert_eq!(json["correlation_id"], "req-9");
        assert_eq!(json["category"], "session");
        assert_eq!(json["outcome"], "success");

        TracingAuditSink.emit(event);
    }
}
