//! Action webhook called by the dialog manager.
//!
//! - `POST /webhook` runs `next_action` against the posted tracker snapshot
//!   and answers with the tracker events and utterances it produced.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use dealbot_core::domain::dialog::{TrackerEvent, Turn, Utterance};
use dealbot_core::domain::slots::{SlotName, SlotState, REQUESTED_SLOT, SCOPE_ASKED_SLOT};
use dealbot_core::errors::InterfaceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bootstrap::AppState;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WebhookRequest {
    pub next_action: String,
    pub sender_id: String,
    #[serde(default)]
    pub tracker: TrackerSnapshot,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TrackerSnapshot {
    #[serde(default)]
    pub slots: BTreeMap<String, Value>,
    #[serde(default)]
    pub latest_message: LatestMessage,
    #[serde(default)]
    pub active_form: ActiveForm,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LatestMessage {
    #[serde(default)]
    pub intent: IntentPayload,
    #[serde(default)]
    pub entities: Vec<EntityPayload>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct IntentPayload {
    pub name: Option<String>,
    pub confidence: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EntityPayload {
    pub entity: String,
    pub value: Value,
    pub confidence: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ActiveForm {
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WebhookResponse {
    pub events: Vec<TrackerEvent>,
    pub responses: Vec<Utterance>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WebhookError {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    pub message: String,
    pub correlation_id: String,
}

impl WebhookRequest {
    /// Flattens the tracker snapshot into the turn the actions read. Later
    /// entities with the same name win.
    pub fn to_turn(&self) -> Turn {
        let tracker = &self.tracker;
        let mut slots = SlotState::default();
        let mut extra_slots = BTreeMap::new();
        for (name, value) in &tracker.slots {
            if name == REQUESTED_SLOT {
                continue;
            }
            if name == SCOPE_ASKED_SLOT {
                slots.scope_asked = value.as_bool().unwrap_or(false);
            } else if let Ok(slot) = name.parse::<SlotName>() {
                slots.set(slot, value_text(value));
            } else if !value.is_null() {
                extra_slots.insert(name.clone(), value.clone());
            }
        }

        let entities = tracker
            .latest_message
            .entities
            .iter()
            .filter_map(|entity| Some((entity.entity.clone(), value_text(&entity.value)?)))
            .collect();

        Turn {
            session_id: self.sender_id.clone(),
            intent: tracker.latest_message.intent.name.clone(),
            entities,
            slots,
            requested_slot: tracker
                .slots
                .get(REQUESTED_SLOT)
                .and_then(Value::as_str)
                .and_then(|slot| slot.parse().ok()),
            active_form: tracker.active_form.name.clone(),
            extra_slots,
        }
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/webhook", post(run_action)).with_state(state)
}

pub async fn run_action(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WebhookRequest>,
) -> Result<Json<WebhookResponse>, (StatusCode, Json<WebhookError>)> {
    let correlation_id = Uuid::new_v4().to_string();
    let turn = request.to_turn();
    info!(
        event_name = "server.webhook.received",
        correlation_id = %correlation_id,
        session_id = %turn.session_id,
        action = %request.next_action,
        intent = turn.intent_name(),
        intent_confidence = request.tracker.latest_message.intent.confidence.unwrap_or_default(),
        "action requested"
    );

    match state.registry.run(&request.next_action, &turn, &state.ctx, &correlation_id).await {
        Ok(response) => {
            info!(
                event_name = "server.webhook.completed",
                correlation_id = %correlation_id,
                session_id = %turn.session_id,
                action = %request.next_action,
                events = response.events.len(),
                responses = response.responses.len(),
                "action completed"
            );
            Ok(Json(WebhookResponse { events: response.events, responses: response.responses }))
        }
        Err(error) => {
            warn!(
                event_name = "server.webhook.failed",
                correlation_id = %correlation_id,
                session_id = %turn.session_id,
                action = %request.next_action,
                error = %error,
                "action failed"
            );
            Err(error_response(error.into_interface(correlation_id)))
        }
    }
}

fn error_response(error: InterfaceError) -> (StatusCode, Json<WebhookError>) {
    let correlation_id = error.correlation_id().to_string();
    let (status, body) = match error {
        InterfaceError::ActionRejected { action_name, message, .. } => (
            StatusCode::BAD_REQUEST,
            WebhookError {
                error: "action_execution_rejection",
                action_name: Some(action_name),
                message,
                correlation_id,
            },
        ),
        InterfaceError::NotFound { message, .. } => (
            StatusCode::NOT_FOUND,
            WebhookError { error: "action_not_found", action_name: None, message, correlation_id },
        ),
        InterfaceError::BadRequest { message, .. } => (
            StatusCode::BAD_REQUEST,
            WebhookError { error: "bad_request", action_name: None, message, correlation_id },
        ),
        InterfaceError::ServiceUnavailable { message, .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            WebhookError {
                error: "service_unavailable",
                action_name: None,
                message,
                correlation_id,
            },
        ),
        InterfaceError::Internal { message, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            WebhookError { error: "internal_error", action_name: None, message, correlation_id },
        ),
    };
    (status, Json(body))
}
