use std::collections::BTreeMap;
use std::str::FromStr;

use dealbot_core::domain::dialog::{TrackerEvent, Turn};
use dealbot_core::domain::slots::{SlotName, SlotState, REQUESTED_SLOT, SCOPE_ASKED_SLOT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// NLU output for one user message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    pub intent: Option<String>,
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
}

impl UserMessage {
    pub fn new(intent: impl Into<String>) -> Self {
        Self { intent: Some(intent.into()), entities: BTreeMap::new() }
    }

    pub fn with_entity(mut self, entity: impl Into<String>, value: impl Into<String>) -> Self {
        self.entities.insert(entity.into(), value.into());
        self
    }
}

/// Conversation state for a single sender, kept in memory. Applies the same
/// events an external tracker would.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTracker {
    sender_id: String,
    slots: SlotState,
    extra_slots: BTreeMap<String, Value>,
    active_form: Option<String>,
    requested_slot: Option<SlotName>,
    latest: Option<UserMessage>,
    pending_action: Option<String>,
    history: Vec<TrackerEvent>,
}

impl InMemoryTracker {
    pub fn new(sender_id: impl Into<String>) -> Self {
        Self { sender_id: sender_id.into(), ..Self::default() }
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn slots(&self) -> &SlotState {
        &self.slots
    }

    pub fn active_form(&self) -> Option<&str> {
        self.active_form.as_deref()
    }

    pub fn requested_slot(&self) -> Option<SlotName> {
        self.requested_slot
    }

    pub fn extra_slot(&self, name: &str) -> Option<&Value> {
        self.extra_slots.get(name)
    }

    pub fn history(&self) -> &[TrackerEvent] {
        &self.history
    }

    pub fn pending_action(&self) -> Option<&str> {
        self.pending_action.as_deref()
    }

    pub fn set_pending_action(&mut self, action: Option<String>) {
        self.pending_action = action;
    }

    pub fn take_pending_action(&mut self) -> Option<String> {
        self.pending_action.take()
    }

    /// Records the message. Entities that name a slot outside the form's
    /// slot set fill that slot directly.
    pub fn receive(&mut self, message: UserMessage) {
        for (entity, value) in &message.entities {
            if SlotName::from_str(entity).is_err() && entity != REQUESTED_SLOT {
                self.extra_slots.insert(entity.clone(), Value::String(value.clone()));
            }
        }
        self.latest = Some(message);
    }

    pub fn turn(&self) -> Turn {
        let (intent, entities) = match &self.latest {
            Some(message) => (message.intent.clone(), message.entities.clone()),
            None => (None, BTreeMap::new()),
        };
        Turn {
            session_id: self.sender_id.clone(),
            intent,
            entities,
            slots: self.slots.clone(),
            requested_slot: self.requested_slot,
            active_form: self.active_form.clone(),
            extra_slots: self.extra_slots.clone(),
        }
    }

    pub fn apply(&mut self, events: &[TrackerEvent]) {
        for event in events {
            self.apply_one(event);
            self.history.push(event.clone());
        }
    }

    fn apply_one(&mut self, event: &TrackerEvent) {
        match event {
            TrackerEvent::SlotSet { name, value } => self.set_slot(name, value),
            TrackerEvent::FormActivated { name } => self.active_form = Some(name.clone()),
            TrackerEvent::FormDeactivated => {
                self.active_form = None;
                self.requested_slot = None;
            }
            TrackerEvent::UserUtteranceReverted => self.latest = None,
            TrackerEvent::Restarted => {
                let sender_id = std::mem::take(&mut self.sender_id);
                *self = Self::new(sender_id);
            }
            TrackerEvent::FollowupAction { .. } | TrackerEvent::ActionReverted => {}
        }
    }

    fn set_slot(&mut self, name: &str, value: &Value) {
        if name == REQUESTED_SLOT {
            self.requested_slot = value.as_str().and_then(|slot| slot.parse().ok());
        } else if name == SCOPE_ASKED_SLOT {
            self.slots.scope_asked = value.as_bool().unwrap_or(false);
        } else if let Ok(slot) = SlotName::from_str(name) {
            self.slots.set(slot, value.as_str().map(str::to_string));
        } else if value.is_null() {
            self.extra_slots.remove(name);
        } else {
            self.extra_slots.insert(name.to_string(), value.clone());
        }
        debug!(event_name = "dialog.tracker.slot_set", slot = name, value = %value, "slot set");
    }
}
