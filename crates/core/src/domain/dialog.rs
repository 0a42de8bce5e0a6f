use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::slots::{SlotName, SlotState};

/// One conversational turn as seen by an action: NLU output plus the
/// tracker state the action may read.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub session_id: String,
    pub intent: Option<String>,
    /// Entity name to raw extracted value.
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
    #[serde(default)]
    pub slots: SlotState,
    pub requested_slot: Option<SlotName>,
    pub active_form: Option<String>,
    /// Slots outside the form's slot set (e.g. `training`).
    #[serde(default)]
    pub extra_slots: BTreeMap<String, Value>,
}

impl Turn {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), ..Self::default() }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>, value: impl Into<String>) -> Self {
        self.entities.insert(entity.into(), value.into());
        self
    }

    pub fn with_slots(mut self, slots: SlotState) -> Self {
        self.slots = slots;
        self
    }

    pub fn intent_name(&self) -> &str {
        self.intent.as_deref().unwrap_or_default()
    }

    pub fn extra_slot_str(&self, name: &str) -> Option<&str> {
        self.extra_slots.get(name).and_then(Value::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub title: String,
    pub payload: String,
}

impl Button {
    pub fn new(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self { title: title.into(), payload: payload.into() }
    }

    /// Re-entry trigger of the form `/<intent>{"entity": "value", ...}`.
    pub fn intent_payload(intent: &str, entities: &BTreeMap<String, String>) -> String {
        if entities.is_empty() {
            return format!("/{intent}");
        }
        let object: serde_json::Map<String, Value> = entities
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();
        format!("/{intent}{}", Value::Object(object))
    }
}

/// What the core asks the messaging collaborator to deliver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Utterance {
    Template { name: String, slots: BTreeMap<String, Value> },
    Text { text: String },
    Buttons { text: String, buttons: Vec<Button> },
}

impl Utterance {
    pub fn template(name: impl Into<String>, slots: &SlotState) -> Self {
        Self::Template { name: name.into(), slots: slots.to_context() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn buttons(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self::Buttons { text: text.into(), buttons }
    }
}

/// Mutations requested on the external tracker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackerEvent {
    SlotSet { name: String, value: Value },
    FormActivated { name: String },
    FormDeactivated,
    FollowupAction { name: String },
    ActionReverted,
    UserUtteranceReverted,
    Restarted,
}

impl TrackerEvent {
    pub fn slot(name: impl Into<String>, value: Option<String>) -> Self {
        Self::SlotSet { name: name.into(), value: value.map(Value::String).unwrap_or(Value::Null) }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::Button;

    #[test]
    fn intent_payload_without_entities_is_bare_intent() {
        assert_eq!(Button::intent_payload("ask_price", &BTreeMap::new()), "/ask_price");
    }

    #[test]
    fn intent_payload_embeds_entities_as_json_object() {
        let entities = BTreeMap::from([("training".to_string(), "onsite".to_string())]);
        assert_eq!(Button::intent_payload("inform", &entities), r#"/inform{"training":"onsite"}"#);
    }
}
