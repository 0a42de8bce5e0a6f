use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::dialog::TrackerEvent;
use crate::domain::product::Package;

/// Tracker slot holding the name of the slot the form asked for last.
pub const REQUESTED_SLOT: &str = "requested_slot";
/// Tracker slot marking that the scope-clarifying question was resolved.
pub const SCOPE_ASKED_SLOT: &str = "scope_asked";

/// The slots a purchase intent needs, in request order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotName {
    ProductName,
    OrganizationField,
    Package,
    Scope,
}

impl SlotName {
    pub const ORDER: [SlotName; 4] =
        [SlotName::ProductName, SlotName::OrganizationField, SlotName::Package, SlotName::Scope];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductName => "product_name",
            Self::OrganizationField => "organization_field",
            Self::Package => "package",
            Self::Scope => "scope",
        }
    }

    pub fn ask_template(&self) -> String {
        format!("utter_ask_{}", self.as_str())
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .into_iter()
            .find(|slot| slot.as_str() == value)
            .ok_or_else(|| format!("unknown slot `{value}`"))
    }
}

/// Parses a scope value as a numeric threshold. `None` for anything non-numeric.
pub fn parse_scope(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|scope| scope.is_finite())
}

/// Renders a threshold the way scope codes are written (`13`, not `13.0`).
pub fn format_scope(scope: f64) -> String {
    if scope.fract() == 0.0 && scope.abs() < 1e15 {
        format!("{}", scope as i64)
    } else {
        scope.to_string()
    }
}

/// Committed slot values as read from the tracker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotState {
    values: BTreeMap<SlotName, String>,
    pub scope_asked: bool,
}

impl SlotState {
    pub fn get(&self, slot: SlotName) -> Option<&str> {
        self.values.get(&slot).map(String::as_str)
    }

    pub fn set(&mut self, slot: SlotName, value: Option<String>) {
        match value {
            Some(value) => {
                self.values.insert(slot, value);
            }
            None => {
                self.values.remove(&slot);
            }
        }
    }

    pub fn with(mut self, slot: SlotName, value: impl Into<String>) -> Self {
        self.values.insert(slot, value.into());
        self
    }

    pub fn is_filled(&self, slot: SlotName) -> bool {
        self.values.contains_key(&slot)
    }

    pub fn product_name(&self) -> Option<&str> {
        self.get(SlotName::ProductName)
    }

    pub fn package(&self) -> Option<Package> {
        self.get(SlotName::Package).and_then(|value| value.parse().ok())
    }

    pub fn scope(&self) -> Option<f64> {
        self.get(SlotName::Scope).and_then(parse_scope)
    }

    /// Mandatory slots still unset. Scope is optional at submission time.
    pub fn missing_mandatory(&self) -> Vec<SlotName> {
        SlotName::ORDER
            .into_iter()
            .filter(|slot| *slot != SlotName::Scope && !self.is_filled(*slot))
            .collect()
    }

    pub fn apply(&mut self, patch: &SlotPatch) {
        for (slot, value) in patch.iter() {
            self.set(slot, value.map(str::to_string));
        }
        if let Some(scope_asked) = patch.scope_asked() {
            self.scope_asked = scope_asked;
        }
    }

    pub fn applied(mut self, patch: &SlotPatch) -> Self {
        self.apply(patch);
        self
    }

    /// Template fill context: every slot, unset ones as `null`.
    pub fn to_context(&self) -> BTreeMap<String, Value> {
        let mut context: BTreeMap<String, Value> = SlotName::ORDER
            .into_iter()
            .map(|slot| {
                let value = self.get(slot).map(|value| Value::String(value.to_string()));
                (slot.as_str().to_string(), value.unwrap_or(Value::Null))
            })
            .collect();
        context.insert(SCOPE_ASKED_SLOT.to_string(), Value::Bool(self.scope_asked));
        context
    }
}

/// Slot writes produced by one turn. An absent entry leaves the slot untouched;
/// `Some(None)` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotPatch {
    values: BTreeMap<SlotName, Option<String>>,
    scope_asked: Option<bool>,
}

impl SlotPatch {
    pub fn set(&mut self, slot: SlotName, value: impl Into<String>) {
        self.values.insert(slot, Some(value.into()));
    }

    pub fn clear(&mut self, slot: SlotName) {
        self.values.insert(slot, None);
    }

    pub fn put(&mut self, slot: SlotName, value: Option<String>) {
        self.values.insert(slot, value);
    }

    pub fn touches(&self, slot: SlotName) -> bool {
        self.values.contains_key(&slot)
    }

    pub fn value(&self, slot: SlotName) -> Option<&str> {
        self.values.get(&slot).and_then(|value| value.as_deref())
    }

    pub fn package(&self) -> Option<Package> {
        self.value(SlotName::Package).and_then(|value| value.parse().ok())
    }

    pub fn scope(&self) -> Option<f64> {
        self.value(SlotName::Scope).and_then(parse_scope)
    }

    pub fn set_scope_asked(&mut self, asked: bool) {
        self.scope_asked = Some(asked);
    }

    pub fn scope_asked(&self) -> Option<bool> {
        self.scope_asked
    }

    /// Overlays `other` on top of `self`; entries in `other` win.
    pub fn merge(&mut self, other: &SlotPatch) {
        for (slot, value) in &other.values {
            self.values.insert(*slot, value.clone());
        }
        if other.scope_asked.is_some() {
            self.scope_asked = other.scope_asked;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.scope_asked.is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotName, Option<&str>)> + '_ {
        self.values.iter().map(|(slot, value)| (*slot, value.as_deref()))
    }

    /// Patch that resets every slot of a finished form cycle.
    pub fn cleared() -> Self {
        let mut patch = Self::default();
        for slot in SlotName::ORDER {
            patch.clear(slot);
        }
        patch.set_scope_asked(false);
        patch
    }

    pub fn to_events(&self) -> Vec<TrackerEvent> {
        let mut events: Vec<TrackerEvent> = self
            .iter()
            .map(|(slot, value)| TrackerEvent::slot(slot.as_str(), value.map(str::to_string)))
            .collect();
        if let Some(asked) = self.scope_asked {
            events.push(TrackerEvent::SlotSet {
                name: SCOPE_ASKED_SLOT.to_string(),
                value: Value::Bool(asked),
            });
        }
        events
    }
}
