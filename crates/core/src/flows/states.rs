use serde::{Deserialize, Serialize};

use crate::domain::slots::SlotName;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormState {
    Inactive,
    Collecting,
    Submitting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormEvent {
    Activated,
    SlotRequested(SlotName),
    AllSlotsFilled,
    Submitted,
    Deactivated,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FormContext {
    pub missing_slots: Vec<SlotName>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormAction {
    ActivateForm,
    RequestSlot(SlotName),
    ResolveCatalog,
    ClearSlots,
    DeactivateForm,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: FormState,
    pub to: FormState,
    pub event: FormEvent,
    pub actions: Vec<FormAction>,
}
