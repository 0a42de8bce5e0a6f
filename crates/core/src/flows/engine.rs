use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::domain::slots::SlotName;
use crate::flows::states::{FormAction, FormContext, FormEvent, FormState, TransitionOutcome};

pub trait FlowDefinition {
    fn name(&self) -> &str;
    fn initial_state(&self) -> FormState;
    fn transition(
        &self,
        current: &FormState,
        event: &FormEvent,
        context: &FormContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// Lifecycle of the product form: activate, collect, submit, back to inactive.
#[derive(Clone, Debug, Default)]
pub struct ProductFormFlow;

impl FlowDefinition for ProductFormFlow {
    fn name(&self) -> &str {
        "product_form"
    }

    fn initial_state(&self) -> FormState {
        FormState::Inactive
    }

    fn transition(
        &self,
        current: &FormState,
        event: &FormEvent,
        context: &FormContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_product_form(current, event, context)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn name(&self) -> &str {
        self.flow.name()
    }

    pub fn initial_state(&self) -> FormState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &FormState,
        event: &FormEvent,
        context: &FormContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &FormState,
        event: &FormEvent,
        context: &FormContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    audit
                        .event(
                            "form.transition_applied",
                            AuditCategory::Form,
                            AuditOutcome::Success,
                        )
                        .with_metadata("form", self.name())
                        .with_metadata("from", format!("{:?}", outcome.from))
                        .with_metadata("to", format!("{:?}", outcome.to))
                        .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    audit
                        .event(
                            "form.transition_rejected",
                            AuditCategory::Form,
                            AuditOutcome::Rejected,
                        )
                        .with_metadata("form", self.name())
                        .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine<ProductFormFlow> {
    fn default() -> Self {
        Self::new(ProductFormFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("missing required slots before transition from {state:?}: {missing_slots:?}")]
    MissingRequiredSlots { state: FormState, missing_slots: Vec<SlotName> },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: FormState, event: FormEvent },
}

pub fn transition_product_form(
    current: &FormState,
    event: &FormEvent,
    context: &FormContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FormAction::{ActivateForm, ClearSlots, DeactivateForm, RequestSlot, ResolveCatalog};
    use FormEvent::{Activated, AllSlotsFilled, Deactivated, SlotRequested, Submitted};
    use FormState::{Collecting, Inactive, Submitting};

    let (to, actions) = match (current, event) {
        (Inactive, Activated) => (Collecting, vec![ActivateForm]),
        (Collecting, SlotRequested(slot)) => (Collecting, vec![RequestSlot(*slot)]),
        (Collecting, AllSlotsFilled) => {
            if !context.missing_slots.is_empty() {
                return Err(FlowTransitionError::MissingRequiredSlots {
                    state: *current,
                    missing_slots: context.missing_slots.clone(),
                });
            }
            (Submitting, vec![ResolveCatalog])
        }
        (Submitting, Submitted) => (Inactive, vec![ClearSlots, DeactivateForm]),
        (Collecting, Deactivated) | (Submitting, Deactivated) => {
            (Inactive, vec![ClearSlots, DeactivateForm])
        }
        _ => {
            return Err(FlowTransitionError::InvalidTransition { state: *current, event: *event });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}
