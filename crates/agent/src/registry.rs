use std::collections::HashMap;

use async_trait::async_trait;
use dealbot_core::domain::dialog::{TrackerEvent, Turn, Utterance};
use dealbot_core::errors::ApplicationError;

use crate::actions::form::ProductFormAction;
use crate::actions::product::{ProductQuery, ProductQueryAction};
use crate::actions::support::{
    AskAffirmationAction, AskRephraseAction, DefaultFallbackAction, ResetAction,
    TrainingResponseAction,
};
use crate::context::ActionContext;

#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(
        &self,
        turn: &Turn,
        ctx: &ActionContext,
        correlation_id: &str,
    ) -> Result<ActionResponse, ApplicationError>;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionResponse {
    pub events: Vec<TrackerEvent>,
    pub responses: Vec<Utterance>,
    /// Run this action again once the form it activated has resolved a product.
    pub retry_after_form: bool,
    /// Set by the form when its submission wrote a session record.
    pub resolved: bool,
}

impl ActionResponse {
    pub fn new(events: Vec<TrackerEvent>, responses: Vec<Utterance>) -> Self {
        Self { events, responses, ..Self::default() }
    }

    pub fn respond(response: Utterance) -> Self {
        Self::new(Vec::new(), vec![response])
    }

    pub fn activates_form(&self) -> bool {
        self.events.iter().any(|event| matches!(event, TrackerEvent::FormActivated { .. }))
    }
}

#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Box<dyn Action>>,
}

impl ActionRegistry {
    /// Every action the dialog domain declares.
    pub fn standard() -> Self {
        let mut registry = Self::default();
        registry.register(ProductFormAction::default());
        for query in ProductQuery::ALL {
            registry.register(ProductQueryAction::new(query));
        }
        registry.register(TrainingResponseAction);
        registry.register(ResetAction);
        registry.register(AskAffirmationAction);
        registry.register(AskRephraseAction);
        registry.register(DefaultFallbackAction);
        registry
    }

    pub fn register<A>(&mut self, action: A)
    where
        A: Action + 'static,
    {
        self.actions.insert(action.name().to_string(), Box::new(action));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Action> {
        self.actions.get(name).map(Box::as_ref)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn run(
        &self,
        name: &str,
        turn: &Turn,
        ctx: &ActionContext,
        correlation_id: &str,
    ) -> Result<ActionResponse, ApplicationError> {
        let action =
            self.get(name).ok_or_else(|| ApplicationError::UnknownAction(name.to_string()))?;
        action.run(turn, ctx, correlation_id).await
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
