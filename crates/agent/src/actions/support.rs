use async_trait::async_trait;
use dealbot_core::audit::{AuditCategory, AuditContext, AuditOutcome};
use dealbot_core::domain::dialog::{Button, TrackerEvent, Turn, Utterance};
use dealbot_core::errors::ApplicationError;
use tracing::{debug, info};

use crate::context::ActionContext;
use crate::registry::{Action, ActionResponse};

/// Tracker slot filled from the training buttons.
pub const TRAINING_SLOT: &str = "training";

pub const HANDOFF_MESSAGE: &str = "I cannot answer your question right now. I will pass it on to \
                                   a consultant who will get back to you. Thank you.";

#[derive(Clone, Copy, Debug, Default)]
pub struct TrainingResponseAction;

#[async_trait]
impl Action for TrainingResponseAction {
    fn name(&self) -> &'static str {
        "action_training_response"
    }

    async fn run(
        &self,
        turn: &Turn,
        ctx: &ActionContext,
        correlation_id: &str,
    ) -> Result<ActionResponse, ApplicationError> {
        let days = ctx.dialog.training_days;
        let text = match turn.extra_slot_str(TRAINING_SLOT) {
            Some("centralized") => format!(
                "Usage training in a centralized course organized over {days} days in \
                 Ha Noi and Ho Chi Minh City."
            ),
            Some("onsite") => format!(
                "Usage training at your premises over {days} days for up to 10 staff in \
                 Ha Noi and Ho Chi Minh City. Outside those cities the customer covers travel \
                 and accommodation for our trainers, and prepares the machines and equipment \
                 used during the training."
            ),
            Some("deployment") => "Each deployment engagement covers one business area such as \
                                   accounting, sales, human resources or general management. \
                                   This is the minimum package and runs for at most 5 days. \
                                   Extra consulting days cost 5.000.000 VNĐ per day."
                .to_string(),
            other => {
                debug!(
                    event_name = "dialog.training.unknown_kind",
                    correlation_id,
                    session_id = %turn.session_id,
                    training = other.unwrap_or(""),
                    "no training answer for slot value"
                );
                return Ok(ActionResponse::default());
            }
        };
        Ok(ActionResponse::respond(Utterance::text(text)))
    }
}

/// Ends the conversation: thanks the user, forgets the chosen product and
/// restarts the tracker.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResetAction;

#[async_trait]
impl Action for ResetAction {
    fn name(&self) -> &'static str {
        "action_reset"
    }

    async fn run(
        &self,
        turn: &Turn,
        ctx: &ActionContext,
        correlation_id: &str,
    ) -> Result<ActionResponse, ApplicationError> {
        ctx.sessions.clear(&turn.session_id);
        ctx.audit.emit(
            AuditContext::new(
                turn.session_id.clone(),
                Some(self.name().to_string()),
                correlation_id,
                "reset",
            )
            .event("session.record_cleared", AuditCategory::Session, AuditOutcome::Success),
        );
        info!(
            event_name = "dialog.session.reset",
            correlation_id,
            session_id = %turn.session_id,
            "conversation reset"
        );
        Ok(ActionResponse::new(
            vec![TrackerEvent::Restarted],
            vec![Utterance::template("utter_thanks", &turn.slots)],
        ))
    }
}

/// First stage of the fallback: offer the guessed intent back as a button.
#[derive(Clone, Copy, Debug, Default)]
pub struct AskAffirmationAction;

#[async_trait]
impl Action for AskAffirmationAction {
    fn name(&self) -> &'static str {
        "action_default_ask_affirmation"
    }

    async fn run(
        &self,
        turn: &Turn,
        ctx: &ActionContext,
        _correlation_id: &str,
    ) -> Result<ActionResponse, ApplicationError> {
        let intent = turn.intent_name();
        let buttons = vec![
            Button::new("Yes", Button::intent_payload(intent, &turn.entities)),
            Button::new("No", "/out_of_scope"),
        ];
        let text = format!("Did you want to {}?", ctx.intent_labels.label(intent));
        Ok(ActionResponse::new(
            vec![TrackerEvent::UserUtteranceReverted, TrackerEvent::ActionReverted],
            vec![Utterance::buttons(text, buttons)],
        ))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AskRephraseAction;

#[async_trait]
impl Action for AskRephraseAction {
    fn name(&self) -> &'static str {
        "action_default_ask_rephrase"
    }

    async fn run(
        &self,
        turn: &Turn,
        _ctx: &ActionContext,
        _correlation_id: &str,
    ) -> Result<ActionResponse, ApplicationError> {
        Ok(ActionResponse::respond(Utterance::template("utter_fallback", &turn.slots)))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultFallbackAction;

#[async_trait]
impl Action for DefaultFallbackAction {
    fn name(&self) -> &'static str {
        "action_default_fallback"
    }

    async fn run(
        &self,
        turn: &Turn,
        _ctx: &ActionContext,
        correlation_id: &str,
    ) -> Result<ActionResponse, ApplicationError> {
        info!(
            event_name = "dialog.fallback.handoff",
            correlation_id,
            session_id = %turn.session_id,
            intent = turn.intent_name(),
            "handing the question to a consultant"
        );
        Ok(ActionResponse::new(
            vec![TrackerEvent::UserUtteranceReverted, TrackerEvent::ActionReverted],
            vec![Utterance::text(HANDOFF_MESSAGE)],
        ))
    }
}
