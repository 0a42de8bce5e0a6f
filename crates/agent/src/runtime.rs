use std::collections::HashMap;

use dealbot_core::domain::dialog::{TrackerEvent, Turn, Utterance};
use dealbot_core::domain::slots::SlotName;
use dealbot_core::errors::{ApplicationError, DomainError};
use dealbot_core::flows::{FormRejection, ProductForm, PRODUCT_FORM};
use tracing::{info, warn};

use crate::actions::TRAINING_SLOT;
use crate::context::ActionContext;
use crate::registry::ActionRegistry;
use crate::tracker::{InMemoryTracker, UserMessage};

/// Upper bound on chained actions for one user message.
pub const MAX_ACTIONS_PER_TURN: usize = 4;

/// Maps the latest intent to the action that answers it.
#[derive(Clone, Debug)]
pub struct IntentPolicy {
    routes: HashMap<String, String>,
    fallback: String,
}

impl Default for IntentPolicy {
    fn default() -> Self {
        Self::new("action_default_fallback")
            .route_intent("inform", PRODUCT_FORM)
            .route_intent("ask_price", "action_price_response")
            .route_intent("buy", "action_buy")
            .route_intent("change_product", "action_change_product")
            .route_intent("ask_extended_price", "action_extended_price_response")
            .route_intent("ask_trial", "action_trial_response")
            .route_intent("ask_sales", "action_sales_response")
            .route_intent("ask_training", "action_ask_training")
            .route_intent("complain_price", "action_complain_price_response")
            .route_intent("reset", "action_reset")
            .route_intent("restart", "action_reset")
            .route_intent("nlu_fallback", "action_default_ask_affirmation")
            .route_intent("out_of_scope", "action_default_ask_rephrase")
            .route_intent("deny", "action_default_fallback")
    }
}

impl IntentPolicy {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self { routes: HashMap::new(), fallback: fallback.into() }
    }

    pub fn route_intent(mut self, intent: impl Into<String>, action: impl Into<String>) -> Self {
        self.routes.insert(intent.into(), action.into());
        self
    }

    /// A training choice arrives as `inform` and is answered directly.
    pub fn route(&self, turn: &Turn) -> &str {
        let intent = turn.intent_name();
        if intent == "inform" && turn.entities.contains_key(TRAINING_SLOT) {
            return "action_training_response";
        }
        self.routes.get(intent).map(String::as_str).unwrap_or(&self.fallback)
    }
}

/// Drives one conversation turn through the registered actions: the active
/// form gets the first attempt, rejected answers fall through to the intent
/// route, and queries that had to activate the form are replayed once it
/// resolves a product.
pub struct DialogRuntime {
    registry: ActionRegistry,
    policy: IntentPolicy,
    ctx: ActionContext,
    form: ProductForm,
}

impl DialogRuntime {
    pub fn new(registry: ActionRegistry, policy: IntentPolicy, ctx: ActionContext) -> Self {
        Self { registry, policy, ctx, form: ProductForm::default() }
    }

    pub fn standard(ctx: ActionContext) -> Self {
        Self::new(ActionRegistry::standard(), IntentPolicy::default(), ctx)
    }

    pub fn context(&self) -> &ActionContext {
        &self.ctx
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub async fn handle(
        &self,
        tracker: &mut InMemoryTracker,
        message: UserMessage,
        correlation_id: &str,
    ) -> Result<Vec<Utterance>, ApplicationError> {
        tracker.receive(message);
        let mut responses = Vec::new();
        let mut next = Some(match tracker.active_form() {
            Some(form) => form.to_string(),
            None => self.policy.route(&tracker.turn()).to_string(),
        });
        let mut followup_form = false;
        let mut ran = 0;

        while let Some(name) = next.take() {
            if ran == MAX_ACTIONS_PER_TURN {
                warn!(
                    event_name = "dialog.runtime.chain_truncated",
                    correlation_id,
                    session_id = tracker.sender_id(),
                    action = %name,
                    "action chain limit reached"
                );
                break;
            }
            ran += 1;

            let mut turn = tracker.turn();
            if followup_form {
                turn.requested_slot = None;
            }
            let response = match self.registry.run(&name, &turn, &self.ctx, correlation_id).await {
                Ok(response) => response,
                Err(ApplicationError::Domain(DomainError::FormRejected(
                    FormRejection::ValidationFailed { slot, .. },
                ))) => {
                    let routed = self.policy.route(&turn);
                    if routed == PRODUCT_FORM {
                        responses.push(self.reask(&turn, slot));
                        break;
                    }
                    info!(
                        event_name = "dialog.runtime.form_rejected",
                        correlation_id,
                        session_id = tracker.sender_id(),
                        slot = slot.as_str(),
                        routed_to = routed,
                        "form rejected the answer; routing by intent"
                    );
                    next = Some(routed.to_string());
                    followup_form = false;
                    continue;
                }
                Err(error) => return Err(error),
            };

            tracker.apply(&response.events);
            info!(
                event_name = "dialog.runtime.action_ran",
                correlation_id,
                session_id = tracker.sender_id(),
                action = %name,
                events = response.events.len(),
                responses = response.responses.len(),
                "action ran"
            );
            followup_form = false;

            let is_form = name == PRODUCT_FORM;
            if !is_form && response.activates_form() {
                if response.retry_after_form {
                    tracker.set_pending_action(Some(name.clone()));
                }
                next = Some(PRODUCT_FORM.to_string());
                followup_form = true;
            } else if is_form && response.resolved {
                next = tracker.take_pending_action();
            } else if is_form && response.events.contains(&TrackerEvent::FormDeactivated) {
                tracker.set_pending_action(None);
            }
            responses.extend(response.responses);
        }

        Ok(responses)
    }

    fn reask(&self, turn: &Turn, slot: SlotName) -> Utterance {
        let template = self
            .form
            .next_slot(&turn.slots, &self.ctx.data.catalog)
            .filter(|request| request.slot == slot)
            .map(|request| request.template)
            .unwrap_or_else(|| slot.ask_template());
        Utterance::template(template, &turn.slots)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use dealbot_core::domain::dialog::{TrackerEvent, Turn, Utterance};
    use dealbot_core::domain::slots::SlotName;
    use dealbot_core::session::SessionStore;

    use super::{DialogRuntime, IntentPolicy};
    use crate::actions::NO_PRODUCT_MESSAGE;
    use crate::context::tests::fixture;
    use crate::tracker::{InMemoryTracker, UserMessage};

    fn template_name(utterance: &Utterance) -> Option<&str> {
        match utterance {
            Utterance::Template { name, .. } => Some(name),
            _ => None,
        }
    }

    fn text(utterance: &Utterance) -> &str {
        match utterance {
            Utterance::Text { text } => text,
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn training_choice_routes_to_training_answer() {
        let policy = IntentPolicy::default();

        let choice = Turn::new("u").with_intent("inform").with_entity("training", "onsite");
        let plain = Turn::new("u").with_intent("inform").with_entity("package", "standard");
        let unknown = Turn::new("u").with_intent("greet");

        assert_eq!(policy.route(&choice), "action_training_response");
        assert_eq!(policy.route(&plain), "product_form");
        assert_eq!(policy.route(&unknown), "action_default_fallback");
    }

    #[tokio::test]
    async fn price_question_collects_slots_and_recommends() {
        let fixture = fixture();
        let runtime = DialogRuntime::standard(fixture.ctx.clone());
        let mut tracker = InMemoryTracker::new("user-1");

        let first = runtime
            .handle(
                &mut tracker,
                UserMessage::new("ask_price").with_entity("product_name", "sme.net"),
                "req-1",
            )
            .await
            .expect("turn 1");
        assert_eq!(
            first.iter().filter_map(template_name).collect::<Vec<_>>(),
            vec!["utter_ask_organization_field"]
        );
        assert_eq!(tracker.requested_slot(), Some(SlotName::OrganizationField));

        let second = runtime
            .handle(
                &mut tracker,
                UserMessage::new("inform").with_entity("organization_field", "trading company"),
                "req-2",
            )
            .await
            .expect("turn 2");
        assert_eq!(
            second.iter().filter_map(template_name).collect::<Vec<_>>(),
            vec!["utter_ask_scope_professional"]
        );

        let third = runtime
            .handle(&mut tracker, UserMessage::new("inform").with_entity("scope", "13"), "req-3")
            .await
            .expect("turn 3");
        assert_eq!(third.len(), 1);
        assert!(text(&third[0]).contains("SME PROFESSIONAL costs 12.450.000 VNĐ"));
        assert_eq!(tracker.active_form(), None);
        assert_eq!(tracker.slots().product_name(), None);
        assert!(fixture.sessions.get("user-1").is_some());

        let trial = runtime
            .handle(&mut tracker, UserMessage::new("ask_trial"), "req-4")
            .await
            .expect("turn 4");
        assert!(text(&trial[0]).contains("15-day free trial"));
    }

    #[tokio::test]
    async fn repeated_price_question_reads_the_session_record() {
        let fixture = fixture();
        let runtime = DialogRuntime::standard(fixture.ctx.clone());
        let mut tracker = InMemoryTracker::new("user-1");
        for (message, id) in [
            (UserMessage::new("ask_price").with_entity("product_name", "sme.net"), "req-1"),
            (UserMessage::new("inform").with_entity("organization_field", "corporation"), "req-2"),
        ] {
            runtime.handle(&mut tracker, message, id).await.expect("form turn");
        }
        assert!(fixture.sessions.get("user-1").is_some());

        let cached = runtime
            .handle(&mut tracker, UserMessage::new("ask_price"), "req-3")
            .await
            .expect("cached turn");
        assert_eq!(cached.len(), 1);
        assert!(text(&cached[0]).starts_with("SME ENTERPRISE costs 16.950.000 VNĐ"));
        assert_eq!(tracker.active_form(), None);

        fixture.clock.advance(Duration::seconds(3000));
        let expired = runtime
            .handle(&mut tracker, UserMessage::new("ask_price"), "req-4")
            .await
            .expect("expired turn");
        assert_eq!(text(&expired[0]), NO_PRODUCT_MESSAGE);
        assert_eq!(template_name(&expired[1]), Some("utter_ask_product_name"));
        assert_eq!(tracker.active_form(), Some("product_form"));
        assert_eq!(tracker.pending_action(), None);
    }

    #[tokio::test]
    async fn query_without_product_is_replayed_after_the_form_resolves() {
        let fixture = fixture();
        let runtime = DialogRuntime::standard(fixture.ctx.clone());
        let mut tracker = InMemoryTracker::new("user-1");

        let first = runtime
            .handle(&mut tracker, UserMessage::new("ask_trial"), "req-1")
            .await
            .expect("turn 1");
        assert_eq!(text(&first[0]), NO_PRODUCT_MESSAGE);
        assert_eq!(template_name(&first[1]), Some("utter_ask_product_name"));
        assert_eq!(tracker.pending_action(), Some("action_trial_response"));

        runtime
            .handle(
                &mut tracker,
                UserMessage::new("inform").with_entity("product_name", "sme.net"),
                "req-2",
            )
            .await
            .expect("turn 2");
        let last = runtime
            .handle(
                &mut tracker,
                UserMessage::new("inform").with_entity("organization_field", "corporation"),
                "req-3",
            )
            .await
            .expect("turn 3");

        assert_eq!(last.len(), 2);
        assert!(text(&last[0]).contains("SME ENTERPRISE costs 16.950.000 VNĐ"));
        assert!(text(&last[1]).starts_with("SME ENTERPRISE comes with a 15-day free trial"));
        assert_eq!(tracker.pending_action(), None);
    }

    #[tokio::test]
    async fn rejected_answer_falls_through_to_the_intent_action() {
        let fixture = fixture();
        let runtime = DialogRuntime::standard(fixture.ctx.clone());
        let mut tracker = InMemoryTracker::new("user-1");
        runtime
            .handle(
                &mut tracker,
                UserMessage::new("ask_price").with_entity("product_name", "sme.net"),
                "req-1",
            )
            .await
            .expect("turn 1");

        let responses = runtime
            .handle(&mut tracker, UserMessage::new("ask_training"), "req-2")
            .await
            .expect("turn 2");

        assert_eq!(text(&responses[0]), NO_PRODUCT_MESSAGE);
        assert_eq!(template_name(&responses[1]), Some("utter_ask_organization_field"));
        assert_eq!(tracker.active_form(), Some("product_form"));
        assert_eq!(tracker.pending_action(), Some("action_ask_training"));
    }

    #[tokio::test]
    async fn unusable_inform_reasks_the_requested_slot() {
        let fixture = fixture();
        let runtime = DialogRuntime::standard(fixture.ctx.clone());
        let mut tracker = InMemoryTracker::new("user-1");
        runtime
            .handle(
                &mut tracker,
                UserMessage::new("ask_price").with_entity("product_name", "sme.net"),
                "req-1",
            )
            .await
            .expect("turn 1");

        let responses = runtime
            .handle(&mut tracker, UserMessage::new("inform").with_entity("color", "red"), "req-2")
            .await
            .expect("turn 2");

        assert_eq!(responses.len(), 1);
        assert_eq!(template_name(&responses[0]), Some("utter_ask_organization_field"));
        assert_eq!(tracker.requested_slot(), Some(SlotName::OrganizationField));
    }

    #[tokio::test]
    async fn stop_deactivates_and_reset_restarts() {
        let fixture = fixture();
        let runtime = DialogRuntime::standard(fixture.ctx.clone());
        let mut tracker = InMemoryTracker::new("user-1");
        runtime
            .handle(&mut tracker, UserMessage::new("ask_sales"), "req-1")
            .await
            .expect("turn 1");
        assert_eq!(tracker.pending_action(), Some("action_sales_response"));

        let stopped = runtime
            .handle(&mut tracker, UserMessage::new("stop"), "req-2")
            .await
            .expect("turn 2");
        assert!(stopped.is_empty());
        assert_eq!(tracker.active_form(), None);
        assert_eq!(tracker.pending_action(), None);

        let reset = runtime
            .handle(&mut tracker, UserMessage::new("reset"), "req-3")
            .await
            .expect("turn 3");
        assert_eq!(
            reset.iter().filter_map(template_name).collect::<Vec<_>>(),
            vec!["utter_thanks"]
        );
        assert_eq!(tracker.history(), &[TrackerEvent::Restarted]);
    }
}
