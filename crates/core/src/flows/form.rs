//! The product form: one configurable slot-filling form driven by the
//! inference engine and the product form flow.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::cpq::catalog::Catalog;
use crate::cpq::pricing::format_price;
use crate::cpq::resolver::{CatalogResolver, Resolution, ResolvedProduct};
use crate::data::DialogData;
use crate::domain::dialog::{TrackerEvent, Turn, Utterance};
use crate::domain::product::Package;
use crate::domain::slots::{SlotName, SlotPatch, SlotState, REQUESTED_SLOT};
use crate::flows::engine::{FlowEngine, FlowTransitionError, ProductFormFlow};
use crate::flows::states::{FormContext, FormEvent, FormState, TransitionOutcome};
use crate::inference::SlotInferenceEngine;
use crate::session::{Clock, SessionRecord, SessionStore};

pub const PRODUCT_FORM: &str = "product_form";
pub const ACTION_LISTEN: &str = "action_listen";
pub const DEAD_END_MESSAGE: &str = "No product matches your requirements.";

/// Intents under which a volunteered entity may fill a slot.
pub const PRODUCT_INTENTS: [&str; 9] = [
    "inform",
    "change_product",
    "buy",
    "ask_price",
    "ask_extended_price",
    "ask_trial",
    "ask_sales",
    "ask_training",
    "complain_price",
];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormRejection {
    #[error("failed to validate slot {slot} with action {form}")]
    ValidationFailed { form: String, slot: SlotName },
    #[error("form {form} could not transition: {source}")]
    Transition {
        form: String,
        #[source]
        source: FlowTransitionError,
    },
}

impl FormRejection {
    pub fn action_name(&self) -> &str {
        match self {
            Self::ValidationFailed { form, .. } | Self::Transition { form, .. } => form,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotMapping {
    pub slot: SlotName,
    pub entity: String,
    /// Empty means any intent.
    pub intents: Vec<String>,
}

impl SlotMapping {
    pub fn from_entity(slot: SlotName, intents: &[&str]) -> Self {
        Self {
            slot,
            entity: slot.as_str().to_string(),
            intents: intents.iter().map(|intent| intent.to_string()).collect(),
        }
    }

    pub fn accepts(&self, intent: &str) -> bool {
        self.intents.is_empty() || self.intents.iter().any(|allowed| allowed == intent)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormSpec {
    pub name: String,
    pub slots: Vec<SlotMapping>,
    pub deactivation_intents: Vec<String>,
}

impl FormSpec {
    pub fn product_form() -> Self {
        Self {
            name: PRODUCT_FORM.to_string(),
            slots: vec![
                SlotMapping::from_entity(SlotName::ProductName, &PRODUCT_INTENTS),
                SlotMapping::from_entity(SlotName::OrganizationField, &PRODUCT_INTENTS),
                SlotMapping::from_entity(SlotName::Package, &PRODUCT_INTENTS),
                SlotMapping::from_entity(SlotName::Scope, &[]),
            ],
            deactivation_intents: vec!["stop".to_string()],
        }
    }

    pub fn mapping(&self, slot: SlotName) -> Option<&SlotMapping> {
        self.slots.iter().find(|mapping| mapping.slot == slot)
    }
}

impl Default for FormSpec {
    fn default() -> Self {
        Self::product_form()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotRequest {
    pub slot: SlotName,
    pub template: String,
}

/// Collaborators one form run reads and writes.
pub struct FormDeps<'a> {
    pub data: &'a DialogData,
    pub sessions: &'a dyn SessionStore,
    pub clock: &'a dyn Clock,
    pub audit: &'a dyn AuditSink,
    pub correlation_id: &'a str,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormOutcome {
    pub events: Vec<TrackerEvent>,
    pub responses: Vec<Utterance>,
    pub state: FormState,
    /// Set only when the run submitted.
    pub resolution: Option<Resolution>,
}

impl FormOutcome {
    pub fn submitted(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn requested_slot(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|event| match event {
            TrackerEvent::SlotSet { name, value } if name == REQUESTED_SLOT => value.as_str(),
            _ => None,
        })
    }
}

pub struct ProductForm {
    spec: FormSpec,
    inference: SlotInferenceEngine,
    flow: FlowEngine<ProductFormFlow>,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self::new(FormSpec::product_form(), SlotInferenceEngine::default())
    }
}

impl ProductForm {
    pub fn new(spec: FormSpec, inference: SlotInferenceEngine) -> Self {
        Self { spec, inference, flow: FlowEngine::default() }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    /// Entity values this turn may contribute, keyed by the slot they fill.
    pub fn extract(&self, turn: &Turn) -> BTreeMap<SlotName, String> {
        let intent = turn.intent_name();
        self.spec
            .slots
            .iter()
            .filter(|mapping| mapping.accepts(intent))
            .filter_map(|mapping| {
                let value = turn.entities.get(&mapping.entity)?.trim();
                (!value.is_empty()).then(|| (mapping.slot, value.to_string()))
            })
            .collect()
    }

    /// Next slot to ask for over `slots`, in fixed order. Scope is asked at
    /// most once per cycle and never once the top tier is implied.
    pub fn next_slot(&self, slots: &SlotState, catalog: &Catalog) -> Option<SlotRequest> {
        let max_scope = catalog.max_scope_for(slots.product_name());
        for slot in SlotName::ORDER {
            if slot == SlotName::Scope {
                let Some(package) = slots.package() else {
                    continue;
                };
                if slots.scope_asked {
                    continue;
                }
                let scope_is_max = matches!(
                    (slots.scope(), max_scope),
                    (Some(scope), Some(max)) if scope == f64::from(max)
                );
                if scope_is_max || package.is_top_tier() {
                    return None;
                }
                return Some(SlotRequest { slot, template: scope_template(package) });
            }

            if !slots.is_filled(slot) {
                return Some(SlotRequest { slot, template: slot.ask_template() });
            }
        }
        None
    }

    pub fn run(&self, turn: &Turn, deps: &FormDeps<'_>) -> Result<FormOutcome, FormRejection> {
        let audit = AuditContext::new(
            turn.session_id.clone(),
            Some(self.name().to_string()),
            deps.correlation_id,
            "product-form",
        );
        let was_active = turn.active_form.as_deref() == Some(self.name());
        let mut state = if was_active { FormState::Collecting } else { self.flow.initial_state() };
        let mut events = Vec::new();
        let mut responses = Vec::new();

        if !was_active {
            state =
                self.step(state, FormEvent::Activated, FormContext::default(), deps, &audit)?.to;
            events.push(TrackerEvent::FormActivated { name: self.name().to_string() });
            info!(
                event_name = "dialog.form.activated",
                correlation_id = deps.correlation_id,
                session_id = %turn.session_id,
                form = self.name(),
                "form activated"
            );
        }

        let deactivating =
            self.spec.deactivation_intents.iter().any(|intent| intent == turn.intent_name());
        if was_active && deactivating {
            state =
                self.step(state, FormEvent::Deactivated, FormContext::default(), deps, &audit)?.to;
            events.extend(SlotPatch::cleared().to_events());
            events.extend(deactivation_events());
            info!(
                event_name = "dialog.form.deactivated",
                correlation_id = deps.correlation_id,
                session_id = %turn.session_id,
                intent = turn.intent_name(),
                "form deactivated without submission"
            );
            return Ok(FormOutcome { events, responses, state, resolution: None });
        }

        let extracted = self.extract(turn);
        if let Some(slot) = turn.requested_slot.filter(|_| was_active) {
            if extracted.is_empty() {
                deps.audit.emit(
                    audit
                        .event(
                            "form.validation_rejected",
                            AuditCategory::Form,
                            AuditOutcome::Rejected,
                        )
                        .with_metadata("slot", slot.as_str()),
                );
                warn!(
                    event_name = "dialog.form.validation_rejected",
                    correlation_id = deps.correlation_id,
                    session_id = %turn.session_id,
                    slot = slot.as_str(),
                    "requested slot received no value"
                );
                let form = self.name().to_string();
                return Err(FormRejection::ValidationFailed { form, slot });
            }
        }

        let report =
            self.inference.infer(&deps.data.catalog, &deps.data.mappings, &turn.slots, &extracted);
        events.extend(report.patch.to_events());
        let hypothetical = turn.slots.clone().applied(&report.patch);

        if let Some(request) = self.next_slot(&hypothetical, &deps.data.catalog) {
            let event = FormEvent::SlotRequested(request.slot);
            state = self.step(state, event, FormContext::default(), deps, &audit)?.to;
            responses.extend(
                report
                    .reprompts
                    .into_iter()
                    .filter(|prompt| !is_template(prompt, &request.template)),
            );
            responses.push(Utterance::template(request.template.clone(), &hypothetical));
            let requested = Some(request.slot.as_str().to_string());
            events.push(TrackerEvent::slot(REQUESTED_SLOT, requested));
            debug!(
                event_name = "dialog.form.slot_requested",
                correlation_id = deps.correlation_id,
                session_id = %turn.session_id,
                slot = request.slot.as_str(),
                template = %request.template,
                "requesting next slot"
            );
            return Ok(FormOutcome { events, responses, state, resolution: None });
        }

        responses.extend(report.reprompts);
        let context = FormContext { missing_slots: hypothetical.missing_mandatory() };
        state = self.step(state, FormEvent::AllSlotsFilled, context, deps, &audit)?.to;

        let resolution = self.submit(&turn.session_id, &hypothetical, deps, &audit);
        responses.push(submission_message(&resolution, &hypothetical));
        events.extend(SlotPatch::cleared().to_events());

        state = self.step(state, FormEvent::Submitted, FormContext::default(), deps, &audit)?.to;
        events.extend(deactivation_events());
        events.push(TrackerEvent::FollowupAction { name: ACTION_LISTEN.to_string() });

        Ok(FormOutcome { events, responses, state, resolution: Some(resolution) })
    }

    fn submit(
        &self,
        session_id: &str,
        slots: &SlotState,
        deps: &FormDeps<'_>,
        audit: &AuditContext,
    ) -> Resolution {
        let resolution = CatalogResolver::new(&deps.data.catalog).resolve(slots);
        match resolution.matched() {
            Some(product) => {
                let organization = slots.get(SlotName::OrganizationField).map(str::to_string);
                let record =
                    SessionRecord::from_resolution(product, organization, deps.clock.now());
                deps.sessions.put(session_id, record);
                deps.audit.emit(
                    audit
                        .event(
                            "session.record_written",
                            AuditCategory::Session,
                            AuditOutcome::Success,
                        )
                        .with_metadata("product_name", product.product_name.as_str())
                        .with_metadata("package", product.package.as_str())
                        .with_metadata("relaxed", product.relaxed.to_string()),
                );
                info!(
                    event_name = "dialog.form.submitted",
                    correlation_id = deps.correlation_id,
                    session_id,
                    product_name = product.product_name.as_str(),
                    package = product.package.as_str(),
                    relaxed = product.relaxed,
                    "product resolved"
                );
            }
            None => {
                deps.audit.emit(audit.event(
                    "resolution.no_match",
                    AuditCategory::Resolution,
                    AuditOutcome::Rejected,
                ));
                info!(
                    event_name = "dialog.form.dead_end",
                    correlation_id = deps.correlation_id,
                    session_id,
                    "no catalog row matches the collected slots"
                );
            }
        }
        resolution
    }

    fn step(
        &self,
        state: FormState,
        event: FormEvent,
        context: FormContext,
        deps: &FormDeps<'_>,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FormRejection> {
        self.flow
            .apply_with_audit(&state, &event, &context, deps.audit, audit)
            .map_err(|source| FormRejection::Transition { form: self.name().to_string(), source })
    }
}

fn scope_template(package: Package) -> String {
    match package {
        Package::Standard | Package::Professional => {
            format!("{}_{}", SlotName::Scope.ask_template(), package.as_str())
        }
        Package::Enterprise => SlotName::Scope.ask_template(),
    }
}

fn deactivation_events() -> [TrackerEvent; 2] {
    [TrackerEvent::slot(REQUESTED_SLOT, None), TrackerEvent::FormDeactivated]
}

fn is_template(utterance: &Utterance, template: &str) -> bool {
    matches!(utterance, Utterance::Template { name, .. } if name == template)
}

fn submission_message(resolution: &Resolution, slots: &SlotState) -> Utterance {
    match resolution {
        Resolution::Matched(product) => {
            Utterance::text(recommendation(product, slots.get(SlotName::OrganizationField)))
        }
        Resolution::NoMatch => Utterance::text(DEAD_END_MESSAGE),
    }
}

fn recommendation(product: &ResolvedProduct, organization: Option<&str>) -> String {
    let package = product.package.as_str().to_uppercase();
    let business = organization
        .map(|field| format!("a {} business", field.replace('_', " ")))
        .unwrap_or_else(|| "your business".to_string());
    format!(
        "We recommend the {package} package, which covers the accounting needs of {business}. \
         {} {package} costs {}.",
        product.product_name.as_str().to_uppercase(),
        format_price(product.price)
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{FormDeps, FormRejection, FormSpec, ProductForm, DEAD_END_MESSAGE, PRODUCT_FORM};
    use crate::audit::InMemoryAuditSink;
    use crate::data::tests::{sample_data, two_product_data};
    use crate::data::DialogData;
    use crate::domain::dialog::{TrackerEvent, Turn, Utterance};
    use crate::domain::product::Package;
    use crate::domain::slots::{SlotName, SlotState};
    use crate::flows::states::FormState;
    use crate::session::{InMemorySessionStore, ManualClock, SessionStore};

    struct Harness {
        data: DialogData,
        clock: Arc<ManualClock>,
        sessions: InMemorySessionStore,
        audit: InMemoryAuditSink,
        form: ProductForm,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_data(sample_data())
        }

        fn with_data(data: DialogData) -> Self {
            let start =
                Utc.with_ymd_and_hms(2026, 3, 2, 8, 30, 0).single().expect("valid timestamp");
            let clock = Arc::new(ManualClock::new(start));
            Self {
                data,
                sessions: InMemorySessionStore::with_ttl_secs(3000, clock.clone()),
                clock,
                audit: InMemoryAuditSink::default(),
                form: ProductForm::default(),
            }
        }

        fn run(&self, turn: &Turn) -> Result<super::FormOutcome, FormRejection> {
            let deps = FormDeps {
                data: &self.data,
                sessions: &self.sessions,
                clock: self.clock.as_ref(),
                audit: &self.audit,
                correlation_id: "req-test",
            };
            self.form.run(turn, &deps)
        }
    }

    fn active(turn: Turn, requested: SlotName) -> Turn {
        Turn {
            active_form: Some(PRODUCT_FORM.to_string()),
            requested_slot: Some(requested),
            ..turn
        }
    }

    fn templates(responses: &[Utterance]) -> Vec<&str> {
        responses
            .iter()
            .filter_map(|utterance| match utterance {
                Utterance::Template { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    fn texts(responses: &[Utterance]) -> Vec<&str> {
        responses
            .iter()
            .filter_map(|utterance| match utterance {
                Utterance::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_state_asks_for_product_name_first() {
        let harness = Harness::new();
        let outcome = harness.run(&Turn::new("user-1").with_intent("buy")).expect("activation");

        assert_eq!(
            outcome.events.first(),
            Some(&TrackerEvent::FormActivated { name: PRODUCT_FORM.to_string() })
        );
        assert_eq!(outcome.requested_slot(), Some("product_name"));
        assert_eq!(templates(&outcome.responses), vec!["utter_ask_product_name"]);
        assert_eq!(outcome.state, FormState::Collecting);
    }

    #[test]
    fn slots_are_requested_in_fixed_order_and_scope_is_never_first() {
        let form = ProductForm::default();
        let catalog = sample_data().catalog;
        let mut state = SlotState::default();
        let mut asked = Vec::new();
        for (slot, value) in [
            (SlotName::ProductName, "sme"),
            (SlotName::OrganizationField, "trading company"),
            (SlotName::Package, "standard"),
        ] {
            let request = form.next_slot(&state, &catalog).expect("slot to request");
            asked.push(request.slot);
            state = state.with(slot, value);
        }
        let request = form.next_slot(&state, &catalog).expect("scope question");
        asked.push(request.slot);

        assert_eq!(asked, SlotName::ORDER.to_vec());
        assert_eq!(request.template, "utter_ask_scope_standard");

        state.scope_asked = true;
        assert_eq!(form.next_slot(&state, &catalog), None);
    }

    #[test]
    fn scope_synonym_skips_the_scope_question_end_to_end() {
        let harness = Harness::new();
        let first = harness
            .run(&active(
                Turn::new("user-1").with_intent("inform").with_entity("product_name", "SME Pro"),
                SlotName::ProductName,
            ))
            .expect("product turn");
        assert_eq!(first.requested_slot(), Some("organization_field"));

        let mut committed = SlotState::default()
            .with(SlotName::ProductName, "sme")
            .with(SlotName::Scope, "13")
            .with(SlotName::Package, "professional");
        committed.scope_asked = true;

        let second = harness
            .run(&active(
                Turn::new("user-1")
                    .with_intent("inform")
                    .with_entity("organization_field", "trading company")
                    .with_slots(committed),
                SlotName::OrganizationField,
            ))
            .expect("org turn");

        assert!(second.submitted());
        let asked = templates(&second.responses);
        assert!(!asked.iter().any(|name| name.starts_with("utter_ask_scope")));
        let record = harness.sessions.get("user-1").expect("record written");
        assert_eq!(record.package, Package::Professional);
        assert_eq!(record.price, Decimal::new(12_450_000, 0));
        assert!(texts(&second.responses)[0].contains("12.450.000 VNĐ"));
    }

    #[test]
    fn requested_slot_without_any_value_is_rejected() {
        let harness = Harness::new();
        let turn = active(Turn::new("user-1").with_intent("inform"), SlotName::Package);

        let error = harness.run(&turn).expect_err("nothing extracted");
        assert_eq!(
            error,
            FormRejection::ValidationFailed {
                form: PRODUCT_FORM.to_string(),
                slot: SlotName::Package
            }
        );
        assert!(harness.audit.event_types().contains(&"form.validation_rejected".to_string()));
    }

    #[test]
    fn entity_under_unrelated_intent_is_ignored() {
        let form = ProductForm::default();
        let turn = Turn::new("user-1").with_intent("greet").with_entity("package", "standard");
        assert!(form.extract(&turn).is_empty());

        let scope = Turn::new("user-1").with_intent("greet").with_entity("scope", "13");
        assert_eq!(form.extract(&scope).get(&SlotName::Scope).map(String::as_str), Some("13"));
    }

    #[test]
    fn predicted_tier_selects_tier_specific_scope_question() {
        let harness = Harness::new();
        let committed = SlotState::default().with(SlotName::ProductName, "sme");
        let outcome = harness
            .run(&active(
                Turn::new("user-1")
                    .with_intent("inform")
                    .with_entity("organization_field", "household business")
                    .with_slots(committed),
                SlotName::OrganizationField,
            ))
            .expect("org turn");

        assert_eq!(outcome.requested_slot(), Some("scope"));
        assert_eq!(templates(&outcome.responses), vec!["utter_ask_scope_standard"]);
    }

    #[test]
    fn top_tier_organization_submits_without_scope_question() {
        let harness = Harness::new();
        let committed = SlotState::default().with(SlotName::ProductName, "sme");
        let outcome = harness
            .run(&active(
                Turn::new("user-1")
                    .with_intent("inform")
                    .with_entity("organization_field", "corporation")
                    .with_slots(committed),
                SlotName::OrganizationField,
            ))
            .expect("org turn");

        assert!(outcome.submitted());
        let record = harness.sessions.get("user-1").expect("record");
        assert_eq!(record.package, Package::Enterprise);
        assert_eq!(record.scope, 16.0);
    }

    #[test]
    fn top_tier_resolves_against_the_products_own_catalog_rows() {
        let harness = Harness::with_data(two_product_data());
        let committed = SlotState::default().with(SlotName::ProductName, "amis");
        let outcome = harness
            .run(&active(
                Turn::new("user-1")
                    .with_intent("inform")
                    .with_entity("organization_field", "corporation")
                    .with_slots(committed),
                SlotName::OrganizationField,
            ))
            .expect("org turn");

        assert!(outcome.submitted());
        assert!(!texts(&outcome.responses).contains(&DEAD_END_MESSAGE));
        let record = harness.sessions.get("user-1").expect("record");
        assert_eq!(record.product_name.as_str(), "amis");
        assert_eq!(record.package, Package::Enterprise);
        assert_eq!(record.scope, 12.0);
        assert_eq!(record.price, Decimal::new(14_500_000, 0));
    }

    #[test]
    fn top_tier_scope_synonym_submits_for_a_smaller_product() {
        let harness = Harness::with_data(two_product_data());
        let committed = SlotState::default().with(SlotName::OrganizationField, "group");
        let outcome = harness
            .run(&active(
                Turn::new("user-2")
                    .with_intent("inform")
                    .with_entity("product_name", "amis enterprise")
                    .with_slots(committed),
                SlotName::ProductName,
            ))
            .expect("product turn");

        assert!(outcome.submitted());
        let record = harness.sessions.get("user-2").expect("record");
        assert_eq!(record.package, Package::Enterprise);
        assert_eq!(record.price, Decimal::new(14_500_000, 0));
    }

    #[test]
    fn scope_above_every_threshold_dead_ends_without_record() {
        let harness = Harness::new();
        let committed = SlotState::default()
            .with(SlotName::ProductName, "sme")
            .with(SlotName::OrganizationField, "household business")
            .with(SlotName::Package, "standard");
        let outcome = harness
            .run(&active(
                Turn::new("user-1")
                    .with_intent("inform")
                    .with_entity("scope", "999999")
                    .with_slots(committed),
                SlotName::Scope,
            ))
            .expect("scope turn");

        assert_eq!(texts(&outcome.responses), vec![DEAD_END_MESSAGE]);
        assert!(harness.sessions.get("user-1").is_none());
        assert_eq!(outcome.state, FormState::Inactive);
        assert!(harness.audit.event_types().contains(&"resolution.no_match".to_string()));
    }

    #[test]
    fn submission_clears_slots_then_deactivates_and_listens() {
        let harness = Harness::new();
        let mut committed = SlotState::default()
            .with(SlotName::ProductName, "sme")
            .with(SlotName::OrganizationField, "trading company");
        committed.scope_asked = true;
        let outcome = harness
            .run(&active(
                Turn::new("user-1")
                    .with_intent("inform")
                    .with_entity("package", "professional")
                    .with_slots(committed),
                SlotName::Package,
            ))
            .expect("package turn");

        let cleared = outcome.events.iter().any(|event| {
            matches!(
                event,
                TrackerEvent::SlotSet { name, value } if name == "product_name" && value.is_null()
            )
        });
        assert!(cleared);
        assert!(outcome.events.contains(&TrackerEvent::FormDeactivated));
        assert_eq!(
            outcome.events.last(),
            Some(&TrackerEvent::FollowupAction { name: "action_listen".to_string() })
        );
    }

    #[test]
    fn second_submission_overwrites_session_record() {
        let harness = Harness::new();
        let submit = |org: &str| {
            let mut committed = SlotState::default()
                .with(SlotName::ProductName, "sme")
                .with(SlotName::Package, "professional");
            committed.scope_asked = true;
            harness
                .run(&active(
                    Turn::new("user-1")
                        .with_intent("inform")
                        .with_entity("organization_field", org)
                        .with_slots(committed),
                    SlotName::OrganizationField,
                ))
                .expect("submission")
        };

        submit("trading company");
        submit("manufacturing");

        let record = harness.sessions.get("user-1").expect("record");
        assert_eq!(record.organization_field.as_deref(), Some("manufacturing"));
    }

    #[test]
    fn unrecognized_product_is_asked_once() {
        let harness = Harness::new();
        let outcome = harness
            .run(&active(
                Turn::new("user-1")
                    .with_intent("inform")
                    .with_entity("product_name", "spreadsheet"),
                SlotName::ProductName,
            ))
            .expect("product turn");

        assert_eq!(templates(&outcome.responses), vec!["utter_ask_product_name"]);
        assert_eq!(outcome.requested_slot(), Some("product_name"));
    }

    #[test]
    fn deactivation_intent_ends_form_without_submission() {
        let harness = Harness::new();
        let committed = SlotState::default().with(SlotName::ProductName, "sme");
        let outcome = harness
            .run(&active(
                Turn::new("user-1").with_intent("stop").with_slots(committed),
                SlotName::OrganizationField,
            ))
            .expect("deactivation");

        assert!(!outcome.submitted());
        assert_eq!(outcome.state, FormState::Inactive);
        assert!(outcome.events.contains(&TrackerEvent::FormDeactivated));
        assert!(outcome.responses.is_empty());
    }

    #[test]
    fn product_form_spec_maps_every_slot() {
        let spec = FormSpec::product_form();
        for slot in SlotName::ORDER {
            assert!(spec.mapping(slot).is_some(), "{slot} has a mapping");
        }
    }
}
