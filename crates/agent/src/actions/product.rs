//! Questions about the product the user already picked. Each one reads the
//! session cache; without a live record the user is sent back to the form.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dealbot_core::audit::{AuditCategory, AuditContext, AuditOutcome};
use dealbot_core::cpq::format_price;
use dealbot_core::domain::dialog::{Button, TrackerEvent, Turn, Utterance};
use dealbot_core::domain::slots::{format_scope, SlotName};
use dealbot_core::errors::ApplicationError;
use dealbot_core::flows::PRODUCT_FORM;
use dealbot_core::session::SessionRecord;
use tracing::{debug, info};

use crate::actions::support::TRAINING_SLOT;
use crate::context::ActionContext;
use crate::promotions::Promotion;
use crate::registry::{Action, ActionResponse};

pub const NO_PRODUCT_MESSAGE: &str = "You have not chosen a product yet. Please choose a product.";

pub const TRAINING_KINDS: [(&str, &str); 3] = [
    ("Centralized training", "centralized"),
    ("On-site training at your company", "onsite"),
    ("Deployment support", "deployment"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductQuery {
    Price,
    ChangeProduct,
    Buy,
    ExtendedPrice,
    Trial,
    Sales,
    AskTraining,
    ComplainPrice,
}

impl ProductQuery {
    pub const ALL: [ProductQuery; 8] = [
        ProductQuery::Price,
        ProductQuery::ChangeProduct,
        ProductQuery::Buy,
        ProductQuery::ExtendedPrice,
        ProductQuery::Trial,
        ProductQuery::Sales,
        ProductQuery::AskTraining,
        ProductQuery::ComplainPrice,
    ];

    pub fn action_name(self) -> &'static str {
        match self {
            Self::Price => "action_price_response",
            Self::ChangeProduct => "action_change_product",
            Self::Buy => "action_buy",
            Self::ExtendedPrice => "action_extended_price_response",
            Self::Trial => "action_trial_response",
            Self::Sales => "action_sales_response",
            Self::AskTraining => "action_ask_training",
            Self::ComplainPrice => "action_complain_price_response",
        }
    }

    /// Buying without a product sends the user to the form silently.
    fn announces_missing_product(self) -> bool {
        self != Self::Buy
    }

    /// Informational answers are replayed once the form has resolved a product.
    /// The form's own recommendation already quotes the price.
    fn retries_after_form(self) -> bool {
        !matches!(self, Self::Price | Self::ChangeProduct | Self::Buy)
    }

    /// A price question that names product details is a new configuration,
    /// so it goes to the form instead of the cached answer.
    fn defers_to_form(self, turn: &Turn) -> bool {
        self == Self::Price
            && SlotName::ORDER.iter().any(|slot| turn.entities.contains_key(slot.as_str()))
    }

    fn answer(self, record: &SessionRecord, ctx: &ActionContext) -> ActionResponse {
        let product = record.product_name.as_str().to_uppercase();
        let package = record.package.as_str().to_uppercase();
        match self {
            Self::Price => ActionResponse::respond(Utterance::text(format!(
                "{product} {package} costs {}, with an annual renewal fee of {}.",
                format_price(record.price),
                format_price(record.renewal_price)
            ))),
            Self::ChangeProduct => {
                let events = vec![
                    TrackerEvent::ActionReverted,
                    TrackerEvent::slot(
                        SlotName::OrganizationField.as_str(),
                        record.organization_field.clone(),
                    ),
                    TrackerEvent::slot(
                        SlotName::Package.as_str(),
                        Some(record.package.as_str().to_string()),
                    ),
                    TrackerEvent::slot(SlotName::Scope.as_str(), Some(format_scope(record.scope))),
                    TrackerEvent::FormActivated { name: PRODUCT_FORM.to_string() },
                ];
                let text = format!("You are changing product {product} {package}.");
                ActionResponse::new(events, vec![Utterance::text(text)])
            }
            Self::Buy => ActionResponse::respond(Utterance::text(format!(
                "You are buying {product} {package} for {}.\n\
                 Follow this link to purchase the software and pay for the order:\n{}",
                format_price(record.price),
                ctx.dialog.purchase_url
            ))),
            Self::ExtendedPrice => ActionResponse::respond(Utterance::text(format!(
                "Every year you pay a renewal fee that keeps the software up to date with \
                 accounting and tax regulation changes and brings new product features. \
                 The annual renewal fee of the {package} package is {} per year.",
                format_price(record.renewal_price)
            ))),
            Self::Trial => ActionResponse::respond(Utterance::text(format!(
                "{product} {package} comes with a {}-day free trial so you can try it before \
                 buying. Register for the trial and download the installer here: {}",
                ctx.dialog.trial_days, ctx.dialog.trial_url
            ))),
            Self::Sales => {
                let active = ctx.promotions.active_on(record.product_name.as_str(), ctx.today());
                ActionResponse::respond(Utterance::text(sales_message(&product, &active)))
            }
            Self::AskTraining => {
                let buttons = TRAINING_KINDS
                    .iter()
                    .map(|(title, kind)| {
                        let entities =
                            BTreeMap::from([(TRAINING_SLOT.to_string(), kind.to_string())]);
                        Button::new(*title, Button::intent_payload("inform", &entities))
                    })
                    .collect();
                ActionResponse::respond(Utterance::buttons(
                    format!(
                        "For {product} {package}, we provide {} days of usage training in \
                         the following formats",
                        ctx.dialog.training_days
                    ),
                    buttons,
                ))
            }
            Self::ComplainPrice => ActionResponse::respond(Utterance::text(format!(
                "{product} {package} costs {} with an annual renewal fee of {}, and gives you:\n\
                 - A complete, standards-driven product with management reporting\n\
                 - Round-the-clock support over many channels\n\
                 - Timely updates whenever state regulations change\n\
                 - Direct connections to the tax authority, e-invoicing and e-banking",
                format_price(record.price),
                format_price(record.renewal_price)
            ))),
        }
    }
}

fn sales_message(product: &str, active: &[&Promotion]) -> String {
    if active.is_empty() {
        return format!("{product} currently has no promotions.");
    }
    active
        .iter()
        .map(|promotion| {
            let offers = promotion
                .offers
                .iter()
                .enumerate()
                .map(|(index, offer)| format!("{}. {offer}", index + 1))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "From {} to {}, {product} has the following promotions:\n{offers}",
                promotion.starts_on.format("%-d/%-m/%Y"),
                promotion.ends_on.format("%-d/%-m/%Y"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One product-aware query bound to its action name.
#[derive(Clone, Copy, Debug)]
pub struct ProductQueryAction {
    query: ProductQuery,
}

impl ProductQueryAction {
    pub fn new(query: ProductQuery) -> Self {
        Self { query }
    }

    pub fn query(&self) -> ProductQuery {
        self.query
    }

    fn no_product(&self, announce: bool) -> ActionResponse {
        let responses = if announce && self.query.announces_missing_product() {
            vec![Utterance::text(NO_PRODUCT_MESSAGE)]
        } else {
            Vec::new()
        };
        ActionResponse {
            events: vec![
                TrackerEvent::ActionReverted,
                TrackerEvent::FormActivated { name: PRODUCT_FORM.to_string() },
            ],
            responses,
            retry_after_form: self.query.retries_after_form(),
            resolved: false,
        }
    }
}

#[async_trait]
impl Action for ProductQueryAction {
    fn name(&self) -> &'static str {
        self.query.action_name()
    }

    async fn run(
        &self,
        turn: &Turn,
        ctx: &ActionContext,
        correlation_id: &str,
    ) -> Result<ActionResponse, ApplicationError> {
        if self.query.defers_to_form(turn) {
            debug!(
                event_name = "dialog.query.deferred_to_form",
                correlation_id,
                session_id = %turn.session_id,
                action = self.name(),
                "question carries product details; activating product form"
            );
            return Ok(self.no_product(false));
        }

        let Some(record) = ctx.sessions.get(&turn.session_id) else {
            info!(
                event_name = "dialog.query.no_product",
                correlation_id,
                session_id = %turn.session_id,
                action = self.name(),
                "no live product for query; activating product form"
            );
            ctx.audit.emit(
                AuditContext::new(
                    turn.session_id.clone(),
                    Some(self.name().to_string()),
                    correlation_id,
                    "product-query",
                )
                .event("session.record_missing", AuditCategory::Session, AuditOutcome::Rejected),
            );
            return Ok(self.no_product(true));
        };

        debug!(
            event_name = "dialog.query.answered",
            correlation_id,
            session_id = %turn.session_id,
            action = self.name(),
            product_name = record.product_name.as_str(),
            package = record.package.as_str(),
            "answering from session record"
        );
        Ok(self.query.answer(&record, ctx))
    }
}
