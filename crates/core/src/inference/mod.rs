//! Per-slot normalization and cross-slot prediction.
//!
//! The engine walks the values extracted this turn in fixed slot order,
//! runs the rule registered for each slot, and folds the rule's predictions
//! over the batch. The top-tier rule is re-applied after every slot so the
//! scope question can never survive once the top tier is implied.

pub mod rules;

use std::collections::BTreeMap;

use tracing::debug;

use crate::cpq::catalog::Catalog;
use crate::domain::dialog::Utterance;
use crate::domain::product::Package;
use crate::domain::slots::{format_scope, SlotName, SlotPatch, SlotState};
use crate::mapping::MappingTables;

pub use rules::{InferenceContext, RuleOutcome, SlotRule, SlotRuleTable};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InferenceReport {
    /// Slot writes to commit. Unrecognized slots are present as cleared.
    pub patch: SlotPatch,
    /// Re-ask prompts for slots that are still unknown after this pass.
    pub reprompts: Vec<Utterance>,
    pub top_tier_applied: bool,
}

impl InferenceReport {
    pub fn unrecognized_slots(&self) -> Vec<SlotName> {
        SlotName::ORDER
            .into_iter()
            .filter(|slot| self.patch.touches(*slot) && self.patch.value(*slot).is_none())
            .collect()
    }
}

/// Pins scope and package to the top tier when either one implies it.
/// `max_scope` is the top-tier code of the product in play. Returns whether
/// the rule fired. Applying it twice changes nothing.
pub fn apply_top_tier_rule(patch: &mut SlotPatch, max_scope: Option<u32>) -> bool {
    let scope_is_max = match (patch.scope(), max_scope) {
        (Some(scope), Some(max)) => scope == f64::from(max),
        _ => false,
    };
    let package_is_top = patch.package().is_some_and(|package| package.is_top_tier());
    if !scope_is_max && !package_is_top {
        return false;
    }

    if let Some(max) = max_scope {
        patch.set(SlotName::Scope, format_scope(f64::from(max)));
    }
    patch.set(SlotName::Package, Package::TOP_TIER.as_str());
    patch.set_scope_asked(true);
    true
}

pub struct SlotInferenceEngine {
    rules: SlotRuleTable,
}

impl Default for SlotInferenceEngine {
    fn default() -> Self {
        Self::new(SlotRuleTable::default())
    }
}

impl SlotInferenceEngine {
    pub fn new(rules: SlotRuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &SlotRuleTable {
        &self.rules
    }

    pub fn infer(
        &self,
        catalog: &Catalog,
        mappings: &MappingTables,
        committed: &SlotState,
        extracted: &BTreeMap<SlotName, String>,
    ) -> InferenceReport {
        let mut batch = SlotPatch::default();
        for (slot, raw) in extracted {
            batch.set(*slot, raw.trim());
        }

        let mut predictions = SlotPatch::default();
        let mut flagged = Vec::new();
        let mut top_tier_applied = false;

        for slot in SlotName::ORDER {
            let Some(raw) = extracted.get(&slot) else {
                continue;
            };
            let Some(rule) = self.rules.rule(slot) else {
                continue;
            };

            let outcome = {
                let context = InferenceContext { catalog, mappings, committed, batch: &batch };
                rule.apply(raw, &context)
            };
            debug!(
                event_name = "dialog.inference.slot_validated",
                slot = slot.as_str(),
                value = raw.as_str(),
                normalized = outcome.value.as_deref().unwrap_or("<unknown>"),
                prediction = ?outcome.predictions,
                "slot rule applied"
            );

            batch.put(slot, outcome.value.clone());
            if let Some(value) = &outcome.value {
                predictions.set(slot, value.clone());
            }
            if outcome.reprompt {
                flagged.push(slot);
            }
            predictions.merge(&outcome.predictions);
            batch.merge(&predictions);

            let product = if batch.touches(SlotName::ProductName) {
                batch.value(SlotName::ProductName)
            } else {
                committed.product_name()
            };
            let max_scope = catalog.max_scope_for(product);
            if apply_top_tier_rule(&mut batch, max_scope) {
                top_tier_applied = true;
                debug!(
                    event_name = "dialog.inference.top_tier_pinned",
                    slot = slot.as_str(),
                    "top tier implied; scope question skipped"
                );
            }
        }

        let hypothetical = committed.clone().applied(&batch);
        let reprompts = flagged
            .into_iter()
            .filter(|slot| batch.value(*slot).is_none())
            .map(|slot| Utterance::template(slot.ask_template(), &hypothetical))
            .collect();

        InferenceReport { patch: batch, reprompts, top_tier_applied }
    }
}
