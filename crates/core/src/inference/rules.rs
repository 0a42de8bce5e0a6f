use std::collections::BTreeMap;

use crate::cpq::catalog::Catalog;
use crate::cpq::resolver::CatalogResolver;
use crate::domain::product::Package;
use crate::domain::slots::{format_scope, parse_scope, SlotName, SlotPatch, SlotState};
use crate::mapping::{normalize_key, MappingTables};

/// Everything a rule may consult while validating one slot value.
pub struct InferenceContext<'a> {
    pub catalog: &'a Catalog,
    pub mappings: &'a MappingTables,
    pub committed: &'a SlotState,
    /// Values accumulated so far this turn (extracted, normalized and predicted).
    pub batch: &'a SlotPatch,
}

impl<'a> InferenceContext<'a> {
    pub fn resolver(&self) -> CatalogResolver<'a> {
        CatalogResolver::new(self.catalog)
    }

    /// Product name from committed state, else from this turn's batch.
    pub fn known_product(&self) -> Option<&'a str> {
        self.committed.product_name().or_else(|| self.batch.value(SlotName::ProductName))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RuleOutcome {
    /// Normalized value for the slot; `None` means unknown, ask again.
    pub value: Option<String>,
    pub predictions: SlotPatch,
    pub reprompt: bool,
}

impl RuleOutcome {
    fn unrecognized() -> Self {
        Self { value: None, predictions: SlotPatch::default(), reprompt: true }
    }

    fn accepted(value: impl Into<String>) -> Self {
        Self { value: Some(value.into()), predictions: SlotPatch::default(), reprompt: false }
    }
}

pub trait SlotRule: Send + Sync {
    fn slot(&self) -> SlotName;
    fn apply(&self, raw: &str, context: &InferenceContext<'_>) -> RuleOutcome;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ProductNameRule;

impl SlotRule for ProductNameRule {
    fn slot(&self) -> SlotName {
        SlotName::ProductName
    }

    fn apply(&self, raw: &str, context: &InferenceContext<'_>) -> RuleOutcome {
        let Some(product) = context
            .mappings
            .product(raw)
            .filter(|product| context.catalog.has_product(product.as_str()))
        else {
            return RuleOutcome::unrecognized();
        };

        let mut outcome = RuleOutcome::accepted(product.as_str());
        // A scope phrase ("sme pro") names both the product and its tier.
        if let Some(code) = context.mappings.scope_code(product.as_str(), &normalize_key(raw)) {
            outcome.predictions.set(SlotName::Scope, code);
            outcome.predictions.set_scope_asked(true);
            if let Some(package) = parse_scope(code).and_then(|scope| {
                context.resolver().predict_package_for_scope(product.as_str(), scope)
            }) {
                outcome.predictions.set(SlotName::Package, package.as_str());
            }
        }
        outcome
    }
}

/// Organization size/type phrases double as package synonyms.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrganizationFieldRule;

impl SlotRule for OrganizationFieldRule {
    fn slot(&self) -> SlotName {
        SlotName::OrganizationField
    }

    fn apply(&self, raw: &str, context: &InferenceContext<'_>) -> RuleOutcome {
        let Some(package) = context.mappings.package(raw) else {
            return RuleOutcome::unrecognized();
        };

        let mut outcome = RuleOutcome::accepted(normalize_key(raw));
        outcome.predictions.set(SlotName::Package, package.as_str());
        predict_scope_from_package(package, context, &mut outcome.predictions);
        outcome
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PackageRule;

impl SlotRule for PackageRule {
    fn slot(&self) -> SlotName {
        SlotName::Package
    }

    fn apply(&self, raw: &str, context: &InferenceContext<'_>) -> RuleOutcome {
        let Some(package) = context.mappings.package(raw) else {
            return RuleOutcome::unrecognized();
        };

        let mut outcome = RuleOutcome::accepted(package.as_str());
        outcome.predictions.set(SlotName::Package, package.as_str());
        predict_scope_from_package(package, context, &mut outcome.predictions);
        outcome
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ScopeRule;

impl SlotRule for ScopeRule {
    fn slot(&self) -> SlotName {
        SlotName::Scope
    }

    fn apply(&self, raw: &str, context: &InferenceContext<'_>) -> RuleOutcome {
        let mut outcome = RuleOutcome::accepted(raw.trim());
        outcome.predictions.set_scope_asked(true);

        match parse_scope(raw) {
            Some(scope) => {
                if let Some(package) = context.resolver().predict_package_any_product(scope) {
                    outcome.predictions.set(SlotName::Package, package.as_str());
                }
            }
            None => {
                tracing::debug!(
                    event_name = "dialog.inference.scope_not_numeric",
                    value = raw,
                    "scope value is not numeric; no package prediction"
                );
            }
        }
        outcome
    }
}

fn predict_scope_from_package(
    package: Package,
    context: &InferenceContext<'_>,
    predictions: &mut SlotPatch,
) {
    let Some(product) = context.known_product() else {
        return;
    };
    if let Some(threshold) = context.resolver().predict_scope_for_package(product, package) {
        predictions.set(SlotName::Scope, format_scope(f64::from(threshold)));
    }
}

/// One rule per slot tag.
pub struct SlotRuleTable {
    rules: BTreeMap<SlotName, Box<dyn SlotRule>>,
}

impl SlotRuleTable {
    pub fn empty() -> Self {
        Self { rules: BTreeMap::new() }
    }

    pub fn with_rule<R>(mut self, rule: R) -> Self
    where
        R: SlotRule + 'static,
    {
        self.rules.insert(rule.slot(), Box::new(rule));
        self
    }

    pub fn rule(&self, slot: SlotName) -> Option<&dyn SlotRule> {
        self.rules.get(&slot).map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for SlotRuleTable {
    fn default() -> Self {
        Self::empty()
            .with_rule(ProductNameRule)
            .with_rule(OrganizationFieldRule)
            .with_rule(PackageRule)
            .with_rule(ScopeRule)
    }
}
