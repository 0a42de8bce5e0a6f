use std::collections::BTreeMap;

use dealbot_core::config::{AppConfig, LoadOptions};
use dealbot_core::cpq::{format_price, CatalogResolver, Resolution};
use dealbot_core::data::DialogData;
use dealbot_core::domain::slots::{SlotName, SlotState};
use dealbot_core::inference::SlotInferenceEngine;
use serde::Serialize;

use super::CommandResult;

/// Raw slot values as a user might have typed them.
#[derive(Clone, Debug, Default)]
pub struct ResolveArgs {
    pub product: Option<String>,
    pub organization: Option<String>,
    pub package: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub slots: BTreeMap<&'static str, Option<String>>,
    pub unrecognized: Vec<&'static str>,
    pub missing: Vec<&'static str>,
    pub top_tier_applied: bool,
    pub resolution: Resolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewal_price: Option<String>,
}

pub fn run(args: ResolveArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("resolve", "config_validation", error.to_string(), 2)
        }
    };
    let data = match DialogData::load(&config.data) {
        Ok(data) => data,
        Err(error) => {
            return CommandResult::failure("resolve", "reference_data", error.to_string(), 3)
        }
    };

    let report = resolve_with(&data, &args);
    let exit_code = if report.resolution.matched().is_some() { 0 } else { 4 };
    CommandResult::json("resolve", exit_code, &report)
}

/// Runs the slot rules over `args` as one turn, then the catalog query the
/// form would submit with.
pub fn resolve_with(data: &DialogData, args: &ResolveArgs) -> ResolveReport {
    let extracted: BTreeMap<SlotName, String> = [
        (SlotName::ProductName, &args.product),
        (SlotName::OrganizationField, &args.organization),
        (SlotName::Package, &args.package),
        (SlotName::Scope, &args.scope),
    ]
    .into_iter()
    .filter_map(|(slot, value)| Some((slot, value.clone()?)))
    .collect();

    let inference = SlotInferenceEngine::default().infer(
        &data.catalog,
        &data.mappings,
        &SlotState::default(),
        &extracted,
    );
    let slots = SlotState::default().applied(&inference.patch);
    let resolution = CatalogResolver::new(&data.catalog).resolve(&slots);
    let matched = resolution.matched();
    let names = |list: Vec<SlotName>| -> Vec<&'static str> {
        list.into_iter().map(|slot| slot.as_str()).collect()
    };

    ResolveReport {
        slots: SlotName::ORDER
            .into_iter()
            .map(|slot| (slot.as_str(), slots.get(slot).map(str::to_string)))
            .collect(),
        unrecognized: names(inference.unrecognized_slots()),
        missing: names(slots.missing_mandatory()),
        top_tier_applied: inference.top_tier_applied,
        price: matched.map(|product| format_price(product.price)),
        renewal_price: matched.map(|product| format_price(product.renewal_price)),
        resolution,
    }
}
