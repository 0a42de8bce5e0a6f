use std::path::Path;

use dealbot_agent::labels::IntentLabels;
use dealbot_agent::promotions::PromotionCalendar;
use dealbot_core::config::{AppConfig, ConfigError, DataConfig, LoadOptions};
use dealbot_core::data::DialogData;
use serde::Serialize;

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<DoctorCheck>,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Skipped, details: details.into() }
    }
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report(AppConfig::load(LoadOptions::default()));
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    if json_output {
        return CommandResult::json("doctor", exit_code, &report);
    }
    CommandResult::text(exit_code, render_human(&report))
}

/// Skipped checks never fail the report; only `Fail` does.
pub fn build_report(config: Result<AppConfig, ConfigError>) -> DoctorReport {
    let mut checks = Vec::new();

    match config {
        Ok(config) => {
            checks.push(DoctorCheck::pass(
                "config_validation",
                "configuration loaded and validated",
            ));
            checks.push(check_data_files(&config.data));
            checks.push(check_reference_data(&config.data));
            checks.push(check_promotions(config.data.promotions_path.as_deref()));
            checks.push(check_intent_labels(config.data.intent_labels_path.as_deref()));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            for name in ["data_files", "reference_data", "promotions", "intent_labels"] {
                checks.push(DoctorCheck::skipped(
                    name,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_data_files(data: &DataConfig) -> DoctorCheck {
    let missing: Vec<String> = data
        .required_paths()
        .into_iter()
        .filter(|(_, path)| !path.exists())
        .map(|(key, path)| format!("{key} (`{}`)", path.display()))
        .collect();

    if missing.is_empty() {
        DoctorCheck::pass("data_files", "catalog and mapping files are present")
    } else {
        DoctorCheck::fail("data_files", format!("missing: {}", missing.join(", ")))
    }
}

fn check_reference_data(data: &DataConfig) -> DoctorCheck {
    match DialogData::load(data) {
        Ok(loaded) => DoctorCheck::pass(
            "reference_data",
            format!(
                "{} catalog rows across {} products; {} package, {} product and {} scope synonyms",
                loaded.catalog.len(),
                loaded.catalog.products().len(),
                loaded.mappings.package_synonyms(),
                loaded.mappings.product_synonyms(),
                loaded.mappings.scope_synonyms(),
            ),
        ),
        Err(error) => DoctorCheck::fail("reference_data", error.to_string()),
    }
}

fn check_promotions(path: Option<&Path>) -> DoctorCheck {
    let Some(path) = path.filter(|path| path.exists()) else {
        return DoctorCheck::skipped("promotions", "no promotion calendar configured");
    };
    match PromotionCalendar::load(path) {
        Ok(calendar) => DoctorCheck::pass(
            "promotions",
            format!("{} promotions loaded from `{}`", calendar.len(), path.display()),
        ),
        Err(error) => DoctorCheck::fail("promotions", format!("{error:#}")),
    }
}

fn check_intent_labels(path: Option<&Path>) -> DoctorCheck {
    let Some(path) = path.filter(|path| path.exists()) else {
        return DoctorCheck::skipped("intent_labels", "intent names are shown as-is");
    };
    match IntentLabels::load(path) {
        Ok(labels) => DoctorCheck::pass("intent_labels", format!("{} labels", labels.len())),
        Err(error) => DoctorCheck::fail("intent_labels", format!("{error:#}")),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
