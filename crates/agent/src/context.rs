use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use dealbot_core::audit::{AuditSink, TracingAuditSink};
use dealbot_core::config::{AppConfig, DialogConfig};
use dealbot_core::data::DialogData;
use dealbot_core::flows::FormDeps;
use dealbot_core::session::{Clock, InMemorySessionStore, SessionStore, SystemClock};
use tracing::{info, warn};

use crate::labels::IntentLabels;
use crate::promotions::PromotionCalendar;

/// Shared collaborators every action reads. Cloning is cheap: the data,
/// the session store and the sinks sit behind `Arc`.
#[derive(Clone)]
pub struct ActionContext {
    pub data: Arc<DialogData>,
    pub sessions: Arc<dyn SessionStore>,
    pub clock: Arc<dyn Clock>,
    pub audit: Arc<dyn AuditSink>,
    pub dialog: DialogConfig,
    pub promotions: PromotionCalendar,
    pub intent_labels: IntentLabels,
}

impl ActionContext {
    pub fn new(
        data: Arc<DialogData>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            data,
            sessions,
            clock,
            audit,
            dialog: DialogConfig::default(),
            promotions: PromotionCalendar::default(),
            intent_labels: IntentLabels::default(),
        }
    }

    pub fn with_dialog(mut self, dialog: DialogConfig) -> Self {
        self.dialog = dialog;
        self
    }

    pub fn with_promotions(mut self, promotions: PromotionCalendar) -> Self {
        self.promotions = promotions;
        self
    }

    pub fn with_intent_labels(mut self, intent_labels: IntentLabels) -> Self {
        self.intent_labels = intent_labels;
        self
    }

    /// Loads reference data and wires the production collaborators.
    pub fn load(config: &AppConfig) -> Result<Self> {
        let data = DialogData::load(&config.data).context("failed to load reference data")?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let sessions =
            Arc::new(InMemorySessionStore::with_ttl_secs(config.session.ttl_secs, clock.clone()));

        let promotions = match config.data.promotions_path.as_deref() {
            Some(path) if path.exists() => PromotionCalendar::load(path)?,
            Some(path) => {
                warn!(
                    event_name = "system.data.promotions_missing",
                    correlation_id = "bootstrap",
                    path = %path.display(),
                    "promotion calendar not found; sales questions will report no promotions"
                );
                PromotionCalendar::default()
            }
            None => PromotionCalendar::default(),
        };
        let intent_labels = match config.data.intent_labels_path.as_deref() {
            Some(path) if path.exists() => IntentLabels::load(path)?,
            _ => IntentLabels::default(),
        };

        info!(
            event_name = "system.actions.context_ready",
            correlation_id = "bootstrap",
            promotions = promotions.len(),
            intent_labels = intent_labels.len(),
            session_ttl_secs = config.session.ttl_secs,
            "action context ready"
        );

        Ok(Self::new(Arc::new(data), sessions, clock, Arc::new(TracingAuditSink))
            .with_dialog(config.dialog.clone())
            .with_promotions(promotions)
            .with_intent_labels(intent_labels))
    }

    pub fn form_deps<'a>(&'a self, correlation_id: &'a str) -> FormDeps<'a> {
        FormDeps {
            data: self.data.as_ref(),
            sessions: self.sessions.as_ref(),
            clock: self.clock.as_ref(),
            audit: self.audit.as_ref(),
            correlation_id,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }
}
