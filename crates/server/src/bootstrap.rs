use std::sync::Arc;

use dealbot_agent::{ActionContext, ActionRegistry};
use dealbot_core::config::{AppConfig, ConfigError, LoadOptions};
use thiserror::Error;
use tracing::info;

/// State shared by every request handler. Reference data is immutable; the
/// session store inside the context is the only mutable shared state.
pub struct AppState {
    pub ctx: ActionContext,
    pub registry: ActionRegistry,
}

impl AppState {
    pub fn new(ctx: ActionContext) -> Self {
        Self { ctx, registry: ActionRegistry::standard() }
    }
}

pub struct Application {
    pub config: AppConfig,
    pub state: Arc<AppState>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("action context failed to load: {0:#}")]
    ActionContext(anyhow::Error),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let ctx = ActionContext::load(&config).map_err(BootstrapError::ActionContext)?;
    let state = Arc::new(AppState::new(ctx));
    info!(
        event_name = "system.bootstrap.actions_registered",
        correlation_id = "bootstrap",
        actions = state.registry.len(),
        catalog_rows = state.ctx.data.catalog.len(),
        "action registry ready"
    );
    Ok(Application { config, state })
}
