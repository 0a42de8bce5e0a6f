use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::bootstrap::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DataStats {
    pub catalog_rows: usize,
    pub products: usize,
    pub package_synonyms: usize,
    pub product_synonyms: usize,
    pub scope_synonyms: usize,
    pub promotions: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub data: DataStats,
    pub actions: usize,
    pub checked_at: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let data = &state.ctx.data;
    let stats = DataStats {
        catalog_rows: data.catalog.len(),
        products: data.catalog.products().len(),
        package_synonyms: data.mappings.package_synonyms(),
        product_synonyms: data.mappings.product_synonyms(),
        scope_synonyms: data.mappings.scope_synonyms(),
        promotions: state.ctx.promotions.len(),
    };
    let ready = stats.catalog_rows > 0;

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: if ready { "ready" } else { "degraded" },
            detail: if ready {
                "dealbot-server runtime initialized".to_string()
            } else {
                "catalog has no rows; every resolution would dead-end".to_string()
            },
        },
        data: stats,
        actions: state.registry.len(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use dealbot_agent::ActionContext;
    use dealbot_core::audit::InMemoryAuditSink;
    use dealbot_core::data::DialogData;
    use dealbot_core::session::{Clock, InMemorySessionStore, SystemClock};

    use crate::bootstrap::tests::test_state;
    use crate::bootstrap::AppState;
    use crate::health::health;

    #[tokio::test]
    async fn health_reports_reference_data_sizes() {
        let (status, Json(payload)) = health(State(test_state())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.data.catalog_rows, 3);
        assert_eq!(payload.data.products, 1);
        assert!(payload.data.product_synonyms >= 1);
        assert_eq!(payload.actions, 14);
    }

    #[tokio::test]
    async fn empty_catalog_is_degraded() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ctx = ActionContext::new(
            Arc::new(DialogData::default()),
            Arc::new(InMemorySessionStore::with_ttl_secs(3000, clock.clone())),
            clock,
            Arc::new(InMemoryAuditSink::default()),
        );

        let (status, Json(payload)) = health(State(Arc::new(AppState::new(ctx)))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.data.catalog_rows, 0);
    }
}
