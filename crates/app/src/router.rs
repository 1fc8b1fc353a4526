use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;
use webhookd_bus::Publisher;
use webhookd_travis::TravisConfigClient;
use webhookd_util::HookRoute;

use crate::hooks::{self, ProviderAdapter, RouteState};
use crate::response::plain_text;
use crate::telemetry;

/// Largest request body accepted on webhook routes.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Process-wide collaborators shared by every route.
#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    publisher: Arc<dyn Publisher>,
    travis: TravisConfigClient,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        publisher: Arc<dyn Publisher>,
        travis: TravisConfigClient,
    ) -> Self {
        Self {
            metrics,
            publisher,
            travis,
        }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn publisher(&self) -> &dyn Publisher {
        self.publisher.as_ref()
    }

    pub fn travis(&self) -> &TravisConfigClient {
        &self.travis
    }
}

/// Builds the dispatcher: one handler per configured route plus the
/// operational endpoints. Unknown paths answer `404 Not Found`.
pub fn app_router(state: AppState, routes: &[HookRoute]) -> Router {
    let mut router = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state.clone());

    for route in routes {
        let adapter = Arc::new(ProviderAdapter::from_route(route));
        info!(
            stage = "router",
            provider = %route.provider,
            route = %route.route,
            exchange = %route.exchange,
            authenticated = adapter.settings().secret.is_enabled(),
            "registered webhook route"
        );
        let hook = Router::new()
            .route(&route.route, any(hooks::handle))
            .with_state(RouteState::new(state.clone(), adapter));
        router = router.merge(hook);
    }

    router
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

async fn not_found() -> Response {
    plain_text(StatusCode::NOT_FOUND)
}
