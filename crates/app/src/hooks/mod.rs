//! Provider adapters: one verification and normalization pipeline per
//! webhook source, dispatched through [`ProviderAdapter`].

mod demo;
mod gitea;
mod github;
mod gitlab;
mod travis;

#[cfg(test)]
pub(crate) mod testing;

use std::{sync::Arc, time::Instant};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Response},
};
use metrics::{counter, histogram};
use tracing::{error, info, warn};
use webhookd_core::{extract_payload, CanonicalEvent, PayloadShape, SecretPolicy};
use webhookd_util::{HookRoute, ProviderKind};

use crate::response::{plain_text, HookError, HookOutcome};
use crate::router::AppState;

pub use demo::DemoHook;
pub use gitea::GiteaHook;
pub use github::GithubHook;
pub use gitlab::GitlabHook;
pub use travis::TravisHook;

/// Immutable per-route configuration owned by an adapter.
#[derive(Debug, Clone)]
pub struct HookSettings {
    pub route: String,
    pub secret: SecretPolicy,
    pub exchange: String,
}

impl From<&HookRoute> for HookSettings {
    fn from(route: &HookRoute) -> Self {
        Self {
            route: route.route.clone(),
            secret: SecretPolicy::from_config(route.secret.clone()),
            exchange: route.exchange.clone(),
        }
    }
}

/// A webhook handler for one provider family.
///
/// Each variant verifies and decodes its own schema and yields at most one
/// canonical event per request.
#[derive(Debug, Clone)]
pub enum ProviderAdapter {
    Github(GithubHook),
    Gitlab(GitlabHook),
    Gitea(GiteaHook),
    Travis(TravisHook),
    Demo(DemoHook),
}

impl ProviderAdapter {
    pub fn from_route(route: &HookRoute) -> Self {
        let settings = HookSettings::from(route);
        match route.provider {
            ProviderKind::Github => Self::Github(GithubHook::new(settings)),
            ProviderKind::Gitlab => Self::Gitlab(GitlabHook::new(settings)),
            ProviderKind::Gitea => Self::Gitea(GiteaHook::new(settings)),
            ProviderKind::Travis => Self::Travis(TravisHook::new(settings)),
            ProviderKind::Demo => Self::Demo(DemoHook::new(settings)),
        }
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::Github(_) => ProviderKind::Github,
            Self::Gitlab(_) => ProviderKind::Gitlab,
            Self::Gitea(_) => ProviderKind::Gitea,
            Self::Travis(_) => ProviderKind::Travis,
            Self::Demo(_) => ProviderKind::Demo,
        }
    }

    pub fn settings(&self) -> &HookSettings {
        match self {
            Self::Github(hook) => &hook.settings,
            Self::Gitlab(hook) => &hook.settings,
            Self::Gitea(hook) => &hook.settings,
            Self::Travis(hook) => &hook.settings,
            Self::Demo(hook) => &hook.settings,
        }
    }

    pub async fn handle(
        &self,
        state: &AppState,
        request: &WebhookRequest,
    ) -> Result<HookOutcome, HookError> {
        match self {
            Self::Github(hook) => hook.handle(state, request).await,
            Self::Gitlab(hook) => hook.handle(state, request).await,
            Self::Gitea(hook) => hook.handle(state, request).await,
            Self::Travis(hook) => hook.handle(state, request).await,
            Self::Demo(hook) => hook.handle(state, request).await,
        }
    }
}

/// State bound to a single configured route.
#[derive(Clone)]
pub struct RouteState {
    app: AppState,
    adapter: Arc<ProviderAdapter>,
}

impl RouteState {
    pub fn new(app: AppState, adapter: Arc<ProviderAdapter>) -> Self {
        Self { app, adapter }
    }
}

/// The parts of an inbound request the adapters inspect.
pub struct WebhookRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl WebhookRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn required_header(&self, name: &'static str) -> Result<&str, HookError> {
        self.header(name)
            .filter(|value| !value.is_empty())
            .ok_or(HookError::MissingHeader(name))
    }

    pub fn ensure_post(&self) -> Result<(), HookError> {
        if self.method == Method::POST {
            Ok(())
        } else {
            Err(HookError::MethodNotAllowed(self.method.clone()))
        }
    }

    /// Applies the content-type and payload-presence gates.
    pub fn payload(&self, accepted: &[PayloadShape]) -> Result<String, HookError> {
        let content_type = self.header(header::CONTENT_TYPE.as_str());
        let shape = PayloadShape::from_content_type(content_type)
            .filter(|shape| accepted.contains(shape))
            .ok_or_else(|| HookError::UnsupportedMediaType(content_type.map(str::to_string)))?;
        Ok(extract_payload(shape, &self.body)?)
    }
}

/// Serializes the event and hands it to the publisher port.
pub(crate) async fn publish(
    state: &AppState,
    settings: &HookSettings,
    event: &CanonicalEvent,
) -> Result<HookOutcome, HookError> {
    let payload = event.to_json_bytes()?;
    state
        .publisher()
        .publish(&settings.exchange, Bytes::from(payload))
        .await?;

    info!(
        stage = "publish",
        route = %settings.route,
        exchange = %settings.exchange,
        repository = %event.repository,
        branch = %event.branch,
        trigger = %event.trigger,
        "event published"
    );
    Ok(HookOutcome::Published)
}

/// Entry point registered for every configured webhook route.
pub async fn handle(
    State(route): State<RouteState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let provider = route.adapter.provider().as_str();
    let settings = route.adapter.settings();
    let request = WebhookRequest {
        method,
        headers,
        body,
    };

    let result = route.adapter.handle(&route.app, &request).await;
    histogram!("webhook_ack_latency_seconds", "provider" => provider)
        .record(start.elapsed().as_secs_f64());

    match result {
        Ok(outcome) => {
            counter!(
                "webhook_requests_total",
                "provider" => provider,
                "outcome" => outcome.metric_label()
            )
            .increment(1);
            if let HookOutcome::Ignored(reason) = outcome {
                info!(stage = "ingress", provider, route = %settings.route, reason, "event acknowledged without publishing");
            }
            plain_text(axum::http::StatusCode::OK)
        }
        Err(err) => {
            counter!(
                "webhook_requests_total",
                "provider" => provider,
                "outcome" => err.metric_label()
            )
            .increment(1);
            match &err {
                HookError::AuthenticationFailed(_) => {
                    counter!("webhook_auth_failures_total", "provider" => provider).increment(1);
                }
                HookError::PublishFailed(_) => {
                    counter!("webhook_publish_failures_total", "provider" => provider)
                        .increment(1);
                }
                _ => {}
            }

            if err.is_server_error() {
                error!(stage = "ingress", provider, route = %settings.route, error = %err, "webhook processing failed");
            } else {
                warn!(stage = "ingress", provider, route = %settings.route, error = %err, "webhook rejected");
            }
            err.into_response()
        }
    }
}
