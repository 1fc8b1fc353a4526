//! Shared fixtures for driving the router in tests.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use httpmock::MockServer;
use reqwest::Client;
use tower::ServiceExt;
use url::Url;
use webhookd_bus::InMemoryPublisher;
use webhookd_travis::TravisConfigClient;
use webhookd_util::{HookRoute, ProviderKind};

use crate::router::{app_router, AppState};
use crate::telemetry;

/// Travis host used when a test never expects a key fetch.
const UNUSED_TRAVIS_URL: &str = "http://127.0.0.1:9/config";

pub struct TestApp {
    pub router: Router,
    pub publisher: Arc<InMemoryPublisher>,
}

impl TestApp {
    pub fn new(provider: ProviderKind, path: &str, secret: Option<&str>, exchange: &str) -> Self {
        Self::with_routes(vec![route(provider, path, secret, exchange)])
    }

    pub fn with_routes(routes: Vec<HookRoute>) -> Self {
        Self::build(routes, InMemoryPublisher::new(), UNUSED_TRAVIS_URL)
    }

    pub fn failing(provider: ProviderKind, path: &str, exchange: &str) -> Self {
        Self::build(
            vec![route(provider, path, None, exchange)],
            InMemoryPublisher::failing("broker unavailable"),
            UNUSED_TRAVIS_URL,
        )
    }

    pub fn with_travis(server: &MockServer, path: &str, exchange: &str) -> Self {
        Self::build(
            vec![route(ProviderKind::Travis, path, None, exchange)],
            InMemoryPublisher::new(),
            &server.url("/config"),
        )
    }

    fn build(routes: Vec<HookRoute>, publisher: InMemoryPublisher, travis_url: &str) -> Self {
        let metrics = telemetry::init_metrics().expect("metrics init");
        let publisher = Arc::new(publisher);
        let travis = TravisConfigClient::new(
            Url::parse(travis_url).expect("travis url"),
            Client::builder().build().expect("http client"),
        );
        let state = AppState::new(metrics, publisher.clone(), travis);

        Self {
            router: app_router(state, &routes),
            publisher,
        }
    }

    pub async fn call(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("handler should respond")
    }

    /// Returns the status and the plain-text body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.call(request).await;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should read")
            .to_bytes();
        (status, String::from_utf8(bytes.to_vec()).expect("utf-8"))
    }
}

pub fn route(
    provider: ProviderKind,
    path: &str,
    secret: Option<&str>,
    exchange: &str,
) -> HookRoute {
    HookRoute {
        provider,
        route: path.to_string(),
        secret: secret.map(str::to_string),
        exchange: exchange.to_string(),
    }
}

/// POST request with an optional content type and extra headers.
pub fn request(
    path: &str,
    content_type: Option<&str>,
    headers: &[(&str, &str)],
    body: String,
) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(path);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body)).expect("request")
}

pub fn json_request(path: &str, headers: &[(&str, &str)], body: String) -> Request<Body> {
    request(path, Some("application/json"), headers, body)
}

pub fn form_request(path: &str, headers: &[(&str, &str)], body: String) -> Request<Body> {
    request(
        path,
        Some("application/x-www-form-urlencoded"),
        headers,
        body,
    )
}
