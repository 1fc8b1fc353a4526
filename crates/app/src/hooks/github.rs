use webhookd_core::payload::GithubPush;
use webhookd_core::{decode, HmacAlgorithm, Normalizer, PayloadShape};

use super::{publish, HookSettings, WebhookRequest};
use crate::response::{HookError, HookOutcome};
use crate::router::AppState;

const HEADER_EVENT: &str = "X-GitHub-Event";
const HEADER_DELIVERY: &str = "X-GitHub-Delivery";
const HEADER_SIGNATURE: &str = "X-Hub-Signature";
const HEADER_SIGNATURE_256: &str = "X-Hub-Signature-256";
const PUSH_EVENT: &str = "push";

/// GitHub push hooks, authenticated by an HMAC over the raw request body.
#[derive(Debug, Clone)]
pub struct GithubHook {
    pub(super) settings: HookSettings,
}

impl GithubHook {
    pub fn new(settings: HookSettings) -> Self {
        Self { settings }
    }

    pub async fn handle(
        &self,
        state: &AppState,
        request: &WebhookRequest,
    ) -> Result<HookOutcome, HookError> {
        request.ensure_post()?;

        let event = request.required_header(HEADER_EVENT)?;
        request.required_header(HEADER_DELIVERY)?;
        if event != PUSH_EVENT {
            return Ok(HookOutcome::Ignored("not a push event"));
        }

        let raw = request.payload(&[PayloadShape::Json, PayloadShape::Form])?;
        self.verify_signature(request)?;

        let push: GithubPush = decode(&raw)?;
        let event = Normalizer::github(&push)?;
        publish(state, &self.settings, &event).await
    }

    /// Prefers the SHA-256 header when both are present.
    fn verify_signature(&self, request: &WebhookRequest) -> Result<(), HookError> {
        let (signature, algorithm) = match request.header(HEADER_SIGNATURE_256) {
            Some(signature) => (Some(signature), HmacAlgorithm::Sha256),
            None => (request.header(HEADER_SIGNATURE), HmacAlgorithm::Sha1),
        };
        self.settings
            .secret
            .check_hmac(&request.body, signature, algorithm)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use webhookd_core::verify::compute_hmac;
    use webhookd_core::{CanonicalEvent, HmacAlgorithm};
    use webhookd_util::ProviderKind;

    use crate::hooks::testing::{form_request, json_request, TestApp};

    const ROUTE: &str = "/github";
    const SECRET: &str = "hub-secret";

    fn push_body() -> String {
        json!({
            "ref": "refs/heads/feature/x",
            "repository": {"name": "repo", "full_name": "octo/repo"},
            "head_commit": {
                "id": "deadbeef",
                "message": "add feature",
                "author": {"name": "Octo Cat", "username": "octocat"}
            }
        })
        .to_string()
    }

    fn signature(body: &[u8], algorithm: HmacAlgorithm) -> String {
        let digest = compute_hmac(SECRET.as_bytes(), body, algorithm).expect("hmac");
        format!("{}{}", algorithm.prefix(), hex::encode(digest))
    }

    fn headers<'a>(event: &'a str, extra: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut headers = vec![("X-GitHub-Event", event), ("X-GitHub-Delivery", "72d3162e")];
        headers.extend_from_slice(extra);
        headers
    }

    #[tokio::test]
    async fn signed_push_is_published() {
        let app = TestApp::new(ProviderKind::Github, ROUTE, Some(SECRET), "pushes");
        let body = push_body();
        let sig = signature(body.as_bytes(), HmacAlgorithm::Sha256);

        let request = json_request(
            ROUTE,
            &headers("push", &[("X-Hub-Signature-256", sig.as_str())]),
            body,
        );
        let (status, text) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "OK\n");

        let published = app.publisher.published().await;
        assert_eq!(published.len(), 1);
        let event = CanonicalEvent::from_json_slice(&published[0].payload).expect("event");
        assert_eq!(event.repository, "octo/repo");
        assert_eq!(event.branch, "x");
        assert_eq!(event.commit, "deadbeef");
        assert_eq!(event.author, "octocat");
        assert_eq!(event.trigger, "GitHub Push");
    }

    #[tokio::test]
    async fn legacy_sha1_signature_is_accepted() {
        let app = TestApp::new(ProviderKind::Github, ROUTE, Some(SECRET), "pushes");
        let body = push_body();
        let sig = signature(body.as_bytes(), HmacAlgorithm::Sha1);

        let request = json_request(
            ROUTE,
            &headers("push", &[("X-Hub-Signature", sig.as_str())]),
            body,
        );
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn form_body_is_signed_over_raw_bytes() {
        let app = TestApp::new(ProviderKind::Github, ROUTE, Some(SECRET), "pushes");
        let encoded = serde_urlencoded::to_string([("payload", push_body())]).expect("form");
        let sig = signature(encoded.as_bytes(), HmacAlgorithm::Sha1);

        let request = form_request(
            ROUTE,
            &headers("push", &[("X-Hub-Signature", sig.as_str())]),
            encoded,
        );
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.publisher.published().await.len(), 1);
    }

    #[tokio::test]
    async fn tampered_body_is_rejected() {
        let app = TestApp::new(ProviderKind::Github, ROUTE, Some(SECRET), "pushes");
        let sig = signature(push_body().as_bytes(), HmacAlgorithm::Sha256);
        let tampered = push_body().replace("deadbeef", "deadbeee");

        let request = json_request(
            ROUTE,
            &headers("push", &[("X-Hub-Signature-256", sig.as_str())]),
            tampered,
        );
        let (status, text) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(text, "Bad Request\n");
        assert!(app.publisher.published().await.is_empty());
    }

    #[tokio::test]
    async fn missing_signature_is_rejected_when_secret_configured() {
        let app = TestApp::new(ProviderKind::Github, ROUTE, Some(SECRET), "pushes");
        let (status, _) = app
            .send(json_request(ROUTE, &headers("push", &[]), push_body()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ping_event_is_ignored() {
        let app = TestApp::new(ProviderKind::Github, ROUTE, Some(SECRET), "pushes");
        let request = json_request(ROUTE, &headers("ping", &[]), r#"{"zen":"hi"}"#.into());

        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(app.publisher.published().await.is_empty());
    }

    #[tokio::test]
    async fn missing_delivery_header_is_bad_request() {
        let app = TestApp::new(ProviderKind::Github, ROUTE, None, "pushes");
        let request = json_request(ROUTE, &[("X-GitHub-Event", "push")], push_body());
        let (status, _) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unsupported_content_type_is_rejected() {
        let app = TestApp::new(ProviderKind::Github, ROUTE, None, "pushes");
        let request = crate::hooks::testing::request(
            ROUTE,
            Some("text/plain"),
            &headers("push", &[]),
            push_body(),
        );
        let (status, text) = app.send(request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(text, "Unsupported Media Type\n");
    }

    #[tokio::test]
    async fn deleted_branch_without_head_commit_is_bad_request() {
        let app = TestApp::new(ProviderKind::Github, ROUTE, None, "pushes");
        let body = json!({
            "ref": "refs/heads/gone",
            "repository": {"full_name": "octo/repo"},
            "head_commit": null
        })
        .to_string();
        let (status, _) = app
            .send(json_request(ROUTE, &headers("push", &[]), body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
