use webhookd_core::payload::GitlabPush;
use webhookd_core::{decode, Normalizer, PayloadShape};

use super::{publish, HookSettings, WebhookRequest};
use crate::response::{HookError, HookOutcome};
use crate::router::AppState;

const HEADER_EVENT: &str = "X-Gitlab-Event";
const HEADER_TOKEN: &str = "X-Gitlab-Token";
const PUSH_EVENT: &str = "Push Hook";

/// Gitlab push hooks, authenticated by the `X-Gitlab-Token` header.
#[derive(Debug, Clone)]
pub struct GitlabHook {
    pub(super) settings: HookSettings,
}

impl GitlabHook {
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
        if event != PUSH_EVENT {
            return Ok(HookOutcome::Ignored("not a push event"));
        }

        let raw = request.payload(&[PayloadShape::Json])?;
        self.settings
            .secret
            .check_token(request.header(HEADER_TOKEN))?;

        let push: GitlabPush = decode(&raw)?;
        let event = Normalizer::gitlab(&push)?;
        publish(state, &self.settings, &event).await
    }
}
