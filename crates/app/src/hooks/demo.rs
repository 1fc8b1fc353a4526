use webhookd_core::payload::DemoPayload;
use webhookd_core::{decode, Normalizer, PayloadShape};

use super::{publish, HookSettings, WebhookRequest};
use crate::response::{HookError, HookOutcome};
use crate::router::AppState;

const HEADER_TOKEN: &str = "X-Webhook-Token";

/// Synthetic hook for exercising the pipeline end to end.
#[derive(Debug, Clone)]
pub struct DemoHook {
    pub(super) settings: HookSettings,
}

impl DemoHook {
    pub fn new(settings: HookSettings) -> Self {
        Self { settings }
    }

    pub async fn handle(
        &self,
        state: &AppState,
        request: &WebhookRequest,
    ) -> Result<HookOutcome, HookError> {
        request.ensure_post()?;

        let raw = request.payload(&[PayloadShape::Form])?;
        self.settings
            .secret
            .check_token(request.header(HEADER_TOKEN))?;

        let payload: DemoPayload = decode(&raw)?;
        publish(state, &self.settings, &Normalizer::demo(&payload)).await
    }
}
