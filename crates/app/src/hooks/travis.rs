use tracing::info;
use webhookd_core::payload::TravisBuild;
use webhookd_core::verify::verify_rsa_sha1;
use webhookd_core::{decode, Normalizer, PayloadShape, VerifyError};

use super::{publish, HookSettings, WebhookRequest};
use crate::response::{HookError, HookOutcome};
use crate::router::AppState;

const HEADER_SIGNATURE: &str = "Signature";

/// Travis CI build notifications, signed with the key Travis publishes on
/// its configuration endpoint. Only passed builds are forwarded.
#[derive(Debug, Clone)]
pub struct TravisHook {
    pub(super) settings: HookSettings,
}

impl TravisHook {
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
        let signature = request
            .header(HEADER_SIGNATURE)
            .ok_or(VerifyError::MissingSignature)?;
        let public_key = state.travis().fetch_public_key().await?;
        verify_rsa_sha1(&public_key, raw.as_bytes(), signature)?;

        let build: TravisBuild = decode(&raw)?;
        if !build.is_successful() {
            info!(
                stage = "ingress",
                route = %self.settings.route,
                build = %build.build_number(),
                repository = %build.repository.name,
                status = ?build.status_message,
                "ignoring build that did not pass"
            );
            return Ok(HookOutcome::Ignored("build did not pass"));
        }
        publish(state, &self.settings, &Normalizer::travis(&build)).await
    }
}
