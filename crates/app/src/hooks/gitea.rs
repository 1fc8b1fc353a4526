use webhookd_core::payload::GiteaPush;
use webhookd_core::verify::verify_hmac_signature;
use webhookd_core::{decode, HmacAlgorithm, Normalizer, PayloadShape, SecretPolicy};

use super::{publish, HookSettings, WebhookRequest};
use crate::response::{HookError, HookOutcome};
use crate::router::AppState;

const HEADER_EVENT: &str = "X-Gitea-Event";
const HEADER_SIGNATURE: &str = "X-Gitea-Signature";
const PUSH_EVENT: &str = "push";

/// Gitea push hooks. The shared secret travels inside the payload; newer
/// servers also sign the body with `X-Gitea-Signature`.
#[derive(Debug, Clone)]
pub struct GiteaHook {
    pub(super) settings: HookSettings,
}

impl GiteaHook {
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

        let raw = request.payload(&[PayloadShape::Json, PayloadShape::Form])?;
        let push: GiteaPush = decode(&raw)?;
        self.verify(request, &push)?;

        let event = Normalizer::gitea(&push)?;
        publish(state, &self.settings, &event).await
    }

    fn verify(&self, request: &WebhookRequest, push: &GiteaPush) -> Result<(), HookError> {
        let SecretPolicy::Required(secret) = &self.settings.secret else {
            return Ok(());
        };

        match request.header(HEADER_SIGNATURE) {
            // Gitea sends the bare hex digest without an algorithm prefix.
            Some(signature) => {
                let prefixed = format!("{}{}", HmacAlgorithm::Sha256.prefix(), signature);
                verify_hmac_signature(
                    secret.as_bytes(),
                    &request.body,
                    &prefixed,
                    HmacAlgorithm::Sha256,
                )?;
            }
            None => self.settings.secret.check_token(push.secret.as_deref())?,
        }
        Ok(())
    }
}
