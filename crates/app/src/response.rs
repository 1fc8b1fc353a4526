use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use webhookd_bus::PublishError;
use webhookd_core::{NormalizerError, PayloadError, VerifyError};
use webhookd_travis::TravisError;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Successful outcome of a webhook request. Both variants answer `200 OK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Published,
    /// The request was valid but not worth forwarding.
    Ignored(&'static str),
}

impl HookOutcome {
    pub fn metric_label(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Ignored(_) => "ignored",
        }
    }
}

/// Why a request failed authentication.
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error(transparent)]
    Signature(#[from] VerifyError),
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(#[from] TravisError),
}

/// Gate failures of the webhook pipeline.
///
/// Detail stays in logs; callers only see the status line text.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),
    #[error("unsupported content type {0:?}")]
    UnsupportedMediaType(Option<String>),
    #[error("missing header {0}")]
    MissingHeader(&'static str),
    #[error("empty payload")]
    EmptyPayload,
    #[error("authentication failed: {0}")]
    AuthenticationFailed(#[from] AuthFailure),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to publish event: {0}")]
    PublishFailed(#[from] PublishError),
}

impl HookError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::MissingHeader(_)
            | Self::EmptyPayload
            | Self::AuthenticationFailed(_)
            | Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            Self::Encode(_) | Self::PublishFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::UnsupportedMediaType(_) => "unsupported_media_type",
            Self::MissingHeader(_) => "missing_header",
            Self::EmptyPayload => "empty_payload",
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::Encode(_) => "encode_failed",
            Self::PublishFailed(_) => "publish_failed",
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl From<VerifyError> for HookError {
    fn from(err: VerifyError) -> Self {
        Self::AuthenticationFailed(AuthFailure::Signature(err))
    }
}

impl From<TravisError> for HookError {
    fn from(err: TravisError) -> Self {
        Self::AuthenticationFailed(AuthFailure::KeyUnavailable(err))
    }
}

impl From<PayloadError> for HookError {
    fn from(err: PayloadError) -> Self {
        if err.is_empty() {
            Self::EmptyPayload
        } else {
            Self::MalformedPayload(err.to_string())
        }
    }
}

impl From<NormalizerError> for HookError {
    fn from(err: NormalizerError) -> Self {
        Self::MalformedPayload(err.to_string())
    }
}

impl IntoResponse for HookError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = plain_text(status);
        if matches!(self, Self::MethodNotAllowed(_)) {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}

/// Plain-text response whose body is the status reason phrase.
pub fn plain_text(status: StatusCode) -> Response {
    let body = format!("{}\n", status.canonical_reason().unwrap_or("Error"));
    let mut response = (status, body).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    response
}
