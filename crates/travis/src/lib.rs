//! Client for the Travis CI configuration endpoint that publishes the key used
//! to sign webhook notifications.

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Fetches the webhook signing key from a Travis configuration host.
#[derive(Clone)]
pub struct TravisConfigClient {
    http: Client,
    config_url: Url,
}

impl TravisConfigClient {
    pub fn new(config_url: Url, http: Client) -> Self {
        Self { http, config_url }
    }

    /// Returns the PEM encoded public key advertised under
    /// `config.notifications.webhook.public_key`.
    ///
    /// The key is fetched on every call; callers decide whether to cache it.
    pub async fn fetch_public_key(&self) -> Result<String, TravisError> {
        let response = self
            .http
            .get(self.config_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let config: ConfigResponse = parse_json(response).await?;
        config
            .config
            .notifications
            .webhook
            .public_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(TravisError::MissingKey)
    }
}

/// Errors produced while fetching the signing key.
#[derive(Debug, Error)]
pub enum TravisError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("configuration response carries no webhook public key")]
    MissingKey,
}

#[derive(Debug, Deserialize)]
struct ConfigResponse {
    config: ConfigBody,
}

#[derive(Debug, Deserialize)]
struct ConfigBody {
    #[serde(default)]
    notifications: Notifications,
}

#[derive(Debug, Default, Deserialize)]
struct Notifications {
    #[serde(default)]
    webhook: WebhookConfig,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookConfig {
    #[serde(default)]
    public_key: Option<String>,
}

async fn parse_json<T>(response: Response) -> Result<T, TravisError>
where
    T: serde::de::DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unavailable>"));
        return Err(TravisError::Status { status, body });
    }

    Ok(response.json().await?)
}
