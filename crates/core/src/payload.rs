use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;

const FORM_PAYLOAD_FIELD: &str = "payload";

/// Errors raised while extracting or decoding a provider payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is empty")]
    Empty,
    #[error("request body is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid form body: {0}")]
    InvalidForm(#[from] serde_urlencoded::de::Error),
    #[error("failed to decode payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl PayloadError {
    /// `true` when the request simply carried nothing to decode.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Body encodings a provider may deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// The body is the JSON document.
    Json,
    /// `application/x-www-form-urlencoded` with the JSON document in `payload`.
    Form,
}

impl PayloadShape {
    /// Resolves the shape from a `Content-Type` header value.
    ///
    /// Parameters such as `charset` are ignored and the media type is compared
    /// case-insensitively. Unknown media types yield `None`.
    pub fn from_content_type(value: Option<&str>) -> Option<Self> {
        let media_type = value?.split(';').next()?.trim();
        if media_type.eq_ignore_ascii_case("application/json") {
            Some(Self::Json)
        } else if media_type.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
            Some(Self::Form)
        } else {
            None
        }
    }
}

/// Pulls the raw JSON document out of a request body.
pub fn extract_payload(shape: PayloadShape, body: &[u8]) -> Result<String, PayloadError> {
    let raw = match shape {
        PayloadShape::Json => std::str::from_utf8(body)
            .map_err(|_| PayloadError::InvalidUtf8)?
            .to_string(),
        PayloadShape::Form => {
            let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;
            fields
                .into_iter()
                .find(|(name, _)| name == FORM_PAYLOAD_FIELD)
                .map(|(_, value)| value)
                .unwrap_or_default()
        }
    };

    if raw.trim().is_empty() {
        return Err(PayloadError::Empty);
    }
    Ok(raw)
}

/// Structurally decodes a provider document. Unknown fields are ignored.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, PayloadError> {
    Ok(serde_json::from_str(raw)?)
}

/// GitHub `push` event.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubPush {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub repository: GithubRepository,
    #[serde(default)]
    pub head_commit: Option<GithubCommit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubRepository {
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubCommit {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub author: Option<PersonRef>,
}

/// Author/committer block shared by the source-control providers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Gitlab `Push Hook` event.
#[derive(Debug, Clone, Deserialize)]
pub struct GitlabPush {
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub user_username: Option<String>,
    pub project: GitlabProject,
    #[serde(default)]
    pub commits: Vec<PushCommit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitlabProject {
    pub path_with_namespace: String,
}

/// Commit entry of the Gitlab and Gitea `commits` arrays.
#[derive(Debug, Clone, Deserialize)]
pub struct PushCommit {
    pub id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub author: PersonRef,
}

/// Gitea `push` event. The shared secret travels inside the document.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaPush {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub repository: GiteaRepository,
    #[serde(default)]
    pub commits: Vec<PushCommit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaRepository {
    pub name: String,
}

/// Travis CI build notification.
#[derive(Debug, Clone, Deserialize)]
pub struct TravisBuild {
    /// Travis sends a string, but any scalar is tolerated.
    #[serde(default)]
    pub number: Option<serde_json::Value>,
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub status_message: Option<String>,
    pub branch: String,
    pub commit: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    pub repository: TravisRepository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TravisRepository {
    pub name: String,
}

impl TravisBuild {
    /// Only passed builds are forwarded downstream.
    pub fn is_successful(&self) -> bool {
        self.status == Some(0) && self.status_message.as_deref() == Some("Passed")
    }

    /// Build number for log lines; empty when absent.
    pub fn build_number(&self) -> String {
        match &self.number {
            Some(serde_json::Value::String(number)) => number.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

/// Synthetic event accepted by the test hook.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoPayload {
    pub repository: String,
    pub branch: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
