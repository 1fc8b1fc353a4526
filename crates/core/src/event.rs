use std::fmt;

use serde::{Deserialize, Serialize};

/// Schema version stamped on every published event.
pub const MESSAGE_VERSION: &str = "0.0";

/// Commit identifier used by the synthetic test hook, which has no real commit.
pub const DEMO_COMMIT: &str = "cafebabe";

/// Provider-independent record published to the broker for every accepted webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub version: String,
    pub repository: String,
    pub branch: String,
    pub commit: String,
    pub message: String,
    pub author: String,
    pub trigger: String,
}

impl CanonicalEvent {
    /// Builds an event with the process-wide [`MESSAGE_VERSION`].
    pub fn new(
        trigger: Trigger,
        repository: impl Into<String>,
        branch: impl Into<String>,
        commit: impl Into<String>,
        message: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            version: MESSAGE_VERSION.to_string(),
            repository: repository.into(),
            branch: branch.into(),
            commit: commit.into(),
            message: message.into(),
            author: author.into(),
            trigger: trigger.as_str().to_string(),
        }
    }

    /// Serializes the event into the flat JSON wire format.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parses an event from its JSON wire format.
    pub fn from_json_slice(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }
}

/// Fixed label identifying which provider and event kind produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    GithubPush,
    GitlabPush,
    GiteaPush,
    TravisSuccessfulBuild,
    TestWebhook,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GithubPush => "GitHub Push",
            Self::GitlabPush => "Gitlab Push",
            Self::GiteaPush => "Gitea Push",
            Self::TravisSuccessfulBuild => "Travis Successful Build",
            Self::TestWebhook => "Test-Webhook",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the branch name of a ref such as `refs/heads/main`.
///
/// Only the last path segment is kept, so `refs/heads/feature/login` yields
/// `login`. Strings without a slash are returned unchanged.
pub fn branch_from_ref(git_ref: &str) -> &str {
    git_ref.rsplit('/').next().unwrap_or(git_ref)
}
