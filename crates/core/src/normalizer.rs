use thiserror::Error;

use crate::event::{branch_from_ref, CanonicalEvent, Trigger, DEMO_COMMIT};
use crate::payload::{DemoPayload, GiteaPush, GithubPush, GitlabPush, PushCommit, TravisBuild};

/// Errors that can occur while mapping a decoded payload onto a [`CanonicalEvent`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizerError {
    #[error("{0} payload carries no commits")]
    NoCommits(&'static str),
}

/// Deterministic mapping from provider payloads to [`CanonicalEvent`] values.
pub struct Normalizer;

impl Normalizer {
    pub fn github(push: &GithubPush) -> Result<CanonicalEvent, NormalizerError> {
        let head = push
            .head_commit
            .as_ref()
            .ok_or(NormalizerError::NoCommits("github"))?;
        let author = head
            .author
            .as_ref()
            .and_then(|author| author.username.clone().or_else(|| author.name.clone()))
            .unwrap_or_default();

        Ok(CanonicalEvent::new(
            Trigger::GithubPush,
            push.repository.full_name.as_str(),
            branch_from_ref(&push.git_ref),
            head.id.as_str(),
            head.message.clone().unwrap_or_default(),
            author,
        ))
    }

    pub fn gitlab(push: &GitlabPush) -> Result<CanonicalEvent, NormalizerError> {
        let commit = first_commit(&push.commits, "gitlab")?;
        let author = push
            .user_username
            .clone()
            .or_else(|| commit.author.name.clone())
            .unwrap_or_default();

        Ok(CanonicalEvent::new(
            Trigger::GitlabPush,
            push.project.path_with_namespace.as_str(),
            branch_from_ref(&push.git_ref),
            commit.id.as_str(),
            commit.message.clone().unwrap_or_default(),
            author,
        ))
    }

    pub fn gitea(push: &GiteaPush) -> Result<CanonicalEvent, NormalizerError> {
        let commit = first_commit(&push.commits, "gitea")?;

        Ok(CanonicalEvent::new(
            Trigger::GiteaPush,
            push.repository.name.as_str(),
            branch_from_ref(&push.git_ref),
            commit.id.as_str(),
            commit.message.clone().unwrap_or_default(),
            commit.author.username.clone().unwrap_or_default(),
        ))
    }

    /// Callers are expected to apply [`TravisBuild::is_successful`] first.
    pub fn travis(build: &TravisBuild) -> CanonicalEvent {
        CanonicalEvent::new(
            Trigger::TravisSuccessfulBuild,
            build.repository.name.as_str(),
            build.branch.as_str(),
            build.commit.as_str(),
            build.message.clone().unwrap_or_default(),
            build.author_name.clone().unwrap_or_default(),
        )
    }

    pub fn demo(payload: &DemoPayload) -> CanonicalEvent {
        CanonicalEvent::new(
            Trigger::TestWebhook,
            payload.repository.as_str(),
            payload.branch.as_str(),
            DEMO_COMMIT,
            payload.message.clone().unwrap_or_default(),
            payload.author.clone().unwrap_or_default(),
        )
    }
}

fn first_commit<'a>(
    commits: &'a [PushCommit],
    provider: &'static str,
) -> Result<&'a PushCommit, NormalizerError> {
    commits.first().ok_or(NormalizerError::NoCommits(provider))
}
