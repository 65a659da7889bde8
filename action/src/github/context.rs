//! CI event context for the triggering workflow run

use std::env;
use std::fs;

use serde::Deserialize;

use crate::errors::ActionError;

/// Head ref of a pull request
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestHead {
    #[serde(rename = "ref")]
    pub branch: String,
    pub sha: String,
}

/// Pull request slice of the event payload
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub head: PullRequestHead,
}

/// Head commit slice of a push event payload
#[derive(Debug, Clone, Deserialize)]
pub struct HeadCommit {
    #[serde(default)]
    pub message: Option<String>,
}

/// Webhook event payload, reduced to the fields the pipeline consumes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub pull_request: Option<PullRequest>,
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,
}

/// Context of the workflow run that triggered this action
#[derive(Debug, Clone)]
pub struct GithubContext {
    pub owner: String,
    pub repo: String,
    pub sha: String,
    pub git_ref: String,
    pub event_name: String,
    pub payload: EventPayload,
}

impl GithubContext {
    /// Build the context from the standard `GITHUB_*` environment, reading
    /// the event payload from `GITHUB_EVENT_PATH` when present.
    pub fn from_env() -> Result<Self, ActionError> {
        let payload_json = match env::var("GITHUB_EVENT_PATH") {
            Ok(path) if !path.is_empty() => Some(fs::read_to_string(path)?),
            _ => None,
        };
        Self::from_parts(&|key| env::var(key).ok(), payload_json.as_deref())
    }

    pub fn from_parts(
        lookup: &dyn Fn(&str) -> Option<String>,
        payload_json: Option<&str>,
    ) -> Result<Self, ActionError> {
        let repository = lookup("GITHUB_REPOSITORY").unwrap_or_default();
        let (owner, repo) = repository
            .split_once('/')
            .map(|(o, r)| (o.to_string(), r.to_string()))
            .unwrap_or((repository, String::new()));

        let payload = match payload_json {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)?,
            _ => EventPayload::default(),
        };

        Ok(Self {
            owner,
            repo,
            sha: lookup("GITHUB_SHA").unwrap_or_default(),
            git_ref: lookup("GITHUB_REF").unwrap_or_default(),
            event_name: lookup("GITHUB_EVENT_NAME").unwrap_or_default(),
            payload,
        })
    }

    pub fn is_pull_request(&self) -> bool {
        self.payload.pull_request.is_some()
    }

    /// Whether this run was triggered by a pull request being closed.
    pub fn is_closed_pull_request(&self) -> bool {
        self.is_pull_request() && self.payload.action.as_deref() == Some("closed")
    }

    pub fn issue_number(&self) -> Option<u64> {
        self.payload.pull_request.as_ref().map(|pr| pr.number)
    }

    /// SHA of the commit being deployed: the PR head when present,
    /// otherwise the workflow SHA.
    pub fn head_sha(&self) -> &str {
        self.payload
            .pull_request
            .as_ref()
            .map(|pr| pr.head.sha.as_str())
            .unwrap_or(&self.sha)
    }

    pub fn short_head_sha(&self) -> String {
        self.head_sha().chars().take(7).collect()
    }

    pub fn head_commit_message(&self) -> Option<&str> {
        self.payload
            .head_commit
            .as_ref()
            .and_then(|c| c.message.as_deref())
    }
}
