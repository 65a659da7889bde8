//! Check run reporting

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::errors::ActionError;
use crate::github::client::GithubClient;
use crate::github::context::GithubContext;

const CHECK_NAME: &str = "Deploy Preview";

/// Conclusion of a completed check run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckConclusion {
    Success,
    Failure,
    Skipped,
}

impl CheckConclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckConclusion::Success => "success",
            CheckConclusion::Failure => "failure",
            CheckConclusion::Skipped => "skipped",
        }
    }
}

/// Final report for a run, shared by the check run and the job log
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub conclusion: CheckConclusion,
    pub title: String,
    pub summary: String,
    pub details_url: Option<String>,
}

impl CheckOutcome {
    pub fn success(title: &str, summary: String, details_url: Option<String>) -> Self {
        Self {
            conclusion: CheckConclusion::Success,
            title: title.to_string(),
            summary,
            details_url,
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            conclusion: CheckConclusion::Failure,
            title: "Deploy preview failed".to_string(),
            summary: format!("Error: {}", message),
            details_url: None,
        }
    }

    pub fn skipped(title: &str, summary: String) -> Self {
        Self {
            conclusion: CheckConclusion::Skipped,
            title: title.to_string(),
            summary,
            details_url: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckRunResponse {
    id: u64,
}

impl GithubClient {
    /// Create a pending check run for the head commit, returning its id.
    pub async fn create_check_run(
        &self,
        owner: &str,
        repo: &str,
        head_sha: &str,
    ) -> Result<u64, ActionError> {
        let path = format!("/repos/{}/{}/check-runs", owner, repo);
        let body = json!({
            "name": CHECK_NAME,
            "head_sha": head_sha,
            "status": "in_progress",
        });
        let response: CheckRunResponse = self.post(&path, &body).await?;
        Ok(response.id)
    }

    /// Complete a check run with its conclusion and summary.
    pub async fn complete_check_run(
        &self,
        owner: &str,
        repo: &str,
        check_run_id: u64,
        outcome: &CheckOutcome,
    ) -> Result<(), ActionError> {
        let path = format!("/repos/{}/{}/check-runs/{}", owner, repo, check_run_id);
        let mut body = json!({
            "status": "completed",
            "completed_at": Utc::now().to_rfc3339(),
            "conclusion": outcome.conclusion.as_str(),
            "output": {
                "title": outcome.title,
                "summary": outcome.summary,
            },
        });
        if let Some(url) = &outcome.details_url {
            body["details_url"] = json!(url);
        }
        let _: serde_json::Value = self.patch(&path, &body).await?;
        Ok(())
    }
}

/// Reports the run outcome, through a check run when one could be created
/// and through the job log otherwise.
pub struct CheckReporter<'a> {
    client: Option<&'a GithubClient>,
    owner: String,
    repo: String,
    check_run_id: Option<u64>,
}

impl<'a> CheckReporter<'a> {
    /// Create the pending check when a client is available and the run was
    /// triggered by a pull request; reporting failures never abort a run.
    pub async fn start(client: Option<&'a GithubClient>, context: &GithubContext) -> Self {
        let mut check_run_id = None;
        if let Some(client) = client {
            if context.is_pull_request() {
                match client
                    .create_check_run(&context.owner, &context.repo, context.head_sha())
                    .await
                {
                    Ok(id) => check_run_id = Some(id),
                    Err(e) => error!("Could not create the check run: {}", e),
                }
            }
        }
        Self {
            client,
            owner: context.owner.clone(),
            repo: context.repo.clone(),
            check_run_id,
        }
    }

    pub async fn finish(&self, outcome: &CheckOutcome) {
        info!(
            "{}: {} ({})",
            outcome.conclusion.as_str(),
            outcome.title,
            outcome.summary
        );
        if let (Some(client), Some(id)) = (self.client, self.check_run_id) {
            if let Err(e) = client
                .complete_check_run(&self.owner, &self.repo, id, outcome)
                .await
            {
                error!("Could not complete the check run: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conclusion_wire_values() {
        assert_eq!(CheckConclusion::Success.as_str(), "success");
        assert_eq!(CheckConclusion::Failure.as_str(), "failure");
        assert_eq!(CheckConclusion::Skipped.as_str(), "skipped");
    }

    #[test]
    fn test_failure_outcome_echoes_the_error() {
        let outcome = CheckOutcome::failure("channel id is empty");
        assert_eq!(outcome.conclusion, CheckConclusion::Failure);
        assert_eq!(outcome.summary, "Error: channel id is empty");
        assert_eq!(outcome.details_url, None);
    }
}
