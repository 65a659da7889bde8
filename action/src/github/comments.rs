//! Issue comment API and idempotent comment upsert

use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::errors::ActionError;
use crate::github::client::GithubClient;

/// Author of an issue comment
#[derive(Debug, Clone, Deserialize)]
pub struct CommentAuthor {
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// One issue comment
#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: String,
    pub user: CommentAuthor,
}

impl GithubClient {
    pub async fn list_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
    ) -> Result<Vec<IssueComment>, ActionError> {
        let path = format!(
            "/repos/{}/{}/issues/{}/comments?per_page=100",
            owner, repo, issue_number
        );
        self.get(&path).await
    }

    pub async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<(), ActionError> {
        let path = format!("/repos/{}/{}/issues/{}/comments", owner, repo, issue_number);
        let _: serde_json::Value = self.post(&path, &json!({ "body": body })).await?;
        Ok(())
    }

    pub async fn update_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<(), ActionError> {
        let path = format!("/repos/{}/{}/issues/comments/{}", owner, repo, comment_id);
        let _: serde_json::Value = self.patch(&path, &json!({ "body": body })).await?;
        Ok(())
    }
}

/// Newest comment matching the predicate, if any.
fn find_existing_comment<F>(comments: &[IssueComment], is_own_comment: F) -> Option<u64>
where
    F: Fn(&IssueComment) -> bool,
{
    comments
        .iter()
        .rev()
        .find(|comment| is_own_comment(comment))
        .map(|comment| comment.id)
}

/// Update the action's prior comment in place, or create a new one.
///
/// Every failure around the upsert is logged and swallowed: a missing
/// comment must never fail an otherwise successful deploy.
pub async fn post_or_update_comment<F>(
    client: &GithubClient,
    owner: &str,
    repo: &str,
    issue_number: u64,
    body: &str,
    is_own_comment: F,
) where
    F: Fn(&IssueComment) -> bool,
{
    let mut comment_id = match client.list_issue_comments(owner, repo, issue_number).await {
        Ok(comments) => find_existing_comment(&comments, is_own_comment),
        Err(e) => {
            warn!("Error checking for previous comments: {}", e);
            None
        }
    };

    if let Some(id) = comment_id {
        if let Err(e) = client.update_issue_comment(owner, repo, id, body).await {
            warn!("Could not update comment {}, creating a new one: {}", id, e);
            comment_id = None;
        }
    }

    if comment_id.is_none() {
        if let Err(e) = client
            .create_issue_comment(owner, repo, issue_number, body)
            .await
        {
            warn!("Error creating comment: {}", e);
        }
    }
}
