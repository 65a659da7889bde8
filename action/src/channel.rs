//! Preview channel identity resolution

use tracing::info;

use crate::errors::ActionError;
use crate::github::context::GithubContext;

/// Replace every character outside `[A-Za-z0-9_.-]` with `_`.
///
/// Hosting channel ids accept letters, numbers, underscores, hyphens and
/// periods only. The replacement is idempotent.
pub fn sanitize_channel_id(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Derive the channel id for a preview deploy.
///
/// A non-empty configured id wins. Otherwise the id is seeded from the
/// event context: `pr{number}-{head branch}` for pull requests, or
/// `commit{sha}-{branch}` for pushes. An empty id after sanitization is a
/// configuration error.
///
/// The reserved id `"live"` never reaches this function: the caller
/// switches to production mode before resolving a channel.
pub fn resolve_channel_id(
    configured: &str,
    context: &GithubContext,
) -> Result<String, ActionError> {
    let seed = if !configured.is_empty() {
        configured.to_string()
    } else if let Some(pr) = &context.payload.pull_request {
        let branch: String = pr.head.branch.chars().take(20).collect();
        format!("pr{}-{}", pr.number, branch)
    } else if !context.sha.is_empty() {
        let sha: String = context.sha.chars().take(8).collect();
        let branch = context
            .git_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(&context.git_ref);
        let branch: String = branch.chars().take(20).collect();
        format!("commit{}-{}", sha, branch)
    } else {
        String::new()
    };

    let corrected = sanitize_channel_id(&seed);
    if corrected != seed {
        info!(
            "Channel id \"{}\" contains unsupported characters, using \"{}\" instead",
            seed, corrected
        );
    }

    if corrected.is_empty() {
        return Err(ActionError::ConfigError(
            "channel id is empty: no pull request or commit was found in the \
             current context, provide a channelId input"
                .to_string(),
        ));
    }

    Ok(corrected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::context::{EventPayload, PullRequest, PullRequestHead};

    fn context_with_pr(number: u64, branch: &str) -> GithubContext {
        GithubContext {
            owner: "acme".to_string(),
            repo: "website".to_string(),
            sha: "1234567890abcdef".to_string(),
            git_ref: format!("refs/pull/{}/merge", number),
            event_name: "pull_request".to_string(),
            payload: EventPayload {
                action: None,
                pull_request: Some(PullRequest {
                    number,
                    head: PullRequestHead {
                        branch: branch.to_string(),
                        sha: "fe211ff0123".to_string(),
                    },
                }),
                head_commit: None,
            },
        }
    }

    fn push_context(sha: &str, git_ref: &str) -> GithubContext {
        GithubContext {
            owner: "acme".to_string(),
            repo: "website".to_string(),
            sha: sha.to_string(),
            git_ref: git_ref.to_string(),
            event_name: "push".to_string(),
            payload: EventPayload::default(),
        }
    }

    #[test]
    fn test_configured_id_wins() {
        let context = context_with_pr(3, "some-branch");
        assert_eq!(resolve_channel_id("staging", &context).unwrap(), "staging");
    }

    #[test]
    fn test_configured_id_is_sanitized() {
        let context = push_context("", "");
        assert_eq!(
            resolve_channel_id("my channel/№1", &context).unwrap(),
            "my_channel__1"
        );
    }

    #[test]
    fn test_pr_seed_truncates_branch_to_twenty_chars() {
        let context = context_with_pr(128, "a-very-long-branch-name-that-keeps-going");
        let id = resolve_channel_id("", &context).unwrap();
        assert_eq!(id, "pr128-a-very-long-branch-na");
        assert!(id.len() <= 30);
    }

    #[test]
    fn test_pr_seed_matches_allowed_character_set() {
        let context = context_with_pr(7, "feat/add thing");
        let id = resolve_channel_id("", &context).unwrap();
        assert_eq!(id, "pr7-feat_add_thing");
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || "_.-".contains(c)));
    }

    #[test]
    fn test_push_fallback_strips_heads_prefix() {
        let context = push_context("abcdef1234567890", "refs/heads/release/2024");
        let id = resolve_channel_id("", &context).unwrap();
        assert_eq!(id, "commitabcdef12-release_2024");
    }

    #[test]
    fn test_no_context_is_a_config_error() {
        let context = push_context("", "");
        let err = resolve_channel_id("", &context).unwrap_err();
        assert!(matches!(err, ActionError::ConfigError(_)));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize_channel_id("weird ⚡ name!");
        let twice = sanitize_channel_id(&once);
        assert_eq!(once, twice);
    }
}
