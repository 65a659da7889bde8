//! Status comment composition and recognition

use chrono::{DateTime, Utc};

use crate::deploy::results::ChannelSuccess;
use crate::github::comments::IssueComment;
use crate::report::signature::create_deploy_signature;

/// Fixed product marker embedded in every comment the action writes.
/// Recognition matches on this marker, not on the per-deploy signature,
/// so a prior comment is found and updated even when the deploy changed.
pub const BOT_SIGNATURE: &str = "<sub>🔥 Deployed with fireview 🌎</sub>";

/// Markdown for the preview URL(s): a bare link for one site, a bulleted
/// list for several.
pub fn urls_markdown(result: &ChannelSuccess) -> String {
    let urls = result.urls();
    if urls.len() == 1 {
        format!("[{0}]({0})", urls[0])
    } else {
        urls.iter()
            .map(|url| format!("- [{0}]({0})", url))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Render an ISO-8601 expiry as e.g. `Tue, 27 Oct 2020 21:32:57 GMT`.
fn format_expire_time(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Compose the PR comment for a successful channel deploy.
pub fn channel_deploy_success_comment(result: &ChannelSuccess, commit: &str) -> String {
    let signature = create_deploy_signature(result);
    let url_list = urls_markdown(result);
    let expires = result
        .expire_time()
        .map(format_expire_time)
        .unwrap_or_default();

    format!(
        "Visit the preview URL for this PR (updated for commit {commit}):\n\
         \n\
         {url_list}\n\
         \n\
         <sub>(expires {expires})</sub>\n\
         \n\
         {BOT_SIGNATURE}\n\
         \n\
         <sub>Sign: {signature}</sub>"
    )
}

/// Whether a comment was written by this action: authored by a bot account
/// and carrying the product marker.
pub fn is_comment_from_bot(comment: &IssueComment) -> bool {
    comment.user.kind == "Bot" && comment.body.contains(BOT_SIGNATURE)
}
