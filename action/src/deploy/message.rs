//! Deploy message resolution

use tracing::info;

/// Hosting rejects deploy messages longer than 255 characters.
const MESSAGE_LIMIT: usize = 255;

/// Resolve the message attached to a deploy.
///
/// `"true"` selects the head commit message, `"false"` and empty input
/// select none, anything else is used verbatim. The result is trimmed and
/// capped at the hosting limit.
pub fn resolve_deploy_message(
    input: Option<&str>,
    head_commit_message: Option<&str>,
) -> Option<String> {
    match input? {
        "" | "false" => None,
        "true" => match head_commit_message {
            Some(message) if !message.trim().is_empty() => Some(cap_message(message)),
            _ => {
                info!("Head commit has no message, skipping the deploy message");
                None
            }
        },
        custom => Some(cap_message(custom)),
    }
}

fn cap_message(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() > MESSAGE_LIMIT {
        info!(
            "Deploy messages are capped at {} characters, truncating",
            MESSAGE_LIMIT
        );
    }
    let capped: String = trimmed.chars().take(MESSAGE_LIMIT).collect();
    capped.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_false_and_empty_select_no_message() {
        assert_eq!(resolve_deploy_message(None, None), None);
        assert_eq!(resolve_deploy_message(Some(""), Some("msg")), None);
        assert_eq!(resolve_deploy_message(Some("false"), Some("msg")), None);
    }

    #[test]
    fn test_true_selects_the_head_commit_message() {
        assert_eq!(
            resolve_deploy_message(Some("true"), Some("fix: typo\n")),
            Some("fix: typo".to_string())
        );
        assert_eq!(resolve_deploy_message(Some("true"), None), None);
        assert_eq!(resolve_deploy_message(Some("true"), Some("   ")), None);
    }

    #[test]
    fn test_custom_message_is_used_verbatim() {
        assert_eq!(
            resolve_deploy_message(Some("release v2"), Some("ignored")),
            Some("release v2".to_string())
        );
    }

    #[test]
    fn test_long_messages_are_capped() {
        let long = "x".repeat(400);
        let resolved = resolve_deploy_message(Some(&long), None).unwrap();
        assert_eq!(resolved.chars().count(), MESSAGE_LIMIT);
    }
}
