//! Action configuration options

use std::env;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::errors::ActionError;

/// Reserved channel id meaning "deploy to the production site".
///
/// This is a caller-level switch, not a channel name: when the configured
/// channel id equals this value the channel resolver is never consulted and
/// the deploy goes to the permanent hosting destination.
pub const LIVE_CHANNEL: &str = "live";

/// Main configuration for one action run, read once at startup and passed
/// by reference into the pipeline.
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Firebase project to deploy to (id or `.firebaserc` alias)
    pub project_id: Option<String>,

    /// Named hosting target to scope the deploy to
    pub target: Option<String>,

    /// Channel TTL expression, e.g. "7d"
    pub expires: Option<String>,

    /// Configured channel id; empty means "derive from the event context"
    pub channel_id: String,

    /// Service account JSON (or a path to it) used by the Firebase CLI
    pub firebase_service_account: SecretString,

    /// GitHub API token for check runs and PR comments
    pub repo_token: Option<SecretString>,

    /// Pinned firebase-tools version
    pub firebase_tools_version: Option<String>,

    /// Directory containing firebase.json
    pub entry_point: PathBuf,

    /// Deploy message input: "true" (head commit message), "false"/empty
    /// (none) or a verbatim message
    pub commit_message: Option<String>,

    /// Remove the preview channel when the pull request closes
    pub remove_channel_on_close: bool,

    /// Keep at most this many preview channels after a deploy
    pub channel_retention: Option<usize>,
}

impl AppOptions {
    /// Read the options from the Actions environment (`INPUT_*` variables).
    pub fn from_env() -> Result<Self, ActionError> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ActionError> {
        let firebase_service_account = input(lookup, "firebaseServiceAccount")
            .map(SecretString::from)
            .ok_or_else(|| {
                ActionError::ConfigError(
                    "missing required input: firebaseServiceAccount".to_string(),
                )
            })?;

        let repo_token = lookup("GITHUB_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .or_else(|| input(lookup, "repoToken"))
            .map(SecretString::from);

        let channel_retention = match input(lookup, "channelRetention") {
            Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
                ActionError::ConfigError(format!(
                    "channelRetention must be a non-negative integer, got \"{}\"",
                    raw
                ))
            })?),
            None => None,
        };

        Ok(Self {
            project_id: input(lookup, "projectId"),
            target: input(lookup, "target"),
            expires: input(lookup, "expires"),
            channel_id: input(lookup, "channelId").unwrap_or_default(),
            firebase_service_account,
            repo_token,
            firebase_tools_version: input(lookup, "firebaseToolsVersion"),
            entry_point: PathBuf::from(input(lookup, "entryPoint").unwrap_or_else(|| ".".to_string())),
            commit_message: input(lookup, "commitMessage"),
            remove_channel_on_close: bool_input(lookup, "removeChannelOnClose"),
            channel_retention,
        })
    }

    /// Whether the configured channel id selects production mode.
    pub fn is_production_deploy(&self) -> bool {
        self.channel_id == LIVE_CHANNEL
    }
}

fn input(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    let key = format!("INPUT_{}", name.replace(' ', "_").to_uppercase());
    lookup(&key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn bool_input(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> bool {
    matches!(
        input(lookup, name).map(|v| v.to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_parses_full_input_set() {
        let lookup = lookup_from(&[
            ("INPUT_FIREBASESERVICEACCOUNT", "{\"type\":\"service_account\"}"),
            ("INPUT_PROJECTID", "my-project"),
            ("INPUT_TARGET", "my-site"),
            ("INPUT_EXPIRES", "7d"),
            ("INPUT_CHANNELID", "staging"),
            ("INPUT_FIREBASETOOLSVERSION", "13.0.0"),
            ("INPUT_ENTRYPOINT", "./site"),
            ("INPUT_REMOVECHANNELONCLOSE", "true"),
            ("INPUT_CHANNELRETENTION", "5"),
            ("GITHUB_TOKEN", "gh-token"),
        ]);

        let options = AppOptions::from_lookup(&lookup).unwrap();
        assert_eq!(options.project_id.as_deref(), Some("my-project"));
        assert_eq!(options.target.as_deref(), Some("my-site"));
        assert_eq!(options.expires.as_deref(), Some("7d"));
        assert_eq!(options.channel_id, "staging");
        assert_eq!(options.firebase_tools_version.as_deref(), Some("13.0.0"));
        assert_eq!(options.entry_point, PathBuf::from("./site"));
        assert!(options.remove_channel_on_close);
        assert_eq!(options.channel_retention, Some(5));
        assert!(options.repo_token.is_some());
        assert!(!options.is_production_deploy());
    }

    #[test]
    fn test_defaults_for_optional_inputs() {
        let lookup = lookup_from(&[("INPUT_FIREBASESERVICEACCOUNT", "{}")]);

        let options = AppOptions::from_lookup(&lookup).unwrap();
        assert_eq!(options.project_id, None);
        assert_eq!(options.channel_id, "");
        assert_eq!(options.entry_point, PathBuf::from("."));
        assert!(!options.remove_channel_on_close);
        assert_eq!(options.channel_retention, None);
        assert!(options.repo_token.is_none());
    }

    #[test]
    fn test_missing_service_account_is_a_config_error() {
        let lookup = lookup_from(&[("INPUT_PROJECTID", "my-project")]);
        let err = AppOptions::from_lookup(&lookup).unwrap_err();
        assert!(matches!(err, ActionError::ConfigError(_)));
    }

    #[test]
    fn test_live_channel_selects_production_mode() {
        let lookup = lookup_from(&[
            ("INPUT_FIREBASESERVICEACCOUNT", "{}"),
            ("INPUT_CHANNELID", "live"),
        ]);
        let options = AppOptions::from_lookup(&lookup).unwrap();
        assert!(options.is_production_deploy());
    }

    #[test]
    fn test_invalid_retention_is_a_config_error() {
        let lookup = lookup_from(&[
            ("INPUT_FIREBASESERVICEACCOUNT", "{}"),
            ("INPUT_CHANNELRETENTION", "many"),
        ]);
        let err = AppOptions::from_lookup(&lookup).unwrap_err();
        assert!(matches!(err, ActionError::ConfigError(_)));
    }

    #[test]
    fn test_falls_back_to_repo_token_input() {
        let lookup = lookup_from(&[
            ("INPUT_FIREBASESERVICEACCOUNT", "{}"),
            ("INPUT_REPOTOKEN", "input-token"),
        ]);
        let options = AppOptions::from_lookup(&lookup).unwrap();
        assert!(options.repo_token.is_some());
    }
}
