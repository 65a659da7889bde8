//! Firebase CLI deploy executor

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::process::Command;
use tracing::{info, warn};

use crate::credentials::GacFile;
use crate::deploy::results::{ChannelSuccess, CliResponse, ProductionSuccess};
use crate::errors::ActionError;

/// Environment variable the CLI reads to locate service account credentials
const GAC_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Telemetry attribution for deploys made through this action
const DEPLOY_AGENT_ENV: &str = "FIREBASE_DEPLOY_AGENT";
const DEPLOY_AGENT: &str = "fireview";

/// What is being deployed
#[derive(Debug, Clone, Default)]
pub struct DeployTarget {
    pub project_id: Option<String>,
    /// Named hosting target to scope the deploy to
    pub target: Option<String>,
    pub firebase_tools_version: Option<String>,
}

/// A [`DeployTarget`] plus the channel identity of a preview deploy
#[derive(Debug, Clone)]
pub struct ChannelDeployRequest {
    /// Must already satisfy the channel id character restrictions
    pub channel_id: String,
    pub expires: Option<String>,
}

/// Captured outcome of one CLI invocation
#[derive(Debug, Clone, Default)]
pub struct CliCapture {
    pub stdout: String,
    pub success: bool,
}

/// Seam over subprocess execution, so tests can observe argument vectors
/// without spawning the real CLI.
#[async_trait]
pub trait CliRunner: Send + Sync {
    async fn run(
        &self,
        args: &[String],
        envs: &HashMap<String, String>,
        cwd: &Path,
    ) -> Result<CliCapture, ActionError>;
}

/// Runs firebase-tools through npx, capturing stdout and passing stderr
/// through to the job log.
pub struct ProcessRunner {
    package_spec: String,
}

impl ProcessRunner {
    pub fn for_target(target: &DeployTarget) -> Self {
        let package_spec = match target.firebase_tools_version.as_deref() {
            Some(version) if !version.is_empty() => format!("firebase-tools@{}", version),
            _ => "firebase-tools".to_string(),
        };
        Self { package_spec }
    }
}

#[async_trait]
impl CliRunner for ProcessRunner {
    async fn run(
        &self,
        args: &[String],
        envs: &HashMap<String, String>,
        cwd: &Path,
    ) -> Result<CliCapture, ActionError> {
        let output = Command::new("npx")
            .arg("--yes")
            .arg(&self.package_spec)
            .args(args)
            .envs(envs)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .await
            .map_err(|e| {
                ActionError::TransportError(format!(
                    "failed to spawn {}: {}",
                    self.package_spec, e
                ))
            })?;

        Ok(CliCapture {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            success: output.status.success(),
        })
    }
}

/// Output mode of a CLI attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    /// `--json`: machine readable, parsed by the executor
    Json,
    /// `--debug`: verbose diagnostics for the job log, never parsed
    Debug,
}

impl OutputMode {
    fn flag(self) -> &'static str {
        match self {
            OutputMode::Json => "--json",
            OutputMode::Debug => "--debug",
        }
    }
}

/// Deploy operations against one target, authenticated via a
/// materialized credentials file.
pub struct FirebaseCli<'a> {
    runner: &'a dyn CliRunner,
    gac: &'a GacFile,
    entry_point: PathBuf,
    target: &'a DeployTarget,
}

impl<'a> FirebaseCli<'a> {
    pub fn new(
        runner: &'a dyn CliRunner,
        gac: &'a GacFile,
        entry_point: &Path,
        target: &'a DeployTarget,
    ) -> Self {
        Self {
            runner,
            gac,
            entry_point: entry_point.to_path_buf(),
            target,
        }
    }

    /// Deploy to a preview channel.
    ///
    /// A `status: "error"` response is returned, not raised; only
    /// transport and parse failures error out.
    pub async fn deploy_preview(
        &self,
        request: &ChannelDeployRequest,
    ) -> Result<CliResponse<ChannelSuccess>, ActionError> {
        let mut args = vec!["hosting:channel:deploy".to_string(), request.channel_id.clone()];
        if let Some(target) = self.target.target.as_deref() {
            args.push("--only".to_string());
            args.push(target.to_string());
        }
        if let Some(expires) = request.expires.as_deref() {
            args.push("--expires".to_string());
            args.push(expires.to_string());
        }

        let raw = self.exec_with_credentials(&args).await?;
        parse_response(&raw)
    }

    /// Deploy to the production site.
    pub async fn deploy_production(
        &self,
        message: Option<&str>,
    ) -> Result<CliResponse<ProductionSuccess>, ActionError> {
        let only = match self.target.target.as_deref() {
            Some(target) => format!("hosting:{}", target),
            None => "hosting".to_string(),
        };
        let mut args = vec!["deploy".to_string(), "--only".to_string(), only];
        if let Some(message) = message {
            args.push("--message".to_string());
            args.push(message.to_string());
        }

        let raw = self.exec_with_credentials(&args).await?;
        parse_response(&raw)
    }

    /// Invoke the CLI, retrying exactly once with `--debug` in place of
    /// `--json` when the first attempt fails.
    ///
    /// The retry exists only to surface a readable error in the job log:
    /// its output is logged and never parsed, and the first attempt's
    /// failure is what propagates whatever the retry does.
    pub(crate) async fn exec_with_credentials(
        &self,
        args: &[String],
    ) -> Result<String, ActionError> {
        let failure = match self.attempt(args, OutputMode::Json).await {
            Ok(capture) if capture.success => return Ok(capture.stdout),
            Ok(capture) => {
                if !capture.stdout.is_empty() {
                    info!("{}", capture.stdout);
                }
                ActionError::TransportError(format!(
                    "firebase-tools exited with a failure status running `{}`",
                    args.join(" ")
                ))
            }
            Err(e) => e,
        };

        warn!("{}", failure);
        info!("Retrying the command with the --debug flag for better error output");
        match self.attempt(args, OutputMode::Debug).await {
            Ok(capture) => {
                if !capture.stdout.is_empty() {
                    info!("{}", capture.stdout);
                }
            }
            Err(e) => warn!("Debug retry could not run: {}", e),
        }

        Err(failure)
    }

    async fn attempt(
        &self,
        args: &[String],
        mode: OutputMode,
    ) -> Result<CliCapture, ActionError> {
        let mut argv = args.to_vec();
        if let Some(project) = self.target.project_id.as_deref() {
            argv.push("--project".to_string());
            argv.push(project.to_string());
        }
        argv.push(mode.flag().to_string());

        let envs = HashMap::from([
            (GAC_ENV.to_string(), self.gac.path().display().to_string()),
            (DEPLOY_AGENT_ENV.to_string(), DEPLOY_AGENT.to_string()),
        ]);

        self.runner.run(&argv, &envs, &self.entry_point).await
    }
}

/// Parse the trailing JSON document out of captured CLI output.
///
/// The CLI may print interim progress lines before the final document, so
/// when the whole capture is not valid JSON the parse falls back to the
/// latest line that opens an object.
pub(crate) fn parse_response<T: DeserializeOwned>(raw: &str) -> Result<T, ActionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ActionError::MalformedOutput(
            "firebase-tools produced no output".to_string(),
        ));
    }

    if let Ok(parsed) = serde_json::from_str(trimmed) {
        return Ok(parsed);
    }

    let mut starts = Vec::new();
    let mut offset = 0;
    for line in trimmed.split_inclusive('\n') {
        let lead = line.len() - line.trim_start().len();
        if line.trim_start().starts_with('{') {
            starts.push(offset + lead);
        }
        offset += line.len();
    }
    for &start in starts.iter().rev() {
        if let Ok(parsed) = serde_json::from_str(&trimmed[start..]) {
            return Ok(parsed);
        }
    }

    Err(ActionError::MalformedOutput(format!(
        "could not parse firebase-tools output as JSON: {}",
        truncate_for_log(trimmed)
    )))
}

fn truncate_for_log(raw: &str) -> String {
    const LIMIT: usize = 300;
    if raw.chars().count() <= LIMIT {
        raw.to_string()
    } else {
        let head: String = raw.chars().take(LIMIT).collect();
        format!("{}…", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::results::{ChannelSuccess, CliResponse};
    use secrecy::SecretString;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const SINGLE_SITE_JSON: &str = r#"{
        "status": "success",
        "result": {
            "demo": {
                "site": "demo",
                "url": "https://demo--x.web.app",
                "expireTime": "2020-10-27T21:32:57.233344586Z"
            }
        }
    }"#;

    struct MockRunner {
        calls: Mutex<Vec<(Vec<String>, HashMap<String, String>)>>,
        responses: Mutex<VecDeque<Result<CliCapture, ActionError>>>,
    }

    impl MockRunner {
        fn with_responses(
            responses: Vec<Result<CliCapture, ActionError>>,
        ) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into()),
            }
        }

        fn ok(stdout: &str) -> Result<CliCapture, ActionError> {
            Ok(CliCapture {
                stdout: stdout.to_string(),
                success: true,
            })
        }

        fn failed(stdout: &str) -> Result<CliCapture, ActionError> {
            Ok(CliCapture {
                stdout: stdout.to_string(),
                success: false,
            })
        }

        fn argv(&self, index: usize) -> Vec<String> {
            self.calls.lock().unwrap()[index].0.clone()
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CliRunner for MockRunner {
        async fn run(
            &self,
            args: &[String],
            envs: &HashMap<String, String>,
            _cwd: &Path,
        ) -> Result<CliCapture, ActionError> {
            self.calls
                .lock()
                .unwrap()
                .push((args.to_vec(), envs.clone()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| MockRunner::ok(""))
        }
    }

    fn gac() -> GacFile {
        GacFile::materialize(&SecretString::from("{}".to_string())).unwrap()
    }

    fn target(project: Option<&str>, hosting_target: Option<&str>) -> DeployTarget {
        DeployTarget {
            project_id: project.map(|p| p.to_string()),
            target: hosting_target.map(|t| t.to_string()),
            firebase_tools_version: None,
        }
    }

    #[tokio::test]
    async fn test_preview_deploy_parses_the_output() {
        let runner = MockRunner::with_responses(vec![MockRunner::ok(SINGLE_SITE_JSON)]);
        let gac = gac();
        let target = target(Some("my-project"), None);
        let cli = FirebaseCli::new(&runner, &gac, Path::new("."), &target);

        let request = ChannelDeployRequest {
            channel_id: "my-channel".to_string(),
            expires: None,
        };
        let response = cli.deploy_preview(&request).await.unwrap();
        let CliResponse::Success { result } = response else {
            panic!("expected success");
        };
        assert_eq!(result.urls(), vec!["https://demo--x.web.app"]);

        let argv = runner.argv(0);
        assert_eq!(argv[0], "hosting:channel:deploy");
        assert_eq!(argv[1], "my-channel");
        assert!(argv.contains(&"--project".to_string()));
        assert!(argv.contains(&"my-project".to_string()));
        assert!(argv.contains(&"--json".to_string()));
    }

    #[tokio::test]
    async fn test_preview_deploy_scopes_target_and_expiry() {
        let runner = MockRunner::with_responses(vec![MockRunner::ok(SINGLE_SITE_JSON)]);
        let gac = gac();
        let target = target(Some("my-project"), Some("my-second-site"));
        let cli = FirebaseCli::new(&runner, &gac, Path::new("."), &target);

        let request = ChannelDeployRequest {
            channel_id: "my-channel".to_string(),
            expires: Some("7d".to_string()),
        };
        cli.deploy_preview(&request).await.unwrap();

        let argv = runner.argv(0);
        assert!(argv.contains(&"--only".to_string()));
        assert!(argv.contains(&"my-second-site".to_string()));
        assert!(argv.contains(&"--expires".to_string()));
        assert!(argv.contains(&"7d".to_string()));
    }

    #[tokio::test]
    async fn test_retries_once_with_debug_and_reraises_the_first_failure() {
        let runner = MockRunner::with_responses(vec![
            MockRunner::failed("{\"status\":\"error\",\"error\":\"boom\"}"),
            MockRunner::failed("I am a very long debug output"),
        ]);
        let gac = gac();
        let target = target(Some("my-project"), None);
        let cli = FirebaseCli::new(&runner, &gac, Path::new("."), &target);

        let request = ChannelDeployRequest {
            channel_id: "my-channel".to_string(),
            expires: None,
        };
        let err = cli.deploy_preview(&request).await.unwrap_err();
        assert!(matches!(err, ActionError::TransportError(_)));

        assert_eq!(runner.call_count(), 2);
        let first = runner.argv(0);
        let second = runner.argv(1);
        assert!(first.contains(&"--json".to_string()));
        assert!(!first.contains(&"--debug".to_string()));
        assert!(second.contains(&"--debug".to_string()));
        assert!(!second.contains(&"--json".to_string()));
    }

    #[tokio::test]
    async fn test_debug_output_is_never_parsed_even_when_the_retry_succeeds() {
        let runner = MockRunner::with_responses(vec![
            MockRunner::failed(""),
            MockRunner::ok(SINGLE_SITE_JSON),
        ]);
        let gac = gac();
        let target = target(None, None);
        let cli = FirebaseCli::new(&runner, &gac, Path::new("."), &target);

        let request = ChannelDeployRequest {
            channel_id: "my-channel".to_string(),
            expires: None,
        };
        // The retry produced perfectly valid JSON, but it ran with --debug
        // and its output must not be trusted as data.
        let err = cli.deploy_preview(&request).await.unwrap_err();
        assert!(matches!(err, ActionError::TransportError(_)));
        assert_eq!(runner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_production_deploy_builds_the_hosting_only_flag() {
        let production = r#"{ "status": "success", "result": { "hosting": "sites/demo/versions/1" } }"#;
        let runner = MockRunner::with_responses(vec![MockRunner::ok(production)]);
        let gac = gac();
        let target = target(Some("my-project"), Some("my-second-site"));
        let cli = FirebaseCli::new(&runner, &gac, Path::new("."), &target);

        cli.deploy_production(Some("release v2")).await.unwrap();

        let argv = runner.argv(0);
        assert_eq!(argv[0], "deploy");
        assert!(argv.contains(&"--only".to_string()));
        assert!(argv.contains(&"hosting:my-second-site".to_string()));
        assert!(argv.contains(&"--message".to_string()));
        assert!(argv.contains(&"release v2".to_string()));
    }

    #[tokio::test]
    async fn test_credentials_and_agent_are_passed_through_the_environment() {
        let runner = MockRunner::with_responses(vec![MockRunner::ok(SINGLE_SITE_JSON)]);
        let gac = gac();
        let target = target(None, None);
        let cli = FirebaseCli::new(&runner, &gac, Path::new("."), &target);

        let request = ChannelDeployRequest {
            channel_id: "my-channel".to_string(),
            expires: None,
        };
        cli.deploy_preview(&request).await.unwrap();

        let envs = runner.calls.lock().unwrap()[0].1.clone();
        assert_eq!(
            envs.get(GAC_ENV).map(String::as_str),
            Some(gac.path().display().to_string().as_str())
        );
        assert_eq!(envs.get(DEPLOY_AGENT_ENV).map(String::as_str), Some("fireview"));
    }

    #[tokio::test]
    async fn test_empty_output_is_malformed_not_a_crash() {
        let runner = MockRunner::with_responses(vec![MockRunner::ok("   \n ")]);
        let gac = gac();
        let target = target(None, None);
        let cli = FirebaseCli::new(&runner, &gac, Path::new("."), &target);

        let request = ChannelDeployRequest {
            channel_id: "my-channel".to_string(),
            expires: None,
        };
        let err = cli.deploy_preview(&request).await.unwrap_err();
        assert!(matches!(err, ActionError::MalformedOutput(_)));
    }

    #[test]
    fn test_parse_skips_interim_lines_before_the_document() {
        let raw = format!(
            "i  hosting: preparing upload...\n✔  hosting: release complete\n{}",
            SINGLE_SITE_JSON
        );
        let response: CliResponse<ChannelSuccess> = parse_response(&raw).unwrap();
        assert!(matches!(response, CliResponse::Success { .. }));
    }

    #[test]
    fn test_parse_rejects_non_json_output() {
        let err = parse_response::<CliResponse<ChannelSuccess>>("I am a very long debug output")
            .unwrap_err();
        assert!(matches!(err, ActionError::MalformedOutput(_)));
    }
}
