//! Main run pipeline

use tracing::{error, info};

use crate::app::options::AppOptions;
use crate::channel::resolve_channel_id;
use crate::credentials::GacFile;
use crate::deploy::cleanup;
use crate::deploy::executor::{ChannelDeployRequest, DeployTarget, FirebaseCli, ProcessRunner};
use crate::deploy::message::resolve_deploy_message;
use crate::deploy::results::{ChannelSuccess, CliResponse};
use crate::errors::ActionError;
use crate::github::checks::{CheckOutcome, CheckReporter};
use crate::github::client::GithubClient;
use crate::github::comments::post_or_update_comment;
use crate::github::context::GithubContext;
use crate::logs::{end_group, set_failed, start_group};
use crate::manifest::{ensure_entry_point, project_id_from_alias};
use crate::report::comment::{channel_deploy_success_comment, is_comment_from_bot, urls_markdown};
use crate::report::outputs::set_output;

/// Run one deploy end to end and report the outcome.
///
/// The pipeline is linear: resolve the channel, deploy, then either sign
/// and publish the result or report the failure. The only retry lives
/// inside the deploy executor.
pub async fn run(options: AppOptions, context: GithubContext) -> Result<(), ActionError> {
    let github = match &options.repo_token {
        Some(token) => Some(GithubClient::new(
            &GithubClient::base_url_from_env(),
            token.clone(),
        )?),
        None => None,
    };

    let reporter = CheckReporter::start(github.as_ref(), &context).await;

    match execute(&options, &context, github.as_ref()).await {
        Ok(outcome) => {
            reporter.finish(&outcome).await;
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            set_failed(&e.to_string());
            reporter.finish(&CheckOutcome::failure(&e.to_string())).await;
            Err(e)
        }
    }
}

async fn execute(
    options: &AppOptions,
    context: &GithubContext,
    github: Option<&GithubClient>,
) -> Result<CheckOutcome, ActionError> {
    start_group("Setting up CLI credentials");
    ensure_entry_point(&options.entry_point)?;
    let gac = GacFile::materialize(&options.firebase_service_account)?;
    end_group();

    // A projectId input may name a `.firebaserc` alias; with no input at
    // all the default alias decides.
    let project_id = match options.project_id.as_deref() {
        Some(configured) => Some(
            project_id_from_alias(&options.entry_point, configured)
                .unwrap_or_else(|| configured.to_string()),
        ),
        None => project_id_from_alias(&options.entry_point, "default"),
    };

    let target = DeployTarget {
        project_id,
        target: options.target.clone(),
        firebase_tools_version: options.firebase_tools_version.clone(),
    };
    let runner = ProcessRunner::for_target(&target);
    let cli = FirebaseCli::new(&runner, &gac, &options.entry_point, &target);

    if context.is_closed_pull_request() && !options.is_production_deploy() {
        return close_pull_request(options, context, &cli).await;
    }

    if options.is_production_deploy() {
        return deploy_production(options, context, &target, &cli).await;
    }

    deploy_preview(options, context, github, &cli).await
}

async fn close_pull_request(
    options: &AppOptions,
    context: &GithubContext,
    cli: &FirebaseCli<'_>,
) -> Result<CheckOutcome, ActionError> {
    if !options.remove_channel_on_close {
        info!("Pull request closed, nothing to deploy");
        return Ok(CheckOutcome::skipped(
            "Nothing to deploy",
            "The pull request was closed.".to_string(),
        ));
    }

    let channel_id = resolve_channel_id(&options.channel_id, context)?;
    start_group(&format!("Removing preview channel {}", channel_id));
    // Best effort: an already-expired channel must not fail the job.
    if let Err(e) = cleanup::remove_channel(cli, &channel_id).await {
        info!("Could not remove preview channel {}: {}", channel_id, e);
    }
    end_group();

    Ok(CheckOutcome::skipped(
        "Preview channel removed",
        format!("Removed preview channel `{}`.", channel_id),
    ))
}

async fn deploy_production(
    options: &AppOptions,
    context: &GithubContext,
    target: &DeployTarget,
    cli: &FirebaseCli<'_>,
) -> Result<CheckOutcome, ActionError> {
    let message = resolve_deploy_message(
        options.commit_message.as_deref(),
        context.head_commit_message(),
    );

    start_group("Deploying to production site");
    let response = cli.deploy_production(message.as_deref()).await?;
    end_group();

    if let CliResponse::Error { error } = response {
        return Err(ActionError::DeployError(error));
    }

    let (summary, details_url) = match target.project_id.as_deref() {
        Some(project) => {
            let url = format!("https://{}.web.app", project);
            (format!("[{}.web.app]({})", project, url), Some(url))
        }
        None => ("The site was deployed to production.".to_string(), None),
    };

    Ok(CheckOutcome::success(
        "Production deploy succeeded",
        summary,
        details_url,
    ))
}

async fn deploy_preview(
    options: &AppOptions,
    context: &GithubContext,
    github: Option<&GithubClient>,
    cli: &FirebaseCli<'_>,
) -> Result<CheckOutcome, ActionError> {
    let channel_id = resolve_channel_id(&options.channel_id, context)?;

    start_group(&format!("Deploying to preview channel {}", channel_id));
    let request = ChannelDeployRequest {
        channel_id: channel_id.clone(),
        expires: options.expires.clone(),
    };
    let response = cli.deploy_preview(&request).await?;
    end_group();

    let result: ChannelSuccess = match response {
        CliResponse::Success { result } => result,
        CliResponse::Error { error } => return Err(ActionError::DeployError(error)),
    };

    let urls = result.urls();
    if urls.is_empty() {
        return Err(ActionError::MalformedOutput(
            "no URL was returned for the deployment".to_string(),
        ));
    }
    let expire_time = result.expire_time().unwrap_or_default().to_string();

    set_output("urls", &serde_json::to_string(&urls)?)?;
    set_output("expire_time", &expire_time)?;
    set_output("details_url", urls[0])?;

    if let (Some(github), Some(issue_number)) = (github, context.issue_number()) {
        start_group("Commenting on PR");
        let body = channel_deploy_success_comment(&result, &context.short_head_sha());
        post_or_update_comment(
            github,
            &context.owner,
            &context.repo,
            issue_number,
            &body,
            is_comment_from_bot,
        )
        .await;
        end_group();
    }

    if let Some(keep) = options.channel_retention {
        start_group("Pruning stale preview channels");
        cleanup::prune_channels(cli, &channel_id, keep).await;
        end_group();
    }

    let details_url = urls[0].to_string();
    Ok(CheckOutcome::success(
        "Deploy preview succeeded",
        urls_markdown(&result),
        Some(details_url),
    ))
}
