//! Preview channel listing and best-effort cleanup

use tracing::{info, warn};

use crate::deploy::executor::FirebaseCli;
use crate::deploy::results::{Channel, ChannelList, CliResponse};
use crate::errors::ActionError;

/// List the hosting channels of the deploy target.
pub async fn list_channels(cli: &FirebaseCli<'_>) -> Result<Vec<Channel>, ActionError> {
    let args = vec!["hosting:channel:list".to_string()];
    let raw = cli.exec_with_credentials(&args).await?;
    match crate::deploy::executor::parse_response::<CliResponse<ChannelList>>(&raw)? {
        CliResponse::Success { result } => Ok(result.channels),
        CliResponse::Error { error } => Err(ActionError::DeployError(error)),
    }
}

/// Delete one preview channel. Deleting an absent channel is not an error
/// on the backend, so callers may retry freely.
pub async fn remove_channel(
    cli: &FirebaseCli<'_>,
    channel_id: &str,
) -> Result<(), ActionError> {
    let args = vec![
        "hosting:channel:delete".to_string(),
        channel_id.to_string(),
        "--force".to_string(),
    ];
    let raw = cli.exec_with_credentials(&args).await?;
    match crate::deploy::executor::parse_response::<CliResponse<serde_json::Value>>(&raw)? {
        CliResponse::Success { .. } => Ok(()),
        CliResponse::Error { error } => Err(ActionError::DeployError(error)),
    }
}

/// Remove stale preview channels, keeping the `keep` channels whose expiry
/// lies furthest in the future.
///
/// Removals run concurrently and each failure is logged and swallowed:
/// cleanup is best-effort and never aborts the run. The live channel, the
/// channel just deployed and channels without an expiry are never touched.
pub async fn prune_channels(cli: &FirebaseCli<'_>, current_channel: &str, keep: usize) {
    let channels = match list_channels(cli).await {
        Ok(channels) => channels,
        Err(e) => {
            warn!("Could not list channels for pruning: {}", e);
            return;
        }
    };

    let stale = select_stale(channels, current_channel, keep);
    if stale.is_empty() {
        info!("No stale preview channels to remove");
        return;
    }

    info!("Removing {} stale preview channel(s)", stale.len());
    let removals = stale.iter().map(|channel| async move {
        let id = channel.channel_id();
        match remove_channel(cli, id).await {
            Ok(()) => info!("Removed preview channel {}", id),
            Err(e) => warn!("Could not remove preview channel {}: {}", id, e),
        }
    });
    futures::future::join_all(removals).await;
}

fn select_stale(channels: Vec<Channel>, current_channel: &str, keep: usize) -> Vec<Channel> {
    let mut expiring: Vec<Channel> = channels
        .into_iter()
        .filter(|c| {
            !c.is_live() && c.channel_id() != current_channel && c.expires_at().is_some()
        })
        .collect();

    // Latest expiry first; everything past the quota is stale.
    expiring.sort_by_key(|c| std::cmp::Reverse(c.expires_at()));
    if keep >= expiring.len() {
        return Vec::new();
    }
    expiring.split_off(keep)
}
