//! Deploy result signatures

use sha2::{Digest, Sha256};

use crate::deploy::results::{ChannelSuccess, SiteDeploy};

/// Compute a stable signature over a channel deploy result.
///
/// Site records are folded in order of their site identifier, so two
/// results that differ only in the iteration order of the per-site mapping
/// produce an identical signature. This is a correlation token for finding
/// the action's own PR comment, not a security control.
pub fn create_deploy_signature(result: &ChannelSuccess) -> String {
    let mut deploys: Vec<&SiteDeploy> = result.sites.values().collect();
    deploys.sort_by(|a, b| a.site.cmp(&b.site));

    let mut hasher = Sha256::new();
    for deploy in deploys {
        hasher.update(deploy.site.as_bytes());
        hasher.update([0]);
        hasher.update(deploy.target.as_deref().unwrap_or_default().as_bytes());
        hasher.update([0]);
        hasher.update(deploy.url.as_bytes());
        hasher.update([0]);
        hasher.update(deploy.expire_time.as_bytes());
        hasher.update([0]);
    }
    format!("{:x}", hasher.finalize())
}
