//! Deployment result data model

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// Final JSON document the Firebase CLI prints with `--json`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CliResponse<T> {
    Success { result: T },
    Error { error: String },
}

/// One deployed site inside a channel deploy result
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDeploy {
    pub site: String,
    #[serde(default)]
    pub target: Option<String>,
    pub url: String,
    pub expire_time: String,
}

/// Per-site results of a channel deploy.
///
/// The CLI keys this mapping by site or target name; the key order carries
/// no meaning and consumers must not depend on it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ChannelSuccess {
    pub sites: BTreeMap<String, SiteDeploy>,
}

impl ChannelSuccess {
    pub fn urls(&self) -> Vec<&str> {
        self.sites.values().map(|site| site.url.as_str()).collect()
    }

    /// Expiry shared by the deployed sites (the CLI stamps every site in a
    /// channel deploy with the same expireTime).
    pub fn expire_time(&self) -> Option<&str> {
        self.sites.values().next().map(|site| site.expire_time.as_str())
    }
}

/// Deployed hosting release version(s) of a production deploy
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HostingVersions {
    Single(String),
    Many(Vec<String>),
}

/// Result of a production deploy
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductionSuccess {
    pub hosting: HostingVersions,
}

/// One preview channel, as reported by `hosting:channel:list`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// Fully qualified resource name encoding the channel id
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub expire_time: Option<String>,
}

impl Channel {
    pub fn channel_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// The permanent production channel, never subject to cleanup.
    pub fn is_live(&self) -> bool {
        self.channel_id() == "live"
    }

    pub fn expires_at(&self) -> Option<DateTime<FixedOffset>> {
        self.expire_time
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
    }
}

/// Result of `hosting:channel:list`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelList {
    pub channels: Vec<Channel>,
}
