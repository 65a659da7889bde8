//! GitHub integration: API client, event context, checks and comments

pub mod checks;
pub mod client;
pub mod comments;
pub mod context;
