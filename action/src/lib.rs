//! Fireview
//!
//! Deploys static sites to Firebase Hosting from a CI pipeline: ephemeral
//! preview channels for pull requests, permanent deploys for production
//! branches, with results reported as a check run and a PR comment.

pub mod app;
pub mod channel;
pub mod credentials;
pub mod deploy;
pub mod errors;
pub mod github;
pub mod logs;
pub mod manifest;
pub mod report;
