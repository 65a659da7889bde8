//! Deployment module

pub mod cleanup;
pub mod executor;
pub mod message;
pub mod results;
