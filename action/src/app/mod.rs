//! Application assembly: configuration and the run pipeline

pub mod options;
pub mod run;
