//! Run reporting: signatures, comments and step outputs

pub mod comment;
pub mod outputs;
pub mod signature;
