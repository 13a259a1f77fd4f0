//! Utility modules shared by the pipeline stages.

pub mod exec;
pub mod semver;
pub mod slug;
pub mod xml;
