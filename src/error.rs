//! Fatal pipeline errors.
//!
//! Everything here aborts the whole run. Per-version problems (a broken
//! non-root build, an unreadable ref) are logged and the version is dropped
//! instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No docs found in any remote branch/tag. Nothing to do.")]
    NoDocsFound,

    #[error("No branch/tag with docs passed the whitelist. Nothing to do.")]
    NothingWhitelisted,

    #[error("Root ref {name} not found in: {}", .known.join(" "))]
    RootRefNotFound { name: String, known: Vec<String> },

    #[error("Root ref {name} is broken: {diagnostic}")]
    RootRefBroken { name: String, diagnostic: String },

    #[error("Ambiguous {field}: greatest tag and recent tag cannot both be selected")]
    AmbiguousRef { field: &'static str },
}
