//! Error types and result aliases for the agent-replay library.
//!
//! This module defines the core error type [`ReplayError`] and the [`Result`] type alias
//! used throughout the library. All public APIs that can fail return `Result<T>` for
//! consistent error handling.
//!
//! Navigation misses (stepping past either end of the timeline, `goto` on an id that
//! does not exist) are not errors: they come back as `None` so interactive debugging
//! can probe freely. Errors are reserved for unusable sessions: malformed documents,
//! failed disk I/O, and state reconstruction against an id the session never recorded.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("invalid session document: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot reconstruct state: event {0} is not in the session")]
    StateReconstruction(u64),

    #[error("LLM gateway error: {0}")]
    Gateway(String),
}

pub type Result<T> = std::result::Result<T, ReplayError>;
