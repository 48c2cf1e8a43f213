//! Engine error types.
//!
//! Effect failures never show up here: they are normalized into `FAILURE`
//! actions and surface through reducer state instead.

use thiserror::Error;

/// Errors surfaced by [`EngineHandle`](crate::EngineHandle) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine loop is no longer running.
    #[error("engine is not running")]
    Stopped,

    /// The engine dropped a state query before answering it.
    #[error("state query dropped before a reply was sent")]
    QueryDropped,
}
