//! PENDING / SUCCESS / FAILURE action-tag triads.

use crate::action::ActionType;

/// Lifecycle phase of an async action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Success,
    Failure,
}

/// The {PENDING, SUCCESS, FAILURE} tag triad derived from one base name.
///
/// Derivation is deterministic and idempotent: defining the same base twice
/// yields structurally equal triads, and the fixed suffixes keep tags from
/// distinct bases (and within one triad) pairwise distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AsyncType {
    base: ActionType,
    pub pending: ActionType,
    pub success: ActionType,
    pub failure: ActionType,
}

impl AsyncType {
    pub fn define(base: &str) -> Self {
        Self {
            base: ActionType::new(base),
            pending: ActionType::new(format!("{base}_PENDING")),
            success: ActionType::new(format!("{base}_SUCCESS")),
            failure: ActionType::new(format!("{base}_FAILURE")),
        }
    }

    pub fn base(&self) -> &ActionType {
        &self.base
    }

    /// Classify a tag against this triad.
    ///
    /// Closes the open string-tag world into a matchable enum so reducers
    /// can switch exhaustively on [`Phase`] instead of comparing strings at
    /// every arm. Tags outside the triad map to `None`.
    pub fn classify(&self, kind: &ActionType) -> Option<Phase> {
        if *kind == self.pending {
            Some(Phase::Pending)
        } else if *kind == self.success {
            Some(Phase::Success)
        } else if *kind == self.failure {
            Some(Phase::Failure)
        } else {
            None
        }
    }
}
