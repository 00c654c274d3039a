//! Errors raised by interactive matching operations.

use thiserror::Error;

use crate::model::{Label, Side};

/// Errors that can occur when picking labels or preparing a session operation.
///
/// None of these are fatal: the engine state is left exactly as it was
/// before the failing call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// Attempt to pick the background label
    #[error("Invalid selection: label {label} on side {side} is background")]
    InvalidSelection {
        /// Side the pick was made on
        side: Side,
        /// The rejected label
        label: Label,
    },

    /// Attempt to pick a label that does not occur in the loaded volume
    #[error("Invalid selection: label {label} does not exist in volume {side}")]
    UnknownLabel {
        /// Side the pick was made on
        side: Side,
        /// The rejected label
        label: Label,
    },

    /// An operation needs a label volume that has not been loaded yet
    #[error("Cannot {operation}: no label volume loaded for side {side}")]
    PrerequisiteMissing {
        /// Name of the aborted operation
        operation: &'static str,
        /// The side without a volume
        side: Side,
    },
}

impl MatchError {
    /// Whether this error is a rejected pick (recoverable with user feedback).
    pub fn is_invalid_selection(&self) -> bool {
        matches!(
            self,
            MatchError::InvalidSelection { .. } | MatchError::UnknownLabel { .. }
        )
    }
}
