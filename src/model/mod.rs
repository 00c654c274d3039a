//! Core data model shared by the matching engine and persistence.

mod selection;
mod side;

pub use selection::SelectionState;
pub use side::{Side, SidePair};

/// A structure id inside a label volume. `0` is background.
pub type Label = u32;

/// Identifier assigned to a match when it is committed.
pub type MatchId = u64;

/// The background label, never selectable or matchable.
pub const BACKGROUND: Label = 0;
