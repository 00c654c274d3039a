//! Pending label selections, one slot per side.

use super::{BACKGROUND, Label, Side, SidePair};
use crate::matching::MatchError;

/// Holds the label the user has picked on each side but not yet committed.
///
/// Each side has a single slot: a new pick overwrites the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pending: SidePair<Option<Label>>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `label` as pending for `side`, returning the value it replaced.
    ///
    /// Background (`0`) is rejected and leaves the slot untouched.
    pub fn set_pending(&mut self, side: Side, label: Label) -> Result<Option<Label>, MatchError> {
        if label == BACKGROUND {
            return Err(MatchError::InvalidSelection { side, label });
        }
        Ok(self.pending.replace(side, Some(label)))
    }

    /// Clear the slot for `side`, returning what was pending.
    pub fn clear_pending(&mut self, side: Side) -> Option<Label> {
        self.pending.replace(side, None)
    }

    /// Clear both slots.
    pub fn clear_all(&mut self) {
        self.pending = SidePair::default();
    }

    pub fn pending(&self, side: Side) -> Option<Label> {
        *self.pending.get(side)
    }

    /// Both pending labels, if both sides are armed.
    pub fn pair(&self) -> Option<(Label, Label)> {
        Some((self.pending.a?, self.pending.b?))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.a.is_none() && self.pending.b.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_pick_wins() {
        let mut selection = SelectionState::new();
        assert_eq!(selection.set_pending(Side::A, 3).unwrap(), None);
        assert_eq!(selection.set_pending(Side::A, 5).unwrap(), Some(3));
        assert_eq!(selection.pending(Side::A), Some(5));
        assert_eq!(selection.pending(Side::B), None);
    }

    #[test]
    fn test_background_rejected() {
        let mut selection = SelectionState::new();
        selection.set_pending(Side::B, 4).unwrap();

        let err = selection.set_pending(Side::B, 0).unwrap_err();
        assert!(matches!(err, MatchError::InvalidSelection { side: Side::B, label: 0 }));
        assert_eq!(selection.pending(Side::B), Some(4));
    }

    #[test]
    fn test_pair_requires_both_sides() {
        let mut selection = SelectionState::new();
        selection.set_pending(Side::A, 1).unwrap();
        assert_eq!(selection.pair(), None);

        selection.set_pending(Side::B, 2).unwrap();
        assert_eq!(selection.pair(), Some((1, 2)));

        selection.clear_pending(Side::A);
        assert_eq!(selection.pair(), None);
        selection.clear_all();
        assert!(selection.is_empty());
    }
}
