//! Undo/Redo system for match operations.
//!
//! This module implements the Command pattern to enable undo/redo functionality
//! for the match store. Each undoable action is represented as a Command
//! that knows how to undo and redo itself.

use crate::matching::{Committed, Match, MatchStore};

// ============================================================================
// Command Types
// ============================================================================

/// A command that can be undone and redone.
/// Each command stores enough information to reverse its effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Commit a new match
    Commit {
        /// The match that was created
        created: Match,
        /// Active matches it replaced (restored on undo)
        superseded: Vec<Match>,
    },
    /// Deactivate every active match at once
    Clear {
        /// All matches that were active, in commit order
        matches: Vec<Match>,
    },
}

impl Command {
    /// Get a human-readable description of this command
    pub fn description(&self) -> String {
        match self {
            Command::Commit {
                created,
                superseded,
            } if superseded.is_empty() => {
                format!("Match A:{} with B:{}", created.label_a, created.label_b)
            }
            Command::Commit {
                created,
                superseded,
            } => format!(
                "Match A:{} with B:{} (replacing {})",
                created.label_a,
                created.label_b,
                superseded.len()
            ),
            Command::Clear { matches } => format!("Clear {} matches", matches.len()),
        }
    }

    /// Matches whose active state this command changes.
    pub fn touched(&self) -> Vec<Match> {
        match self {
            Command::Commit {
                created,
                superseded,
            } => std::iter::once(*created)
                .chain(superseded.iter().copied())
                .collect(),
            Command::Clear { matches } => matches.clone(),
        }
    }
}

impl From<Committed> for Command {
    fn from(committed: Committed) -> Self {
        Command::Commit {
            created: committed.created,
            superseded: committed.superseded,
        }
    }
}

// ============================================================================
// Undo Stack
// ============================================================================

/// The undo/redo history stack.
///
/// Maintains two stacks:
/// - `undo_stack`: Commands that can be undone (most recent at the end)
/// - `redo_stack`: Commands that can be redone (most recent at the end)
///
/// When a new command is executed, it's pushed to undo_stack and redo_stack is cleared.
/// When undo is called, the command is moved from undo_stack to redo_stack.
/// When redo is called, the command is moved from redo_stack to undo_stack.
///
/// History is not capped: every active match must stay undoable.
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    /// Stack of commands that can be undone
    undo_stack: Vec<Command>,
    /// Stack of commands that can be redone
    redo_stack: Vec<Command>,
}

impl UndoStack {
    /// Create a new empty undo stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a command to the undo stack.
    /// This clears the redo stack (can't redo after a new action).
    pub fn push(&mut self, command: Command) {
        log::debug!("Undo: pushed '{}'", command.description());
        self.undo_stack.push(command);
        self.redo_stack.clear();
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Pop a command from the undo stack for undoing.
    /// The command is moved to the redo stack.
    pub fn pop_undo(&mut self) -> Option<Command> {
        let cmd = self.undo_stack.pop()?;
        log::debug!("Undo: '{}'", cmd.description());
        self.redo_stack.push(cmd.clone());
        Some(cmd)
    }

    /// Pop a command from the redo stack for redoing.
    /// The command is moved back to the undo stack.
    pub fn pop_redo(&mut self) -> Option<Command> {
        let cmd = self.redo_stack.pop()?;
        log::debug!("Redo: '{}'", cmd.description());
        self.undo_stack.push(cmd.clone());
        Some(cmd)
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        log::debug!("Undo history cleared");
    }

    /// Get the number of commands in undo history
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of commands in redo history
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

// ============================================================================
// Undo/Redo Execution
// ============================================================================

/// Undo the most recent command against the match store.
/// Returns the undone command, or None if there was nothing to undo.
pub fn undo_command(stack: &mut UndoStack, store: &mut MatchStore) -> Option<Command> {
    let cmd = stack.pop_undo()?;
    apply_undo(&cmd, store);
    Some(cmd)
}

/// Redo the most recently undone command.
/// Returns the redone command, or None if there was nothing to redo.
pub fn redo_command(stack: &mut UndoStack, store: &mut MatchStore) -> Option<Command> {
    let cmd = stack.pop_redo()?;
    apply_redo(&cmd, store);
    Some(cmd)
}

/// Apply the undo operation for a command
fn apply_undo(cmd: &Command, store: &mut MatchStore) {
    match cmd {
        Command::Commit {
            created,
            superseded,
        } => {
            // Undo commit = drop the new match, bring back what it replaced
            store.deactivate(created.id);
            for old in superseded {
                if !store.activate(old.id) {
                    log::warn!("Undo: could not reactivate match #{}", old.id);
                }
            }
            log::debug!("Undid match #{}", created.id);
        }
        Command::Clear { matches } => {
            for m in matches {
                store.activate(m.id);
            }
            log::debug!("Undid clear, restored {} matches", matches.len());
        }
    }
}

/// Apply the redo operation for a command
fn apply_redo(cmd: &Command, store: &mut MatchStore) {
    match cmd {
        Command::Commit {
            created,
            superseded,
        } => {
            for old in superseded {
                store.deactivate(old.id);
            }
            if !store.activate(created.id) {
                log::warn!("Redo: could not reactivate match #{}", created.id);
            }
            log::debug!("Redid match #{}", created.id);
        }
        Command::Clear { matches } => {
            for m in matches {
                store.deactivate(m.id);
            }
            log::debug!("Redid clear of {} matches", matches.len());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn active_pairs(store: &MatchStore) -> Vec<(u32, u32)> {
        store.active().map(|m| m.pair()).collect()
    }

    #[test]
    fn test_undo_stack_basic() {
        let mut stack = UndoStack::new();
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());

        stack.push(Command::Clear { matches: vec![] });
        assert!(stack.can_undo());
        assert!(!stack.can_redo());

        assert!(stack.pop_undo().is_some());
        assert!(!stack.can_undo());
        assert!(stack.can_redo());

        assert!(stack.pop_redo().is_some());
        assert!(stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut stack = UndoStack::new();
        stack.push(Command::Clear { matches: vec![] });
        stack.pop_undo();
        assert!(stack.can_redo());

        stack.push(Command::Clear { matches: vec![] });
        assert!(!stack.can_redo());
        assert_eq!(stack.undo_count(), 1);
        assert_eq!(stack.redo_count(), 0);
    }

    #[test]
    fn test_undo_restores_superseded() {
        let mut store = MatchStore::new();
        let mut stack = UndoStack::new();

        stack.push(store.commit(1, 2).into());
        stack.push(store.commit(1, 3).into());
        assert_eq!(active_pairs(&store), vec![(1, 3)]);

        undo_command(&mut stack, &mut store);
        assert_eq!(active_pairs(&store), vec![(1, 2)]);

        redo_command(&mut stack, &mut store);
        assert_eq!(active_pairs(&store), vec![(1, 3)]);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_undo_clear() {
        let mut store = MatchStore::new();
        let mut stack = UndoStack::new();
        stack.push(store.commit(1, 1).into());
        stack.push(store.commit(2, 2).into());

        let matches: Vec<Match> = store.active().collect();
        for m in &matches {
            store.deactivate(m.id);
        }
        stack.push(Command::Clear { matches });
        assert!(!store.has_active());

        undo_command(&mut stack, &mut store);
        assert_eq!(active_pairs(&store), vec![(1, 1), (2, 2)]);
    }

    #[test]
    fn test_empty_undo_returns_none() {
        let mut store = MatchStore::new();
        let mut stack = UndoStack::new();
        assert!(undo_command(&mut stack, &mut store).is_none());
        assert!(redo_command(&mut stack, &mut store).is_none());
    }

    #[test]
    fn test_command_descriptions() {
        let add = Command::Commit {
            created: Match::new(1, 4, 5),
            superseded: vec![],
        };
        assert_eq!(add.description(), "Match A:4 with B:5");

        let replace = Command::Commit {
            created: Match::new(2, 4, 6),
            superseded: vec![Match::new(1, 4, 5)],
        };
        assert_eq!(replace.description(), "Match A:4 with B:6 (replacing 1)");
        assert_eq!(replace.touched().len(), 2);

        let clear = Command::Clear {
            matches: vec![Match::new(1, 4, 5)],
        };
        assert_eq!(clear.description(), "Clear 1 matches");
    }
}
