//! Committed correspondences between labels of volume A and volume B.

use std::collections::HashMap;

use crate::constants::MAX_MATCH_ID;
use crate::model::{Label, MatchId, Side};

/// A committed correspondence between one label of each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Match {
    /// Identifier assigned at commit time, never reused
    pub id: MatchId,
    /// Label in volume A
    pub label_a: Label,
    /// Label in volume B
    pub label_b: Label,
}

impl Match {
    pub fn new(id: MatchId, label_a: Label, label_b: Label) -> Self {
        Self {
            id,
            label_a,
            label_b,
        }
    }

    /// The label this match uses on `side`.
    pub fn label(&self, side: Side) -> Label {
        match side {
            Side::A => self.label_a,
            Side::B => self.label_b,
        }
    }

    /// The `(label_a, label_b)` pair.
    pub fn pair(&self) -> (Label, Label) {
        (self.label_a, self.label_b)
    }
}

/// Result of committing a pair: the new match and the matches it replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub created: Match,
    /// Previously active matches that shared a label with `created`
    pub superseded: Vec<Match>,
}

#[derive(Debug, Clone)]
struct MatchRecord {
    entry: Match,
    active: bool,
}

/// History of every committed match plus an index of the active ones.
///
/// The history is append-only and kept in commit order; entries are
/// activated and deactivated but never removed, so undo ordering and audit
/// survive superseding. The active set is a partial one-to-one relation:
/// a label appears in at most one active match per side.
#[derive(Debug, Clone)]
pub struct MatchStore {
    history: Vec<MatchRecord>,
    /// Match id -> position in `history`
    positions: HashMap<MatchId, usize>,
    active_a: HashMap<Label, MatchId>,
    active_b: HashMap<Label, MatchId>,
    next_id: MatchId,
}

impl Default for MatchStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchStore {
    /// Create an empty store. The first committed match gets id 1.
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
            positions: HashMap::new(),
            active_a: HashMap::new(),
            active_b: HashMap::new(),
            next_id: 1,
        }
    }

    /// Rebuild a store from matches that were already validated to be
    /// one-to-one with unique ids. All of them become active, in the given
    /// order, and the id counter resumes above the largest id.
    ///
    /// Returns `None` if the input violates uniqueness or holds an id above
    /// [`MAX_MATCH_ID`].
    pub fn from_matches(matches: impl IntoIterator<Item = Match>) -> Option<Self> {
        let mut store = Self::new();
        for entry in matches {
            if entry.id > MAX_MATCH_ID
                || store.positions.contains_key(&entry.id)
                || store.active_a.contains_key(&entry.label_a)
                || store.active_b.contains_key(&entry.label_b)
            {
                return None;
            }
            store.append(entry);
            store.next_id = store.next_id.max(entry.id + 1);
        }
        Some(store)
    }

    /// Id the next commit will receive.
    pub fn next_id(&self) -> MatchId {
        self.next_id
    }

    /// Commit a pair, superseding any active match that uses either label.
    pub fn commit(&mut self, label_a: Label, label_b: Label) -> Committed {
        let superseded = self.conflicts(label_a, label_b);
        for old in &superseded {
            self.deactivate(old.id);
        }

        let created = Match::new(self.next_id, label_a, label_b);
        self.next_id += 1;
        self.append(created);

        log::debug!(
            "MatchStore: committed #{} (A={}, B={}), superseded {}",
            created.id,
            label_a,
            label_b,
            superseded.len()
        );
        Committed {
            created,
            superseded,
        }
    }

    /// Active matches that use `label_a` on side A or `label_b` on side B,
    /// ordered by id.
    pub fn conflicts(&self, label_a: Label, label_b: Label) -> Vec<Match> {
        let mut ids: Vec<MatchId> = [
            self.active_a.get(&label_a).copied(),
            self.active_b.get(&label_b).copied(),
        ]
        .into_iter()
        .flatten()
        .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }

    /// Mark a match inactive. Returns false if it was unknown or already inactive.
    pub fn deactivate(&mut self, id: MatchId) -> bool {
        let Some(&pos) = self.positions.get(&id) else {
            return false;
        };
        let record = &mut self.history[pos];
        if !record.active {
            return false;
        }
        record.active = false;
        let entry = record.entry;
        self.active_a.remove(&entry.label_a);
        self.active_b.remove(&entry.label_b);
        true
    }

    /// Re-activate a previously deactivated match.
    ///
    /// Refused (returns false) if either of its labels is currently taken
    /// by another active match, so the one-to-one invariant always holds.
    pub fn activate(&mut self, id: MatchId) -> bool {
        let Some(&pos) = self.positions.get(&id) else {
            return false;
        };
        let entry = self.history[pos].entry;
        if self.history[pos].active
            || self.active_a.contains_key(&entry.label_a)
            || self.active_b.contains_key(&entry.label_b)
        {
            return false;
        }
        self.history[pos].active = true;
        self.active_a.insert(entry.label_a, entry.id);
        self.active_b.insert(entry.label_b, entry.id);
        true
    }

    fn append(&mut self, entry: Match) {
        self.positions.insert(entry.id, self.history.len());
        self.history.push(MatchRecord {
            entry,
            active: true,
        });
        self.active_a.insert(entry.label_a, entry.id);
        self.active_b.insert(entry.label_b, entry.id);
    }

    /// Look up any match, active or not.
    pub fn get(&self, id: MatchId) -> Option<Match> {
        self.positions.get(&id).map(|&pos| self.history[pos].entry)
    }

    pub fn is_active(&self, id: MatchId) -> bool {
        self.positions
            .get(&id)
            .is_some_and(|&pos| self.history[pos].active)
    }

    /// The active match using `label` on `side`.
    pub fn active_for(&self, side: Side, label: Label) -> Option<Match> {
        let index = match side {
            Side::A => &self.active_a,
            Side::B => &self.active_b,
        };
        index.get(&label).and_then(|&id| self.get(id))
    }

    /// Active matches in commit order.
    pub fn active(&self) -> impl Iterator<Item = Match> + '_ {
        self.history.iter().filter(|r| r.active).map(|r| r.entry)
    }

    /// Every match ever committed, in commit order, with its active flag.
    pub fn history(&self) -> impl Iterator<Item = (Match, bool)> + '_ {
        self.history.iter().map(|r| (r.entry, r.active))
    }

    /// Label -> match id for the active matches on one side.
    pub fn active_labels(&self, side: Side) -> &HashMap<Label, MatchId> {
        match side {
            Side::A => &self.active_a,
            Side::B => &self.active_b,
        }
    }

    pub fn active_count(&self) -> usize {
        self.active_a.len()
    }

    pub fn has_active(&self) -> bool {
        !self.active_a.is_empty()
    }

    /// Check the one-to-one invariant against the history. Used by tests.
    pub fn is_consistent(&self) -> bool {
        let active: Vec<Match> = self.active().collect();
        active.len() == self.active_a.len()
            && active.len() == self.active_b.len()
            && active.iter().all(|m| {
                self.active_a.get(&m.label_a) == Some(&m.id)
                    && self.active_b.get(&m.label_b) == Some(&m.id)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(store: &MatchStore) -> Vec<(MatchId, Label, Label)> {
        store.active().map(|m| (m.id, m.label_a, m.label_b)).collect()
    }

    #[test]
    fn test_commit_assigns_increasing_ids() {
        let mut store = MatchStore::new();
        let first = store.commit(1, 2);
        let second = store.commit(3, 4);
        assert_eq!(first.created.id, 1);
        assert_eq!(second.created.id, 2);
        assert!(first.superseded.is_empty());
        assert_eq!(pairs(&store), vec![(1, 1, 2), (2, 3, 4)]);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_commit_supersedes_both_sides() {
        let mut store = MatchStore::new();
        store.commit(1, 10);
        store.commit(2, 20);

        // A=1 conflicts with #1, B=20 conflicts with #2
        let result = store.commit(1, 20);
        assert_eq!(result.superseded.len(), 2);
        assert_eq!(pairs(&store), vec![(3, 1, 20)]);
        assert!(!store.is_active(1));
        assert!(!store.is_active(2));
        assert_eq!(store.history().count(), 3);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_recommitting_same_pair_supersedes_once() {
        let mut store = MatchStore::new();
        store.commit(5, 6);
        let result = store.commit(5, 6);
        assert_eq!(result.superseded, vec![Match::new(1, 5, 6)]);
        assert_eq!(pairs(&store), vec![(2, 5, 6)]);
    }

    #[test]
    fn test_activate_refuses_conflict() {
        let mut store = MatchStore::new();
        store.commit(1, 2);
        store.commit(1, 3);
        assert!(!store.activate(1), "label A=1 is held by #2");
        assert!(store.deactivate(2));
        assert!(!store.deactivate(2));
        assert!(store.activate(1));
        assert_eq!(pairs(&store), vec![(1, 1, 2)]);
    }

    #[test]
    fn test_lookup_by_side() {
        let mut store = MatchStore::new();
        store.commit(4, 9);
        assert_eq!(store.active_for(Side::A, 4).map(|m| m.id), Some(1));
        assert_eq!(store.active_for(Side::B, 9).map(|m| m.id), Some(1));
        assert_eq!(store.active_for(Side::A, 9), None);
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn test_from_matches_resumes_ids() {
        let store =
            MatchStore::from_matches([Match::new(4, 1, 1), Match::new(17, 2, 2)]).unwrap();
        assert_eq!(store.next_id(), 18);
        assert_eq!(pairs(&store), vec![(4, 1, 1), (17, 2, 2)]);

        assert!(MatchStore::from_matches([Match::new(1, 1, 1), Match::new(2, 1, 3)]).is_none());
        assert!(MatchStore::from_matches([Match::new(1, 1, 1), Match::new(1, 2, 3)]).is_none());
    }

    #[test]
    fn test_from_matches_keeps_counter_in_range() {
        assert!(MatchStore::from_matches([Match::new(MatchId::MAX, 1, 1)]).is_none());

        let mut store = MatchStore::from_matches([Match::new(MAX_MATCH_ID, 1, 1)]).unwrap();
        let created = store.commit(2, 2).created;
        assert_eq!(created.id, MAX_MATCH_ID + 1);
        assert_eq!(store.next_id(), MAX_MATCH_ID + 2);
    }
}
