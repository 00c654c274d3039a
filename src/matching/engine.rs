//! The interactive matching state machine.
//!
//! The engine exclusively owns the pending selections, the match store, the
//! undo history and the rendered overlays. Everything reaches it through a
//! small command surface (`pick`, `commit`, `undo`, `redo`, `cancel`,
//! `replace_volume`) on a single thread; viewers observe it through
//! [`EngineEvent`]s and read-only overlay access.

use std::collections::HashSet;
use std::sync::Arc;

use ndarray::Array3;

use crate::color_utils::MatchColor;
use crate::data::{LabelVolume, PropertyTable};
use crate::matching::events::{EngineEvent, Listeners, SubscriptionId};
use crate::matching::{Committed, Match, MatchError, MatchStore};
use crate::model::{BACKGROUND, Label, SelectionState, Side, SidePair};
use crate::overlay::OverlayRenderer;
use crate::undo::{self, Command, UndoStack};

/// Where the engine is in the pick/commit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing pending on either side
    Idle,
    /// A label is pending on one side only
    Armed(Side),
    /// Labels are pending on both sides
    Ready,
}

/// Result of a successful pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    /// The pick was recorded and the engine waits for more input
    Pending(EngineState),
    /// The pick completed a pair, which was committed
    Committed(Committed),
}

/// Result of an undo request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// The most recent command was reverted
    Undone(Command),
    /// There was nothing to undo
    Empty,
}

impl UndoOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, UndoOutcome::Empty)
    }
}

/// Engine behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Commit as soon as both sides have a pending label
    pub auto_commit: bool,
    /// Refresh only changed labels in the overlays
    pub incremental_overlays: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            auto_commit: true,
            incremental_overlays: true,
        }
    }
}

/// Cross-volume correspondence engine.
#[derive(Debug)]
pub struct MatchEngine {
    volumes: SidePair<Option<Arc<LabelVolume>>>,
    properties: SidePair<Option<PropertyTable>>,
    selection: SelectionState,
    store: MatchStore,
    history: UndoStack,
    renderer: OverlayRenderer,
    listeners: Listeners,
    options: EngineOptions,
    /// Bumped on every change of the active match set
    revision: u64,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchEngine {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            volumes: SidePair::default(),
            properties: SidePair::default(),
            selection: SelectionState::new(),
            store: MatchStore::new(),
            history: UndoStack::new(),
            renderer: OverlayRenderer::new(options.incremental_overlays),
            listeners: Listeners::default(),
            options,
            revision: 0,
        }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    // ========================================================================
    // Volumes
    // ========================================================================

    /// Swap in a new label volume for `side`.
    ///
    /// Any pending selection on that side is dropped, since it referred to
    /// the old volume. The match store is left untouched; matches whose
    /// labels no longer exist simply paint nothing.
    pub fn replace_volume(&mut self, side: Side, volume: Arc<LabelVolume>) {
        log::info!(
            "Volume {} replaced: shape {:?}, {} labels",
            side,
            volume.shape(),
            volume.label_count()
        );
        self.volumes.replace(side, Some(volume));
        self.renderer
            .rebuild(side, self.volumes.get(side).as_deref(), &self.store);

        if self.selection.clear_pending(side).is_some() {
            self.emit(EngineEvent::SelectionChanged {
                side,
                pending: None,
            });
        }
        self.emit(EngineEvent::VolumeReplaced { side });
    }

    /// Current volume for `side`.
    pub fn volume(&self, side: Side) -> Option<&Arc<LabelVolume>> {
        self.volumes.get(side).as_ref()
    }

    pub fn has_volumes(&self) -> bool {
        self.volumes.a.is_some() && self.volumes.b.is_some()
    }

    /// Both volumes, or `PrerequisiteMissing` naming the first missing side.
    pub fn require_volumes(
        &self,
        operation: &'static str,
    ) -> Result<(&LabelVolume, &LabelVolume), MatchError> {
        match (&self.volumes.a, &self.volumes.b) {
            (Some(a), Some(b)) => Ok((&**a, &**b)),
            (None, _) => Err(MatchError::PrerequisiteMissing {
                operation,
                side: Side::A,
            }),
            (_, None) => Err(MatchError::PrerequisiteMissing {
                operation,
                side: Side::B,
            }),
        }
    }

    /// Attach (or drop) the structure property table for `side`.
    pub fn set_structure_properties(&mut self, side: Side, table: Option<PropertyTable>) {
        self.properties.replace(side, table);
    }

    pub fn structure_properties(&self, side: Side) -> Option<&PropertyTable> {
        self.properties.get(side).as_ref()
    }

    // ========================================================================
    // Picking and committing
    // ========================================================================

    pub fn state(&self) -> EngineState {
        match (
            self.selection.pending(Side::A),
            self.selection.pending(Side::B),
        ) {
            (None, None) => EngineState::Idle,
            (Some(_), None) => EngineState::Armed(Side::A),
            (None, Some(_)) => EngineState::Armed(Side::B),
            (Some(_), Some(_)) => EngineState::Ready,
        }
    }

    pub fn pending(&self, side: Side) -> Option<Label> {
        self.selection.pending(side)
    }

    /// Pick `label` on `side`.
    ///
    /// Background is rejected, as is a label absent from the side's loaded
    /// volume; in both cases nothing changes. A pick that completes a pair
    /// commits it when `auto_commit` is on.
    pub fn pick(&mut self, side: Side, label: Label) -> Result<PickOutcome, MatchError> {
        if label != BACKGROUND {
            if let Some(volume) = self.volumes.get(side) {
                if !volume.contains(label) {
                    log::debug!("Pick rejected: label {} not in volume {}", label, side);
                    return Err(MatchError::UnknownLabel { side, label });
                }
            }
        }

        self.selection.set_pending(side, label).inspect_err(|_| {
            log::debug!("Pick rejected: background on side {}", side);
        })?;
        log::debug!("Picked {}:{}", side, label);
        self.emit(EngineEvent::SelectionChanged {
            side,
            pending: Some(label),
        });

        if self.options.auto_commit {
            if let Some(committed) = self.commit() {
                return Ok(PickOutcome::Committed(committed));
            }
        }
        Ok(PickOutcome::Pending(self.state()))
    }

    /// Pick whatever label sits at voxel `(z, y, x)` of `side`'s volume.
    ///
    /// Positions outside the volume count as background.
    pub fn pick_at(
        &mut self,
        side: Side,
        z: usize,
        y: usize,
        x: usize,
    ) -> Result<PickOutcome, MatchError> {
        let volume = self
            .volumes
            .get(side)
            .as_ref()
            .ok_or(MatchError::PrerequisiteMissing {
                operation: "pick",
                side,
            })?;
        let label = volume.label_at(z, y, x).unwrap_or(BACKGROUND);
        self.pick(side, label)
    }

    /// Commit the pending pair. Returns `None` unless the engine is `Ready`.
    ///
    /// Active matches sharing a label with the new pair are superseded.
    pub fn commit(&mut self) -> Option<Committed> {
        let (label_a, label_b) = self.selection.pair()?;

        let committed = self.store.commit(label_a, label_b);
        self.history.push(Command::from(committed.clone()));
        log::info!(
            "Committed match #{}: A:{} <-> B:{}",
            committed.created.id,
            label_a,
            label_b
        );

        self.selection.clear_all();
        for side in Side::ALL {
            self.emit(EngineEvent::SelectionChanged {
                side,
                pending: None,
            });
        }

        let touched: Vec<Match> = std::iter::once(committed.created)
            .chain(committed.superseded.iter().copied())
            .collect();
        self.matches_changed(&touched);
        Some(committed)
    }

    /// Drop the pending label on `side`.
    pub fn cancel(&mut self, side: Side) -> Option<Label> {
        let cleared = self.selection.clear_pending(side);
        if cleared.is_some() {
            self.emit(EngineEvent::SelectionChanged {
                side,
                pending: None,
            });
        }
        cleared
    }

    /// Drop both pending labels.
    pub fn cancel_all(&mut self) {
        for side in Side::ALL {
            self.cancel(side);
        }
    }

    // ========================================================================
    // Undo / redo / clear
    // ========================================================================

    /// Revert the most recent commit (or clear).
    ///
    /// The reverted match becomes inactive and whatever it superseded is
    /// active again. Pending selections are not restored; a pending label
    /// that belongs to the reverted command is cleared.
    pub fn undo(&mut self) -> UndoOutcome {
        let Some(cmd) = undo::undo_command(&mut self.history, &mut self.store) else {
            log::debug!("Nothing to undo");
            return UndoOutcome::Empty;
        };
        log::info!("Undid '{}'", cmd.description());
        let touched = cmd.touched();
        self.clear_pending_touching(&touched);
        self.matches_changed(&touched);
        UndoOutcome::Undone(cmd)
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self) -> Option<Command> {
        let cmd = undo::redo_command(&mut self.history, &mut self.store)?;
        log::info!("Redid '{}'", cmd.description());
        let touched = cmd.touched();
        self.clear_pending_touching(&touched);
        self.matches_changed(&touched);
        Some(cmd)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_history(&self) -> &UndoStack {
        &self.history
    }

    /// Deactivate every active match as one undoable step.
    /// Returns how many matches were cleared.
    pub fn clear_matches(&mut self) -> usize {
        let matches: Vec<Match> = self.store.active().collect();
        if matches.is_empty() {
            return 0;
        }
        for m in &matches {
            self.store.deactivate(m.id);
        }
        let count = matches.len();
        log::info!("Cleared {} matches", count);
        self.history.push(Command::Clear {
            matches: matches.clone(),
        });
        self.matches_changed(&matches);
        count
    }

    fn clear_pending_touching(&mut self, touched: &[Match]) {
        for side in Side::ALL {
            let Some(pending) = self.selection.pending(side) else {
                continue;
            };
            if touched.iter().any(|m| m.label(side) == pending) {
                self.cancel(side);
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_matched(&self, side: Side, label: Label) -> bool {
        self.store.active_labels(side).contains_key(&label)
    }

    /// The active match using `label` on `side`.
    pub fn match_of(&self, side: Side, label: Label) -> Option<Match> {
        self.store.active_for(side, label)
    }

    /// Display color of the active match using `label` on `side`.
    pub fn match_color_of(&self, side: Side, label: Label) -> Option<MatchColor> {
        self.store
            .active_labels(side)
            .get(&label)
            .map(|&id| MatchColor::for_match(id))
    }

    /// Active matches in commit order.
    pub fn active_matches(&self) -> Vec<Match> {
        self.store.active().collect()
    }

    pub fn store(&self) -> &MatchStore {
        &self.store
    }

    /// Rendered overlay for `side`, present once that side has a volume.
    pub fn overlay(&self, side: Side) -> Option<&Array3<u32>> {
        self.renderer.overlay(side)
    }

    /// Counter bumped on every change of the active match set.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Register a callback for engine events.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&EngineEvent) + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn emit(&mut self, event: EngineEvent) {
        self.listeners.emit(&event);
    }

    /// Refresh overlays for the labels of `touched` and notify listeners.
    fn matches_changed(&mut self, touched: &[Match]) {
        for side in Side::ALL {
            let changed: HashSet<Label> = touched.iter().map(|m| m.label(side)).collect();
            self.renderer.refresh(
                side,
                self.volumes.get(side).as_deref(),
                &self.store,
                &changed,
            );
        }
        self.revision += 1;
        self.emit(EngineEvent::MatchesChanged {
            active: self.store.active_count(),
        });
    }

    // ========================================================================
    // Session restore
    // ========================================================================

    /// Replace the whole match relation with validated matches, in commit
    /// order. Each becomes its own undo step, pending selections are
    /// dropped and both overlays are fully re-rendered.
    ///
    /// Returns false, changing nothing, if the matches are not one-to-one
    /// with unique ids.
    pub(crate) fn install_matches(&mut self, matches: Vec<Match>) -> bool {
        let Some(store) = MatchStore::from_matches(matches.iter().copied()) else {
            return false;
        };

        self.store = store;
        self.history.clear();
        for m in matches {
            self.history.push(Command::Commit {
                created: m,
                superseded: Vec::new(),
            });
        }
        self.cancel_all();

        for side in Side::ALL {
            self.renderer
                .rebuild(side, self.volumes.get(side).as_deref(), &self.store);
        }
        self.revision += 1;
        log::info!(
            "Installed {} matches (next id {})",
            self.store.active_count(),
            self.store.next_id()
        );
        self.emit(EngineEvent::MatchesChanged {
            active: self.store.active_count(),
        });
        true
    }
}
