//! Color-indexed overlay volumes derived from label volumes and matches.
//!
//! An overlay has the same shape as its label volume. Voxels of a matched
//! label carry the match's palette index; everything else is `0`. Output
//! depends only on the volume and the active match set, so two renders of
//! the same state are bit-identical.

use std::collections::{HashMap, HashSet};

use ndarray::{Array3, Zip};

use crate::color_utils::palette_index;
use crate::data::LabelVolume;
use crate::matching::MatchStore;
use crate::model::{Label, Side, SidePair};

/// Label -> palette index for the active matches on one side.
fn lookup_table(store: &MatchStore, side: Side) -> HashMap<Label, u32> {
    store
        .active_labels(side)
        .iter()
        .map(|(&label, &id)| (label, palette_index(id)))
        .collect()
}

/// Render the overlay for `volume` from scratch.
pub fn render(volume: &LabelVolume, side: Side, store: &MatchStore) -> Array3<u32> {
    let lut = lookup_table(store, side);
    volume
        .data()
        .mapv(|label| lut.get(&label).copied().unwrap_or(0))
}

/// Rewrite only the voxels whose label is in `changed`.
///
/// Given an overlay that was correct before the change, the result equals
/// [`render`] on the new state.
pub fn refresh_labels(
    overlay: &mut Array3<u32>,
    volume: &LabelVolume,
    side: Side,
    store: &MatchStore,
    changed: &HashSet<Label>,
) {
    if changed.is_empty() {
        return;
    }
    if overlay.shape() != volume.data().shape() {
        *overlay = render(volume, side, store);
        return;
    }
    let lut: HashMap<Label, u32> = changed
        .iter()
        .filter_map(|&label| {
            store
                .active_for(side, label)
                .map(|m| (label, palette_index(m.id)))
        })
        .collect();

    Zip::from(overlay)
        .and(volume.data())
        .for_each(|out, &label| {
            if changed.contains(&label) {
                *out = lut.get(&label).copied().unwrap_or(0);
            }
        });
}

/// Keeps the current overlay of each side in sync with the match store.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    overlays: SidePair<Option<Array3<u32>>>,
    /// Rewrite only changed labels instead of re-rendering whole volumes
    incremental: bool,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl OverlayRenderer {
    pub fn new(incremental: bool) -> Self {
        Self {
            overlays: SidePair::default(),
            incremental,
        }
    }

    /// Current overlay for `side`, if that side has a volume.
    pub fn overlay(&self, side: Side) -> Option<&Array3<u32>> {
        self.overlays.get(side).as_ref()
    }

    /// Re-render one side wholesale. A missing volume drops the overlay.
    pub fn rebuild(&mut self, side: Side, volume: Option<&LabelVolume>, store: &MatchStore) {
        let overlay = volume.map(|v| render(v, side, store));
        if let Some(o) = &overlay {
            log::debug!("Overlay {}: full render {:?}", side, o.shape());
        }
        *self.overlays.get_mut(side) = overlay;
    }

    /// Bring one side up to date after the given labels changed.
    pub fn refresh(
        &mut self,
        side: Side,
        volume: Option<&LabelVolume>,
        store: &MatchStore,
        changed: &HashSet<Label>,
    ) {
        let Some(volume) = volume else {
            *self.overlays.get_mut(side) = None;
            return;
        };

        let shape_matches = self
            .overlays
            .get(side)
            .as_ref()
            .is_some_and(|o| o.shape() == volume.data().shape());

        if self.incremental && shape_matches {
            if let Some(overlay) = self.overlays.get_mut(side) {
                refresh_labels(overlay, volume, side, store, changed);
                log::trace!("Overlay {}: refreshed {} labels", side, changed.len());
                return;
            }
        }
        self.rebuild(side, Some(volume), store);
    }
}
