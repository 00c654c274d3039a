//! Change notifications for viewers.
//!
//! Viewers never mutate the engine; they subscribe here and re-read the
//! overlays when told something changed.

use std::fmt;

use crate::model::{Label, Side};

/// Something observable about the engine changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The active match set changed (commit, undo, redo, clear, load)
    MatchesChanged {
        /// Number of active matches afterwards
        active: usize,
    },
    /// A pending selection was set or cleared
    SelectionChanged {
        side: Side,
        pending: Option<Label>,
    },
    /// A side's label volume was swapped for a new one
    VolumeReplaced { side: Side },
}

/// Handle returned by [`Listeners::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Registered event callbacks, called in subscription order.
#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, Box<dyn FnMut(&EngineEvent)>)>,
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl Listeners {
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&EngineEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn emit(&mut self, event: &EngineEvent) {
        log::trace!("Event: {:?}", event);
        for (_, listener) in &mut self.entries {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
