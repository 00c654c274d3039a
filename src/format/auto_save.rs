//! Debounced auto-save of a session directory.
//!
//! The driver loop calls [`AutoSaver::tick`] with the engine after handling
//! input. Changes are detected through [`MatchEngine::revision`], so any
//! commit, undo, redo, clear or load counts, and nothing needs to be told
//! about edits explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;
use web_time::Instant;

use super::report::SaveResult;
use super::{FormatError, save_session};
use crate::matching::MatchEngine;

/// Writes the session to its directory once edits have settled.
///
/// A save is due when the engine revision differs from the one on disk,
/// no new revision has appeared for the debounce delay, and the minimum
/// interval has passed since the previous attempt.
#[derive(Debug)]
pub struct AutoSaver {
    dir: PathBuf,
    debounce_delay: Duration,
    save_interval: Duration,
    enabled: bool,
    /// Revision the files in `dir` reflect
    saved_revision: u64,
    /// Latest revision seen and when it first appeared
    seen: Option<(u64, Instant)>,
    last_attempt: Option<Instant>,
}

impl AutoSaver {
    pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(60);
    pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_secs(5);

    /// Auto-save into `dir`, treating revision 0 as already saved.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            debounce_delay: Self::DEFAULT_DEBOUNCE_DELAY,
            save_interval: Self::DEFAULT_SAVE_INTERVAL,
            enabled: true,
            saved_revision: 0,
            seen: None,
            last_attempt: None,
        }
    }

    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    pub fn with_save_interval(mut self, interval: Duration) -> Self {
        self.save_interval = interval;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        log::debug!("Auto-save: enabled = {}", enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record that `revision` is on disk, after an explicit save or a load.
    pub fn mark_saved(&mut self, revision: u64) {
        self.saved_revision = revision;
        self.observe(revision);
    }

    /// Note the engine's current revision.
    pub fn observe(&mut self, revision: u64) {
        if self.seen.is_none_or(|(seen, _)| seen != revision) {
            self.seen = Some((revision, Instant::now()));
        }
    }

    /// Whether the latest observed revision is not yet on disk.
    pub fn is_dirty(&self) -> bool {
        self.seen
            .is_some_and(|(revision, _)| revision != self.saved_revision)
    }

    pub fn is_due(&self) -> bool {
        if !self.enabled || !self.is_dirty() {
            return false;
        }
        let settled = self
            .seen
            .is_some_and(|(_, at)| at.elapsed() >= self.debounce_delay);
        let spaced = self
            .last_attempt
            .is_none_or(|at| at.elapsed() >= self.save_interval);
        settled && spaced
    }

    /// Observe `engine` and save it if a save is due.
    ///
    /// A failed save leaves the session dirty; the next attempt waits a full
    /// interval.
    pub fn tick(&mut self, engine: &MatchEngine) -> Result<Option<SaveResult>, FormatError> {
        let revision = engine.revision();
        self.observe(revision);
        if !self.is_due() {
            return Ok(None);
        }

        self.last_attempt = Some(Instant::now());
        match save_session(engine, &self.dir) {
            Ok(result) => {
                self.saved_revision = revision;
                log::info!("Auto-saved revision {} to {:?}", revision, self.dir);
                Ok(Some(result))
            }
            Err(e) => {
                log::warn!("Auto-save to {:?} failed: {}", self.dir, e);
                Err(e)
            }
        }
    }
}
