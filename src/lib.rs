//! GlomerAlign - cross-volume structure matching
//!
//! Two independently segmented 3D label volumes of the same tissue (an
//! in-vivo and an ex-vivo acquisition) are aligned by hand: the user picks a
//! structure in one volume and its counterpart in the other, and the pair is
//! committed as a match. Matched structures are painted with a shared color
//! in per-volume overlays, and the session can be saved and restored.
//!
//! - [`matching::MatchEngine`]: pick/commit/undo state machine
//! - [`overlay`]: color-indexed overlay volumes
//! - [`format`]: session save/load, previews and auto-save
//! - [`state`]: background segmentation feeding volume replacements
//! - [`config`]: versioned JSON settings

pub mod color_utils;
pub mod config;
pub mod constants;
pub mod data;
pub mod format;
pub mod matching;
pub mod model;
pub mod overlay;
pub mod state;
pub mod undo;

pub use config::AppConfig;
pub use data::{LabelVolume, PropertyTable};
pub use format::{FormatError, LoadReport, load_session, save_session};
pub use matching::{EngineEvent, EngineOptions, Match, MatchEngine, MatchError, UndoOutcome};
pub use model::{Label, MatchId, Side};
