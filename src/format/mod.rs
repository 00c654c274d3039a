//! Session persistence.
//!
//! A session is a directory with the match table, the rendered overlays,
//! optional structure property tables and a manifest:
//!
//! - `match_table`: tolerant reader/writer for `matches.csv`
//! - `manifest`: `session.json` with shapes and counts
//! - `session`: `save_session` / `load_session` on a [`MatchEngine`]
//! - `preview`: PNG snapshots of overlay slices
//! - `auto_save`: debounced saving driven by the engine revision
//!
//! ## Usage
//!
//! ```rust,ignore
//! use glomeralign::format::{load_session, save_session};
//!
//! let report = load_session(&mut engine, dir)?;
//! for row in &report.skipped {
//!     eprintln!("skipped {row}");
//! }
//! save_session(&engine, dir)?;
//! ```
//!
//! [`MatchEngine`]: crate::matching::MatchEngine

mod auto_save;
mod error;
pub mod manifest;
pub mod match_table;
pub mod preview;
mod report;
mod session;

pub use auto_save::AutoSaver;
pub use error::FormatError;
pub use manifest::SessionManifest;
pub use report::{CorruptRow, FormatWarning, LoadReport, SaveResult, SkipReason, WarningSeverity};
pub use session::{load_session, overlay_filename, properties_filename, save_session};

#[cfg(test)]
mod tests;
