//! Saving and restoring a matching session directory.
//!
//! A session directory holds:
//! - `matches.csv`: the active matches in commit order
//! - `overlay_a.npy`, `overlay_b.npy`: rendered overlays
//! - `properties_a.csv`, `properties_b.csv`: structure properties, if any
//! - `session.json`: manifest with shapes and counts
//!
//! Loading trusts only the match table. Overlays are regenerated from the
//! relation, so a stale or hand-edited overlay file cannot leak in.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;

use crate::constants::{
    MANIFEST_FILENAME, MATCHES_FILENAME, MAX_MATCH_ID, OVERLAY_PREFIX, PROPERTIES_PREFIX,
};
use crate::data::{LabelVolume, PropertyTable, npy};
use crate::format::FormatError;
use crate::format::manifest::SessionManifest;
use crate::format::match_table::{self, TableRow};
use crate::format::report::{CorruptRow, FormatWarning, LoadReport, SaveResult, SkipReason};
use crate::matching::{Match, MatchEngine};
use crate::model::{Label, MatchId, Side, SidePair};
use crate::overlay;

/// `overlay_a.npy` / `overlay_b.npy`
pub fn overlay_filename(side: Side) -> String {
    format!("{}_{}.npy", OVERLAY_PREFIX, side.suffix())
}

/// `properties_a.csv` / `properties_b.csv`
pub fn properties_filename(side: Side) -> String {
    format!("{}_{}.csv", PROPERTIES_PREFIX, side.suffix())
}

/// Write the engine's session into `dir`, creating it if needed.
///
/// Fails with `PrerequisiteMissing` (and writes nothing) unless both
/// volumes are loaded.
pub fn save_session(engine: &MatchEngine, dir: &Path) -> Result<SaveResult, FormatError> {
    let (volume_a, volume_b) = engine.require_volumes("save")?;
    log::info!("Saving session to {:?}", dir);
    std::fs::create_dir_all(dir)?;

    let mut result = SaveResult::default();
    let matches = engine.active_matches();

    let table_path = dir.join(MATCHES_FILENAME);
    result.matches_saved = match_table::write(&table_path, &matches)?;
    result.files_created.push(table_path);

    for (side, volume) in [(Side::A, volume_a), (Side::B, volume_b)] {
        let path = dir.join(overlay_filename(side));
        let overlay = match engine.overlay(side) {
            Some(o) => Cow::Borrowed(o),
            None => Cow::Owned(overlay::render(volume, side, engine.store())),
        };
        npy::write_volume(&path, &overlay)?;
        result.files_created.push(path);

        let path = dir.join(properties_filename(side));
        match engine.structure_properties(side) {
            Some(table) => {
                table.write(&path)?;
                result.files_created.push(path);
            }
            None if path.is_file() => {
                // Left over from an earlier save; would be restored on load
                std::fs::remove_file(&path)?;
                result.add_warning(
                    FormatWarning::info(format!("Removed stale properties for side {side}"))
                        .with_path(path),
                );
            }
            None => {}
        }
    }

    let manifest = SessionManifest::new(
        volume_a.shape(),
        volume_b.shape(),
        matches.len(),
        engine.store().next_id(),
    );
    let manifest_path = dir.join(MANIFEST_FILENAME);
    manifest.write(&manifest_path)?;
    result.files_created.push(manifest_path);

    log::info!(
        "Saved {} matches ({} files) to {:?}",
        result.matches_saved,
        result.files_created.len(),
        dir
    );
    Ok(result)
}

/// Restore the session in `dir` into `engine`.
///
/// Requires both volumes; otherwise fails with `PrerequisiteMissing` before
/// touching the filesystem. Every file is read and validated before the
/// engine is modified, so an error leaves the engine as it was. Rows that
/// reference labels missing from the volumes (or are otherwise unusable)
/// are skipped and listed in the report.
pub fn load_session(engine: &mut MatchEngine, dir: &Path) -> Result<LoadReport, FormatError> {
    let (volume_a, volume_b) = engine.require_volumes("load")?;
    log::info!("Loading session from {:?}", dir);

    let mut report = LoadReport::default();
    let table = match_table::read(&dir.join(MATCHES_FILENAME))?;
    let mut skipped = table.corrupt;
    let accepted = validate(table.rows, SidePair::new(volume_a, volume_b), &mut skipped);
    skipped.sort_by_key(|row| row.line);
    for row in &skipped {
        log::warn!("Skipping match row {}", row);
    }
    report.skipped = skipped;

    let mut properties = Vec::new();
    for side in Side::ALL {
        let path = dir.join(properties_filename(side));
        if path.is_file() {
            properties.push((side, PropertyTable::read(&path)?));
        }
    }

    let shapes = SidePair::new(volume_a.shape(), volume_b.shape());
    check_manifest(&dir.join(MANIFEST_FILENAME), &shapes, &mut report);

    if !engine.install_matches(accepted) {
        return Err(FormatError::invalid_format(
            "match table is not one-to-one after validation",
        ));
    }
    report.matches_loaded = engine.store().active_count();

    for (side, table) in properties {
        engine.set_structure_properties(side, Some(table));
        report.properties_restored.push(side);
    }

    log::info!(
        "Loaded {} matches from {:?} ({} skipped)",
        report.matches_loaded,
        dir,
        report.skipped.len()
    );
    Ok(report)
}

/// Keep rows whose labels exist in the volumes, first occurrence wins on
/// duplicate ids or labels. Rejected rows are appended to `skipped`.
fn validate(
    rows: Vec<TableRow>,
    volumes: SidePair<&LabelVolume>,
    skipped: &mut Vec<CorruptRow>,
) -> Vec<Match> {
    let mut ids: HashSet<MatchId> = HashSet::new();
    let mut used: SidePair<HashSet<Label>> = SidePair::default();
    let mut accepted = Vec::with_capacity(rows.len());

    for row in rows {
        let m = row.entry;
        match rejection(&m, &volumes, &ids, &used) {
            None => {
                ids.insert(m.id);
                used.a.insert(m.label_a);
                used.b.insert(m.label_b);
                accepted.push(m);
            }
            Some(reason) => skipped.push(CorruptRow {
                line: row.line,
                raw: row.raw,
                reason,
            }),
        }
    }
    accepted
}

fn rejection(
    m: &Match,
    volumes: &SidePair<&LabelVolume>,
    ids: &HashSet<MatchId>,
    used: &SidePair<HashSet<Label>>,
) -> Option<SkipReason> {
    for side in Side::ALL {
        let label = m.label(side);
        if !volumes.get(side).contains(label) {
            return Some(SkipReason::UnknownLabel { side, label });
        }
    }
    if m.id > MAX_MATCH_ID {
        return Some(SkipReason::IdOutOfRange(m.id));
    }
    if ids.contains(&m.id) {
        return Some(SkipReason::DuplicateId(m.id));
    }
    for side in Side::ALL {
        let label = m.label(side);
        if used.get(side).contains(&label) {
            return Some(SkipReason::DuplicateLabel { side, label });
        }
    }
    None
}

fn check_manifest(path: &Path, shapes: &SidePair<[usize; 3]>, report: &mut LoadReport) {
    if !path.is_file() {
        log::debug!("No session manifest at {:?}", path);
        return;
    }
    let manifest = match SessionManifest::read(path) {
        Ok(m) => m,
        Err(e) => {
            log::warn!("Ignoring unreadable session manifest: {}", e);
            report.add_warning(
                FormatWarning::warning(format!("Unreadable manifest: {e}")).with_path(path),
            );
            return;
        }
    };
    for side in Side::ALL {
        let saved = manifest.shape(side);
        let current = *shapes.get(side);
        if saved != current {
            log::warn!(
                "Volume {} shape changed since save: {:?} -> {:?}",
                side,
                saved,
                current
            );
            report.add_warning(
                FormatWarning::warning(format!(
                    "Volume {side} was {saved:?} when saved, now {current:?}"
                ))
                .with_path(path),
            );
        }
    }
}
