//! Tests for saving and loading session directories.

use super::{labels_volume, scratch_dir};
use crate::constants::{MANIFEST_FILENAME, MATCHES_FILENAME, MAX_MATCH_ID};
use crate::data::{PropertyTable, npy};
use crate::format::{
    FormatError, SessionManifest, SkipReason, load_session, overlay_filename,
    properties_filename, save_session,
};
use crate::matching::{MatchEngine, MatchError};
use crate::model::Side;

fn engine_with(max_a: u32, max_b: u32) -> MatchEngine {
    let mut engine = MatchEngine::new();
    engine.replace_volume(Side::A, labels_volume(max_a));
    engine.replace_volume(Side::B, labels_volume(max_b));
    engine
}

fn pairs(engine: &MatchEngine) -> Vec<(u64, u32, u32)> {
    engine
        .active_matches()
        .iter()
        .map(|m| (m.id, m.label_a, m.label_b))
        .collect()
}

#[test]
fn test_save_then_load_reproduces_session() {
    let dir = scratch_dir("roundtrip");
    let mut engine = engine_with(6, 6);
    for (a, b) in [(1, 2), (3, 4), (1, 5), (6, 6)] {
        engine.pick(Side::A, a).unwrap();
        engine.pick(Side::B, b).unwrap();
    }
    engine.undo();
    let expected = pairs(&engine);
    assert_eq!(expected, vec![(2, 3, 4), (3, 1, 5)]);

    let saved = save_session(&engine, &dir).unwrap();
    assert_eq!(saved.matches_saved, 2);
    assert!(dir.join(MATCHES_FILENAME).is_file());
    assert!(dir.join(MANIFEST_FILENAME).is_file());

    let mut fresh = engine_with(6, 6);
    let report = load_session(&mut fresh, &dir).unwrap();
    assert_eq!(report.matches_loaded, 2);
    assert!(!report.has_skipped());
    assert!(!report.has_warnings());

    assert_eq!(pairs(&fresh), expected);
    for side in Side::ALL {
        assert_eq!(fresh.overlay(side), engine.overlay(side));
        let on_disk = npy::read_volume(&dir.join(overlay_filename(side))).unwrap();
        assert_eq!(Some(&on_disk), engine.overlay(side));
    }

    // Ids keep counting above the loaded ones
    fresh.pick(Side::A, 2).unwrap();
    fresh.pick(Side::B, 2).unwrap();
    assert_eq!(pairs(&fresh).last(), Some(&(4, 2, 2)));
}

#[test]
fn test_loaded_matches_are_undoable() {
    let dir = scratch_dir("undo_after_load");
    let mut engine = engine_with(3, 3);
    engine.pick(Side::A, 1).unwrap();
    engine.pick(Side::B, 1).unwrap();
    engine.pick(Side::A, 2).unwrap();
    engine.pick(Side::B, 3).unwrap();
    save_session(&engine, &dir).unwrap();

    let mut fresh = engine_with(3, 3);
    load_session(&mut fresh, &dir).unwrap();
    assert!(fresh.can_undo());
    fresh.undo();
    assert_eq!(pairs(&fresh), vec![(1, 1, 1)]);
}

#[test]
fn test_unknown_labels_are_skipped_and_reported() {
    let dir = scratch_dir("unknown_label");
    std::fs::write(
        dir.join(MATCHES_FILENAME),
        "matchId,labelA,labelB\n1,10,20\n2,99,5\n3,50,7\n",
    )
    .unwrap();

    let mut engine = engine_with(50, 50);
    let report = load_session(&mut engine, &dir).unwrap();

    assert_eq!(pairs(&engine), vec![(1, 10, 20), (3, 50, 7)]);
    assert_eq!(report.matches_loaded, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].line, 3);
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::UnknownLabel {
            side: Side::A,
            label: 99
        }
    );
}

#[test]
fn test_duplicates_keep_first_occurrence() {
    let dir = scratch_dir("duplicates");
    std::fs::write(
        dir.join(MATCHES_FILENAME),
        "1,1,1\n1,2,2\n2,1,3\n3,3,1\n4,2,2\n",
    )
    .unwrap();

    let mut engine = engine_with(4, 4);
    let report = load_session(&mut engine, &dir).unwrap();

    assert_eq!(pairs(&engine), vec![(1, 1, 1), (4, 2, 2)]);
    let reasons: Vec<&SkipReason> = report.skipped.iter().map(|r| &r.reason).collect();
    assert_eq!(
        reasons,
        vec![
            &SkipReason::DuplicateId(1),
            &SkipReason::DuplicateLabel {
                side: Side::A,
                label: 1
            },
            &SkipReason::DuplicateLabel {
                side: Side::B,
                label: 1
            },
        ]
    );
}

#[test]
fn test_ids_beyond_int64_are_skipped() {
    let dir = scratch_dir("huge_id");
    std::fs::write(
        dir.join(MATCHES_FILENAME),
        format!("matchId,labelA,labelB\n{},1,1\n{},2,2\n", u64::MAX, MAX_MATCH_ID),
    )
    .unwrap();

    let mut engine = engine_with(3, 3);
    let report = load_session(&mut engine, &dir).unwrap();
    assert_eq!(pairs(&engine), vec![(MAX_MATCH_ID, 2, 2)]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].line, 2);
    assert_eq!(report.skipped[0].reason, SkipReason::IdOutOfRange(u64::MAX));

    // The counter resumes above the largest id without overflowing
    engine.pick(Side::A, 3).unwrap();
    engine.pick(Side::B, 3).unwrap();
    assert_eq!(engine.match_of(Side::A, 3).map(|m| m.id), Some(MAX_MATCH_ID + 1));
}

#[test]
fn test_load_without_volumes_changes_nothing() {
    let dir = scratch_dir("no_volume");
    std::fs::write(dir.join(MATCHES_FILENAME), "1,1,1\n").unwrap();

    let mut engine = MatchEngine::new();
    engine.replace_volume(Side::A, labels_volume(3));
    engine.pick(Side::A, 2).unwrap();

    let err = load_session(&mut engine, &dir).unwrap_err();
    assert!(err.is_prerequisite_missing());
    assert!(matches!(
        err,
        FormatError::Match(MatchError::PrerequisiteMissing {
            operation: "load",
            side: Side::B
        })
    ));
    assert!(engine.active_matches().is_empty());
    assert_eq!(engine.pending(Side::A), Some(2));
}

#[test]
fn test_save_without_volumes_writes_nothing() {
    let dir = scratch_dir("no_volume_save").join("session");
    let engine = MatchEngine::new();
    let err = save_session(&engine, &dir).unwrap_err();
    assert!(err.is_prerequisite_missing());
    assert!(!dir.exists());
}

#[test]
fn test_missing_table_is_an_error_without_mutation() {
    let dir = scratch_dir("missing_table");
    let mut engine = engine_with(3, 3);
    engine.pick(Side::A, 1).unwrap();
    engine.pick(Side::B, 1).unwrap();

    assert!(matches!(
        load_session(&mut engine, &dir),
        Err(FormatError::Io(_))
    ));
    assert_eq!(pairs(&engine), vec![(1, 1, 1)]);
}

#[test]
fn test_properties_pass_through() {
    let dir = scratch_dir("properties");
    let table = PropertyTable::new(vec!["label".into(), "volume".into()])
        .with_row(["1", "812.5"])
        .with_row(["2", "77"]);

    let mut engine = engine_with(2, 2);
    engine.set_structure_properties(Side::B, Some(table.clone()));
    save_session(&engine, &dir).unwrap();
    assert!(dir.join(properties_filename(Side::B)).is_file());
    assert!(!dir.join(properties_filename(Side::A)).exists());

    let mut fresh = engine_with(2, 2);
    let report = load_session(&mut fresh, &dir).unwrap();
    assert_eq!(report.properties_restored, vec![Side::B]);
    assert_eq!(fresh.structure_properties(Side::B), Some(&table));
    assert_eq!(fresh.structure_properties(Side::A), None);

    // A later save without properties removes the stale file
    let result = save_session(&engine_with(2, 2), &dir).unwrap();
    assert!(result.has_warnings());
    assert!(!dir.join(properties_filename(Side::B)).exists());
}

#[test]
fn test_property_cells_with_line_breaks_survive_reload() {
    let dir = scratch_dir("multiline_properties");
    let table = PropertyTable::new(vec!["label".into(), "note".into()])
        .with_row(["1", "line1\nline2"])
        .with_row(["2", "ends with cr\r"])
        .with_row(["3", " padded "]);

    let mut engine = engine_with(3, 3);
    engine.set_structure_properties(Side::A, Some(table.clone()));
    save_session(&engine, &dir).unwrap();

    let mut fresh = engine_with(3, 3);
    load_session(&mut fresh, &dir).unwrap();
    assert_eq!(fresh.structure_properties(Side::A), Some(&table));
}

#[test]
fn test_manifest_shape_mismatch_warns() {
    let dir = scratch_dir("manifest_mismatch");
    let engine = engine_with(4, 4);
    save_session(&engine, &dir).unwrap();

    let manifest = SessionManifest::read(&dir.join(MANIFEST_FILENAME)).unwrap();
    assert_eq!(manifest.shape_a, [1, 1, 5]);
    assert_eq!(manifest.match_count, 0);

    let mut bigger = engine_with(4, 9);
    let report = load_session(&mut bigger, &dir).unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].message.contains("Volume B"));
}

#[test]
fn test_missing_manifest_is_tolerated() {
    let dir = scratch_dir("no_manifest");
    std::fs::write(dir.join(MATCHES_FILENAME), "1,2,3\n").unwrap();

    let mut engine = engine_with(3, 3);
    let report = load_session(&mut engine, &dir).unwrap();
    assert!(!report.has_warnings());
    assert_eq!(pairs(&engine), vec![(1, 2, 3)]);
}
