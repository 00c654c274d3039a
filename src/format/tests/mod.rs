//! Persistence tests: match table parsing and full session save/load.

mod session_tests;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::data::LabelVolume;

/// Fresh, empty directory under the system temp dir.
fn scratch_dir(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "glomeralign_{}_{}_{}",
        name,
        std::process::id(),
        n
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// A single-row volume holding background followed by labels `1..=max`.
fn labels_volume(max: u32) -> Arc<LabelVolume> {
    let data: Vec<u32> = (0..=max).collect();
    Arc::new(LabelVolume::from_shape_vec((1, 1, data.len()), data).unwrap())
}
