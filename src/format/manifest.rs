//! Session manifest (`session.json`).
//!
//! Written next to the match table so a later load can tell whether the
//! volumes it is handed look like the ones the session was saved with.
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "crate_version": "0.1.0",
//!   "shape_a": [12, 256, 256],
//!   "shape_b": [12, 256, 256],
//!   "match_count": 42,
//!   "next_id": 57
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::format::FormatError;
use crate::model::{MatchId, Side};

/// Current manifest format version.
pub const MANIFEST_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionManifest {
    /// Format version for forward compatibility.
    pub version: String,
    /// Version of the crate that wrote the session.
    #[serde(default)]
    pub crate_version: String,
    /// `(z, y, x)` shape of volume A at save time.
    pub shape_a: [usize; 3],
    /// `(z, y, x)` shape of volume B at save time.
    pub shape_b: [usize; 3],
    /// Number of rows written to the match table.
    pub match_count: usize,
    /// Id counter at save time. Informational; load derives its own.
    #[serde(default)]
    pub next_id: MatchId,
}

impl SessionManifest {
    pub fn new(
        shape_a: [usize; 3],
        shape_b: [usize; 3],
        match_count: usize,
        next_id: MatchId,
    ) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            shape_a,
            shape_b,
            match_count,
            next_id,
        }
    }

    pub fn shape(&self, side: Side) -> [usize; 3] {
        match side {
            Side::A => self.shape_a,
            Side::B => self.shape_b,
        }
    }

    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a manifest. A different format version is reported but accepted.
    pub fn from_json(json: &str) -> Result<Self, FormatError> {
        let manifest: Self = serde_json::from_str(json)?;
        if manifest.version != MANIFEST_VERSION {
            log::warn!(
                "Session manifest version mismatch: expected {}, got {}",
                MANIFEST_VERSION,
                manifest.version
            );
        }
        Ok(manifest)
    }

    pub fn write(&self, path: &Path) -> Result<(), FormatError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, FormatError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
