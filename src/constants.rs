//! Global constants for GlomerAlign

/// File name of the persisted match table
pub const MATCHES_FILENAME: &str = "matches.csv";

/// File name of the session manifest
pub const MANIFEST_FILENAME: &str = "session.json";

/// Prefix for overlay volumes (`overlay_a.npy`, `overlay_b.npy`)
pub const OVERLAY_PREFIX: &str = "overlay";

/// Prefix for structure property tables (`properties_a.csv`, `properties_b.csv`)
pub const PROPERTIES_PREFIX: &str = "properties";

/// Column identifiers of the match table, in order
pub const MATCH_COLUMNS: [&str; 3] = ["matchId", "labelA", "labelB"];

/// Largest match id accepted from a saved table. Ids stay within the
/// signed 64-bit range so tables round-trip through tools that read them as
/// `int64`, and the id counter can never overflow.
pub const MAX_MATCH_ID: u64 = i64::MAX as u64;

/// Number of distinct palette indices before they wrap around
pub const PALETTE_PERIOD: u64 = u32::MAX as u64;

/// Golden angle in tenths of a degree, used to spread match hues
pub const GOLDEN_ANGLE_DECIDEGREES: u64 = 1375;

/// Saturation and value of generated match colors
pub const MATCH_COLOR_SATURATION: f32 = 0.7;
pub const MATCH_COLOR_VALUE: f32 = 0.9;
