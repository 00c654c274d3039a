//! Match palette and color conversion.
//!
//! Every match gets a palette index derived from its id alone, so the same
//! match renders with the same value in both overlays even though the
//! underlying label ids differ.

use crate::constants::{
    GOLDEN_ANGLE_DECIDEGREES, MATCH_COLOR_SATURATION, MATCH_COLOR_VALUE, PALETTE_PERIOD,
};
use crate::model::MatchId;

/// Display color of a match: the overlay palette index and its RGB value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchColor {
    /// Voxel value written into the overlay volumes (never 0)
    pub index: u32,
    /// RGB color for the palette index
    pub rgb: [u8; 3],
}

impl MatchColor {
    /// Color of the match with the given id.
    pub fn for_match(id: MatchId) -> Self {
        let index = palette_index(id);
        Self {
            index,
            rgb: palette_rgb(index),
        }
    }
}

/// Overlay value for a match id, in `1..=u32::MAX`.
pub fn palette_index(id: MatchId) -> u32 {
    // (PALETTE_PERIOD - 1) + 1 == u32::MAX, so the cast cannot truncate
    (id % PALETTE_PERIOD) as u32 + 1
}

/// RGB color for a palette index. Index 0 (unmatched) is black.
pub fn palette_rgb(index: u32) -> [u8; 3] {
    if index == 0 {
        return [0, 0, 0];
    }
    // Integer hue stepping keeps large indices exact
    let hue = ((u64::from(index) * GOLDEN_ANGLE_DECIDEGREES) % 3600) as f32 / 10.0;
    let (r, g, b) = hsv_to_rgb(hue, MATCH_COLOR_SATURATION, MATCH_COLOR_VALUE);
    [to_u8(r), to_u8(g), to_u8(b)]
}

fn to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Convert HSV to RGB.
///
/// # Arguments
/// * `h` - Hue in degrees (0-360)
/// * `s` - Saturation (0.0-1.0)
/// * `v` - Value/brightness (0.0-1.0)
///
/// # Returns
/// RGB tuple with values in range 0.0-1.0
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (r + m, g + m, b + m)
}
