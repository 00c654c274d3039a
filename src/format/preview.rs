//! PNG previews of overlay slices.
//!
//! One `z` slice of an overlay volume is painted with the match palette, so
//! a matched structure has the same color in the A and B previews.

use std::path::Path;

use image::{Rgb, RgbImage};
use ndarray::{Array3, Axis};

use crate::color_utils::palette_rgb;
use crate::format::FormatError;

/// Paint slice `z` of `overlay` as an RGB image (`x` across, `y` down).
pub fn render_slice(overlay: &Array3<u32>, z: usize) -> Result<RgbImage, FormatError> {
    let (depth, height, width) = overlay.dim();
    if z >= depth {
        return Err(FormatError::invalid_format(format!(
            "slice {z} out of range (volume has {depth} slices)"
        )));
    }
    let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
        return Err(FormatError::invalid_format(format!(
            "slice {width}x{height} too large for an image"
        )));
    };

    let slice = overlay.index_axis(Axis(0), z);
    Ok(RgbImage::from_fn(w, h, |x, y| {
        Rgb(palette_rgb(slice[[y as usize, x as usize]]))
    }))
}

/// Write slice `z` of `overlay` to `path` as PNG.
pub fn write_slice_png(overlay: &Array3<u32>, z: usize, path: &Path) -> Result<(), FormatError> {
    let img = render_slice(overlay, z)?;
    img.save_with_format(path, image::ImageFormat::Png)?;
    log::debug!("Wrote overlay preview of slice {} to {:?}", z, path);
    Ok(())
}
