//! NumPy `.npy` input/output for label and overlay volumes.
//!
//! Segmentation tools write masks with whatever integer dtype they like, so
//! reading tries the common integer types in turn and converts to `u32`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read};
use std::path::Path;

use ndarray::{Array3, ArrayD, Ix3};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};

use crate::data::LabelVolume;
use crate::format::FormatError;
use crate::model::Label;

/// NumPy magic bytes: \x93NUMPY
const MAGIC: &[u8] = &[0x93, b'N', b'U', b'M', b'P', b'Y'];

/// Check whether `data` starts with the NumPy magic bytes.
pub fn is_npy(data: &[u8]) -> bool {
    data.len() >= MAGIC.len() && data.starts_with(MAGIC)
}

/// Read a label volume from a `.npy` file.
pub fn read_label_volume(path: &Path) -> Result<LabelVolume, FormatError> {
    log::info!("Reading label volume from {:?}", path);
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
    Ok(LabelVolume::new(read_label_array(&bytes)?))
}

/// Decode a `.npy` buffer into a `(z, y, x)` label array.
///
/// Accepted dtypes: `u32`, `u16`, `u8`, `i32`, `i64`, `u64`. A 2D array is
/// treated as a single slice. Negative or out-of-range values are rejected.
pub fn read_label_array(bytes: &[u8]) -> Result<Array3<Label>, FormatError> {
    if !is_npy(bytes) {
        return Err(FormatError::invalid_format("not a NumPy .npy file"));
    }

    let mut cursor = Cursor::new(bytes);

    if let Ok(array) = ArrayD::<u32>::read_npy(&mut cursor) {
        return to_volume_shape(array);
    }

    cursor.set_position(0);
    if let Ok(array) = ArrayD::<u16>::read_npy(&mut cursor) {
        return to_volume_shape(array.mapv(Label::from));
    }

    cursor.set_position(0);
    if let Ok(array) = ArrayD::<u8>::read_npy(&mut cursor) {
        return to_volume_shape(array.mapv(Label::from));
    }

    cursor.set_position(0);
    if let Ok(array) = ArrayD::<i32>::read_npy(&mut cursor) {
        return to_volume_shape(convert_labels(array)?);
    }

    cursor.set_position(0);
    if let Ok(array) = ArrayD::<i64>::read_npy(&mut cursor) {
        return to_volume_shape(convert_labels(array)?);
    }

    cursor.set_position(0);
    if let Ok(array) = ArrayD::<u64>::read_npy(&mut cursor) {
        return to_volume_shape(convert_labels(array)?);
    }

    Err(FormatError::invalid_format(
        "unsupported dtype for a label volume (expected an integer array)",
    ))
}

fn convert_labels<T>(array: ArrayD<T>) -> Result<ArrayD<Label>, FormatError>
where
    T: Copy + std::fmt::Display + TryInto<Label>,
{
    let mut out = ArrayD::<Label>::zeros(array.raw_dim());
    for (dst, &src) in out.iter_mut().zip(array.iter()) {
        *dst = src.try_into().map_err(|_| {
            FormatError::invalid_format(format!("label value {src} is not a valid structure id"))
        })?;
    }
    Ok(out)
}

fn to_volume_shape(array: ArrayD<Label>) -> Result<Array3<Label>, FormatError> {
    log::debug!("npy: label array shape = {:?}", array.shape());
    match array.ndim() {
        2 => {
            let shape = array.shape();
            let (y, x) = (shape[0], shape[1]);
            Ok(array.into_shape_with_order((1, y, x))?)
        }
        3 => Ok(array.into_dimensionality::<Ix3>()?),
        n => Err(FormatError::invalid_format(format!(
            "unsupported array dimensions: {n} (expected 2 or 3)"
        ))),
    }
}

/// Write a `u32` volume (label or overlay) as `.npy`.
pub fn write_volume(path: &Path, data: &Array3<u32>) -> Result<(), FormatError> {
    let writer = BufWriter::new(File::create(path)?);
    data.write_npy(writer)?;
    log::debug!("npy: wrote {:?} with shape {:?}", path, data.shape());
    Ok(())
}

/// Read a `u32` volume written by [`write_volume`].
pub fn read_volume(path: &Path) -> Result<Array3<u32>, FormatError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(Array3::<u32>::read_npy(reader)?)
}
