//! Label volumes and the data that travels with them.
//!
//! This module provides:
//! - `LabelVolume`: immutable 3D structure-id grid, one per side
//! - `PropertyTable`: opaque per-side structure properties
//! - `npy`: NumPy `.npy` reading/writing for label and overlay volumes

pub mod npy;
mod properties;
mod volume;

pub use properties::PropertyTable;
pub(crate) use properties::{csv_escape, split_csv_line};
pub use volume::LabelVolume;
