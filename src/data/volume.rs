//! Label volumes produced by segmentation.

use std::collections::BTreeSet;

use ndarray::{Array3, ArrayView3};

use crate::model::{BACKGROUND, Label};

/// A 3D grid of structure ids with shape `(z, y, x)`.
///
/// `0` is background; every positive value identifies one structure
/// instance. A volume is never mutated after construction: new segmentation
/// results replace it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVolume {
    data: Array3<Label>,
    /// Labels present in `data`, background excluded
    labels: BTreeSet<Label>,
}

impl LabelVolume {
    /// Wrap a label array, indexing the labels it contains.
    pub fn new(data: Array3<Label>) -> Self {
        let labels: BTreeSet<Label> = data.iter().copied().filter(|&l| l != BACKGROUND).collect();
        log::debug!(
            "LabelVolume: shape {:?} with {} labels",
            data.shape(),
            labels.len()
        );
        Self { data, labels }
    }

    /// Build a volume from a flat `z * y * x` buffer in row-major order.
    pub fn from_shape_vec(
        shape: (usize, usize, usize),
        values: Vec<Label>,
    ) -> Result<Self, ndarray::ShapeError> {
        Ok(Self::new(Array3::from_shape_vec(shape, values)?))
    }

    pub fn data(&self) -> ArrayView3<'_, Label> {
        self.data.view()
    }

    /// Shape as `[z, y, x]`.
    pub fn shape(&self) -> [usize; 3] {
        let (z, y, x) = self.data.dim();
        [z, y, x]
    }

    /// Whether `label` occurs in the volume. Background is never "contained".
    pub fn contains(&self, label: Label) -> bool {
        self.labels.contains(&label)
    }

    /// All non-background labels in ascending order.
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.labels.iter().copied()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Largest label present, if any structure exists.
    pub fn max_label(&self) -> Option<Label> {
        self.labels.last().copied()
    }

    /// Label at voxel `(z, y, x)`, or `None` when out of bounds.
    ///
    /// This is how a viewer turns a hovered cursor position into a pick.
    pub fn label_at(&self, z: usize, y: usize, x: usize) -> Option<Label> {
        self.data.get((z, y, x)).copied()
    }
}
