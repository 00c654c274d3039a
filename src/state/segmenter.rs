//! Segmentation backends run by the background worker.

use std::collections::VecDeque;

use ndarray::{Array3, ArrayView3};
use thiserror::Error;

use crate::data::{LabelVolume, PropertyTable};
use crate::model::{Label, Side};

/// Errors from the segmentation worker or a segmenter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// The worker thread could not be started
    #[error("Failed to spawn segmentation thread: {0}")]
    Spawn(String),

    /// The worker thread is gone
    #[error("Segmentation worker disconnected")]
    Disconnected,

    /// The segmenter rejected its input or failed
    #[error("Segmentation of volume {side} failed: {message}")]
    Segmentation { side: Side, message: String },
}

impl WorkerError {
    pub fn segmentation(side: Side, message: impl Into<String>) -> Self {
        Self::Segmentation {
            side,
            message: message.into(),
        }
    }
}

/// Output of a segmentation run.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub volume: LabelVolume,
    /// Per-structure properties computed alongside, if the backend has any
    pub properties: Option<PropertyTable>,
}

/// Turns an intensity volume into a label volume.
///
/// Implementations run on the worker thread, one request at a time.
pub trait Segmenter: Send {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn segment(
        &mut self,
        side: Side,
        image: ArrayView3<'_, f32>,
    ) -> Result<Segmentation, WorkerError>;
}

/// Stand-in backend: 6-connected components above a threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSegmenter {
    pub threshold: f32,
    pub min_voxels: usize,
}

impl ThresholdSegmenter {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            min_voxels: 1,
        }
    }

    pub fn with_min_voxels(mut self, min_voxels: usize) -> Self {
        self.min_voxels = min_voxels.max(1);
        self
    }
}

const NEIGHBORS: [(isize, isize, isize); 6] = [
    (-1, 0, 0),
    (1, 0, 0),
    (0, -1, 0),
    (0, 1, 0),
    (0, 0, -1),
    (0, 0, 1),
];

impl Segmenter for ThresholdSegmenter {
    fn name(&self) -> &str {
        "threshold"
    }

    fn segment(
        &mut self,
        side: Side,
        image: ArrayView3<'_, f32>,
    ) -> Result<Segmentation, WorkerError> {
        if image.iter().any(|v| v.is_nan()) {
            return Err(WorkerError::segmentation(side, "image contains NaN"));
        }

        let dim = image.dim();
        let mut labels = Array3::<Label>::zeros(dim);
        let mut visited = Array3::<bool>::from_elem(dim, false);
        let mut stats: Vec<ComponentStats> = Vec::new();
        let mut queue = VecDeque::new();

        for ((z, y, x), &value) in image.indexed_iter() {
            if visited[[z, y, x]] || value <= self.threshold {
                continue;
            }

            // Flood the component, remembering its voxels
            let mut voxels = Vec::new();
            visited[[z, y, x]] = true;
            queue.push_back((z, y, x));
            while let Some(p) = queue.pop_front() {
                voxels.push(p);
                for n in neighbors(p, dim) {
                    if !visited[n] && image[n] > self.threshold {
                        visited[n] = true;
                        queue.push_back((n[0], n[1], n[2]));
                    }
                }
            }

            if voxels.len() < self.min_voxels {
                continue;
            }
            let label = Label::try_from(stats.len() + 1).map_err(|_| {
                WorkerError::segmentation(side, "more components than label ids")
            })?;
            for &(vz, vy, vx) in &voxels {
                labels[[vz, vy, vx]] = label;
            }
            stats.push(ComponentStats::from_voxels(label, &voxels));
        }

        log::debug!(
            "{} segmenter: volume {} -> {} components",
            self.name(),
            side,
            stats.len()
        );
        Ok(Segmentation {
            volume: LabelVolume::new(labels),
            properties: Some(properties_table(&stats)),
        })
    }
}

fn neighbors(
    (z, y, x): (usize, usize, usize),
    (dz, dy, dx): (usize, usize, usize),
) -> impl Iterator<Item = [usize; 3]> {
    NEIGHBORS.iter().filter_map(move |&(oz, oy, ox)| {
        let nz = z.checked_add_signed(oz).filter(|&v| v < dz)?;
        let ny = y.checked_add_signed(oy).filter(|&v| v < dy)?;
        let nx = x.checked_add_signed(ox).filter(|&v| v < dx)?;
        Some([nz, ny, nx])
    })
}

struct ComponentStats {
    label: Label,
    voxels: usize,
    centroid: [f64; 3],
}

impl ComponentStats {
    fn from_voxels(label: Label, voxels: &[(usize, usize, usize)]) -> Self {
        let mut sum = [0.0f64; 3];
        for &(z, y, x) in voxels {
            sum[0] += z as f64;
            sum[1] += y as f64;
            sum[2] += x as f64;
        }
        let n = voxels.len() as f64;
        Self {
            label,
            voxels: voxels.len(),
            centroid: sum.map(|s| s / n),
        }
    }
}

fn properties_table(stats: &[ComponentStats]) -> PropertyTable {
    let header = ["label", "voxels", "centroid_z", "centroid_y", "centroid_x"];
    stats.iter().fold(
        PropertyTable::new(header.iter().map(|s| s.to_string()).collect()),
        |table, s| {
            table.with_row([
                s.label.to_string(),
                s.voxels.to_string(),
                format!("{:.2}", s.centroid[0]),
                format!("{:.2}", s.centroid[1]),
                format!("{:.2}", s.centroid[2]),
            ])
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_components() {
        // Two blobs in one slice separated by a dark column
        #[rustfmt::skip]
        let image = Array3::from_shape_vec((1, 3, 4), vec![
            0.9, 0.0, 0.8, 0.8,
            0.9, 0.0, 0.0, 0.8,
            0.0, 0.0, 0.0, 0.0,
        ]).unwrap();

        let mut segmenter = ThresholdSegmenter::new(0.5);
        let result = segmenter.segment(Side::A, image.view()).unwrap();
        let labels: Vec<Label> = result.volume.data().iter().copied().collect();
        assert_eq!(labels, vec![1, 0, 2, 2, 1, 0, 0, 2, 0, 0, 0, 0]);

        let props = result.properties.unwrap();
        assert_eq!(props.rows.len(), 2);
        assert_eq!(props.rows[1][..2], ["2".to_string(), "3".to_string()]);
    }

    #[test]
    fn test_min_voxels_drops_small_components() {
        let image = Array3::from_shape_vec((2, 1, 3), vec![1.0, 0.0, 1.0, 1.0, 0.0, 0.0]).unwrap();
        let mut segmenter = ThresholdSegmenter::new(0.5).with_min_voxels(2);
        let result = segmenter.segment(Side::B, image.view()).unwrap();
        assert_eq!(result.volume.labels().collect::<Vec<_>>(), vec![1]);
        assert_eq!(result.volume.label_at(0, 0, 2), Some(0));
    }

    #[test]
    fn test_nan_rejected() {
        let image = Array3::from_elem((1, 1, 1), f32::NAN);
        let err = ThresholdSegmenter::new(0.0)
            .segment(Side::A, image.view())
            .unwrap_err();
        assert!(matches!(err, WorkerError::Segmentation { side: Side::A, .. }));
    }
}
