//! Background segmentation feeding volume replacements to the engine.

#[cfg(not(target_arch = "wasm32"))]
mod segmentation_worker;
mod segmenter;

#[cfg(not(target_arch = "wasm32"))]
pub use segmentation_worker::{Applied, SegmentationWorker, VolumeReplacement, WorkerResult};
pub use segmenter::{Segmentation, Segmenter, ThresholdSegmenter, WorkerError};
