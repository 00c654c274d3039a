//! Background thread for segmentation (native only)
//!
//! Segmenting a volume can take seconds, so it runs on its own thread. The
//! interactive thread never blocks on it: results queue up in a channel and
//! are applied to the [`MatchEngine`] only when [`SegmentationWorker::apply_pending`]
//! drains them. The worker never sees the match store or the selection; a
//! finished volume travels as an `Arc<LabelVolume>` and is swapped in whole.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ndarray::Array3;

use super::segmenter::{Segmenter, WorkerError};
use crate::data::{LabelVolume, PropertyTable};
use crate::matching::MatchEngine;
use crate::model::{Side, SidePair};

/// Request to segment an intensity volume, sent to the background thread.
struct SegmentRequest {
    id: u64,
    side: Side,
    image: Array3<f32>,
}

/// Message sent to the worker thread.
enum ThreadMessage {
    Segment(SegmentRequest),
    Shutdown,
}

/// A finished segmentation, ready to replace a side's volume.
#[derive(Debug, Clone)]
pub struct VolumeReplacement {
    /// Request this answers
    pub request_id: u64,
    pub side: Side,
    pub volume: Arc<LabelVolume>,
    pub properties: Option<PropertyTable>,
}

/// Message coming back from the worker thread.
#[derive(Debug, Clone)]
pub enum WorkerResult {
    Replaced(VolumeReplacement),
    Failed {
        request_id: u64,
        side: Side,
        error: WorkerError,
    },
}

impl WorkerResult {
    pub fn request_id(&self) -> u64 {
        match self {
            WorkerResult::Replaced(r) => r.request_id,
            WorkerResult::Failed { request_id, .. } => *request_id,
        }
    }

    pub fn side(&self) -> Side {
        match self {
            WorkerResult::Replaced(r) => r.side,
            WorkerResult::Failed { side, .. } => *side,
        }
    }
}

/// What a drain did for one result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The side's volume was replaced
    Replaced(Side),
    /// A newer request for the same side was pending; the result was dropped
    Superseded { side: Side, request_id: u64 },
    /// Segmentation failed; the old volume stays
    Failed(WorkerError),
}

/// Manages the background segmentation thread.
pub struct SegmentationWorker {
    request_tx: Sender<ThreadMessage>,
    result_rx: Receiver<WorkerResult>,
    thread_handle: Option<JoinHandle<()>>,
    next_id: u64,
    /// Latest request id per side that has not been answered yet
    pending: SidePair<Option<u64>>,
}

impl SegmentationWorker {
    /// Spawn the worker thread around `segmenter`.
    pub fn spawn(segmenter: Box<dyn Segmenter>) -> Result<Self, WorkerError> {
        let (request_tx, request_rx) = mpsc::channel::<ThreadMessage>();
        let (result_tx, result_rx) = mpsc::channel::<WorkerResult>();

        let thread_handle = thread::Builder::new()
            .name("segmentation".to_string())
            .spawn(move || {
                log::info!("Segmentation thread started ({})", segmenter.name());
                Self::thread_loop(segmenter, request_rx, result_tx);
                log::info!("Segmentation thread exiting");
            })
            .map_err(|e| WorkerError::Spawn(e.to_string()))?;

        Ok(Self {
            request_tx,
            result_rx,
            thread_handle: Some(thread_handle),
            next_id: 0,
            pending: SidePair::default(),
        })
    }

    fn thread_loop(
        mut segmenter: Box<dyn Segmenter>,
        request_rx: Receiver<ThreadMessage>,
        result_tx: Sender<WorkerResult>,
    ) {
        loop {
            match request_rx.recv() {
                Ok(ThreadMessage::Segment(request)) => {
                    let result = Self::run(segmenter.as_mut(), request);
                    if result_tx.send(result).is_err() {
                        log::warn!("Result channel closed, segmentation thread exiting");
                        break;
                    }
                }
                Ok(ThreadMessage::Shutdown) => {
                    log::debug!("Received shutdown signal");
                    break;
                }
                Err(_) => {
                    log::debug!("Request channel closed, segmentation thread exiting");
                    break;
                }
            }
        }
    }

    fn run(segmenter: &mut dyn Segmenter, request: SegmentRequest) -> WorkerResult {
        let SegmentRequest { id, side, image } = request;
        log::debug!("Segmenting volume {} (request {}, {:?})", side, id, image.dim());
        match segmenter.segment(side, image.view()) {
            Ok(segmentation) => WorkerResult::Replaced(VolumeReplacement {
                request_id: id,
                side,
                volume: Arc::new(segmentation.volume),
                properties: segmentation.properties,
            }),
            Err(error) => WorkerResult::Failed {
                request_id: id,
                side,
                error,
            },
        }
    }

    /// Queue segmentation of `image` for `side`. Returns the request id.
    ///
    /// A newer request for the same side makes older ones stale: their
    /// results are dropped when drained.
    pub fn request(&mut self, side: Side, image: Array3<f32>) -> Result<u64, WorkerError> {
        let id = self.next_id;
        self.request_tx
            .send(ThreadMessage::Segment(SegmentRequest { id, side, image }))
            .map_err(|_| WorkerError::Disconnected)?;
        self.next_id += 1;
        self.pending.replace(side, Some(id));
        log::debug!("Sent segmentation request {} for volume {}", id, side);
        Ok(id)
    }

    /// Whether a request for `side` is still unanswered.
    pub fn is_pending(&self, side: Side) -> bool {
        self.pending.get(side).is_some()
    }

    pub fn pending_count(&self) -> usize {
        Side::ALL.iter().filter(|&&s| self.is_pending(s)).count()
    }

    /// Take one completed result, if any. Non-blocking.
    pub fn take_one_result(&mut self) -> Option<WorkerResult> {
        match self.result_rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Segmentation thread disconnected");
                None
            }
        }
    }

    /// Wait up to `timeout` for one completed result.
    pub fn wait_result(&mut self, timeout: Duration) -> Result<Option<WorkerResult>, WorkerError> {
        match self.result_rx.recv_timeout(timeout) {
            Ok(result) => Ok(Some(result)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    /// Apply one result to `engine`.
    pub fn apply(&mut self, engine: &mut MatchEngine, result: WorkerResult) -> Applied {
        let side = result.side();
        let request_id = result.request_id();
        if *self.pending.get(side) != Some(request_id) {
            log::warn!(
                "Dropping segmentation result {} for volume {}: superseded",
                request_id,
                side
            );
            return Applied::Superseded { side, request_id };
        }
        self.pending.replace(side, None);

        match result {
            WorkerResult::Replaced(replacement) => {
                engine.replace_volume(side, replacement.volume);
                engine.set_structure_properties(side, replacement.properties);
                Applied::Replaced(side)
            }
            WorkerResult::Failed { error, .. } => {
                log::error!("{}", error);
                Applied::Failed(error)
            }
        }
    }

    /// Drain every queued result into `engine`, oldest first.
    pub fn apply_pending(&mut self, engine: &mut MatchEngine) -> Vec<Applied> {
        let mut applied = Vec::new();
        while let Some(result) = self.take_one_result() {
            applied.push(self.apply(engine, result));
        }
        applied
    }
}

impl Drop for SegmentationWorker {
    fn drop(&mut self) {
        log::debug!("Shutting down segmentation thread");

        let _ = self.request_tx.send(ThreadMessage::Shutdown);

        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("Segmentation thread panicked: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::segmenter::{Segmentation, ThresholdSegmenter};
    use ndarray::ArrayView3;

    const WAIT: Duration = Duration::from_secs(10);

    /// Blob image with `n` separate bright voxels along x.
    fn blobs(n: usize) -> Array3<f32> {
        Array3::from_shape_fn((1, 1, 2 * n), |(_, _, x)| if x % 2 == 0 { 1.0 } else { 0.0 })
    }

    fn threshold_worker() -> SegmentationWorker {
        SegmentationWorker::spawn(Box::new(ThresholdSegmenter::new(0.5))).unwrap()
    }

    fn wait_and_apply(worker: &mut SegmentationWorker, engine: &mut MatchEngine) -> Applied {
        let result = worker.wait_result(WAIT).unwrap().expect("worker timed out");
        worker.apply(engine, result)
    }

    #[test]
    fn test_replacement_applied_on_drain() {
        let mut worker = threshold_worker();
        let mut engine = MatchEngine::new();

        worker.request(Side::A, blobs(3)).unwrap();
        assert!(worker.is_pending(Side::A));
        assert!(engine.volume(Side::A).is_none(), "nothing applied before drain");

        assert_eq!(wait_and_apply(&mut worker, &mut engine), Applied::Replaced(Side::A));
        assert!(!worker.is_pending(Side::A));
        assert_eq!(engine.volume(Side::A).unwrap().label_count(), 3);
        assert!(engine.structure_properties(Side::A).is_some());
    }

    #[test]
    fn test_pending_pick_cleared_by_swap() {
        let mut worker = threshold_worker();
        let mut engine = MatchEngine::new();
        worker.request(Side::B, blobs(2)).unwrap();

        // Picks stay allowed while segmentation runs
        engine.pick(Side::B, 1).unwrap();
        assert_eq!(engine.pending(Side::B), Some(1));

        wait_and_apply(&mut worker, &mut engine);
        assert_eq!(engine.pending(Side::B), None);
    }

    #[test]
    fn test_stale_result_dropped() {
        let mut worker = threshold_worker();
        let mut engine = MatchEngine::new();
        let first = worker.request(Side::A, blobs(1)).unwrap();
        worker.request(Side::A, blobs(4)).unwrap();

        assert_eq!(
            wait_and_apply(&mut worker, &mut engine),
            Applied::Superseded {
                side: Side::A,
                request_id: first
            }
        );
        assert_eq!(wait_and_apply(&mut worker, &mut engine), Applied::Replaced(Side::A));
        assert_eq!(engine.volume(Side::A).unwrap().label_count(), 4);
    }

    struct Failing;

    impl Segmenter for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn segment(
            &mut self,
            side: Side,
            _image: ArrayView3<'_, f32>,
        ) -> Result<Segmentation, WorkerError> {
            Err(WorkerError::segmentation(side, "model not loaded"))
        }
    }

    #[test]
    fn test_failure_keeps_old_volume() {
        let mut worker = SegmentationWorker::spawn(Box::new(Failing)).unwrap();
        let mut engine = MatchEngine::new();
        let old = Arc::new(LabelVolume::from_shape_vec((1, 1, 1), vec![5]).unwrap());
        engine.replace_volume(Side::A, Arc::clone(&old));

        worker.request(Side::A, blobs(1)).unwrap();
        let applied = wait_and_apply(&mut worker, &mut engine);
        assert!(matches!(applied, Applied::Failed(WorkerError::Segmentation { .. })));
        assert!(Arc::ptr_eq(engine.volume(Side::A).unwrap(), &old));
        assert!(!worker.is_pending(Side::A));
    }
}
