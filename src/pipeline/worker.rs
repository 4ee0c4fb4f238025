//! Chroma worker: runs the colour lane off the caller thread
//!
//! The worker cycles through a three-phase slot — waiting for a frame,
//! given a frame, finished a frame — guarded by the usual shell. One
//! submission travels as an owned [`ChromaJob`]: the caller copies the
//! chroma input planes in, the worker denoises into the job's output
//! buffers, and the caller copies the result out after waiting. The job
//! allocation is reused across frames.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use super::plane::ChromaLane;
use super::sync::Shared;
use super::FrameVerdict;
use crate::error::Result;

/// Where the worker is in its frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    WaitingForFrame,
    GivenFrame,
    FinishedFrame,
}

/// One chroma submission travelling between the caller and the worker.
#[derive(Debug)]
pub(crate) struct ChromaJob {
    pub frame_index: u64,
    /// End-of-input drain rather than a fresh frame.
    pub flush: bool,
    pub input_cb: Vec<u8>,
    pub input_cr: Vec<u8>,
    pub output_cb: Vec<u8>,
    pub output_cr: Vec<u8>,
}

impl ChromaJob {
    pub fn sized(chroma_len: usize) -> Self {
        ChromaJob {
            frame_index: 0,
            flush: false,
            input_cb: vec![0; chroma_len],
            input_cr: vec![0; chroma_len],
            output_cb: vec![0; chroma_len],
            output_cr: vec![0; chroma_len],
        }
    }
}

#[derive(Debug)]
struct Slot {
    phase: Phase,
    job: Option<ChromaJob>,
    outcome: Option<Result<FrameVerdict>>,
}

/// Handle to the chroma worker thread.
pub(crate) struct ChromaWorker {
    shared: Arc<Shared<Slot>>,
    handle: Option<JoinHandle<()>>,
}

impl ChromaWorker {
    /// Move the chroma lane into a fresh worker thread.
    pub fn spawn(mut lane: ChromaLane) -> Self {
        let shared = Arc::new(Shared::new(Slot {
            phase: Phase::WaitingForFrame,
            job: None,
            outcome: None,
        }));
        let worker = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            worker_loop(&worker, &mut lane);
            debug!("chroma worker stopped");
        });
        ChromaWorker {
            shared,
            handle: Some(handle),
        }
    }

    /// Hand the worker a frame. Must be paired with `wait_for_add_frame`
    /// before the next submission.
    pub fn add_frame(&self, job: ChromaJob) {
        let mut guard = self.shared.lock();
        debug_assert_eq!(guard.inner.phase, Phase::WaitingForFrame);
        debug_assert!(guard.inner.job.is_none());
        guard.inner.job = Some(job);
        guard.inner.phase = Phase::GivenFrame;
        self.shared.signal_input(&mut guard);
    }

    /// Wait for the submitted frame to finish and take back the job with
    /// the lane's verdict.
    pub fn wait_for_add_frame(&self) -> (ChromaJob, Result<FrameVerdict>) {
        let mut guard = self.shared.lock();
        debug_assert_ne!(guard.inner.phase, Phase::WaitingForFrame);
        if guard.inner.phase != Phase::FinishedFrame {
            guard = self.shared.wait_for_output(guard);
        }
        debug_assert_eq!(guard.inner.phase, Phase::FinishedFrame);
        let job = guard
            .inner
            .job
            .take()
            .expect("chroma worker finished without a job");
        let outcome = guard
            .inner
            .outcome
            .take()
            .expect("chroma worker finished without an outcome");
        guard.inner.phase = Phase::WaitingForFrame;
        (job, outcome)
    }

    /// Stop the worker and reclaim its thread. Safe to call repeatedly.
    pub fn force_shutdown(&mut self) {
        self.shared.request_stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("chroma worker thread panicked");
            }
        }
    }
}

impl Drop for ChromaWorker {
    fn drop(&mut self) {
        self.force_shutdown();
    }
}

/// Worker loop: wait for a submission, denoise it, publish the outcome.
/// An error outcome does not stop the loop; it is reported through
/// `wait_for_add_frame` and the worker stays available.
fn worker_loop(shared: &Shared<Slot>, lane: &mut ChromaLane) {
    loop {
        let mut job = {
            let mut guard = shared.lock();
            if guard.inner.phase != Phase::GivenFrame {
                guard = shared.wait_for_input(guard);
            }
            if !guard.keep_running {
                return;
            }
            debug_assert_eq!(guard.inner.phase, Phase::GivenFrame);
            match guard.inner.job.take() {
                Some(job) => job,
                None => return,
            }
        };

        let input = if job.flush {
            None
        } else {
            Some((job.input_cb.as_slice(), job.input_cr.as_slice()))
        };
        let outcome = lane.denoise(
            job.frame_index,
            input,
            (&mut job.output_cb, &mut job.output_cr),
        );

        let mut guard = shared.lock();
        guard.inner.job = Some(job);
        guard.inner.outcome = Some(outcome);
        guard.inner.phase = Phase::FinishedFrame;
        shared.signal_output(&mut guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Passthrough, PixelCbCr};
    use crate::pipeline::Interlacing;

    fn worker_with_passthrough(chroma_len: usize) -> ChromaWorker {
        let engine = Box::new(Passthrough::<PixelCbCr>::new(1, chroma_len));
        let lane = ChromaLane::new(engine, chroma_len, 1, Interlacing::Progressive, 1);
        ChromaWorker::spawn(lane)
    }

    #[test]
    fn test_submit_then_wait_roundtrip() {
        let mut worker = worker_with_passthrough(4);

        let mut job = ChromaJob::sized(4);
        job.input_cb.copy_from_slice(&[1, 2, 3, 4]);
        job.input_cr.copy_from_slice(&[5, 6, 7, 8]);
        worker.add_frame(job);
        let (job, outcome) = worker.wait_for_add_frame();
        assert_eq!(outcome.unwrap(), FrameVerdict::Swallowed);

        let mut flush = job;
        flush.flush = true;
        flush.frame_index = 1;
        worker.add_frame(flush);
        let (job, outcome) = worker.wait_for_add_frame();
        assert_eq!(outcome.unwrap(), FrameVerdict::Emitted);
        assert_eq!(job.output_cb, vec![1, 2, 3, 4]);
        assert_eq!(job.output_cr, vec![5, 6, 7, 8]);

        worker.force_shutdown();
    }

    #[test]
    fn test_shutdown_while_idle() {
        let mut worker = worker_with_passthrough(4);
        worker.force_shutdown();
        // A second shutdown is a no-op.
        worker.force_shutdown();
    }
}
