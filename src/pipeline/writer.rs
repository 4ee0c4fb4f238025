//! Write stage: drains published pool buffers to the output stream
//!
//! Mirrors the read stage with the roles reversed: the caller claims free
//! buffers, fills them, and publishes; the writer thread flushes published
//! frames to the sink in submission order. The work loop keeps going while
//! published frames remain, so a shutdown request drains the pool before
//! the thread exits.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use super::pool::{PoolState, PoolStats};
use super::sync::Shared;
use crate::error::{Error, Result};
use crate::format::{FramePlanes, FrameSink};

/// Pipeline stage that writes behind the caller from a bounded pool.
pub struct WriteStage {
    shared: Arc<Shared<PoolState>>,
    handle: Option<JoinHandle<()>>,
    current: Option<FramePlanes>,
}

impl WriteStage {
    /// Spawn the writer thread over `sink` with buffers of the given plane
    /// sizes.
    pub fn spawn(mut sink: Box<dyn FrameSink>, luma_len: usize, chroma_len: usize) -> Self {
        let shared = Arc::new(Shared::new(PoolState::new(luma_len, chroma_len)));
        let worker = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            write_loop(&worker, sink.as_mut());
            debug!("write stage stopped");
        });
        WriteStage {
            shared,
            handle: Some(handle),
            current: None,
        }
    }

    /// Borrow a buffer for the caller to fill. A slot already claimed but
    /// not yet committed is handed back unchanged, so a caller whose frame
    /// was swallowed simply reuses it. Otherwise a free buffer is promoted,
    /// blocking while all buffers are queued behind the sink. Returns the
    /// worker's terminal status once it has stopped and the free list is
    /// exhausted.
    pub fn frame_slot(&mut self) -> Result<&mut FramePlanes> {
        if self.current.is_none() {
            let mut guard = self.shared.lock();
            if guard.inner.free_is_empty() && guard.keep_running {
                guard = self.shared.wait_for_input(guard);
            }
            match guard.inner.pop_free() {
                Some(frame) => {
                    drop(guard);
                    self.current = Some(frame);
                }
                None => {
                    let status = guard.status.clone();
                    drop(guard);
                    return Err(match status {
                        Err(err) => err,
                        Ok(()) => Error::EndOfStream,
                    });
                }
            }
        }
        match self.current.as_mut() {
            Some(frame) => Ok(frame),
            None => unreachable!("slot was just promoted"),
        }
    }

    /// Publish the filled slot to the writer thread.
    pub fn commit_frame(&mut self) -> Result<()> {
        let frame = self
            .current
            .take()
            .ok_or_else(|| Error::invalid_state("no frame slot to commit"))?;
        let mut guard = self.shared.lock();
        guard.inner.push_valid(frame);
        self.shared.signal_output(&mut guard);
        Ok(())
    }

    /// Current pool occupancy.
    pub fn pool_stats(&self) -> PoolStats {
        let guard = self.shared.lock();
        PoolStats {
            free: guard.inner.free_len(),
            valid: guard.inner.valid_len(),
            current: self.current.is_some(),
        }
    }

    /// Stop the worker and reclaim its thread; every committed frame
    /// reaches the sink first. Safe to call repeatedly.
    pub fn force_shutdown(&mut self) {
        self.shared.request_stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("write stage thread panicked");
            }
        }
    }
}

impl Drop for WriteStage {
    fn drop(&mut self) {
        self.force_shutdown();
    }
}

/// Drain-aware work loop: keeps flushing published frames after a stop
/// request, exiting only once the valid list is empty.
fn write_loop(shared: &Shared<PoolState>, sink: &mut dyn FrameSink) {
    loop {
        {
            let guard = shared.lock();
            if !guard.keep_running && guard.inner.valid_is_empty() {
                break;
            }
        }
        if let Err(err) = write_one(shared, sink) {
            shared.publish_exit(Err(err));
            break;
        }
    }
}

/// One writer work cycle: take the oldest published frame, flush it, and
/// recycle the buffer.
fn write_one(shared: &Shared<PoolState>, sink: &mut dyn FrameSink) -> Result<()> {
    let frame = {
        let mut guard = shared.lock();
        if guard.inner.valid_is_empty() && guard.keep_running {
            guard = shared.wait_for_output(guard);
        }
        match guard.inner.pop_valid() {
            Some(frame) => frame,
            // Still nothing after the wait: we were asked to stop.
            None => return Err(Error::EndOfStream),
        }
    };

    let outcome = sink.write_from(&frame);

    // The buffer is recycled whether or not the flush succeeded.
    let mut guard = shared.lock();
    guard.inner.push_free(frame);
    shared.signal_input(&mut guard);
    drop(guard);
    outcome
}
