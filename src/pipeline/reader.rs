//! Read stage: fills free pool buffers from the input stream
//!
//! The reader thread races ahead of the caller by up to the pool size,
//! blocking on the stream descriptor outside the pool lock. The caller
//! consumes published frames in strict stream order through
//! [`ReadStage::read_frame`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use super::pool::{PoolState, PoolStats};
use super::sync::{run_worker, Shared};
use crate::error::{Error, Result};
use crate::format::{FramePlanes, FrameSource};

/// Pipeline stage that reads ahead of the caller into a bounded pool.
pub struct ReadStage {
    shared: Arc<Shared<PoolState>>,
    handle: Option<JoinHandle<()>>,
    current: Option<FramePlanes>,
}

impl ReadStage {
    /// Spawn the reader thread over `source` with buffers of the given
    /// plane sizes.
    pub fn spawn(mut source: Box<dyn FrameSource>, luma_len: usize, chroma_len: usize) -> Self {
        let shared = Arc::new(Shared::new(PoolState::new(luma_len, chroma_len)));
        let worker = Arc::clone(&shared);
        let handle = thread::spawn(move || {
            run_worker(&worker, || read_one(&worker, source.as_mut()));
            debug!("read stage stopped");
        });
        ReadStage {
            shared,
            handle: Some(handle),
            current: None,
        }
    }

    /// Hand the caller the next frame in stream order. The returned planes
    /// stay valid until the next call, when the buffer is recycled. Once
    /// the pool drains after the worker has stopped, the worker's terminal
    /// status (normally `EndOfStream`) is returned instead.
    pub fn read_frame(&mut self) -> Result<&FramePlanes> {
        let mut guard = self.shared.lock();

        // Recycle the previously promoted buffer; if the pool had been
        // full, this is what lets the reader continue.
        if let Some(previous) = self.current.take() {
            guard.inner.push_free(previous);
            self.shared.signal_input(&mut guard);
        }

        if guard.inner.valid_is_empty() && guard.keep_running {
            guard = self.shared.wait_for_output(guard);
        }

        match guard.inner.pop_valid() {
            Some(frame) => {
                drop(guard);
                Ok(&*self.current.insert(frame))
            }
            None => {
                let status = guard.status.clone();
                drop(guard);
                Err(match status {
                    Err(err) => err,
                    Ok(()) => Error::EndOfStream,
                })
            }
        }
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

    /// Stop the worker and reclaim its thread. Safe to call repeatedly.
    pub fn force_shutdown(&mut self) {
        self.shared.request_stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("read stage thread panicked");
            }
        }
    }
}

impl Drop for ReadStage {
    fn drop(&mut self) {
        self.force_shutdown();
    }
}

/// One reader work cycle: claim a free buffer, fill it from the source,
/// publish it.
fn read_one(shared: &Shared<PoolState>, source: &mut dyn FrameSource) -> Result<()> {
    let mut frame = {
        let mut guard = shared.lock();
        if guard.inner.free_is_empty() && guard.keep_running {
            guard = shared.wait_for_input(guard);
        }
        match guard.inner.pop_free() {
            Some(frame) => frame,
            // Still nothing after the wait: we were asked to stop.
            None => return Err(Error::EndOfStream),
        }
    };

    match source.read_into(&mut frame) {
        Ok(()) => {
            let mut guard = shared.lock();
            guard.inner.push_valid(frame);
            shared.signal_output(&mut guard);
            Ok(())
        }
        Err(err) => {
            let mut guard = shared.lock();
            guard.inner.push_free(frame);
            drop(guard);
            Err(err)
        }
    }
}
