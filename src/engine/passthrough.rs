//! A delay-line engine that emits frames unmodified
//!
//! `Passthrough` honours the full [`MotionDenoiser`] contract — windowed
//! buffering, mid-stream emission, end-of-input drain — without touching a
//! single pixel. It stands in for the real engine when only the pipeline's
//! plumbing is of interest, and doubles as an identity filter.

use std::collections::VecDeque;

use super::{EnginePixel, MotionDenoiser, ReferenceFrame};
use crate::error::{Error, Result};

/// Windowed FIFO delay line over staged frames.
#[derive(Debug)]
pub struct Passthrough<P: EnginePixel> {
    window: usize,
    frame_len: usize,
    pending: VecDeque<Vec<P>>,
    emitted: Option<ReferenceFrame<P>>,
}

impl<P: EnginePixel> Passthrough<P> {
    /// Create a delay line holding up to `window` frames of `frame_len`
    /// pixels each.
    pub fn new(window: usize, frame_len: usize) -> Self {
        let window = window.max(1);
        Passthrough {
            window,
            frame_len,
            pending: VecDeque::with_capacity(window + 1),
            emitted: None,
        }
    }

    /// Number of frames currently buffered.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn emit_front(&mut self) -> Option<&ReferenceFrame<P>> {
        let frame = self.pending.pop_front()?;
        self.emitted = Some(ReferenceFrame::from_values(frame));
        self.emitted.as_ref()
    }
}

impl<P: EnginePixel> MotionDenoiser<P> for Passthrough<P> {
    fn purge(&mut self) {}

    fn add_frame(&mut self, staging: &[P]) -> Result<()> {
        if staging.len() != self.frame_len {
            return Err(Error::engine(format!(
                "staged frame has {} pixels, expected {}",
                staging.len(),
                self.frame_len
            )));
        }
        self.pending.push_back(staging.to_vec());
        Ok(())
    }

    fn frame_ready_for_output(&mut self) -> Option<&ReferenceFrame<P>> {
        if self.pending.len() >= self.window {
            self.emit_front()
        } else {
            None
        }
    }

    fn remaining_frames(&mut self) -> Option<&ReferenceFrame<P>> {
        if self.pending.is_empty() {
            None
        } else {
            self.emit_front()
        }
    }
}
