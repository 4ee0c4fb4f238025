//! Denoiser engine contract and the engines shipped with TVD
//!
//! The pipeline treats the motion-search subsystem as an opaque
//! collaborator behind [`MotionDenoiser`]: it feeds staged pixel arrays in
//! and reads smoothed [`ReferenceFrame`]s back. Two implementations are
//! provided:
//!
//! - [`TemporalSmoother`]: motion-adaptive temporal averaging, the default
//!   engine used by the CLI
//! - [`Passthrough`]: a windowed delay line that emits frames unmodified,
//!   useful for plumbing checks and as an identity engine

pub mod passthrough;
pub mod pixel;
pub mod smoother;

pub use passthrough::Passthrough;
pub use pixel::{EnginePixel, PixelCbCr, PixelY, Tolerance};
pub use smoother::TemporalSmoother;

use crate::error::Result;

/// Configuration handed to an engine at construction.
///
/// For interlaced streams the pipeline hands each engine fields rather than
/// frames: `frame_window` is already doubled and `height` already halved by
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of reference frames the engine may hold.
    pub frame_window: usize,
    /// Plane width in pixels.
    pub width: usize,
    /// Plane height in pixels.
    pub height: usize,
    /// Horizontal motion-search radius.
    pub search_radius_x: usize,
    /// Vertical motion-search radius.
    pub search_radius_y: usize,
    /// Zero-motion tolerance (scalar; widened via `EnginePixel::make_tolerance`).
    pub z_threshold: u8,
    /// Motion-match tolerance (scalar).
    pub threshold: u8,
    /// Throttle on the number of candidate matches per block.
    pub match_count_throttle: usize,
    /// Throttle on the size of candidate matches per block.
    pub match_size_throttle: usize,
}

impl EngineConfig {
    /// Number of pixels in one staged frame.
    pub fn plane_len(&self) -> usize {
        self.width * self.height
    }
}

/// A denoised pixel inside a reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferencePixel<P> {
    value: P,
}

impl<P: EnginePixel> ReferencePixel<P> {
    /// Wrap a final pixel value.
    pub fn new(value: P) -> Self {
        ReferencePixel { value }
    }

    /// The final pixel value.
    pub fn value(&self) -> P {
        self.value
    }
}

/// A finished frame produced by an engine, indexable per pixel.
///
/// The pipeline never mutates reference frames; it reads each one exactly
/// once while re-materialising output planes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceFrame<P> {
    pixels: Vec<ReferencePixel<P>>,
}

impl<P: EnginePixel> ReferenceFrame<P> {
    /// Build a reference frame from final pixel values.
    pub fn from_values(values: Vec<P>) -> Self {
        ReferenceFrame {
            pixels: values.into_iter().map(ReferencePixel::new).collect(),
        }
    }

    /// The pixel at `index`. Panics when out of range, as the index space
    /// is fixed by the engine's plane dimensions.
    pub fn pixel(&self, index: usize) -> &ReferencePixel<P> {
        &self.pixels[index]
    }

    /// Number of pixels in the frame.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// True when the frame holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// The motion-search denoiser contract consumed by the pipeline.
///
/// `frame_ready_for_output` is polled before every `add_frame`;
/// `remaining_frames` drains the engine once input has ended. Returned
/// frame borrows end before the next engine call, so implementations may
/// reuse their output storage.
pub trait MotionDenoiser<P: EnginePixel>: Send {
    /// Release the engine's temporal working set. Invoked by the pipeline
    /// on its purge cadence; must be cheap when there is nothing to drop.
    fn purge(&mut self);

    /// Feed one staged frame (or field) to the engine.
    fn add_frame(&mut self, staging: &[P]) -> Result<()>;

    /// A frame ready for output mid-stream, if any.
    fn frame_ready_for_output(&mut self) -> Option<&ReferenceFrame<P>>;

    /// The next remaining frame during the end-of-input drain, if any.
    fn remaining_frames(&mut self) -> Option<&ReferenceFrame<P>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_frame_indexing() {
        let frame = ReferenceFrame::from_values(vec![PixelY(1), PixelY(2), PixelY(3)]);
        assert_eq!(frame.len(), 3);
        assert!(!frame.is_empty());
        assert_eq!(frame.pixel(0).value(), PixelY(1));
        assert_eq!(frame.pixel(2).value(), PixelY(3));
    }

    #[test]
    fn test_engine_config_plane_len() {
        let config = EngineConfig {
            frame_window: 2,
            width: 6,
            height: 4,
            search_radius_x: 8,
            search_radius_y: 8,
            z_threshold: 2,
            threshold: 3,
            match_count_throttle: 15,
            match_size_throttle: 3,
        };
        assert_eq!(config.plane_len(), 24);
    }
}
