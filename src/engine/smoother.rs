//! Motion-adaptive temporal averaging engine
//!
//! The default denoiser engine: each emitted pixel is the average of the
//! corresponding pixels in the frames still inside the window, scanning
//! forward in time and stopping at the first sample that falls outside the
//! zero-motion tolerance. Static detail is averaged down to its true
//! value; anything that moves keeps its own sample and stays sharp.
//!
//! With a zero tolerance only identical samples are folded together, which
//! makes the smoother an exact identity filter — handy for verifying the
//! pipeline end to end.
//!
//! ```
//! use tvd_lib::engine::{EngineConfig, MotionDenoiser, PixelY, TemporalSmoother};
//!
//! let config = EngineConfig {
//!     frame_window: 2,
//!     width: 4,
//!     height: 2,
//!     search_radius_x: 8,
//!     search_radius_y: 8,
//!     z_threshold: 2,
//!     threshold: 3,
//!     match_count_throttle: 15,
//!     match_size_throttle: 3,
//! };
//! let mut smoother = TemporalSmoother::<PixelY>::new(&config).unwrap();
//! smoother.add_frame(&[PixelY(10); 8]).unwrap();
//! // The window is not full yet, so nothing is ready.
//! assert!(smoother.frame_ready_for_output().is_none());
//! ```

use std::collections::VecDeque;

use super::{EngineConfig, EnginePixel, MotionDenoiser, PixelCbCr, PixelY, ReferenceFrame, Tolerance};
use crate::error::{Error, Result};

/// A pixel the smoother knows how to average.
pub trait SmoothPixel: EnginePixel {
    /// Add this pixel's components into the accumulator.
    fn accumulate(&self, acc: &mut [u32; 2]);

    /// Rounded mean of `count` accumulated pixels.
    fn from_mean(acc: [u32; 2], count: u32) -> Self;
}

impl SmoothPixel for PixelY {
    fn accumulate(&self, acc: &mut [u32; 2]) {
        acc[0] += u32::from(self.0);
    }

    fn from_mean(acc: [u32; 2], count: u32) -> Self {
        PixelY(((acc[0] + count / 2) / count) as u8)
    }
}

impl SmoothPixel for PixelCbCr {
    fn accumulate(&self, acc: &mut [u32; 2]) {
        acc[0] += u32::from(self.0);
        acc[1] += u32::from(self.1);
    }

    fn from_mean(acc: [u32; 2], count: u32) -> Self {
        PixelCbCr(
            ((acc[0] + count / 2) / count) as u8,
            ((acc[1] + count / 2) / count) as u8,
        )
    }
}

/// Temporal averaging denoiser over a bounded frame window.
#[derive(Debug)]
pub struct TemporalSmoother<P: SmoothPixel> {
    window: usize,
    frame_len: usize,
    tolerance: Tolerance,
    pending: VecDeque<Vec<P>>,
    emitted: Option<ReferenceFrame<P>>,
}

impl<P: SmoothPixel> TemporalSmoother<P> {
    /// Build a smoother from the engine configuration. The search radii
    /// and match throttles are accepted for contract parity; a zero-motion
    /// smoother has no block search to throttle.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        if config.plane_len() == 0 {
            return Err(Error::init("smoother needs a non-empty plane"));
        }
        if config.frame_window == 0 {
            return Err(Error::init("smoother needs a frame window of at least 1"));
        }
        Ok(TemporalSmoother {
            window: config.frame_window,
            frame_len: config.plane_len(),
            tolerance: P::make_tolerance(config.z_threshold),
            pending: VecDeque::with_capacity(config.frame_window + 1),
            emitted: None,
        })
    }

    /// Number of frames currently buffered.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pop the oldest frame and average each of its pixels with the later
    /// samples that remain within the zero-motion tolerance.
    fn emit_front(&mut self) -> Option<&ReferenceFrame<P>> {
        let frame = self.pending.pop_front()?;
        let mut values = Vec::with_capacity(frame.len());
        for (index, pixel) in frame.iter().enumerate() {
            let mut acc = [0u32; 2];
            pixel.accumulate(&mut acc);
            let mut count = 1u32;
            for later in &self.pending {
                let sample = later[index];
                if !pixel.is_within_tolerance(&sample, self.tolerance) {
                    break;
                }
                sample.accumulate(&mut acc);
                count += 1;
            }
            values.push(P::from_mean(acc, count));
        }
        self.emitted = Some(ReferenceFrame::from_values(values));
        self.emitted.as_ref()
    }
}

impl<P: SmoothPixel> MotionDenoiser<P> for TemporalSmoother<P> {
    fn purge(&mut self) {
        // The smoother keeps no match history beyond the pending frames
        // themselves, so there is nothing to trim.
    }

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

#[cfg(test)]
mod tests {
    use super::*;

    fn config(window: usize, z_threshold: u8) -> EngineConfig {
        EngineConfig {
            frame_window: window,
            width: 4,
            height: 1,
            search_radius_x: 8,
            search_radius_y: 8,
            z_threshold,
            threshold: 3,
            match_count_throttle: 15,
            match_size_throttle: 3,
        }
    }

    fn staged(values: &[u8]) -> Vec<PixelY> {
        values.iter().map(|&v| PixelY(v)).collect()
    }

    #[test]
    fn test_static_pixels_average() {
        let mut smoother = TemporalSmoother::<PixelY>::new(&config(2, 4)).unwrap();
        smoother.add_frame(&staged(&[10, 20, 30, 40])).unwrap();
        smoother.add_frame(&staged(&[12, 20, 30, 44])).unwrap();

        let frame = smoother.frame_ready_for_output().expect("window full");
        // 10 and 12 sit within the tolerance of 4: mean 11.
        assert_eq!(frame.pixel(0).value(), PixelY(11));
        assert_eq!(frame.pixel(1).value(), PixelY(20));
        // 40 vs 44 is on the boundary and still averages.
        assert_eq!(frame.pixel(3).value(), PixelY(42));
    }

    #[test]
    fn test_motion_stops_the_average() {
        let mut smoother = TemporalSmoother::<PixelY>::new(&config(2, 4)).unwrap();
        smoother.add_frame(&staged(&[10, 10, 10, 10])).unwrap();
        smoother.add_frame(&staged(&[100, 10, 10, 10])).unwrap();

        let frame = smoother.frame_ready_for_output().expect("window full");
        // The moving pixel keeps its own sample.
        assert_eq!(frame.pixel(0).value(), PixelY(10));
        assert_eq!(frame.pixel(1).value(), PixelY(10));
    }

    #[test]
    fn test_zero_tolerance_is_identity() {
        let mut smoother = TemporalSmoother::<PixelY>::new(&config(1, 0)).unwrap();
        smoother.add_frame(&staged(&[10, 20, 30, 40])).unwrap();
        smoother.add_frame(&staged(&[50, 60, 70, 80])).unwrap();

        let first = smoother.frame_ready_for_output().expect("window full");
        assert_eq!(
            (0..4).map(|i| first.pixel(i).value().0).collect::<Vec<_>>(),
            vec![10, 20, 30, 40]
        );
        let second = smoother.remaining_frames().expect("drain");
        assert_eq!(
            (0..4).map(|i| second.pixel(i).value().0).collect::<Vec<_>>(),
            vec![50, 60, 70, 80]
        );
        assert!(smoother.remaining_frames().is_none());
    }

    #[test]
    fn test_chroma_averages_componentwise() {
        let cfg = EngineConfig {
            width: 2,
            height: 1,
            ..config(2, 5)
        };
        let mut smoother = TemporalSmoother::<PixelCbCr>::new(&cfg).unwrap();
        smoother
            .add_frame(&[PixelCbCr(10, 20), PixelCbCr(0, 0)])
            .unwrap();
        smoother
            .add_frame(&[PixelCbCr(13, 24), PixelCbCr(200, 200)])
            .unwrap();

        let frame = smoother.frame_ready_for_output().expect("window full");
        // (3, 4) away: squared distance 25 == 5^2, inside the tolerance.
        assert_eq!(frame.pixel(0).value(), PixelCbCr(12, 22));
        // Far apart: the old sample survives untouched.
        assert_eq!(frame.pixel(1).value(), PixelCbCr(0, 0));
    }

    #[test]
    fn test_rejects_empty_plane() {
        let cfg = EngineConfig {
            width: 0,
            height: 0,
            ..config(2, 5)
        };
        assert!(TemporalSmoother::<PixelY>::new(&cfg).is_err());
    }
}
