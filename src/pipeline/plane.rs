//! Per-plane denoise lanes
//!
//! A lane owns one engine plus the staging array that marshals raw plane
//! bytes into engine pixels, and re-materialises reference frames back
//! into raw planes. Progressive processing feeds whole frames; interlaced
//! processing splits each frame into two field sub-events and weaves the
//! engine's output back into alternating rows.

use super::{FrameVerdict, Interlacing};
use crate::engine::{MotionDenoiser, PixelCbCr, PixelY, ReferenceFrame};
use crate::error::Result;

/// Intensity-plane lane. Always runs on the caller thread.
pub(crate) struct LumaLane {
    engine: Box<dyn MotionDenoiser<PixelY>>,
    staging: Vec<PixelY>,
    width: usize,
    height: usize,
    interlacing: Interlacing,
    purge_cadence: u64,
}

impl LumaLane {
    pub fn new(
        engine: Box<dyn MotionDenoiser<PixelY>>,
        width: usize,
        height: usize,
        interlacing: Interlacing,
        purge_cadence: u64,
    ) -> Self {
        let staging = vec![PixelY::default(); width * height / interlacing.factor()];
        LumaLane {
            engine,
            staging,
            width,
            height,
            interlacing,
            purge_cadence,
        }
    }

    /// Run the routine matching the configured field order.
    pub fn denoise(
        &mut self,
        frame_index: u64,
        input: Option<&[u8]>,
        output: &mut [u8],
    ) -> Result<FrameVerdict> {
        if self.interlacing.is_interlaced() {
            self.interlaced(frame_index, input, output)
        } else {
            self.progressive(frame_index, input, output)
        }
    }

    /// Progressive path: one frame per call. `None` input drains the
    /// engine instead of feeding it.
    pub fn progressive(
        &mut self,
        frame_index: u64,
        input: Option<&[u8]>,
        output: &mut [u8],
    ) -> Result<FrameVerdict> {
        self.maybe_purge(frame_index);

        match input {
            None => {
                let emitted = match self.engine.remaining_frames() {
                    Some(frame) => {
                        write_frame(frame, output);
                        true
                    }
                    None => false,
                };
                Ok(FrameVerdict::from_emitted(emitted))
            }
            Some(input) => {
                debug_assert_eq!(input.len(), self.staging.len());
                let emitted = match self.engine.frame_ready_for_output() {
                    Some(frame) => {
                        write_frame(frame, output);
                        true
                    }
                    None => false,
                };
                for (slot, &byte) in self.staging.iter_mut().zip(input) {
                    *slot = PixelY(byte);
                }
                self.engine.add_frame(&self.staging)?;
                Ok(FrameVerdict::from_emitted(emitted))
            }
        }
    }

    /// Interlaced path: two field sub-events per call, first the
    /// configured leading field, then its companion. Each sub-event weaves
    /// any emitted reference field into alternating output rows.
    pub fn interlaced(
        &mut self,
        frame_index: u64,
        input: Option<&[u8]>,
        output: &mut [u8],
    ) -> Result<FrameVerdict> {
        self.maybe_purge(frame_index);

        let lead = self.interlacing.field_mask();
        let mut emitted = false;
        for field in 0..2 {
            let mask = lead ^ field;
            match input {
                None => {
                    emitted = match self.engine.remaining_frames() {
                        Some(frame) => {
                            write_field(frame, output, self.width, mask);
                            true
                        }
                        None => false,
                    };
                }
                Some(input) => {
                    emitted = match self.engine.frame_ready_for_output() {
                        Some(frame) => {
                            write_field(frame, output, self.width, mask);
                            true
                        }
                        None => false,
                    };
                    self.stage_field(input, mask);
                    self.engine.add_frame(&self.staging)?;
                }
            }
        }
        Ok(FrameVerdict::from_emitted(emitted))
    }

    fn maybe_purge(&mut self, frame_index: u64) {
        if frame_index % self.purge_cadence == 0 {
            self.engine.purge();
        }
    }

    /// Pack the rows of one field into the staging array.
    fn stage_field(&mut self, input: &[u8], mask: usize) {
        debug_assert_eq!(input.len(), self.width * self.height);
        let mut index = 0;
        for y in (mask..self.height).step_by(2) {
            for &byte in &input[y * self.width..(y + 1) * self.width] {
                self.staging[index] = PixelY(byte);
                index += 1;
            }
        }
        debug_assert_eq!(index, self.staging.len());
    }
}

/// Re-materialise a full reference frame into the output plane.
fn write_frame(frame: &ReferenceFrame<PixelY>, output: &mut [u8]) {
    debug_assert_eq!(frame.len(), output.len());
    for (index, slot) in output.iter_mut().enumerate() {
        *slot = frame.pixel(index).value().0;
    }
}

/// Re-materialise a reference field into alternating output rows; rows of
/// the other field are left for the companion sub-event.
fn write_field(frame: &ReferenceFrame<PixelY>, output: &mut [u8], width: usize, mask: usize) {
    let mut index = 0;
    let mut y = mask;
    while index < frame.len() {
        let row = &mut output[y * width..(y + 1) * width];
        for slot in row {
            *slot = frame.pixel(index).value().0;
            index += 1;
        }
        y += 2;
    }
}

/// Colour-plane lane. Runs on the caller thread or inside the chroma
/// worker, depending on the thread policy.
pub(crate) struct ChromaLane {
    engine: Box<dyn MotionDenoiser<PixelCbCr>>,
    staging: Vec<PixelCbCr>,
    width: usize,
    height: usize,
    interlacing: Interlacing,
    purge_cadence: u64,
}

impl ChromaLane {
    pub fn new(
        engine: Box<dyn MotionDenoiser<PixelCbCr>>,
        width: usize,
        height: usize,
        interlacing: Interlacing,
        purge_cadence: u64,
    ) -> Self {
        let staging = vec![PixelCbCr::default(); width * height / interlacing.factor()];
        ChromaLane {
            engine,
            staging,
            width,
            height,
            interlacing,
            purge_cadence,
        }
    }

    /// Run the routine matching the configured field order.
    pub fn denoise(
        &mut self,
        frame_index: u64,
        input: Option<(&[u8], &[u8])>,
        output: (&mut [u8], &mut [u8]),
    ) -> Result<FrameVerdict> {
        if self.interlacing.is_interlaced() {
            self.interlaced(frame_index, input, output)
        } else {
            self.progressive(frame_index, input, output)
        }
    }

    pub fn progressive(
        &mut self,
        frame_index: u64,
        input: Option<(&[u8], &[u8])>,
        output: (&mut [u8], &mut [u8]),
    ) -> Result<FrameVerdict> {
        self.maybe_purge(frame_index);
        let (out_cb, out_cr) = output;

        match input {
            None => {
                let emitted = match self.engine.remaining_frames() {
                    Some(frame) => {
                        write_chroma_frame(frame, out_cb, out_cr);
                        true
                    }
                    None => false,
                };
                Ok(FrameVerdict::from_emitted(emitted))
            }
            Some((in_cb, in_cr)) => {
                debug_assert_eq!(in_cb.len(), self.staging.len());
                debug_assert_eq!(in_cr.len(), self.staging.len());
                let emitted = match self.engine.frame_ready_for_output() {
                    Some(frame) => {
                        write_chroma_frame(frame, out_cb, out_cr);
                        true
                    }
                    None => false,
                };
                for (index, slot) in self.staging.iter_mut().enumerate() {
                    *slot = PixelCbCr(in_cb[index], in_cr[index]);
                }
                self.engine.add_frame(&self.staging)?;
                Ok(FrameVerdict::from_emitted(emitted))
            }
        }
    }

    pub fn interlaced(
        &mut self,
        frame_index: u64,
        input: Option<(&[u8], &[u8])>,
        output: (&mut [u8], &mut [u8]),
    ) -> Result<FrameVerdict> {
        self.maybe_purge(frame_index);
        let (out_cb, out_cr) = output;

        let lead = self.interlacing.field_mask();
        let mut emitted = false;
        for field in 0..2 {
            let mask = lead ^ field;
            match input {
                None => {
                    emitted = match self.engine.remaining_frames() {
                        Some(frame) => {
                            write_chroma_field(frame, out_cb, out_cr, self.width, mask);
                            true
                        }
                        None => false,
                    };
                }
                Some((in_cb, in_cr)) => {
                    emitted = match self.engine.frame_ready_for_output() {
                        Some(frame) => {
                            write_chroma_field(frame, out_cb, out_cr, self.width, mask);
                            true
                        }
                        None => false,
                    };
                    self.stage_field(in_cb, in_cr, mask);
                    self.engine.add_frame(&self.staging)?;
                }
            }
        }
        Ok(FrameVerdict::from_emitted(emitted))
    }

    fn maybe_purge(&mut self, frame_index: u64) {
        if frame_index % self.purge_cadence == 0 {
            self.engine.purge();
        }
    }

    fn stage_field(&mut self, in_cb: &[u8], in_cr: &[u8], mask: usize) {
        debug_assert_eq!(in_cb.len(), self.width * self.height);
        let mut index = 0;
        for y in (mask..self.height).step_by(2) {
            for x in 0..self.width {
                let offset = y * self.width + x;
                self.staging[index] = PixelCbCr(in_cb[offset], in_cr[offset]);
                index += 1;
            }
        }
        debug_assert_eq!(index, self.staging.len());
    }
}

fn write_chroma_frame(frame: &ReferenceFrame<PixelCbCr>, out_cb: &mut [u8], out_cr: &mut [u8]) {
    debug_assert_eq!(frame.len(), out_cb.len());
    debug_assert_eq!(frame.len(), out_cr.len());
    for index in 0..frame.len() {
        let value = frame.pixel(index).value();
        out_cb[index] = value.0;
        out_cr[index] = value.1;
    }
}

fn write_chroma_field(
    frame: &ReferenceFrame<PixelCbCr>,
    out_cb: &mut [u8],
    out_cr: &mut [u8],
    width: usize,
    mask: usize,
) {
    let mut index = 0;
    let mut y = mask;
    while index < frame.len() {
        for x in 0..width {
            let value = frame.pixel(index).value();
            out_cb[y * width + x] = value.0;
            out_cr[y * width + x] = value.1;
            index += 1;
        }
        y += 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Passthrough;

    #[test]
    fn test_progressive_identity_flush() {
        // Width 4, height 2, purge every frame, pass-through engine.
        let engine = Box::new(Passthrough::<PixelY>::new(1, 8));
        let mut lane = LumaLane::new(engine, 4, 2, Interlacing::Progressive, 1);

        let input = [10u8, 20, 30, 40, 50, 60, 70, 80];
        let mut output = [0u8; 8];

        let verdict = lane.progressive(0, Some(&input), &mut output).unwrap();
        assert_eq!(verdict, FrameVerdict::Swallowed);

        let verdict = lane.progressive(1, None, &mut output).unwrap();
        assert_eq!(verdict, FrameVerdict::Emitted);
        assert_eq!(output, input);
    }

    #[test]
    fn test_interlaced_top_field_first_weave() {
        // Height 4: rows 0/2 form the top field, rows 1/3 the bottom. The
        // engine sees fields of two rows, window 2 (one frame's worth).
        let width = 2;
        let engine = Box::new(Passthrough::<PixelY>::new(2, width * 2));
        let mut lane = LumaLane::new(engine, width, 4, Interlacing::TopFieldFirst, 1);

        #[rustfmt::skip]
        let input = [
            1, 1,   // row 0 (top)
            2, 2,   // row 1 (bottom)
            3, 3,   // row 2 (top)
            4, 4,   // row 3 (bottom)
        ];
        let mut output = [0u8; 8];

        let verdict = lane.interlaced(0, Some(&input), &mut output).unwrap();
        assert_eq!(verdict, FrameVerdict::Swallowed);

        let verdict = lane.interlaced(1, None, &mut output).unwrap();
        assert_eq!(verdict, FrameVerdict::Emitted);
        // Both fields woven back: every row written exactly once.
        assert_eq!(output, input);
    }

    #[test]
    fn test_interlaced_bottom_field_first_weave() {
        let width = 2;
        let engine = Box::new(Passthrough::<PixelY>::new(2, width * 2));
        let mut lane = LumaLane::new(engine, width, 4, Interlacing::BottomFieldFirst, 1);

        let input = [1u8, 1, 2, 2, 3, 3, 4, 4];
        let mut output = [0u8; 8];

        lane.interlaced(0, Some(&input), &mut output).unwrap();
        let verdict = lane.interlaced(1, None, &mut output).unwrap();
        assert_eq!(verdict, FrameVerdict::Emitted);
        assert_eq!(output, input);
    }

    #[test]
    fn test_chroma_progressive_identity_flush() {
        let engine = Box::new(Passthrough::<PixelCbCr>::new(1, 4));
        let mut lane = ChromaLane::new(engine, 2, 2, Interlacing::Progressive, 1);

        let in_cb = [10u8, 20, 30, 40];
        let in_cr = [50u8, 60, 70, 80];
        let mut out_cb = [0u8; 4];
        let mut out_cr = [0u8; 4];

        let verdict = lane
            .progressive(0, Some((&in_cb, &in_cr)), (&mut out_cb, &mut out_cr))
            .unwrap();
        assert_eq!(verdict, FrameVerdict::Swallowed);

        let verdict = lane
            .progressive(1, None, (&mut out_cb, &mut out_cr))
            .unwrap();
        assert_eq!(verdict, FrameVerdict::Emitted);
        assert_eq!(out_cb, in_cb);
        assert_eq!(out_cr, in_cr);
    }
}
