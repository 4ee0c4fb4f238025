//! Denoising pipeline: bounded I/O stages around per-plane motion denoisers
//!
//! # Architecture
//!
//! ```text
//! source ──> ReadStage ──> caller thread ──────────────> WriteStage ──> sink
//!   (thread, pool of 4)      │        ▲                  (thread, pool of 4)
//!                            │ luma   │ chroma result
//!                            ▼        │
//!                       LumaLane   ChromaWorker (thread, optional)
//! ```
//!
//! Up to four threads cooperate: the caller, a reader, a writer, and a
//! chroma worker. The luma plane is always denoised on the caller thread —
//! the caller would otherwise sit idle waiting for chroma. Each stage has
//! its own mutex and no thread ever holds two of them, so there is no lock
//! ordering to get wrong. Bounded pools give back-pressure in both
//! directions, and a shutdown drains the writer before its thread exits.

mod plane;
mod pool;
mod reader;
mod sync;
mod worker;
mod writer;

pub use pool::{PoolStats, FRAME_POOL_SIZE};
pub use reader::ReadStage;
pub use writer::WriteStage;

use tracing::{debug, info};

use self::plane::{ChromaLane, LumaLane};
use self::worker::{ChromaJob, ChromaWorker};
use crate::engine::{
    EngineConfig, MotionDenoiser, PixelCbCr, PixelY, TemporalSmoother,
};
use crate::error::{Error, Result};
use crate::format::{FramePlanes, FrameSink, FrameSource, StreamGeometry};

/// Field order of the incoming stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Interlacing {
    /// Whole frames.
    #[default]
    Progressive,
    /// Interlaced, top field first.
    TopFieldFirst,
    /// Interlaced, bottom field first.
    BottomFieldFirst,
}

impl Interlacing {
    /// 2 when interlaced (the engine sees twice as many frames at half
    /// height), else 1.
    pub fn factor(self) -> usize {
        if self.is_interlaced() {
            2
        } else {
            1
        }
    }

    /// True for either field order.
    pub fn is_interlaced(self) -> bool {
        !matches!(self, Interlacing::Progressive)
    }

    /// Row parity of the leading field.
    pub(crate) fn field_mask(self) -> usize {
        match self {
            Interlacing::BottomFieldFirst => 1,
            _ => 0,
        }
    }
}

/// Which pipeline threads to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadPolicy {
    /// Run the read and write stages on their own threads.
    pub pooled_io: bool,
    /// Run the chroma lane on its own thread.
    pub chroma_worker: bool,
}

impl ThreadPolicy {
    /// Decode the classic two-bit mask: bit 0 pooled I/O, bit 1 chroma
    /// worker.
    pub fn from_mask(mask: u8) -> Self {
        ThreadPolicy {
            pooled_io: mask & 1 != 0,
            chroma_worker: mask & 2 != 0,
        }
    }

    /// Everything on its own thread.
    pub fn all() -> Self {
        ThreadPolicy {
            pooled_io: true,
            chroma_worker: true,
        }
    }

    /// Everything on the caller thread.
    pub fn none() -> Self {
        ThreadPolicy {
            pooled_io: false,
            chroma_worker: false,
        }
    }
}

impl Default for ThreadPolicy {
    fn default() -> Self {
        ThreadPolicy::all()
    }
}

/// Immutable pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Luma plane width; zero disables the luma lane.
    pub width_y: usize,
    /// Luma plane height.
    pub height_y: usize,
    /// Chroma plane width to denoise; zero disables the chroma lane.
    pub width_cbcr: usize,
    /// Chroma plane height to denoise.
    pub height_cbcr: usize,
    /// Chroma storage dimensions of the stream itself. Frames carry their
    /// chroma bytes through the pools even when the chroma lane is off.
    pub chroma_buf_width: usize,
    /// See `chroma_buf_width`.
    pub chroma_buf_height: usize,
    /// Field order.
    pub interlacing: Interlacing,
    /// Reference-frame window, which doubles as the purge cadence.
    pub frames: usize,
    /// Thread policy.
    pub threads: ThreadPolicy,
    /// Luma motion-search radius.
    pub radius_y: usize,
    /// Chroma motion-search radius, before subsampling correction.
    pub radius_cbcr: usize,
    /// Luma zero-motion tolerance.
    pub z_threshold_y: u8,
    /// Luma match tolerance.
    pub threshold_y: u8,
    /// Chroma zero-motion tolerance.
    pub z_threshold_cbcr: u8,
    /// Chroma match tolerance.
    pub threshold_cbcr: u8,
    /// Match-count throttle, passed through to the engines.
    pub match_count_throttle: usize,
    /// Match-size throttle, passed through to the engines.
    pub match_size_throttle: usize,
    /// Horizontal chroma subsampling factor.
    pub ss_h: usize,
    /// Vertical chroma subsampling factor.
    pub ss_v: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            width_y: 0,
            height_y: 0,
            width_cbcr: 0,
            height_cbcr: 0,
            chroma_buf_width: 0,
            chroma_buf_height: 0,
            interlacing: Interlacing::Progressive,
            frames: 10,
            threads: ThreadPolicy::all(),
            radius_y: 16,
            radius_cbcr: 16,
            z_threshold_y: 2,
            threshold_y: 3,
            z_threshold_cbcr: 2,
            threshold_cbcr: 3,
            match_count_throttle: 15,
            match_size_throttle: 3,
            ss_h: 1,
            ss_v: 1,
        }
    }
}

impl PipelineConfig {
    /// Configuration for a probed stream, with default tuning.
    pub fn for_geometry(geometry: StreamGeometry) -> Self {
        PipelineConfig {
            width_y: geometry.width_y,
            height_y: geometry.height_y,
            width_cbcr: geometry.width_cbcr,
            height_cbcr: geometry.height_cbcr,
            chroma_buf_width: geometry.width_cbcr,
            chroma_buf_height: geometry.height_cbcr,
            ss_h: geometry.ss_h,
            ss_v: geometry.ss_v,
            ..PipelineConfig::default()
        }
    }

    /// True when the luma lane is active.
    pub fn luma_enabled(&self) -> bool {
        self.width_y != 0 && self.height_y != 0
    }

    /// True when the chroma lane is active.
    pub fn chroma_enabled(&self) -> bool {
        self.width_cbcr != 0 && self.height_cbcr != 0
    }

    /// Bytes in the luma plane.
    pub fn luma_len(&self) -> usize {
        self.width_y * self.height_y
    }

    /// Bytes in one denoised chroma plane.
    pub fn chroma_len(&self) -> usize {
        self.width_cbcr * self.height_cbcr
    }

    /// Bytes to allocate per chroma plane in pool buffers: the denoised
    /// plane, or the stream's own storage when the lane is off.
    pub fn chroma_storage_len(&self) -> usize {
        if self.chroma_enabled() {
            self.chroma_len()
        } else {
            self.chroma_buf_width * self.chroma_buf_height
        }
    }

    fn validate(&self) -> Result<()> {
        if self.frames == 0 {
            return Err(Error::config("frame window must be at least 1"));
        }
        if !self.luma_enabled() && !self.chroma_enabled() {
            return Err(Error::config("no plane enabled for denoising"));
        }
        if self.interlacing.is_interlaced() {
            if self.luma_enabled() && self.height_y % 2 != 0 {
                return Err(Error::config("interlaced luma height must be even"));
            }
            if self.chroma_enabled() && self.height_cbcr % 2 != 0 {
                return Err(Error::config("interlaced chroma height must be even"));
            }
        }
        if self.chroma_enabled() && (self.ss_h == 0 || self.ss_v == 0) {
            return Err(Error::config("chroma subsampling factors must be non-zero"));
        }
        Ok(())
    }

    /// Engine configuration for the luma lane.
    pub fn luma_engine_config(&self) -> EngineConfig {
        let interlace = self.interlacing.factor();
        EngineConfig {
            frame_window: interlace * self.frames,
            width: self.width_y,
            height: self.height_y / interlace,
            search_radius_x: self.radius_y,
            search_radius_y: self.radius_y,
            z_threshold: self.z_threshold_y,
            threshold: self.threshold_y,
            match_count_throttle: self.match_count_throttle,
            match_size_throttle: self.match_size_throttle,
        }
    }

    /// Engine configuration for the chroma lane; the search radius is
    /// scaled down by the subsampling factors.
    pub fn chroma_engine_config(&self) -> EngineConfig {
        let interlace = self.interlacing.factor();
        EngineConfig {
            frame_window: interlace * self.frames,
            width: self.width_cbcr,
            height: self.height_cbcr / interlace,
            search_radius_x: self.radius_cbcr / self.ss_h,
            search_radius_y: self.radius_cbcr / self.ss_v,
            z_threshold: self.z_threshold_cbcr,
            threshold: self.threshold_cbcr,
            match_count_throttle: self.match_count_throttle,
            match_size_throttle: self.match_size_throttle,
        }
    }
}

/// Did a per-frame call produce an output frame?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameVerdict {
    /// An output frame was written to the output planes.
    Emitted,
    /// The frame was absorbed; nothing was written.
    Swallowed,
}

impl FrameVerdict {
    fn from_emitted(emitted: bool) -> Self {
        if emitted {
            FrameVerdict::Emitted
        } else {
            FrameVerdict::Swallowed
        }
    }

    /// True when an output frame was produced.
    pub fn is_emitted(self) -> bool {
        matches!(self, FrameVerdict::Emitted)
    }
}

/// Totals reported by [`DenoisePipeline::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Frames consumed from the source.
    pub frames_in: u64,
    /// Frames delivered to the sink.
    pub frames_out: u64,
}

enum ChromaPath {
    Disabled,
    Sync(ChromaLane),
    Threaded {
        worker: ChromaWorker,
        job: Option<ChromaJob>,
    },
}

/// The per-frame denoising surface: both plane lanes plus the frame
/// counter that drives the purge cadence.
///
/// Callers that manage their own I/O drive this directly; the surrounding
/// [`DenoisePipeline`] adds the pooled read/write stages.
pub struct DenoiseCore {
    luma: Option<LumaLane>,
    chroma: ChromaPath,
    interlacing: Interlacing,
    frame_index: u64,
}

impl DenoiseCore {
    /// Build a core around caller-supplied engines. An engine must be
    /// present exactly for each enabled plane.
    pub fn new(
        config: &PipelineConfig,
        luma_engine: Option<Box<dyn MotionDenoiser<PixelY>>>,
        chroma_engine: Option<Box<dyn MotionDenoiser<PixelCbCr>>>,
    ) -> Result<Self> {
        config.validate()?;
        if config.luma_enabled() != luma_engine.is_some() {
            return Err(Error::init("luma engine does not match the enabled planes"));
        }
        if config.chroma_enabled() != chroma_engine.is_some() {
            return Err(Error::init(
                "chroma engine does not match the enabled planes",
            ));
        }

        let purge_cadence = config.frames as u64;
        let luma = luma_engine.map(|engine| {
            LumaLane::new(
                engine,
                config.width_y,
                config.height_y,
                config.interlacing,
                purge_cadence,
            )
        });

        let chroma = match chroma_engine {
            None => ChromaPath::Disabled,
            Some(engine) => {
                let lane = ChromaLane::new(
                    engine,
                    config.width_cbcr,
                    config.height_cbcr,
                    config.interlacing,
                    purge_cadence,
                );
                if config.threads.chroma_worker {
                    debug!("starting chroma worker thread");
                    ChromaPath::Threaded {
                        worker: ChromaWorker::spawn(lane),
                        job: Some(ChromaJob::sized(config.chroma_len())),
                    }
                } else {
                    ChromaPath::Sync(lane)
                }
            }
        };

        Ok(DenoiseCore {
            luma,
            chroma,
            interlacing: config.interlacing,
            frame_index: 0,
        })
    }

    /// Build a core with [`TemporalSmoother`] engines for each enabled
    /// plane.
    pub fn with_default_engines(config: &PipelineConfig) -> Result<Self> {
        let luma_engine: Option<Box<dyn MotionDenoiser<PixelY>>> = if config.luma_enabled() {
            Some(Box::new(TemporalSmoother::<PixelY>::new(
                &config.luma_engine_config(),
            )?))
        } else {
            None
        };
        let chroma_engine: Option<Box<dyn MotionDenoiser<PixelCbCr>>> = if config.chroma_enabled()
        {
            Some(Box::new(TemporalSmoother::<PixelCbCr>::new(
                &config.chroma_engine_config(),
            )?))
        } else {
            None
        };
        DenoiseCore::new(config, luma_engine, chroma_engine)
    }

    /// Frames seen so far; drives the purge cadence.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Advance the frame counter. `frame`/`interlaced_frame` do this
    /// automatically; callers driving the per-plane operations directly
    /// should call it once per source frame.
    pub fn advance_frame(&mut self) {
        self.frame_index += 1;
    }

    /// Denoise one progressive frame. `None` input flushes: remaining
    /// frames drain out of the engines one per call until `Swallowed`.
    pub fn frame(
        &mut self,
        input: Option<&FramePlanes>,
        output: &mut FramePlanes,
    ) -> Result<FrameVerdict> {
        debug_assert!(!self.interlacing.is_interlaced());
        self.process(input, output)
    }

    /// Denoise one interlaced frame as two field sub-events.
    pub fn interlaced_frame(
        &mut self,
        input: Option<&FramePlanes>,
        output: &mut FramePlanes,
    ) -> Result<FrameVerdict> {
        debug_assert!(self.interlacing.is_interlaced());
        self.process(input, output)
    }

    /// Denoise the luma plane only (progressive). Does not advance the
    /// frame counter.
    pub fn luma_frame(&mut self, input: Option<&[u8]>, output: &mut [u8]) -> Result<FrameVerdict> {
        let frame_index = self.frame_index;
        let lane = self
            .luma
            .as_mut()
            .ok_or_else(|| Error::invalid_state("luma lane is disabled"))?;
        lane.progressive(frame_index, input, output)
    }

    /// Denoise the luma plane only (interlaced).
    pub fn interlaced_luma_frame(
        &mut self,
        input: Option<&[u8]>,
        output: &mut [u8],
    ) -> Result<FrameVerdict> {
        let frame_index = self.frame_index;
        let lane = self
            .luma
            .as_mut()
            .ok_or_else(|| Error::invalid_state("luma lane is disabled"))?;
        lane.interlaced(frame_index, input, output)
    }

    /// Denoise the chroma planes only (progressive). Only available while
    /// the chroma lane runs synchronously.
    pub fn chroma_frame(
        &mut self,
        input: Option<(&[u8], &[u8])>,
        output: (&mut [u8], &mut [u8]),
    ) -> Result<FrameVerdict> {
        let frame_index = self.frame_index;
        match &mut self.chroma {
            ChromaPath::Sync(lane) => lane.progressive(frame_index, input, output),
            ChromaPath::Disabled => Err(Error::invalid_state("chroma lane is disabled")),
            ChromaPath::Threaded { .. } => Err(Error::invalid_state(
                "chroma lane is owned by its worker thread",
            )),
        }
    }

    /// Denoise the chroma planes only (interlaced).
    pub fn interlaced_chroma_frame(
        &mut self,
        input: Option<(&[u8], &[u8])>,
        output: (&mut [u8], &mut [u8]),
    ) -> Result<FrameVerdict> {
        let frame_index = self.frame_index;
        match &mut self.chroma {
            ChromaPath::Sync(lane) => lane.interlaced(frame_index, input, output),
            ChromaPath::Disabled => Err(Error::invalid_state("chroma lane is disabled")),
            ChromaPath::Threaded { .. } => Err(Error::invalid_state(
                "chroma lane is owned by its worker thread",
            )),
        }
    }

    /// The shared per-frame path: chroma is submitted to its worker before
    /// luma work begins, luma runs here, synchronous chroma follows, and a
    /// worker result is collected last.
    fn process(
        &mut self,
        input: Option<&FramePlanes>,
        output: &mut FramePlanes,
    ) -> Result<FrameVerdict> {
        let frame_index = self.frame_index;

        if let ChromaPath::Threaded { worker, job } = &mut self.chroma {
            let mut job = job
                .take()
                .ok_or_else(|| Error::invalid_state("chroma worker already holds a frame"))?;
            job.frame_index = frame_index;
            match input {
                Some(planes) => {
                    job.flush = false;
                    job.input_cb.copy_from_slice(&planes.cb);
                    job.input_cr.copy_from_slice(&planes.cr);
                }
                None => job.flush = true,
            }
            worker.add_frame(job);
        }

        let luma_result = match &mut self.luma {
            Some(lane) => Some(lane.denoise(
                frame_index,
                input.map(|planes| planes.y.as_slice()),
                &mut output.y,
            )),
            None => None,
        };

        // Chroma runs to completion even when luma failed: a submitted
        // worker job must be collected and returned to its slot, or the
        // pipeline would refuse every later frame.
        let chroma_result = match &mut self.chroma {
            ChromaPath::Disabled => None,
            ChromaPath::Sync(lane) => Some(lane.denoise(
                frame_index,
                input.map(|planes| (planes.cb.as_slice(), planes.cr.as_slice())),
                (&mut output.cb, &mut output.cr),
            )),
            ChromaPath::Threaded { worker, job } => {
                let (finished, outcome) = worker.wait_for_add_frame();
                if let Ok(verdict) = &outcome {
                    if verdict.is_emitted() {
                        output.cb.copy_from_slice(&finished.output_cb);
                        output.cr.copy_from_slice(&finished.output_cr);
                    }
                }
                *job = Some(finished);
                Some(outcome)
            }
        };

        // A luma error takes precedence over the chroma outcome.
        let luma_verdict = luma_result.transpose()?;
        let chroma_verdict = chroma_result.transpose()?;

        // With both planes active, either both engines emitted a reference
        // frame on this call or neither did.
        if let (Some(luma), Some(chroma)) = (luma_verdict, chroma_verdict) {
            debug_assert_eq!(luma, chroma);
        }

        self.frame_index += 1;
        Ok(luma_verdict
            .or(chroma_verdict)
            .unwrap_or(FrameVerdict::Swallowed))
    }

    /// Stop the chroma worker, if one is running. Engine state is left
    /// untouched.
    fn shutdown_workers(&mut self) {
        if let ChromaPath::Threaded { worker, .. } = &mut self.chroma {
            worker.force_shutdown();
        }
    }
}

enum IoPath {
    Pooled {
        reader: ReadStage,
        writer: WriteStage,
    },
    Direct {
        source: Box<dyn FrameSource>,
        sink: Box<dyn FrameSink>,
        input: FramePlanes,
        output: FramePlanes,
    },
}

/// The whole denoiser: per-frame core plus stream I/O.
pub struct DenoisePipeline {
    core: DenoiseCore,
    io: IoPath,
}

impl DenoisePipeline {
    /// Build the pipeline with [`TemporalSmoother`] engines.
    pub fn new(
        config: &PipelineConfig,
        source: Box<dyn FrameSource>,
        sink: Box<dyn FrameSink>,
    ) -> Result<Self> {
        let core = DenoiseCore::with_default_engines(config)?;
        DenoisePipeline::with_core(config, core, source, sink)
    }

    /// Build the pipeline around an existing core (caller-chosen engines).
    pub fn with_core(
        config: &PipelineConfig,
        core: DenoiseCore,
        source: Box<dyn FrameSource>,
        sink: Box<dyn FrameSink>,
    ) -> Result<Self> {
        config.validate()?;
        let luma_len = config.luma_len();
        let chroma_len = config.chroma_storage_len();
        let io = if config.threads.pooled_io {
            debug!("starting read/write stage threads");
            IoPath::Pooled {
                reader: ReadStage::spawn(source, luma_len, chroma_len),
                writer: WriteStage::spawn(sink, luma_len, chroma_len),
            }
        } else {
            IoPath::Direct {
                source,
                sink,
                input: FramePlanes::sized(luma_len, chroma_len),
                output: FramePlanes::sized(luma_len, chroma_len),
            }
        };
        Ok(DenoisePipeline { core, io })
    }

    /// The per-frame surface.
    pub fn core(&mut self) -> &mut DenoiseCore {
        &mut self.core
    }

    /// Read the next input frame (pooled I/O only).
    pub fn read_frame(&mut self) -> Result<&FramePlanes> {
        match &mut self.io {
            IoPath::Pooled { reader, .. } => reader.read_frame(),
            IoPath::Direct { .. } => Err(Error::invalid_state("pooled I/O is not enabled")),
        }
    }

    /// Borrow an output slot (pooled I/O only).
    pub fn frame_slot(&mut self) -> Result<&mut FramePlanes> {
        match &mut self.io {
            IoPath::Pooled { writer, .. } => writer.frame_slot(),
            IoPath::Direct { .. } => Err(Error::invalid_state("pooled I/O is not enabled")),
        }
    }

    /// Commit the filled output slot (pooled I/O only).
    pub fn commit_frame(&mut self) -> Result<()> {
        match &mut self.io {
            IoPath::Pooled { writer, .. } => writer.commit_frame(),
            IoPath::Direct { .. } => Err(Error::invalid_state("pooled I/O is not enabled")),
        }
    }

    /// Process the whole stream: denoise every input frame, drain the
    /// engines, then shut the pipeline down.
    pub fn run(&mut self) -> Result<RunStats> {
        let mut stats = RunStats::default();
        let interlaced = self.core.interlacing.is_interlaced();

        loop {
            match &mut self.io {
                IoPath::Pooled { reader, writer } => {
                    let planes = match reader.read_frame() {
                        Ok(planes) => planes,
                        Err(Error::EndOfStream) => break,
                        Err(err) => return Err(err),
                    };
                    stats.frames_in += 1;
                    let slot = writer.frame_slot()?;
                    if self.core.process(Some(planes), slot)?.is_emitted() {
                        writer.commit_frame()?;
                        stats.frames_out += 1;
                    }
                }
                IoPath::Direct {
                    source,
                    sink,
                    input,
                    output,
                } => {
                    match source.read_into(input) {
                        Ok(()) => {}
                        Err(Error::EndOfStream) => break,
                        Err(err) => return Err(err),
                    }
                    stats.frames_in += 1;
                    if self.core.process(Some(input), output)?.is_emitted() {
                        sink.write_from(output)?;
                        stats.frames_out += 1;
                    }
                }
            }
        }

        // End of input: flush with null frames until the engines run dry.
        loop {
            match &mut self.io {
                IoPath::Pooled { writer, .. } => {
                    let slot = writer.frame_slot()?;
                    if self.core.process(None, slot)?.is_emitted() {
                        writer.commit_frame()?;
                        stats.frames_out += 1;
                    } else {
                        break;
                    }
                }
                IoPath::Direct { sink, output, .. } => {
                    if self.core.process(None, output)?.is_emitted() {
                        sink.write_from(output)?;
                        stats.frames_out += 1;
                    } else {
                        break;
                    }
                }
            }
        }

        info!(
            frames_in = stats.frames_in,
            frames_out = stats.frames_out,
            interlaced,
            "stream denoised"
        );
        self.shutdown();
        Ok(stats)
    }

    /// Stop all worker threads; the writer drains its published frames
    /// first. Idempotent, and a no-op when no threads were started.
    pub fn shutdown(&mut self) {
        self.core.shutdown_workers();
        if let IoPath::Pooled { reader, writer } = &mut self.io {
            reader.force_shutdown();
            writer.force_shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Passthrough;

    fn luma_only_config(width: usize, height: usize, frames: usize) -> PipelineConfig {
        PipelineConfig {
            width_y: width,
            height_y: height,
            frames,
            threads: ThreadPolicy::none(),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_core_identity_flush_luma_only() {
        let config = luma_only_config(4, 2, 1);
        let engine = Box::new(Passthrough::<PixelY>::new(1, 8));
        let mut core = DenoiseCore::new(&config, Some(engine), None).unwrap();

        let mut input = FramePlanes::sized(8, 0);
        input.y.copy_from_slice(&[10, 20, 30, 40, 50, 60, 70, 80]);
        let mut output = FramePlanes::sized(8, 0);

        assert_eq!(
            core.frame(Some(&input), &mut output).unwrap(),
            FrameVerdict::Swallowed
        );
        assert_eq!(core.frame(None, &mut output).unwrap(), FrameVerdict::Emitted);
        assert_eq!(output.y, input.y);
        assert_eq!(core.frame(None, &mut output).unwrap(), FrameVerdict::Swallowed);
    }

    #[test]
    fn test_core_rejects_mismatched_engines() {
        let config = luma_only_config(4, 2, 1);
        assert!(DenoiseCore::new(&config, None, None).is_err());

        let chroma = Box::new(Passthrough::<PixelCbCr>::new(1, 4));
        assert!(DenoiseCore::new(&config, None, Some(chroma)).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = luma_only_config(4, 2, 0);
        assert!(config.validate().is_err());
        config.frames = 1;
        assert!(config.validate().is_ok());

        config.interlacing = Interlacing::TopFieldFirst;
        config.height_y = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_chroma_engine_radius_scaling() {
        let config = PipelineConfig {
            width_y: 8,
            height_y: 4,
            width_cbcr: 4,
            height_cbcr: 2,
            chroma_buf_width: 4,
            chroma_buf_height: 2,
            radius_cbcr: 16,
            ss_h: 2,
            ss_v: 2,
            ..PipelineConfig::default()
        };
        let engine_config = config.chroma_engine_config();
        assert_eq!(engine_config.search_radius_x, 8);
        assert_eq!(engine_config.search_radius_y, 8);
    }

    #[test]
    fn test_interlaced_engine_window_and_height() {
        let config = PipelineConfig {
            interlacing: Interlacing::TopFieldFirst,
            frames: 3,
            ..luma_only_config(4, 4, 3)
        };
        let engine_config = config.luma_engine_config();
        assert_eq!(engine_config.frame_window, 6);
        assert_eq!(engine_config.height, 2);
    }

    #[test]
    fn test_thread_policy_mask() {
        assert_eq!(ThreadPolicy::from_mask(0), ThreadPolicy::none());
        assert_eq!(ThreadPolicy::from_mask(3), ThreadPolicy::all());
        assert!(ThreadPolicy::from_mask(1).pooled_io);
        assert!(!ThreadPolicy::from_mask(1).chroma_worker);
        assert!(ThreadPolicy::from_mask(2).chroma_worker);
    }
}
