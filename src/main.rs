//! TVD CLI - temporal Y4M denoiser
//!
//! Reads a YUV4MPEG2 stream, denoises it, and writes a YUV4MPEG2 stream.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};

use clap::{Parser, ValueEnum};
use tracing::info;

use tvd_lib::format::{Y4mSink, Y4mSource};
use tvd_lib::pipeline::{DenoisePipeline, Interlacing, PipelineConfig, ThreadPolicy};
use tvd_lib::{init, Config};

#[derive(Parser)]
#[command(name = "tvd")]
#[command(about = "TVD - temporal Y4M denoiser", long_about = None)]
#[command(version)]
struct Cli {
    /// Input Y4M file, or '-' for stdin
    input: String,

    /// Output Y4M file, or '-' for stdout
    output: String,

    /// Reference-frame window (also the purge cadence)
    #[arg(short = 'f', long, default_value_t = 10)]
    frames: usize,

    /// Luma motion-search radius
    #[arg(short = 'r', long, default_value_t = 16)]
    radius: usize,

    /// Chroma motion-search radius (defaults to the luma radius)
    #[arg(long)]
    radius_chroma: Option<usize>,

    /// Luma match tolerance
    #[arg(short = 't', long, default_value_t = 3)]
    threshold: u8,

    /// Luma zero-motion tolerance
    #[arg(short = 'z', long, default_value_t = 2)]
    z_threshold: u8,

    /// Chroma match tolerance (defaults to the luma value)
    #[arg(long)]
    threshold_chroma: Option<u8>,

    /// Chroma zero-motion tolerance (defaults to the luma value)
    #[arg(long)]
    z_threshold_chroma: Option<u8>,

    /// Match-count throttle passed to the engines
    #[arg(long, default_value_t = 15)]
    match_count_throttle: usize,

    /// Match-size throttle passed to the engines
    #[arg(long, default_value_t = 3)]
    match_size_throttle: usize,

    /// Field order of the stream
    #[arg(long, value_enum, default_value = "off")]
    interlaced: FieldOrder,

    /// Worker-thread mask: bit 0 pooled I/O, bit 1 chroma worker
    #[arg(short = 'T', long, default_value_t = 3)]
    threads: u8,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FieldOrder {
    /// Progressive frames
    Off,
    /// Interlaced, top field first
    Top,
    /// Interlaced, bottom field first
    Bottom,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init(Config {
        verbose: cli.verbose,
        debug: cli.debug,
    })?;

    let reader: Box<dyn Read + Send> = if cli.input == "-" {
        Box::new(io::stdin())
    } else {
        Box::new(BufReader::new(File::open(&cli.input)?))
    };
    let source = Y4mSource::new(reader)?;
    let geometry = source.geometry();
    let framerate = source.framerate();
    let colorspace = source.colorspace();

    let writer: Box<dyn Write + Send> = if cli.output == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(BufWriter::new(File::create(&cli.output)?))
    };
    let sink = Y4mSink::new(
        writer,
        geometry.width_y,
        geometry.height_y,
        framerate,
        colorspace,
    )?;

    let mut config = PipelineConfig::for_geometry(geometry);
    config.frames = cli.frames;
    config.radius_y = cli.radius;
    config.radius_cbcr = cli.radius_chroma.unwrap_or(cli.radius);
    config.threshold_y = cli.threshold;
    config.z_threshold_y = cli.z_threshold;
    config.threshold_cbcr = cli.threshold_chroma.unwrap_or(cli.threshold);
    config.z_threshold_cbcr = cli.z_threshold_chroma.unwrap_or(cli.z_threshold);
    config.match_count_throttle = cli.match_count_throttle;
    config.match_size_throttle = cli.match_size_throttle;
    config.interlacing = match cli.interlaced {
        FieldOrder::Off => Interlacing::Progressive,
        FieldOrder::Top => Interlacing::TopFieldFirst,
        FieldOrder::Bottom => Interlacing::BottomFieldFirst,
    };
    config.threads = ThreadPolicy::from_mask(cli.threads);

    info!(
        "tvd v{} denoising {}x{} ({} -> {})",
        tvd_lib::VERSION,
        geometry.width_y,
        geometry.height_y,
        cli.input,
        cli.output
    );

    let mut pipeline = DenoisePipeline::new(&config, Box::new(source), Box::new(sink))?;
    let stats = pipeline.run()?;

    info!(
        frames_in = stats.frames_in,
        frames_out = stats.frames_out,
        "done"
    );
    Ok(())
}
