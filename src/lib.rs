//! TVD - a temporal video denoiser for Y4M streams written in Rust
//!
//! TVD removes per-pixel noise from planar YUV video by exploiting
//! temporal redundancy: pixels that stay within a motion tolerance across
//! frames are averaged toward their true value, while anything that moves
//! is left alone.
//!
//! # Architecture
//!
//! TVD is organized into a few key modules:
//!
//! - `engine`: the denoiser engine contract and the engines shipped with
//!   the crate (pixel kernels, temporal smoother, pass-through delay line)
//! - `format`: raw-video frame I/O (Y4M source and sink)
//! - `pipeline`: the concurrent denoising pipeline (bounded frame pools,
//!   read/write stages, the chroma worker, and the facade)
//! - `error`: common error types

pub mod engine;
pub mod error;
pub mod format;
pub mod pipeline;

pub use error::{Error, Result};

/// TVD version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for the TVD library
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Enable verbose logging
    pub verbose: bool,
    /// Enable debug output
    pub debug: bool,
}

/// Initialize the TVD library with the given configuration
pub fn init(config: Config) -> Result<()> {
    if config.verbose || config.debug {
        let level = if config.debug { "debug" } else { "info" };
        tracing_subscriber::fmt().with_env_filter(level).init();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.verbose);
        assert!(!config.debug);
    }
}
