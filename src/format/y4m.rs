//! Y4M (YUV4MPEG2) stream binding
//!
//! Thin adapters between the pipeline's [`FrameSource`]/[`FrameSink`]
//! seams and the `y4m` crate's decoder and encoder.

use std::io::{Read, Write};

use y4m::{Colorspace, Decoder, Encoder, Ratio};

use super::{FramePlanes, FrameSink, FrameSource, StreamGeometry};
use crate::error::{Error, Result};

/// Reads YUV4MPEG2 frames from a byte stream.
pub struct Y4mSource<R: Read> {
    decoder: Decoder<R>,
    geometry: StreamGeometry,
}

impl<R: Read> Y4mSource<R> {
    /// Parse the stream header and capture the plane geometry.
    pub fn new(reader: R) -> Result<Self> {
        let decoder = y4m::decode(reader)
            .map_err(|e| Error::format(format!("failed to parse Y4M header: {}", e)))?;
        let geometry = geometry_for(
            decoder.get_width(),
            decoder.get_height(),
            decoder.get_colorspace(),
        )?;
        Ok(Y4mSource { decoder, geometry })
    }

    /// Plane geometry of the stream.
    pub fn geometry(&self) -> StreamGeometry {
        self.geometry
    }

    /// Frame rate declared in the stream header.
    pub fn framerate(&self) -> Ratio {
        self.decoder.get_framerate()
    }

    /// Colorspace declared in the stream header.
    pub fn colorspace(&self) -> Colorspace {
        self.decoder.get_colorspace()
    }
}

impl<R: Read + Send> FrameSource for Y4mSource<R> {
    fn read_into(&mut self, planes: &mut FramePlanes) -> Result<()> {
        let frame = self.decoder.read_frame().map_err(|e| match e {
            y4m::Error::EOF => Error::EndOfStream,
            _ => Error::format(format!("failed to read frame: {}", e)),
        })?;

        planes.y.copy_from_slice(frame.get_y_plane());
        if planes.has_chroma() {
            planes.cb.copy_from_slice(frame.get_u_plane());
            planes.cr.copy_from_slice(frame.get_v_plane());
        }
        Ok(())
    }
}

/// Writes YUV4MPEG2 frames to a byte stream.
pub struct Y4mSink<W: Write> {
    encoder: Encoder<W>,
}

impl<W: Write> Y4mSink<W> {
    /// Write the stream header and set up the encoder.
    pub fn new(
        writer: W,
        width: usize,
        height: usize,
        framerate: Ratio,
        colorspace: Colorspace,
    ) -> Result<Self> {
        let encoder = y4m::encode(width, height, framerate)
            .with_colorspace(colorspace)
            .write_header(writer)
            .map_err(|e| Error::format(format!("failed to write Y4M header: {}", e)))?;
        Ok(Y4mSink { encoder })
    }
}

impl<W: Write + Send> FrameSink for Y4mSink<W> {
    fn write_from(&mut self, planes: &FramePlanes) -> Result<()> {
        let frame = y4m::Frame::new(
            [
                planes.y.as_slice(),
                planes.cb.as_slice(),
                planes.cr.as_slice(),
            ],
            None,
        );
        self.encoder
            .write_frame(&frame)
            .map_err(|e| Error::format(format!("failed to write frame: {}", e)))?;
        Ok(())
    }
}

/// Derive plane geometry from the header colorspace. Only the 8-bit
/// planar colorspaces are supported.
fn geometry_for(width: usize, height: usize, colorspace: Colorspace) -> Result<StreamGeometry> {
    let chroma = match colorspace {
        Colorspace::C420
        | Colorspace::C420jpeg
        | Colorspace::C420paldv
        | Colorspace::C420mpeg2 => Some((2, 2)),
        Colorspace::C422 => Some((2, 1)),
        Colorspace::C444 => Some((1, 1)),
        Colorspace::Cmono => None,
        other => {
            return Err(Error::unsupported(format!(
                "colorspace {:?} (only 8-bit planar streams are supported)",
                other
            )))
        }
    };

    Ok(match chroma {
        Some((ss_h, ss_v)) => StreamGeometry {
            width_y: width,
            height_y: height,
            width_cbcr: width / ss_h,
            height_cbcr: height / ss_v,
            ss_h,
            ss_v,
        },
        None => StreamGeometry {
            width_y: width,
            height_y: height,
            width_cbcr: 0,
            height_cbcr: 0,
            ss_h: 1,
            ss_v: 1,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::{BufReader, Cursor};
    use tempfile::NamedTempFile;

    /// Build an in-memory 4:2:0 Y4M stream with one solid frame per entry
    /// of `fills`.
    fn test_stream(width: usize, height: usize, fills: &[(u8, u8, u8)]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(
            format!("YUV4MPEG2 W{} H{} F30:1 Ip A1:1 C420\n", width, height).as_bytes(),
        );
        for &(y, cb, cr) in fills {
            data.extend_from_slice(b"FRAME\n");
            data.extend_from_slice(&vec![y; width * height]);
            data.extend_from_slice(&vec![cb; (width / 2) * (height / 2)]);
            data.extend_from_slice(&vec![cr; (width / 2) * (height / 2)]);
        }
        data
    }

    #[test]
    fn test_source_geometry_420() {
        let data = test_stream(8, 4, &[]);
        let source = Y4mSource::new(Cursor::new(data)).unwrap();
        let geometry = source.geometry();
        assert_eq!(geometry.width_y, 8);
        assert_eq!(geometry.height_y, 4);
        assert_eq!(geometry.width_cbcr, 4);
        assert_eq!(geometry.height_cbcr, 2);
        assert_eq!((geometry.ss_h, geometry.ss_v), (2, 2));
    }

    #[test]
    fn test_source_reads_frames_then_eof() {
        let data = test_stream(4, 2, &[(10, 20, 30), (40, 50, 60)]);
        let mut source = Y4mSource::new(Cursor::new(data)).unwrap();
        let geometry = source.geometry();
        let mut planes = FramePlanes::sized(geometry.luma_len(), geometry.chroma_len());

        source.read_into(&mut planes).unwrap();
        assert_eq!(planes.y, vec![10; 8]);
        assert_eq!(planes.cb, vec![20; 2]);
        assert_eq!(planes.cr, vec![30; 2]);

        source.read_into(&mut planes).unwrap();
        assert_eq!(planes.y, vec![40; 8]);

        assert_eq!(source.read_into(&mut planes), Err(Error::EndOfStream));
        // The terminal status repeats on later calls.
        assert_eq!(source.read_into(&mut planes), Err(Error::EndOfStream));
    }

    #[test]
    fn test_sink_roundtrip() {
        let mut written = Vec::new();
        {
            let mut sink = Y4mSink::new(
                &mut written,
                4,
                2,
                Ratio::new(30, 1),
                Colorspace::C420,
            )
            .unwrap();
            let mut planes = FramePlanes::sized(8, 2);
            planes.y.copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
            planes.cb.copy_from_slice(&[9, 10]);
            planes.cr.copy_from_slice(&[11, 12]);
            sink.write_from(&planes).unwrap();
        }

        let mut source = Y4mSource::new(Cursor::new(written)).unwrap();
        let geometry = source.geometry();
        let mut planes = FramePlanes::sized(geometry.luma_len(), geometry.chroma_len());
        source.read_into(&mut planes).unwrap();
        assert_eq!(planes.y, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(planes.cb, vec![9, 10]);
        assert_eq!(planes.cr, vec![11, 12]);
    }

    #[test]
    fn test_file_backed_roundtrip() {
        let file = NamedTempFile::new().expect("Failed to create temp file");
        {
            let mut sink = Y4mSink::new(
                file.reopen().expect("Failed to reopen temp file"),
                4,
                2,
                Ratio::new(25, 1),
                Colorspace::C420,
            )
            .unwrap();
            for fill in [10u8, 20] {
                let mut planes = FramePlanes::sized(8, 2);
                planes.y.fill(fill);
                planes.cb.fill(fill + 1);
                planes.cr.fill(fill + 2);
                sink.write_from(&planes).unwrap();
            }
        }

        let opened = File::open(file.path()).expect("Failed to open temp file");
        let mut source = Y4mSource::new(BufReader::new(opened)).unwrap();
        let geometry = source.geometry();
        assert_eq!((geometry.width_y, geometry.height_y), (4, 2));

        let mut planes = FramePlanes::sized(geometry.luma_len(), geometry.chroma_len());
        for fill in [10u8, 20] {
            source.read_into(&mut planes).unwrap();
            assert_eq!(planes.y, vec![fill; 8]);
            assert_eq!(planes.cb, vec![fill + 1; 2]);
            assert_eq!(planes.cr, vec![fill + 2; 2]);
        }
        assert_eq!(source.read_into(&mut planes), Err(Error::EndOfStream));
    }

    #[test]
    fn test_mono_stream_has_no_chroma() {
        let mut data = Vec::new();
        data.extend_from_slice(b"YUV4MPEG2 W4 H2 F25:1 Ip A1:1 Cmono\n");
        data.extend_from_slice(b"FRAME\n");
        data.extend_from_slice(&[7u8; 8]);

        let mut source = Y4mSource::new(Cursor::new(data)).unwrap();
        let geometry = source.geometry();
        assert!(!geometry.has_chroma());

        let mut planes = FramePlanes::sized(geometry.luma_len(), geometry.chroma_len());
        source.read_into(&mut planes).unwrap();
        assert_eq!(planes.y, vec![7; 8]);
    }
}
