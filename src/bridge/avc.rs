//! Parameter-set initialized H.264 decoding into packed 4:2:0 buffers.

use std::sync::atomic::{AtomicU64, Ordering};

use super::plane::{copy_plane, packed_420_size, PixelBuffer, PixelFormat};
use super::sps::{strip_start_code, PictureParameterSet, SequenceParameterSet};
use crate::{Error, Result};

/// Format description built from one SPS and one PPS
#[derive(Debug, Clone)]
pub struct FormatDescription {
    sps: SequenceParameterSet,
    pps: PictureParameterSet,
    sps_nal: Vec<u8>,
    pps_nal: Vec<u8>,
}

impl FormatDescription {
    /// Parse the parameter sets. Either may carry an Annex-B start code.
    pub fn from_parameter_sets(pps: &[u8], sps: &[u8]) -> Result<Self> {
        let sps_nal = strip_start_code(sps).to_vec();
        let pps_nal = strip_start_code(pps).to_vec();

        let parsed_sps = SequenceParameterSet::parse(&sps_nal)?;
        let parsed_pps = PictureParameterSet::parse(&pps_nal)?;

        if parsed_pps.sps_id != parsed_sps.id {
            return Err(Error::ParameterSets(format!(
                "PPS references SPS {}, got SPS {}",
                parsed_pps.sps_id, parsed_sps.id
            )));
        }
        if !parsed_sps.is_8bit_420() {
            return Err(Error::Unsupported(format!(
                "chroma_format_idc {} at {}/{} bits",
                parsed_sps.chroma_format_idc, parsed_sps.bit_depth_luma, parsed_sps.bit_depth_chroma
            )));
        }
        if parsed_sps.width == 0 || parsed_sps.height == 0 {
            return Err(Error::ParameterSets("empty frame size".into()));
        }
        if sps_nal.len() > u16::MAX as usize || pps_nal.len() > u16::MAX as usize {
            return Err(Error::ParameterSets("parameter set too large".into()));
        }

        Ok(Self {
            sps: parsed_sps,
            pps: parsed_pps,
            sps_nal,
            pps_nal,
        })
    }

    pub fn width(&self) -> usize {
        self.sps.width as usize
    }

    pub fn height(&self) -> usize {
        self.sps.height as usize
    }

    /// Bytes of one packed 4:2:0 output frame
    pub fn output_size(&self) -> usize {
        packed_420_size(self.width(), self.height())
    }

    pub fn sps(&self) -> &SequenceParameterSet {
        &self.sps
    }

    pub fn pps(&self) -> &PictureParameterSet {
        &self.pps
    }

    /// AVCDecoderConfigurationRecord (ISO/IEC 14496-15 5.3.3.1).
    ///
    /// Samples fed to a decoder configured from this record carry 4-byte
    /// big-endian NAL length prefixes.
    pub fn avcc(&self) -> Vec<u8> {
        let mut record = Vec::with_capacity(11 + self.sps_nal.len() + self.pps_nal.len());
        record.push(1); // configurationVersion
        record.push(self.sps.profile_idc);
        record.push(self.sps.constraint_flags);
        record.push(self.sps.level_idc);
        record.push(0xFF); // lengthSizeMinusOne = 3
        record.push(0xE1); // one SPS
        record.extend_from_slice(&(self.sps_nal.len() as u16).to_be_bytes());
        record.extend_from_slice(&self.sps_nal);
        record.push(1); // one PPS
        record.extend_from_slice(&(self.pps_nal.len() as u16).to_be_bytes());
        record.extend_from_slice(&self.pps_nal);
        record
    }
}

/// A native decoder bound to one format description.
pub trait VideoDecoder: Send {
    /// Decode one length-prefixed sample.
    ///
    /// Every picture the sample produces is handed to `output` before this
    /// returns.
    fn decode(&mut self, sample: &[u8], output: &mut dyn FnMut(&PixelBuffer<'_>)) -> Result<()>;
}

/// Creates native decoders.
pub trait VideoDecoderBackend {
    fn create(&self, format: &FormatDescription) -> Result<Box<dyn VideoDecoder>>;
}

/// Diagnostic counters for a decode session
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvcDecodeStats {
    /// Pictures packed into a caller buffer
    pub written: u64,
    /// Pictures dropped because the caller buffer was too small
    pub undersized: u64,
    /// Pictures dropped for pixel format, plane count or size
    pub unsupported: u64,
}

#[derive(Debug, Default)]
struct DecodeCounters {
    written: AtomicU64,
    undersized: AtomicU64,
    unsupported: AtomicU64,
}

/// An H.264 decode session with fixed output geometry.
pub struct AvcDecodeSession {
    format: FormatDescription,
    decoder: Box<dyn VideoDecoder>,
    counters: DecodeCounters,
}

impl AvcDecodeSession {
    /// Parse the parameter sets and create a decoder for them.
    pub fn open(backend: &dyn VideoDecoderBackend, pps: &[u8], sps: &[u8]) -> Result<Self> {
        let format = FormatDescription::from_parameter_sets(pps, sps)?;
        let decoder = backend.create(&format)?;

        tracing::debug!(
            target: "avbridge",
            width = format.width(),
            height = format.height(),
            profile = format.sps().profile_idc,
            level = format.sps().level_idc,
            "avc decode session created"
        );

        Ok(Self {
            format,
            decoder,
            counters: DecodeCounters::default(),
        })
    }

    pub fn format(&self) -> &FormatDescription {
        &self.format
    }

    /// Decode one sample and pack its picture into `out`.
    ///
    /// A destination smaller than [`FormatDescription::output_size`] is left
    /// untouched and the call still succeeds.
    pub fn decode_next(&mut self, sample: &[u8], out: &mut [u8]) -> Result<()> {
        let width = self.format.width();
        let height = self.format.height();
        let counters = &self.counters;

        let mut output = |image: &PixelBuffer<'_>| {
            write_packed(image, width, height, out, counters);
        };

        self.decoder.decode(sample, &mut output)
    }

    pub fn stats(&self) -> AvcDecodeStats {
        AvcDecodeStats {
            written: self.counters.written.load(Ordering::Relaxed),
            undersized: self.counters.undersized.load(Ordering::Relaxed),
            unsupported: self.counters.unsupported.load(Ordering::Relaxed),
        }
    }
}

/// Copy a decoded NV12 picture into `out` as `width * height` luma bytes
/// followed by `height / 2` rows of interleaved chroma.
fn write_packed(
    image: &PixelBuffer<'_>,
    width: usize,
    height: usize,
    out: &mut [u8],
    counters: &DecodeCounters,
) {
    let required = packed_420_size(width, height);
    if out.len() < required {
        counters.undersized.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            target: "avbridge",
            size = out.len(),
            required,
            "output buffer too small, picture not written"
        );
        return;
    }

    let (luma, chroma) = match image.planes.as_slice() {
        [luma, chroma]
            if image.format == PixelFormat::Nv12
                && image.width == width
                && image.height == height
                && luma.covers(width, height)
                && chroma.covers(width, height / 2) =>
        {
            (luma, chroma)
        }
        planes => {
            counters.unsupported.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                target: "avbridge",
                format = ?image.format,
                planes = planes.len(),
                width = image.width,
                height = image.height,
                "decoded picture does not match session format"
            );
            return;
        }
    };

    let (luma_out, chroma_out) = out.split_at_mut(width * height);

    let result = copy_plane(luma.data, luma.bytes_per_row, luma_out, width, width, height)
        .and_then(|_| {
            copy_plane(
                chroma.data,
                chroma.bytes_per_row,
                chroma_out,
                width,
                width,
                height / 2,
            )
        });

    match result {
        Ok(_) => {
            counters.written.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            counters.unsupported.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(target: "avbridge", error = %e, "failed to pack decoded picture");
        }
    }
}
