//! One-shot AAC packet decoding into interleaved f32 PCM.

use crate::{Error, Result};

/// Bytes of the ADTS header preceding every input packet
pub const ADTS_HEADER_LEN: usize = 7;

/// `codec` value selecting AAC, the only compressed format defined
pub const CODEC_AAC: i64 = 0;

/// MPEG-4 audio object type for AAC-LC
const AOT_AAC_LC: u16 = 2;

/// Sampling frequency index table (ISO/IEC 14496-3 1.6.3.4)
const SAMPLING_FREQUENCIES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// Compressed AAC stream description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AacFormat {
    pub sample_rate: u32,
    pub channels: u32,
    frequency_index: u8,
    channel_config: u8,
}

impl AacFormat {
    pub fn new(codec: i64, sample_rate: i64, channels: i64) -> Result<Self> {
        if codec != CODEC_AAC {
            return Err(Error::CompressedFormat(format!("unknown codec {}", codec)));
        }

        let frequency_index = SAMPLING_FREQUENCIES
            .iter()
            .position(|f| i64::from(*f) == sample_rate)
            .ok_or_else(|| {
                Error::CompressedFormat(format!("unsupported sample rate {}", sample_rate))
            })?;

        let channel_config = match channels {
            1..=6 => channels as u8,
            8 => 7,
            _ => {
                return Err(Error::CompressedFormat(format!(
                    "unsupported channel count {}",
                    channels
                )))
            }
        };

        Ok(Self {
            sample_rate: SAMPLING_FREQUENCIES[frequency_index],
            channels: channels as u32,
            frequency_index: frequency_index as u8,
            channel_config,
        })
    }

    /// Two-byte AudioSpecificConfig for AAC-LC
    pub fn audio_specific_config(&self) -> [u8; 2] {
        let config = (AOT_AAC_LC << 11)
            | (u16::from(self.frequency_index) << 7)
            | (u16::from(self.channel_config) << 3);
        config.to_be_bytes()
    }
}

/// Interleaved 32-bit float PCM description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u32,
}

impl PcmFormat {
    pub fn new(sample_rate: i64, channels: i64) -> Result<Self> {
        let sample_rate = u32::try_from(sample_rate)
            .ok()
            .filter(|r| *r > 0)
            .ok_or_else(|| Error::PcmFormat(format!("invalid sample rate {}", sample_rate)))?;
        let channels = u32::try_from(channels)
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| Error::PcmFormat(format!("invalid channel count {}", channels)))?;
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * std::mem::size_of::<f32>()
    }
}

/// Output PCM with a fixed frame capacity
#[derive(Debug)]
pub struct PcmBuffer {
    format: PcmFormat,
    capacity: usize,
    data: Vec<u8>,
}

impl PcmBuffer {
    /// Allocate room for `frames` frames of `format`.
    pub fn new(format: PcmFormat, frames: usize) -> Result<Self> {
        let bytes = frames
            .checked_mul(format.bytes_per_frame())
            .ok_or(Error::OutputAllocation(usize::MAX))?;
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| Error::OutputAllocation(bytes))?;
        Ok(Self {
            format,
            capacity: frames,
            data,
        })
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// Frames written so far
    pub fn frames(&self) -> usize {
        self.data.len() / self.format.bytes_per_frame()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.frames() >= self.capacity
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Append interleaved samples, stopping at capacity.
    ///
    /// Returns the number of frames taken.
    pub fn push_interleaved(&mut self, samples: &[f32]) -> usize {
        let channels = self.format.channels as usize;
        let room = self.capacity - self.frames();
        let frames = (samples.len() / channels).min(room);
        for sample in &samples[..frames * channels] {
            self.data.extend_from_slice(&sample.to_ne_bytes());
        }
        frames
    }
}

/// Hands the compressed packet to a converter exactly once.
#[derive(Debug)]
pub struct PacketSource<'a> {
    packet: Option<&'a [u8]>,
}

impl<'a> PacketSource<'a> {
    pub fn new(packet: &'a [u8]) -> Self {
        Self {
            packet: Some(packet),
        }
    }

    /// The packet on the first call, `None` afterwards.
    pub fn next_packet(&mut self) -> Option<&'a [u8]> {
        self.packet.take()
    }
}

/// Outcome of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertStatus {
    HaveData,
    NoData,
}

/// Converts compressed packets to PCM.
pub trait AudioConverter {
    /// Pull packets from `input` until it runs dry or `out` is full.
    fn convert(&mut self, input: &mut PacketSource<'_>, out: &mut PcmBuffer)
        -> Result<ConvertStatus>;
}

/// Creates converters between a compressed and a PCM format.
pub trait AudioConverterBackend {
    fn create(&self, from: &AacFormat, to: &PcmFormat) -> Result<Box<dyn AudioConverter>>;
}

/// One decode call's parameters
#[derive(Debug, Clone, Copy)]
pub struct DecodeRequest<'a> {
    pub codec: i64,
    pub sample_rate: i64,
    pub channels: i64,
    /// Frames the caller expects
    pub frames: i64,
    /// ADTS header followed by the raw AAC payload
    pub input: &'a [u8],
}

/// Decode one packet into `out`.
///
/// `out` is written only on success, and only when the decoded byte count
/// equals `out.len()` exactly.
pub fn decode_audio(
    backend: &dyn AudioConverterBackend,
    request: &DecodeRequest<'_>,
    out: &mut [u8],
) -> Result<()> {
    let aac = AacFormat::new(request.codec, request.sample_rate, request.channels)?;

    let packet = request
        .input
        .get(ADTS_HEADER_LEN..)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            Error::CompressedFormat(format!(
                "packet of {} bytes has no payload after the header",
                request.input.len()
            ))
        })?;

    let pcm = PcmFormat::new(request.sample_rate, request.channels)?;

    let frames = usize::try_from(request.frames)
        .map_err(|_| Error::InvalidArgument(format!("frame count {}", request.frames)))?;
    let mut buffer = PcmBuffer::new(pcm, frames)?;

    let mut converter = backend.create(&aac, &pcm)?;

    let mut source = PacketSource::new(packet);
    match converter.convert(&mut source, &mut buffer)? {
        ConvertStatus::HaveData => {}
        ConvertStatus::NoData => return Err(Error::NoData),
    }

    let produced = buffer.as_bytes();
    if produced.len() != out.len() {
        tracing::debug!(
            target: "avbridge",
            produced = produced.len(),
            expected = out.len(),
            "decoded size does not match output"
        );
        return Err(Error::SizeMismatch {
            produced: produced.len(),
            expected: out.len(),
        });
    }

    out.copy_from_slice(produced);
    Ok(())
}
