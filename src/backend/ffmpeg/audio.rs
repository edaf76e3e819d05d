//! AAC decoding with libavcodec.

use super::FFmpeg;
use crate::bridge::{
    AacFormat, AudioConverter, AudioConverterBackend, ConvertStatus, PacketSource, PcmBuffer,
    PcmFormat,
};
use crate::codec::{CodecContext, DecoderConfig, Frame, Packet};
use crate::ffi::{AVCodecID, AVSampleFormat};
use crate::{Error, Result};

impl AudioConverterBackend for FFmpeg {
    fn create(&self, from: &AacFormat, to: &PcmFormat) -> Result<Box<dyn AudioConverter>> {
        if from.sample_rate != to.sample_rate || from.channels != to.channels {
            return Err(Error::Converter(format!(
                "cannot resample {} Hz x{} to {} Hz x{}",
                from.sample_rate, from.channels, to.sample_rate, to.channels
            )));
        }

        let config = DecoderConfig {
            codec_id: AVCodecID::Aac,
            thread_count: 1,
            extradata: Some(from.audio_specific_config().to_vec()),
            sample_rate: Some(from.sample_rate),
            channels: Some(from.channels),
            ..Default::default()
        };

        let open = || -> crate::codec::CodecResult<CodecContext> {
            let mut ctx = CodecContext::new_decoder(AVCodecID::Aac)?;
            ctx.configure_decoder(&config)?;
            ctx.open()?;
            Ok(ctx)
        };
        let ctx = open().map_err(|e| Error::Converter(e.to_string()))?;

        Ok(Box::new(AacConverter {
            ctx,
            channels: to.channels as usize,
        }))
    }
}

/// One-shot AAC decoder producing interleaved float PCM
struct AacConverter {
    ctx: CodecContext,
    channels: usize,
}

impl AacConverter {
    /// Append one decoded frame to `out`; returns frames taken.
    fn push_frame(&self, frame: &Frame, out: &mut PcmBuffer) -> Result<usize> {
        if frame.channels() != self.channels {
            return Err(Error::Conversion(format!(
                "decoder produced {} channels, expected {}",
                frame.channels(),
                self.channels
            )));
        }

        match frame.sample_format() {
            AVSampleFormat::Flt => {
                let samples = frame
                    .audio_samples(0)
                    .ok_or_else(|| Error::Conversion("frame has no sample data".into()))?;
                Ok(out.push_interleaved(samples))
            }
            AVSampleFormat::Fltp => {
                let planes = (0..self.channels)
                    .map(|channel| frame.audio_samples(channel))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| Error::Conversion("frame is missing a channel plane".into()))?;

                let mut interleaved = Vec::with_capacity(frame.nb_samples() * self.channels);
                for i in 0..frame.nb_samples() {
                    interleaved.extend(planes.iter().map(|plane| plane[i]));
                }
                Ok(out.push_interleaved(&interleaved))
            }
            other => Err(Error::Conversion(format!(
                "unsupported decoder sample format {:?}",
                other
            ))),
        }
    }
}

impl AudioConverter for AacConverter {
    fn convert(&mut self, input: &mut PacketSource<'_>, out: &mut PcmBuffer) -> Result<ConvertStatus> {
        let decode_error = |e: crate::codec::CodecError| Error::Conversion(e.to_string());

        let mut frames = Vec::new();
        while !out.is_full() {
            let Some(data) = input.next_packet() else {
                break;
            };
            let packet = Packet::from_slice(data).map_err(decode_error)?;
            frames.extend(self.ctx.decode(Some(&packet)).map_err(decode_error)?);
        }
        frames.extend(self.ctx.flush_decoder().map_err(decode_error)?);

        let mut produced = 0;
        for frame in &frames {
            produced += self.push_frame(frame, out)?;
        }

        tracing::trace!(
            target: "avbridge",
            decoded = frames.len(),
            produced,
            capacity = out.capacity(),
            "aac packet converted"
        );

        Ok(if produced > 0 {
            ConvertStatus::HaveData
        } else {
            ConvertStatus::NoData
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::audio::ADTS_HEADER_LEN;
    use crate::bridge::{decode_audio, DecodeRequest};

    /// ADTS header (44.1 kHz, LC, mono) and a silent single channel element:
    /// global_gain 160, long window, max_sfb 0, then END
    const SILENT_MONO: [u8; 11] = [
        0xFF, 0xF1, 0x50, 0x40, 0x01, 0x7F, 0xFC, // header
        0x01, 0x40, 0x20, 0x07,
    ];

    /// ADTS header (44.1 kHz, LC, stereo) and a silent channel pair element
    /// without common window
    const SILENT_STEREO: [u8; 14] = [
        0xFF, 0xF1, 0x50, 0x80, 0x01, 0xDF, 0xFC, // header
        0x20, 0xA0, 0x10, 0x02, 0x80, 0x40, 0x0E,
    ];

    /// Samples per AAC-LC frame
    const FRAME_LEN: usize = 1024;

    fn request(channels: i64, input: &[u8]) -> DecodeRequest<'_> {
        DecodeRequest {
            codec: 0,
            sample_rate: 44100,
            channels,
            frames: FRAME_LEN as i64,
            input,
        }
    }

    #[test]
    fn test_create_rejects_resampling() {
        let aac = AacFormat::new(0, 44100, 2).unwrap();
        let pcm = PcmFormat::new(48000, 2).unwrap();
        let err = FFmpeg.create(&aac, &pcm).err().unwrap();
        assert!(matches!(err, Error::Converter(_)));
    }

    #[test]
    fn test_exhausted_source_produces_no_data() {
        let aac = AacFormat::new(0, 44100, 2).unwrap();
        let pcm = PcmFormat::new(44100, 2).unwrap();
        let mut converter = FFmpeg.create(&aac, &pcm).unwrap();

        let mut out = PcmBuffer::new(pcm, 1024).unwrap();
        let packet = [0x21u8, 0x10, 0x05];
        let mut source = PacketSource::new(&packet);
        source.next_packet();

        let status = converter.convert(&mut source, &mut out).unwrap();
        assert_eq!(status, ConvertStatus::NoData);
        assert_eq!(out.frames(), 0);
    }

    #[test]
    fn test_decode_silent_mono_frame() {
        let mut out = vec![0xFFu8; FRAME_LEN * 4];
        decode_audio(&FFmpeg, &request(1, &SILENT_MONO), &mut out).unwrap();
        assert!(out.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_decode_silent_stereo_frame_interleaved() {
        let aac = AacFormat::new(0, 44100, 2).unwrap();
        let pcm = PcmFormat::new(44100, 2).unwrap();
        let mut converter = FFmpeg.create(&aac, &pcm).unwrap();

        let mut out = PcmBuffer::new(pcm, FRAME_LEN).unwrap();
        let mut source = PacketSource::new(&SILENT_STEREO[ADTS_HEADER_LEN..]);
        let status = converter.convert(&mut source, &mut out).unwrap();

        assert_eq!(status, ConvertStatus::HaveData);
        assert_eq!(out.frames(), FRAME_LEN);
        assert_eq!(out.as_bytes().len(), FRAME_LEN * 2 * 4);
        assert!(out.as_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_decoded_size_must_match_output() {
        let mut out = vec![0xFFu8; FRAME_LEN * 4 - 4];
        let err = decode_audio(&FFmpeg, &request(1, &SILENT_MONO), &mut out).unwrap_err();

        assert!(matches!(
            err,
            Error::SizeMismatch {
                produced,
                expected
            } if produced == FRAME_LEN * 4 && expected == FRAME_LEN * 4 - 4
        ));
        assert!(out.iter().all(|b| *b == 0xFF));
    }
}
