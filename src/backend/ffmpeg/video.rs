//! H.264 decoding with libavcodec.

use super::{nv12_image, FFmpeg};
use crate::bridge::{FormatDescription, PixelBuffer, VideoDecoder, VideoDecoderBackend};
use crate::codec::scaler::ConverterCache;
use crate::codec::{CodecContext, CodecError, CodecResult, DecoderConfig, Packet};
use crate::ffi::accessors::codec_flag;
use crate::ffi::{AVCodecID, AVPixelFormat};
use crate::{Error, Result};

impl VideoDecoderBackend for FFmpeg {
    fn create(&self, format: &FormatDescription) -> Result<Box<dyn VideoDecoder>> {
        let config = DecoderConfig {
            codec_id: AVCodecID::H264,
            thread_count: 1,
            flags: codec_flag::LOW_DELAY,
            extradata: Some(format.avcc()),
            ..Default::default()
        };

        let open = || -> CodecResult<CodecContext> {
            let mut ctx = CodecContext::new_decoder(AVCodecID::H264)?;
            ctx.configure_decoder(&config)?;
            ctx.open()?;
            Ok(ctx)
        };
        let ctx = open().map_err(|e| Error::Session(e.to_string()))?;

        Ok(Box::new(H264Decoder {
            ctx,
            converter: ConverterCache::new(AVPixelFormat::Nv12),
        }))
    }
}

struct H264Decoder {
    ctx: CodecContext,
    converter: ConverterCache,
}

impl VideoDecoder for H264Decoder {
    fn decode(&mut self, sample: &[u8], output: &mut dyn FnMut(&PixelBuffer<'_>)) -> Result<()> {
        let decode_error = |e: CodecError| Error::Decode(e.to_string());

        let packet = Packet::from_slice(sample).map_err(decode_error)?;
        let frames = self.ctx.decode(Some(&packet)).map_err(decode_error)?;

        if frames.is_empty() {
            tracing::trace!(target: "avbridge", size = sample.len(), "sample produced no picture");
        }

        for frame in &frames {
            let converted = match self.converter.convert(frame) {
                Ok(converted) => converted,
                Err(e) => {
                    tracing::warn!(target: "avbridge", error = %e, "cannot convert decoded picture");
                    continue;
                }
            };
            let nv12 = converted.as_ref().unwrap_or(frame);

            match nv12_image(nv12) {
                Some(image) => output(&image),
                None => {
                    tracing::warn!(target: "avbridge", ?nv12, "decoded picture has no NV12 planes")
                }
            }
        }

        Ok(())
    }
}
