//! Stand-in used when the crate is built without native services.

use crate::bridge::{
    AacFormat, AudioConverter, AudioConverterBackend, CaptureBackend, CaptureDevice,
    FormatDescription, PcmFormat, VideoDecoder, VideoDecoderBackend,
};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct Unavailable;

fn unsupported(service: &str) -> Error {
    tracing::debug!(target: "avbridge", service, "native services not built");
    Error::Unsupported(format!("{} requires the ffmpeg feature", service))
}

impl AudioConverterBackend for Unavailable {
    fn create(&self, _from: &AacFormat, _to: &PcmFormat) -> Result<Box<dyn AudioConverter>> {
        Err(unsupported("audio decoding"))
    }
}

impl CaptureBackend for Unavailable {
    fn open(&self, _device: &str) -> Result<Box<dyn CaptureDevice>> {
        Err(unsupported("camera capture"))
    }
}

impl VideoDecoderBackend for Unavailable {
    fn create(&self, _format: &FormatDescription) -> Result<Box<dyn VideoDecoder>> {
        Err(unsupported("video decoding"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_service_is_unsupported() {
        let aac = AacFormat::new(0, 44100, 2).unwrap();
        let pcm = PcmFormat::new(44100, 2).unwrap();
        assert!(matches!(
            AudioConverterBackend::create(&Unavailable, &aac, &pcm),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(Unavailable.open(""), Err(Error::Unsupported(_))));
    }
}
