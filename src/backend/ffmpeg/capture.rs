//! Camera capture through libavdevice.
//!
//! Each device runs one delivery thread that reads, decodes and converts
//! frames to NV12, handing every frame to the observer whether or not a
//! pull is armed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{nv12_image, FFmpeg};
use crate::bridge::{CaptureBackend, CaptureDevice, FrameObserver, SampleBuffer};
use crate::codec::input::ReadStatus;
use crate::codec::scaler::ConverterCache;
use crate::codec::{CodecContext, CodecResult, Frame, InputDevice, Packet};
use crate::ffi::{avcodec::codec_name, AVCodecID, AVPixelFormat};
use crate::{Error, Result};

/// Environment variable overriding the FFmpeg input device format
pub const FORMAT_ENV: &str = "AVBRIDGE_CAPTURE_FORMAT";

#[cfg(target_os = "macos")]
const DEFAULT_FORMAT: &str = "avfoundation";
#[cfg(target_os = "windows")]
const DEFAULT_FORMAT: &str = "dshow";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const DEFAULT_FORMAT: &str = "v4l2";

/// Pause between polls of a device that has nothing ready
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Input format and device URL to open
#[derive(Debug, Clone, PartialEq, Eq)]
struct Source {
    format: String,
    url: String,
}

impl Source {
    fn resolve(device: &str, format_override: Option<String>) -> Result<Self> {
        let format = format_override
            .filter(|format| !format.is_empty())
            .unwrap_or_else(|| DEFAULT_FORMAT.to_string());

        let url = match (format.as_str(), device) {
            ("v4l2", "") => "/dev/video0".to_string(),
            ("avfoundation", "") => "0".to_string(),
            ("dshow", "") => {
                return Err(Error::Device("dshow capture needs a device name".into()));
            }
            ("dshow", name) if !name.starts_with("video=") => format!("video={}", name),
            (_, "") => {
                return Err(Error::Device(format!("no default device for {}", format)));
            }
            (_, name) => name.to_string(),
        };

        Ok(Self { format, url })
    }
}

impl CaptureBackend for FFmpeg {
    fn open(&self, device: &str) -> Result<Box<dyn CaptureDevice>> {
        let source = Source::resolve(device, std::env::var(FORMAT_ENV).ok())?;
        let pipeline = Pipeline::open(&source, &[])?;

        Ok(Box::new(FFmpegCaptureDevice {
            source,
            pipeline: Some(pipeline),
            stop: Arc::new(AtomicBool::new(false)),
            thread: None,
        }))
    }
}

/// Reads, decodes and converts frames from one device
struct Pipeline {
    input: InputDevice,
    decoder: CodecContext,
    converter: ConverterCache,
}

impl Pipeline {
    fn open(source: &Source, options: &[(&str, &str)]) -> Result<Self> {
        let device_error = |e: crate::codec::CodecError| {
            Error::Device(format!("{} {}: {}", source.format, source.url, e))
        };

        let input =
            InputDevice::open(&source.format, &source.url, options).map_err(device_error)?;

        let stream = input.video_stream();
        if stream.codec_id == AVCodecID::None {
            return Err(Error::Device(format!(
                "{} {} emits unsupported codec {}",
                source.format,
                source.url,
                codec_name(stream.raw_codec_id)
            )));
        }

        let open = || -> CodecResult<CodecContext> {
            let mut decoder =
                CodecContext::from_parameters(stream.codec_id, stream.codec_parameters())?;
            decoder.open()?;
            Ok(decoder)
        };
        let decoder = open().map_err(device_error)?;

        Ok(Self {
            input,
            decoder,
            converter: ConverterCache::new(AVPixelFormat::Nv12),
        })
    }

    /// Deliver frames until `stop` is raised or the device ends.
    ///
    /// The observer is dropped on return, which closes the session's pull channel.
    fn run(mut self, mut observer: FrameObserver, stop: &AtomicBool) {
        let mut packet = match Packet::new() {
            Ok(packet) => packet,
            Err(e) => {
                tracing::error!(target: "avbridge", error = %e, "cannot allocate capture packet");
                return;
            }
        };
        let stream_index = self.input.video_stream().index;

        while !stop.load(Ordering::Acquire) {
            match self.input.read_packet(&mut packet) {
                Ok(ReadStatus::Packet) => {}
                Ok(ReadStatus::Again) => {
                    thread::sleep(POLL_INTERVAL);
                    continue;
                }
                Ok(ReadStatus::Eof) => {
                    tracing::info!(target: "avbridge", "capture device stopped producing");
                    break;
                }
                Err(e) => {
                    tracing::error!(target: "avbridge", error = %e, "capture read failed");
                    break;
                }
            }

            if packet.stream_index() != stream_index {
                continue;
            }

            let frames = match self.decoder.decode(Some(&packet)) {
                Ok(frames) => frames,
                Err(e) => {
                    tracing::debug!(target: "avbridge", error = %e, "dropping undecodable capture packet");
                    continue;
                }
            };

            for frame in &frames {
                self.deliver(frame, &mut observer);
            }
        }
    }

    fn deliver(&mut self, frame: &Frame, observer: &mut FrameObserver) {
        let converted = match self.converter.convert(frame) {
            Ok(converted) => converted,
            Err(e) => {
                tracing::warn!(target: "avbridge", error = %e, "cannot convert captured frame");
                None
            }
        };
        let nv12 = converted.as_ref().unwrap_or(frame);

        // Frames that could not be converted still reach the observer, which rejects them
        observer.on_sample(&SampleBuffer {
            num_samples: 1,
            image: nv12_image(nv12),
        });
    }
}

struct FFmpegCaptureDevice {
    source: Source,
    pipeline: Option<Pipeline>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureDevice for FFmpegCaptureDevice {
    fn start(&mut self, observer: FrameObserver) -> Result<()> {
        let pipeline = self
            .pipeline
            .take()
            .ok_or_else(|| Error::Device(format!("{} already started", self.source.url)))?;

        self.stop.store(false, Ordering::Release);
        let stop = self.stop.clone();

        let thread = thread::Builder::new()
            .name("avbridge-capture".into())
            .spawn(move || pipeline.run(observer, &stop))
            .map_err(|e| Error::Device(format!("cannot spawn delivery thread: {}", e)))?;

        tracing::debug!(
            target: "avbridge",
            format = %self.source.format,
            device = %self.source.url,
            "capture started"
        );
        self.thread = Some(thread);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!(target: "avbridge", "capture delivery thread panicked");
            }
        }
    }
}

impl Drop for FFmpegCaptureDevice {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_default_devices() {
        let v4l2 = Source::resolve("", Some("v4l2".into())).unwrap();
        assert_eq!(v4l2.url, "/dev/video0");

        let avf = Source::resolve("", Some("avfoundation".into())).unwrap();
        assert_eq!(avf.url, "0");

        assert!(matches!(
            Source::resolve("", Some("dshow".into())),
            Err(Error::Device(_))
        ));
        assert!(matches!(
            Source::resolve("", Some("x11grab".into())),
            Err(Error::Device(_))
        ));
    }

    #[test]
    fn test_resolve_named_devices() {
        let dshow = Source::resolve("USB Camera", Some("dshow".into())).unwrap();
        assert_eq!(dshow.url, "video=USB Camera");

        let prefixed = Source::resolve("video=USB Camera", Some("dshow".into())).unwrap();
        assert_eq!(prefixed.url, "video=USB Camera");

        let v4l2 = Source::resolve("/dev/video2", Some("v4l2".into())).unwrap();
        assert_eq!(v4l2.url, "/dev/video2");
    }

    #[test]
    fn test_resolve_uses_platform_format() {
        let source = Source::resolve("cam", None).unwrap();
        assert_eq!(source.format, DEFAULT_FORMAT);

        let empty = Source::resolve("cam", Some(String::new())).unwrap();
        assert_eq!(empty.format, DEFAULT_FORMAT);
    }

    #[test]
    fn test_open_missing_device() {
        let err = Pipeline::open(
            &Source {
                format: "v4l2".into(),
                url: "/dev/avbridge-missing".into(),
            },
            &[],
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Device(_)));
    }

    #[test]
    fn test_pipeline_reads_nonblocking() {
        let path = std::env::temp_dir()
            .join(format!("avbridge-pipeline-{}.nv12", std::process::id()));
        std::fs::write(&path, vec![0x10u8; 32 * 16 * 3 / 2]).unwrap();

        let pipeline = Pipeline::open(
            &Source {
                format: "rawvideo".into(),
                url: path.to_string_lossy().into_owned(),
            },
            &[("video_size", "32x16"), ("pixel_format", "nv12")],
        )
        .unwrap();
        assert!(pipeline.input.is_nonblocking());
        assert_eq!(pipeline.decoder.codec_id(), AVCodecID::Rawvideo);

        drop(pipeline);
        let _ = std::fs::remove_file(path);
    }
}
