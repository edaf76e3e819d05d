//! Native services behind the bridge traits.
//!
//! With the `ffmpeg` feature the bridges run on FFmpeg. Without it every
//! service reports `Unsupported`, so the C entry points still link and fail
//! cleanly.

use crate::bridge::{AudioConverterBackend, CaptureBackend, VideoDecoderBackend};

#[cfg(feature = "ffmpeg")]
mod ffmpeg;
#[cfg(not(feature = "ffmpeg"))]
mod unavailable;

#[cfg(feature = "ffmpeg")]
static NATIVE: ffmpeg::FFmpeg = ffmpeg::FFmpeg;
#[cfg(not(feature = "ffmpeg"))]
static NATIVE: unavailable::Unavailable = unavailable::Unavailable;

/// AAC to PCM conversion
pub fn audio() -> &'static dyn AudioConverterBackend {
    &NATIVE
}

/// Camera capture devices
pub fn capture() -> &'static dyn CaptureBackend {
    &NATIVE
}

/// H.264 decode sessions
pub fn video() -> &'static dyn VideoDecoderBackend {
    &NATIVE
}
