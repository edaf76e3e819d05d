//! Hand-written FFmpeg C bindings (no bindgen)
//!
//! This module provides the minimal FFmpeg surface the native backends need:
//! AAC and H.264 decoding, capture device input and conversion to NV12.
//! All FFmpeg structs are opaque - we access fields via the thin C accessor library.

pub mod accessors;
pub mod avcodec;
pub mod avdevice;
pub mod avformat;
pub mod avutil;
pub mod error;
pub mod swscale;
pub mod types;

pub use error::{check_error, FFmpegError};
pub use types::*;

// Statically linked FFmpeg builds pull in zlib.
use libz_sys as _;
