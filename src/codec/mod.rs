//! Safe Rust wrappers for FFmpeg codec operations
//!
//! This module provides RAII wrappers around FFmpeg's C structures,
//! ensuring proper resource cleanup and memory safety.

pub mod context;
pub mod frame;
pub mod input;
pub mod packet;
pub mod scaler;

pub use context::CodecContext;
pub use frame::Frame;
pub use input::InputDevice;
pub use packet::Packet;
pub use scaler::Scaler;

use crate::ffi::{AVCodecID, AVPixelFormat};

/// Decoder configuration
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Codec ID
    pub codec_id: AVCodecID,
    /// Number of threads (0 for auto)
    pub thread_count: u32,
    /// Codec flags (`codec_flag::*`)
    pub flags: i32,
    /// Extra data (codec-specific, e.g. avcC for H.264, AudioSpecificConfig for AAC)
    pub extradata: Option<Vec<u8>>,
    /// Audio sample rate, when the container does not carry one
    pub sample_rate: Option<u32>,
    /// Audio channel count, when the container does not carry one
    pub channels: Option<u32>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            codec_id: AVCodecID::H264,
            thread_count: 0,
            flags: 0,
            extradata: None,
            sample_rate: None,
            channels: None,
        }
    }
}

/// Codec error type
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] crate::ffi::FFmpegError),

    #[error("Decoder not found for codec: {0:?}")]
    DecoderNotFound(AVCodecID),

    #[error("Input format not found: {0}")]
    InputFormatNotFound(String),

    #[error("Failed to allocate {0}")]
    AllocationFailed(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unsupported pixel format: {0:?}")]
    UnsupportedPixelFormat(AVPixelFormat),
}

pub type CodecResult<T> = Result<T, CodecError>;
