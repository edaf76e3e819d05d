//! Core FFmpeg type definitions
//!
//! All FFmpeg structs are opaque (zero-sized) to avoid version-specific layout dependencies.
//! Field access is done via the thin C accessor library in accessors.c

use std::marker::PhantomData;
use std::os::raw::c_int;

// ============================================================================
// Codec IDs
// ============================================================================

/// Codec IDs used by the native backends
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AVCodecID {
    None = 0,
    // Camera streams
    Mjpeg = 7,
    Rawvideo = 13,
    H264 = 27,
    Aac = 86018,
}

impl AVCodecID {
    /// Map a raw FFmpeg codec ID; codecs we don't decode become `None`
    pub fn from_raw(value: c_int) -> Self {
        match value {
            7 => Self::Mjpeg,
            13 => Self::Rawvideo,
            27 => Self::H264,
            86018 => Self::Aac,
            _ => Self::None,
        }
    }

    /// Get the raw FFmpeg codec ID value
    pub fn as_raw(&self) -> c_int {
        *self as c_int
    }
}

// ============================================================================
// Pixel Formats
// ============================================================================

/// Video pixel formats seen from decoders and capture devices
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AVPixelFormat {
    None = -1,
    // Planar YUV formats
    Yuv420p = 0,
    Yuv422p = 4,
    Yuv444p = 5,
    // Full-range planar YUV (MJPEG cameras)
    Yuvj420p = 12,
    Yuvj422p = 13,
    // Packed YUV formats (most USB cameras)
    Yuyv422 = 1,
    Uyvy422 = 15,
    // Semi-planar formats
    Nv12 = 23,
    Nv21 = 24,
    // RGB formats
    Rgb24 = 2,
    Bgr24 = 3,
    Bgra = 28,
}

impl AVPixelFormat {
    /// Map a raw FFmpeg pixel format; formats we don't name become `None`
    pub fn from_raw(value: c_int) -> Self {
        match value {
            0 => Self::Yuv420p,
            1 => Self::Yuyv422,
            2 => Self::Rgb24,
            3 => Self::Bgr24,
            4 => Self::Yuv422p,
            5 => Self::Yuv444p,
            12 => Self::Yuvj420p,
            13 => Self::Yuvj422p,
            15 => Self::Uyvy422,
            23 => Self::Nv12,
            24 => Self::Nv21,
            28 => Self::Bgra,
            _ => Self::None,
        }
    }

    /// Get the raw FFmpeg pixel format value
    pub fn as_raw(&self) -> c_int {
        *self as c_int
    }

    /// Number of planes for this pixel format
    pub fn num_planes(&self) -> usize {
        match self {
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p | Self::Yuvj420p | Self::Yuvj422p => 3,
            Self::Nv12 | Self::Nv21 => 2,
            Self::Yuyv422 | Self::Uyvy422 | Self::Rgb24 | Self::Bgr24 | Self::Bgra => 1,
            Self::None => 0,
        }
    }
}

// ============================================================================
// Sample Formats
// ============================================================================

/// Audio sample formats
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AVSampleFormat {
    None = -1,
    U8 = 0,
    S16 = 1,
    S32 = 2,
    Flt = 3,
    Dbl = 4,
    U8p = 5,
    S16p = 6,
    S32p = 7,
    Fltp = 8,
    Dblp = 9,
}

impl AVSampleFormat {
    pub fn from_raw(value: c_int) -> Self {
        match value {
            0 => Self::U8,
            1 => Self::S16,
            2 => Self::S32,
            3 => Self::Flt,
            4 => Self::Dbl,
            5 => Self::U8p,
            6 => Self::S16p,
            7 => Self::S32p,
            8 => Self::Fltp,
            9 => Self::Dblp,
            _ => Self::None,
        }
    }

    pub fn as_raw(&self) -> c_int {
        *self as c_int
    }

    /// Whether each channel lives in its own plane
    pub fn is_planar(&self) -> bool {
        matches!(self, Self::U8p | Self::S16p | Self::S32p | Self::Fltp | Self::Dblp)
    }
}

// ============================================================================
// Opaque FFmpeg Types
// ============================================================================

/// Opaque AVCodec structure (codec implementation descriptor)
#[repr(C)]
pub struct AVCodec {
    _opaque: [u8; 0],
    _marker: PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVCodecContext structure (encoder/decoder instance)
#[repr(C)]
pub struct AVCodecContext {
    _opaque: [u8; 0],
    _marker: PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVFrame structure (uncompressed video/audio data)
#[repr(C)]
pub struct AVFrame {
    _opaque: [u8; 0],
    _marker: PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVPacket structure (compressed data)
#[repr(C)]
pub struct AVPacket {
    _opaque: [u8; 0],
    _marker: PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque SwsContext structure (software scaler context)
#[repr(C)]
pub struct SwsContext {
    _opaque: [u8; 0],
    _marker: PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque SwsFilter structure
#[repr(C)]
pub struct SwsFilter {
    _opaque: [u8; 0],
    _marker: PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVDictionary structure (key-value options)
#[repr(C)]
pub struct AVDictionary {
    _opaque: [u8; 0],
    _marker: PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_roundtrip() {
        for format in [
            AVPixelFormat::Yuv420p,
            AVPixelFormat::Yuyv422,
            AVPixelFormat::Uyvy422,
            AVPixelFormat::Yuvj422p,
            AVPixelFormat::Nv12,
        ] {
            assert_eq!(AVPixelFormat::from_raw(format.as_raw()), format);
        }
        assert_eq!(AVPixelFormat::from_raw(999), AVPixelFormat::None);
    }

    #[test]
    fn test_codec_id_from_raw() {
        assert_eq!(AVCodecID::from_raw(27), AVCodecID::H264);
        assert_eq!(AVCodecID::from_raw(13), AVCodecID::Rawvideo);
        assert_eq!(AVCodecID::from_raw(12345), AVCodecID::None);
    }

    #[test]
    fn test_sample_format_planar() {
        assert!(AVSampleFormat::from_raw(8).is_planar());
        assert!(!AVSampleFormat::from_raw(3).is_planar());
        assert_eq!(AVSampleFormat::from_raw(-5), AVSampleFormat::None);
    }
}
