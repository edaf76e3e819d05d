//! The three bridges and the memory-marshaling pieces they share.
//!
//! Everything here is pure Rust. Native services plug in through the
//! backend traits each bridge defines.

pub mod audio;
pub mod avc;
pub mod capture;
pub mod plane;
pub mod rendezvous;
pub mod sps;

pub use audio::{
    decode_audio, AacFormat, AudioConverter, AudioConverterBackend, ConvertStatus, DecodeRequest,
    PacketSource, PcmBuffer, PcmFormat,
};
pub use avc::{AvcDecodeSession, AvcDecodeStats, FormatDescription, VideoDecoder, VideoDecoderBackend};
pub use capture::{
    CaptureBackend, CaptureDevice, CaptureSession, CaptureStats, FrameObserver, Geometry,
    SampleBuffer,
};
pub use plane::{copy_plane, packed_420_size, PixelBuffer, PixelFormat, Plane};
