#![deny(clippy::all)]

//! Native audio/video bridges behind a C ABI
//!
//! Three services cross the boundary as opaque handles and caller-owned buffers:
//! AAC packets decoded to interleaved f32 PCM, camera frames pulled
//! synchronously as packed NV12, and H.264 samples decoded to packed 4:2:0.
//! The bridges are pure Rust; FFmpeg provides the native services when the
//! `ffmpeg` feature is enabled.

mod error;
pub use error::{Error, Result};

pub mod log;

// Bridges and their backend traits (no FFmpeg dependency)
pub mod bridge;

// Native service selection
mod backend;

// Exported C functions
pub mod api;

// FFmpeg C bindings (hand-written, no bindgen)
#[cfg(feature = "ffmpeg")]
pub mod ffi;

// Safe codec wrappers (RAII)
#[cfg(feature = "ffmpeg")]
pub mod codec;

pub use bridge::{AvcDecodeStats, CaptureStats};
