//! libavformat function declarations
//!
//! Provides demuxing for capture devices opened through libavdevice.

use super::types::*;
use std::os::raw::{c_char, c_int};

// ============================================================================
// Opaque Types (format-specific)
// ============================================================================

/// Opaque AVFormatContext structure (demuxer context)
#[repr(C)]
pub struct AVFormatContext {
  _opaque: [u8; 0],
  _marker: std::marker::PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVInputFormat structure (input format or device descriptor)
#[repr(C)]
pub struct AVInputFormat {
  _opaque: [u8; 0],
  _marker: std::marker::PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVStream structure (stream within an input)
#[repr(C)]
pub struct AVStream {
  _opaque: [u8; 0],
  _marker: std::marker::PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

/// Opaque AVCodecParameters structure (stream codec parameters)
#[repr(C)]
pub struct AVCodecParameters {
  _opaque: [u8; 0],
  _marker: std::marker::PhantomData<(*mut u8, std::marker::PhantomPinned)>,
}

unsafe extern "C" {
  // ========================================================================
  // Input Formats
  // ========================================================================

  /// Find an input format (or device) by short name, e.g. "v4l2"
  pub fn av_find_input_format(short_name: *const c_char) -> *const AVInputFormat;

  /// Allocate an empty AVFormatContext, so flags can be set before opening
  pub fn avformat_alloc_context() -> *mut AVFormatContext;

  // ========================================================================
  // Demuxing
  // ========================================================================

  /// Open an input and read its header
  ///
  /// # Arguments
  /// * `ps` - Pointer to user-supplied AVFormatContext (may point to NULL)
  /// * `url` - Device or file name to open
  /// * `fmt` - Force a specific input format (NULL to autodetect)
  /// * `options` - Demuxer private options; consumed entries are removed
  ///
  /// # Returns
  /// * 0 on success
  /// * Negative AVERROR on error; a user-supplied context is freed
  pub fn avformat_open_input(
    ps: *mut *mut AVFormatContext,
    url: *const c_char,
    fmt: *const AVInputFormat,
    options: *mut *mut AVDictionary,
  ) -> c_int;

  /// Close an opened input AVFormatContext
  ///
  /// Frees the context and all its contents and sets *s to NULL.
  pub fn avformat_close_input(s: *mut *mut AVFormatContext);

  /// Read packets to get stream information
  pub fn avformat_find_stream_info(
    ic: *mut AVFormatContext,
    options: *mut *mut AVDictionary,
  ) -> c_int;

  /// Find the "best" stream of a media type
  ///
  /// # Returns
  /// * >= 0 on success (stream index)
  /// * AVERROR_STREAM_NOT_FOUND if not found
  pub fn av_find_best_stream(
    ic: *mut AVFormatContext,
    type_: c_int,
    wanted_stream_nb: c_int,
    related_stream: c_int,
    decoder_ret: *mut *const AVCodec,
    flags: c_int,
  ) -> c_int;

  /// Return the next packet of the input
  ///
  /// # Returns
  /// * 0 on success
  /// * AVERROR(EAGAIN) when a device has nothing ready yet
  /// * AVERROR_EOF or another negative value on end or error
  pub fn av_read_frame(s: *mut AVFormatContext, pkt: *mut AVPacket) -> c_int;
}

// ============================================================================
// Constants
// ============================================================================

/// Media types
pub mod media_type {
  use std::os::raw::c_int;

  pub const UNKNOWN: c_int = -1;
  pub const VIDEO: c_int = 0;
  pub const AUDIO: c_int = 1;
}

/// AVFormatContext.flags
pub mod format_flag {
  use std::os::raw::c_int;

  /// Reads return AVERROR(EAGAIN) instead of waiting for the device
  pub const NONBLOCK: c_int = 0x0004;
}
