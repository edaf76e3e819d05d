//! Rust declarations for C accessor functions
//!
//! These functions provide access to FFmpeg struct fields via the thin C accessor library.

use super::avformat::{AVCodecParameters, AVFormatContext, AVStream};
use super::types::*;
use std::os::raw::c_int;

unsafe extern "C" {
  // ========================================================================
  // AVCodecContext Setters
  // ========================================================================

  pub fn ffctx_set_thread_count(ctx: *mut AVCodecContext, thread_count: c_int);
  pub fn ffctx_set_flags(ctx: *mut AVCodecContext, flags: c_int);

  /// Copy `size` bytes into a freshly allocated, padded extradata buffer.
  /// Returns 0, or AVERROR(ENOMEM).
  pub fn ffctx_set_extradata(ctx: *mut AVCodecContext, data: *const u8, size: c_int) -> c_int;

  // ========================================================================
  // AVCodecContext Getters
  // ========================================================================

  pub fn ffctx_get_width(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_height(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_pix_fmt(ctx: *const AVCodecContext) -> c_int;

  // ========================================================================
  // AVCodecContext Audio Setters
  // ========================================================================

  pub fn ffctx_set_sample_rate(ctx: *mut AVCodecContext, sample_rate: c_int);

  /// Sets the default layout for `channels` (ch_layout on FFmpeg 5.1+)
  pub fn ffctx_set_channels(ctx: *mut AVCodecContext, channels: c_int);

  // ========================================================================
  // AVCodecContext Audio Getters
  // ========================================================================

  pub fn ffctx_get_sample_rate(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_sample_fmt(ctx: *const AVCodecContext) -> c_int;
  pub fn ffctx_get_channels(ctx: *const AVCodecContext) -> c_int;

  // ========================================================================
  // AVFrame Setters
  // ========================================================================

  pub fn ffframe_set_width(frame: *mut AVFrame, width: c_int);
  pub fn ffframe_set_height(frame: *mut AVFrame, height: c_int);
  pub fn ffframe_set_format(frame: *mut AVFrame, format: c_int);

  // ========================================================================
  // AVFrame Getters
  // ========================================================================

  pub fn ffframe_get_width(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_height(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_format(frame: *const AVFrame) -> c_int;

  // ========================================================================
  // AVFrame Audio Getters
  // ========================================================================

  pub fn ffframe_get_nb_samples(frame: *const AVFrame) -> c_int;
  pub fn ffframe_get_channels(frame: *const AVFrame) -> c_int;

  // ========================================================================
  // AVFrame Data Access
  // ========================================================================

  pub fn ffframe_data(frame: *mut AVFrame, plane: c_int) -> *mut u8;
  pub fn ffframe_data_const(frame: *const AVFrame, plane: c_int) -> *const u8;
  pub fn ffframe_linesize(frame: *const AVFrame, plane: c_int) -> c_int;

  /// Plane pointer for planar audio, which may exceed the 8 `data` slots
  pub fn ffframe_extended_data_plane(frame: *const AVFrame, plane: c_int) -> *const u8;

  // ========================================================================
  // AVPacket
  // ========================================================================

  pub fn ffpkt_data(pkt: *const AVPacket) -> *const u8;
  pub fn ffpkt_data_mut(pkt: *mut AVPacket) -> *mut u8;
  pub fn ffpkt_size(pkt: *const AVPacket) -> c_int;
  pub fn ffpkt_stream_index(pkt: *const AVPacket) -> c_int;

  // ========================================================================
  // AVFormatContext / AVStream
  // ========================================================================

  pub fn fffmt_get_stream(ctx: *const AVFormatContext, index: u32) -> *const AVStream;
  pub fn fffmt_get_flags(ctx: *const AVFormatContext) -> c_int;
  pub fn fffmt_set_flags(ctx: *mut AVFormatContext, flags: c_int);
  pub fn ffstream_get_codecpar_const(stream: *const AVStream) -> *const AVCodecParameters;

  // ========================================================================
  // AVCodecParameters
  // ========================================================================

  pub fn ffcodecpar_get_codec_type(par: *const AVCodecParameters) -> c_int;
  pub fn ffcodecpar_get_codec_id(par: *const AVCodecParameters) -> c_int;
  pub fn ffcodecpar_get_width(par: *const AVCodecParameters) -> c_int;
  pub fn ffcodecpar_get_height(par: *const AVCodecParameters) -> c_int;
  pub fn ffcodecpar_get_format(par: *const AVCodecParameters) -> c_int;
}

// ============================================================================
// Codec Flags
// ============================================================================

pub mod codec_flag {
  use std::os::raw::c_int;

  /// Force low delay: output frames as soon as they are decoded
  pub const LOW_DELAY: c_int = 1 << 19;
}
