//! libavcodec function declarations
//!
//! Provides decoding functionality.

use super::avformat::AVCodecParameters;
use super::types::*;
use std::os::raw::{c_char, c_int};

unsafe extern "C" {
  // ========================================================================
  // Codec Discovery
  // ========================================================================

  /// Find a decoder by codec ID
  pub fn avcodec_find_decoder(id: c_int) -> *const AVCodec;

  // ========================================================================
  // Codec Context Lifecycle
  // ========================================================================

  /// Allocate an AVCodecContext and set its fields to default values
  pub fn avcodec_alloc_context3(codec: *const AVCodec) -> *mut AVCodecContext;

  /// Free the codec context and everything associated with it
  pub fn avcodec_free_context(avctx: *mut *mut AVCodecContext);

  /// Initialize the AVCodecContext to use the given AVCodec
  pub fn avcodec_open2(
    avctx: *mut AVCodecContext,
    codec: *const AVCodec,
    options: *mut *mut AVDictionary,
  ) -> c_int;

  /// Fill the codec context from a stream's codec parameters
  pub fn avcodec_parameters_to_context(
    codec: *mut AVCodecContext,
    par: *const AVCodecParameters,
  ) -> c_int;

  // ========================================================================
  // Decoding (send packet, receive frame)
  // ========================================================================

  /// Supply raw packet data to the decoder
  ///
  /// # Arguments
  /// * `avctx` - Codec context
  /// * `avpkt` - AVPacket containing compressed data, or NULL to flush
  ///
  /// # Returns
  /// * 0 on success
  /// * AVERROR(EAGAIN) - output not available, must read with receive_frame first
  /// * AVERROR_EOF - decoder has been flushed
  /// * AVERROR(EINVAL) - codec not opened
  /// * AVERROR(ENOMEM) - failed to add packet to queue
  pub fn avcodec_send_packet(avctx: *mut AVCodecContext, avpkt: *const AVPacket) -> c_int;

  /// Return decoded output data from the decoder
  ///
  /// # Returns
  /// * 0 on success
  /// * AVERROR(EAGAIN) - output not available, must send more input
  /// * AVERROR_EOF - decoder has been fully flushed
  /// * AVERROR(EINVAL) - codec not opened
  pub fn avcodec_receive_frame(avctx: *mut AVCodecContext, frame: *mut AVFrame) -> c_int;

  // ========================================================================
  // Packet Management
  // ========================================================================

  /// Allocate an AVPacket and set its fields to default values
  pub fn av_packet_alloc() -> *mut AVPacket;

  /// Free the packet, if the packet is reference counted, it will be unreferenced first
  pub fn av_packet_free(pkt: *mut *mut AVPacket);

  /// Wipe the packet. Unreference the buffer and reset fields to defaults
  pub fn av_packet_unref(pkt: *mut AVPacket);

  /// Allocate new buffer for the packet with size bytes (plus zeroed padding)
  pub fn av_new_packet(pkt: *mut AVPacket, size: c_int) -> c_int;

  // ========================================================================
  // Codec Parameters
  // ========================================================================

  /// Get the name of a codec
  pub fn avcodec_get_name(id: c_int) -> *const c_char;
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Find decoder by AVCodecID enum
pub fn find_decoder(codec_id: AVCodecID) -> *const AVCodec {
  unsafe { avcodec_find_decoder(codec_id.as_raw()) }
}

/// Codec name for diagnostics
pub fn codec_name(id: c_int) -> String {
  let ptr = unsafe { avcodec_get_name(id) };
  if ptr.is_null() {
    return format!("codec {}", id);
  }
  unsafe { std::ffi::CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
