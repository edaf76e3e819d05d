//! Capture device input for FFmpeg libavformat/libavdevice
//!
//! Provides RAII wrapper around an AVFormatContext opened on a device
//! (v4l2, avfoundation, dshow) rather than a file. Devices are opened
//! nonblocking: a read never waits for the next frame.

use super::{CodecError, Packet};
use crate::ffi::accessors::{
  ffcodecpar_get_codec_id, ffcodecpar_get_codec_type, ffcodecpar_get_format,
  ffcodecpar_get_height, ffcodecpar_get_width, fffmt_get_flags, fffmt_get_stream,
  fffmt_set_flags, ffstream_get_codecpar_const,
};
use crate::ffi::avdevice::register_devices;
use crate::ffi::avformat::{
  av_find_best_stream, av_find_input_format, av_read_frame, avformat_alloc_context,
  avformat_close_input, avformat_find_stream_info, avformat_open_input, format_flag, media_type,
  AVCodecParameters, AVFormatContext,
};
use crate::ffi::avutil::Options;
use crate::ffi::error::{AVERROR_EAGAIN, AVERROR_EOF};
use crate::ffi::{AVCodecID, FFmpegError};
use std::ffi::CString;
use std::ptr::{self, NonNull};

/// Video stream information of an opened device
#[derive(Debug, Clone)]
pub struct VideoStream {
  /// Stream index within the input
  pub index: i32,
  /// Codec the device emits (raw video, MJPEG, ...)
  pub codec_id: AVCodecID,
  /// Raw codec ID as reported by FFmpeg
  pub raw_codec_id: i32,
  pub width: u32,
  pub height: u32,
  /// Raw pixel format of raw-video streams
  pub format: i32,
  codecpar: *const AVCodecParameters,
}

impl VideoStream {
  /// Codec parameters owned by the input; valid while the input is open
  pub fn codec_parameters(&self) -> *const AVCodecParameters {
    self.codecpar
  }
}

/// Outcome of a packet read
#[derive(Debug)]
pub enum ReadStatus {
  /// A packet was read into the caller's packet
  Packet,
  /// The device has nothing ready yet
  Again,
  /// The device stopped producing
  Eof,
}

/// Demuxer opened on a capture device
pub struct InputDevice {
  ptr: NonNull<AVFormatContext>,
  video: VideoStream,
}

impl InputDevice {
  /// Open `url` through the input format (device) called `format_name`
  ///
  /// `options` are device private options such as `framerate` or `pixel_format`.
  pub fn open(format_name: &str, url: &str, options: &[(&str, &str)]) -> Result<Self, CodecError> {
    register_devices();

    let c_format = CString::new(format_name)
      .map_err(|_| CodecError::InvalidConfig("Invalid input format name".to_string()))?;
    let input_format = unsafe { av_find_input_format(c_format.as_ptr()) };
    if input_format.is_null() {
      return Err(CodecError::InputFormatNotFound(format_name.to_string()));
    }

    let c_url =
      CString::new(url).map_err(|_| CodecError::InvalidConfig("Invalid device name".to_string()))?;

    let mut dict = Options::new();
    for (key, value) in options {
      let c_key = CString::new(*key)
        .map_err(|_| CodecError::InvalidConfig(format!("Invalid option name {:?}", key)))?;
      let c_value = CString::new(*value)
        .map_err(|_| CodecError::InvalidConfig(format!("Invalid value for {}", key)))?;
      crate::ffi::check_error(dict.set(&c_key, &c_value))?;
    }

    let mut ctx_ptr = unsafe { avformat_alloc_context() };
    if ctx_ptr.is_null() {
      return Err(CodecError::AllocationFailed("AVFormatContext"));
    }
    unsafe { fffmt_set_flags(ctx_ptr, fffmt_get_flags(ctx_ptr) | format_flag::NONBLOCK) };

    let ret =
      unsafe { avformat_open_input(&mut ctx_ptr, c_url.as_ptr(), input_format, dict.as_mut_ptr()) };

    // On failure, avformat_open_input frees the context
    let ptr = match NonNull::new(ctx_ptr) {
      Some(ptr) if ret >= 0 => ptr,
      _ => return Err(CodecError::Ffmpeg(FFmpegError::from_code(ret))),
    };

    let ret = unsafe { avformat_find_stream_info(ptr.as_ptr(), ptr::null_mut()) };
    let video = if ret < 0 {
      Err(CodecError::Ffmpeg(FFmpegError::from_code(ret)))
    } else {
      unsafe { Self::find_video_stream(ptr.as_ptr()) }.ok_or_else(|| {
        CodecError::InvalidState(format!(
          "{} device {:?} has no video stream",
          format_name, url
        ))
      })
    };
    let video = match video {
      Ok(video) => video,
      Err(e) => {
        let mut ctx = ptr.as_ptr();
        unsafe { avformat_close_input(&mut ctx) };
        return Err(e);
      }
    };

    tracing::debug!(
      target: "avbridge",
      format = format_name,
      device = url,
      width = video.width,
      height = video.height,
      codec = %crate::ffi::avcodec::codec_name(video.raw_codec_id),
      "opened capture input"
    );

    Ok(Self { ptr, video })
  }

  unsafe fn find_video_stream(ctx: *mut AVFormatContext) -> Option<VideoStream> {
    let index =
      unsafe { av_find_best_stream(ctx, media_type::VIDEO, -1, -1, ptr::null_mut(), 0) };
    if index < 0 {
      return None;
    }

    let stream = unsafe { fffmt_get_stream(ctx, index as u32) };
    if stream.is_null() {
      return None;
    }
    let codecpar = unsafe { ffstream_get_codecpar_const(stream) };
    if codecpar.is_null() || unsafe { ffcodecpar_get_codec_type(codecpar) } != media_type::VIDEO {
      return None;
    }

    unsafe {
      let raw_codec_id = ffcodecpar_get_codec_id(codecpar);
      Some(VideoStream {
        index,
        codec_id: AVCodecID::from_raw(raw_codec_id),
        raw_codec_id,
        width: ffcodecpar_get_width(codecpar).max(0) as u32,
        height: ffcodecpar_get_height(codecpar).max(0) as u32,
        format: ffcodecpar_get_format(codecpar),
        codecpar,
      })
    }
  }

  /// The device's video stream
  pub fn video_stream(&self) -> &VideoStream {
    &self.video
  }

  /// Whether reads return [`ReadStatus::Again`] instead of waiting
  pub fn is_nonblocking(&self) -> bool {
    unsafe { fffmt_get_flags(self.ptr.as_ptr()) & format_flag::NONBLOCK != 0 }
  }

  /// Read the next packet into `packet`
  pub fn read_packet(&mut self, packet: &mut Packet) -> Result<ReadStatus, CodecError> {
    packet.unref();
    let ret = unsafe { av_read_frame(self.ptr.as_ptr(), packet.as_mut_ptr()) };

    match ret {
      AVERROR_EAGAIN => Ok(ReadStatus::Again),
      AVERROR_EOF => Ok(ReadStatus::Eof),
      ret if ret < 0 => Err(CodecError::Ffmpeg(FFmpegError::from_code(ret))),
      _ => Ok(ReadStatus::Packet),
    }
  }
}

impl Drop for InputDevice {
  fn drop(&mut self) {
    let mut ptr = self.ptr.as_ptr();
    unsafe { avformat_close_input(&mut ptr) };
  }
}

// The format context is only ever touched by the thread that owns the input
unsafe impl Send for InputDevice {}

impl std::fmt::Debug for InputDevice {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("InputDevice")
      .field("video", &self.video)
      .finish()
  }
}
