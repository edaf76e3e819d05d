//! Safe wrapper around FFmpeg SwsContext
//!
//! Converts decoded and captured frames to the layout the bridges hand out.
//! Sizes are never changed, only the pixel format.

use crate::ffi::{
  swscale::{is_input_supported, sws_freeContext, sws_getContext, sws_scale, SWS_BILINEAR},
  AVPixelFormat, SwsContext,
};
use std::ptr::NonNull;

use super::{CodecError, CodecResult, Frame};

/// Safe wrapper around SwsContext for pixel format conversion
pub struct Scaler {
  ptr: NonNull<SwsContext>,
  width: u32,
  height: u32,
  src_format: i32,
  dst_format: AVPixelFormat,
}

impl Scaler {
  /// Create a scaler for format conversion only (no scaling)
  ///
  /// `src_format` is the raw FFmpeg value so that formats without an
  /// `AVPixelFormat` variant can still be converted.
  pub fn new_converter(
    width: u32,
    height: u32,
    src_format: i32,
    dst_format: AVPixelFormat,
  ) -> CodecResult<Self> {
    if width == 0 || height == 0 {
      return Err(CodecError::InvalidConfig(format!(
        "Cannot convert a {}x{} image",
        width, height
      )));
    }
    if !is_input_supported(src_format) {
      return Err(CodecError::UnsupportedPixelFormat(AVPixelFormat::from_raw(
        src_format,
      )));
    }

    let ptr = unsafe {
      sws_getContext(
        width as i32,
        height as i32,
        src_format,
        width as i32,
        height as i32,
        dst_format.as_raw(),
        SWS_BILINEAR,
        std::ptr::null_mut(),
        std::ptr::null_mut(),
        std::ptr::null(),
      )
    };

    NonNull::new(ptr)
      .map(|ptr| Self {
        ptr,
        width,
        height,
        src_format,
        dst_format,
      })
      .ok_or(CodecError::InvalidConfig(format!(
        "Cannot create converter from format {} to {:?} at {}x{}",
        src_format, dst_format, width, height
      )))
  }

  /// Whether this converter accepts `src` as input
  pub fn matches(&self, src: &Frame) -> bool {
    src.width() == self.width && src.height() == self.height && src.raw_format() == self.src_format
  }

  /// Convert a frame into an already allocated destination frame
  pub fn scale(&self, src: &Frame, dst: &mut Frame) -> CodecResult<()> {
    if !self.matches(src) || dst.width() != self.width || dst.height() != self.height {
      return Err(CodecError::InvalidConfig(
        "Frame dimensions don't match scaler configuration".into(),
      ));
    }

    // Prepare source data pointers and strides
    let src_data: [*const u8; 4] = [src.data(0), src.data(1), src.data(2), src.data(3)];
    let src_linesize: [i32; 4] = [
      src.linesize(0),
      src.linesize(1),
      src.linesize(2),
      src.linesize(3),
    ];

    // Prepare destination data pointers and strides
    let dst_data: [*mut u8; 4] = [
      dst.data_mut(0),
      dst.data_mut(1),
      dst.data_mut(2),
      dst.data_mut(3),
    ];
    let dst_linesize: [i32; 4] = [
      dst.linesize(0),
      dst.linesize(1),
      dst.linesize(2),
      dst.linesize(3),
    ];

    let result = unsafe {
      sws_scale(
        self.ptr.as_ptr(),
        src_data.as_ptr(),
        src_linesize.as_ptr(),
        0,
        self.height as i32,
        dst_data.as_ptr(),
        dst_linesize.as_ptr(),
      )
    };

    if result != self.height as i32 {
      return Err(CodecError::InvalidState(format!(
        "Scaling produced {} rows instead of {}",
        result, self.height
      )));
    }

    Ok(())
  }

  /// Convert a frame, allocating a new destination frame
  pub fn scale_alloc(&self, src: &Frame) -> CodecResult<Frame> {
    let mut dst = Frame::new_video(self.width, self.height, self.dst_format)?;
    self.scale(src, &mut dst)?;
    Ok(dst)
  }

  /// Get destination format
  pub fn dst_format(&self) -> AVPixelFormat {
    self.dst_format
  }
}

impl Drop for Scaler {
  fn drop(&mut self) {
    unsafe { sws_freeContext(self.ptr.as_ptr()) }
  }
}

unsafe impl Send for Scaler {}

impl std::fmt::Debug for Scaler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Scaler")
      .field("size", &format!("{}x{}", self.width, self.height))
      .field("src_format", &self.src_format)
      .field("dst_format", &self.dst_format)
      .finish()
  }
}

/// Converts arbitrary frames to one destination format, rebuilding the
/// converter whenever the source geometry or format changes
#[derive(Debug)]
pub struct ConverterCache {
  dst_format: AVPixelFormat,
  scaler: Option<Scaler>,
}

impl ConverterCache {
  pub fn new(dst_format: AVPixelFormat) -> Self {
    Self {
      dst_format,
      scaler: None,
    }
  }

  /// `None` when `src` is already in the destination format
  pub fn convert(&mut self, src: &Frame) -> CodecResult<Option<Frame>> {
    if src.format() == self.dst_format {
      return Ok(None);
    }

    let scaler = match self.scaler.take() {
      Some(scaler) if scaler.matches(src) => scaler,
      _ => {
        tracing::debug!(
          target: "avbridge",
          width = src.width(),
          height = src.height(),
          format = src.raw_format(),
          "creating pixel format converter"
        );
        Scaler::new_converter(src.width(), src.height(), src.raw_format(), self.dst_format)?
      }
    };
    let converted = scaler.scale_alloc(src);
    self.scaler = Some(scaler);
    converted.map(Some)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_converter_creation() {
    let converter =
      Scaler::new_converter(640, 480, AVPixelFormat::Yuyv422.as_raw(), AVPixelFormat::Nv12);
    assert!(converter.is_ok());
  }

  #[test]
  fn test_converter_rejects_empty_size() {
    let converter =
      Scaler::new_converter(0, 480, AVPixelFormat::Yuv420p.as_raw(), AVPixelFormat::Nv12);
    assert!(matches!(converter, Err(CodecError::InvalidConfig(_))));
  }

  #[test]
  fn test_yuv420p_to_nv12() {
    let mut src = Frame::new_video(32, 16, AVPixelFormat::Yuv420p).unwrap();
    for plane in 0..3 {
      let rows = src.plane_rows(plane).unwrap();
      let stride = src.linesize(plane) as usize;
      let value = [0x40u8, 0x80, 0xC0][plane];
      unsafe { std::ptr::write_bytes(src.data_mut(plane), value, stride * rows) };
    }

    let mut cache = ConverterCache::new(AVPixelFormat::Nv12);
    let dst = cache.convert(&src).unwrap().unwrap();
    assert_eq!(dst.format(), AVPixelFormat::Nv12);
    assert_eq!(dst.plane_data(0).unwrap()[0], 0x40);
    let chroma = dst.plane_data(1).unwrap();
    assert_eq!(&chroma[..2], &[0x80, 0xC0]);

    let nv12 = Frame::new_video(32, 16, AVPixelFormat::Nv12).unwrap();
    assert!(cache.convert(&nv12).unwrap().is_none());
  }
}
