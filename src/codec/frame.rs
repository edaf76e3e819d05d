//! Safe wrapper around FFmpeg AVFrame
//!
//! Provides RAII-based memory management and safe access to frame data.

use crate::ffi::{
    self,
    accessors::{
        ffframe_data, ffframe_data_const, ffframe_extended_data_plane, ffframe_get_channels,
        ffframe_get_format, ffframe_get_height, ffframe_get_nb_samples, ffframe_get_width,
        ffframe_linesize, ffframe_set_format, ffframe_set_height, ffframe_set_width,
    },
    avutil::{av_frame_alloc, av_frame_free, av_frame_get_buffer, av_frame_unref},
    AVFrame, AVPixelFormat, AVSampleFormat,
};
use std::ptr::NonNull;

use super::CodecError;

/// Safe wrapper around AVFrame with RAII cleanup
pub struct Frame {
    ptr: NonNull<AVFrame>,
}

impl Frame {
    /// Allocate a new empty frame
    pub fn new() -> Result<Self, CodecError> {
        let ptr = unsafe { av_frame_alloc() };
        NonNull::new(ptr)
            .map(|ptr| Self { ptr })
            .ok_or(CodecError::AllocationFailed("AVFrame"))
    }

    /// Allocate a frame with buffer for the given format and dimensions
    pub fn new_video(
        width: u32,
        height: u32,
        format: AVPixelFormat,
    ) -> Result<Self, CodecError> {
        let mut frame = Self::new()?;

        unsafe {
            ffframe_set_width(frame.as_mut_ptr(), width as i32);
            ffframe_set_height(frame.as_mut_ptr(), height as i32);
            ffframe_set_format(frame.as_mut_ptr(), format.as_raw());
        }

        // Allocate buffer with 32-byte alignment for SIMD
        let ret = unsafe { av_frame_get_buffer(frame.as_mut_ptr(), 32) };
        ffi::check_error(ret)?;

        Ok(frame)
    }

    /// Get the raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_ptr(&self) -> *const AVFrame {
        self.ptr.as_ptr()
    }

    /// Get the mutable raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut AVFrame {
        self.ptr.as_ptr()
    }

    // ========================================================================
    // Dimensions and Format
    // ========================================================================

    /// Get frame width
    #[inline]
    pub fn width(&self) -> u32 {
        unsafe { ffframe_get_width(self.as_ptr()) as u32 }
    }

    /// Get frame height
    #[inline]
    pub fn height(&self) -> u32 {
        unsafe { ffframe_get_height(self.as_ptr()) as u32 }
    }

    /// Raw `format` field; a pixel or sample format depending on the media
    #[inline]
    pub fn raw_format(&self) -> i32 {
        unsafe { ffframe_get_format(self.as_ptr()) }
    }

    /// Get pixel format
    pub fn format(&self) -> AVPixelFormat {
        AVPixelFormat::from_raw(self.raw_format())
    }

    // ========================================================================
    // Audio Properties
    // ========================================================================

    /// Samples per channel
    pub fn nb_samples(&self) -> usize {
        unsafe { ffframe_get_nb_samples(self.as_ptr()).max(0) as usize }
    }

    /// Channel count
    pub fn channels(&self) -> usize {
        unsafe { ffframe_get_channels(self.as_ptr()).max(0) as usize }
    }

    /// Get sample format
    pub fn sample_format(&self) -> AVSampleFormat {
        AVSampleFormat::from_raw(self.raw_format())
    }

    /// Samples of one channel plane for planar float audio, or every channel
    /// interleaved in plane 0 for packed float audio
    pub fn audio_samples(&self, plane: usize) -> Option<&[f32]> {
        let count = match self.sample_format() {
            AVSampleFormat::Fltp if plane < self.channels() => self.nb_samples(),
            AVSampleFormat::Flt if plane == 0 => self.nb_samples() * self.channels(),
            _ => return None,
        };
        let ptr = unsafe { ffframe_extended_data_plane(self.as_ptr(), plane as i32) };
        if ptr.is_null() {
            return None;
        }
        // FFmpeg aligns sample planes to at least 16 bytes
        Some(unsafe { std::slice::from_raw_parts(ptr as *const f32, count) })
    }

    // ========================================================================
    // Data Access
    // ========================================================================

    /// Get pointer to plane data
    ///
    /// # Safety
    /// The returned pointer is valid only while the frame is alive and unmodified
    pub fn data(&self, plane: usize) -> *const u8 {
        unsafe { ffframe_data_const(self.as_ptr(), plane as i32) }
    }

    /// Get mutable pointer to plane data
    pub fn data_mut(&mut self, plane: usize) -> *mut u8 {
        unsafe { ffframe_data(self.as_mut_ptr(), plane as i32) }
    }

    /// Get line size (stride) for a plane
    #[inline]
    pub fn linesize(&self, plane: usize) -> i32 {
        unsafe { ffframe_linesize(self.as_ptr(), plane as i32) }
    }

    /// Number of rows stored in a plane of this frame's pixel format
    pub fn plane_rows(&self, plane: usize) -> Option<usize> {
        let height = self.height() as usize;
        let format = self.format();
        if plane >= format.num_planes() {
            return None;
        }
        Some(match (format, plane) {
            (_, 0) => height,
            (
                AVPixelFormat::Yuv420p
                | AVPixelFormat::Yuvj420p
                | AVPixelFormat::Nv12
                | AVPixelFormat::Nv21,
                _,
            ) => height.div_ceil(2),
            _ => height,
        })
    }

    /// Get plane data as a slice (read-only), including row padding
    ///
    /// Returns None if the plane doesn't exist or has no data
    pub fn plane_data(&self, plane: usize) -> Option<&[u8]> {
        let ptr = self.data(plane);
        if ptr.is_null() {
            return None;
        }

        let linesize = self.linesize(plane);
        if linesize <= 0 {
            return None;
        }

        let rows = self.plane_rows(plane)?;
        let size = linesize as usize * rows;
        Some(unsafe { std::slice::from_raw_parts(ptr, size) })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Unreference the frame data (but keep the frame structure)
    pub fn unref(&mut self) {
        unsafe { av_frame_unref(self.as_mut_ptr()) }
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        unsafe {
            let mut ptr = self.ptr.as_ptr();
            av_frame_free(&mut ptr);
        }
    }
}

// Frame data can be sent between threads
unsafe impl Send for Frame {}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.raw_format())
            .field("nb_samples", &self.nb_samples())
            .finish()
    }
}
