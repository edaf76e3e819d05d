//! libavutil function declarations
//!
//! Provides frames, option dictionaries, error strings and log control.

use super::types::*;
use std::os::raw::{c_char, c_int};

unsafe extern "C" {
    // ========================================================================
    // Frame Management
    // ========================================================================

    /// Allocate an AVFrame and set its fields to default values
    pub fn av_frame_alloc() -> *mut AVFrame;

    /// Free the frame and any dynamically allocated objects in it
    pub fn av_frame_free(frame: *mut *mut AVFrame);

    /// Unreference all buffers referenced by frame and reset to defaults
    pub fn av_frame_unref(frame: *mut AVFrame);

    /// Allocate new buffers for video data based on frame format/dimensions
    ///
    /// # Arguments
    /// * `frame` - Frame with format, width, height set
    /// * `align` - Buffer size alignment (0 for default, 32 recommended for SIMD)
    pub fn av_frame_get_buffer(frame: *mut AVFrame, align: c_int) -> c_int;

    // ========================================================================
    // Error Handling
    // ========================================================================

    /// Put a description of the AVERROR code errnum in errbuf
    pub fn av_strerror(errnum: c_int, errbuf: *mut c_char, errbuf_size: usize) -> c_int;

    // ========================================================================
    // Dictionary (Options)
    // ========================================================================

    /// Set the given entry in *pm, overwriting an existing entry
    pub fn av_dict_set(
        pm: *mut *mut AVDictionary,
        key: *const c_char,
        value: *const c_char,
        flags: c_int,
    ) -> c_int;

    /// Free all the memory allocated for an AVDictionary struct
    pub fn av_dict_free(m: *mut *mut AVDictionary);

    // ========================================================================
    // Logging
    // ========================================================================

    /// Set the log level
    pub fn av_log_set_level(level: c_int);
}

// ============================================================================
// Constants
// ============================================================================

/// Log levels
pub mod log_level {
    use std::os::raw::c_int;

    pub const QUIET: c_int = -8;
    pub const ERROR: c_int = 16;
    pub const WARNING: c_int = 24;
    pub const INFO: c_int = 32;
    pub const VERBOSE: c_int = 40;
    pub const DEBUG: c_int = 48;
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Owned AVDictionary used to pass device options to `avformat_open_input`
pub struct Options {
    ptr: *mut AVDictionary,
}

impl Options {
    pub fn new() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
        }
    }

    /// Set `key` to `value`; returns the raw FFmpeg status
    pub fn set(&mut self, key: &std::ffi::CStr, value: &std::ffi::CStr) -> c_int {
        unsafe { av_dict_set(&mut self.ptr, key.as_ptr(), value.as_ptr(), 0) }
    }

    /// Pointer handed to FFmpeg; it may replace or consume entries
    pub fn as_mut_ptr(&mut self) -> *mut *mut AVDictionary {
        &mut self.ptr
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Options {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { av_dict_free(&mut self.ptr) };
        }
    }
}
