//! libswscale function declarations
//!
//! Provides pixel format conversion into the packed 4:2:0 layout we hand out.

use super::types::*;
use std::os::raw::c_int;

unsafe extern "C" {
  // ========================================================================
  // Context Management
  // ========================================================================

  /// Allocate and return an SwsContext
  ///
  /// # Arguments
  /// * `srcW` - Source width
  /// * `srcH` - Source height
  /// * `srcFormat` - Source pixel format
  /// * `dstW` - Destination width
  /// * `dstH` - Destination height
  /// * `dstFormat` - Destination pixel format
  /// * `flags` - Scaling algorithm flags (SWS_*)
  /// * `srcFilter` - Source filter (NULL for none)
  /// * `dstFilter` - Destination filter (NULL for none)
  /// * `param` - Extra parameters for scaling algorithm (NULL for defaults)
  pub fn sws_getContext(
    srcW: c_int,
    srcH: c_int,
    srcFormat: c_int,
    dstW: c_int,
    dstH: c_int,
    dstFormat: c_int,
    flags: c_int,
    srcFilter: *mut SwsFilter,
    dstFilter: *mut SwsFilter,
    param: *const f64,
  ) -> *mut SwsContext;

  /// Free the swscaler context
  pub fn sws_freeContext(swsContext: *mut SwsContext);

  // ========================================================================
  // Scaling Operations
  // ========================================================================

  /// Scale the image slice in srcSlice and put the resulting scaled
  /// slice in the image in dst
  ///
  /// # Returns
  /// Height of the output slice
  pub fn sws_scale(
    c: *mut SwsContext,
    srcSlice: *const *const u8,
    srcStride: *const c_int,
    srcSliceY: c_int,
    srcSliceH: c_int,
    dst: *const *mut u8,
    dstStride: *const c_int,
  ) -> c_int;

  // ========================================================================
  // Format Support
  // ========================================================================

  /// Check if a pixel format is supported as input
  pub fn sws_isSupportedInput(pix_fmt: c_int) -> c_int;
}

// ============================================================================
// Scaling Algorithm Flags
// ============================================================================

/// Bilinear scaling
pub const SWS_BILINEAR: c_int = 2;

// ============================================================================
// Helper Functions
// ============================================================================

/// Check if a raw pixel format can be used as input
pub fn is_input_supported(format: c_int) -> bool {
  unsafe { sws_isSupportedInput(format) != 0 }
}
