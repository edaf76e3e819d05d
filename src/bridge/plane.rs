//! Image plane views and the strided rectangular copy shared by the bridges.

use crate::{Error, Result};

/// Pixel layout of an image handed over by a native service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Bi-planar 4:2:0, 8-bit: a luma plane followed by an interleaved CbCr plane
    Nv12,
    /// Anything else, tagged with the native format identifier
    Other(u32),
}

/// One plane of an image, borrowed from the producer
#[derive(Debug, Clone, Copy)]
pub struct Plane<'a> {
    /// Plane memory; at least `bytes_per_row * height` bytes
    pub data: &'a [u8],
    /// Padded row stride
    pub bytes_per_row: usize,
    /// Meaningful bytes per row
    pub width: usize,
    /// Number of rows
    pub height: usize,
}

impl Plane<'_> {
    /// Bytes covered by the plane including row padding
    pub fn padded_size(&self) -> usize {
        self.bytes_per_row * self.height
    }

    /// Whether [`copy_plane`] can read `rows` rows of `row_bytes` from this plane
    pub fn covers(&self, row_bytes: usize, rows: usize) -> bool {
        if rows == 0 || row_bytes == 0 {
            return true;
        }
        row_bytes <= self.bytes_per_row
            && self.data.len() >= self.bytes_per_row * (rows - 1) + row_bytes
    }
}

/// A decoded or captured image as a list of planes
#[derive(Debug, Clone)]
pub struct PixelBuffer<'a> {
    pub format: PixelFormat,
    /// Luma width in pixels
    pub width: usize,
    /// Luma height in pixels
    pub height: usize,
    pub planes: Vec<Plane<'a>>,
}

impl PixelBuffer<'_> {
    /// Sum of every plane's `bytes_per_row * height`
    pub fn padded_size(&self) -> usize {
        self.planes.iter().map(Plane::padded_size).sum()
    }
}

/// Bytes needed for a packed 8-bit 4:2:0 image
pub fn packed_420_size(width: usize, height: usize) -> usize {
    width * height * 3 / 2
}

/// Copy `rows` rows of `row_bytes` bytes from `src` to `dst`.
///
/// Each side advances by its own stride. When both strides equal `row_bytes`
/// the rectangle is contiguous and is moved with a single bulk copy.
///
/// Returns the number of bytes written.
pub fn copy_plane(
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    row_bytes: usize,
    rows: usize,
) -> Result<usize> {
    if rows == 0 || row_bytes == 0 {
        return Ok(0);
    }
    if row_bytes > src_stride || row_bytes > dst_stride {
        return Err(Error::InvalidArgument(format!(
            "row of {} bytes exceeds stride (src {}, dst {})",
            row_bytes, src_stride, dst_stride
        )));
    }

    // The last row only needs `row_bytes`, not a full stride
    let src_needed = src_stride * (rows - 1) + row_bytes;
    let dst_needed = dst_stride * (rows - 1) + row_bytes;
    if src.len() < src_needed {
        return Err(Error::InvalidArgument(format!(
            "source plane holds {} bytes, {} required",
            src.len(),
            src_needed
        )));
    }
    if dst.len() < dst_needed {
        return Err(Error::BufferTooSmall {
            len: dst.len(),
            required: dst_needed,
        });
    }

    if src_stride == row_bytes && dst_stride == row_bytes {
        let len = row_bytes * rows;
        dst[..len].copy_from_slice(&src[..len]);
        return Ok(len);
    }

    for row in 0..rows {
        let s = row * src_stride;
        let d = row * dst_stride;
        dst[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
    }

    Ok(row_bytes * rows)
}
