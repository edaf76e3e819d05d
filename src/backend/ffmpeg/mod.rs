//! FFmpeg implementations of the bridge services.

mod audio;
mod capture;
mod video;

use crate::bridge::{PixelBuffer, PixelFormat, Plane};
use crate::codec::Frame;
use crate::ffi::AVPixelFormat;

/// The FFmpeg service set
#[derive(Debug, Clone, Copy)]
pub struct FFmpeg;

/// Borrow an NV12 frame as a two-plane pixel buffer.
///
/// `None` when the frame is not NV12 or a plane is missing.
fn nv12_image(frame: &Frame) -> Option<PixelBuffer<'_>> {
    if frame.format() != AVPixelFormat::Nv12 {
        return None;
    }

    let width = frame.width() as usize;
    let height = frame.height() as usize;
    // Interleaved CbCr covers the full luma width, rounded up to whole pairs
    let row_bytes = [width, width.div_ceil(2) * 2];

    let planes = (0..2)
        .map(|plane| {
            Some(Plane {
                data: frame.plane_data(plane)?,
                bytes_per_row: usize::try_from(frame.linesize(plane)).ok()?,
                width: row_bytes[plane],
                height: frame.plane_rows(plane)?,
            })
        })
        .collect::<Option<Vec<_>>>()?;

    Some(PixelBuffer {
        format: PixelFormat::Nv12,
        width,
        height,
        planes,
    })
}
