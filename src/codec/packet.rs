//! Safe wrapper around FFmpeg AVPacket
//!
//! Provides RAII-based memory management for compressed data.

use crate::ffi::{
    self,
    accessors::{ffpkt_data, ffpkt_data_mut, ffpkt_size, ffpkt_stream_index},
    avcodec::{av_new_packet, av_packet_alloc, av_packet_free, av_packet_unref},
    AVPacket,
};
use std::ptr::NonNull;

use super::CodecError;

/// Safe wrapper around AVPacket with RAII cleanup
pub struct Packet {
    ptr: NonNull<AVPacket>,
}

impl Packet {
    /// Allocate a new empty packet
    pub fn new() -> Result<Self, CodecError> {
        let ptr = unsafe { av_packet_alloc() };
        NonNull::new(ptr)
            .map(|ptr| Self { ptr })
            .ok_or(CodecError::AllocationFailed("AVPacket"))
    }

    /// Allocate a packet holding a copy of `data` (with zeroed input padding)
    pub fn from_slice(data: &[u8]) -> Result<Self, CodecError> {
        let size = i32::try_from(data.len())
            .map_err(|_| CodecError::InvalidConfig("packet too large".into()))?;

        let mut pkt = Self::new()?;
        let ret = unsafe { av_new_packet(pkt.as_mut_ptr(), size) };
        ffi::check_error(ret)?;

        if !data.is_empty() {
            unsafe {
                let dst = ffpkt_data_mut(pkt.as_mut_ptr());
                std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
            }
        }
        Ok(pkt)
    }

    /// Get the raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_ptr(&self) -> *const AVPacket {
        self.ptr.as_ptr()
    }

    /// Get the mutable raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut AVPacket {
        self.ptr.as_ptr()
    }

    // ========================================================================
    // Data Access
    // ========================================================================

    /// Get packet data as a slice
    pub fn as_slice(&self) -> &[u8] {
        let ptr = unsafe { ffpkt_data(self.as_ptr()) };
        let size = self.size();
        if ptr.is_null() || size <= 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(ptr, size as usize) }
        }
    }

    /// Get packet size in bytes
    #[inline]
    pub fn size(&self) -> i32 {
        unsafe { ffpkt_size(self.as_ptr()) }
    }

    /// Check if packet is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() <= 0
    }

    /// Index of the demuxed stream this packet belongs to
    #[inline]
    pub fn stream_index(&self) -> i32 {
        unsafe { ffpkt_stream_index(self.as_ptr()) }
    }

    /// Wipe the packet for reuse
    pub fn unref(&mut self) {
        unsafe { av_packet_unref(self.as_mut_ptr()) }
    }
}

impl Drop for Packet {
    fn drop(&mut self) {
        unsafe {
            let mut ptr = self.ptr.as_ptr();
            av_packet_free(&mut ptr);
        }
    }
}

unsafe impl Send for Packet {}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("size", &self.size())
            .field("stream_index", &self.stream_index())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_allocation() {
        let pkt = Packet::new().unwrap();
        assert!(pkt.is_empty());
        assert_eq!(pkt.size(), 0);
    }

    #[test]
    fn test_packet_from_slice() {
        let mut pkt = Packet::from_slice(&[0x21, 0x10, 0x05]).unwrap();
        assert_eq!(pkt.as_slice(), &[0x21, 0x10, 0x05]);
        pkt.unref();
        assert!(pkt.is_empty());
    }
}
