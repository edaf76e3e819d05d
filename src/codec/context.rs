//! Safe wrapper around FFmpeg AVCodecContext
//!
//! Provides decoding functionality with RAII cleanup.

use crate::ffi::{
    self,
    accessors::{
        ffctx_get_channels, ffctx_get_height, ffctx_get_pix_fmt, ffctx_get_sample_fmt,
        ffctx_get_sample_rate, ffctx_get_width, ffctx_set_channels, ffctx_set_extradata,
        ffctx_set_flags, ffctx_set_sample_rate, ffctx_set_thread_count,
    },
    avcodec::{
        avcodec_alloc_context3, avcodec_free_context, avcodec_open2,
        avcodec_parameters_to_context, avcodec_receive_frame, avcodec_send_packet, find_decoder,
    },
    avformat::AVCodecParameters,
    error::{AVERROR_EAGAIN, AVERROR_EOF},
    AVCodec, AVCodecContext, AVCodecID, AVPixelFormat, AVSampleFormat,
};
use std::ptr::NonNull;

use super::{CodecError, CodecResult, DecoderConfig, Frame, Packet};

/// Safe wrapper around a decoding AVCodecContext
pub struct CodecContext {
    ptr: NonNull<AVCodecContext>,
    codec: *const AVCodec,
    codec_id: AVCodecID,
}

impl CodecContext {
    // ========================================================================
    // Decoder Creation
    // ========================================================================

    /// Create a new decoder context for the given codec ID
    pub fn new_decoder(codec_id: AVCodecID) -> CodecResult<Self> {
        let codec = find_decoder(codec_id);
        if codec.is_null() {
            return Err(CodecError::DecoderNotFound(codec_id));
        }
        let ptr = unsafe { avcodec_alloc_context3(codec) };
        NonNull::new(ptr)
            .map(|ptr| Self {
                ptr,
                codec,
                codec_id,
            })
            .ok_or(CodecError::AllocationFailed("AVCodecContext"))
    }

    /// Create a decoder configured from a demuxed stream's parameters
    pub fn from_parameters(
        codec_id: AVCodecID,
        par: *const AVCodecParameters,
    ) -> CodecResult<Self> {
        let mut ctx = Self::new_decoder(codec_id)?;
        let ret = unsafe { avcodec_parameters_to_context(ctx.as_mut_ptr(), par) };
        ffi::check_error(ret)?;
        Ok(ctx)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Configure the decoder with the given settings
    pub fn configure_decoder(&mut self, config: &DecoderConfig) -> CodecResult<()> {
        if config.codec_id != self.codec_id {
            return Err(CodecError::InvalidState(format!(
                "context is for {:?}, config is for {:?}",
                self.codec_id, config.codec_id
            )));
        }

        unsafe {
            let ctx = self.ptr.as_ptr();

            ffctx_set_thread_count(ctx, config.thread_count as i32);
            if config.flags != 0 {
                ffctx_set_flags(ctx, config.flags);
            }
            if let Some(sample_rate) = config.sample_rate {
                ffctx_set_sample_rate(ctx, sample_rate as i32);
            }
            if let Some(channels) = config.channels {
                ffctx_set_channels(ctx, channels as i32);
            }
        }

        if let Some(extradata) = &config.extradata {
            self.set_extradata(extradata)?;
        }

        Ok(())
    }

    /// Replace the codec extradata (copied into a padded FFmpeg buffer)
    pub fn set_extradata(&mut self, extradata: &[u8]) -> CodecResult<()> {
        let size = i32::try_from(extradata.len())
            .map_err(|_| CodecError::InvalidConfig("extradata too large".into()))?;
        let ret = unsafe { ffctx_set_extradata(self.ptr.as_ptr(), extradata.as_ptr(), size) };
        ffi::check_error(ret)?;
        Ok(())
    }

    /// Open the codec (must be called after configuration)
    pub fn open(&mut self) -> CodecResult<()> {
        let ret = unsafe { avcodec_open2(self.ptr.as_ptr(), self.codec, std::ptr::null_mut()) };
        ffi::check_error(ret)?;
        Ok(())
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// Send a packet to the decoder
    ///
    /// Returns Ok(true) if packet was accepted, Ok(false) if decoder needs output drained first
    pub fn send_packet(&mut self, packet: Option<&Packet>) -> CodecResult<bool> {
        let pkt_ptr = packet.map(|p| p.as_ptr()).unwrap_or(std::ptr::null());
        let ret = unsafe { avcodec_send_packet(self.ptr.as_ptr(), pkt_ptr) };

        if ret == AVERROR_EAGAIN {
            return Ok(false);
        }
        // Flushing an already flushed decoder is not an error
        if packet.is_none() && ret == AVERROR_EOF {
            return Ok(true);
        }
        ffi::check_error(ret)?;
        Ok(true)
    }

    /// Receive a decoded frame from the decoder
    ///
    /// Returns Ok(Some(frame)) if a frame is available, Ok(None) if more input needed
    pub fn receive_frame(&mut self) -> CodecResult<Option<Frame>> {
        let mut frame = Frame::new()?;
        let ret = unsafe { avcodec_receive_frame(self.ptr.as_ptr(), frame.as_mut_ptr()) };

        if ret == AVERROR_EAGAIN || ret == AVERROR_EOF {
            return Ok(None);
        }
        ffi::check_error(ret)?;
        Ok(Some(frame))
    }

    /// Decode a packet and return all available frames
    pub fn decode(&mut self, packet: Option<&Packet>) -> CodecResult<Vec<Frame>> {
        let mut frames = Vec::new();

        // Send packet
        if !self.send_packet(packet)? {
            // Decoder is full, drain first
            while let Some(frame) = self.receive_frame()? {
                frames.push(frame);
            }
            // Retry sending packet
            self.send_packet(packet)?;
        }

        // Receive all available frames
        while let Some(frame) = self.receive_frame()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Flush the decoder
    pub fn flush_decoder(&mut self) -> CodecResult<Vec<Frame>> {
        self.decode(None)
    }

    // ========================================================================
    // Utility
    // ========================================================================

    /// Get raw pointer (for FFmpeg API calls)
    #[inline]
    pub fn as_ptr(&self) -> *const AVCodecContext {
        self.ptr.as_ptr()
    }

    /// Get mutable raw pointer
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut AVCodecContext {
        self.ptr.as_ptr()
    }

    /// Codec this context decodes
    #[inline]
    pub fn codec_id(&self) -> AVCodecID {
        self.codec_id
    }

    /// Get configured width
    pub fn width(&self) -> u32 {
        unsafe { ffctx_get_width(self.as_ptr()) as u32 }
    }

    /// Get configured height
    pub fn height(&self) -> u32 {
        unsafe { ffctx_get_height(self.as_ptr()) as u32 }
    }

    /// Get configured pixel format
    pub fn pixel_format(&self) -> AVPixelFormat {
        AVPixelFormat::from_raw(unsafe { ffctx_get_pix_fmt(self.as_ptr()) })
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        unsafe { ffctx_get_sample_rate(self.as_ptr()) as u32 }
    }

    /// Decoded sample format
    pub fn sample_format(&self) -> AVSampleFormat {
        AVSampleFormat::from_raw(unsafe { ffctx_get_sample_fmt(self.as_ptr()) })
    }

    /// Channel count
    pub fn channels(&self) -> u32 {
        unsafe { ffctx_get_channels(self.as_ptr()) as u32 }
    }
}

impl Drop for CodecContext {
    fn drop(&mut self) {
        unsafe {
            let mut ptr = self.ptr.as_ptr();
            avcodec_free_context(&mut ptr);
        }
    }
}

// CodecContext is NOT Sync - FFmpeg contexts are not thread-safe
unsafe impl Send for CodecContext {}

impl std::fmt::Debug for CodecContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecContext")
            .field("codec", &ffi::avcodec::codec_name(self.codec_id.as_raw()))
            .field("width", &self.width())
            .field("height", &self.height())
            .field("pixel_format", &self.pixel_format())
            .finish()
    }
}
