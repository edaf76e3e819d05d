//! Exported C functions
//!
//! Sessions cross the boundary as opaque pointers owned by the caller
//! between `*_init` and `*_fini`. All buffers stay caller-owned and no
//! reference to them is kept past the call that received them.

pub mod abi;

use std::ffi::{c_char, c_void};

use crate::backend;
use crate::bridge::{
    decode_audio, AudioConverterBackend, AvcDecodeSession, AvcDecodeStats, CaptureBackend,
    CaptureSession, CaptureStats, DecodeRequest, VideoDecoderBackend,
};
use crate::log::Log;

/// Initialize logging.
///
/// The level is one of "error", "warn", "info", "debug", "trace"; null or
/// empty selects "info". `AVBRIDGE_LOG` overrides it with filter directives.
///
/// Returns a zero on success, or a negative code on failure.
///
/// # Safety
/// - The caller must ensure that level is null or a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn avbridge_log_level(level: *const c_char) -> i32 {
    abi::return_code(move || {
        Log::parse(abi::parse_str(level)?)?.init();
        Ok(())
    })
}

/// Decode one ADTS-framed AAC packet into `frames` frames of interleaved f32 PCM.
///
/// `state` is reserved and ignored. Succeeds only when the decoded size
/// equals `size_out` exactly; nothing is written otherwise.
///
/// Returns a zero on success, or a negative code on failure.
///
/// # Safety
/// - The caller must ensure that data_in is valid for size_in bytes.
/// - The caller must ensure that data_out is valid for writes of size_out bytes.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn avbridge_decode_audio(
    state: *mut c_void,
    codec: i64,
    rate: i64,
    channels: i64,
    frames: i64,
    data_in: *const u8,
    size_in: i64,
    data_out: *mut u8,
    size_out: i64,
) -> i32 {
    decode_audio_with(
        backend::audio(),
        state,
        codec,
        rate,
        channels,
        frames,
        data_in,
        size_in,
        data_out,
        size_out,
    )
}

#[allow(clippy::too_many_arguments)]
unsafe fn decode_audio_with(
    backend: &dyn AudioConverterBackend,
    _state: *mut c_void,
    codec: i64,
    rate: i64,
    channels: i64,
    frames: i64,
    data_in: *const u8,
    size_in: i64,
    data_out: *mut u8,
    size_out: i64,
) -> i32 {
    abi::return_code(move || {
        let input = abi::parse_slice(data_in, abi::parse_len(size_in)?)?;
        let out = abi::parse_slice_mut(data_out, abi::parse_len(size_out)?)?;

        let request = DecodeRequest {
            codec,
            sample_rate: rate,
            channels,
            frames,
            input,
        };

        decode_audio(backend, &request, out).inspect_err(|e| {
            tracing::debug!(target: "avbridge", error = %e, "audio decode failed");
        })
    })
}

/// Open a capture device and wait for its first frame.
///
/// An empty or null `device` selects the platform default. On success the
/// frame byte count, width and height are stored through the non-null
/// out-pointers.
///
/// Returns a session handle, or null on failure. Release it with [avbridge_capture_fini].
///
/// # Safety
/// - The caller must ensure that device is null or a valid null-terminated C string.
/// - The caller must ensure that bytes, width and height are null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn avbridge_capture_init(
    device: *const c_char,
    bytes: *mut i64,
    width: *mut i64,
    height: *mut i64,
) -> *mut CaptureSession {
    capture_init_with(backend::capture(), device, bytes, width, height)
}

unsafe fn capture_init_with(
    backend: &dyn CaptureBackend,
    device: *const c_char,
    bytes: *mut i64,
    width: *mut i64,
    height: *mut i64,
) -> *mut CaptureSession {
    abi::return_handle("capture init", move || {
        let device = abi::parse_str(device)?;
        let session = CaptureSession::open(backend, device)?;

        let geometry = session.geometry();
        abi::write_out(bytes, geometry.bytes)?;
        abi::write_out(width, geometry.width)?;
        abi::write_out(height, geometry.height)?;

        Ok(session)
    })
}

/// Block until the next captured frame has been copied into `data`.
///
/// A buffer smaller than the session byte count is refused without waiting.
///
/// # Safety
/// - The caller must ensure that session was returned by [avbridge_capture_init] and not finalized.
/// - The caller must ensure that data is valid for writes of size bytes.
#[no_mangle]
pub unsafe extern "C" fn avbridge_capture_next(
    session: *mut CaptureSession,
    data: *mut u8,
    size: i64,
) {
    let status = abi::return_code(move || {
        let session = abi::parse_handle(session)?;
        let out = abi::parse_slice_mut(data, abi::parse_len(size)?)?;
        session.next_frame(out)
    });

    if status < 0 {
        tracing::debug!(target: "avbridge", status, "capture next failed");
    }
}

/// Stop the device and release the session. Null is ignored.
///
/// # Safety
/// - The caller must ensure that session was returned by [avbridge_capture_init] and is finalized once.
#[no_mangle]
pub unsafe extern "C" fn avbridge_capture_fini(session: *mut CaptureSession) {
    abi::return_code(move || {
        if !session.is_null() {
            unsafe { Box::from_raw(session) }.finish();
        }
    });
}

/// Copy the session's diagnostic counters into `stats`.
///
/// Returns a zero on success, or a negative code on failure.
///
/// # Safety
/// - The caller must ensure that session is live and stats is valid for writes.
#[no_mangle]
pub unsafe extern "C" fn avbridge_capture_stats(
    session: *mut CaptureSession,
    stats: *mut CaptureStats,
) -> i32 {
    abi::return_code(move || {
        let session = abi::parse_handle(session)?;
        let stats = abi::parse_handle(stats)?;
        *stats = session.stats();
        Ok(())
    })
}

/// Create an H.264 decode session from one PPS and one SPS.
///
/// On success the cropped width, height and packed 4:2:0 frame size are
/// stored through the non-null out-pointers.
///
/// Returns a session handle, or null on failure. Release it with [avbridge_avc_decode_fini].
///
/// # Safety
/// - The caller must ensure that pps and sps are valid for their sizes.
/// - The caller must ensure that width, height and bytes are null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn avbridge_avc_decode_init(
    pps: *const u8,
    pps_size: i64,
    sps: *const u8,
    sps_size: i64,
    width: *mut i64,
    height: *mut i64,
    bytes: *mut i64,
) -> *mut AvcDecodeSession {
    avc_decode_init_with(
        backend::video(),
        pps,
        pps_size,
        sps,
        sps_size,
        width,
        height,
        bytes,
    )
}

#[allow(clippy::too_many_arguments)]
unsafe fn avc_decode_init_with(
    backend: &dyn VideoDecoderBackend,
    pps: *const u8,
    pps_size: i64,
    sps: *const u8,
    sps_size: i64,
    width: *mut i64,
    height: *mut i64,
    bytes: *mut i64,
) -> *mut AvcDecodeSession {
    abi::return_handle("avc decode init", move || {
        let pps = abi::parse_slice(pps, abi::parse_len(pps_size)?)?;
        let sps = abi::parse_slice(sps, abi::parse_len(sps_size)?)?;
        let session = AvcDecodeSession::open(backend, pps, sps)?;

        let format = session.format();
        abi::write_out(width, format.width())?;
        abi::write_out(height, format.height())?;
        abi::write_out(bytes, format.output_size())?;

        Ok(session)
    })
}

/// Decode one length-prefixed H.264 sample into `data_out` as packed 4:2:0.
///
/// A destination smaller than the session frame size is left untouched.
///
/// Returns a zero on success, or a negative code on failure.
///
/// # Safety
/// - The caller must ensure that session was returned by [avbridge_avc_decode_init] and not finalized.
/// - The caller must ensure that data_in is valid for size_in bytes and data_out for writes of size_out bytes.
#[no_mangle]
pub unsafe extern "C" fn avbridge_avc_decode_next(
    session: *mut AvcDecodeSession,
    data_in: *const u8,
    size_in: i64,
    data_out: *mut u8,
    size_out: i64,
) -> i32 {
    abi::return_code(move || {
        let session = abi::parse_handle(session)?;
        let input = abi::parse_slice(data_in, abi::parse_len(size_in)?)?;
        let out = abi::parse_slice_mut(data_out, abi::parse_len(size_out)?)?;
        session.decode_next(input, out).inspect_err(|e| {
            tracing::debug!(target: "avbridge", error = %e, "avc decode failed");
        })
    })
}

/// Release a decode session. Null is ignored.
///
/// # Safety
/// - The caller must ensure that session was returned by [avbridge_avc_decode_init] and is finalized once.
#[no_mangle]
pub unsafe extern "C" fn avbridge_avc_decode_fini(session: *mut AvcDecodeSession) {
    abi::return_code(move || {
        if !session.is_null() {
            drop(unsafe { Box::from_raw(session) });
        }
    });
}

/// Copy the session's diagnostic counters into `stats`.
///
/// Returns a zero on success, or a negative code on failure.
///
/// # Safety
/// - The caller must ensure that session is live and stats is valid for writes.
#[no_mangle]
pub unsafe extern "C" fn avbridge_avc_decode_stats(
    session: *mut AvcDecodeSession,
    stats: *mut AvcDecodeStats,
) -> i32 {
    abi::return_code(move || {
        let session = abi::parse_handle(session)?;
        let stats = abi::parse_handle(stats)?;
        *stats = session.stats();
        Ok(())
    })
}
