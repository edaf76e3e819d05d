//! AVERROR codes the wrappers branch on, and the error carried out of a
//! failed libav* call.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};

/// `FFERRTAG('E','O','F',' ')`: decoder drained or input ended
pub const AVERROR_EOF: c_int = -(i32::from_le_bytes(*b"EOF "));

/// `AVERROR(EAGAIN)`: nothing available yet, try again later
#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
pub const AVERROR_EAGAIN: c_int = -35;
#[cfg(not(any(target_os = "macos", target_os = "ios", target_os = "freebsd")))]
pub const AVERROR_EAGAIN: c_int = -11;

/// A negative libav* return value and its `av_strerror` text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (AVERROR {code})")]
pub struct FFmpegError {
  pub code: c_int,
  pub message: String,
}

impl FFmpegError {
  pub fn from_code(code: c_int) -> Self {
    let mut buf = [0 as c_char; 128];
    let ret = unsafe { super::avutil::av_strerror(code, buf.as_mut_ptr(), buf.len()) };
    let message = if ret < 0 {
      format!("unknown error {}", code)
    } else {
      unsafe { CStr::from_ptr(buf.as_ptr()) }.to_string_lossy().into_owned()
    };
    Self { code, message }
  }
}

/// Pass non-negative return values through, turn the rest into [`FFmpegError`]
#[inline]
pub fn check_error(ret: c_int) -> Result<c_int, FFmpegError> {
  match ret {
    ret if ret < 0 => Err(FFmpegError::from_code(ret)),
    ret => Ok(ret),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_eof_tag() {
    // -MKTAG('E', 'O', 'F', ' ')
    assert_eq!(AVERROR_EOF, -0x2046_4F45);
  }

  #[test]
  fn test_check_error() {
    assert_eq!(check_error(0).unwrap(), 0);
    assert_eq!(check_error(42).unwrap(), 42);

    let err = check_error(AVERROR_EAGAIN).unwrap_err();
    assert_eq!(err.code, AVERROR_EAGAIN);
    assert!(!err.message.is_empty());
  }

  #[test]
  fn test_eof_message() {
    let err = FFmpegError::from_code(AVERROR_EOF);
    assert_eq!(err.message, "End of file");
    assert!(err.to_string().contains("End of file"));
  }
}
