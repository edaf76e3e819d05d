//! Helpers shared by the exported C functions: panic containment, status
//! codes and raw pointer parsing.

use std::ffi::{c_char, CStr};

use crate::{Error, Result};

/// Run `f`, turning its result into a status code. A panic becomes [`Error::Panic`].
pub fn return_code<C: ReturnCode, F: FnOnce() -> C>(f: F) -> i32 {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(ret) => ret.code(),
        Err(_) => Error::Panic.code(),
    }
}

/// Run `f` and hand ownership of its value to the caller as a raw pointer.
///
/// Errors and panics are logged and yield null.
pub fn return_handle<T, F: FnOnce() -> Result<T>>(what: &str, f: F) -> *mut T {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Box::into_raw(Box::new(value)),
        Ok(Err(e)) => {
            tracing::warn!(target: "avbridge", error = %e, code = e.code(), "{} failed", what);
            std::ptr::null_mut()
        }
        Err(_) => {
            tracing::error!(target: "avbridge", "{} panicked", what);
            std::ptr::null_mut()
        }
    }
}

pub trait ReturnCode {
    fn code(&self) -> i32;
}

impl ReturnCode for () {
    fn code(&self) -> i32 {
        0
    }
}

impl ReturnCode for i32 {
    fn code(&self) -> i32 {
        *self
    }
}

impl ReturnCode for Result<(), Error> {
    fn code(&self) -> i32 {
        match self {
            Ok(()) => 0,
            Err(e) => e.code(),
        }
    }
}

impl ReturnCode for Result<usize, Error> {
    fn code(&self) -> i32 {
        match self {
            Ok(n) => i32::try_from(*n)
                .unwrap_or_else(|_| Error::InvalidArgument("status overflow".into()).code()),
            Err(e) => e.code(),
        }
    }
}

/// Convert a signed C length. Negative lengths are rejected.
pub fn parse_len(size: i64) -> Result<usize> {
    usize::try_from(size).map_err(|_| Error::InvalidArgument(format!("negative length {}", size)))
}

/// # Safety
///
/// The caller must ensure that cstr is valid for 'a.
pub unsafe fn parse_str<'a>(cstr: *const c_char) -> Result<&'a str> {
    if cstr.is_null() {
        return Ok("");
    }

    let string = unsafe { CStr::from_ptr(cstr) };
    Ok(string.to_str()?)
}

/// # Safety
///
/// The caller must ensure that data is valid for 'a.
pub unsafe fn parse_slice<'a>(data: *const u8, size: usize) -> Result<&'a [u8]> {
    if data.is_null() {
        if size == 0 {
            return Ok(&[]);
        }

        return Err(Error::InvalidPointer);
    }

    let data = unsafe { std::slice::from_raw_parts(data, size) };
    Ok(data)
}

/// # Safety
///
/// The caller must ensure that data is valid and unaliased for 'a.
pub unsafe fn parse_slice_mut<'a>(data: *mut u8, size: usize) -> Result<&'a mut [u8]> {
    if data.is_null() {
        if size == 0 {
            return Ok(&mut []);
        }

        return Err(Error::InvalidPointer);
    }

    let data = unsafe { std::slice::from_raw_parts_mut(data, size) };
    Ok(data)
}

/// Borrow a handle created by [`return_handle`].
///
/// # Safety
///
/// The caller must ensure that handle is null or live and not used elsewhere for 'a.
pub unsafe fn parse_handle<'a, T>(handle: *mut T) -> Result<&'a mut T> {
    unsafe { handle.as_mut() }.ok_or(Error::InvalidPointer)
}

/// Store `value` through an optional out-pointer.
///
/// # Safety
///
/// The caller must ensure that out is null or valid for writes.
pub unsafe fn write_out(out: *mut i64, value: usize) -> Result<()> {
    let value = i64::try_from(value)
        .map_err(|_| Error::InvalidArgument(format!("{} does not fit in i64", value)))?;
    if let Some(out) = unsafe { out.as_mut() } {
        *out = value;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_code_panic() {
        let code = return_code(|| -> Result<()> { panic!("boom") });
        assert_eq!(code, Error::Panic.code());
    }

    #[test]
    fn test_return_code_results() {
        assert_eq!(return_code(|| ()), 0);
        assert_eq!(return_code(|| -> Result<()> { Err(Error::NoData) }), -5);
        assert_eq!(return_code(|| -> Result<usize> { Ok(42) }), 42);
    }

    #[test]
    fn test_return_handle() {
        let handle = return_handle("test", || Ok(7u32));
        assert!(!handle.is_null());
        let value = unsafe { Box::from_raw(handle) };
        assert_eq!(*value, 7);

        assert!(return_handle::<u32, _>("test", || Err(Error::NoData)).is_null());
        assert!(return_handle::<u32, _>("test", || panic!("boom")).is_null());
    }

    #[test]
    fn test_parse_len() {
        assert_eq!(parse_len(0).unwrap(), 0);
        assert_eq!(parse_len(4096).unwrap(), 4096);
        assert!(matches!(parse_len(-1), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_parse_null_pointers() {
        unsafe {
            assert_eq!(parse_str(std::ptr::null()).unwrap(), "");
            assert!(parse_slice(std::ptr::null(), 0).unwrap().is_empty());
            assert!(matches!(
                parse_slice(std::ptr::null(), 4),
                Err(Error::InvalidPointer)
            ));
            assert!(matches!(
                parse_slice_mut(std::ptr::null_mut(), 4),
                Err(Error::InvalidPointer)
            ));
            assert!(matches!(
                parse_handle::<u8>(std::ptr::null_mut()),
                Err(Error::InvalidPointer)
            ));
        }
    }

    #[test]
    fn test_parse_str_utf8() {
        let bad = [0xFFu8, 0xFE, 0];
        let err = unsafe { parse_str(bad.as_ptr() as *const c_char) }.unwrap_err();
        assert!(matches!(err, Error::Utf8(_)));

        let ok = c"/dev/video0";
        assert_eq!(unsafe { parse_str(ok.as_ptr()) }.unwrap(), "/dev/video0");
    }

    #[test]
    fn test_write_out() {
        let mut value = 0i64;
        unsafe {
            write_out(&mut value, 640).unwrap();
            write_out(std::ptr::null_mut(), 640).unwrap();
        }
        assert_eq!(value, 640);
    }
}
