//! Boundary error type
//!
//! Every variant maps to one stable negative status code. Zero is success.

/// Errors surfaced by the bridges and the exported C functions
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot describe compressed audio format: {0}")]
    CompressedFormat(String),

    #[error("cannot describe PCM format: {0}")]
    PcmFormat(String),

    #[error("failed to allocate {0} byte PCM buffer")]
    OutputAllocation(usize),

    #[error("failed to create audio converter: {0}")]
    Converter(String),

    #[error("converter produced no data")]
    NoData,

    #[error("conversion failed: {0}")]
    Conversion(String),

    #[error("produced {produced} bytes, caller declared {expected}")]
    SizeMismatch { produced: usize, expected: usize },

    #[error("invalid parameter sets: {0}")]
    ParameterSets(String),

    #[error("failed to create decode session: {0}")]
    Session(String),

    #[error("capture device error: {0}")]
    Device(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("buffer holds {len} bytes, {required} required")]
    BufferTooSmall { len: usize, required: usize },

    #[error("not supported: {0}")]
    Unsupported(String),

    #[error("invalid pointer")]
    InvalidPointer,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("capture session closed")]
    Closed,

    #[error("panic")]
    Panic,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Stable negative status code returned across the C boundary
    pub fn code(&self) -> i32 {
        match self {
            Error::CompressedFormat(_) => -1,
            Error::PcmFormat(_) => -2,
            Error::OutputAllocation(_) => -3,
            Error::Converter(_) => -4,
            Error::NoData => -5,
            Error::Conversion(_) => -6,
            Error::SizeMismatch { .. } => -7,
            Error::ParameterSets(_) => -8,
            Error::Session(_) => -9,
            Error::Device(_) => -10,
            Error::Decode(_) => -11,
            Error::BufferTooSmall { .. } => -12,
            Error::Unsupported(_) => -13,
            Error::InvalidPointer => -14,
            Error::InvalidArgument(_) => -15,
            Error::Utf8(_) => -16,
            Error::Closed => -17,
            Error::Panic => -18,
        }
    }
}
