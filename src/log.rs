//! Diagnostic output setup
//!
//! All diagnostics go through `tracing` with the `avbridge` target.
//! `AVBRIDGE_LOG` takes full filter directives and overrides the level.

use std::str::FromStr;

use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

/// Environment variable holding filter directives
pub const LOG_ENV: &str = "AVBRIDGE_LOG";

#[derive(Debug, Clone, Copy)]
pub struct Log {
    pub level: Level,
}

impl Default for Log {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl Log {
    /// Parse "error", "warn", "info", "debug" or "trace". Empty selects the default.
    pub fn parse(level: &str) -> Result<Self> {
        match level {
            "" => Ok(Self::default()),
            level => Level::from_str(level)
                .map(|level| Self { level })
                .map_err(|_| Error::InvalidArgument(format!("unknown log level: {}", level))),
        }
    }

    /// Install the global subscriber. Only the first call takes effect for
    /// `tracing`; the FFmpeg level follows every call.
    pub fn init(&self) {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(self.level).into())
            .with_env_var(LOG_ENV)
            .from_env_lossy();

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();

        #[cfg(feature = "ffmpeg")]
        unsafe {
            crate::ffi::avutil::av_log_set_level(self.ffmpeg_level());
        }
    }

    /// FFmpeg runs one step quieter than the crate level.
    #[cfg(feature = "ffmpeg")]
    fn ffmpeg_level(&self) -> std::os::raw::c_int {
        use crate::ffi::avutil::log_level;

        match self.level {
            Level::ERROR => log_level::ERROR,
            Level::WARN | Level::INFO => log_level::WARNING,
            Level::DEBUG => log_level::VERBOSE,
            _ => log_level::DEBUG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        assert_eq!(Log::parse("").unwrap().level, Level::INFO);
        assert_eq!(Log::parse("debug").unwrap().level, Level::DEBUG);
        assert_eq!(Log::parse("WARN").unwrap().level, Level::WARN);
        assert_eq!(Log::parse("trace").unwrap().level, Level::TRACE);
    }

    #[test]
    fn test_parse_unknown_level() {
        let err = Log::parse("loud").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_init_twice() {
        Log::default().init();
        Log::parse("debug").unwrap().init();
    }
}
