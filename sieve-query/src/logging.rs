//! Logging setup for Sieve.
//!
//! Every component logs through `tracing` with structured fields (`model`,
//! `filter_id`, `user_id`, `action`). Nothing is printed unless the host
//! application installs a subscriber, or calls [`init`] with the
//! `tracing-subscriber` feature enabled.
//!
//! # Environment Variables
//!
//! - `SIEVE_DEBUG=true|1|yes` - Enable debug logging
//! - `SIEVE_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `SIEVE_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use sieve_query::logging;
//!
//! // Call once at startup
//! logging::init();
//! ```

use std::env;
use std::sync::{Once, OnceLock};

static INIT: Once = Once::new();
static DEBUG: OnceLock<bool> = OnceLock::new();

const DEBUG_VAR: &str = "SIEVE_DEBUG";
const LEVEL_VAR: &str = "SIEVE_LOG_LEVEL";
const FORMAT_VAR: &str = "SIEVE_LOG_FORMAT";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }

    /// Name as accepted by `SIEVE_LOG_FORMAT`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        }
    }
}

/// Logging settings resolved from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    /// Whether `SIEVE_DEBUG` is on.
    pub debug: bool,
    /// Effective level filter.
    pub level: &'static str,
    /// Output format.
    pub format: LogFormat,
    /// Whether anything asked for logging at all.
    pub requested: bool,
}

impl LogSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let debug = lookup(DEBUG_VAR)
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);
        let fallback = if debug { "debug" } else { "warn" };
        let explicit = lookup(LEVEL_VAR);
        let level = match explicit.as_deref().map(str::to_lowercase).as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => fallback,
        };
        let format = lookup(FORMAT_VAR)
            .map(|f| LogFormat::parse(&f))
            .unwrap_or(LogFormat::Json);

        Self {
            debug,
            level,
            format,
            requested: debug || explicit.is_some(),
        }
    }
}

/// Check if debug logging is enabled via `SIEVE_DEBUG`.
///
/// The variable is read on the first call and the answer kept for the life
/// of the process.
#[inline]
pub fn is_debug_enabled() -> bool {
    *DEBUG.get_or_init(|| LogSettings::from_env().debug)
}

/// Initialize the Sieve logging system.
///
/// Subsequent calls are no-ops. When neither `SIEVE_DEBUG` nor
/// `SIEVE_LOG_LEVEL` is set, no subscriber is installed.
pub fn init() {
    INIT.call_once(|| {
        let settings = LogSettings::from_env();
        if !settings.requested {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = settings.level;
            let filter = EnvFilter::try_new(format!(
                "sieve={},sieve_query={},sieve_schema={}",
                level, level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            // `try_init` leaves a subscriber installed by the host application alone.
            let installed = match settings.format {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = level,
                    format = settings.format.as_str(),
                    "Sieve logging initialized"
                );
            }
        }
    });
}

/// Initialize logging at debug level.
///
/// # Safety
///
/// This function modifies environment variables, which is unsafe in
/// multi-threaded programs. Call this early in your program before
/// spawning threads.
pub fn init_debug() {
    // SAFETY: Only called at program startup before threads are spawned.
    unsafe {
        env::set_var(DEBUG_VAR, "true");
    }
    let _ = DEBUG.set(true);
    init();
}

/// Debug logging that only fires when `SIEVE_DEBUG` is enabled at runtime.
#[macro_export]
macro_rules! sieve_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Trace logging that only fires when `SIEVE_DEBUG` is enabled at runtime.
#[macro_export]
macro_rules! sieve_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::trace!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_request_nothing() {
        let s = settings(&[]);
        assert!(!s.debug);
        assert!(!s.requested);
        assert_eq!(s.level, "warn");
        assert_eq!(s.format, LogFormat::Json);
    }

    #[test]
    fn test_debug_flag_raises_level() {
        let s = settings(&[("SIEVE_DEBUG", "YES")]);
        assert!(s.debug);
        assert!(s.requested);
        assert_eq!(s.level, "debug");
    }

    #[test]
    fn test_explicit_level_and_format() {
        let s = settings(&[("SIEVE_LOG_LEVEL", "Trace"), ("SIEVE_LOG_FORMAT", "compact")]);
        assert_eq!(s.level, "trace");
        assert_eq!(s.format, LogFormat::Compact);
        assert!(s.requested);
    }

    #[test]
    fn test_unknown_level_falls_back() {
        let s = settings(&[("SIEVE_LOG_LEVEL", "loud")]);
        assert_eq!(s.level, "warn");
    }

    #[test]
    fn test_debug_flag_read_once() {
        let first = is_debug_enabled();
        let previous = env::var(DEBUG_VAR).ok();

        // SAFETY: No other test in this crate touches SIEVE_DEBUG.
        unsafe {
            env::set_var(DEBUG_VAR, if first { "false" } else { "true" });
        }
        let second = is_debug_enabled();
        unsafe {
            match previous {
                Some(value) => env::set_var(DEBUG_VAR, value),
                None => env::remove_var(DEBUG_VAR),
            }
        }

        assert_eq!(first, second);
    }
}
