//! Logging abstraction
//!
//! Provides the `log_*!` macro family used throughout the crate. On the host
//! every macro forwards to the [`log`] facade, so the embedding application
//! picks the backend (`env_logger` in the `param_sync` binary, nothing in
//! library tests unless a test installs one).
//!
//! Status messages meant for an operator go through the protocol status
//! funnel instead; these macros are for diagnostics.

/// Log informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        ::log::info!($($arg)*);
    }};
}

/// Log warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        ::log::warn!($($arg)*);
    }};
}

/// Log error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        ::log::error!($($arg)*);
    }};
}

/// Log debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        ::log::debug!($($arg)*);
    }};
}

/// Log trace message
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {{
        ::log::trace!($($arg)*);
    }};
}
