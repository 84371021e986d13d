//! Logging abstraction
//!
//! Unified logging macros across targets: with the `defmt` feature the
//! messages go to the defmt transport, otherwise they compile to
//! nothing. The engine logs sparsely (calibration commits, persistence
//! trouble); per-tick paths never log.

/// Log informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        ::defmt::info!($($arg)*);
    };
}

/// Log warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        ::defmt::warn!($($arg)*);
    };
}

/// Log error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        ::defmt::error!($($arg)*);
    };
}
