//! Logging abstraction layer for reinhardt-elements
//!
//! The engine logs through these macros instead of calling `tracing` directly, so the
//! call sites stay uniform and `debug_log!` can be compiled out.
//!
//! ## Macro Overview
//!
//! | Macro | Feature Required | Backend |
//! |-------|------------------|---------|
//! | `debug_log!` | `debug-hooks` | `tracing::debug!` |
//! | `info_log!` | None | `tracing::info!` |
//! | `warn_log!` | None | `tracing::warn!` |
//! | `error_log!` | None | `tracing::error!` |
//!
//! Install any `tracing` subscriber to see the output.
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_elements::{debug_log, warn_log};
//!
//! debug_log!("patching {} holes", holes.len());
//! warn_log!("duplicate key {} in keyed list", key);
//! ```

/// Logs a debug message (requires the `debug-hooks` feature)
#[macro_export]
#[cfg(feature = "debug-hooks")]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::__tracing::debug!($($arg)*);
	}};
}

/// No-op debug_log when `debug-hooks` is disabled
#[macro_export]
#[cfg(not(feature = "debug-hooks"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{}};
}

/// Logs an info message
#[macro_export]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::__tracing::info!($($arg)*);
	}};
}

/// Logs a warning message
#[macro_export]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::__tracing::warn!($($arg)*);
	}};
}

/// Logs an error message
#[macro_export]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::__tracing::error!($($arg)*);
	}};
}
