//! Error types for the ray tracing pipeline
//!
//! This module defines the error type used throughout the crate, together
//! with the `engine_err!` / `engine_bail!` family of macros that log an
//! error through the engine logger before handing it back to the caller.

use std::fmt;

/// Result type for ray tracing pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ray tracing pipeline errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan driver call failed, etc.)
    BackendError(String),

    /// Out of host or device memory
    OutOfMemory,

    /// Invalid resource or construction input
    InvalidResource(String),

    /// Initialization failed (pipeline, layout, descriptor sets)
    InitializationFailed(String),

    /// Descriptor pool could not satisfy an allocation
    DescriptorPoolExhausted(String),

    /// Shader binary could not be loaded or was rejected
    ShaderLoadFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::DescriptorPoolExhausted(msg) => write!(f, "Descriptor pool exhausted: {}", msg),
            Error::ShaderLoadFailed(msg) => write!(f, "Shader load failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR message and build an `Error::BackendError` from it
///
/// # Example
///
/// ```no_run
/// # use ray_tracing_pipeline::engine_err;
/// let err = engine_err!("rtp::vulkan", "Failed to create pipeline: {}", 42);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::rtp::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return `Err(Error::BackendError)` from the enclosing function
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

/// Log a WARN message and build an `Error::InvalidResource` from it
///
/// Used for errors caused by caller input rather than by the driver.
#[macro_export]
macro_rules! engine_warn_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_warn!($source, "{}", message);
        $crate::rtp::Error::InvalidResource(message)
    }};
}

/// Log a WARN message and return `Err(Error::InvalidResource)` from the enclosing function
#[macro_export]
macro_rules! engine_bail_warn {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_warn_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
