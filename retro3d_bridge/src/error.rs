//! Error types for the Retro3D bridge
//!
//! This module defines the error types used throughout the bridge:
//! synchronous validation and protocol errors raised on the caller's thread,
//! and the few driver-side failures that can be surfaced back to a caller
//! (only the blocking creation handshake does that).

use std::fmt;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Retro3D bridge errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan, recording driver, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (unknown driver handle, destroyed buffer, etc.)
    InvalidResource(String),

    /// Initialization failed (queue worker, driver handshake, backend)
    InitializationFailed(String),

    /// Caller passed arguments the legacy API rejects (bad pool, bad range, ...)
    InvalidCall(String),

    /// A lock was requested on a buffer that is already locked
    AlreadyLocked,

    /// Unlock was requested on a buffer that is not locked
    NotLocked,

    /// The command queue no longer accepts work
    QueueClosed,

    /// The requested interface is not exposed by this resource
    NoInterface(String),

    /// Legacy entry point that is intentionally not implemented
    NotImplemented(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidCall(msg) => write!(f, "Invalid call: {}", msg),
            Error::AlreadyLocked => write!(f, "Locking a locked buffer"),
            Error::NotLocked => write!(f, "Unlocking an unlocked buffer"),
            Error::QueueClosed => write!(f, "Command queue is shut down"),
            Error::NoInterface(msg) => write!(f, "No such interface: {}", msg),
            Error::NotImplemented(what) => write!(f, "Not implemented: {}", what),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
