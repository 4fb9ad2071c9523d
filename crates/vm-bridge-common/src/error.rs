//! Error types for vm-bridge.
//!
//! This module defines a hierarchy of error types using `thiserror`:
//! - [`BridgeError`]: Top-level errors for the bridge
//! - [`HostFunctionError`]: Errors from import callback implementations

use std::io;

use thiserror::Error;

/// Top-level bridge errors.
///
/// These cover loading and wiring the guest module and host-side memory
/// access. Assembly failures and guest traps are reported as outcomes, not
/// through this type.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// WebAssembly compilation failed.
    #[error("Compilation failed: {reason}")]
    CompilationFailed {
        /// Description of the compilation failure.
        reason: String,
    },

    /// The guest module could not be instantiated against the host imports.
    #[error("Instantiation failed: {reason}")]
    InstantiationFailed {
        /// Description of the instantiation failure.
        reason: String,
    },

    /// A required export is missing or has the wrong signature.
    #[error("Missing guest export: {name}")]
    MissingExport {
        /// Name of the export.
        name: String,
    },

    /// A host-side access fell outside the guest's linear memory.
    #[error("Memory access out of bounds: offset {offset}, length {len}, memory size {size}")]
    OutOfBounds {
        /// Start offset of the access.
        offset: usize,
        /// Length of the access in bytes.
        len: usize,
        /// Current size of the linear memory in bytes.
        size: usize,
    },

    /// The encoded program does not fit in the guest's linear memory.
    #[error("Program of {required} bytes does not fit in {available} bytes of guest memory")]
    MemoryTooSmall {
        /// Bytes needed, including the reserved leading byte.
        required: usize,
        /// Current size of the linear memory in bytes.
        available: usize,
    },

    /// Execution exhausted the configured fuel limit.
    #[error("Fuel exhausted: CPU limit exceeded")]
    FuelExhausted,

    /// An import callback failed.
    #[error("Host function error: {0}")]
    HostFunction(#[from] HostFunctionError),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration was provided.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },
}

/// Errors from import callback implementations.
#[derive(Error, Debug)]
pub enum HostFunctionError {
    /// Invalid argument was passed to a host function.
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Description of why the argument was invalid.
        reason: String,
    },

    /// The guest has no linear memory the host can read.
    #[error("Guest memory unavailable")]
    MemoryUnavailable,
}

impl BridgeError {
    /// Create a new `CompilationFailed` error.
    pub fn compilation_failed(reason: impl Into<String>) -> Self {
        Self::CompilationFailed {
            reason: reason.into(),
        }
    }

    /// Create a new `InstantiationFailed` error.
    pub fn instantiation_failed(reason: impl Into<String>) -> Self {
        Self::InstantiationFailed {
            reason: reason.into(),
        }
    }

    /// Create a new `MissingExport` error.
    pub fn missing_export(name: impl Into<String>) -> Self {
        Self::MissingExport { name: name.into() }
    }

    /// Create a new `InvalidConfig` error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
