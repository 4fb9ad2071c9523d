//! Common types, errors, and configuration for vm-bridge.
//!
//! This crate provides shared functionality used across the vm-bridge workspace:
//! - Error types using `thiserror` for type-safe error handling
//! - Configuration structures for the engine and guest calls
//! - TOML configuration file loading

pub mod config;
pub mod config_file;
pub mod error;

pub use config::{BridgeConfig, EngineConfig, ExecutionConfig};
pub use config_file::{ConfigFile, ConfigFileError, GuestConfig};
pub use error::{BridgeError, HostFunctionError};
