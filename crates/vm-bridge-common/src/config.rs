//! Configuration structures for vm-bridge.
//!
//! This module defines configuration options for various components:
//! - [`BridgeConfig`]: Top-level configuration containing all settings
//! - [`EngineConfig`]: Wasmtime engine settings (optimisation, fuel metering)
//! - [`ExecutionConfig`]: Per-call guest limits and host-provided memory size

use serde::{Deserialize, Serialize};

/// Top-level bridge configuration.
///
/// It can be loaded from files (TOML, JSON) or built in code.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Wasmtime engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Guest call configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

/// Wasmtime engine configuration.
///
/// These settings are fixed for the lifetime of the engine, which in turn
/// lives as long as the process.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Compile the guest with Cranelift speed optimisations.
    #[serde(default = "defaults::optimize")]
    pub optimize: bool,

    /// Enable fuel metering.
    ///
    /// Off by default: a running guest program cannot be interrupted unless
    /// this is turned on, in which case every guest call is bounded by
    /// [`ExecutionConfig::max_fuel`].
    #[serde(default = "defaults::consume_fuel")]
    pub consume_fuel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            optimize: defaults::optimize(),
            consume_fuel: defaults::consume_fuel(),
        }
    }
}

/// Per-call guest configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Fuel granted to each `assemble` or `run` call.
    ///
    /// Only effective when [`EngineConfig::consume_fuel`] is enabled.
    #[serde(default = "defaults::max_fuel")]
    pub max_fuel: u64,

    /// Initial size, in 64 KiB pages, of the `env.memory` import supplied
    /// to the guest.
    #[serde(default = "defaults::memory_pages")]
    pub memory_pages: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_fuel: defaults::max_fuel(),
            memory_pages: defaults::memory_pages(),
        }
    }
}

impl ExecutionConfig {
    /// Fuel to grant per guest call, given whether the engine meters fuel.
    pub fn fuel_budget(&self, engine: &EngineConfig) -> Option<u64> {
        engine.consume_fuel.then_some(self.max_fuel)
    }
}

/// Default value functions for serde.
mod defaults {
    pub const fn optimize() -> bool {
        true
    }

    pub const fn consume_fuel() -> bool {
        false
    }

    pub const fn max_fuel() -> u64 {
        10_000_000
    }

    pub const fn memory_pages() -> u32 {
        1
    }
}
