//! Wasmtime engine configuration and creation.
//!
//! The [`WasmEngine`] is created once at startup and lives as long as the
//! process. It holds no session state; that lives in the store.

use std::sync::Arc;

use tracing::info;
use wasmtime::{Config, Engine, OptLevel};

use vm_bridge_common::{BridgeError, EngineConfig};

/// WebAssembly engine wrapper.
///
/// This struct wraps a Wasmtime [`Engine`] configured for synchronous
/// execution of a single guest module. Guest calls block the calling thread
/// until the guest returns or traps.
///
/// # Configuration
///
/// The engine is configured with:
/// - **Cranelift Optimisation**: `speed` when `optimize` is set, `none` otherwise
/// - **Fuel Metering**: Only when `consume_fuel` is set; otherwise a running
///   guest cannot be interrupted
///
/// # Example
///
/// ```ignore
/// use vm_bridge_common::EngineConfig;
/// use vm_bridge_core::WasmEngine;
///
/// let config = EngineConfig::default();
/// let engine = WasmEngine::new(&config)?;
/// ```
#[derive(Clone)]
pub struct WasmEngine {
    engine: Arc<Engine>,
    config: EngineConfig,
}

impl WasmEngine {
    /// Create a new WebAssembly engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the Wasmtime configuration is invalid.
    pub fn new(config: &EngineConfig) -> Result<Self, BridgeError> {
        let mut wasmtime_config = Config::new();

        wasmtime_config.consume_fuel(config.consume_fuel);

        wasmtime_config.cranelift_opt_level(if config.optimize {
            OptLevel::Speed
        } else {
            OptLevel::None
        });

        let engine = Engine::new(&wasmtime_config).map_err(|e| {
            BridgeError::invalid_config(format!("Failed to create Wasmtime engine: {e}"))
        })?;

        info!(
            consume_fuel = config.consume_fuel,
            optimize = config.optimize,
            "Wasmtime engine initialized"
        );

        Ok(Self {
            engine: Arc::new(engine),
            config: config.clone(),
        })
    }

    /// Get a reference to the inner Wasmtime engine.
    pub fn inner(&self) -> &Engine {
        &self.engine
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Check if fuel metering is enabled.
    pub fn is_fuel_enabled(&self) -> bool {
        self.config.consume_fuel
    }
}

impl std::fmt::Debug for WasmEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmEngine")
            .field("consume_fuel", &self.config.consume_fuel)
            .field("optimize", &self.config.optimize)
            .finish_non_exhaustive()
    }
}
