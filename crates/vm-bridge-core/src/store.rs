//! Store creation and fuel bookkeeping.
//!
//! The store owns the guest instance and the session data the import
//! callbacks mutate. One store is created at startup and reused for every
//! guest call until the process exits.

use wasmtime::Store;

use crate::WasmEngine;
use vm_bridge_common::{BridgeError, ExecutionConfig};

/// Create a new Wasmtime store holding `data`.
///
/// When the engine meters fuel the store starts with `max_fuel`.
///
/// # Errors
///
/// Returns an error if fuel cannot be set on the store.
pub fn create_store<T>(
    engine: &WasmEngine,
    config: &ExecutionConfig,
    data: T,
) -> Result<Store<T>, BridgeError> {
    let mut store = Store::new(engine.inner(), data);

    refuel(&mut store, config.fuel_budget(engine.config()))?;

    Ok(store)
}

/// Reset the store's fuel to `budget` before a guest call.
///
/// Does nothing when `budget` is `None` (fuel metering disabled).
///
/// # Errors
///
/// Returns an error if fuel cannot be set on the store.
pub fn refuel<T>(store: &mut Store<T>, budget: Option<u64>) -> Result<(), BridgeError> {
    if let Some(fuel) = budget {
        store
            .set_fuel(fuel)
            .map_err(|e| BridgeError::invalid_config(format!("Failed to set fuel: {e}")))?;
    }
    Ok(())
}

/// Get remaining fuel from a store.
///
/// Returns `None` when fuel metering is disabled.
pub fn get_remaining_fuel<T>(store: &Store<T>) -> Option<u64> {
    store.get_fuel().ok()
}

/// Calculate fuel consumed since `initial_fuel` was observed.
pub fn calculate_fuel_consumed<T>(initial_fuel: u64, store: &Store<T>) -> u64 {
    let remaining = get_remaining_fuel(store).unwrap_or(0);
    initial_fuel.saturating_sub(remaining)
}
