//! Guest instantiation and entry point invocation.
//!
//! This module provides [`InstanceRunner`], which wires the host imports and
//! instantiates the guest exactly once, and [`GuestInstance`], which calls
//! the guest's two entry points:
//!
//! - `assemble(src_ptr, src_len, out_ptr) -> i32`
//! - `run(ptr, len, origin)`
//!
//! Calls are synchronous. Import callbacks fire on the calling thread while
//! the guest is running and see the store's data through
//! [`crate::GuestCallbacks`].

use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};
use wasmtime::{Linker, Memory, MemoryType, Store, Trap, TypedFunc, WasmParams, WasmResults};

use crate::store::{calculate_fuel_consumed, get_remaining_fuel};
use crate::{CompiledModule, LinearMemory, WasmEngine};
use vm_bridge_common::BridgeError;

/// Module name of every host import.
pub const IMPORT_MODULE: &str = "env";

/// Name of the linear memory import and export.
pub const MEMORY_EXPORT: &str = "memory";

/// Name of the assembler entry point.
pub const ASSEMBLE_EXPORT: &str = "assemble";

/// Name of the VM entry point.
pub const RUN_EXPORT: &str = "run";

/// Result of one guest entry point call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult<T> {
    /// The guest returned normally.
    Success(T),

    /// The guest trapped.
    Trap {
        /// Description of the trap.
        message: String,
        /// Trap code if available.
        code: Option<String>,
    },

    /// The call ran out of fuel.
    FuelExhausted,
}

impl<T> ExecutionResult<T> {
    /// Returns `true` if the guest returned normally.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success(_))
    }

    /// Returns `true` if the guest trapped.
    pub fn is_trap(&self) -> bool {
        matches!(self, ExecutionResult::Trap { .. })
    }

    /// Human-readable description of a failed call, `None` on success.
    pub fn fault_message(&self) -> Option<String> {
        match self {
            ExecutionResult::Success(_) => None,
            ExecutionResult::Trap { message, .. } => Some(message.clone()),
            ExecutionResult::FuelExhausted => Some(BridgeError::FuelExhausted.to_string()),
        }
    }
}

/// Links host imports and instantiates the guest.
///
/// Register the import callbacks on [`InstanceRunner::linker_mut`] and
/// supply the memory import with [`InstanceRunner::provide_memory`] before
/// calling [`InstanceRunner::instantiate`].
pub struct InstanceRunner<T: 'static> {
    linker: Linker<T>,
    provided_memory: Option<Memory>,
}

impl<T: 'static> InstanceRunner<T> {
    /// Create a new instance runner with an empty linker.
    pub fn new(engine: &WasmEngine) -> Self {
        let linker = Linker::new(engine.inner());

        Self {
            linker,
            provided_memory: None,
        }
    }

    /// Get a mutable reference to the linker.
    ///
    /// Use this to register the import callbacks.
    pub fn linker_mut(&mut self) -> &mut Linker<T> {
        &mut self.linker
    }

    /// Define the `env.memory` import with `pages` initial 64 KiB pages.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory cannot be created or defined.
    pub fn provide_memory(&mut self, store: &mut Store<T>, pages: u32) -> Result<Memory, BridgeError> {
        let memory = Memory::new(&mut *store, MemoryType::new(pages, None)).map_err(|e| {
            BridgeError::invalid_config(format!("Failed to create guest memory: {e}"))
        })?;

        self.linker
            .define(&*store, IMPORT_MODULE, MEMORY_EXPORT, memory)
            .map_err(|e| {
                BridgeError::invalid_config(format!("Failed to define memory import: {e}"))
            })?;

        debug!(pages = pages, "Memory import defined");

        self.provided_memory = Some(memory);
        Ok(memory)
    }

    /// Instantiate the guest and resolve its entry points and memory.
    ///
    /// The guest's exported `memory` is preferred; a guest that only
    /// imports `env.memory` uses the host-provided one.
    ///
    /// # Errors
    ///
    /// Returns an error if instantiation fails, either entry point is
    /// missing or mistyped, or no memory can be resolved.
    #[instrument(skip_all, fields(content_hash = %module.content_hash()))]
    pub fn instantiate(
        &self,
        store: &mut Store<T>,
        module: &CompiledModule,
    ) -> Result<GuestInstance, BridgeError> {
        debug!("Instantiating guest module");

        let instance = self
            .linker
            .instantiate(&mut *store, module.as_module())
            .map_err(|e| BridgeError::instantiation_failed(format!("{e:#}")))?;

        let assemble = instance
            .get_typed_func::<(i32, i32, i32), i32>(&mut *store, ASSEMBLE_EXPORT)
            .map_err(|_| BridgeError::missing_export(ASSEMBLE_EXPORT))?;

        let run = instance
            .get_typed_func::<(i32, i32, i32), ()>(&mut *store, RUN_EXPORT)
            .map_err(|_| BridgeError::missing_export(RUN_EXPORT))?;

        let imports_memory = module
            .as_module()
            .imports()
            .any(|import| import.module() == IMPORT_MODULE && import.name() == MEMORY_EXPORT);

        let memory = instance
            .get_memory(&mut *store, MEMORY_EXPORT)
            .or(self.provided_memory.filter(|_| imports_memory))
            .ok_or_else(|| BridgeError::missing_export(MEMORY_EXPORT))?;

        let memory = LinearMemory::new(memory);

        info!(memory_size = memory.size(&*store), "Guest module instantiated");

        Ok(GuestInstance {
            memory,
            assemble,
            run,
        })
    }
}

impl<T: 'static> std::fmt::Debug for InstanceRunner<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceRunner")
            .field("provided_memory", &self.provided_memory.is_some())
            .finish_non_exhaustive()
    }
}

/// A live guest instance with its resolved entry points.
#[derive(Clone)]
pub struct GuestInstance {
    memory: LinearMemory,
    assemble: TypedFunc<(i32, i32, i32), i32>,
    run: TypedFunc<(i32, i32, i32), ()>,
}

impl GuestInstance {
    /// The guest's linear memory.
    pub fn memory(&self) -> LinearMemory {
        self.memory
    }

    /// Call `assemble(src_ptr, src_len, out_ptr)` and return the packed
    /// result word reinterpreted as unsigned.
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    #[instrument(skip(self, store))]
    pub fn assemble<T>(
        &self,
        store: &mut Store<T>,
        src_ptr: u32,
        src_len: u32,
        out_ptr: u32,
    ) -> ExecutionResult<u32> {
        let params = (src_ptr as i32, src_len as i32, out_ptr as i32);
        match invoke(store, &self.assemble, params, ASSEMBLE_EXPORT) {
            ExecutionResult::Success(word) => ExecutionResult::Success(word as u32),
            ExecutionResult::Trap { message, code } => ExecutionResult::Trap { message, code },
            ExecutionResult::FuelExhausted => ExecutionResult::FuelExhausted,
        }
    }

    /// Call `run(pointer, length, origin)`.
    ///
    /// Returns when the guest program halts or traps. Unless fuel metering
    /// is enabled there is no way to stop a guest that never halts.
    #[allow(clippy::cast_possible_wrap)]
    #[instrument(skip(self, store))]
    pub fn run<T>(
        &self,
        store: &mut Store<T>,
        pointer: u32,
        length: u16,
        origin: u16,
    ) -> ExecutionResult<()> {
        let params = (pointer as i32, i32::from(length), i32::from(origin));
        invoke(store, &self.run, params, RUN_EXPORT)
    }
}

impl std::fmt::Debug for GuestInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestInstance")
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}

fn invoke<T, P, R>(
    store: &mut Store<T>,
    func: &TypedFunc<P, R>,
    params: P,
    export: &str,
) -> ExecutionResult<R>
where
    P: WasmParams,
    R: WasmResults,
{
    let start = Instant::now();
    let initial_fuel = get_remaining_fuel(store);

    debug!(export = export, "Calling guest");

    let result = func.call(&mut *store, params);

    let fuel_consumed = initial_fuel.map_or(0, |fuel| calculate_fuel_consumed(fuel, store));
    let duration = start.elapsed();

    match result {
        Ok(value) => {
            info!(
                export = export,
                duration_ms = duration.as_millis(),
                fuel_consumed = fuel_consumed,
                "Guest call completed"
            );
            ExecutionResult::Success(value)
        }
        Err(trap) => {
            if is_out_of_fuel(&trap) {
                warn!(
                    export = export,
                    duration_ms = duration.as_millis(),
                    fuel_consumed = fuel_consumed,
                    "Guest call terminated: fuel exhausted"
                );
                return ExecutionResult::FuelExhausted;
            }

            let (message, code) = extract_trap_info(&trap);

            error!(
                export = export,
                duration_ms = duration.as_millis(),
                trap_message = %message,
                "Guest call trapped"
            );

            ExecutionResult::Trap { message, code }
        }
    }
}

/// Extract human-readable trap information.
fn extract_trap_info(error: &wasmtime::Error) -> (String, Option<String>) {
    let message = error.root_cause().to_string();

    // Try to get the trap code
    let code = error.downcast_ref::<Trap>().map(|trap| format!("{trap:?}"));

    (message, code)
}

/// Check if an error is due to fuel exhaustion.
fn is_out_of_fuel(error: &wasmtime::Error) -> bool {
    error
        .downcast_ref::<Trap>()
        .is_some_and(|trap| *trap == Trap::OutOfFuel)
}
