//! Host function registration for Wasmtime linkers.
//!
//! This module registers the guest's three function imports. Each one
//! forwards to the store data through [`GuestCallbacks`]; the memory import
//! is supplied separately by
//! [`vm_bridge_core::InstanceRunner::provide_memory`].

use tracing::{trace, warn};
use wasmtime::{Caller, Extern, Linker};

use vm_bridge_common::{BridgeError, HostFunctionError};
use vm_bridge_core::instance::{IMPORT_MODULE, MEMORY_EXPORT};
use vm_bridge_core::{GuestCallbacks, LinearMemory};

use crate::diagnostics::decode_message;

/// Register all guest imports on a linker.
///
/// This registers the following host functions:
/// - `env::input` - Next pending input value
/// - `env::output` - Append a value to the output log
/// - `env::err` - Report a diagnostic message from guest memory
///
/// # Errors
///
/// Returns an error if function registration fails.
pub fn register_all<T: GuestCallbacks + 'static>(
    linker: &mut Linker<T>,
) -> Result<(), BridgeError> {
    register_input(linker)?;
    register_output(linker)?;
    register_err(linker)?;
    Ok(())
}

/// Register `env::input() -> i32`.
///
/// Returns the next queued value (0 to 65535), or 0 when the queue is empty.
pub fn register_input<T: GuestCallbacks + 'static>(
    linker: &mut Linker<T>,
) -> Result<(), BridgeError> {
    linker
        .func_wrap(IMPORT_MODULE, "input", |mut caller: Caller<'_, T>| -> i32 {
            let value = caller.data_mut().next_input();
            trace!(value = value, "Guest input");
            i32::from(value)
        })
        .map_err(|e| {
            BridgeError::invalid_config(format!("Failed to register input function: {e}"))
        })?;

    Ok(())
}

/// Register `env::output(value: i32)`.
pub fn register_output<T: GuestCallbacks + 'static>(
    linker: &mut Linker<T>,
) -> Result<(), BridgeError> {
    linker
        .func_wrap(
            IMPORT_MODULE,
            "output",
            |mut caller: Caller<'_, T>, value: i32| {
                trace!(value = value, "Guest output");
                caller.data_mut().emit_output(value);
            },
        )
        .map_err(|e| {
            BridgeError::invalid_config(format!("Failed to register output function: {e}"))
        })?;

    Ok(())
}

/// Register `env::err(ptr: i32, len: i32)`.
///
/// # Memory Protocol
///
/// The guest passes:
/// - `ptr`: Offset of the message in guest memory
/// - `len`: Length of the message in bytes (UTF-8)
///
/// The bytes are decoded with [`decode_message`] and passed to
/// [`GuestCallbacks::report_error`]. A range the host cannot read goes to
/// [`GuestCallbacks::report_host_error`] instead; the guest itself is not
/// trapped.
pub fn register_err<T: GuestCallbacks + 'static>(
    linker: &mut Linker<T>,
) -> Result<(), BridgeError> {
    linker
        .func_wrap(
            IMPORT_MODULE,
            "err",
            |mut caller: Caller<'_, T>, ptr: i32, len: i32| {
                match read_message(&mut caller, ptr, len) {
                    Ok(message) => caller.data_mut().report_error(message),
                    Err(e) => {
                        warn!(ptr = ptr, len = len, error = %e, "Unreadable guest diagnostic");
                        caller
                            .data_mut()
                            .report_host_error(format!("Unreadable guest diagnostic: {e}"));
                    }
                }
            },
        )
        .map_err(|e| {
            BridgeError::invalid_config(format!("Failed to register err function: {e}"))
        })?;

    Ok(())
}

/// Read and decode `[ptr, ptr + len)` from the calling guest's memory.
///
/// The message is converted to an owned `String` so the borrow of guest
/// memory ends before the store data is mutated.
fn read_message<T: GuestCallbacks>(
    caller: &mut Caller<'_, T>,
    ptr: i32,
    len: i32,
) -> Result<String, BridgeError> {
    let (Ok(offset), Ok(len)) = (usize::try_from(ptr), usize::try_from(len)) else {
        return Err(HostFunctionError::InvalidArgument {
            reason: format!("negative pointer or length ({ptr}, {len})"),
        }
        .into());
    };

    let memory = caller
        .get_export(MEMORY_EXPORT)
        .and_then(Extern::into_memory)
        .or_else(|| caller.data().guest_memory())
        .ok_or(HostFunctionError::MemoryUnavailable)?;

    let bytes = LinearMemory::new(memory).read(&*caller, offset, len)?;
    Ok(decode_message(bytes))
}
