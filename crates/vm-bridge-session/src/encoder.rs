//! Program encoding and placement in guest memory.
//!
//! Memory layout convention:
//!
//! ```text
//! offset 0          reserved, never written by the host
//! offset 1 ..       UTF-8(program + "\n" + TERMINATOR)
//! offset 1 + len    artifact scratch space handed to `assemble`
//! ```

use wasmtime::StoreContextMut;

use vm_bridge_common::BridgeError;
use vm_bridge_core::LinearMemory;

/// Instruction appended to every program.
pub const TERMINATOR: &str = "HALT";

/// Offset of the first program byte.
pub const PROGRAM_OFFSET: usize = 1;

/// Encode editor text as the byte sequence handed to the guest.
///
/// The terminator is always appended on its own line, even when the
/// program already ends with one.
pub fn encode_program(source: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(source.len() + 1 + TERMINATOR.len());
    bytes.extend_from_slice(source.as_bytes());
    bytes.push(b'\n');
    bytes.extend_from_slice(TERMINATOR.as_bytes());
    bytes
}

/// Where an encoded program was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramLayout {
    /// First program byte; always [`PROGRAM_OFFSET`].
    pub source_ptr: u32,

    /// Number of encoded bytes.
    pub source_len: u32,

    /// First byte after the program, passed to `assemble` as scratch space.
    pub output_ptr: u32,
}

/// Write an encoded program at [`PROGRAM_OFFSET`].
///
/// Must only be called between guest calls.
///
/// # Errors
///
/// Returns [`BridgeError::MemoryTooSmall`] if the program does not fit;
/// nothing is written in that case.
pub fn write_program<'a, T: 'a>(
    memory: LinearMemory,
    store: impl Into<StoreContextMut<'a, T>>,
    encoded: &[u8],
) -> Result<ProgramLayout, BridgeError> {
    let required = PROGRAM_OFFSET + encoded.len();

    memory
        .write(store, PROGRAM_OFFSET, encoded)
        .map_err(|e| match e {
            BridgeError::OutOfBounds { size, .. } => BridgeError::MemoryTooSmall {
                required,
                available: size,
            },
            other => other,
        })?;

    let too_large = || BridgeError::MemoryTooSmall {
        required,
        available: u32::MAX as usize,
    };

    Ok(ProgramLayout {
        source_ptr: u32::try_from(PROGRAM_OFFSET).map_err(|_| too_large())?,
        source_len: u32::try_from(encoded.len()).map_err(|_| too_large())?,
        output_ptr: u32::try_from(required).map_err(|_| too_large())?,
    })
}
