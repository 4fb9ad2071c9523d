//! Bounds-checked views into guest linear memory.
//!
//! The guest owns its single linear memory; the host only ever holds a
//! [`LinearMemory`] handle and borrows the live bytes through the store for
//! the duration of one read or write. Every access is checked against the
//! memory's current size, which may change whenever the guest grows it.

use wasmtime::{AsContext, Memory, StoreContext, StoreContextMut};

use vm_bridge_common::BridgeError;

/// Handle to the guest's linear memory.
#[derive(Debug, Clone, Copy)]
pub struct LinearMemory {
    memory: Memory,
}

impl LinearMemory {
    /// Wrap a Wasmtime memory handle.
    pub fn new(memory: Memory) -> Self {
        Self { memory }
    }

    /// The underlying Wasmtime handle.
    pub fn handle(&self) -> Memory {
        self.memory
    }

    /// Current size of the memory in bytes.
    pub fn size(&self, store: impl AsContext) -> usize {
        self.memory.data_size(store)
    }

    /// Borrow `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::OutOfBounds`] if `[offset, offset + len)` is
    /// not inside the memory.
    pub fn read<'a, T: 'a>(
        &self,
        store: impl Into<StoreContext<'a, T>>,
        offset: usize,
        len: usize,
    ) -> Result<&'a [u8], BridgeError> {
        let data = self.memory.data(store);
        let range = checked_range(offset, len, data.len())?;
        Ok(&data[range])
    }

    /// Copy `bytes` into memory starting at `offset`.
    ///
    /// Nothing is written unless the whole range fits.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::OutOfBounds`] if the range is not inside the memory.
    pub fn write<'a, T: 'a>(
        &self,
        store: impl Into<StoreContextMut<'a, T>>,
        offset: usize,
        bytes: &[u8],
    ) -> Result<(), BridgeError> {
        let data = self.memory.data_mut(store);
        let range = checked_range(offset, bytes.len(), data.len())?;
        data[range].copy_from_slice(bytes);
        Ok(())
    }
}

fn checked_range(
    offset: usize,
    len: usize,
    size: usize,
) -> Result<std::ops::Range<usize>, BridgeError> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(offset..end),
        _ => Err(BridgeError::OutOfBounds { offset, len, size }),
    }
}
