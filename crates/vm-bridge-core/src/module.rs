//! Guest module compilation.
//!
//! This module provides [`CompiledModule`], a wrapper around Wasmtime's
//! [`Module`] for the precompiled assembler/VM guest. The guest is compiled
//! once per process and instantiated once.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;
use std::time::Instant;

use tracing::{info, instrument};
use wasmtime::{Engine, Module};

use vm_bridge_common::BridgeError;

/// A compiled guest module.
///
/// This struct wraps a Wasmtime [`Module`] with a content hash used to
/// identify the guest in logs.
#[derive(Clone)]
pub struct CompiledModule {
    /// The compiled Wasmtime module.
    inner: Module,

    /// Hash of the original module bytes or text.
    content_hash: String,
}

impl CompiledModule {
    /// Compile a module from WebAssembly binary bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is not a Wasm header or compilation fails.
    #[instrument(skip(engine, bytes), fields(bytes_len = bytes.len()))]
    pub fn from_bytes(engine: &Engine, bytes: &[u8]) -> Result<Self, BridgeError> {
        Self::validate_wasm_header(bytes)?;
        Self::compile(engine, bytes, "Guest module compiled")
    }

    /// Compile a module from WAT (WebAssembly Text Format).
    ///
    /// # Errors
    ///
    /// Returns an error if compilation fails.
    #[instrument(skip(engine, wat))]
    pub fn from_wat(engine: &Engine, wat: &str) -> Result<Self, BridgeError> {
        Self::compile(engine, wat.as_bytes(), "WAT guest module compiled")
    }

    /// Load and compile a module from disk.
    ///
    /// Files starting with the Wasm magic number are treated as binaries;
    /// anything else is parsed as WAT.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or compiled.
    #[instrument(skip(engine, path), fields(path = %path.as_ref().display()))]
    pub fn from_file(engine: &Engine, path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let bytes = std::fs::read(path.as_ref())?;

        if bytes.starts_with(b"\0asm") {
            Self::from_bytes(engine, &bytes)
        } else {
            let text = std::str::from_utf8(&bytes).map_err(|e| {
                BridgeError::compilation_failed(format!(
                    "Guest module is neither Wasm nor UTF-8 WAT: {e}"
                ))
            })?;
            Self::from_wat(engine, text)
        }
    }

    fn compile(engine: &Engine, source: &[u8], event: &str) -> Result<Self, BridgeError> {
        let start = Instant::now();

        let module = Module::new(engine, source).map_err(|e| {
            BridgeError::compilation_failed(format!("Guest module compilation failed: {e}"))
        })?;

        let content_hash = compute_hash(source);

        info!(
            content_hash = %content_hash,
            duration_ms = start.elapsed().as_millis(),
            "{event}"
        );

        Ok(Self {
            inner: module,
            content_hash,
        })
    }

    /// Get the content hash of the original module source.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Get the inner Wasmtime module.
    pub fn as_module(&self) -> &Module {
        &self.inner
    }

    /// Validate WebAssembly header (magic number).
    fn validate_wasm_header(bytes: &[u8]) -> Result<(), BridgeError> {
        if bytes.len() < 8 {
            return Err(BridgeError::compilation_failed(
                "Invalid Wasm: file too small",
            ));
        }

        // Check magic number: \0asm
        if &bytes[0..4] != b"\0asm" {
            return Err(BridgeError::compilation_failed(
                "Invalid Wasm: bad magic number",
            ));
        }

        Ok(())
    }
}

impl std::fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledModule")
            .field("content_hash", &self.content_hash)
            .finish_non_exhaustive()
    }
}

/// Compute a hash of the given bytes.
fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
