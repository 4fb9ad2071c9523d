//! Wasmtime embedding for the vm-bridge guest module.
//!
//! This crate provides the host/guest execution plumbing:
//! - [`WasmEngine`]: Configured Wasmtime engine
//! - [`CompiledModule`]: Compiled guest module wrapper
//! - [`InstanceRunner`] / [`GuestInstance`]: One-time instantiation and the
//!   `assemble` / `run` entry points
//! - [`LinearMemory`]: Bounds-checked access to the guest's memory
//! - [`GuestCallbacks`]: The state the import callbacks forward to
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     WasmEngine                          │
//! │  (Created once per process)                             │
//! │  - Compilation settings                                 │
//! │  - Optional fuel metering                               │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                   CompiledModule                        │
//! │  - Assembler + VM guest, exports assemble / run         │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │              Store<T> + GuestInstance                   │
//! │  (Instantiated once, reused for every call)             │
//! │  - Linear memory (program bytes, artifact, messages)    │
//! │  - Import callbacks: input / output / err               │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod callbacks;
pub mod engine;
pub mod instance;
pub mod memory;
pub mod module;
pub mod store;

pub use callbacks::GuestCallbacks;
pub use engine::WasmEngine;
pub use instance::{ExecutionResult, GuestInstance, InstanceRunner};
pub use memory::LinearMemory;
pub use module::CompiledModule;
