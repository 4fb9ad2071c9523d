//! Assemble/run session controller for vm-bridge.
//!
//! This crate ties the guest invoker and the import callbacks into one
//! session: program text goes into guest memory, `assemble` reports where
//! the artifact is, and `run` executes it while streaming inputs in and
//! output and diagnostics out.
//!
//! # Quick Start
//!
//! ```ignore
//! use vm_bridge_common::BridgeConfig;
//! use vm_bridge_core::{CompiledModule, WasmEngine};
//! use vm_bridge_session::SessionController;
//!
//! let config = BridgeConfig::default();
//! let engine = WasmEngine::new(&config.engine)?;
//! let module = CompiledModule::from_file(engine.inner(), "www/main.wasm")?;
//! let mut session = SessionController::new(&engine, &module, &config.execution)?;
//!
//! session.assemble("LOAD 5", "3 7 2")?;
//! session.run()?;
//! print!("{}", session.output().text());
//! ```

pub mod artifact;
pub mod controller;
pub mod encoder;
pub mod state;

pub use artifact::{ArtifactDescriptor, FAILURE_SENTINEL, PackedResult};
pub use controller::{AssembleOutcome, RunOutcome, SessionController};
pub use encoder::{PROGRAM_OFFSET, TERMINATOR, encode_program};
pub use state::SessionState;
