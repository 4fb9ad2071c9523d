//! Guest import callbacks for vm-bridge.
//!
//! This crate provides the host-side implementations of the functions the
//! guest module imports from `env`, plus the state they feed.
//!
//! # Interfaces
//!
//! - [`input`]: FIFO of 16-bit values answered to `env.input`
//! - [`output`]: Log of values written through `env.output`
//! - [`diagnostics`]: Status message and decoding of `env.err` ranges
//! - [`linker`]: Registration of the imports on a Wasmtime linker
//!
//! # Call Model
//!
//! All imports run synchronously on the thread that called into the guest.
//! None of them can fail the guest: a bad `env.err` range becomes a host
//! error status instead of a trap.

pub mod diagnostics;
pub mod input;
pub mod linker;
pub mod output;

pub use diagnostics::{StatusMessage, StatusSource, decode_message};
pub use input::{InputQueue, parse_token};
pub use linker::register_all;
pub use output::OutputLog;
