//! The host side of the guest's import surface.
//!
//! The guest module imports `env.input`, `env.output` and `env.err`. Their
//! host implementations are registered once on the linker and forward to
//! the store's data through [`GuestCallbacks`], so the state they mutate is
//! always the state owned by the store driving the current guest call.

use wasmtime::Memory;

/// State that answers the guest's import calls.
///
/// All methods run synchronously on the thread that called into the guest,
/// in whatever order the guest issues them.
pub trait GuestCallbacks {
    /// Answer `env.input`: the next pending input value, or 0 if none remain.
    fn next_input(&mut self) -> u16;

    /// Answer `env.output`: record one value written by the guest.
    fn emit_output(&mut self, value: i32);

    /// Answer `env.err` once the host has decoded the guest's message.
    fn report_error(&mut self, message: String);

    /// Answer an `env.err` call whose range could not be read. `detail`
    /// describes the host-side failure; the guest is not trapped.
    fn report_host_error(&mut self, detail: String);

    /// Memory to read `env.err` ranges from when the guest does not export
    /// its own memory.
    fn guest_memory(&self) -> Option<Memory>;
}
