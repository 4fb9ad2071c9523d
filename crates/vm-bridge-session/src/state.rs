//! Session state owned by the guest store.
//!
//! [`SessionState`] is the store data of the single guest instance. The
//! import callbacks reach it through [`GuestCallbacks`]; the controller
//! drives it through the named lifecycle operations below. Nothing else
//! mutates it.

use wasmtime::Memory;

use vm_bridge_core::GuestCallbacks;
use vm_bridge_host::diagnostics::{ASSEMBLED, ASSEMBLY_FAILED, NOT_ASSEMBLED};
use vm_bridge_host::{InputQueue, OutputLog, StatusMessage};

use crate::artifact::ArtifactDescriptor;

/// Descriptor, input queue, output log and status of one session.
#[derive(Debug, Default)]
pub struct SessionState {
    artifact: Option<ArtifactDescriptor>,
    inputs: InputQueue,
    output: OutputLog,
    status: StatusMessage,
    /// Set when the guest calls `env.err` during the current guest call.
    diagnostic_reported: bool,
    memory: Option<Memory>,
}

impl SessionState {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the memory `env.err` ranges are read from.
    pub fn attach_memory(&mut self, memory: Memory) {
        self.memory = Some(memory);
    }

    /// Start an assemble call: any previous artifact is invalidated.
    pub fn begin_assemble(&mut self) {
        self.clear_artifact();
        self.diagnostic_reported = false;
    }

    /// Store a freshly assembled artifact and the inputs it will run with.
    pub fn accept_artifact(&mut self, artifact: ArtifactDescriptor, inputs: InputQueue) {
        self.artifact = Some(artifact);
        self.inputs = inputs;
        self.status.notice(ASSEMBLED);
    }

    /// Drop the artifact descriptor.
    pub fn clear_artifact(&mut self) {
        self.artifact = None;
    }

    /// Handle the failure sentinel.
    ///
    /// A message the guest reported during this call stays visible;
    /// otherwise a generic failure is shown.
    pub fn reject_artifact(&mut self) {
        self.clear_artifact();
        if !self.diagnostic_reported {
            self.status.host_error(ASSEMBLY_FAILED);
        }
    }

    /// Handle a fault raised while calling `assemble`.
    pub fn fault_artifact(&mut self, detail: &str) {
        self.clear_artifact();
        self.status.host_error(detail);
    }

    /// Start a run: the output log is cleared and the artifact to run, if
    /// any, is returned. Without one the precondition message is shown.
    pub fn begin_run(&mut self) -> Option<ArtifactDescriptor> {
        self.output.clear();
        self.diagnostic_reported = false;

        if self.artifact.is_none() {
            self.status.host_error(NOT_ASSEMBLED);
        }
        self.artifact
    }

    /// Record a fault raised while calling `run`.
    pub fn fault_run(&mut self, detail: &str) {
        self.status.host_error(detail);
    }

    /// The current artifact descriptor.
    pub fn artifact(&self) -> Option<ArtifactDescriptor> {
        self.artifact
    }

    /// Inputs not yet consumed by the guest.
    pub fn inputs(&self) -> &InputQueue {
        &self.inputs
    }

    /// Output of the current or most recent run.
    pub fn output(&self) -> &OutputLog {
        &self.output
    }

    /// The current status message.
    pub fn status(&self) -> &StatusMessage {
        &self.status
    }

    /// Returns `true` if the guest called `env.err` during the current call.
    pub fn diagnostic_reported(&self) -> bool {
        self.diagnostic_reported
    }
}

impl GuestCallbacks for SessionState {
    fn next_input(&mut self) -> u16 {
        self.inputs.next_input()
    }

    fn emit_output(&mut self, value: i32) {
        self.output.emit(value);
    }

    fn report_error(&mut self, message: String) {
        self.diagnostic_reported = true;
        self.status.guest(message);
    }

    fn report_host_error(&mut self, detail: String) {
        self.diagnostic_reported = true;
        self.status.host_error(detail);
    }

    fn guest_memory(&self) -> Option<Memory> {
        self.memory
    }
}
