//! Assemble/run lifecycle of the single guest instance.
//!
//! [`SessionController`] owns the store, and with it the guest instance and
//! the [`SessionState`]. It is created once and then driven by two actions:
//!
//! 1. [`SessionController::assemble`]: encode the program into guest memory,
//!    call `assemble`, and keep the artifact descriptor on success
//! 2. [`SessionController::run`]: call `run` on the kept descriptor, or
//!    refuse when there is none

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use wasmtime::Store;

use vm_bridge_common::{BridgeError, ExecutionConfig};
use vm_bridge_core::store::{create_store, refuel};
use vm_bridge_core::{CompiledModule, ExecutionResult, GuestInstance, InstanceRunner, WasmEngine};
use vm_bridge_host::{InputQueue, OutputLog, StatusMessage, register_all};

use crate::artifact::{ArtifactDescriptor, PackedResult};
use crate::encoder::{encode_program, write_program};
use crate::state::SessionState;

/// Result of an assemble action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssembleOutcome {
    /// The guest accepted the program.
    Assembled {
        /// Descriptor now held by the session.
        artifact: ArtifactDescriptor,
    },

    /// The guest returned the failure sentinel.
    AssemblyFailed {
        /// Status message shown for the failure.
        message: String,
    },

    /// The guest trapped or ran out of fuel while assembling.
    InvocationFault {
        /// Description of the fault.
        message: String,
    },
}

impl AssembleOutcome {
    /// Returns `true` if an artifact was produced.
    pub fn is_assembled(&self) -> bool {
        matches!(self, Self::Assembled { .. })
    }

    /// The produced artifact, if any.
    pub fn artifact(&self) -> Option<ArtifactDescriptor> {
        match self {
            Self::Assembled { artifact } => Some(*artifact),
            _ => None,
        }
    }
}

/// Result of a run action.
///
/// The guest itself does not distinguish a normal halt from an error; a
/// program that reports a problem through `env.err` and then returns still
/// yields [`RunOutcome::Halted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// `run` returned.
    Halted,

    /// `run` trapped.
    Trapped {
        /// Description of the trap.
        message: String,
    },

    /// `run` was stopped by the fuel limit.
    FuelExhausted,

    /// No artifact was assembled; the guest was not called.
    NotAssembled,
}

impl RunOutcome {
    /// Returns `true` if the guest was called and returned normally.
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted)
    }
}

/// Drives the assemble/run lifecycle against one guest instance.
pub struct SessionController {
    store: Store<SessionState>,
    guest: GuestInstance,
    fuel: Option<u64>,
}

impl SessionController {
    /// Wire the imports and instantiate the guest.
    ///
    /// The instance created here is used for every later call.
    ///
    /// # Errors
    ///
    /// Returns an error if the imports cannot be registered or the guest
    /// cannot be instantiated.
    #[instrument(skip_all, fields(content_hash = %module.content_hash()))]
    pub fn new(
        engine: &WasmEngine,
        module: &CompiledModule,
        execution: &ExecutionConfig,
    ) -> Result<Self, BridgeError> {
        let mut store = create_store(engine, execution, SessionState::new())?;

        let mut runner = InstanceRunner::new(engine);
        register_all(runner.linker_mut())?;
        runner.provide_memory(&mut store, execution.memory_pages)?;

        let guest = runner.instantiate(&mut store, module)?;
        store.data_mut().attach_memory(guest.memory().handle());

        info!("Session ready");

        Ok(Self {
            store,
            guest,
            fuel: execution.fuel_budget(engine.config()),
        })
    }

    /// Assemble `program`, queueing `input` for later runs on success.
    ///
    /// Any previously held artifact is invalidated first, so after a failed
    /// call no run is possible until the next successful one.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal conditions: the program does not fit
    /// in guest memory, or fuel cannot be set. The status message shows the
    /// error in both cases. Rejections and guest traps are reported through
    /// [`AssembleOutcome`] and the status message.
    #[instrument(skip_all, fields(program_len = program.len()))]
    pub fn assemble(&mut self, program: &str, input: &str) -> Result<AssembleOutcome, BridgeError> {
        self.store.data_mut().begin_assemble();

        let encoded = encode_program(program);
        let layout = match write_program(self.guest.memory(), &mut self.store, &encoded) {
            Ok(layout) => layout,
            Err(e) => {
                self.store.data_mut().fault_artifact(&e.to_string());
                return Err(e);
            }
        };

        debug!(
            source_len = layout.source_len,
            output_ptr = layout.output_ptr,
            "Program written to guest memory"
        );

        refuel(&mut self.store, self.fuel)?;

        let result = self.guest.assemble(
            &mut self.store,
            layout.source_ptr,
            layout.source_len,
            layout.output_ptr,
        );

        let state = self.store.data_mut();

        let outcome = match result {
            ExecutionResult::Success(word) => {
                match PackedResult::decode(word).into_descriptor(layout.output_ptr) {
                    Some(artifact) => {
                        if !artifact.fits_word_address_space() {
                            warn!(
                                pointer = artifact.pointer,
                                "Artifact pointer lies beyond the 16-bit address space"
                            );
                        }
                        info!(
                            packed = word,
                            length = artifact.length,
                            origin = artifact.origin,
                            "Program assembled"
                        );
                        state.accept_artifact(artifact, InputQueue::from_text(input));
                        AssembleOutcome::Assembled { artifact }
                    }
                    None => {
                        info!("Guest rejected program");
                        state.reject_artifact();
                        AssembleOutcome::AssemblyFailed {
                            message: state.status().to_string(),
                        }
                    }
                }
            }
            fault => {
                let message = fault.fault_message().unwrap_or_default();
                state.fault_artifact(&message);
                AssembleOutcome::InvocationFault { message }
            }
        };

        Ok(outcome)
    }

    /// Run the assembled artifact.
    ///
    /// The output log is cleared first. Without an artifact the guest is
    /// not called and the precondition message is shown. The artifact and
    /// remaining inputs are kept, so the program can be run again.
    ///
    /// # Errors
    ///
    /// Returns an error only if fuel cannot be set on the store.
    #[instrument(skip_all)]
    pub fn run(&mut self) -> Result<RunOutcome, BridgeError> {
        let Some(artifact) = self.store.data_mut().begin_run() else {
            warn!("Run requested before a successful assemble");
            return Ok(RunOutcome::NotAssembled);
        };

        refuel(&mut self.store, self.fuel)?;

        let result = self.guest.run(
            &mut self.store,
            artifact.pointer,
            artifact.length,
            artifact.origin,
        );

        let state = self.store.data_mut();

        let outcome = match result {
            ExecutionResult::Success(()) => RunOutcome::Halted,
            ExecutionResult::Trap { message, .. } => {
                state.fault_run(&message);
                RunOutcome::Trapped { message }
            }
            ExecutionResult::FuelExhausted => {
                state.fault_run(&BridgeError::FuelExhausted.to_string());
                RunOutcome::FuelExhausted
            }
        };

        info!(lines = state.output().lines().len(), "Run finished");

        Ok(outcome)
    }

    /// The current artifact descriptor.
    pub fn artifact(&self) -> Option<ArtifactDescriptor> {
        self.store.data().artifact()
    }

    /// Output of the current or most recent run.
    pub fn output(&self) -> &OutputLog {
        self.store.data().output()
    }

    /// The current status message.
    pub fn status(&self) -> &StatusMessage {
        self.store.data().status()
    }

    /// Number of queued inputs not yet consumed.
    pub fn pending_inputs(&self) -> usize {
        self.store.data().inputs().len()
    }

    /// Bounds-checked view of guest memory.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::OutOfBounds`] if the range is not inside memory.
    pub fn read_memory(&self, offset: usize, len: usize) -> Result<&[u8], BridgeError> {
        self.guest.memory().read(&self.store, offset, len)
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("artifact", &self.artifact())
            .field("fuel", &self.fuel)
            .finish_non_exhaustive()
    }
}
