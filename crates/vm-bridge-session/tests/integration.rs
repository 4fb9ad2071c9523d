//! Integration tests for vm-bridge-session.
//!
//! These tests drive a real Wasmtime instance of small WAT guests through
//! the assemble/run lifecycle:
//! - Program placement in guest memory
//! - Packed result decoding and the failure sentinel
//! - FIFO input delivery, output streaming and diagnostics
//! - Traps, fuel exhaustion and misconfigured guests

use vm_bridge_common::{BridgeConfig, BridgeError, EngineConfig, ExecutionConfig};
use vm_bridge_core::{CompiledModule, WasmEngine};
use vm_bridge_host::StatusSource;
use vm_bridge_session::{
    ArtifactDescriptor, AssembleOutcome, RunOutcome, SessionController, encode_program,
};

/// Stand-in assembler/VM guest.
///
/// `assemble` looks at the first program byte:
/// - `!` reports "unknown mnemonic ✗" through `env.err` and fails
/// - `?` fails silently
/// - `#` traps
/// - anything else copies that byte to `out` and succeeds with
///   length = source length, origin = 0x100
///
/// `run` reads one input and reacts to it (999 traps, 1234 spins forever,
/// 77 reports a message, 66 reports an unreadable range), then outputs that
/// input, three more inputs, and its own `ptr`, `len` and `origin`.
const ECHO_GUEST: &str = r#"
    (module
        (import "env" "memory" (memory 1))
        (import "env" "input" (func $input (result i32)))
        (import "env" "output" (func $output (param i32)))
        (import "env" "err" (func $err (param i32 i32)))
        (export "memory" (memory 0))

        (data (i32.const 0) "\ab")
        (data (i32.const 40000) "unknown mnemonic \e2\9c\97")
        (data (i32.const 40100) "seventy-seven")

        (func (export "assemble") (param $src i32) (param $len i32) (param $out i32) (result i32)
            (local $first i32)
            (local.set $first (i32.load8_u (local.get $src)))
            (if (i32.eq (local.get $first) (i32.const 33))
                (then
                    (call $err (i32.const 40000) (i32.const 20))
                    (return (i32.const -1))))
            (if (i32.eq (local.get $first) (i32.const 63))
                (then (return (i32.const -1))))
            (if (i32.eq (local.get $first) (i32.const 35))
                (then (unreachable)))
            (i32.store8 (local.get $out) (local.get $first))
            (i32.or
                (i32.shl (local.get $len) (i32.const 16))
                (i32.const 256)))

        (func (export "run") (param $ptr i32) (param $len i32) (param $org i32)
            (local $v i32)
            (local.set $v (call $input))
            (if (i32.eq (local.get $v) (i32.const 999))
                (then (unreachable)))
            (if (i32.eq (local.get $v) (i32.const 1234))
                (then (loop $spin (br $spin))))
            (if (i32.eq (local.get $v) (i32.const 77))
                (then (call $err (i32.const 40100) (i32.const 13))))
            (if (i32.eq (local.get $v) (i32.const 66))
                (then (call $err (i32.const 65530) (i32.const 100))))
            (call $output (local.get $v))
            (call $output (call $input))
            (call $output (call $input))
            (call $output (call $input))
            (call $output (local.get $ptr))
            (call $output (local.get $len))
            (call $output (local.get $org)))
    )
"#;

fn session_with(config: &BridgeConfig, wat: &str) -> Result<SessionController, BridgeError> {
    let engine = WasmEngine::new(&config.engine)?;
    let module = CompiledModule::from_wat(engine.inner(), wat)?;
    SessionController::new(&engine, &module, &config.execution)
}

fn echo_session() -> SessionController {
    session_with(&BridgeConfig::default(), ECHO_GUEST).unwrap()
}

// ============================================================================
// Test: Assemble
// ============================================================================

#[test]
fn test_assemble_load_without_inputs() {
    let mut session = echo_session();

    let outcome = session.assemble("LOAD 5", "").unwrap();

    let expected = ArtifactDescriptor {
        pointer: 12,
        length: 11,
        origin: 0x100,
    };
    assert_eq!(outcome, AssembleOutcome::Assembled { artifact: expected });
    assert_eq!(session.artifact(), Some(expected));
    assert_eq!(session.pending_inputs(), 0);
    assert_eq!(session.status().as_str(), "Assembled");

    let outcome = session.run().unwrap();
    assert_eq!(outcome, RunOutcome::Halted);
    assert_eq!(session.output().lines(), ["0", "0", "0", "0", "12", "11", "256"]);
}

#[test]
fn test_program_bytes_in_memory() {
    let mut session = echo_session();

    session.assemble("LOAD 5", "").unwrap();

    let encoded = encode_program("LOAD 5");
    assert_eq!(session.read_memory(1, encoded.len()).unwrap(), encoded.as_slice());
    // Offset 0 keeps the guest's own byte
    assert_eq!(session.read_memory(0, 1).unwrap(), &[0xAB]);
    // The guest used the scratch space right after the program
    assert_eq!(session.read_memory(12, 1).unwrap(), b"L");
}

#[test]
fn test_pointer_follows_multibyte_program() {
    let mut session = echo_session();

    let program = "; café\nOUT";
    let outcome = session.assemble(program, "").unwrap();

    let encoded_len = encode_program(program).len();
    assert_eq!(encoded_len, 16);

    let artifact = outcome.artifact().unwrap();
    assert_eq!(artifact.pointer as usize, 1 + encoded_len);
    assert_eq!(artifact.length as usize, encoded_len);
}

#[test]
fn test_empty_program_still_has_terminator() {
    let mut session = echo_session();

    let outcome = session.assemble("", "").unwrap();

    assert!(outcome.is_assembled());
    assert_eq!(session.read_memory(1, 5).unwrap(), b"\nHALT");
    assert_eq!(session.artifact().unwrap().pointer, 6);
}

#[test]
fn test_sentinel_with_guest_message() {
    let mut session = echo_session();

    let outcome = session.assemble("!oops", "1 2").unwrap();

    assert_eq!(
        outcome,
        AssembleOutcome::AssemblyFailed {
            message: "unknown mnemonic ✗".into()
        }
    );
    assert_eq!(session.artifact(), None);
    assert_eq!(session.status().as_str(), "unknown mnemonic ✗");
    assert_eq!(session.status().source(), StatusSource::Guest);
    assert_eq!(session.pending_inputs(), 0);

    let outcome = session.run().unwrap();
    assert_eq!(outcome, RunOutcome::NotAssembled);
    assert_eq!(
        session.status().as_str(),
        "[ERROR]: You must assemble something first"
    );
    assert!(session.output().is_empty());
}

#[test]
fn test_failure_invalidates_previous_artifact() {
    let mut session = echo_session();

    assert!(session.assemble("LOAD 5", "4").unwrap().is_assembled());

    let outcome = session.assemble("?", "").unwrap();
    assert_eq!(
        outcome,
        AssembleOutcome::AssemblyFailed {
            message: "[ERROR]: Assembly failed".into()
        }
    );
    assert_eq!(session.artifact(), None);
    assert_eq!(session.run().unwrap(), RunOutcome::NotAssembled);
}

#[test]
fn test_assemble_trap_is_invocation_fault() {
    let mut session = echo_session();
    session.assemble("LOAD 5", "").unwrap();

    let outcome = session.assemble("# bad", "").unwrap();

    assert!(matches!(outcome, AssembleOutcome::InvocationFault { .. }));
    assert_eq!(session.artifact(), None);
    assert!(session.status().as_str().starts_with("[ERROR]: "));
    assert_eq!(session.status().source(), StatusSource::Host);

    // The same instance keeps working
    assert!(session.assemble("LOAD 5", "").unwrap().is_assembled());
}

#[test]
fn test_program_too_large_is_fatal() {
    let mut session = echo_session();

    assert!(session.assemble("LOAD 5", "").unwrap().is_assembled());
    assert_eq!(session.status().as_str(), "Assembled");

    let program = "A".repeat(70_000);
    let result = session.assemble(&program, "");

    assert!(matches!(result, Err(BridgeError::MemoryTooSmall { .. })));
    assert_eq!(session.artifact(), None);
    assert_eq!(session.status().source(), StatusSource::Host);
    assert!(
        session
            .status()
            .as_str()
            .starts_with("[ERROR]: Program of 70006 bytes does not fit")
    );
}

#[test]
fn test_pointer_past_16_bit_range_is_kept_exact() {
    let config = BridgeConfig {
        execution: ExecutionConfig {
            memory_pages: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut session = session_with(&config, ECHO_GUEST).unwrap();

    let program = "A".repeat(70_000);
    let artifact = session.assemble(&program, "").unwrap().artifact().unwrap();

    assert_eq!(artifact.pointer, 70_006);
    assert!(!artifact.fits_word_address_space());
}

// ============================================================================
// Test: Run
// ============================================================================

#[test]
fn test_inputs_delivered_in_order() {
    let mut session = echo_session();

    session.assemble("LOAD 5", "3 7 2").unwrap();
    assert_eq!(session.pending_inputs(), 3);

    assert_eq!(session.run().unwrap(), RunOutcome::Halted);
    assert_eq!(session.output().lines(), ["3", "7", "2", "0", "12", "11", "256"]);
    assert_eq!(session.output().text(), "3\n7\n2\n0\n12\n11\n256\n");
}

#[test]
fn test_inputs_not_refilled_between_runs() {
    let mut session = echo_session();
    session.assemble("LOAD 5", "3 7 2 9 8").unwrap();

    session.run().unwrap();
    assert_eq!(session.output().lines()[..4], ["3", "7", "2", "9"]);

    session.run().unwrap();
    assert_eq!(session.output().lines()[..4], ["8", "0", "0", "0"]);

    session.run().unwrap();
    assert_eq!(session.output().lines()[..4], ["0", "0", "0", "0"]);
}

#[test]
fn test_reassemble_replaces_inputs() {
    let mut session = echo_session();

    session.assemble("LOAD 5", "1 1 1 1").unwrap();
    session.assemble("LOAD 6", "-1 0x10 2.5").unwrap();

    session.run().unwrap();
    assert_eq!(session.output().lines()[..4], ["65535", "16", "2", "0"]);
}

#[test]
fn test_run_trap_keeps_artifact_and_clears_output() {
    let mut session = echo_session();
    session.assemble("LOAD 5", "5 1 1 1 999").unwrap();

    assert_eq!(session.run().unwrap(), RunOutcome::Halted);
    assert!(!session.output().is_empty());

    // Second run reads 999 first and traps before any output
    let outcome = session.run().unwrap();
    assert!(matches!(outcome, RunOutcome::Trapped { .. }));
    assert!(session.output().is_empty());
    assert!(session.status().as_str().starts_with("[ERROR]: "));
    assert!(session.artifact().is_some());
}

#[test]
fn test_guest_diagnostic_during_run() {
    let mut session = echo_session();
    session.assemble("LOAD 5", "77 1 2 3").unwrap();

    assert_eq!(session.run().unwrap(), RunOutcome::Halted);
    assert_eq!(session.status().as_str(), "seventy-seven");
    assert_eq!(session.output().lines()[..4], ["77", "1", "2", "3"]);
}

#[test]
fn test_unreadable_diagnostic_does_not_trap() {
    let mut session = echo_session();
    session.assemble("LOAD 5", "66").unwrap();

    assert_eq!(session.run().unwrap(), RunOutcome::Halted);
    assert!(
        session
            .status()
            .as_str()
            .starts_with("[ERROR]: Unreadable guest diagnostic")
    );
    assert_eq!(session.status().source(), StatusSource::Host);
    assert_eq!(session.output().lines()[0], "66");
}

#[test]
fn test_run_before_assemble() {
    let mut session = echo_session();

    assert_eq!(session.run().unwrap(), RunOutcome::NotAssembled);
    assert_eq!(
        session.status().as_str(),
        "[ERROR]: You must assemble something first"
    );
}

// ============================================================================
// Test: Fuel
// ============================================================================

#[test]
fn test_fuel_stops_runaway_program() {
    let config = BridgeConfig {
        engine: EngineConfig {
            consume_fuel: true,
            ..Default::default()
        },
        execution: ExecutionConfig {
            max_fuel: 100_000,
            ..Default::default()
        },
    };
    let mut session = session_with(&config, ECHO_GUEST).unwrap();

    session.assemble("LOAD 5", "1234").unwrap();
    assert_eq!(session.run().unwrap(), RunOutcome::FuelExhausted);
    assert_eq!(
        session.status().as_str(),
        "[ERROR]: Fuel exhausted: CPU limit exceeded"
    );

    // Each call is refuelled
    session.assemble("LOAD 5", "5").unwrap();
    assert_eq!(session.run().unwrap(), RunOutcome::Halted);
}

// ============================================================================
// Test: Guest Wiring
// ============================================================================

#[test]
fn test_guest_with_own_memory() {
    let wat = r#"
        (module
            (import "env" "err" (func $err (param i32 i32)))
            (memory (export "memory") 2)
            (data (i32.const 70000) "from page two")
            (func (export "assemble") (param i32 i32 i32) (result i32)
                (call $err (i32.const 70000) (i32.const 13))
                (i32.const -1))
            (func (export "run") (param i32 i32 i32))
        )
    "#;
    let mut session = session_with(&BridgeConfig::default(), wat).unwrap();

    let outcome = session.assemble("LOAD 5", "").unwrap();

    assert!(!outcome.is_assembled());
    assert_eq!(session.status().as_str(), "from page two");
}

#[test]
fn test_guest_with_imported_memory_only() {
    let wat = r#"
        (module
            (import "env" "memory" (memory 1))
            (import "env" "err" (func $err (param i32 i32)))
            (data (i32.const 30000) "imported")
            (func (export "assemble") (param i32 i32 i32) (result i32)
                (call $err (i32.const 30000) (i32.const 8))
                (i32.const -1))
            (func (export "run") (param i32 i32 i32))
        )
    "#;
    let mut session = session_with(&BridgeConfig::default(), wat).unwrap();

    session.assemble("LOAD 5", "").unwrap();

    assert_eq!(session.status().as_str(), "imported");
    assert_eq!(session.read_memory(1, 6).unwrap(), b"LOAD 5");
}

#[test]
fn test_guest_without_memory() {
    let wat = r#"
        (module
            (func (export "assemble") (param i32 i32 i32) (result i32) (i32.const 0))
            (func (export "run") (param i32 i32 i32))
        )
    "#;

    let result = session_with(&BridgeConfig::default(), wat);
    assert!(matches!(result, Err(BridgeError::MissingExport { name }) if name == "memory"));
}

#[test]
fn test_guest_without_run() {
    let wat = r#"
        (module
            (memory (export "memory") 1)
            (func (export "assemble") (param i32 i32 i32) (result i32) (i32.const 0))
        )
    "#;

    let result = session_with(&BridgeConfig::default(), wat);
    assert!(matches!(result, Err(BridgeError::MissingExport { name }) if name == "run"));
}

#[test]
fn test_guest_memory_requirement() {
    let wat = r#"
        (module
            (import "env" "memory" (memory 2))
            (func (export "assemble") (param i32 i32 i32) (result i32) (i32.const 0))
            (func (export "run") (param i32 i32 i32))
        )
    "#;

    let result = session_with(&BridgeConfig::default(), wat);
    assert!(matches!(result, Err(BridgeError::InstantiationFailed { .. })));

    let config = BridgeConfig {
        execution: ExecutionConfig {
            memory_pages: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(session_with(&config, wat).is_ok());
}
