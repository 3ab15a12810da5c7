use thiserror::Error;

use crate::program::Signature;

/// Terminal failure of a single invocation.
///
/// The first four variants are ABI traps: they follow from the compiled unit
/// and the helper table alone and are never retryable. `Fault` carries a
/// failure reported by the execution environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrapKind {
    #[error("compiled unit has no entry point")]
    NoEntryPoint,
    #[error("entry point expects {expected} arguments, got {got}")]
    ArityMismatch { expected: u8, got: usize },
    #[error("unknown helper {id:#x}")]
    UnknownHelper { id: u32 },
    #[error("helper {id:#x} declared as {declared}, registered as {registered}")]
    SignatureMismatch {
        id: u32,
        declared: Signature,
        registered: Signature,
    },
    #[error("execution fault: {0}")]
    Fault(#[from] RuntimeError),
}

/// Failures raised by the execution environment while running code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("invalid opcode {opcode:#04x} at pc {pc}")]
    InvalidOpcode { opcode: u8, pc: usize },
    #[error("invalid register r{reg} at pc {pc}")]
    InvalidRegister { reg: u8, pc: usize },
    #[error("division by zero at pc {pc}")]
    DivisionByZero { pc: usize },
    #[error("memory access of {len} bytes at {addr:#x} is out of bounds")]
    OutOfBounds { addr: u64, len: usize },
    #[error("step limit of {0} instructions exceeded")]
    StepLimitExceeded(u64),
    #[error("program counter {0} outside of code")]
    PcOutOfRange(usize),
    #[error("call at pc {pc} targets a program function, only helper calls are supported")]
    UnsupportedCall { pc: usize },
    #[error("helper {id:#x} failed: {reason}")]
    HelperFailed { id: u32, reason: String },
    #[error("invalid invocation transition: {0}")]
    InvalidTransition(String),
    #[error("context memory of {got} bytes exceeds limit of {max}")]
    ContextTooLarge { got: usize, max: usize },
}

/// Errors while constructing a compiled unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("arity {0} exceeds the five argument registers")]
    InvalidArity(u8),
    #[error("helper {id:#x} is declared twice with different signatures")]
    ConflictingImport { id: u32 },
    #[error("no well-known helper named `{0}`")]
    UnknownWellKnown(String),
    #[error("function `{name}` has {len} instruction slots, limit is {max}")]
    CodeTooLarge { name: String, len: usize, max: usize },
}

/// Errors while registering host routines in a helper table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("helper id {0} is reserved")]
    Reserved(u32),
    #[error("no host routine named `{0}`")]
    UnknownRoutine(String),
}
