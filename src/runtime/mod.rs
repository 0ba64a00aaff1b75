//! WebAssembly execution engine
//!
//! This module contains the runtime half of the system: the store that owns
//! all allocated instances, the translator that flattens structured control
//! flow into jump-resolved instruction sequences, the stack machine that
//! executes them, and the orchestrating [`Runtime`] that embedders talk to.

pub mod control;
pub mod executor;
pub mod frame;
pub mod imports;
pub mod instance;
pub mod iseq;
pub mod memory;
pub mod ops;
pub mod runtime;
pub mod stack;
pub mod store;
pub mod table;
pub mod translate;
pub mod value;

pub use imports::ImportObject;
pub use instance::{ExternalValue, ModuleInstance};
pub use runtime::{Caller, EngineConfig, Interceptor, Runtime};
pub use store::{FuncAddr, GlobalAddr, MemAddr, ModuleAddr, Store, TableAddr};
pub use translate::TranslationError;
pub use value::Value;

use crate::module::ValueType;

/// A runtime fault that aborts the current invocation.
///
/// Traps leave the Store as it was at the point of trapping: effects of
/// instructions that completed before the trap remain applied, and nothing
/// is rolled back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Trap {
    #[error("unreachable instruction executed")]
    Unreachable,
    #[error("integer divide by zero")]
    IntegerDivideByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("invalid conversion to integer")]
    InvalidConversionToInteger,
    #[error("out of bounds memory access")]
    OutOfBoundsMemoryAccess,
    #[error("out of bounds table access")]
    OutOfBoundsTableAccess,
    #[error("undefined element")]
    UndefinedElement,
    #[error("indirect call type mismatch")]
    IndirectCallTypeMismatch,
    #[error("call stack exhausted")]
    CallStackExhausted,
    /// Raised by a host function implementation
    #[error("host error: {0}")]
    Host(String),
    /// Defensive abort on a state the validator is assumed to prevent.
    /// Not part of the recoverable taxonomy; indicates a bug in the
    /// decoder, the validator, or this engine.
    #[error("inconsistent engine state: {0}")]
    Internal(&'static str),
}

/// A failure of [`Runtime::instantiate`]. No module instance escapes when
/// instantiation fails, though side effects on the Store from segments
/// applied before the failure remain observable.
#[derive(Debug, thiserror::Error)]
pub enum InstantiationError {
    #[error("imports do not match the module's declared imports")]
    ImportsMismatch,
    #[error("unresolved import {module}.{name}")]
    UnknownImport { module: String, name: String },
    #[error("element segment does not fit table")]
    OutOfBoundsTableAccess,
    #[error("data segment does not fit memory")]
    OutOfBoundsMemoryAccess,
    #[error("constant expression trapped: {0}")]
    ConstExpression(#[source] Trap),
    #[error("start function trapped: {0}")]
    Start(#[source] Trap),
    #[error(transparent)]
    Translation(#[from] TranslationError),
    /// Internal-class faults (dangling addresses, malformed structure the
    /// validator is assumed to prevent)
    #[error(transparent)]
    Trap(#[from] Trap),
}

/// A failure of the embedder-facing invoke/get_global surface.
///
/// Argument and lookup problems are caller errors, kept apart from traps
/// raised by the executing module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvocationError {
    #[error("unknown export: {0}")]
    UnknownExport(String),
    #[error("export {name} is a {actual}, not a {expected}")]
    ExportKindMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("expected {expected} arguments, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
    #[error("argument {index} has type {actual:?}, expected {expected:?}")]
    ArgumentTypeMismatch {
        index: usize,
        expected: ValueType,
        actual: ValueType,
    },
    #[error(transparent)]
    Trap(#[from] Trap),
}
