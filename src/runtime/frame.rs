//! Call frames
//!
//! One frame is pushed per WebAssembly function invocation. Host calls run
//! in place and never get a frame.

use super::iseq::InstructionSequence;
use super::store::{FuncAddr, ModuleAddr};
use super::{Trap, Value};

/// The activation record of one function call
#[derive(Debug, Clone)]
pub struct Frame {
    /// Arguments followed by declared locals (zero-initialised)
    pub locals: Vec<Value>,
    /// The instance whose index spaces this function resolves against
    pub module: ModuleAddr,
    /// The invoked function, for introspection; absent for constant
    /// expression evaluation
    pub function: Option<FuncAddr>,
    /// Where execution resumes when this frame returns
    pub return_iseq: InstructionSequence,
    pub return_pc: usize,
    /// Number of result values
    pub arity: usize,
    /// Value-stack height at entry
    pub height: usize,
    /// Label-stack depth at entry
    pub label_base: usize,
}

impl Frame {
    pub fn local(&self, local_idx: u32) -> Result<Value, Trap> {
        self.locals
            .get(local_idx as usize)
            .copied()
            .ok_or(Trap::Internal("local index out of bounds"))
    }

    pub fn set_local(&mut self, local_idx: u32, value: Value) -> Result<(), Trap> {
        let slot = self
            .locals
            .get_mut(local_idx as usize)
            .ok_or(Trap::Internal("local index out of bounds"))?;
        *slot = value;
        Ok(())
    }
}
