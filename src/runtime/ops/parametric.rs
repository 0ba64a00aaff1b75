//! Operand-stack manipulation

use super::{Stack, Trap};
use crate::module::instruction::ParametricOp;

pub fn execute(op: ParametricOp, stack: &mut Stack) -> Result<(), Trap> {
    match op {
        ParametricOp::Drop => {
            stack.pop()?;
        }
        // select: pick the first operand when the condition is non-zero
        ParametricOp::Select => {
            let cond = stack.pop_i32()?;
            let val2 = stack.pop()?;
            let val1 = stack.pop()?;
            stack.push(if cond != 0 { val1 } else { val2 });
        }
    }
    Ok(())
}
