//! Bit operations on integers
//!
//! Shift and rotate counts are taken modulo the bit width of the operand
//! type, so no shift amount is ever out of range.

use super::{Stack, Trap, Value};
use crate::module::instruction::BitwiseOp;

pub fn execute(op: BitwiseOp, stack: &mut Stack) -> Result<(), Trap> {
    use BitwiseOp::*;
    match op {
        I32And => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(Value::I32(c1 & c2));
        }
        I32Or => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(Value::I32(c1 | c2));
        }
        I32Xor => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(Value::I32(c1 ^ c2));
        }
        I32Shl => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(Value::I32(c1.wrapping_shl(c2 as u32)));
        }
        I32ShrS => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(Value::I32(c1.wrapping_shr(c2 as u32)));
        }
        I32ShrU => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()? as u32;
            stack.push(Value::I32(c1.wrapping_shr(c2 as u32) as i32));
        }
        I32Rotl => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(Value::I32(c1.rotate_left(c2 as u32 % 32)));
        }
        I32Rotr => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(Value::I32(c1.rotate_right(c2 as u32 % 32)));
        }

        I64And => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(Value::I64(c1 & c2));
        }
        I64Or => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(Value::I64(c1 | c2));
        }
        I64Xor => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(Value::I64(c1 ^ c2));
        }
        I64Shl => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(Value::I64(c1.wrapping_shl(c2 as u32)));
        }
        I64ShrS => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(Value::I64(c1.wrapping_shr(c2 as u32)));
        }
        I64ShrU => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()? as u64;
            stack.push(Value::I64(c1.wrapping_shr(c2 as u32) as i64));
        }
        I64Rotl => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(Value::I64(c1.rotate_left((c2 % 64) as u32)));
        }
        I64Rotr => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(Value::I64(c1.rotate_right((c2 % 64) as u32)));
        }
    }
    Ok(())
}
