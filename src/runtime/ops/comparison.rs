//! Tests and relational comparisons
//!
//! All comparisons produce an i32 that is 1 or 0. Float comparisons are
//! IEEE-754: any comparison with a NaN operand is false except `ne`,
//! which is true.

use super::{Stack, Trap, Value};
use crate::module::instruction::ComparisonOp;

fn bool_val(b: bool) -> Value {
    Value::I32(b as i32)
}

pub fn execute(op: ComparisonOp, stack: &mut Stack) -> Result<(), Trap> {
    use ComparisonOp::*;
    match op {
        I32Eqz => {
            let c = stack.pop_i32()?;
            stack.push(bool_val(c == 0));
        }
        I32Eq => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(bool_val(c1 == c2));
        }
        I32Ne => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(bool_val(c1 != c2));
        }
        I32LtS => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(bool_val(c1 < c2));
        }
        I32LtU => {
            let c2 = stack.pop_i32()? as u32;
            let c1 = stack.pop_i32()? as u32;
            stack.push(bool_val(c1 < c2));
        }
        I32GtS => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(bool_val(c1 > c2));
        }
        I32GtU => {
            let c2 = stack.pop_i32()? as u32;
            let c1 = stack.pop_i32()? as u32;
            stack.push(bool_val(c1 > c2));
        }
        I32LeS => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(bool_val(c1 <= c2));
        }
        I32LeU => {
            let c2 = stack.pop_i32()? as u32;
            let c1 = stack.pop_i32()? as u32;
            stack.push(bool_val(c1 <= c2));
        }
        I32GeS => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(bool_val(c1 >= c2));
        }
        I32GeU => {
            let c2 = stack.pop_i32()? as u32;
            let c1 = stack.pop_i32()? as u32;
            stack.push(bool_val(c1 >= c2));
        }

        I64Eqz => {
            let c = stack.pop_i64()?;
            stack.push(bool_val(c == 0));
        }
        I64Eq => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(bool_val(c1 == c2));
        }
        I64Ne => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(bool_val(c1 != c2));
        }
        I64LtS => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(bool_val(c1 < c2));
        }
        I64LtU => {
            let c2 = stack.pop_i64()? as u64;
            let c1 = stack.pop_i64()? as u64;
            stack.push(bool_val(c1 < c2));
        }
        I64GtS => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(bool_val(c1 > c2));
        }
        I64GtU => {
            let c2 = stack.pop_i64()? as u64;
            let c1 = stack.pop_i64()? as u64;
            stack.push(bool_val(c1 > c2));
        }
        I64LeS => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(bool_val(c1 <= c2));
        }
        I64LeU => {
            let c2 = stack.pop_i64()? as u64;
            let c1 = stack.pop_i64()? as u64;
            stack.push(bool_val(c1 <= c2));
        }
        I64GeS => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(bool_val(c1 >= c2));
        }
        I64GeU => {
            let c2 = stack.pop_i64()? as u64;
            let c1 = stack.pop_i64()? as u64;
            stack.push(bool_val(c1 >= c2));
        }

        F32Eq => {
            let c2 = stack.pop_f32()?;
            let c1 = stack.pop_f32()?;
            stack.push(bool_val(c1 == c2));
        }
        F32Ne => {
            let c2 = stack.pop_f32()?;
            let c1 = stack.pop_f32()?;
            stack.push(bool_val(c1 != c2));
        }
        F32Lt => {
            let c2 = stack.pop_f32()?;
            let c1 = stack.pop_f32()?;
            stack.push(bool_val(c1 < c2));
        }
        F32Gt => {
            let c2 = stack.pop_f32()?;
            let c1 = stack.pop_f32()?;
            stack.push(bool_val(c1 > c2));
        }
        F32Le => {
            let c2 = stack.pop_f32()?;
            let c1 = stack.pop_f32()?;
            stack.push(bool_val(c1 <= c2));
        }
        F32Ge => {
            let c2 = stack.pop_f32()?;
            let c1 = stack.pop_f32()?;
            stack.push(bool_val(c1 >= c2));
        }

        F64Eq => {
            let c2 = stack.pop_f64()?;
            let c1 = stack.pop_f64()?;
            stack.push(bool_val(c1 == c2));
        }
        F64Ne => {
            let c2 = stack.pop_f64()?;
            let c1 = stack.pop_f64()?;
            stack.push(bool_val(c1 != c2));
        }
        F64Lt => {
            let c2 = stack.pop_f64()?;
            let c1 = stack.pop_f64()?;
            stack.push(bool_val(c1 < c2));
        }
        F64Gt => {
            let c2 = stack.pop_f64()?;
            let c1 = stack.pop_f64()?;
            stack.push(bool_val(c1 > c2));
        }
        F64Le => {
            let c2 = stack.pop_f64()?;
            let c1 = stack.pop_f64()?;
            stack.push(bool_val(c1 <= c2));
        }
        F64Ge => {
            let c2 = stack.pop_f64()?;
            let c1 = stack.pop_f64()?;
            stack.push(bool_val(c1 >= c2));
        }
    }
    Ok(())
}
