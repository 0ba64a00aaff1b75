//! Constants and arithmetic
//!
//! Integer arithmetic is two's-complement with wraparound; the division
//! family is the only place it traps (divide by zero, and the most
//! negative value divided by -1). Float arithmetic follows IEEE-754 with
//! the usual WebAssembly refinements for min/max zero and NaN handling;
//! NaN payloads are whatever the host produces.

use super::{Stack, Trap, Value};
use crate::module::instruction::NumericOp;

pub fn execute(op: NumericOp, stack: &mut Stack) -> Result<(), Trap> {
    use NumericOp::*;
    match op {
        I32Const(v) => stack.push(Value::I32(v)),
        I64Const(v) => stack.push(Value::I64(v)),
        F32Const(v) => stack.push(Value::F32(v)),
        F64Const(v) => stack.push(Value::F64(v)),

        I32Add => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(Value::I32(c1.wrapping_add(c2)));
        }
        I32Sub => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(Value::I32(c1.wrapping_sub(c2)));
        }
        I32Mul => {
            let c2 = stack.pop_i32()?;
            let c1 = stack.pop_i32()?;
            stack.push(Value::I32(c1.wrapping_mul(c2)));
        }
        I32DivS => i32_div_s(stack)?,
        I32DivU => i32_div_u(stack)?,
        I32RemS => i32_rem_s(stack)?,
        I32RemU => i32_rem_u(stack)?,
        I32Clz => {
            let c = stack.pop_i32()?;
            stack.push(Value::I32(c.leading_zeros() as i32));
        }
        I32Ctz => {
            let c = stack.pop_i32()?;
            stack.push(Value::I32(c.trailing_zeros() as i32));
        }
        I32Popcnt => {
            let c = stack.pop_i32()?;
            stack.push(Value::I32(c.count_ones() as i32));
        }

        I64Add => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(Value::I64(c1.wrapping_add(c2)));
        }
        I64Sub => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(Value::I64(c1.wrapping_sub(c2)));
        }
        I64Mul => {
            let c2 = stack.pop_i64()?;
            let c1 = stack.pop_i64()?;
            stack.push(Value::I64(c1.wrapping_mul(c2)));
        }
        I64DivS => i64_div_s(stack)?,
        I64DivU => i64_div_u(stack)?,
        I64RemS => i64_rem_s(stack)?,
        I64RemU => i64_rem_u(stack)?,
        I64Clz => {
            let c = stack.pop_i64()?;
            stack.push(Value::I64(c.leading_zeros() as i64));
        }
        I64Ctz => {
            let c = stack.pop_i64()?;
            stack.push(Value::I64(c.trailing_zeros() as i64));
        }
        I64Popcnt => {
            let c = stack.pop_i64()?;
            stack.push(Value::I64(c.count_ones() as i64));
        }

        F32Abs => {
            let c = stack.pop_f32()?;
            stack.push(Value::F32(c.abs()));
        }
        F32Neg => {
            let c = stack.pop_f32()?;
            stack.push(Value::F32(-c));
        }
        F32Sqrt => {
            let c = stack.pop_f32()?;
            stack.push(Value::F32(c.sqrt()));
        }
        F32Ceil => {
            let c = stack.pop_f32()?;
            stack.push(Value::F32(c.ceil()));
        }
        F32Floor => {
            let c = stack.pop_f32()?;
            stack.push(Value::F32(c.floor()));
        }
        F32Trunc => {
            let c = stack.pop_f32()?;
            stack.push(Value::F32(c.trunc()));
        }
        F32Nearest => {
            let c = stack.pop_f32()?;
            stack.push(Value::F32(c.round_ties_even()));
        }
        F32Add => {
            let c2 = stack.pop_f32()?;
            let c1 = stack.pop_f32()?;
            stack.push(Value::F32(c1 + c2));
        }
        F32Sub => {
            let c2 = stack.pop_f32()?;
            let c1 = stack.pop_f32()?;
            stack.push(Value::F32(c1 - c2));
        }
        F32Mul => {
            let c2 = stack.pop_f32()?;
            let c1 = stack.pop_f32()?;
            stack.push(Value::F32(c1 * c2));
        }
        F32Div => {
            let c2 = stack.pop_f32()?;
            let c1 = stack.pop_f32()?;
            stack.push(Value::F32(c1 / c2));
        }
        F32Min => {
            let c2 = stack.pop_f32()?;
            let c1 = stack.pop_f32()?;
            stack.push(Value::F32(wasm_min_f32(c1, c2)));
        }
        F32Max => {
            let c2 = stack.pop_f32()?;
            let c1 = stack.pop_f32()?;
            stack.push(Value::F32(wasm_max_f32(c1, c2)));
        }
        F32Copysign => {
            let c2 = stack.pop_f32()?;
            let c1 = stack.pop_f32()?;
            stack.push(Value::F32(c1.copysign(c2)));
        }

        F64Abs => {
            let c = stack.pop_f64()?;
            stack.push(Value::F64(c.abs()));
        }
        F64Neg => {
            let c = stack.pop_f64()?;
            stack.push(Value::F64(-c));
        }
        F64Sqrt => {
            let c = stack.pop_f64()?;
            stack.push(Value::F64(c.sqrt()));
        }
        F64Ceil => {
            let c = stack.pop_f64()?;
            stack.push(Value::F64(c.ceil()));
        }
        F64Floor => {
            let c = stack.pop_f64()?;
            stack.push(Value::F64(c.floor()));
        }
        F64Trunc => {
            let c = stack.pop_f64()?;
            stack.push(Value::F64(c.trunc()));
        }
        F64Nearest => {
            let c = stack.pop_f64()?;
            stack.push(Value::F64(c.round_ties_even()));
        }
        F64Add => {
            let c2 = stack.pop_f64()?;
            let c1 = stack.pop_f64()?;
            stack.push(Value::F64(c1 + c2));
        }
        F64Sub => {
            let c2 = stack.pop_f64()?;
            let c1 = stack.pop_f64()?;
            stack.push(Value::F64(c1 - c2));
        }
        F64Mul => {
            let c2 = stack.pop_f64()?;
            let c1 = stack.pop_f64()?;
            stack.push(Value::F64(c1 * c2));
        }
        F64Div => {
            let c2 = stack.pop_f64()?;
            let c1 = stack.pop_f64()?;
            stack.push(Value::F64(c1 / c2));
        }
        F64Min => {
            let c2 = stack.pop_f64()?;
            let c1 = stack.pop_f64()?;
            stack.push(Value::F64(wasm_min_f64(c1, c2)));
        }
        F64Max => {
            let c2 = stack.pop_f64()?;
            let c1 = stack.pop_f64()?;
            stack.push(Value::F64(wasm_max_f64(c1, c2)));
        }
        F64Copysign => {
            let c2 = stack.pop_f64()?;
            let c1 = stack.pop_f64()?;
            stack.push(Value::F64(c1.copysign(c2)));
        }
    }
    Ok(())
}

/// i32.div_s
///
/// Truncating signed division. Traps on a zero divisor and on
/// i32::MIN / -1, whose mathematical result does not fit.
pub fn i32_div_s(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    if c2 == 0 {
        return Err(Trap::IntegerDivideByZero);
    }
    if c1 == i32::MIN && c2 == -1 {
        return Err(Trap::IntegerOverflow);
    }
    stack.push(Value::I32(c1 / c2));
    Ok(())
}

/// i32.div_u
pub fn i32_div_u(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()? as u32;
    let c1 = stack.pop_i32()? as u32;
    if c2 == 0 {
        return Err(Trap::IntegerDivideByZero);
    }
    stack.push(Value::I32((c1 / c2) as i32));
    Ok(())
}

/// i32.rem_s
///
/// i32::MIN % -1 is 0, not an overflow; wrapping_rem covers it.
pub fn i32_rem_s(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    if c2 == 0 {
        return Err(Trap::IntegerDivideByZero);
    }
    stack.push(Value::I32(c1.wrapping_rem(c2)));
    Ok(())
}

/// i32.rem_u
pub fn i32_rem_u(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()? as u32;
    let c1 = stack.pop_i32()? as u32;
    if c2 == 0 {
        return Err(Trap::IntegerDivideByZero);
    }
    stack.push(Value::I32((c1 % c2) as i32));
    Ok(())
}

/// i64.div_s
pub fn i64_div_s(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    if c2 == 0 {
        return Err(Trap::IntegerDivideByZero);
    }
    if c1 == i64::MIN && c2 == -1 {
        return Err(Trap::IntegerOverflow);
    }
    stack.push(Value::I64(c1 / c2));
    Ok(())
}

/// i64.div_u
pub fn i64_div_u(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i64()? as u64;
    let c1 = stack.pop_i64()? as u64;
    if c2 == 0 {
        return Err(Trap::IntegerDivideByZero);
    }
    stack.push(Value::I64((c1 / c2) as i64));
    Ok(())
}

/// i64.rem_s
pub fn i64_rem_s(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    if c2 == 0 {
        return Err(Trap::IntegerDivideByZero);
    }
    stack.push(Value::I64(c1.wrapping_rem(c2)));
    Ok(())
}

/// i64.rem_u
pub fn i64_rem_u(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i64()? as u64;
    let c1 = stack.pop_i64()? as u64;
    if c2 == 0 {
        return Err(Trap::IntegerDivideByZero);
    }
    stack.push(Value::I64((c1 % c2) as i64));
    Ok(())
}

/// f32.min: NaN if either operand is NaN; -0 beats +0
fn wasm_min_f32(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        f32::NAN
    } else if a == b {
        if a.is_sign_negative() { a } else { b }
    } else if a < b {
        a
    } else {
        b
    }
}

/// f32.max: NaN if either operand is NaN; +0 beats -0
fn wasm_max_f32(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        f32::NAN
    } else if a == b {
        if a.is_sign_positive() { a } else { b }
    } else if a > b {
        a
    } else {
        b
    }
}

fn wasm_min_f64(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b {
        if a.is_sign_negative() { a } else { b }
    } else if a < b {
        a
    } else {
        b
    }
}

fn wasm_max_f64(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == b {
        if a.is_sign_positive() { a } else { b }
    } else if a > b {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn run(op: NumericOp, operands: &[Value]) -> Result<Value, Trap> {
        let mut stack = Stack::default();
        for v in operands {
            stack.push(*v);
        }
        execute(op, &mut stack)?;
        stack.pop()
    }

    #[test]
    fn test_consts() {
        assert_eq!(run(NumericOp::I32Const(42), &[]), Ok(Value::I32(42)));
        assert_eq!(run(NumericOp::F64Const(1.5), &[]), Ok(Value::F64(1.5)));
    }

    #[test]
    fn test_i32_arith_wraps() {
        assert_eq!(
            run(NumericOp::I32Add, &[Value::I32(i32::MAX), Value::I32(1)]),
            Ok(Value::I32(i32::MIN))
        );
        assert_eq!(
            run(NumericOp::I32Mul, &[Value::I32(0x10000), Value::I32(0x10000)]),
            Ok(Value::I32(0))
        );
    }

    #[rstest]
    #[case(NumericOp::I32DivS, Value::I32(7), Value::I32(0))]
    #[case(NumericOp::I32DivU, Value::I32(7), Value::I32(0))]
    #[case(NumericOp::I32RemS, Value::I32(7), Value::I32(0))]
    #[case(NumericOp::I32RemU, Value::I32(7), Value::I32(0))]
    #[case(NumericOp::I64DivS, Value::I64(7), Value::I64(0))]
    #[case(NumericOp::I64DivU, Value::I64(7), Value::I64(0))]
    #[case(NumericOp::I64RemS, Value::I64(7), Value::I64(0))]
    #[case(NumericOp::I64RemU, Value::I64(7), Value::I64(0))]
    fn test_division_by_zero_traps(#[case] op: NumericOp, #[case] lhs: Value, #[case] rhs: Value) {
        assert_eq!(run(op, &[lhs, rhs]), Err(Trap::IntegerDivideByZero));
    }

    #[test]
    fn test_signed_division_overflow() {
        assert_eq!(
            run(NumericOp::I32DivS, &[Value::I32(i32::MIN), Value::I32(-1)]),
            Err(Trap::IntegerOverflow)
        );
        assert_eq!(
            run(NumericOp::I64DivS, &[Value::I64(i64::MIN), Value::I64(-1)]),
            Err(Trap::IntegerOverflow)
        );
        // the remainder of the same pair is defined as zero
        assert_eq!(
            run(NumericOp::I32RemS, &[Value::I32(i32::MIN), Value::I32(-1)]),
            Ok(Value::I32(0))
        );
    }

    #[test]
    fn test_signed_division_truncates() {
        assert_eq!(run(NumericOp::I32DivS, &[Value::I32(-7), Value::I32(2)]), Ok(Value::I32(-3)));
        assert_eq!(run(NumericOp::I32RemS, &[Value::I32(-7), Value::I32(2)]), Ok(Value::I32(-1)));
    }

    #[test]
    fn test_unsigned_division_uses_full_range() {
        assert_eq!(run(NumericOp::I32DivU, &[Value::I32(-2), Value::I32(2)]), Ok(Value::I32(0x7fff_ffff)));
    }

    #[test]
    fn test_bit_counts() {
        assert_eq!(run(NumericOp::I32Clz, &[Value::I32(1)]), Ok(Value::I32(31)));
        assert_eq!(run(NumericOp::I32Ctz, &[Value::I32(8)]), Ok(Value::I32(3)));
        assert_eq!(run(NumericOp::I32Popcnt, &[Value::I32(0xf0f0)]), Ok(Value::I32(8)));
        assert_eq!(run(NumericOp::I64Clz, &[Value::I64(0)]), Ok(Value::I64(64)));
    }

    #[test]
    fn test_float_min_max_zero_signs() {
        assert_eq!(
            run(NumericOp::F32Min, &[Value::F32(0.0), Value::F32(-0.0)]).unwrap(),
            Value::F32(-0.0)
        );
        let Value::F32(min) = run(NumericOp::F32Min, &[Value::F32(0.0), Value::F32(-0.0)]).unwrap() else {
            unreachable!()
        };
        assert!(min.is_sign_negative());
        let Value::F64(max) = run(NumericOp::F64Max, &[Value::F64(-0.0), Value::F64(0.0)]).unwrap() else {
            unreachable!()
        };
        assert!(max.is_sign_positive());
    }

    #[test]
    fn test_float_min_max_nan() {
        let Value::F32(r) = run(NumericOp::F32Min, &[Value::F32(f32::NAN), Value::F32(1.0)]).unwrap() else {
            unreachable!()
        };
        assert!(r.is_nan());
        let Value::F64(r) = run(NumericOp::F64Max, &[Value::F64(1.0), Value::F64(f64::NAN)]).unwrap() else {
            unreachable!()
        };
        assert!(r.is_nan());
    }

    #[test]
    fn test_nearest_ties_to_even() {
        assert_eq!(run(NumericOp::F32Nearest, &[Value::F32(2.5)]), Ok(Value::F32(2.0)));
        assert_eq!(run(NumericOp::F32Nearest, &[Value::F32(3.5)]), Ok(Value::F32(4.0)));
        assert_eq!(run(NumericOp::F64Nearest, &[Value::F64(-0.5)]), Ok(Value::F64(-0.0)));
    }
}
