//! Conversions between numeric types
//!
//! The trapping truncations reject NaN and any value whose truncated
//! integer part falls outside the target range; the saturating forms clamp
//! instead and map NaN to zero (Rust's float-to-int `as` cast has exactly
//! those semantics). Reinterpretations move bits without conversion.

use super::{Stack, Trap, Value};
use crate::module::instruction::ConversionOp;

pub fn execute(op: ConversionOp, stack: &mut Stack) -> Result<(), Trap> {
    use ConversionOp::*;
    match op {
        I32WrapI64 => {
            let c = stack.pop_i64()?;
            stack.push(Value::I32(c as i32));
        }
        I64ExtendI32S => {
            let c = stack.pop_i32()?;
            stack.push(Value::I64(c as i64));
        }
        I64ExtendI32U => {
            let c = stack.pop_i32()?;
            stack.push(Value::I64(c as u32 as i64));
        }

        I32Extend8S => {
            let c = stack.pop_i32()?;
            stack.push(Value::I32(c as i8 as i32));
        }
        I32Extend16S => {
            let c = stack.pop_i32()?;
            stack.push(Value::I32(c as i16 as i32));
        }
        I64Extend8S => {
            let c = stack.pop_i64()?;
            stack.push(Value::I64(c as i8 as i64));
        }
        I64Extend16S => {
            let c = stack.pop_i64()?;
            stack.push(Value::I64(c as i16 as i64));
        }
        I64Extend32S => {
            let c = stack.pop_i64()?;
            stack.push(Value::I64(c as i32 as i64));
        }

        I32TruncF32S => {
            let c = stack.pop_f32()?;
            let t = checked_trunc(c as f64, -2147483648.0, 2147483647.0)?;
            stack.push(Value::I32(t as i32));
        }
        I32TruncF32U => {
            let c = stack.pop_f32()?;
            let t = checked_trunc(c as f64, 0.0, 4294967295.0)?;
            stack.push(Value::I32(t as u32 as i32));
        }
        I32TruncF64S => {
            let c = stack.pop_f64()?;
            let t = checked_trunc(c, -2147483648.0, 2147483647.0)?;
            stack.push(Value::I32(t as i32));
        }
        I32TruncF64U => {
            let c = stack.pop_f64()?;
            let t = checked_trunc(c, 0.0, 4294967295.0)?;
            stack.push(Value::I32(t as u32 as i32));
        }
        I64TruncF32S => {
            let c = stack.pop_f32()?;
            let t = checked_trunc_wide(c as f64, -9223372036854775808.0, 9223372036854775808.0)?;
            stack.push(Value::I64(t as i64));
        }
        I64TruncF32U => {
            let c = stack.pop_f32()?;
            let t = checked_trunc_wide(c as f64, 0.0, 18446744073709551616.0)?;
            stack.push(Value::I64(t as u64 as i64));
        }
        I64TruncF64S => {
            let c = stack.pop_f64()?;
            let t = checked_trunc_wide(c, -9223372036854775808.0, 9223372036854775808.0)?;
            stack.push(Value::I64(t as i64));
        }
        I64TruncF64U => {
            let c = stack.pop_f64()?;
            let t = checked_trunc_wide(c, 0.0, 18446744073709551616.0)?;
            stack.push(Value::I64(t as u64 as i64));
        }

        I32TruncSatF32S => {
            let c = stack.pop_f32()?;
            stack.push(Value::I32(c as i32));
        }
        I32TruncSatF32U => {
            let c = stack.pop_f32()?;
            stack.push(Value::I32(c as u32 as i32));
        }
        I32TruncSatF64S => {
            let c = stack.pop_f64()?;
            stack.push(Value::I32(c as i32));
        }
        I32TruncSatF64U => {
            let c = stack.pop_f64()?;
            stack.push(Value::I32(c as u32 as i32));
        }
        I64TruncSatF32S => {
            let c = stack.pop_f32()?;
            stack.push(Value::I64(c as i64));
        }
        I64TruncSatF32U => {
            let c = stack.pop_f32()?;
            stack.push(Value::I64(c as u64 as i64));
        }
        I64TruncSatF64S => {
            let c = stack.pop_f64()?;
            stack.push(Value::I64(c as i64));
        }
        I64TruncSatF64U => {
            let c = stack.pop_f64()?;
            stack.push(Value::I64(c as u64 as i64));
        }

        F32ConvertI32S => {
            let c = stack.pop_i32()?;
            stack.push(Value::F32(c as f32));
        }
        F32ConvertI32U => {
            let c = stack.pop_i32()?;
            stack.push(Value::F32(c as u32 as f32));
        }
        F32ConvertI64S => {
            let c = stack.pop_i64()?;
            stack.push(Value::F32(c as f32));
        }
        F32ConvertI64U => {
            let c = stack.pop_i64()?;
            stack.push(Value::F32(c as u64 as f32));
        }
        F64ConvertI32S => {
            let c = stack.pop_i32()?;
            stack.push(Value::F64(c as f64));
        }
        F64ConvertI32U => {
            let c = stack.pop_i32()?;
            stack.push(Value::F64(c as u32 as f64));
        }
        F64ConvertI64S => {
            let c = stack.pop_i64()?;
            stack.push(Value::F64(c as f64));
        }
        F64ConvertI64U => {
            let c = stack.pop_i64()?;
            stack.push(Value::F64(c as u64 as f64));
        }

        F32DemoteF64 => {
            let c = stack.pop_f64()?;
            stack.push(Value::F32(c as f32));
        }
        F64PromoteF32 => {
            let c = stack.pop_f32()?;
            stack.push(Value::F64(c as f64));
        }

        I32ReinterpretF32 => {
            let c = stack.pop_f32()?;
            stack.push(Value::I32(c.to_bits() as i32));
        }
        I64ReinterpretF64 => {
            let c = stack.pop_f64()?;
            stack.push(Value::I64(c.to_bits() as i64));
        }
        F32ReinterpretI32 => {
            let c = stack.pop_i32()?;
            stack.push(Value::F32(f32::from_bits(c as u32)));
        }
        F64ReinterpretI64 => {
            let c = stack.pop_i64()?;
            stack.push(Value::F64(f64::from_bits(c as u64)));
        }
    }
    Ok(())
}

/// Truncate toward zero, rejecting NaN and results outside [min, max].
/// The 32-bit bounds are exactly representable in f64, so a direct
/// comparison of the truncated value is exact.
fn checked_trunc(value: f64, min: f64, max: f64) -> Result<f64, Trap> {
    if value.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    let t = value.trunc();
    if t < min || t > max {
        return Err(Trap::InvalidConversionToInteger);
    }
    Ok(t)
}

/// Like `checked_trunc` for 64-bit targets: the upper bound (a power of
/// two) is itself unrepresentable in the target, so the comparison is
/// exclusive there.
fn checked_trunc_wide(value: f64, min: f64, max_exclusive: f64) -> Result<f64, Trap> {
    if value.is_nan() {
        return Err(Trap::InvalidConversionToInteger);
    }
    let t = value.trunc();
    if t < min || t >= max_exclusive {
        return Err(Trap::InvalidConversionToInteger);
    }
    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn run(op: ConversionOp, operand: Value) -> Result<Value, Trap> {
        let mut stack = Stack::default();
        stack.push(operand);
        execute(op, &mut stack)?;
        stack.pop()
    }

    #[test]
    fn test_wrap_and_extend() {
        assert_eq!(run(ConversionOp::I32WrapI64, Value::I64(0x1_0000_0005)), Ok(Value::I32(5)));
        assert_eq!(run(ConversionOp::I64ExtendI32S, Value::I32(-1)), Ok(Value::I64(-1)));
        assert_eq!(
            run(ConversionOp::I64ExtendI32U, Value::I32(-1)),
            Ok(Value::I64(0xffff_ffff))
        );
    }

    #[test]
    fn test_narrow_sign_extension() {
        assert_eq!(run(ConversionOp::I32Extend8S, Value::I32(0x80)), Ok(Value::I32(-128)));
        assert_eq!(run(ConversionOp::I32Extend16S, Value::I32(0x7fff)), Ok(Value::I32(0x7fff)));
        assert_eq!(run(ConversionOp::I64Extend32S, Value::I64(0xffff_ffff)), Ok(Value::I64(-1)));
    }

    #[test]
    fn test_trunc_in_range() {
        assert_eq!(run(ConversionOp::I32TruncF32S, Value::F32(-7.9)), Ok(Value::I32(-7)));
        assert_eq!(run(ConversionOp::I32TruncF64U, Value::F64(3.5)), Ok(Value::I32(3)));
        assert_eq!(
            run(ConversionOp::I32TruncF64S, Value::F64(-2147483648.0)),
            Ok(Value::I32(i32::MIN))
        );
        assert_eq!(
            run(ConversionOp::I64TruncF64S, Value::F64(-9223372036854775808.0)),
            Ok(Value::I64(i64::MIN))
        );
    }

    #[rstest]
    #[case(ConversionOp::I32TruncF32S, Value::F32(f32::NAN))]
    #[case(ConversionOp::I32TruncF32S, Value::F32(2147483648.0))]
    #[case(ConversionOp::I32TruncF32U, Value::F32(-1.0))]
    #[case(ConversionOp::I32TruncF64S, Value::F64(2147483648.0))]
    #[case(ConversionOp::I32TruncF64U, Value::F64(4294967296.0))]
    #[case(ConversionOp::I64TruncF64S, Value::F64(9223372036854775808.0))]
    #[case(ConversionOp::I64TruncF64U, Value::F64(f64::NEG_INFINITY))]
    fn test_trunc_out_of_range_traps(#[case] op: ConversionOp, #[case] operand: Value) {
        assert_eq!(run(op, operand), Err(Trap::InvalidConversionToInteger));
    }

    #[test]
    fn test_trunc_fraction_just_inside_range() {
        // truncation brings these back inside the representable range
        assert_eq!(run(ConversionOp::I32TruncF64U, Value::F64(-0.5)), Ok(Value::I32(0)));
        assert_eq!(
            run(ConversionOp::I32TruncF64S, Value::F64(2147483647.5)),
            Ok(Value::I32(i32::MAX))
        );
    }

    #[test]
    fn test_trunc_sat_clamps() {
        assert_eq!(
            run(ConversionOp::I32TruncSatF32S, Value::F32(f32::NAN)),
            Ok(Value::I32(0))
        );
        assert_eq!(
            run(ConversionOp::I32TruncSatF32S, Value::F32(1e10)),
            Ok(Value::I32(i32::MAX))
        );
        assert_eq!(
            run(ConversionOp::I32TruncSatF64U, Value::F64(-5.0)),
            Ok(Value::I32(0))
        );
        assert_eq!(
            run(ConversionOp::I64TruncSatF64S, Value::F64(f64::NEG_INFINITY)),
            Ok(Value::I64(i64::MIN))
        );
    }

    #[test]
    fn test_convert() {
        assert_eq!(run(ConversionOp::F64ConvertI32S, Value::I32(-3)), Ok(Value::F64(-3.0)));
        assert_eq!(
            run(ConversionOp::F32ConvertI32U, Value::I32(-1)),
            Ok(Value::F32(4294967295.0))
        );
    }

    #[test]
    fn test_demote_promote() {
        assert_eq!(run(ConversionOp::F64PromoteF32, Value::F32(1.5)), Ok(Value::F64(1.5)));
        assert_eq!(run(ConversionOp::F32DemoteF64, Value::F64(1.5)), Ok(Value::F32(1.5)));
    }

    #[test]
    fn test_reinterpret_roundtrip() {
        assert_eq!(
            run(ConversionOp::I32ReinterpretF32, Value::F32(1.0)),
            Ok(Value::I32(0x3f80_0000))
        );
        assert_eq!(
            run(ConversionOp::F32ReinterpretI32, Value::I32(0x3f80_0000)),
            Ok(Value::F32(1.0))
        );
        assert_eq!(
            run(ConversionOp::F64ReinterpretI64, Value::I64(0x3ff0_0000_0000_0000)),
            Ok(Value::F64(1.0))
        );
    }
}
