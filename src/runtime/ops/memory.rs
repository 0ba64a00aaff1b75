//! Linear memory loads, stores, and single-memory bulk operations
//!
//! The effective address of every access is `dynamic index + static
//! offset`, computed in 64 bits and bounds-checked by [`Memory`] against
//! its current size. `memory.init` and `data.drop` consult module segment
//! state and are routed by the executor instead.

use super::{Stack, Trap, Value};
use crate::module::instruction::MemoryOp;
use crate::module::MemArg;
use crate::runtime::memory::Memory;

/// Effective address: unsigned 32-bit index plus unsigned 32-bit offset
fn effective_address(stack: &mut Stack, memarg: MemArg) -> Result<u64, Trap> {
    let index = stack.pop_i32()? as u32;
    Ok(index as u64 + memarg.offset as u64)
}

pub fn execute(op: MemoryOp, stack: &mut Stack, mem: &mut Memory) -> Result<(), Trap> {
    use MemoryOp::*;
    match op {
        I32Load(memarg) => {
            let ea = effective_address(stack, memarg)?;
            stack.push(Value::I32(mem.read_u32(ea)? as i32));
        }
        I64Load(memarg) => {
            let ea = effective_address(stack, memarg)?;
            stack.push(Value::I64(mem.read_u64(ea)? as i64));
        }
        F32Load(memarg) => {
            let ea = effective_address(stack, memarg)?;
            stack.push(Value::F32(f32::from_bits(mem.read_u32(ea)?)));
        }
        F64Load(memarg) => {
            let ea = effective_address(stack, memarg)?;
            stack.push(Value::F64(f64::from_bits(mem.read_u64(ea)?)));
        }
        I32Load8S(memarg) => {
            let ea = effective_address(stack, memarg)?;
            stack.push(Value::I32(mem.read_u8(ea)? as i8 as i32));
        }
        I32Load8U(memarg) => {
            let ea = effective_address(stack, memarg)?;
            stack.push(Value::I32(mem.read_u8(ea)? as i32));
        }
        I32Load16S(memarg) => {
            let ea = effective_address(stack, memarg)?;
            stack.push(Value::I32(mem.read_u16(ea)? as i16 as i32));
        }
        I32Load16U(memarg) => {
            let ea = effective_address(stack, memarg)?;
            stack.push(Value::I32(mem.read_u16(ea)? as i32));
        }
        I64Load8S(memarg) => {
            let ea = effective_address(stack, memarg)?;
            stack.push(Value::I64(mem.read_u8(ea)? as i8 as i64));
        }
        I64Load8U(memarg) => {
            let ea = effective_address(stack, memarg)?;
            stack.push(Value::I64(mem.read_u8(ea)? as i64));
        }
        I64Load16S(memarg) => {
            let ea = effective_address(stack, memarg)?;
            stack.push(Value::I64(mem.read_u16(ea)? as i16 as i64));
        }
        I64Load16U(memarg) => {
            let ea = effective_address(stack, memarg)?;
            stack.push(Value::I64(mem.read_u16(ea)? as i64));
        }
        I64Load32S(memarg) => {
            let ea = effective_address(stack, memarg)?;
            stack.push(Value::I64(mem.read_u32(ea)? as i32 as i64));
        }
        I64Load32U(memarg) => {
            let ea = effective_address(stack, memarg)?;
            stack.push(Value::I64(mem.read_u32(ea)? as i64));
        }

        I32Store(memarg) => {
            let value = stack.pop_i32()?;
            let ea = effective_address(stack, memarg)?;
            mem.write_u32(ea, value as u32)?;
        }
        I64Store(memarg) => {
            let value = stack.pop_i64()?;
            let ea = effective_address(stack, memarg)?;
            mem.write_u64(ea, value as u64)?;
        }
        F32Store(memarg) => {
            let value = stack.pop_f32()?;
            let ea = effective_address(stack, memarg)?;
            mem.write_u32(ea, value.to_bits())?;
        }
        F64Store(memarg) => {
            let value = stack.pop_f64()?;
            let ea = effective_address(stack, memarg)?;
            mem.write_u64(ea, value.to_bits())?;
        }
        I32Store8(memarg) => {
            let value = stack.pop_i32()?;
            let ea = effective_address(stack, memarg)?;
            mem.write_u8(ea, value as u8)?;
        }
        I32Store16(memarg) => {
            let value = stack.pop_i32()?;
            let ea = effective_address(stack, memarg)?;
            mem.write_u16(ea, value as u16)?;
        }
        I64Store8(memarg) => {
            let value = stack.pop_i64()?;
            let ea = effective_address(stack, memarg)?;
            mem.write_u8(ea, value as u8)?;
        }
        I64Store16(memarg) => {
            let value = stack.pop_i64()?;
            let ea = effective_address(stack, memarg)?;
            mem.write_u16(ea, value as u16)?;
        }
        I64Store32(memarg) => {
            let value = stack.pop_i64()?;
            let ea = effective_address(stack, memarg)?;
            mem.write_u32(ea, value as u32)?;
        }

        MemorySize => stack.push(Value::I32(mem.size() as i32)),
        MemoryGrow => {
            let delta = stack.pop_i32()? as u32;
            stack.push(Value::I32(mem.grow(delta)));
        }
        MemoryCopy => {
            let len = stack.pop_i32()? as u32 as u64;
            let src = stack.pop_i32()? as u32 as u64;
            let dst = stack.pop_i32()? as u32 as u64;
            mem.copy_within(dst, src, len)?;
        }
        MemoryFill => {
            let len = stack.pop_i32()? as u32 as u64;
            let value = stack.pop_i32()? as u8;
            let dst = stack.pop_i32()? as u32 as u64;
            mem.fill(dst, value, len)?;
        }

        MemoryInit { .. } | DataDrop { .. } => {
            return Err(Trap::Internal("segment operations are routed by the executor"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Limits, MemoryType};
    use crate::runtime::memory::PAGE_SIZE;

    fn one_page() -> Memory {
        Memory::new(&MemoryType {
            limits: Limits { min: 1, max: None },
        })
    }

    fn memarg(offset: u32) -> MemArg {
        MemArg { offset, align: 0 }
    }

    #[test]
    fn test_store_load_roundtrip() {
        let mut mem = one_page();
        let mut stack = Stack::default();

        stack.push(Value::I32(8)); // address
        stack.push(Value::I32(-2));
        execute(MemoryOp::I32Store(memarg(0)), &mut stack, &mut mem).unwrap();

        stack.push(Value::I32(8));
        execute(MemoryOp::I32Load(memarg(0)), &mut stack, &mut mem).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::I32(-2));
    }

    #[test]
    fn test_narrow_load_sign_behaviour() {
        let mut mem = one_page();
        let mut stack = Stack::default();

        stack.push(Value::I32(0));
        stack.push(Value::I32(0xff));
        execute(MemoryOp::I32Store8(memarg(0)), &mut stack, &mut mem).unwrap();

        stack.push(Value::I32(0));
        execute(MemoryOp::I32Load8S(memarg(0)), &mut stack, &mut mem).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::I32(-1));

        stack.push(Value::I32(0));
        execute(MemoryOp::I32Load8U(memarg(0)), &mut stack, &mut mem).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::I32(255));
    }

    #[test]
    fn test_static_offset_is_added() {
        let mut mem = one_page();
        let mut stack = Stack::default();

        stack.push(Value::I32(4));
        stack.push(Value::I64(7));
        execute(MemoryOp::I64Store(memarg(12)), &mut stack, &mut mem).unwrap();
        assert_eq!(mem.read_u64(16).unwrap(), 7);
    }

    #[test]
    fn test_oob_load_traps_at_page_boundary() {
        let mut mem = one_page();
        let mut stack = Stack::default();

        // end offset exactly at the page boundary succeeds
        stack.push(Value::I32((PAGE_SIZE - 4) as i32));
        assert!(execute(MemoryOp::I32Load(memarg(0)), &mut stack, &mut mem).is_ok());
        stack.pop().unwrap();

        // end offset one past traps, even though the index alone is in range
        stack.push(Value::I32((PAGE_SIZE - 4) as i32));
        assert_eq!(
            execute(MemoryOp::I32Load(memarg(1)), &mut stack, &mut mem),
            Err(Trap::OutOfBoundsMemoryAccess)
        );
    }

    #[test]
    fn test_offset_plus_index_does_not_wrap() {
        let mut mem = one_page();
        let mut stack = Stack::default();

        // u32::MAX index + large offset stays a 64-bit address and traps
        stack.push(Value::I32(-1));
        assert_eq!(
            execute(MemoryOp::I32Load(memarg(u32::MAX)), &mut stack, &mut mem),
            Err(Trap::OutOfBoundsMemoryAccess)
        );
    }

    #[test]
    fn test_size_and_grow() {
        let mut mem = one_page();
        let mut stack = Stack::default();

        execute(MemoryOp::MemorySize, &mut stack, &mut mem).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::I32(1));

        stack.push(Value::I32(2));
        execute(MemoryOp::MemoryGrow, &mut stack, &mut mem).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::I32(1));
        assert_eq!(mem.size(), 3);
    }

    #[test]
    fn test_copy_and_fill() {
        let mut mem = one_page();
        let mut stack = Stack::default();

        stack.push(Value::I32(0)); // dst
        stack.push(Value::I32(0x61)); // value
        stack.push(Value::I32(4)); // len
        execute(MemoryOp::MemoryFill, &mut stack, &mut mem).unwrap();

        stack.push(Value::I32(8)); // dst
        stack.push(Value::I32(0)); // src
        stack.push(Value::I32(4)); // len
        execute(MemoryOp::MemoryCopy, &mut stack, &mut mem).unwrap();

        assert_eq!(mem.read_u32(8).unwrap(), 0x6161_6161);
    }
}
