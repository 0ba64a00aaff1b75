//! Table instances
//!
//! A table is a typed vector of references. It backs indirect calls, so its
//! bounds and type checks are what keeps dynamic dispatch inside the
//! sandbox. Bulk operations check the whole affected range before touching
//! any slot.

use super::{Trap, Value};
use crate::module::{RefType, TableType};

/// Architectural cap on table elements, mirroring the 32-bit index space
const MAX_ELEMENTS: u32 = u32::MAX;

/// A table instance - a typed vector of reference values
#[derive(Debug)]
pub struct Table {
    ref_type: RefType,
    elements: Vec<Value>,
    max: Option<u32>,
}

impl Table {
    /// Create a table with `limits.min` null references
    pub fn new(ty: &TableType) -> Self {
        Table {
            ref_type: ty.ref_type,
            elements: vec![Value::null_ref(ty.ref_type); ty.limits.min as usize],
            max: ty.limits.max,
        }
    }

    pub fn ref_type(&self) -> RefType {
        self.ref_type
    }

    /// Current element count
    pub fn size(&self) -> u32 {
        self.elements.len() as u32
    }

    pub fn get(&self, index: u32) -> Result<Value, Trap> {
        self.elements
            .get(index as usize)
            .copied()
            .ok_or(Trap::OutOfBoundsTableAccess)
    }

    pub fn set(&mut self, index: u32, value: Value) -> Result<(), Trap> {
        let slot = self
            .elements
            .get_mut(index as usize)
            .ok_or(Trap::OutOfBoundsTableAccess)?;
        *slot = value;
        Ok(())
    }

    /// Grow by `delta` slots initialised to `init`, returning the previous
    /// size or -1 when the declared maximum would be exceeded
    pub fn grow(&mut self, delta: u32, init: Value) -> i32 {
        let current = self.size();
        let Some(new_size) = current.checked_add(delta) else {
            return -1;
        };
        if new_size > self.max.unwrap_or(MAX_ELEMENTS) {
            return -1;
        }
        self.elements.resize(new_size as usize, init);
        current as i32
    }

    /// Copy `refs` to `dst`, checked as a whole before any slot changes.
    /// Used both by active element segments and `table.init`.
    pub fn init(&mut self, dst: u32, refs: &[Value]) -> Result<(), Trap> {
        let dst = dst as usize;
        let end = dst.checked_add(refs.len()).ok_or(Trap::OutOfBoundsTableAccess)?;
        if end > self.elements.len() {
            return Err(Trap::OutOfBoundsTableAccess);
        }
        self.elements[dst..end].copy_from_slice(refs);
        Ok(())
    }

    /// `table.copy` within one table: overlapping ranges behave like a
    /// memmove
    pub fn copy_within(&mut self, dst: u32, src: u32, len: u32) -> Result<(), Trap> {
        let (dst, src, len) = (dst as usize, src as usize, len as usize);
        let dst_end = dst.checked_add(len).ok_or(Trap::OutOfBoundsTableAccess)?;
        let src_end = src.checked_add(len).ok_or(Trap::OutOfBoundsTableAccess)?;
        if dst_end > self.elements.len() || src_end > self.elements.len() {
            return Err(Trap::OutOfBoundsTableAccess);
        }
        self.elements.copy_within(src..src_end, dst);
        Ok(())
    }

    /// `table.fill`
    pub fn fill(&mut self, dst: u32, value: Value, len: u32) -> Result<(), Trap> {
        let dst = dst as usize;
        let end = dst.checked_add(len as usize).ok_or(Trap::OutOfBoundsTableAccess)?;
        if end > self.elements.len() {
            return Err(Trap::OutOfBoundsTableAccess);
        }
        self.elements[dst..end].fill(value);
        Ok(())
    }

    /// Read a contiguous range, for cross-table copies
    pub fn slice(&self, src: u32, len: u32) -> Result<&[Value], Trap> {
        let src = src as usize;
        let end = src.checked_add(len as usize).ok_or(Trap::OutOfBoundsTableAccess)?;
        self.elements.get(src..end).ok_or(Trap::OutOfBoundsTableAccess)
    }
}
