//! Module instances
//!
//! The runtime projection of a static module: every index space an
//! executing function can name (functions, tables, memories, globals) is
//! resolved here to Store addresses, imported entries first. Created during
//! instantiation and structurally immutable afterwards; the objects its
//! addresses point at mutate through the Store.

use super::store::{FuncAddr, GlobalAddr, MemAddr, ModuleAddr, TableAddr};
use super::{Trap, Value};
use crate::module::FunctionType;
use std::collections::HashMap;

/// A resolved external value: what an import consumes and an export
/// exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalValue {
    Function(FuncAddr),
    Table(TableAddr),
    Memory(MemAddr),
    Global(GlobalAddr),
}

impl ExternalValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ExternalValue::Function(_) => "function",
            ExternalValue::Table(_) => "table",
            ExternalValue::Memory(_) => "memory",
            ExternalValue::Global(_) => "global",
        }
    }
}

/// Runtime state of an element segment. Active and declarative segments
/// are dropped (emptied) as soon as instantiation handles them; passive
/// segments keep their references until an explicit `elem.drop`.
#[derive(Debug, Default)]
pub struct ElementInstance {
    refs: Vec<Value>,
}

impl ElementInstance {
    pub fn new(refs: Vec<Value>) -> Self {
        ElementInstance { refs }
    }

    pub fn refs(&self) -> &[Value] {
        &self.refs
    }

    /// Release the payload. A later `table.init` from this segment then
    /// only succeeds with length zero.
    pub fn drop_payload(&mut self) {
        self.refs = Vec::new();
    }
}

/// Runtime state of a data segment, with the same drop behaviour as
/// [`ElementInstance`]
#[derive(Debug, Default)]
pub struct DataInstance {
    bytes: Vec<u8>,
}

impl DataInstance {
    pub fn new(bytes: Vec<u8>) -> Self {
        DataInstance { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn drop_payload(&mut self) {
        self.bytes = Vec::new();
    }
}

/// A live module instance
#[derive(Debug)]
pub struct ModuleInstance {
    /// Resolved type section, consulted by `call_indirect` and block
    /// signatures at translation time
    pub types: Vec<FunctionType>,
    pub function_addrs: Vec<FuncAddr>,
    pub table_addrs: Vec<TableAddr>,
    pub memory_addrs: Vec<MemAddr>,
    pub global_addrs: Vec<GlobalAddr>,
    pub exports: HashMap<String, ExternalValue>,
    pub elem_segments: Vec<ElementInstance>,
    pub data_segments: Vec<DataInstance>,
    /// This instance's own Store address, carried so executing code can
    /// resolve module-relative indices without a back pointer
    pub addr: ModuleAddr,
}

impl ModuleInstance {
    pub fn new(addr: ModuleAddr) -> Self {
        ModuleInstance {
            types: Vec::new(),
            function_addrs: Vec::new(),
            table_addrs: Vec::new(),
            memory_addrs: Vec::new(),
            global_addrs: Vec::new(),
            exports: HashMap::new(),
            elem_segments: Vec::new(),
            data_segments: Vec::new(),
            addr,
        }
    }

    pub fn func_addr(&self, func_idx: u32) -> Result<FuncAddr, Trap> {
        self.function_addrs
            .get(func_idx as usize)
            .copied()
            .ok_or(Trap::Internal("function index out of bounds"))
    }

    pub fn table_addr(&self, table_idx: u32) -> Result<TableAddr, Trap> {
        self.table_addrs
            .get(table_idx as usize)
            .copied()
            .ok_or(Trap::Internal("table index out of bounds"))
    }

    pub fn memory_addr(&self, memory_idx: u32) -> Result<MemAddr, Trap> {
        self.memory_addrs
            .get(memory_idx as usize)
            .copied()
            .ok_or(Trap::Internal("memory index out of bounds"))
    }

    pub fn global_addr(&self, global_idx: u32) -> Result<GlobalAddr, Trap> {
        self.global_addrs
            .get(global_idx as usize)
            .copied()
            .ok_or(Trap::Internal("global index out of bounds"))
    }

    pub fn func_type(&self, type_idx: u32) -> Result<&FunctionType, Trap> {
        self.types
            .get(type_idx as usize)
            .ok_or(Trap::Internal("type index out of bounds"))
    }

    pub fn export(&self, name: &str) -> Option<&ExternalValue> {
        self.exports.get(name)
    }

    pub fn elem_segment(&self, elem_idx: u32) -> Result<&ElementInstance, Trap> {
        self.elem_segments
            .get(elem_idx as usize)
            .ok_or(Trap::Internal("element segment index out of bounds"))
    }

    pub fn elem_segment_mut(&mut self, elem_idx: u32) -> Result<&mut ElementInstance, Trap> {
        self.elem_segments
            .get_mut(elem_idx as usize)
            .ok_or(Trap::Internal("element segment index out of bounds"))
    }

    pub fn data_segment(&self, data_idx: u32) -> Result<&DataInstance, Trap> {
        self.data_segments
            .get(data_idx as usize)
            .ok_or(Trap::Internal("data segment index out of bounds"))
    }

    pub fn data_segment_mut(&mut self, data_idx: u32) -> Result<&mut DataInstance, Trap> {
        self.data_segments
            .get_mut(data_idx as usize)
            .ok_or(Trap::Internal("data segment index out of bounds"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_lookup() {
        let mut instance = ModuleInstance::new(ModuleAddr(3));
        instance.function_addrs.push(FuncAddr(10));
        assert_eq!(instance.func_addr(0), Ok(FuncAddr(10)));
        assert!(instance.func_addr(1).is_err());
        assert!(instance.memory_addr(0).is_err());
    }

    #[test]
    fn test_segment_drop() {
        let mut seg = ElementInstance::new(vec![Value::FuncRef(Some(FuncAddr(1)))]);
        assert_eq!(seg.refs().len(), 1);
        seg.drop_payload();
        assert!(seg.refs().is_empty());
    }
}
