//! The Store - sole owner of all runtime-allocated objects
//!
//! Every function, table, memory, global, and module instance a Runtime
//! ever allocates lives in one of the Store's append-only arrays and is
//! referred to by an opaque index. Those addresses are the only
//! cross-object references in the system: a module instance points at its
//! functions by address and a function instance points back at its module
//! by address, which keeps the otherwise cyclic object graph acyclic and
//! lets any object be looked up in O(1).
//!
//! The Store never frees individual objects; it is torn down as a whole
//! when the owning Runtime is dropped.

use super::instance::ModuleInstance;
use super::iseq::InstructionSequence;
use super::memory::Memory;
use super::table::Table;
use super::{Trap, Value};
use crate::module::{FunctionType, GlobalType, ValueType};
use std::rc::Rc;

/// Address of a function instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncAddr(pub usize);

/// Address of a table instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableAddr(pub usize);

/// Address of a memory instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemAddr(pub usize);

/// Address of a global instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalAddr(pub usize);

/// Address of a module instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleAddr(pub usize);

/// Opaque handle to an embedder-provided external reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternAddr(pub usize);

/// Host function implementation.
///
/// Receives a view of the Store scoped to the calling instance plus the
/// popped arguments; runs synchronously and may re-enter the engine
/// through the [`Caller`]'s store handle.
pub type HostCode = Rc<dyn Fn(&mut Caller<'_>, &[Value]) -> Result<Vec<Value>, Trap>>;

/// A function instance: translated WebAssembly code bound to its module,
/// or a host function
pub enum FunctionInstance {
    Wasm {
        ty: FunctionType,
        /// The instance whose index spaces the body resolves against
        module: ModuleAddr,
        /// Declared local types (parameters excluded)
        locals: Box<[ValueType]>,
        /// Flat, jump-resolved body
        code: InstructionSequence,
    },
    Host {
        ty: FunctionType,
        code: HostCode,
    },
}

impl FunctionInstance {
    pub fn ty(&self) -> &FunctionType {
        match self {
            FunctionInstance::Wasm { ty, .. } => ty,
            FunctionInstance::Host { ty, .. } => ty,
        }
    }
}

impl std::fmt::Debug for FunctionInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionInstance::Wasm { ty, module, .. } => f
                .debug_struct("Wasm")
                .field("ty", ty)
                .field("module", module)
                .finish_non_exhaustive(),
            FunctionInstance::Host { ty, .. } => {
                f.debug_struct("Host").field("ty", ty).finish_non_exhaustive()
            }
        }
    }
}

/// A global instance: its type and current value
#[derive(Debug, Clone, Copy)]
pub struct GlobalInstance {
    pub ty: GlobalType,
    pub value: Value,
}

/// The Store: append-only arrays of all allocated runtime objects
#[derive(Debug, Default)]
pub struct Store {
    functions: Vec<FunctionInstance>,
    tables: Vec<Table>,
    memories: Vec<Memory>,
    globals: Vec<GlobalInstance>,
    modules: Vec<ModuleInstance>,
}

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    // --- allocation ---

    pub fn allocate_function(&mut self, func: FunctionInstance) -> FuncAddr {
        let addr = FuncAddr(self.functions.len());
        self.functions.push(func);
        addr
    }

    pub fn allocate_table(&mut self, table: Table) -> TableAddr {
        let addr = TableAddr(self.tables.len());
        self.tables.push(table);
        addr
    }

    pub fn allocate_memory(&mut self, memory: Memory) -> MemAddr {
        let addr = MemAddr(self.memories.len());
        self.memories.push(memory);
        addr
    }

    pub fn allocate_global(&mut self, global: GlobalInstance) -> GlobalAddr {
        let addr = GlobalAddr(self.globals.len());
        self.globals.push(global);
        addr
    }

    pub fn allocate_module(&mut self, instance: ModuleInstance) -> ModuleAddr {
        let addr = ModuleAddr(self.modules.len());
        self.modules.push(instance);
        addr
    }

    /// The address the next allocated module instance will get
    pub fn next_module_addr(&self) -> ModuleAddr {
        ModuleAddr(self.modules.len())
    }

    // --- lookup ---

    pub fn function(&self, addr: FuncAddr) -> Result<&FunctionInstance, Trap> {
        self.functions
            .get(addr.0)
            .ok_or(Trap::Internal("dangling function address"))
    }

    pub fn table(&self, addr: TableAddr) -> Result<&Table, Trap> {
        self.tables.get(addr.0).ok_or(Trap::Internal("dangling table address"))
    }

    pub fn table_mut(&mut self, addr: TableAddr) -> Result<&mut Table, Trap> {
        self.tables
            .get_mut(addr.0)
            .ok_or(Trap::Internal("dangling table address"))
    }

    pub fn memory(&self, addr: MemAddr) -> Result<&Memory, Trap> {
        self.memories
            .get(addr.0)
            .ok_or(Trap::Internal("dangling memory address"))
    }

    pub fn memory_mut(&mut self, addr: MemAddr) -> Result<&mut Memory, Trap> {
        self.memories
            .get_mut(addr.0)
            .ok_or(Trap::Internal("dangling memory address"))
    }

    pub fn global(&self, addr: GlobalAddr) -> Result<&GlobalInstance, Trap> {
        self.globals
            .get(addr.0)
            .ok_or(Trap::Internal("dangling global address"))
    }

    pub fn global_mut(&mut self, addr: GlobalAddr) -> Result<&mut GlobalInstance, Trap> {
        self.globals
            .get_mut(addr.0)
            .ok_or(Trap::Internal("dangling global address"))
    }

    pub fn module(&self, addr: ModuleAddr) -> Result<&ModuleInstance, Trap> {
        self.modules
            .get(addr.0)
            .ok_or(Trap::Internal("dangling module address"))
    }

    pub fn module_mut(&mut self, addr: ModuleAddr) -> Result<&mut ModuleInstance, Trap> {
        self.modules
            .get_mut(addr.0)
            .ok_or(Trap::Internal("dangling module address"))
    }

    /// Distinct mutable borrows of two tables, for cross-table copies
    pub fn two_tables_mut(
        &mut self,
        dst: TableAddr,
        src: TableAddr,
    ) -> Result<(&mut Table, &Table), Trap> {
        if dst.0.max(src.0) >= self.tables.len() {
            return Err(Trap::Internal("dangling table address"));
        }
        debug_assert_ne!(dst.0, src.0);
        if dst.0 < src.0 {
            let (a, b) = self.tables.split_at_mut(src.0);
            Ok((&mut a[dst.0], &b[0]))
        } else {
            let (a, b) = self.tables.split_at_mut(dst.0);
            Ok((&mut b[0], &a[src.0]))
        }
    }
}

/// The view of the Store a host function executes against: full store
/// access plus the address of the instance whose code made the call (absent
/// when the embedder invokes a host function directly).
pub struct Caller<'a> {
    store: &'a mut Store,
    module: Option<ModuleAddr>,
}

impl<'a> Caller<'a> {
    pub(crate) fn new(store: &'a mut Store, module: Option<ModuleAddr>) -> Self {
        Caller { store, module }
    }

    pub fn store(&self) -> &Store {
        self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        self.store
    }

    pub fn module(&self) -> Option<ModuleAddr> {
        self.module
    }

    /// The calling instance's default memory
    pub fn memory(&self) -> Result<&Memory, Trap> {
        let module = self.module.ok_or(Trap::Internal("host call without a calling instance"))?;
        let addr = self.store.module(module)?.memory_addr(0)?;
        self.store.memory(addr)
    }

    /// The calling instance's default memory, mutably
    pub fn memory_mut(&mut self) -> Result<&mut Memory, Trap> {
        let module = self.module.ok_or(Trap::Internal("host call without a calling instance"))?;
        let addr = self.store.module(module)?.memory_addr(0)?;
        self.store.memory_mut(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Limits, RefType, TableType};

    fn small_table() -> Table {
        Table::new(&TableType {
            ref_type: RefType::FuncRef,
            limits: Limits { min: 2, max: None },
        })
    }

    #[test]
    fn test_addresses_are_sequential() {
        let mut store = Store::new();
        let a = store.allocate_table(small_table());
        let b = store.allocate_table(small_table());
        assert_eq!(a, TableAddr(0));
        assert_eq!(b, TableAddr(1));
        assert!(store.table(a).is_ok());
        assert!(store.table(TableAddr(2)).is_err());
    }

    #[test]
    fn test_global_mutation() {
        let mut store = Store::new();
        let addr = store.allocate_global(GlobalInstance {
            ty: GlobalType {
                value_type: ValueType::I32,
                mutable: true,
            },
            value: Value::I32(1),
        });
        store.global_mut(addr).unwrap().value = Value::I32(2);
        assert_eq!(store.global(addr).unwrap().value, Value::I32(2));
    }

    #[test]
    fn test_two_tables_mut() {
        let mut store = Store::new();
        let a = store.allocate_table(small_table());
        let b = store.allocate_table(small_table());

        let (dst, src) = store.two_tables_mut(b, a).unwrap();
        dst.set(0, src.get(1).unwrap()).unwrap();

        let (dst, src) = store.two_tables_mut(a, b).unwrap();
        dst.set(0, src.get(0).unwrap()).unwrap();
    }
}
