//! The Runtime orchestrator
//!
//! Owns the Store and the host-function registry, drives module
//! instantiation, and exposes the invoke/global-access surface embedders
//! call. Every entry into the engine (exported call, constant expression,
//! start function) runs on its own [`ExecutionState`], so host functions
//! can instantiate or invoke re-entrantly without sharing a call stack
//! with their caller.

use super::executor::ExecutionState;
use super::imports::ImportObject;
use super::instance::{DataInstance, ElementInstance, ExternalValue, ModuleInstance};
use super::memory::Memory;
use super::stack::DEFAULT_MAX_CALL_DEPTH;
use super::store::{FuncAddr, FunctionInstance, ModuleAddr, Store};
use super::table::Table;
use super::translate;
use super::{InstantiationError, InvocationError, Trap, Value};
use crate::module::{ConstExpr, DataMode, ElementMode, ExportIndex, ImportKind, Module};
use std::rc::Rc;

// Re-exported alias so host signatures read the same at both definition
// and registration sites.
pub use super::store::Caller;

/// Engine limits carried by the Runtime
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Frames that may be live at once before `CallStackExhausted`
    pub max_call_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Call-tracing hooks, invoked on function entry and exit
pub trait Interceptor {
    fn on_enter_function(&self, addr: FuncAddr, store: &Store);
    fn on_exit_function(&self, addr: FuncAddr, store: &Store);
}

/// A WebAssembly runtime: the Store plus everything needed to populate
/// and drive it
pub struct Runtime {
    store: Store,
    imports: ImportObject,
    config: EngineConfig,
    interceptor: Option<Rc<dyn Interceptor>>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Runtime::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Runtime {
            store: Store::new(),
            imports: ImportObject::new(),
            config,
            interceptor: None,
        }
    }

    /// Install call-tracing hooks
    pub fn set_interceptor(&mut self, interceptor: Rc<dyn Interceptor>) {
        self.interceptor = Some(interceptor);
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Register a host function under `module.name` for later import
    /// resolution, returning its address
    pub fn register_host_function<F>(
        &mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        ty: crate::module::FunctionType,
        implementation: F,
    ) -> FuncAddr
    where
        F: Fn(&mut Caller<'_>, &[Value]) -> Result<Vec<Value>, Trap> + 'static,
    {
        let addr = self.store.allocate_function(FunctionInstance::Host {
            ty,
            code: Rc::new(implementation),
        });
        self.imports.add(module, name, ExternalValue::Function(addr));
        addr
    }

    /// Register any external value under `module.name`
    pub fn register(&mut self, module: impl Into<String>, name: impl Into<String>, value: ExternalValue) {
        self.imports.add(module, name, value);
    }

    /// Expose every export of an instantiated module under `name`, so
    /// later modules can import from it
    pub fn register_instance(&mut self, name: &str, module: ModuleAddr) -> Result<(), Trap> {
        let exports: Vec<(String, ExternalValue)> = self
            .store
            .module(module)?
            .exports
            .iter()
            .map(|(export_name, value)| (export_name.clone(), *value))
            .collect();
        for (export_name, value) in exports {
            self.imports.add(name, export_name, value);
        }
        Ok(())
    }

    /// Instantiate `module`, resolving its imports from everything
    /// registered so far
    pub fn instantiate(&mut self, module: &Module) -> Result<ModuleAddr, InstantiationError> {
        let externals = self.imports.resolve(module)?;
        self.instantiate_with(module, &externals)
    }

    /// Instantiate `module` against a positional list of resolved
    /// externals, one per declared import.
    ///
    /// Follows the standard procedure: check the externals, evaluate
    /// global initializers in a transitional context, allocate, apply
    /// element and data segments one at a time, then run the start
    /// function. A failure from segment application onward leaves the
    /// already-applied segments' effects in the Store, but no instance
    /// address is returned.
    pub fn instantiate_with(
        &mut self,
        module: &Module,
        externals: &[ExternalValue],
    ) -> Result<ModuleAddr, InstantiationError> {
        // imports must match in number and kind
        if module.imports.len() != externals.len() {
            return Err(InstantiationError::ImportsMismatch);
        }
        for (import, external) in module.imports.iter().zip(externals) {
            let kind_matches = matches!(
                (&import.kind, external),
                (ImportKind::Function { .. }, ExternalValue::Function(_))
                    | (ImportKind::Table(_), ExternalValue::Table(_))
                    | (ImportKind::Memory(_), ExternalValue::Memory(_))
                    | (ImportKind::Global(_), ExternalValue::Global(_))
            );
            if !kind_matches {
                return Err(InstantiationError::ImportsMismatch);
            }
        }

        // transitional instance: types, imported addresses, and the
        // module's own functions pre-allocated so constant expressions
        // can already take their references
        let module_addr = self.store.next_module_addr();
        let mut instance = ModuleInstance::new(module_addr);
        instance.types = module.types.clone();
        for external in externals {
            match external {
                ExternalValue::Function(addr) => instance.function_addrs.push(*addr),
                ExternalValue::Table(addr) => instance.table_addrs.push(*addr),
                ExternalValue::Memory(addr) => instance.memory_addrs.push(*addr),
                ExternalValue::Global(addr) => instance.global_addrs.push(*addr),
            }
        }
        for function in &module.functions {
            let code = translate::translate_function(module, function)?;
            let ty = module
                .types
                .get(function.type_idx as usize)
                .cloned()
                .ok_or(Trap::Internal("function type index out of bounds"))?;
            let addr = self.store.allocate_function(FunctionInstance::Wasm {
                ty,
                module: module_addr,
                locals: function.locals.clone().into_boxed_slice(),
                code,
            });
            instance.function_addrs.push(addr);
        }
        self.store.allocate_module(instance);

        // evaluate every global initializer before any local global exists
        let mut initial_values = Vec::with_capacity(module.globals.len());
        for global in &module.globals {
            initial_values.push(self.evaluate_const_expr(module, module_addr, &global.init)?);
        }

        // allocate own definitions, imported entries staying first in
        // every index space
        let mut own_tables = Vec::with_capacity(module.tables.len());
        for table_type in &module.tables {
            own_tables.push(self.store.allocate_table(Table::new(table_type)));
        }
        let mut own_memories = Vec::with_capacity(module.memories.len());
        for memory_type in &module.memories {
            own_memories.push(self.store.allocate_memory(Memory::new(memory_type)));
        }
        let mut own_globals = Vec::with_capacity(module.globals.len());
        for (global, value) in module.globals.iter().zip(initial_values) {
            own_globals.push(self.store.allocate_global(super::store::GlobalInstance {
                ty: global.global_type,
                value,
            }));
        }
        {
            let instance = self.store.module_mut(module_addr)?;
            instance.table_addrs.extend(own_tables);
            instance.memory_addrs.extend(own_memories);
            instance.global_addrs.extend(own_globals);
        }

        // resolve exports through the completed index spaces
        let mut exports = Vec::with_capacity(module.exports.len());
        {
            let instance = self.store.module(module_addr)?;
            for export in &module.exports {
                let value = match export.index {
                    ExportIndex::Function(idx) => ExternalValue::Function(instance.func_addr(idx)?),
                    ExportIndex::Table(idx) => ExternalValue::Table(instance.table_addr(idx)?),
                    ExportIndex::Memory(idx) => ExternalValue::Memory(instance.memory_addr(idx)?),
                    ExportIndex::Global(idx) => ExternalValue::Global(instance.global_addr(idx)?),
                };
                exports.push((export.name.clone(), value));
            }
        }
        self.store.module_mut(module_addr)?.exports.extend(exports);

        // element segments, applied one at a time; earlier effects
        // persist when a later segment fails
        for element in &module.elements {
            let segment_instance = match &element.mode {
                ElementMode::Active { table_idx, offset } => {
                    let mut refs = Vec::with_capacity(element.items.len());
                    for item in &element.items {
                        refs.push(self.evaluate_const_expr(module, module_addr, item)?);
                    }
                    let offset = self
                        .evaluate_const_expr(module, module_addr, offset)?
                        .as_i32()
                        .ok_or(InstantiationError::ConstExpression(Trap::Internal(
                            "element offset is not an i32",
                        )))? as u32;

                    let table_addr = self.store.module(module_addr)?.table_addr(*table_idx)?;
                    self.store
                        .table_mut(table_addr)?
                        .init(offset, &refs)
                        .map_err(|_| InstantiationError::OutOfBoundsTableAccess)?;
                    ElementInstance::default()
                }
                ElementMode::Declarative => ElementInstance::default(),
                ElementMode::Passive => {
                    let mut refs = Vec::with_capacity(element.items.len());
                    for item in &element.items {
                        refs.push(self.evaluate_const_expr(module, module_addr, item)?);
                    }
                    ElementInstance::new(refs)
                }
            };
            self.store.module_mut(module_addr)?.elem_segments.push(segment_instance);
        }

        // data segments, same incremental application
        for data in &module.datas {
            let segment_instance = match &data.mode {
                DataMode::Active { memory_idx, offset } => {
                    let offset = self
                        .evaluate_const_expr(module, module_addr, offset)?
                        .as_i32()
                        .ok_or(InstantiationError::ConstExpression(Trap::Internal(
                            "data offset is not an i32",
                        )))? as u32;

                    let mem_addr = self.store.module(module_addr)?.memory_addr(*memory_idx)?;
                    self.store
                        .memory_mut(mem_addr)?
                        .init(offset as u64, &data.bytes)
                        .map_err(|_| InstantiationError::OutOfBoundsMemoryAccess)?;
                    DataInstance::default()
                }
                DataMode::Passive => DataInstance::new(data.bytes.clone()),
            };
            self.store.module_mut(module_addr)?.data_segments.push(segment_instance);
        }

        // the start function runs through the normal engine; a trap here
        // fails instantiation and the instance address never escapes
        if let Some(start_idx) = module.start {
            let addr = self.store.module(module_addr)?.func_addr(start_idx)?;
            let mut exec = ExecutionState::new(self.config.max_call_depth, self.interceptor.clone());
            exec.call_function(&mut self.store, addr)
                .and_then(|()| exec.run(&mut self.store))
                .map_err(InstantiationError::Start)?;
        }

        Ok(module_addr)
    }

    /// Evaluate one constant expression on a fresh, throwaway execution
    /// state in `module_addr`'s context
    fn evaluate_const_expr(
        &mut self,
        module: &Module,
        module_addr: ModuleAddr,
        expr: &ConstExpr,
    ) -> Result<Value, InstantiationError> {
        let iseq = translate::translate_const_expr(module, expr)?;
        let mut exec = ExecutionState::new(self.config.max_call_depth, self.interceptor.clone());
        exec.call_const_expr(iseq, module_addr, 1)
            .and_then(|()| exec.run(&mut self.store))
            .map_err(InstantiationError::ConstExpression)?;
        let mut results = exec.take_results(1).map_err(InstantiationError::ConstExpression)?;
        results.pop().ok_or(InstantiationError::ConstExpression(Trap::Internal(
            "constant expression produced no value",
        )))
    }

    /// Invoke an exported function by name
    pub fn invoke(
        &mut self,
        module: ModuleAddr,
        name: &str,
        args: &[Value],
    ) -> Result<Vec<Value>, InvocationError> {
        let export = self
            .store
            .module(module)?
            .export(name)
            .copied()
            .ok_or_else(|| InvocationError::UnknownExport(name.to_string()))?;
        let ExternalValue::Function(addr) = export else {
            return Err(InvocationError::ExportKindMismatch {
                name: name.to_string(),
                expected: "function",
                actual: export.kind(),
            });
        };
        self.invoke_addr(addr, args)
    }

    /// Invoke a function by Store address, checking the supplied arguments
    /// against its declared type first. Argument mismatches are caller
    /// errors, not traps.
    pub fn invoke_addr(&mut self, addr: FuncAddr, args: &[Value]) -> Result<Vec<Value>, InvocationError> {
        let ty = self.store.function(addr)?.ty().clone();
        if ty.parameters.len() != args.len() {
            return Err(InvocationError::ArityMismatch {
                expected: ty.parameters.len(),
                actual: args.len(),
            });
        }
        for (index, (arg, expected)) in args.iter().zip(&ty.parameters).enumerate() {
            if arg.typ() != *expected {
                return Err(InvocationError::ArgumentTypeMismatch {
                    index,
                    expected: *expected,
                    actual: arg.typ(),
                });
            }
        }

        let mut exec = ExecutionState::new(self.config.max_call_depth, self.interceptor.clone());
        exec.push_arguments(args);
        exec.call_function(&mut self.store, addr)?;
        exec.run(&mut self.store)?;
        Ok(exec.take_results(ty.results.len())?)
    }

    /// Read an exported global's current value
    pub fn get_global(&self, module: ModuleAddr, name: &str) -> Result<Value, InvocationError> {
        let export = self
            .store
            .module(module)?
            .export(name)
            .copied()
            .ok_or_else(|| InvocationError::UnknownExport(name.to_string()))?;
        let ExternalValue::Global(addr) = export else {
            return Err(InvocationError::ExportKindMismatch {
                name: name.to_string(),
                expected: "global",
                actual: export.kind(),
            });
        };
        Ok(self.store.global(addr)?.value)
    }
}
