//! Static module structure
//!
//! This is the contract between the engine and the binary decoder: a fully
//! parsed, validated module. The decoder guarantees that every index held by
//! an instruction or section entry is within bounds of the corresponding
//! sequence; the engine re-checks only where execution semantics mandate a
//! runtime trap (segment application, dynamic memory/table accesses).

pub mod instruction;
pub mod types;

pub use instruction::{ConstExpr, Instruction, MemArg, Op};
pub use types::{BlockType, FunctionType, GlobalType, Limits, MemoryType, RefType, TableType, ValueType};

/// A function definition: signature index, declared locals, structured body
#[derive(Debug, Clone, Default)]
pub struct Function {
    pub type_idx: u32,
    /// Types of the declared locals (parameters are not repeated here)
    pub locals: Vec<ValueType>,
    pub body: Vec<Instruction>,
}

/// A global definition: type plus constant initializer
#[derive(Debug, Clone)]
pub struct Global {
    pub global_type: GlobalType,
    pub init: ConstExpr,
}

/// How an element segment is applied
#[derive(Debug, Clone)]
pub enum ElementMode {
    /// Copied into a table during instantiation
    Active { table_idx: u32, offset: ConstExpr },
    /// Materialised only by an explicit `table.init`
    Passive,
    /// Never materialised; only marks its functions as referenced
    Declarative,
}

/// An element segment: a vector of constant reference expressions
#[derive(Debug, Clone)]
pub struct ElementSegment {
    pub ref_type: RefType,
    pub items: Vec<ConstExpr>,
    pub mode: ElementMode,
}

/// How a data segment is applied
#[derive(Debug, Clone)]
pub enum DataMode {
    /// Copied into memory during instantiation
    Active { memory_idx: u32, offset: ConstExpr },
    /// Materialised only by an explicit `memory.init`
    Passive,
}

/// A data segment: raw bytes plus application mode
#[derive(Debug, Clone)]
pub struct DataSegment {
    pub bytes: Vec<u8>,
    pub mode: DataMode,
}

/// What an import requires from the embedder
#[derive(Debug, Clone)]
pub enum ImportKind {
    Function { type_idx: u32 },
    Table(TableType),
    Memory(MemoryType),
    Global(GlobalType),
}

/// One declared import
#[derive(Debug, Clone)]
pub struct Import {
    pub module: String,
    pub name: String,
    pub kind: ImportKind,
}

/// What an export exposes, with its index into the combined
/// (imports-first) index space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportIndex {
    Function(u32),
    Table(u32),
    Memory(u32),
    Global(u32),
}

/// One declared export
#[derive(Debug, Clone)]
pub struct Export {
    pub name: String,
    pub index: ExportIndex,
}

/// A complete static module, immutable after construction
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub types: Vec<FunctionType>,
    pub functions: Vec<Function>,
    pub tables: Vec<TableType>,
    pub memories: Vec<MemoryType>,
    pub globals: Vec<Global>,
    pub elements: Vec<ElementSegment>,
    pub datas: Vec<DataSegment>,
    pub start: Option<u32>,
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
}

impl Module {
    /// Number of imported functions (locally defined functions follow them
    /// in the function index space)
    pub fn imported_function_count(&self) -> usize {
        self.imports
            .iter()
            .filter(|imp| matches!(imp.kind, ImportKind::Function { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imported_function_count() {
        let module = Module {
            imports: vec![
                Import {
                    module: "env".to_string(),
                    name: "f".to_string(),
                    kind: ImportKind::Function { type_idx: 0 },
                },
                Import {
                    module: "env".to_string(),
                    name: "g".to_string(),
                    kind: ImportKind::Global(GlobalType {
                        value_type: ValueType::I32,
                        mutable: false,
                    }),
                },
            ],
            ..Default::default()
        };
        assert_eq!(module.imported_function_count(), 1);
    }
}
