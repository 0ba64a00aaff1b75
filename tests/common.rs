//! Shared builders for integration tests
//!
//! Modules are constructed programmatically, the same way a decoder would
//! hand them to the engine.

use flatwasm::module::instruction::{NumericOp, Op, VariableOp};
use flatwasm::module::{
    ConstExpr, Export, ExportIndex, Function, FunctionType, GlobalType, Instruction, Limits,
    MemoryType, Module, RefType, TableType, ValueType,
};

pub fn i32_const(value: i32) -> Instruction {
    Instruction::Op(Op::Numeric(NumericOp::I32Const(value)))
}

pub fn numeric(op: NumericOp) -> Instruction {
    Instruction::Op(Op::Numeric(op))
}

pub fn local_get(local_idx: u32) -> Instruction {
    Instruction::Op(Op::Variable(VariableOp::LocalGet { local_idx }))
}

pub fn local_set(local_idx: u32) -> Instruction {
    Instruction::Op(Op::Variable(VariableOp::LocalSet { local_idx }))
}

pub fn global_get(global_idx: u32) -> Instruction {
    Instruction::Op(Op::Variable(VariableOp::GlobalGet { global_idx }))
}

pub fn global_set(global_idx: u32) -> Instruction {
    Instruction::Op(Op::Variable(VariableOp::GlobalSet { global_idx }))
}

pub fn func_type(parameters: Vec<ValueType>, results: Vec<ValueType>) -> FunctionType {
    FunctionType::new(parameters, results)
}

pub fn export_func(name: &str, func_idx: u32) -> Export {
    Export {
        name: name.to_string(),
        index: ExportIndex::Function(func_idx),
    }
}

pub fn export_global(name: &str, global_idx: u32) -> Export {
    Export {
        name: name.to_string(),
        index: ExportIndex::Global(global_idx),
    }
}

pub fn export_memory(name: &str, memory_idx: u32) -> Export {
    Export {
        name: name.to_string(),
        index: ExportIndex::Memory(memory_idx),
    }
}

pub fn immutable_i32_global(value: i32) -> flatwasm::module::Global {
    flatwasm::module::Global {
        global_type: GlobalType {
            value_type: ValueType::I32,
            mutable: false,
        },
        init: ConstExpr::i32_const(value),
    }
}

pub fn mutable_i32_global(value: i32) -> flatwasm::module::Global {
    flatwasm::module::Global {
        global_type: GlobalType {
            value_type: ValueType::I32,
            mutable: true,
        },
        init: ConstExpr::i32_const(value),
    }
}

pub fn one_page_memory() -> MemoryType {
    MemoryType {
        limits: Limits { min: 1, max: Some(4) },
    }
}

pub fn funcref_table(min: u32) -> TableType {
    TableType {
        ref_type: RefType::FuncRef,
        limits: Limits { min, max: None },
    }
}

/// A module with one exported function and nothing else
pub fn single_function_module(
    ty: FunctionType,
    locals: Vec<ValueType>,
    body: Vec<Instruction>,
    export_name: &str,
) -> Module {
    Module {
        types: vec![ty],
        functions: vec![Function {
            type_idx: 0,
            locals,
            body,
        }],
        exports: vec![export_func(export_name, 0)],
        ..Default::default()
    }
}
