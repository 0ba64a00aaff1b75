//! Structured instruction representation
//!
//! Function bodies arrive from the decoder as a tree: `block`, `loop` and
//! `if` carry their nested bodies directly, so no `end` tokens appear at
//! this level. Everything that is not structured control flow is a plain
//! operation, grouped by category so the runtime can dispatch on a small
//! closed set of payloads.

use super::types::{BlockType, RefType};

/// Static immediate of a memory access instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemArg {
    /// Constant offset added to the dynamic address operand
    pub offset: u32,
    /// Alignment hint (log2); does not affect semantics
    pub align: u32,
}

/// One instruction in structured form
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Unreachable,
    Nop,
    Block {
        block_type: BlockType,
        body: Vec<Instruction>,
    },
    Loop {
        block_type: BlockType,
        body: Vec<Instruction>,
    },
    If {
        block_type: BlockType,
        then_branch: Vec<Instruction>,
        else_branch: Option<Vec<Instruction>>,
    },
    Br {
        label_idx: u32,
    },
    BrIf {
        label_idx: u32,
    },
    BrTable {
        targets: Vec<u32>,
        default: u32,
    },
    Return,
    Call {
        func_idx: u32,
    },
    CallIndirect {
        type_idx: u32,
        table_idx: u32,
    },
    /// Any non-control operation
    Op(Op),
}

/// A plain (non-control) operation, grouped by category
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Numeric(NumericOp),
    Bitwise(BitwiseOp),
    Comparison(ComparisonOp),
    Conversion(ConversionOp),
    Parametric(ParametricOp),
    Variable(VariableOp),
    Memory(MemoryOp),
    Table(TableOp),
    Reference(ReferenceOp),
}

/// Constants and arithmetic
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericOp {
    I32Const(i32),
    I64Const(i64),
    F32Const(f32),
    F64Const(f64),
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32Clz,
    I32Ctz,
    I32Popcnt,
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,
    I64Clz,
    I64Ctz,
    I64Popcnt,
    F32Abs,
    F32Neg,
    F32Sqrt,
    F32Ceil,
    F32Floor,
    F32Trunc,
    F32Nearest,
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F32Min,
    F32Max,
    F32Copysign,
    F64Abs,
    F64Neg,
    F64Sqrt,
    F64Ceil,
    F64Floor,
    F64Trunc,
    F64Nearest,
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,
    F64Min,
    F64Max,
    F64Copysign,
}

/// Bit operations on integers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitwiseOp {
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    I32Rotl,
    I32Rotr,
    I64And,
    I64Or,
    I64Xor,
    I64Shl,
    I64ShrS,
    I64ShrU,
    I64Rotl,
    I64Rotr,
}

/// Tests and relational comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    I32Eqz,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,
    I64Eqz,
    I64Eq,
    I64Ne,
    I64LtS,
    I64LtU,
    I64GtS,
    I64GtU,
    I64LeS,
    I64LeU,
    I64GeS,
    I64GeU,
    F32Eq,
    F32Ne,
    F32Lt,
    F32Gt,
    F32Le,
    F32Ge,
    F64Eq,
    F64Ne,
    F64Lt,
    F64Gt,
    F64Le,
    F64Ge,
}

/// Conversions between numeric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOp {
    I32WrapI64,
    I64ExtendI32S,
    I64ExtendI32U,
    I32Extend8S,
    I32Extend16S,
    I64Extend8S,
    I64Extend16S,
    I64Extend32S,
    I32TruncF32S,
    I32TruncF32U,
    I32TruncF64S,
    I32TruncF64U,
    I64TruncF32S,
    I64TruncF32U,
    I64TruncF64S,
    I64TruncF64U,
    I32TruncSatF32S,
    I32TruncSatF32U,
    I32TruncSatF64S,
    I32TruncSatF64U,
    I64TruncSatF32S,
    I64TruncSatF32U,
    I64TruncSatF64S,
    I64TruncSatF64U,
    F32ConvertI32S,
    F32ConvertI32U,
    F32ConvertI64S,
    F32ConvertI64U,
    F64ConvertI32S,
    F64ConvertI32U,
    F64ConvertI64S,
    F64ConvertI64U,
    F32DemoteF64,
    F64PromoteF32,
    I32ReinterpretF32,
    I64ReinterpretF64,
    F32ReinterpretI32,
    F64ReinterpretI64,
}

/// Operand-stack manipulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParametricOp {
    Drop,
    Select,
}

/// Local and global variable access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableOp {
    LocalGet { local_idx: u32 },
    LocalSet { local_idx: u32 },
    LocalTee { local_idx: u32 },
    GlobalGet { global_idx: u32 },
    GlobalSet { global_idx: u32 },
}

/// Linear memory access and bulk operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOp {
    I32Load(MemArg),
    I64Load(MemArg),
    F32Load(MemArg),
    F64Load(MemArg),
    I32Load8S(MemArg),
    I32Load8U(MemArg),
    I32Load16S(MemArg),
    I32Load16U(MemArg),
    I64Load8S(MemArg),
    I64Load8U(MemArg),
    I64Load16S(MemArg),
    I64Load16U(MemArg),
    I64Load32S(MemArg),
    I64Load32U(MemArg),
    I32Store(MemArg),
    I64Store(MemArg),
    F32Store(MemArg),
    F64Store(MemArg),
    I32Store8(MemArg),
    I32Store16(MemArg),
    I64Store8(MemArg),
    I64Store16(MemArg),
    I64Store32(MemArg),
    MemorySize,
    MemoryGrow,
    MemoryInit { data_idx: u32 },
    DataDrop { data_idx: u32 },
    MemoryCopy,
    MemoryFill,
}

/// Table access and bulk operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOp {
    TableGet { table_idx: u32 },
    TableSet { table_idx: u32 },
    TableSize { table_idx: u32 },
    TableGrow { table_idx: u32 },
    TableFill { table_idx: u32 },
    TableCopy { dst_table: u32, src_table: u32 },
    TableInit { elem_idx: u32, table_idx: u32 },
    ElemDrop { elem_idx: u32 },
}

/// Reference creation and inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceOp {
    RefNull { ref_type: RefType },
    RefIsNull,
    RefFunc { func_idx: u32 },
}

/// A constant expression: the restricted instruction sequence used for
/// global initializers, segment offsets, and element segment items.
/// Contains no control flow, so its translation is an identity mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstExpr(pub Vec<Instruction>);

impl ConstExpr {
    /// Shorthand for the common single-constant initializer
    pub fn i32_const(value: i32) -> Self {
        ConstExpr(vec![Instruction::Op(Op::Numeric(NumericOp::I32Const(value)))])
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.0
    }
}
