//! A WebAssembly execution engine written in Rust.
//!
//! flatwasm executes validated, statically-parsed WebAssembly modules as a
//! stack machine. Structured function bodies are translated once into
//! flat instruction sequences with every branch target pre-resolved, and a
//! program-counter-driven dispatch loop executes them against a Store that
//! owns all runtime objects.
//!
//! The binary decoder is an external collaborator: this crate defines the
//! structural [`module::Module`] contract a decoder must produce (with all
//! static indices already validated) and everything downstream of it.
//!
//! # Modules
//!
//! - [`module`] -- Static module structure: types, sections, and the
//!   structured instruction tree a decoder emits.
//! - [`runtime`] -- The engine: store, translator, stack machine, and the
//!   [`runtime::Runtime`] front door for instantiation and invocation.
//!
//! # Example
//!
//! Build a module computing `a + b`, instantiate it, and call it:
//!
//! ```
//! use flatwasm::module::instruction::{NumericOp, Op, VariableOp};
//! use flatwasm::module::{Export, ExportIndex, Function, FunctionType, Instruction, Module, ValueType};
//! use flatwasm::runtime::{Runtime, Value};
//!
//! let module = Module {
//!     types: vec![FunctionType::new(
//!         vec![ValueType::I32, ValueType::I32],
//!         vec![ValueType::I32],
//!     )],
//!     functions: vec![Function {
//!         type_idx: 0,
//!         locals: vec![],
//!         body: vec![
//!             Instruction::Op(Op::Variable(VariableOp::LocalGet { local_idx: 0 })),
//!             Instruction::Op(Op::Variable(VariableOp::LocalGet { local_idx: 1 })),
//!             Instruction::Op(Op::Numeric(NumericOp::I32Add)),
//!         ],
//!     }],
//!     exports: vec![Export {
//!         name: "add".to_string(),
//!         index: ExportIndex::Function(0),
//!     }],
//!     ..Default::default()
//! };
//!
//! let mut runtime = Runtime::new();
//! let instance = runtime.instantiate(&module).unwrap();
//! let results = runtime.invoke(instance, "add", &[Value::I32(2), Value::I32(3)]).unwrap();
//! assert_eq!(results, vec![Value::I32(5)]);
//! ```

pub mod module;
pub mod runtime;
