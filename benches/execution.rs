//! Execution benchmarks: dispatch-loop throughput, call overhead, and
//! memory access, on programmatically built modules.

use criterion::{criterion_group, criterion_main, Criterion};
use flatwasm::module::instruction::{ComparisonOp, MemoryOp, NumericOp, Op, VariableOp};
use flatwasm::module::{
    BlockType, Export, ExportIndex, Function, FunctionType, Instruction, Limits, MemArg, MemoryType,
    Module, ValueType,
};
use flatwasm::runtime::{ModuleAddr, Runtime, Value};
use std::hint::black_box;

fn i32_const(value: i32) -> Instruction {
    Instruction::Op(Op::Numeric(NumericOp::I32Const(value)))
}

fn local_get(local_idx: u32) -> Instruction {
    Instruction::Op(Op::Variable(VariableOp::LocalGet { local_idx }))
}

fn local_set(local_idx: u32) -> Instruction {
    Instruction::Op(Op::Variable(VariableOp::LocalSet { local_idx }))
}

/// sum(n): tight counted loop, mostly numeric and branch dispatch
fn sum_module() -> Module {
    Module {
        types: vec![FunctionType::new(vec![ValueType::I32], vec![ValueType::I32])],
        functions: vec![Function {
            type_idx: 0,
            locals: vec![ValueType::I32, ValueType::I32], // acc, i
            body: vec![
                Instruction::Block {
                    block_type: BlockType::Empty,
                    body: vec![Instruction::Loop {
                        block_type: BlockType::Empty,
                        body: vec![
                            local_get(2),
                            local_get(0),
                            Instruction::Op(Op::Comparison(ComparisonOp::I32GeS)),
                            Instruction::BrIf { label_idx: 1 },
                            local_get(2),
                            i32_const(1),
                            Instruction::Op(Op::Numeric(NumericOp::I32Add)),
                            local_set(2),
                            local_get(1),
                            local_get(2),
                            Instruction::Op(Op::Numeric(NumericOp::I32Add)),
                            local_set(1),
                            Instruction::Br { label_idx: 0 },
                        ],
                    }],
                },
                local_get(1),
            ],
        }],
        exports: vec![Export {
            name: "sum".to_string(),
            index: ExportIndex::Function(0),
        }],
        ..Default::default()
    }
}

/// fib(n): naive recursion, dominated by call/return overhead
fn fib_module() -> Module {
    Module {
        types: vec![FunctionType::new(vec![ValueType::I32], vec![ValueType::I32])],
        functions: vec![Function {
            type_idx: 0,
            locals: vec![],
            body: vec![
                local_get(0),
                i32_const(2),
                Instruction::Op(Op::Comparison(ComparisonOp::I32LtS)),
                Instruction::If {
                    block_type: BlockType::Value(ValueType::I32),
                    then_branch: vec![local_get(0)],
                    else_branch: Some(vec![
                        local_get(0),
                        i32_const(1),
                        Instruction::Op(Op::Numeric(NumericOp::I32Sub)),
                        Instruction::Call { func_idx: 0 },
                        local_get(0),
                        i32_const(2),
                        Instruction::Op(Op::Numeric(NumericOp::I32Sub)),
                        Instruction::Call { func_idx: 0 },
                        Instruction::Op(Op::Numeric(NumericOp::I32Add)),
                    ]),
                },
            ],
        }],
        exports: vec![Export {
            name: "fib".to_string(),
            index: ExportIndex::Function(0),
        }],
        ..Default::default()
    }
}

/// fill(n): a store per iteration, exercising the bounds-checked memory path
fn fill_module() -> Module {
    Module {
        types: vec![FunctionType::new(vec![ValueType::I32], vec![])],
        functions: vec![Function {
            type_idx: 0,
            locals: vec![ValueType::I32], // i
            body: vec![Instruction::Block {
                block_type: BlockType::Empty,
                body: vec![Instruction::Loop {
                    block_type: BlockType::Empty,
                    body: vec![
                        local_get(1),
                        local_get(0),
                        Instruction::Op(Op::Comparison(ComparisonOp::I32GeS)),
                        Instruction::BrIf { label_idx: 1 },
                        local_get(1),
                        i32_const(4),
                        Instruction::Op(Op::Numeric(NumericOp::I32Mul)),
                        local_get(1),
                        Instruction::Op(Op::Memory(MemoryOp::I32Store(MemArg { offset: 0, align: 2 }))),
                        local_get(1),
                        i32_const(1),
                        Instruction::Op(Op::Numeric(NumericOp::I32Add)),
                        local_set(1),
                        Instruction::Br { label_idx: 0 },
                    ],
                }],
            }],
        }],
        memories: vec![MemoryType {
            limits: Limits { min: 1, max: None },
        }],
        exports: vec![Export {
            name: "fill".to_string(),
            index: ExportIndex::Function(0),
        }],
        ..Default::default()
    }
}

fn instantiate(module: &Module) -> (Runtime, ModuleAddr) {
    let mut runtime = Runtime::new();
    let addr = runtime.instantiate(module).expect("instantiation failed");
    (runtime, addr)
}

fn bench_dispatch(c: &mut Criterion) {
    let (mut runtime, instance) = instantiate(&sum_module());
    c.bench_function("sum_10000", |b| {
        b.iter(|| {
            let results = runtime
                .invoke(instance, "sum", &[Value::I32(black_box(10_000))])
                .unwrap();
            black_box(results)
        })
    });
}

fn bench_calls(c: &mut Criterion) {
    let (mut runtime, instance) = instantiate(&fib_module());
    c.bench_function("fib_15", |b| {
        b.iter(|| {
            let results = runtime
                .invoke(instance, "fib", &[Value::I32(black_box(15))])
                .unwrap();
            black_box(results)
        })
    });
}

fn bench_memory(c: &mut Criterion) {
    let (mut runtime, instance) = instantiate(&fill_module());
    c.bench_function("fill_4096_words", |b| {
        b.iter(|| {
            runtime
                .invoke(instance, "fill", &[Value::I32(black_box(4096))])
                .unwrap();
        })
    });
}

fn bench_translation(c: &mut Criterion) {
    let module = sum_module();
    c.bench_function("instantiate_sum_module", |b| {
        b.iter(|| {
            let (runtime, addr) = instantiate(black_box(&module));
            black_box((runtime, addr))
        })
    });
}

criterion_group!(benches, bench_dispatch, bench_calls, bench_memory, bench_translation);
criterion_main!(benches);
