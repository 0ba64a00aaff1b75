//! The fetch-dispatch-execute loop
//!
//! An [`ExecutionState`] owns a program counter into the current flat
//! instruction sequence plus the unified stack, and runs until the call
//! chain unwinds past its root. Calls are iterative, not recursive: a
//! WebAssembly call pushes a frame and redirects the program counter, so
//! call depth is bounded by the configured frame limit rather than the
//! host's own stack.
//!
//! The root frame's return address points into a one-instruction sentinel
//! sequence; unwinding into it ends the loop.

use super::control::Label;
use super::frame::Frame;
use super::iseq::{Inst, InstructionSequence, JumpTarget};
use super::ops;
use super::runtime::Interceptor;
use super::stack::Stack;
use super::store::{Caller, FuncAddr, FunctionInstance, HostCode, ModuleAddr, Store};
use super::{Trap, Value};
use crate::module::instruction::{MemoryOp, Op, ReferenceOp, TableOp, VariableOp};
use crate::module::ValueType;
use std::rc::Rc;

/// What [`ExecutionState::invoke`] found at a function address, with the
/// Store borrow already released
enum Invocation {
    Host {
        param_count: usize,
        result_count: usize,
        code: HostCode,
    },
    Wasm {
        param_count: usize,
        arity: usize,
        module: ModuleAddr,
        locals: Box<[ValueType]>,
        code: InstructionSequence,
    },
}

/// One invocation's execution state: program counter plus stack.
///
/// Every engine entry (an exported call, a constant expression, a start
/// function, a host function re-entering) gets its own independent state;
/// nothing is shared between concurrent invocations except the Store they
/// both borrow.
pub struct ExecutionState {
    iseq: InstructionSequence,
    pc: usize,
    stack: Stack,
    done: bool,
    interceptor: Option<Rc<dyn Interceptor>>,
}

impl ExecutionState {
    pub fn new(max_call_depth: usize, interceptor: Option<Rc<dyn Interceptor>>) -> Self {
        ExecutionState {
            iseq: InstructionSequence::root(),
            pc: 0,
            stack: Stack::new(max_call_depth),
            done: false,
            interceptor,
        }
    }

    /// Push the arguments for a root-level call
    pub fn push_arguments(&mut self, args: &[Value]) {
        self.stack.push_all(args.iter().copied());
    }

    /// Pop the results after the loop has finished
    pub fn take_results(&mut self, count: usize) -> Result<Vec<Value>, Trap> {
        self.stack.pop_values(count)
    }

    /// Invoke `addr` as the root call of this state: when it returns, the
    /// program counter lands on the end-of-execution sentinel
    pub fn call_function(&mut self, store: &mut Store, addr: FuncAddr) -> Result<(), Trap> {
        let return_iseq = self.iseq.clone();
        let return_pc = self.pc;
        self.invoke(store, addr, return_iseq, return_pc)
    }

    /// Enter a translated constant expression in `module`'s context as the
    /// root call of this state
    pub fn call_const_expr(
        &mut self,
        iseq: InstructionSequence,
        module: ModuleAddr,
        arity: usize,
    ) -> Result<(), Trap> {
        let height = self.stack.height();
        let label_base = self.stack.label_depth();
        let continuation = iseq
            .len()
            .checked_sub(1)
            .ok_or(Trap::Internal("constant expression without a terminator"))?;
        self.stack.push_frame(Frame {
            locals: Vec::new(),
            module,
            function: None,
            return_iseq: self.iseq.clone(),
            return_pc: self.pc,
            arity,
            height,
            label_base,
        })?;
        self.stack.push_label(Label {
            arity,
            continuation,
            height,
        });
        self.iseq = iseq;
        self.pc = 0;
        Ok(())
    }

    /// Run until the call chain unwinds past its root or a trap is raised
    pub fn run(&mut self, store: &mut Store) -> Result<(), Trap> {
        while !self.done {
            let iseq = self.iseq.clone();
            let inst = iseq
                .get(self.pc)
                .ok_or(Trap::Internal("program counter out of bounds"))?;
            self.execute(inst, store)?;
        }
        Ok(())
    }

    /// Execute one instruction, advancing the program counter unless the
    /// instruction redirected it
    fn execute(&mut self, inst: &Inst, store: &mut Store) -> Result<(), Trap> {
        match inst {
            Inst::Unreachable => return Err(Trap::Unreachable),
            Inst::Nop => self.pc += 1,

            Inst::Block { cont, params, results } => {
                let height = self.entry_height(*params)?;
                self.stack.push_label(Label {
                    arity: *results as usize,
                    continuation: *cont as usize,
                    height,
                });
                self.pc += 1;
            }
            Inst::Loop { params } => {
                let height = self.entry_height(*params)?;
                // branches re-enter the loop instruction itself
                self.stack.push_label(Label {
                    arity: *params as usize,
                    continuation: self.pc,
                    height,
                });
                self.pc += 1;
            }
            Inst::IfThen { cont, params, results } => {
                let cond = self.stack.pop_i32()?;
                if cond != 0 {
                    let height = self.entry_height(*params)?;
                    self.stack.push_label(Label {
                        arity: *results as usize,
                        continuation: *cont as usize,
                        height,
                    });
                    self.pc += 1;
                } else {
                    // no label on the false path; land past the end
                    self.pc = *cont as usize;
                }
            }
            Inst::IfThenElse {
                else_head,
                cont,
                params,
                results,
            } => {
                let cond = self.stack.pop_i32()?;
                let height = self.entry_height(*params)?;
                self.stack.push_label(Label {
                    arity: *results as usize,
                    continuation: *cont as usize,
                    height,
                });
                self.pc = if cond != 0 { self.pc + 1 } else { *else_head as usize };
            }
            Inst::Else { cont } => {
                // the then-branch is complete; exit the label
                self.stack.pop_label()?;
                self.pc = *cont as usize;
            }
            Inst::End => {
                self.stack.pop_label()?;
                self.pc += 1;
            }

            Inst::Br(target) => self.branch(*target)?,
            Inst::BrIf(target) => {
                let cond = self.stack.pop_i32()?;
                if cond != 0 {
                    self.branch(*target)?;
                } else {
                    self.pc += 1;
                }
            }
            Inst::BrTable { targets, default } => {
                let index = self.stack.pop_i32()? as u32 as usize;
                let target = targets.get(index).copied().unwrap_or(*default);
                self.branch(target)?;
            }

            Inst::Return | Inst::EndOfFunction => self.do_return(store)?,
            Inst::Call { func_idx } => {
                let module = self.stack.current_frame()?.module;
                let addr = store.module(module)?.func_addr(*func_idx)?;
                self.invoke(store, addr, self.iseq.clone(), self.pc + 1)?;
            }
            Inst::CallIndirect { type_idx, table_idx } => {
                self.call_indirect(store, *type_idx, *table_idx)?;
            }
            Inst::EndOfExecution => self.done = true,

            Inst::Op(op) => {
                self.execute_op(op, store)?;
                self.pc += 1;
            }
        }
        Ok(())
    }

    /// Value-stack height a label records on entry: current height minus
    /// the construct's parameters, which stay on the stack for the body
    fn entry_height(&self, params: u16) -> Result<usize, Trap> {
        self.stack
            .height()
            .checked_sub(params as usize)
            .ok_or(Trap::Internal("missing block parameters"))
    }

    /// Transfer control to a resolved branch target: restore the target
    /// label's stack height carrying its arity of values, pop the labels
    /// in between, and jump
    fn branch(&mut self, target: JumpTarget) -> Result<(), Trap> {
        let label = self.stack.label(target.depth)?;
        debug_assert_eq!(label.continuation, target.pc as usize);
        self.stack.unwind_values(label.height, label.arity)?;
        self.stack.pop_labels(target.depth as usize + 1)?;
        self.pc = target.pc as usize;
        Ok(())
    }

    /// Unwind the current frame, leaving its results on the stack
    fn do_return(&mut self, store: &Store) -> Result<(), Trap> {
        let frame = self.stack.pop_frame()?;
        self.stack.unwind_values(frame.height, frame.arity)?;
        self.stack.truncate_labels(frame.label_base);
        if let (Some(interceptor), Some(addr)) = (&self.interceptor, frame.function) {
            interceptor.on_exit_function(addr, store);
        }
        self.iseq = frame.return_iseq;
        self.pc = frame.return_pc;
        Ok(())
    }

    /// Invoke a function at `addr`. WebAssembly callees get a frame and a
    /// body label; host functions run synchronously in place, with no
    /// frame, and may re-enter the engine through their store handle.
    fn invoke(
        &mut self,
        store: &mut Store,
        addr: FuncAddr,
        return_iseq: InstructionSequence,
        return_pc: usize,
    ) -> Result<(), Trap> {
        if let Some(interceptor) = &self.interceptor {
            interceptor.on_enter_function(addr, store);
        }

        let invocation = match store.function(addr)? {
            FunctionInstance::Host { ty, code } => Invocation::Host {
                param_count: ty.parameters.len(),
                result_count: ty.results.len(),
                code: Rc::clone(code),
            },
            FunctionInstance::Wasm {
                ty,
                module,
                locals,
                code,
            } => Invocation::Wasm {
                param_count: ty.parameters.len(),
                arity: ty.results.len(),
                module: *module,
                locals: locals.clone(),
                code: code.clone(),
            },
        };

        match invocation {
            Invocation::Host {
                param_count,
                result_count,
                code,
            } => {
                let args = self.stack.pop_values(param_count)?;
                let module = self.stack.current_frame().ok().map(|frame| frame.module);
                let mut caller = Caller::new(&mut *store, module);
                let results = code(&mut caller, &args)?;
                if results.len() != result_count {
                    return Err(Trap::Internal("host function returned the wrong number of results"));
                }
                self.stack.push_all(results);
                if let Some(interceptor) = &self.interceptor {
                    interceptor.on_exit_function(addr, store);
                }
                self.iseq = return_iseq;
                self.pc = return_pc;
            }
            Invocation::Wasm {
                param_count,
                arity,
                module,
                locals,
                code,
            } => {
                let mut local_values = self.stack.pop_values(param_count)?;
                local_values.extend(locals.iter().map(|ty| Value::zero(*ty)));

                let height = self.stack.height();
                let label_base = self.stack.label_depth();
                let continuation = code
                    .len()
                    .checked_sub(1)
                    .ok_or(Trap::Internal("function body without a terminator"))?;

                self.stack.push_frame(Frame {
                    locals: local_values,
                    module,
                    function: Some(addr),
                    return_iseq,
                    return_pc,
                    arity,
                    height,
                    label_base,
                })?;
                self.stack.push_label(Label {
                    arity,
                    continuation,
                    height,
                });
                self.iseq = code;
                self.pc = 0;
            }
        }
        Ok(())
    }

    /// `call_indirect`: fetch a function reference from a table, check its
    /// type against the declared expectation, then invoke it
    fn call_indirect(&mut self, store: &mut Store, type_idx: u32, table_idx: u32) -> Result<(), Trap> {
        let module_addr = self.stack.current_frame()?.module;
        let index = self.stack.pop_i32()? as u32;

        let module = store.module(module_addr)?;
        let table_addr = module.table_addr(table_idx)?;
        let expected = module.func_type(type_idx)?.clone();

        let entry = store
            .table(table_addr)?
            .get(index)
            .map_err(|_| Trap::UndefinedElement)?;
        let addr = match entry {
            Value::FuncRef(Some(addr)) => addr,
            Value::FuncRef(None) => return Err(Trap::UndefinedElement),
            _ => return Err(Trap::Internal("indirect call through a non-function table")),
        };

        if *store.function(addr)?.ty() != expected {
            return Err(Trap::IndirectCallTypeMismatch);
        }
        self.invoke(store, addr, self.iseq.clone(), self.pc + 1)
    }

    fn execute_op(&mut self, op: &Op, store: &mut Store) -> Result<(), Trap> {
        match op {
            Op::Numeric(op) => ops::numeric::execute(*op, &mut self.stack),
            Op::Bitwise(op) => ops::bitwise::execute(*op, &mut self.stack),
            Op::Comparison(op) => ops::comparison::execute(*op, &mut self.stack),
            Op::Conversion(op) => ops::conversion::execute(*op, &mut self.stack),
            Op::Parametric(op) => ops::parametric::execute(*op, &mut self.stack),
            Op::Variable(op) => self.execute_variable(*op, store),
            Op::Memory(op) => self.execute_memory(*op, store),
            Op::Table(op) => self.execute_table(*op, store),
            Op::Reference(op) => self.execute_reference(*op, store),
        }
    }

    fn execute_variable(&mut self, op: VariableOp, store: &mut Store) -> Result<(), Trap> {
        match op {
            VariableOp::LocalGet { local_idx } => {
                let value = self.stack.current_frame()?.local(local_idx)?;
                self.stack.push(value);
            }
            VariableOp::LocalSet { local_idx } => {
                let value = self.stack.pop()?;
                self.stack.current_frame_mut()?.set_local(local_idx, value)?;
            }
            VariableOp::LocalTee { local_idx } => {
                let value = *self
                    .stack
                    .peek()
                    .ok_or(Trap::Internal("value stack underflow"))?;
                self.stack.current_frame_mut()?.set_local(local_idx, value)?;
            }
            VariableOp::GlobalGet { global_idx } => {
                let module = self.stack.current_frame()?.module;
                let addr = store.module(module)?.global_addr(global_idx)?;
                self.stack.push(store.global(addr)?.value);
            }
            VariableOp::GlobalSet { global_idx } => {
                let module = self.stack.current_frame()?.module;
                let addr = store.module(module)?.global_addr(global_idx)?;
                let value = self.stack.pop()?;
                store.global_mut(addr)?.value = value;
            }
        }
        Ok(())
    }

    fn execute_memory(&mut self, op: MemoryOp, store: &mut Store) -> Result<(), Trap> {
        let module_addr = self.stack.current_frame()?.module;
        match op {
            MemoryOp::MemoryInit { data_idx } => {
                let len = self.stack.pop_i32()? as u32 as usize;
                let src = self.stack.pop_i32()? as u32 as usize;
                let dst = self.stack.pop_i32()? as u32;

                // the source range is checked against the segment, the
                // destination against the memory, before any byte moves
                let bytes = {
                    let segment = store.module(module_addr)?.data_segment(data_idx)?;
                    let end = src.checked_add(len).ok_or(Trap::OutOfBoundsMemoryAccess)?;
                    segment
                        .bytes()
                        .get(src..end)
                        .ok_or(Trap::OutOfBoundsMemoryAccess)?
                        .to_vec()
                };
                let mem_addr = store.module(module_addr)?.memory_addr(0)?;
                store.memory_mut(mem_addr)?.init(dst as u64, &bytes)?;
            }
            MemoryOp::DataDrop { data_idx } => {
                store
                    .module_mut(module_addr)?
                    .data_segment_mut(data_idx)?
                    .drop_payload();
            }
            op => {
                let mem_addr = store.module(module_addr)?.memory_addr(0)?;
                ops::memory::execute(op, &mut self.stack, store.memory_mut(mem_addr)?)?;
            }
        }
        Ok(())
    }

    fn execute_table(&mut self, op: TableOp, store: &mut Store) -> Result<(), Trap> {
        let module_addr = self.stack.current_frame()?.module;
        match op {
            TableOp::TableGet { table_idx } => {
                let index = self.stack.pop_i32()? as u32;
                let addr = store.module(module_addr)?.table_addr(table_idx)?;
                let value = store.table(addr)?.get(index)?;
                self.stack.push(value);
            }
            TableOp::TableSet { table_idx } => {
                let value = self.stack.pop()?;
                let index = self.stack.pop_i32()? as u32;
                let addr = store.module(module_addr)?.table_addr(table_idx)?;
                store.table_mut(addr)?.set(index, value)?;
            }
            TableOp::TableSize { table_idx } => {
                let addr = store.module(module_addr)?.table_addr(table_idx)?;
                let size = store.table(addr)?.size();
                self.stack.push(Value::I32(size as i32));
            }
            TableOp::TableGrow { table_idx } => {
                let delta = self.stack.pop_i32()? as u32;
                let init = self.stack.pop()?;
                let addr = store.module(module_addr)?.table_addr(table_idx)?;
                let previous = store.table_mut(addr)?.grow(delta, init);
                self.stack.push(Value::I32(previous));
            }
            TableOp::TableFill { table_idx } => {
                let len = self.stack.pop_i32()? as u32;
                let value = self.stack.pop()?;
                let dst = self.stack.pop_i32()? as u32;
                let addr = store.module(module_addr)?.table_addr(table_idx)?;
                store.table_mut(addr)?.fill(dst, value, len)?;
            }
            TableOp::TableCopy { dst_table, src_table } => {
                let len = self.stack.pop_i32()? as u32;
                let src = self.stack.pop_i32()? as u32;
                let dst = self.stack.pop_i32()? as u32;
                let module = store.module(module_addr)?;
                let dst_addr = module.table_addr(dst_table)?;
                let src_addr = module.table_addr(src_table)?;
                if dst_addr == src_addr {
                    store.table_mut(dst_addr)?.copy_within(dst, src, len)?;
                } else {
                    let (dst_table, src_table) = store.two_tables_mut(dst_addr, src_addr)?;
                    let refs = src_table.slice(src, len)?;
                    dst_table.init(dst, refs)?;
                }
            }
            TableOp::TableInit { elem_idx, table_idx } => {
                let len = self.stack.pop_i32()? as u32 as usize;
                let src = self.stack.pop_i32()? as u32 as usize;
                let dst = self.stack.pop_i32()? as u32;

                let refs = {
                    let segment = store.module(module_addr)?.elem_segment(elem_idx)?;
                    let end = src.checked_add(len).ok_or(Trap::OutOfBoundsTableAccess)?;
                    segment
                        .refs()
                        .get(src..end)
                        .ok_or(Trap::OutOfBoundsTableAccess)?
                        .to_vec()
                };
                let addr = store.module(module_addr)?.table_addr(table_idx)?;
                store.table_mut(addr)?.init(dst, &refs)?;
            }
            TableOp::ElemDrop { elem_idx } => {
                store
                    .module_mut(module_addr)?
                    .elem_segment_mut(elem_idx)?
                    .drop_payload();
            }
        }
        Ok(())
    }

    fn execute_reference(&mut self, op: ReferenceOp, store: &Store) -> Result<(), Trap> {
        match op {
            ReferenceOp::RefNull { ref_type } => self.stack.push(Value::null_ref(ref_type)),
            ReferenceOp::RefIsNull => {
                let value = self.stack.pop()?;
                self.stack.push(Value::I32(value.is_null_ref()? as i32));
            }
            ReferenceOp::RefFunc { func_idx } => {
                let module = self.stack.current_frame()?.module;
                let addr = store.module(module)?.func_addr(func_idx)?;
                self.stack.push(Value::FuncRef(Some(addr)));
            }
        }
        Ok(())
    }
}
