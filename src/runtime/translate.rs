//! Structured → flat instruction translation
//!
//! Walks a structured body once, emitting flat instructions and keeping a
//! control stack that mirrors the nesting depth. Entering a construct
//! emits a placeholder and pushes a marker; closing it resolves every jump
//! that targeted the construct:
//!
//! - branches to a `loop` resolve immediately to the loop head (backward),
//! - branches to a `block`/`if` are recorded on the marker and patched to
//!   the slot after the matching `End` once it is emitted (forward),
//! - branches to the function's implicit outermost label resolve to the
//!   `EndOfFunction` terminator.
//!
//! A branch depth with no enclosing marker means the input was never
//! validated; translation refuses it rather than emitting a bad jump.

use super::iseq::{Inst, InstructionSequence, JumpTarget};
use crate::module::{BlockType, ConstExpr, Function, Instruction, Module};

/// A precondition violation in the input body.
///
/// These are programming-error-class failures (the decoder's validation is
/// assumed to prevent them), surfaced as errors so a bad input aborts the
/// current operation without corrupting anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    #[error("branch depth {depth} has no enclosing construct")]
    UnresolvedBranchDepth { depth: u32 },
    #[error("block signature references unknown type index {type_idx}")]
    UnknownTypeIndex { type_idx: u32 },
}

/// Translate a function body into its flat, jump-resolved form.
///
/// The result always ends with an `EndOfFunction` terminator; branches to
/// the function label land on it.
pub fn translate_function(module: &Module, func: &Function) -> Result<InstructionSequence, TranslationError> {
    Translator::new(module).translate(&func.body).map(InstructionSequence::new)
}

/// Translate a constant expression. Constant expressions contain no
/// control flow, so this is an identity mapping plus the terminator.
pub fn translate_const_expr(module: &Module, expr: &ConstExpr) -> Result<InstructionSequence, TranslationError> {
    Translator::new(module)
        .translate(expr.instructions())
        .map(InstructionSequence::new)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Function,
    Block,
    Loop,
    If,
}

/// Which resolved slot of a branch instruction a fixup patches
#[derive(Debug, Clone, Copy)]
enum BranchSlot {
    /// The single target of a `br`/`br_if`
    Instr,
    /// One entry of a `br_table`
    Table(usize),
    /// The `br_table` default
    TableDefault,
}

struct Fixup {
    at: usize,
    slot: BranchSlot,
}

/// One entry of the emission-time control stack
struct Marker {
    kind: MarkerKind,
    /// Emission index of the construct's head instruction
    head: usize,
    /// Emission index of the `Else`, when one was seen
    else_at: Option<usize>,
    /// Forward branches awaiting this construct's continuation
    fixups: Vec<Fixup>,
}

impl Marker {
    fn new(kind: MarkerKind, head: usize) -> Self {
        Marker {
            kind,
            head,
            else_at: None,
            fixups: Vec::new(),
        }
    }
}

struct Translator<'m> {
    module: &'m Module,
    code: Vec<Inst>,
    control: Vec<Marker>,
}

impl<'m> Translator<'m> {
    fn new(module: &'m Module) -> Self {
        Translator {
            module,
            code: Vec::new(),
            control: Vec::new(),
        }
    }

    fn translate(mut self, body: &[Instruction]) -> Result<Vec<Inst>, TranslationError> {
        self.control.push(Marker::new(MarkerKind::Function, 0));
        self.seq(body)?;

        let terminator = self.code.len() as u32;
        self.code.push(Inst::EndOfFunction);
        let marker = self.control.pop().expect("function marker still present");
        self.patch(marker.fixups, terminator);
        Ok(self.code)
    }

    fn seq(&mut self, instrs: &[Instruction]) -> Result<(), TranslationError> {
        for instr in instrs {
            self.instr(instr)?;
        }
        Ok(())
    }

    fn instr(&mut self, instr: &Instruction) -> Result<(), TranslationError> {
        match instr {
            Instruction::Unreachable => self.code.push(Inst::Unreachable),
            Instruction::Nop => self.code.push(Inst::Nop),

            Instruction::Block { block_type, body } => {
                let (params, results) = self.arity(*block_type)?;
                let head = self.code.len();
                self.code.push(Inst::Block { cont: 0, params, results });
                self.control.push(Marker::new(MarkerKind::Block, head));
                self.seq(body)?;
                self.close()?;
            }

            Instruction::Loop { block_type, body } => {
                let (params, _results) = self.arity(*block_type)?;
                let head = self.code.len();
                self.code.push(Inst::Loop { params });
                self.control.push(Marker::new(MarkerKind::Loop, head));
                self.seq(body)?;
                self.close()?;
            }

            Instruction::If {
                block_type,
                then_branch,
                else_branch,
            } => {
                let (params, results) = self.arity(*block_type)?;
                let head = self.code.len();
                match else_branch {
                    None => {
                        self.code.push(Inst::IfThen { cont: 0, params, results });
                        self.control.push(Marker::new(MarkerKind::If, head));
                        self.seq(then_branch)?;
                    }
                    Some(else_body) => {
                        self.code.push(Inst::IfThenElse {
                            else_head: 0,
                            cont: 0,
                            params,
                            results,
                        });
                        self.control.push(Marker::new(MarkerKind::If, head));
                        self.seq(then_branch)?;

                        let else_at = self.code.len();
                        self.code.push(Inst::Else { cont: 0 });
                        match &mut self.code[head] {
                            Inst::IfThenElse { else_head, .. } => *else_head = (else_at + 1) as u32,
                            _ => unreachable!("if marker head is not an if instruction"),
                        }
                        self.control
                            .last_mut()
                            .expect("if marker still present")
                            .else_at = Some(else_at);

                        self.seq(else_body)?;
                    }
                }
                self.close()?;
            }

            Instruction::Br { label_idx } => {
                let at = self.code.len();
                let target = self.branch_target(*label_idx, at, BranchSlot::Instr)?;
                self.code.push(Inst::Br(target));
            }

            Instruction::BrIf { label_idx } => {
                let at = self.code.len();
                let target = self.branch_target(*label_idx, at, BranchSlot::Instr)?;
                self.code.push(Inst::BrIf(target));
            }

            Instruction::BrTable { targets, default } => {
                let at = self.code.len();
                let mut resolved = Vec::with_capacity(targets.len());
                for (i, label_idx) in targets.iter().enumerate() {
                    resolved.push(self.branch_target(*label_idx, at, BranchSlot::Table(i))?);
                }
                let default = self.branch_target(*default, at, BranchSlot::TableDefault)?;
                self.code.push(Inst::BrTable {
                    targets: resolved.into(),
                    default,
                });
            }

            Instruction::Return => self.code.push(Inst::Return),
            Instruction::Call { func_idx } => self.code.push(Inst::Call { func_idx: *func_idx }),
            Instruction::CallIndirect { type_idx, table_idx } => self.code.push(Inst::CallIndirect {
                type_idx: *type_idx,
                table_idx: *table_idx,
            }),
            Instruction::Op(op) => self.code.push(Inst::Op(op.clone())),
        }
        Ok(())
    }

    /// Close the innermost block/loop/if: emit its `End` and resolve
    /// everything that targeted it
    fn close(&mut self) -> Result<(), TranslationError> {
        self.code.push(Inst::End);
        let cont = self.code.len() as u32;
        let marker = self.control.pop().expect("control marker still present");

        match &mut self.code[marker.head] {
            Inst::Block { cont: c, .. } => *c = cont,
            Inst::IfThen { cont: c, .. } => *c = cont,
            Inst::IfThenElse { cont: c, .. } => *c = cont,
            Inst::Loop { .. } => {}
            _ => unreachable!("marker head is not a control instruction"),
        }
        if let Some(else_at) = marker.else_at {
            match &mut self.code[else_at] {
                Inst::Else { cont: c } => *c = cont,
                _ => unreachable!("marker else position is not an else instruction"),
            }
        }

        let continuation = match marker.kind {
            MarkerKind::Loop => marker.head as u32,
            _ => cont,
        };
        self.patch(marker.fixups, continuation);
        Ok(())
    }

    /// Resolve a branch at emission index `at` targeting label depth
    /// `depth`. Loop targets are known immediately; everything else is
    /// recorded on the marker for patching when the construct closes.
    fn branch_target(&mut self, depth: u32, at: usize, slot: BranchSlot) -> Result<JumpTarget, TranslationError> {
        let idx = self
            .control
            .len()
            .checked_sub(1 + depth as usize)
            .ok_or(TranslationError::UnresolvedBranchDepth { depth })?;
        let marker = &mut self.control[idx];
        let pc = match marker.kind {
            MarkerKind::Loop => marker.head as u32,
            _ => {
                marker.fixups.push(Fixup { at, slot });
                u32::MAX
            }
        };
        Ok(JumpTarget { pc, depth })
    }

    fn patch(&mut self, fixups: Vec<Fixup>, cont: u32) {
        for fixup in fixups {
            match (&mut self.code[fixup.at], fixup.slot) {
                (Inst::Br(target), BranchSlot::Instr) | (Inst::BrIf(target), BranchSlot::Instr) => {
                    target.pc = cont;
                }
                (Inst::BrTable { targets, .. }, BranchSlot::Table(i)) => targets[i].pc = cont,
                (Inst::BrTable { default, .. }, BranchSlot::TableDefault) => default.pc = cont,
                _ => unreachable!("fixup does not match the emitted instruction"),
            }
        }
    }

    /// Resolve a block signature to (parameter count, result count)
    fn arity(&self, block_type: BlockType) -> Result<(u16, u16), TranslationError> {
        match block_type {
            BlockType::Empty => Ok((0, 0)),
            BlockType::Value(_) => Ok((0, 1)),
            BlockType::TypeIndex(type_idx) => {
                let ty = self
                    .module
                    .types
                    .get(type_idx as usize)
                    .ok_or(TranslationError::UnknownTypeIndex { type_idx })?;
                Ok((ty.parameters.len() as u16, ty.results.len() as u16))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::instruction::{NumericOp, Op};
    use crate::module::{FunctionType, ValueType};

    fn i32_const(value: i32) -> Instruction {
        Instruction::Op(Op::Numeric(NumericOp::I32Const(value)))
    }

    fn translate(module: &Module, body: Vec<Instruction>) -> InstructionSequence {
        let func = Function {
            type_idx: 0,
            locals: vec![],
            body,
        };
        translate_function(module, &func).unwrap()
    }

    #[test]
    fn test_straight_line_is_identity() {
        let module = Module::default();
        let body = vec![
            i32_const(1),
            i32_const(2),
            Instruction::Op(Op::Numeric(NumericOp::I32Add)),
        ];
        let iseq = translate(&module, body.clone());

        // one flat instruction per structured instruction, plus the terminator
        assert_eq!(iseq.len(), body.len() + 1);
        assert_eq!(iseq[0], Inst::Op(Op::Numeric(NumericOp::I32Const(1))));
        assert_eq!(iseq[2], Inst::Op(Op::Numeric(NumericOp::I32Add)));
        assert_eq!(iseq[3], Inst::EndOfFunction);
    }

    #[test]
    fn test_nested_block_ends_are_ordered() {
        let module = Module::default();
        let body = vec![Instruction::Block {
            block_type: BlockType::Empty,
            body: vec![Instruction::Block {
                block_type: BlockType::Empty,
                body: vec![Instruction::Nop],
            }],
        }];
        let iseq = translate(&module, body);

        let Inst::Block { cont: outer, .. } = iseq[0] else {
            panic!("expected outer block at 0");
        };
        let Inst::Block { cont: inner, .. } = iseq[1] else {
            panic!("expected inner block at 1");
        };
        assert!(outer > inner, "outer end {outer} must follow inner end {inner}");
    }

    #[test]
    fn test_br_to_loop_jumps_backward() {
        let module = Module::default();
        let body = vec![Instruction::Loop {
            block_type: BlockType::Empty,
            body: vec![Instruction::Br { label_idx: 0 }],
        }];
        let iseq = translate(&module, body);

        // loop head at 0, br at 1
        assert_eq!(iseq[0], Inst::Loop { params: 0 });
        let Inst::Br(target) = iseq[1] else {
            panic!("expected br at 1");
        };
        assert_eq!(target.depth, 0);
        assert!((target.pc as usize) < 1, "loop branch must jump backward");
        assert_eq!(target.pc, 0);
    }

    #[test]
    fn test_br_to_block_jumps_forward() {
        let module = Module::default();
        let body = vec![Instruction::Block {
            block_type: BlockType::Empty,
            body: vec![Instruction::Br { label_idx: 0 }, Instruction::Nop],
        }];
        let iseq = translate(&module, body);

        let Inst::Br(target) = iseq[1] else {
            panic!("expected br at 1");
        };
        // lands after the End at index 3
        assert_eq!(target.pc, 4);
        assert!((target.pc as usize) > 1, "block branch must jump forward");
    }

    #[test]
    fn test_br_to_function_label_targets_terminator() {
        let module = Module::default();
        let body = vec![Instruction::Block {
            block_type: BlockType::Empty,
            body: vec![Instruction::Br { label_idx: 1 }],
        }];
        let iseq = translate(&module, body);

        let Inst::Br(target) = iseq[1] else {
            panic!("expected br at 1");
        };
        assert_eq!(target.depth, 1);
        assert_eq!(iseq[target.pc as usize], Inst::EndOfFunction);
    }

    #[test]
    fn test_if_else_wiring() {
        let module = Module::default();
        let body = vec![i32_const(1), Instruction::If {
            block_type: BlockType::Value(ValueType::I32),
            then_branch: vec![i32_const(10)],
            else_branch: Some(vec![i32_const(20)]),
        }];
        let iseq = translate(&module, body);

        // 0: const, 1: if, 2: const 10, 3: else, 4: const 20, 5: end, 6: terminator
        let Inst::IfThenElse { else_head, cont, params, results } = iseq[1] else {
            panic!("expected if-then-else at 1");
        };
        assert_eq!((params, results), (0, 1));
        assert_eq!(else_head, 4, "false path enters the else body");
        assert_eq!(cont, 6, "branches land after the end");
        assert_eq!(iseq[3], Inst::Else { cont: 6 });
        assert_eq!(iseq[5], Inst::End);
    }

    #[test]
    fn test_if_without_else_skips_past_end() {
        let module = Module::default();
        let body = vec![i32_const(0), Instruction::If {
            block_type: BlockType::Empty,
            then_branch: vec![Instruction::Nop],
            else_branch: None,
        }];
        let iseq = translate(&module, body);

        let Inst::IfThen { cont, .. } = iseq[1] else {
            panic!("expected if-then at 1");
        };
        // 2: nop, 3: end, 4: terminator
        assert_eq!(cont, 4);
    }

    #[test]
    fn test_br_table_targets_are_dense() {
        let module = Module::default();
        let body = vec![Instruction::Block {
            block_type: BlockType::Empty,
            body: vec![Instruction::Loop {
                block_type: BlockType::Empty,
                body: vec![i32_const(0), Instruction::BrTable {
                    targets: vec![0, 1],
                    default: 2,
                }],
            }],
        }];
        let iseq = translate(&module, body);

        // 0: block, 1: loop, 2: const, 3: br_table, 4: end (loop),
        // 5: end (block), 6: terminator
        let Inst::BrTable { ref targets, default } = iseq[3] else {
            panic!("expected br_table at 3");
        };
        assert_eq!(targets.len(), 2);
        // depth 0 = loop head (backward), depth 1 = after the block's end,
        // default = function terminator
        assert_eq!(targets[0], JumpTarget { pc: 1, depth: 0 });
        assert_eq!(targets[1], JumpTarget { pc: 6, depth: 1 });
        assert_eq!(default.depth, 2);
        assert_eq!(iseq[default.pc as usize], Inst::EndOfFunction);
    }

    #[test]
    fn test_block_type_index_arity() {
        let module = Module {
            types: vec![FunctionType::new(
                vec![ValueType::I32, ValueType::I32],
                vec![ValueType::I32],
            )],
            ..Default::default()
        };
        let body = vec![Instruction::Block {
            block_type: BlockType::TypeIndex(0),
            body: vec![],
        }];
        let iseq = translate(&module, body);
        assert_eq!(
            iseq[0],
            Inst::Block {
                cont: 2,
                params: 2,
                results: 1
            }
        );
    }

    #[test]
    fn test_unresolved_branch_depth_is_refused() {
        let module = Module::default();
        let func = Function {
            type_idx: 0,
            locals: vec![],
            body: vec![Instruction::Br { label_idx: 5 }],
        };
        assert_eq!(
            translate_function(&module, &func),
            Err(TranslationError::UnresolvedBranchDepth { depth: 5 })
        );
    }

    #[test]
    fn test_const_expr_translation_is_identity() {
        let module = Module::default();
        let iseq = translate_const_expr(&module, &ConstExpr::i32_const(42)).unwrap();
        assert_eq!(iseq.len(), 2);
        assert_eq!(iseq[0], Inst::Op(Op::Numeric(NumericOp::I32Const(42))));
        assert_eq!(iseq[1], Inst::EndOfFunction);
    }
}
