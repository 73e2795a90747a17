//! Programmatic construction of an [`AnalysisState`].
//!
//! [`CfgBuilder`] is the hand-over point from a front end: it receives blocks
//! in source order, their instructions and the resolved edges, and produces a
//! validated state with `Entry` and `Exit` sentinels in front.
//!
//! # Example
//!
//! ```rust
//! use tacflow::ir::{BinaryOp, CfgBuilder, Operand};
//!
//! let mut builder = CfgBuilder::new();
//! let body = builder.block();
//! let (a, b, c) = (builder.var("a"), builder.var("b"), builder.var("c"));
//! builder.assign(body, a, Operand::Const(1))?;
//! builder.assign(body, b, Operand::Const(2))?;
//! builder.compute(body, c, BinaryOp::Add, a, b)?;
//! builder.ret(body, c)?;
//! let (entry, exit) = (builder.entry(), builder.exit());
//! builder.edge(entry, body).edge(body, exit);
//!
//! let state = builder.finish()?;
//! assert_eq!(state.instruction_count(), 4);
//! # Ok::<(), tacflow::Error>(())
//! ```

use crate::{
    ir::{
        AnalysisState, BinaryOp, BlockId, Expression, InstrId, InstructionKind, NameId, Operand,
        Subscript,
    },
    utils::BitSet,
    Error, Result,
};

/// Incremental builder for a control-flow graph of basic blocks.
#[derive(Debug)]
pub struct CfgBuilder {
    state: AnalysisState,
    edges: Vec<(BlockId, BlockId)>,
}

impl Default for CfgBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CfgBuilder {
    /// Creates a builder holding only the `Entry` and `Exit` sentinels.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AnalysisState::new(),
            edges: Vec::new(),
        }
    }

    /// Returns the entry sentinel.
    #[must_use]
    pub fn entry(&self) -> BlockId {
        self.state.entry()
    }

    /// Returns the exit sentinel.
    #[must_use]
    pub fn exit(&self) -> BlockId {
        self.state.exit()
    }

    /// Appends a new, empty block to the block order.
    pub fn block(&mut self) -> BlockId {
        self.state.add_block()
    }

    /// Interns a variable or label name.
    pub fn name(&mut self, name: &str) -> NameId {
        self.state.intern(name)
    }

    /// Interns `name` and returns it as a scalar operand.
    pub fn var(&mut self, name: &str) -> Operand {
        Operand::Var(self.state.intern(name))
    }

    /// Interns `name` and returns it as an array subscript.
    pub fn subscript(&mut self, name: &str) -> Subscript {
        Subscript::Var(self.state.intern(name))
    }

    /// Interns `base` and returns the array element `base[index]`.
    pub fn element(&mut self, base: &str, index: Subscript) -> Operand {
        Operand::Array {
            base: self.state.intern(base),
            index,
        }
    }

    /// Appends an instruction to `block`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructuralInput`] if `block` is a sentinel or unknown,
    /// or if a definition assigns to a constant.
    pub fn push(&mut self, block: BlockId, kind: InstructionKind) -> Result<InstrId> {
        if self.state.is_sentinel(block) {
            return Err(Error::StructuralInput(format!(
                "instructions cannot be placed in {}",
                self.state.block_name(block)
            )));
        }
        if !self.state.contains_block(block) {
            return Err(Error::StructuralInput(format!("unknown block {block}")));
        }
        if let InstructionKind::Unary { result, .. } | InstructionKind::Binary { result, .. } =
            &kind
        {
            if result.is_const() {
                return Err(Error::StructuralInput(format!(
                    "cannot assign to constant in '{}'",
                    self.state.display_kind(&kind)
                )));
            }
        }
        self.state.append_instr(block, kind)
    }

    /// Appends `result = operand`.
    ///
    /// # Errors
    ///
    /// See [`push`](Self::push).
    pub fn assign(&mut self, block: BlockId, result: Operand, operand: Operand) -> Result<InstrId> {
        self.push(block, InstructionKind::Unary { result, operand })
    }

    /// Appends `result = lhs op rhs`.
    ///
    /// # Errors
    ///
    /// See [`push`](Self::push).
    pub fn compute(
        &mut self,
        block: BlockId,
        result: Operand,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    ) -> Result<InstrId> {
        self.push(
            block,
            InstructionKind::Binary {
                result,
                expr: Expression::new(op, lhs, rhs),
            },
        )
    }

    /// Appends `ifTrue lhs op rhs goto on_true else goto on_false`.
    ///
    /// # Errors
    ///
    /// See [`push`](Self::push).
    pub fn branch(
        &mut self,
        block: BlockId,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
        on_true: &str,
        on_false: &str,
    ) -> Result<InstrId> {
        let on_true = self.name(on_true);
        let on_false = self.name(on_false);
        self.push(
            block,
            InstructionKind::Cond {
                expr: Expression::new(op, lhs, rhs),
                on_true,
                on_false,
            },
        )
    }

    /// Appends `goto target`.
    ///
    /// # Errors
    ///
    /// See [`push`](Self::push).
    pub fn jump(&mut self, block: BlockId, target: &str) -> Result<InstrId> {
        let target = self.name(target);
        self.push(block, InstructionKind::Uncond { target })
    }

    /// Appends the label declaration `name:`.
    ///
    /// # Errors
    ///
    /// See [`push`](Self::push).
    pub fn label(&mut self, block: BlockId, name: &str) -> Result<InstrId> {
        let name = self.name(name);
        self.push(block, InstructionKind::Label { name })
    }

    /// Appends `return operand`.
    ///
    /// # Errors
    ///
    /// See [`push`](Self::push).
    pub fn ret(&mut self, block: BlockId, operand: Operand) -> Result<InstrId> {
        self.push(block, InstructionKind::Return { operand })
    }

    /// Records the control-flow edge `from -> to`.
    pub fn edge(&mut self, from: BlockId, to: BlockId) -> &mut Self {
        self.edges.push((from, to));
        self
    }

    /// Validates the graph and returns the finished state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StructuralInput`] for an empty program, an edge that
    /// enters `Entry`, leaves `Exit` or names an unknown block, a conditional
    /// branch that is not the last instruction of its block or does not have
    /// exactly two successors, an `Entry` without successors, or a block
    /// holding instructions that cannot be reached from `Entry`.
    pub fn finish(self) -> Result<AnalysisState> {
        let Self { mut state, edges } = self;

        if state.instruction_count() == 0 {
            return Err(Error::StructuralInput("empty program".to_string()));
        }

        for (from, to) in edges {
            if !state.contains_block(from) || !state.contains_block(to) {
                return Err(Error::StructuralInput(format!(
                    "edge {from} -> {to} names an unknown block"
                )));
            }
            if from == state.exit() {
                return Err(Error::StructuralInput(format!(
                    "edge leaves Exit towards {}",
                    state.block_name(to)
                )));
            }
            if to == state.entry() {
                return Err(Error::StructuralInput(format!(
                    "edge enters Entry from {}",
                    state.block_name(from)
                )));
            }
            state.add_edge(from, to)?;
        }

        if state.block(state.entry())?.successors().is_empty() {
            return Err(Error::StructuralInput("Entry has no successor".to_string()));
        }

        let mut reached = BitSet::new(state.block_capacity());
        let mut stack = vec![state.entry()];
        reached.insert(state.entry().index());
        while let Some(block) = stack.pop() {
            for &succ in state.block(block)?.successors() {
                if !reached.contains(succ.index()) {
                    reached.insert(succ.index());
                    stack.push(succ);
                }
            }
        }
        for &block in state.block_order() {
            if !reached.contains(block.index()) && !state.block(block)?.is_empty() {
                return Err(Error::StructuralInput(format!(
                    "{} is unreachable from Entry",
                    state.block_name(block)
                )));
            }
        }

        for &block in state.block_order() {
            let bb = state.block(block)?;
            let instrs = bb.instructions();
            for (position, &id) in instrs.iter().enumerate() {
                if !matches!(state.instr(id)?.kind, InstructionKind::Cond { .. }) {
                    continue;
                }
                if position + 1 != instrs.len() {
                    return Err(Error::StructuralInput(format!(
                        "conditional branch in {} is followed by further instructions",
                        state.block_name(block)
                    )));
                }
                if bb.successors().len() != 2 {
                    return Err(Error::StructuralInput(format!(
                        "unterminated conditional in {}: expected 2 successors, found {}",
                        state.block_name(block),
                        bb.successors().len()
                    )));
                }
            }
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_line() -> CfgBuilder {
        let mut builder = CfgBuilder::new();
        let body = builder.block();
        let x = builder.var("x");
        builder.assign(body, x, Operand::Const(1)).unwrap();
        builder.ret(body, x).unwrap();
        let (entry, exit) = (builder.entry(), builder.exit());
        builder.edge(entry, body).edge(body, exit);
        builder
    }

    #[test]
    fn test_finish_straight_line() {
        let state = straight_line().finish().unwrap();
        assert_eq!(state.block_count(), 3);
        assert_eq!(state.instruction_count(), 2);
        let body = state.block_order()[2];
        assert_eq!(state.block(body).unwrap().predecessors(), &[state.entry()]);
    }

    #[test]
    fn test_empty_program_rejected() {
        assert!(matches!(
            CfgBuilder::new().finish(),
            Err(Error::StructuralInput(_))
        ));
    }

    #[test]
    fn test_edges_touching_sentinels_rejected() {
        let mut builder = straight_line();
        let (entry, exit) = (builder.entry(), builder.exit());
        builder.edge(exit, entry);
        assert!(matches!(builder.finish(), Err(Error::StructuralInput(_))));
    }

    #[test]
    fn test_unterminated_conditional_rejected() {
        let mut builder = CfgBuilder::new();
        let head = builder.block();
        let x = builder.var("x");
        builder
            .branch(head, BinaryOp::Lt, x, Operand::Const(3), "L1", "L2")
            .unwrap();
        let (entry, exit) = (builder.entry(), builder.exit());
        builder.edge(entry, head).edge(head, exit);
        assert!(matches!(builder.finish(), Err(Error::StructuralInput(_))));
    }

    #[test]
    fn test_constant_result_and_sentinel_rejected() {
        let mut builder = CfgBuilder::new();
        let body = builder.block();
        let entry = builder.entry();
        let x = builder.var("x");
        assert!(builder.assign(body, Operand::Const(1), x).is_err());
        assert!(builder.assign(entry, x, Operand::Const(1)).is_err());
    }

    #[test]
    fn test_unreachable_block_rejected() {
        // BB1: a = 1; goto L3   BB2: L2: d = a + b; goto L2   BB3: L3: return a
        let mut builder = CfgBuilder::new();
        let (b1, b2, b3) = (builder.block(), builder.block(), builder.block());
        let (a, b, d) = (builder.var("a"), builder.var("b"), builder.var("d"));
        builder.assign(b1, a, Operand::Const(1)).unwrap();
        builder.jump(b1, "L3").unwrap();
        builder.label(b2, "L2").unwrap();
        builder.compute(b2, d, BinaryOp::Add, a, b).unwrap();
        builder.jump(b2, "L2").unwrap();
        builder.label(b3, "L3").unwrap();
        builder.ret(b3, a).unwrap();
        let (entry, exit) = (builder.entry(), builder.exit());
        builder
            .edge(entry, b1)
            .edge(b1, b3)
            .edge(b2, b2)
            .edge(b3, exit);

        match builder.finish() {
            Err(Error::StructuralInput(message)) => assert!(message.contains("BB2"), "{message}"),
            other => panic!("expected a structural error, got {other:?}"),
        }
    }
}
