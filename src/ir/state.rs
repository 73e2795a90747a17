//! The program state shared by every analysis and transformation.
//!
//! [`AnalysisState`] owns the instruction arena, the block arena, the name
//! interner and the three derived index tables:
//!
//! | Table         | Contents                                    | Universe of            |
//! |---------------|---------------------------------------------|------------------------|
//! | `definitions` | every `Unary`/`Binary`, in program order    | reaching defs, copies  |
//! | `expressions` | distinct `Binary` right-hand sides          | available expressions  |
//! | `du_chains`   | every `(instruction, used variable)` pair   | definition-use chains  |
//!
//! The tables are snapshots: [`AnalysisState::rebuild_tables`] replaces them
//! wholesale, keeping first-seen order, and every set indexed into them must
//! be recomputed afterwards.
//!
//! # Arena discipline
//!
//! Blocks and instructions are addressed by [`BlockId`] and [`InstrId`].
//! Removing one clears its arena slot; handles are never reused, so a stale
//! handle is reported as an [`Error::InvariantViolation`](crate::Error)
//! instead of silently aliasing a newer object.

use std::{collections::BTreeMap, fmt};

use rustc_hash::FxHashMap;

use crate::{
    analysis::InductionVar,
    ir::{
        BasicBlock, BlockId, Expression, InstrId, Instruction, InstructionKind, NameId, Operand,
        Subscript,
    },
    utils::BitSet,
    Result,
};

/// The complete IR plus everything derived from it.
#[derive(Debug, Clone)]
pub struct AnalysisState {
    names: Vec<String>,
    name_lookup: FxHashMap<String, NameId>,

    instrs: Vec<Option<Instruction>>,
    instr_order: Vec<InstrId>,
    blocks: Vec<Option<BasicBlock>>,
    block_order: Vec<BlockId>,
    entry: BlockId,
    exit: BlockId,
    /// Bumped on every change to the block set or the edges.
    shape: u64,
    /// The `shape` the stored `dom` sets were computed for.
    dom_shape: Option<u64>,

    definitions: Vec<InstrId>,
    definition_lookup: FxHashMap<InstrId, usize>,
    expressions: Vec<Expression>,
    expression_lookup: FxHashMap<Expression, usize>,
    du_chains: Vec<(InstrId, NameId)>,
    du_lookup: FxHashMap<(InstrId, NameId), usize>,

    loops: BTreeMap<BlockId, BitSet>,
    invariants: BTreeMap<BlockId, Vec<InstrId>>,
    induction_vars: BTreeMap<BlockId, Vec<InductionVar>>,
}

impl AnalysisState {
    /// Creates a state holding only the `Entry` and `Exit` sentinels.
    pub(crate) fn new() -> Self {
        let mut state = Self {
            names: Vec::new(),
            name_lookup: FxHashMap::default(),
            instrs: Vec::new(),
            instr_order: Vec::new(),
            blocks: Vec::new(),
            block_order: Vec::new(),
            entry: BlockId::new(0),
            exit: BlockId::new(1),
            shape: 0,
            dom_shape: None,
            definitions: Vec::new(),
            definition_lookup: FxHashMap::default(),
            expressions: Vec::new(),
            expression_lookup: FxHashMap::default(),
            du_chains: Vec::new(),
            du_lookup: FxHashMap::default(),
            loops: BTreeMap::new(),
            invariants: BTreeMap::new(),
            induction_vars: BTreeMap::new(),
        };
        state.entry = state.add_block();
        state.exit = state.add_block();
        state
    }

    // Names

    /// Interns `name`, returning the existing index if it is already known.
    pub fn intern(&mut self, name: &str) -> NameId {
        if let Some(&id) = self.name_lookup.get(name) {
            return id;
        }
        let id = NameId::new(self.names.len());
        self.names.push(name.to_string());
        self.name_lookup.insert(name.to_string(), id);
        id
    }

    /// Returns the index of an already interned name.
    #[must_use]
    pub fn lookup_name(&self, name: &str) -> Option<NameId> {
        self.name_lookup.get(name).copied()
    }

    /// Returns the text of an interned name.
    #[must_use]
    pub fn name(&self, id: NameId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    /// Returns the number of interned names (the live-variable universe).
    #[must_use]
    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    /// Interns the first name `{prefix}1`, `{prefix}2`, ... not yet in use.
    pub fn fresh_name(&mut self, prefix: &str) -> NameId {
        let mut counter = 1usize;
        loop {
            let candidate = format!("{prefix}{counter}");
            if !self.name_lookup.contains_key(&candidate) {
                return self.intern(&candidate);
            }
            counter += 1;
        }
    }

    // Blocks

    /// Returns the synthetic entry block.
    #[must_use]
    pub const fn entry(&self) -> BlockId {
        self.entry
    }

    /// Returns the synthetic exit block.
    #[must_use]
    pub const fn exit(&self) -> BlockId {
        self.exit
    }

    /// Returns `true` for `Entry` and `Exit`.
    #[must_use]
    pub fn is_sentinel(&self, block: BlockId) -> bool {
        block == self.entry || block == self.exit
    }

    /// Returns the live blocks in block order.
    #[must_use]
    pub fn block_order(&self) -> &[BlockId] {
        &self.block_order
    }

    /// Returns the size of the block arena, the universe of block sets.
    #[must_use]
    pub fn block_capacity(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the number of live blocks, sentinels included.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.block_order.len()
    }

    /// Returns `true` if `block` refers to a live block.
    #[must_use]
    pub fn contains_block(&self, block: BlockId) -> bool {
        matches!(self.blocks.get(block.index()), Some(Some(_)))
    }

    /// Returns a live block.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] for a dangling handle.
    pub fn block(&self, block: BlockId) -> Result<&BasicBlock> {
        match self.blocks.get(block.index()) {
            Some(Some(bb)) => Ok(bb),
            _ => Err(invariant_error!("dangling block handle {}", block)),
        }
    }

    /// Returns a live block mutably.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] for a dangling handle.
    pub fn block_mut(&mut self, block: BlockId) -> Result<&mut BasicBlock> {
        match self.blocks.get_mut(block.index()) {
            Some(Some(bb)) => Ok(bb),
            _ => Err(invariant_error!("dangling block handle {}", block)),
        }
    }

    /// Returns the set of live blocks over the block arena.
    #[must_use]
    pub fn live_blocks(&self) -> BitSet {
        let mut set = BitSet::new(self.block_capacity());
        for &block in &self.block_order {
            set.insert(block.index());
        }
        set
    }

    /// Returns `true` if the stored `dom` sets were computed for the current
    /// block graph.
    #[must_use]
    pub fn dominators_current(&self) -> bool {
        self.dom_shape == Some(self.shape)
    }

    pub(crate) fn mark_dominators_current(&mut self) {
        self.dom_shape = Some(self.shape);
    }

    /// Allocates an empty block at the end of the block order.
    pub(crate) fn add_block(&mut self) -> BlockId {
        self.shape += 1;
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(Some(BasicBlock::default()));
        self.block_order.push(id);
        id
    }

    /// Allocates an empty block placed right before `anchor` in block order.
    pub(crate) fn insert_block_before(&mut self, anchor: BlockId) -> Result<BlockId> {
        let position = self.block_position(anchor)?;
        self.shape += 1;
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(Some(BasicBlock::default()));
        self.block_order.insert(position, id);
        Ok(id)
    }

    /// Allocates an empty block placed right after `anchor` in block order.
    pub(crate) fn insert_block_after(&mut self, anchor: BlockId) -> Result<BlockId> {
        let position = self.block_position(anchor)?;
        self.shape += 1;
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(Some(BasicBlock::default()));
        self.block_order.insert(position + 1, id);
        Ok(id)
    }

    /// Removes a block from the arena and the block order.
    ///
    /// The caller is responsible for detaching edges and instructions first.
    pub(crate) fn remove_block(&mut self, block: BlockId) -> Result<BasicBlock> {
        let position = self.block_position(block)?;
        self.shape += 1;
        self.block_order.remove(position);
        self.blocks
            .get_mut(block.index())
            .and_then(Option::take)
            .ok_or_else(|| invariant_error!("dangling block handle {}", block))
    }

    fn block_position(&self, block: BlockId) -> Result<usize> {
        self.block_order
            .iter()
            .position(|&b| b == block)
            .ok_or_else(|| invariant_error!("block {} is not in block order", block))
    }

    /// Adds the edge `from -> to` to both adjacency lists.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if either block is dangling.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId) -> Result<()> {
        self.block(to)?;
        self.shape += 1;
        self.block_mut(from)?.succs.push(to);
        self.block_mut(to)?.preds.push(from);
        Ok(())
    }

    // Instructions

    /// Returns the live instructions in global program order.
    #[must_use]
    pub fn instruction_order(&self) -> &[InstrId] {
        &self.instr_order
    }

    /// Returns the number of live instructions.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.instr_order.len()
    }

    /// Returns `true` if `instr` refers to a live instruction.
    #[must_use]
    pub fn contains_instr(&self, instr: InstrId) -> bool {
        matches!(self.instrs.get(instr.index()), Some(Some(_)))
    }

    /// Returns a live instruction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] for a dangling handle.
    pub fn instr(&self, instr: InstrId) -> Result<&Instruction> {
        match self.instrs.get(instr.index()) {
            Some(Some(i)) => Ok(i),
            _ => Err(invariant_error!("dangling instruction handle {}", instr)),
        }
    }

    /// Returns a live instruction mutably.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] for a dangling handle.
    pub fn instr_mut(&mut self, instr: InstrId) -> Result<&mut Instruction> {
        match self.instrs.get_mut(instr.index()) {
            Some(Some(i)) => Ok(i),
            _ => Err(invariant_error!("dangling instruction handle {}", instr)),
        }
    }

    /// Returns every live instruction, in program order, for which `f` holds.
    pub fn instructions_where<F>(&self, mut f: F) -> Vec<InstrId>
    where
        F: FnMut(&Instruction) -> bool,
    {
        self.instr_order
            .iter()
            .copied()
            .filter(|&id| self.instr(id).is_ok_and(&mut f))
            .collect()
    }

    fn alloc_instr(&mut self, kind: InstructionKind, owner: BlockId) -> InstrId {
        let id = InstrId::new(self.instrs.len());
        self.instrs.push(Some(Instruction::new(kind, owner)));
        id
    }

    /// Appends an instruction to the end of `block`.
    ///
    /// The instruction is placed in the global order right after the last
    /// instruction of the nearest non-empty block at or before `block`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] for a dangling or sentinel
    /// block.
    pub fn append_instr(&mut self, block: BlockId, kind: InstructionKind) -> Result<InstrId> {
        if self.is_sentinel(block) {
            return Err(invariant_error!(
                "sentinel block {} cannot hold instructions",
                self.block_name(block)
            ));
        }
        let position = self.block_position(block)?;
        let anchor = self.block_order[..=position]
            .iter()
            .rev()
            .find_map(|&b| self.block(b).ok().and_then(|bb| bb.instrs.last().copied()));
        let global = match anchor {
            Some(anchor) => self.order_position(anchor)? + 1,
            None => 0,
        };

        let id = self.alloc_instr(kind, block);
        self.block_mut(block)?.instrs.push(id);
        self.instr_order.insert(global, id);
        Ok(id)
    }

    /// Inserts an instruction right after `anchor`, in its block and in the
    /// global order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] for a dangling anchor.
    pub fn insert_instr_after(&mut self, anchor: InstrId, kind: InstructionKind) -> Result<InstrId> {
        let owner = self.instr(anchor)?.owner;
        let local = self.local_position(owner, anchor)?;
        let global = self.order_position(anchor)?;

        let id = self.alloc_instr(kind, owner);
        self.block_mut(owner)?.instrs.insert(local + 1, id);
        self.instr_order.insert(global + 1, id);
        Ok(id)
    }

    /// Removes an instruction from its block, the global order and the arena.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if the instruction is
    /// dangling or missing from either list.
    pub fn remove_instr(&mut self, instr: InstrId) -> Result<Instruction> {
        let owner = self.instr(instr)?.owner;
        let local = self.local_position(owner, instr)?;
        let global = self.order_position(instr)?;

        self.block_mut(owner)?.instrs.remove(local);
        self.instr_order.remove(global);
        self.instrs
            .get_mut(instr.index())
            .and_then(Option::take)
            .ok_or_else(|| invariant_error!("dangling instruction handle {}", instr))
    }

    /// Moves `instr` to the end of `block` without touching the global order.
    pub(crate) fn move_instr_to(&mut self, instr: InstrId, block: BlockId) -> Result<()> {
        let owner = self.instr(instr)?.owner;
        let local = self.local_position(owner, instr)?;
        self.block_mut(owner)?.instrs.remove(local);
        self.block_mut(block)?.instrs.push(instr);
        self.instr_mut(instr)?.owner = block;
        Ok(())
    }

    /// Rebuilds the global order as the concatenation of the blocks'
    /// instruction lists in block order.
    pub(crate) fn resync_instruction_order(&mut self) -> Result<()> {
        let mut order = Vec::with_capacity(self.instr_order.len());
        for &block in &self.block_order {
            order.extend_from_slice(&self.block(block)?.instrs);
        }
        if order.len() != self.instr_order.len() {
            return Err(invariant_error!(
                "blocks list {} instructions, program order holds {}",
                order.len(),
                self.instr_order.len()
            ));
        }
        self.instr_order = order;
        Ok(())
    }

    fn local_position(&self, block: BlockId, instr: InstrId) -> Result<usize> {
        self.block(block)?
            .instrs
            .iter()
            .position(|&i| i == instr)
            .ok_or_else(|| {
                invariant_error!("instruction {} is not listed by its owner {}", instr, block)
            })
    }

    fn order_position(&self, instr: InstrId) -> Result<usize> {
        self.instr_order
            .iter()
            .position(|&i| i == instr)
            .ok_or_else(|| invariant_error!("instruction {} is not in program order", instr))
    }

    // Derived tables

    /// Rebuilds `definitions`, `expressions` and `du_chains` from scratch.
    ///
    /// `definitions` and `expressions` follow the global instruction order;
    /// `du_chains` follows block order. Duplicates keep their first index.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] for a dangling handle.
    pub fn rebuild_tables(&mut self) -> Result<()> {
        let mut definitions = Vec::new();
        let mut definition_lookup = FxHashMap::default();
        let mut expressions = Vec::new();
        let mut expression_lookup = FxHashMap::default();
        for &id in &self.instr_order {
            let instr = self.instr(id)?;
            if !instr.is_definition() {
                continue;
            }
            definition_lookup.insert(id, definitions.len());
            definitions.push(id);
            if let Some(expr) = instr.binary_expr() {
                if !expression_lookup.contains_key(expr) {
                    expression_lookup.insert(*expr, expressions.len());
                    expressions.push(*expr);
                }
            }
        }

        let mut du_chains = Vec::new();
        let mut du_lookup = FxHashMap::default();
        for &block in &self.block_order {
            for &id in &self.block(block)?.instrs {
                for var in self.instr(id)?.used_vars() {
                    if !du_lookup.contains_key(&(id, var)) {
                        du_lookup.insert((id, var), du_chains.len());
                        du_chains.push((id, var));
                    }
                }
            }
        }

        self.definitions = definitions;
        self.definition_lookup = definition_lookup;
        self.expressions = expressions;
        self.expression_lookup = expression_lookup;
        self.du_chains = du_chains;
        self.du_lookup = du_lookup;
        Ok(())
    }

    /// Returns the `definitions` table.
    #[must_use]
    pub fn definitions(&self) -> &[InstrId] {
        &self.definitions
    }

    /// Returns the `definitions` index of an instruction.
    #[must_use]
    pub fn definition_index(&self, instr: InstrId) -> Option<usize> {
        self.definition_lookup.get(&instr).copied()
    }

    /// Like [`definition_index`](Self::definition_index), but a missing
    /// entry is a contract violation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if the instruction was not
    /// registered.
    pub fn require_definition(&self, instr: InstrId) -> Result<usize> {
        self.definition_index(instr)
            .ok_or_else(|| invariant_error!("instruction {} missing from definitions", instr))
    }

    /// Returns the `expressions` table.
    #[must_use]
    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    /// Returns the `expressions` index of an expression.
    #[must_use]
    pub fn expression_index(&self, expr: &Expression) -> Option<usize> {
        self.expression_lookup.get(expr).copied()
    }

    /// Like [`expression_index`](Self::expression_index), but a missing
    /// entry is a contract violation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] if the expression was not
    /// registered.
    pub fn require_expression(&self, expr: &Expression) -> Result<usize> {
        self.expression_index(expr).ok_or_else(|| {
            invariant_error!(
                "expression '{}' missing from expressions",
                self.display_expression(expr)
            )
        })
    }

    /// Returns the `du_chains` table.
    #[must_use]
    pub fn du_chains(&self) -> &[(InstrId, NameId)] {
        &self.du_chains
    }

    /// Returns the `du_chains` index of a use.
    #[must_use]
    pub fn du_index(&self, instr: InstrId, var: NameId) -> Option<usize> {
        self.du_lookup.get(&(instr, var)).copied()
    }

    /// Groups the `definitions` indices by the variable they write.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] for a dangling handle.
    pub fn definitions_by_var(&self) -> Result<FxHashMap<NameId, Vec<usize>>> {
        let mut map: FxHashMap<NameId, Vec<usize>> = FxHashMap::default();
        for (index, &id) in self.definitions.iter().enumerate() {
            if let Some(var) = self.instr(id)?.defined_var() {
                map.entry(var).or_default().push(index);
            }
        }
        Ok(map)
    }

    // Loop results

    /// Returns the latest natural loops, header to member blocks.
    #[must_use]
    pub fn loops(&self) -> &BTreeMap<BlockId, BitSet> {
        &self.loops
    }

    pub(crate) fn set_loops(&mut self, loops: BTreeMap<BlockId, BitSet>) {
        self.loops = loops;
    }

    /// Returns the latest loop-invariant computations, per loop header.
    #[must_use]
    pub fn invariants(&self) -> &BTreeMap<BlockId, Vec<InstrId>> {
        &self.invariants
    }

    pub(crate) fn set_invariants(&mut self, invariants: BTreeMap<BlockId, Vec<InstrId>>) {
        self.invariants = invariants;
    }

    /// Returns the latest induction variables, per loop header.
    #[must_use]
    pub fn induction_vars(&self) -> &BTreeMap<BlockId, Vec<InductionVar>> {
        &self.induction_vars
    }

    pub(crate) fn set_induction_vars(&mut self, vars: BTreeMap<BlockId, Vec<InductionVar>>) {
        self.induction_vars = vars;
    }

    // Display helpers

    /// Returns the report name of a block: `Entry`, `Exit` or `BBn`, where `n`
    /// counts the non-sentinel blocks in block order from one.
    #[must_use]
    pub fn block_name(&self, block: BlockId) -> String {
        if block == self.entry {
            return "Entry".to_string();
        }
        if block == self.exit {
            return "Exit".to_string();
        }
        self.block_order
            .iter()
            .filter(|&&b| !self.is_sentinel(b))
            .position(|&b| b == block)
            .map_or_else(|| format!("<{block}>"), |n| format!("BB{}", n + 1))
    }

    fn display_name(&self, id: NameId) -> String {
        self.name(id)
            .map_or_else(|| id.to_string(), ToString::to_string)
    }

    /// Renders an operand in its textual form.
    #[must_use]
    pub fn display_operand(&self, operand: &Operand) -> String {
        match operand {
            Operand::Const(value) => value.to_string(),
            Operand::Var(name) => self.display_name(*name),
            Operand::Array { base, index } => {
                let index = match index {
                    Subscript::Const(value) => value.to_string(),
                    Subscript::Var(name) => self.display_name(*name),
                };
                format!("{}[{}]", self.display_name(*base), index)
            }
        }
    }

    /// Renders an expression as `lhs op rhs`.
    #[must_use]
    pub fn display_expression(&self, expr: &Expression) -> String {
        format!(
            "{} {} {}",
            self.display_operand(&expr.lhs),
            expr.op,
            self.display_operand(&expr.rhs)
        )
    }

    /// Renders an instruction kind in its textual form.
    #[must_use]
    pub fn display_kind(&self, kind: &InstructionKind) -> String {
        match kind {
            InstructionKind::Unary { result, operand } => format!(
                "{} = {}",
                self.display_operand(result),
                self.display_operand(operand)
            ),
            InstructionKind::Binary { result, expr } => format!(
                "{} = {}",
                self.display_operand(result),
                self.display_expression(expr)
            ),
            InstructionKind::Cond {
                expr,
                on_true,
                on_false,
            } => format!(
                "ifTrue {} goto {} else goto {}",
                self.display_expression(expr),
                self.display_name(*on_true),
                self.display_name(*on_false)
            ),
            InstructionKind::Uncond { target } => format!("goto {}", self.display_name(*target)),
            InstructionKind::Label { name } => format!("{}:", self.display_name(*name)),
            InstructionKind::Return { operand } => {
                format!("return {}", self.display_operand(operand))
            }
        }
    }

    /// Renders an instruction in its textual form.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvariantViolation`] for a dangling handle.
    pub fn display_instruction(&self, instr: InstrId) -> Result<String> {
        Ok(self.display_kind(&self.instr(instr)?.kind))
    }

    /// Writes the whole IR, block by block, with successor lists.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Report`] if the sink fails, or
    /// [`crate::Error::InvariantViolation`] for a dangling handle.
    pub fn write_ir(&self, out: &mut dyn fmt::Write) -> Result<()> {
        for &block in &self.block_order {
            let bb = self.block(block)?;
            let succs: Vec<String> = bb.succs.iter().map(|&s| self.block_name(s)).collect();
            writeln!(out, "{} -> [{}]", self.block_name(block), succs.join(", "))?;
            for &id in &bb.instrs {
                writeln!(out, "    {}", self.display_instruction(id)?)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ir::BinaryOp, Error};

    fn copy(x: NameId, y: NameId) -> InstructionKind {
        InstructionKind::Unary {
            result: Operand::Var(x),
            operand: Operand::Var(y),
        }
    }

    #[test]
    fn test_intern_and_fresh_names() {
        let mut state = AnalysisState::new();
        let a = state.intern("a");
        assert_eq!(state.intern("a"), a);
        state.intern("cse1");
        let fresh = state.fresh_name("cse");
        assert_eq!(state.name(fresh), Some("cse2"));
        assert_eq!(state.lookup_name("cse2"), Some(fresh));
    }

    #[test]
    fn test_append_keeps_global_order_aligned() {
        let mut state = AnalysisState::new();
        let x = state.intern("x");
        let y = state.intern("y");
        let b1 = state.add_block();
        let b2 = state.add_block();

        let i2 = state.append_instr(b2, copy(x, y)).unwrap();
        let i1 = state.append_instr(b1, copy(y, x)).unwrap();
        let i3 = state.append_instr(b1, copy(x, x)).unwrap();

        assert_eq!(state.instruction_order(), &[i1, i3, i2]);
        assert_eq!(state.block(b1).unwrap().instructions(), &[i1, i3]);
        assert_eq!(state.instr(i3).unwrap().owner(), b1);
    }

    #[test]
    fn test_remove_instr_is_atomic() {
        let mut state = AnalysisState::new();
        let x = state.intern("x");
        let b1 = state.add_block();
        let i1 = state.append_instr(b1, copy(x, x)).unwrap();
        let i2 = state.insert_instr_after(i1, copy(x, x)).unwrap();

        state.remove_instr(i1).unwrap();
        assert_eq!(state.instruction_order(), &[i2]);
        assert_eq!(state.block(b1).unwrap().instructions(), &[i2]);
        assert!(!state.contains_instr(i1));
        assert!(matches!(
            state.remove_instr(i1),
            Err(Error::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_sentinels_reject_instructions() {
        let mut state = AnalysisState::new();
        let x = state.intern("x");
        let entry = state.entry();
        assert!(state.append_instr(entry, copy(x, x)).is_err());
        assert_eq!(state.block_name(entry), "Entry");
        assert_eq!(state.block_name(state.exit()), "Exit");
    }

    #[test]
    fn test_rebuild_tables_deduplicates() {
        let mut state = AnalysisState::new();
        let a = state.intern("a");
        let b = state.intern("b");
        let c = state.intern("c");
        let b1 = state.add_block();
        let expr = Expression::new(BinaryOp::Add, Operand::Var(a), Operand::Var(b));
        let i1 = state
            .append_instr(
                b1,
                InstructionKind::Binary {
                    result: Operand::Var(c),
                    expr,
                },
            )
            .unwrap();
        let i2 = state
            .append_instr(
                b1,
                InstructionKind::Binary {
                    result: Operand::Var(a),
                    expr,
                },
            )
            .unwrap();
        state.rebuild_tables().unwrap();

        assert_eq!(state.definitions(), &[i1, i2]);
        assert_eq!(state.expressions().len(), 1);
        assert_eq!(state.expression_index(&expr), Some(0));
        assert_eq!(state.du_chains().len(), 4);
        assert_eq!(state.du_index(i2, b), Some(3));
        assert_eq!(state.display_instruction(i1).unwrap(), "c = a + b");
    }

    #[test]
    fn test_block_names_follow_order() {
        let mut state = AnalysisState::new();
        let b1 = state.add_block();
        let b0 = state.insert_block_before(b1).unwrap();
        assert_eq!(state.block_name(b0), "BB1");
        assert_eq!(state.block_name(b1), "BB2");
        assert_eq!(state.live_blocks().count(), 4);
    }
}
