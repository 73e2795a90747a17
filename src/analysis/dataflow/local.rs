//! Per-block local sets.
//!
//! [`compute_local_sets`] rebuilds the derived tables and then, for every
//! block except the sentinels, the ten local sets every global analysis
//! consumes:
//!
//! | Sets              | Universe      | Scan     | Consumer                |
//! |-------------------|---------------|----------|-------------------------|
//! | `gen` / `kill`    | definitions   | backward | reaching definitions    |
//! | `uses` / `defs`   | names         | forward  | live variables          |
//! | `e_gen` / `e_kill`| expressions   | forward  | available expressions   |
//! | `c_gen` / `c_kill`| definitions   | forward  | reaching copies         |
//! | `du_use`/`du_def` | du_chains     | forward  | definition-use chains   |
//!
//! Every fixpoint set of every block is reset to the empty set of the new
//! universe at the same time, so no stale set survives a table rebuild. The
//! dominator sets do not depend on the tables and are kept as long as the
//! block arena has not grown; otherwise they are cleared to length zero.

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::{
    ir::{AnalysisState, BlockFacts, BlockId, NameId},
    utils::BitSet,
    Result,
};

/// Universe sizes captured after a table rebuild.
#[derive(Debug, Clone, Copy)]
struct Universes {
    definitions: usize,
    names: usize,
    expressions: usize,
    du_chains: usize,
    blocks: usize,
}

impl Universes {
    fn empty_facts(self) -> BlockFacts {
        let defs = BitSet::new(self.definitions);
        let names = BitSet::new(self.names);
        let exprs = BitSet::new(self.expressions);
        let uses = BitSet::new(self.du_chains);
        BlockFacts {
            gen: defs.clone(),
            kill: defs.clone(),
            uses: names.clone(),
            defs: names.clone(),
            e_gen: exprs.clone(),
            e_kill: exprs.clone(),
            c_gen: defs.clone(),
            c_kill: defs.clone(),
            du_use: uses.clone(),
            du_def: uses.clone(),
            in_rd: defs.clone(),
            out_rd: defs.clone(),
            in_lv: names.clone(),
            out_lv: names,
            e_in: exprs.clone(),
            e_out: exprs,
            dom: BitSet::default(),
            c_in: defs.clone(),
            c_out: defs,
            du_in: uses.clone(),
            du_out: uses,
        }
    }
}

/// Lookup tables shared by the per-block scans.
struct Index {
    /// Variable -> `definitions` indices writing it.
    defs_by_var: FxHashMap<NameId, Vec<usize>>,
    /// Variable -> `expressions` indices reading it.
    exprs_by_var: FxHashMap<NameId, Vec<usize>>,
    /// Variable -> copies `x = y` with the variable as `x` or `y`.
    copies_by_var: FxHashMap<NameId, Vec<usize>>,
}

impl Index {
    fn build(state: &AnalysisState) -> Result<Self> {
        let defs_by_var = state.definitions_by_var()?;

        let mut exprs_by_var: FxHashMap<NameId, Vec<usize>> = FxHashMap::default();
        for (index, expr) in state.expressions().iter().enumerate() {
            for var in expr.read_vars() {
                let list = exprs_by_var.entry(var).or_default();
                if !list.contains(&index) {
                    list.push(index);
                }
            }
        }

        let mut copies_by_var: FxHashMap<NameId, Vec<usize>> = FxHashMap::default();
        for (index, &id) in state.definitions().iter().enumerate() {
            if let Some((x, y)) = state.instr(id)?.copy_pair() {
                copies_by_var.entry(x).or_default().push(index);
                if y != x {
                    copies_by_var.entry(y).or_default().push(index);
                }
            }
        }

        Ok(Self {
            defs_by_var,
            exprs_by_var,
            copies_by_var,
        })
    }

    fn defs_of(&self, var: NameId) -> &[usize] {
        self.defs_by_var.get(&var).map_or(&[], Vec::as_slice)
    }

    fn exprs_of(&self, var: NameId) -> &[usize] {
        self.exprs_by_var.get(&var).map_or(&[], Vec::as_slice)
    }

    fn copies_of(&self, var: NameId) -> &[usize] {
        self.copies_by_var.get(&var).map_or(&[], Vec::as_slice)
    }
}

/// Rebuilds the derived tables and every block's local sets.
///
/// Must run after any IR mutation and before any global analysis.
///
/// # Errors
///
/// Returns [`crate::Error::InvariantViolation`] for a dangling handle or an
/// instruction missing from a table it should be registered in.
pub fn compute_local_sets(state: &mut AnalysisState) -> Result<()> {
    state.rebuild_tables()?;

    let universes = Universes {
        definitions: state.definitions().len(),
        names: state.name_count(),
        expressions: state.expressions().len(),
        du_chains: state.du_chains().len(),
        blocks: state.block_capacity(),
    };
    let index = Index::build(state)?;

    let order = state.block_order().to_vec();
    for block in order {
        let mut facts = if state.is_sentinel(block) {
            universes.empty_facts()
        } else {
            let mut facts = universes.empty_facts();
            block_sets(state, block, &index, universes, &mut facts)?;
            trace!(
                "{}: gen {:?} kill {:?} use {:?} def {:?}",
                state.block_name(block),
                facts.gen,
                facts.kill,
                facts.uses,
                facts.defs
            );
            facts
        };
        let bb = state.block_mut(block)?;
        if bb.facts.dom.len() == universes.blocks {
            facts.dom = std::mem::take(&mut bb.facts.dom);
        }
        bb.facts = facts;
    }

    debug!(
        "local sets: {} definitions, {} expressions, {} uses, {} names",
        universes.definitions, universes.expressions, universes.du_chains, universes.names
    );
    Ok(())
}

fn block_sets(
    state: &AnalysisState,
    block: BlockId,
    index: &Index,
    universes: Universes,
    facts: &mut BlockFacts,
) -> Result<()> {
    let instrs = state.block(block)?.instructions();

    // gen / kill, scanning backward
    for &id in instrs.iter().rev() {
        let instr = state.instr(id)?;
        let Some(var) = instr.defined_var() else {
            continue;
        };
        let own = state.require_definition(id)?;
        if !facts.kill.contains(own) {
            facts.gen.insert(own);
        }
        for &other in index.defs_of(var) {
            if other != own {
                facts.kill.insert(other);
            }
        }
    }

    // uses / defs
    for &id in instrs {
        let instr = state.instr(id)?;
        for var in instr.used_vars() {
            if !facts.defs.contains(var.index()) {
                facts.uses.insert(var.index());
            }
        }
        if let Some(var) = instr.defined_var() {
            facts.defs.insert(var.index());
        }
    }

    // e_gen / e_kill
    for &id in instrs {
        let instr = state.instr(id)?;
        if let Some(expr) = instr.binary_expr() {
            let e = state.require_expression(expr)?;
            facts.e_gen.insert(e);
            facts.e_kill.remove(e);
        }
        if let Some(var) = instr.defined_var() {
            for &e in index.exprs_of(var) {
                facts.e_gen.remove(e);
                facts.e_kill.insert(e);
            }
        }
    }

    // c_gen / c_kill
    for &id in instrs {
        let instr = state.instr(id)?;
        let Some(var) = instr.defined_var() else {
            continue;
        };
        for &c in index.copies_of(var) {
            facts.c_gen.remove(c);
            facts.c_kill.insert(c);
        }
        if instr.copy_pair().is_some() {
            let own = state.require_definition(id)?;
            facts.c_gen.insert(own);
            facts.c_kill.remove(own);
        }
    }
    for c in facts.c_kill.clone().iter() {
        let owner = state.instr(state.definitions()[c])?.owner();
        if owner == block {
            facts.c_kill.remove(c);
        }
    }

    // du_use / du_def
    let mut written = BitSet::new(universes.names);
    for &id in instrs {
        let instr = state.instr(id)?;
        for var in instr.used_vars() {
            if written.contains(var.index()) {
                continue;
            }
            let chain = state.du_index(id, var).ok_or_else(|| {
                invariant_error!("use of {} by {} missing from du_chains", var, id)
            })?;
            facts.du_use.insert(chain);
        }
        if let Some(var) = instr.defined_var() {
            written.insert(var.index());
        }
    }
    for (chain, &(use_instr, var)) in state.du_chains().iter().enumerate() {
        if written.contains(var.index()) && state.instr(use_instr)?.owner() != block {
            facts.du_def.insert(chain);
        }
    }

    Ok(())
}
