//! Text rendering of analysis facts for verbose passes.
//!
//! Every writer emits one section per block (sentinels excluded unless the
//! facts of a sentinel are meaningful) using the display helpers of
//! [`AnalysisState`]. Set members are separated by single spaces:
//!
//! ```text
//! BB2:
//! In_Rd  : (i, BB1) (i, BB3)
//! Out_Rd : (i, BB1) (i, BB3)
//! ```

use std::fmt;

use crate::{
    analysis::InductionVar,
    ir::{AnalysisState, BlockId, NameId},
    utils::BitSet,
    Result,
};

fn write_set<I>(out: &mut dyn fmt::Write, prefix: &str, items: I) -> Result<()>
where
    I: IntoIterator<Item = String>,
{
    let items: Vec<String> = items.into_iter().collect();
    writeln!(out, "{prefix}{}", items.join(" "))?;
    Ok(())
}

/// `(x, BB2)` for every definition in `set`.
fn definitions(state: &AnalysisState, set: &BitSet) -> Result<Vec<String>> {
    let mut items = Vec::with_capacity(set.count());
    for index in set.iter() {
        let id = state
            .definitions()
            .get(index)
            .copied()
            .ok_or_else(|| invariant_error!("definition {} out of range", index))?;
        let instr = state.instr(id)?;
        let var = instr
            .result()
            .map_or_else(String::new, |r| state.display_operand(r));
        items.push(format!("({}, {})", var, state.block_name(instr.owner())));
    }
    Ok(items)
}

/// `(x = y, BB2)` for every copy in `set`.
fn copies(state: &AnalysisState, set: &BitSet) -> Result<Vec<String>> {
    let mut items = Vec::with_capacity(set.count());
    for index in set.iter() {
        let id = state
            .definitions()
            .get(index)
            .copied()
            .ok_or_else(|| invariant_error!("definition {} out of range", index))?;
        let owner = state.instr(id)?.owner();
        items.push(format!(
            "({}, {})",
            state.display_instruction(id)?,
            state.block_name(owner)
        ));
    }
    Ok(items)
}

fn names(state: &AnalysisState, set: &BitSet) -> Vec<String> {
    set.iter()
        .map(|i| {
            state
                .name(NameId::new(i))
                .unwrap_or("?")
                .to_string()
        })
        .collect()
}

fn expressions(state: &AnalysisState, set: &BitSet) -> Vec<String> {
    set.iter()
        .filter_map(|i| state.expressions().get(i))
        .map(|e| format!("({})", state.display_expression(e)))
        .collect()
}

/// `(z = x + s ; x)` for every use in `set`.
fn uses(state: &AnalysisState, set: &BitSet) -> Result<Vec<String>> {
    let mut items = Vec::with_capacity(set.count());
    for index in set.iter() {
        let &(instr, var) = state
            .du_chains()
            .get(index)
            .ok_or_else(|| invariant_error!("use {} out of range", index))?;
        items.push(format!(
            "({} ; {})",
            state.display_instruction(instr)?,
            state.name(var).unwrap_or("?")
        ));
    }
    Ok(items)
}

fn blocks(state: &AnalysisState, set: &BitSet) -> Vec<String> {
    state
        .block_order()
        .iter()
        .filter(|b| set.contains(b.index()))
        .map(|&b| state.block_name(b))
        .collect()
}

fn analysed_blocks(state: &AnalysisState) -> Vec<BlockId> {
    state
        .block_order()
        .iter()
        .copied()
        .filter(|&b| !state.is_sentinel(b))
        .collect()
}

/// Local sets, reaching copies and du-chains of every block.
pub(crate) fn write_sets(state: &AnalysisState, out: &mut dyn fmt::Write) -> Result<()> {
    for block in analysed_blocks(state) {
        let facts = state.block(block)?.facts();
        writeln!(out, "{}:", state.block_name(block))?;
        write_set(out, "Gen    : ", definitions(state, &facts.gen)?)?;
        write_set(out, "Kill   : ", definitions(state, &facts.kill)?)?;
        write_set(out, "Use    : ", names(state, &facts.uses))?;
        write_set(out, "Def    : ", names(state, &facts.defs))?;
        write_set(out, "e_Gen  : ", expressions(state, &facts.e_gen))?;
        write_set(out, "e_Kill : ", expressions(state, &facts.e_kill))?;
        write_set(out, "c_Gen  : ", copies(state, &facts.c_gen)?)?;
        write_set(out, "c_Kill : ", copies(state, &facts.c_kill)?)?;
        write_set(out, "c_in   : ", copies(state, &facts.c_in)?)?;
        write_set(out, "c_out  : ", copies(state, &facts.c_out)?)?;
        write_set(out, "du_use : ", uses(state, &facts.du_use)?)?;
        write_set(out, "du_def : ", uses(state, &facts.du_def)?)?;
        write_set(out, "du_in  : ", uses(state, &facts.du_in)?)?;
        write_set(out, "du_out : ", uses(state, &facts.du_out)?)?;
        writeln!(out)?;
    }
    Ok(())
}

/// `in_rd`/`out_rd` of every block.
pub(crate) fn write_reaching(state: &AnalysisState, out: &mut dyn fmt::Write) -> Result<()> {
    for block in analysed_blocks(state) {
        let facts = state.block(block)?.facts();
        writeln!(out, "{}:", state.block_name(block))?;
        write_set(out, "In_Rd  : ", definitions(state, &facts.in_rd)?)?;
        write_set(out, "Out_Rd : ", definitions(state, &facts.out_rd)?)?;
    }
    Ok(())
}

/// `in_lv`/`out_lv` of every block.
pub(crate) fn write_liveness(state: &AnalysisState, out: &mut dyn fmt::Write) -> Result<()> {
    for block in analysed_blocks(state) {
        let facts = state.block(block)?.facts();
        writeln!(out, "{}:", state.block_name(block))?;
        write_set(out, "In_lv  : ", names(state, &facts.in_lv))?;
        write_set(out, "Out_lv : ", names(state, &facts.out_lv))?;
    }
    Ok(())
}

/// `e_in`/`e_out` of every block.
pub(crate) fn write_available(state: &AnalysisState, out: &mut dyn fmt::Write) -> Result<()> {
    for block in analysed_blocks(state) {
        let facts = state.block(block)?.facts();
        writeln!(out, "{}:", state.block_name(block))?;
        write_set(out, "e_In  : ", expressions(state, &facts.e_in))?;
        write_set(out, "e_Out : ", expressions(state, &facts.e_out))?;
    }
    Ok(())
}

/// `BB2 dom - Entry BB1 BB2` for every block, sentinels included.
pub(crate) fn write_dominators(state: &AnalysisState, out: &mut dyn fmt::Write) -> Result<()> {
    for &block in state.block_order() {
        let facts = state.block(block)?.facts();
        write_set(
            out,
            &format!("{} dom - ", state.block_name(block)),
            blocks(state, &facts.dom),
        )?;
    }
    Ok(())
}

/// `Header: BB2 Loop: BB2 BB3` for every stored loop.
pub(crate) fn write_loops(state: &AnalysisState, out: &mut dyn fmt::Write) -> Result<()> {
    for (&header, body) in state.loops() {
        write_set(
            out,
            &format!("Header: {} Loop: ", state.block_name(header)),
            blocks(state, body),
        )?;
    }
    Ok(())
}

/// The invariant computations of every stored loop.
pub(crate) fn write_invariants(state: &AnalysisState, out: &mut dyn fmt::Write) -> Result<()> {
    for (&header, found) in state.invariants() {
        writeln!(out, "Header: {}", state.block_name(header))?;
        for &id in found {
            writeln!(out, "    {}", state.display_instruction(id)?)?;
        }
    }
    Ok(())
}

fn induction_line(state: &AnalysisState, var: &InductionVar) -> Result<String> {
    let owner = state.instr(var.def)?.owner();
    Ok(format!(
        "{} in {} - {{{} -> ({}, {}, {})}}",
        state.display_instruction(var.def)?,
        state.block_name(owner),
        state.name(var.var).unwrap_or("?"),
        state.name(var.basis).unwrap_or("?"),
        var.c,
        var.d
    ))
}

/// The induction variables of every stored loop as `{var -> (basis, c, d)}`.
pub(crate) fn write_induction_vars(state: &AnalysisState, out: &mut dyn fmt::Write) -> Result<()> {
    for (&header, vars) in state.induction_vars() {
        writeln!(out, "Header: {}", state.block_name(header))?;
        for var in vars {
            writeln!(out, "    {}", induction_line(state, var)?)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            compute_dominators, compute_induction_variables, compute_local_sets,
            compute_natural_loops, compute_reaching_definitions,
        },
        test::{counting_loop, straight_line},
    };

    #[test]
    fn test_available_expressions_render() {
        let mut fixture = straight_line();
        let state = &mut fixture.state;
        compute_local_sets(state).unwrap();
        crate::analysis::compute_available_expressions(state).unwrap();

        let mut out = String::new();
        write_available(state, &mut out).unwrap();
        assert_eq!(out, "BB1:\ne_In  : \ne_Out : (a + b)\n");
    }

    #[test]
    fn test_induction_vars_render() {
        let mut fixture = counting_loop();
        let state = &mut fixture.state;
        compute_local_sets(state).unwrap();
        compute_reaching_definitions(state).unwrap();
        compute_dominators(state).unwrap();
        compute_natural_loops(state).unwrap();
        compute_induction_variables(state).unwrap();

        let mut out = String::new();
        write_induction_vars(state, &mut out).unwrap();
        assert!(out.starts_with("Header: BB2\n"));
        assert!(out.contains("j = i * 4 in BB3 - {j -> (i, 4, 0)}"));
        assert!(out.contains("i = i + 1 in BB3 - {i -> (i, 1, 0)}"));
    }

    #[test]
    fn test_dominators_render_sentinels() {
        let mut fixture = counting_loop();
        let state = &mut fixture.state;
        compute_dominators(state).unwrap();

        let mut out = String::new();
        write_dominators(state, &mut out).unwrap();
        let first = out.lines().next().unwrap();
        assert_eq!(first, "Entry dom - Entry");
        assert!(out.contains("BB3 dom - Entry BB1 BB2 BB3"));
    }
}
