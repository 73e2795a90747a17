//! CFG rewrite integration tests.
//!
//! Block splitting, merging and preheader insertion must leave the graph
//! consistent: predecessor and successor lists agree, no instruction is lost
//! or duplicated, and the facts can be recomputed afterwards.

use tacflow::{
    analysis::{
        back_edges, compute_dominators, compute_local_sets, compute_reaching_definitions,
        insert_preheader, merge_blocks, natural_loops, split_blocks,
    },
    ir::{AnalysisState, BinaryOp, BlockId, CfgBuilder, Operand},
    Result,
};

struct Nest {
    state: AnalysisState,
    outer: BlockId,
    inner: BlockId,
    latch: BlockId,
}

/// Two nested loops:
///
/// ```text
/// BB1: i = 0
/// BB2: L1: j = 0
/// BB3: L2: j = j + 1; x = i * j; ifTrue j < 10 goto L2 else goto L3
/// BB4: L3: i = i + 1; ifTrue i < 10 goto L1 else goto L4
/// BB5: L4: return x
/// ```
fn nested_loops() -> Result<Nest> {
    let mut builder = CfgBuilder::new();
    let (init, outer, inner, latch, tail) = (
        builder.block(),
        builder.block(),
        builder.block(),
        builder.block(),
        builder.block(),
    );
    let (i, j, x) = (builder.var("i"), builder.var("j"), builder.var("x"));

    builder.assign(init, i, Operand::Const(0))?;
    builder.label(outer, "L1")?;
    builder.assign(outer, j, Operand::Const(0))?;
    builder.label(inner, "L2")?;
    builder.compute(inner, j, BinaryOp::Add, j, Operand::Const(1))?;
    builder.compute(inner, x, BinaryOp::Mul, i, j)?;
    builder.branch(inner, BinaryOp::Lt, j, Operand::Const(10), "L2", "L3")?;
    builder.label(latch, "L3")?;
    builder.compute(latch, i, BinaryOp::Add, i, Operand::Const(1))?;
    builder.branch(latch, BinaryOp::Lt, i, Operand::Const(10), "L1", "L4")?;
    builder.label(tail, "L4")?;
    builder.ret(tail, x)?;

    let (entry, exit) = (builder.entry(), builder.exit());
    builder
        .edge(entry, init)
        .edge(init, outer)
        .edge(outer, inner)
        .edge(inner, inner)
        .edge(inner, latch)
        .edge(latch, outer)
        .edge(latch, tail)
        .edge(tail, exit);

    Ok(Nest {
        state: builder.finish()?,
        outer,
        inner,
        latch,
    })
}

fn render(state: &AnalysisState) -> Result<String> {
    let mut out = String::new();
    state.write_ir(&mut out)?;
    Ok(out)
}

fn assert_edges_symmetric(state: &AnalysisState) -> Result<()> {
    for &block in state.block_order() {
        let bb = state.block(block)?;
        for &succ in bb.successors() {
            assert!(state.block(succ)?.predecessors().contains(&block));
        }
        for &pred in bb.predecessors() {
            assert!(state.block(pred)?.successors().contains(&block));
        }
    }
    Ok(())
}

#[test]
fn test_split_then_merge_round_trip() -> Result<()> {
    let mut fixture = nested_loops()?;
    let state = &mut fixture.state;
    let original = render(state)?;
    let instructions = state.instruction_order().to_vec();

    let created = split_blocks(state)?;
    assert!(created > 0);
    assert_edges_symmetric(state)?;
    assert_eq!(state.instruction_order(), instructions.as_slice());

    let removed = merge_blocks(state)?;
    assert_eq!(created, removed);
    assert_edges_symmetric(state)?;
    assert_eq!(render(state)?, original);
    Ok(())
}

#[test]
fn test_natural_loops_of_a_nest() -> Result<()> {
    let mut fixture = nested_loops()?;
    let state = &mut fixture.state;
    compute_dominators(state)?;

    let edges = back_edges(state)?;
    assert!(edges.contains(&(fixture.inner, fixture.inner)));
    assert!(edges.contains(&(fixture.latch, fixture.outer)));

    let loops = natural_loops(state)?;
    assert_eq!(loops.len(), 2);
    let inner = &loops[&fixture.inner];
    assert_eq!(inner.count(), 1);
    let outer = &loops[&fixture.outer];
    assert_eq!(outer.count(), 3);
    for block in [fixture.outer, fixture.inner, fixture.latch] {
        assert!(outer.contains(block.index()));
    }
    Ok(())
}

#[test]
fn test_preheader_takes_only_entering_edges() -> Result<()> {
    let mut fixture = nested_loops()?;
    let state = &mut fixture.state;
    compute_dominators(state)?;
    let loops = natural_loops(state)?;

    let preheader = insert_preheader(state, fixture.inner, &loops[&fixture.inner])?;
    assert_edges_symmetric(state)?;
    assert_eq!(state.block(preheader)?.successors(), &[fixture.inner]);
    assert_eq!(state.block(preheader)?.predecessors(), &[fixture.outer]);

    let header = state.block(fixture.inner)?;
    assert!(header.predecessors().contains(&fixture.inner));
    assert!(header.predecessors().contains(&preheader));
    assert!(!header.predecessors().contains(&fixture.outer));

    let order = state.block_order();
    let position = |b: BlockId| order.iter().position(|&o| o == b).unwrap();
    assert_eq!(position(preheader) + 1, position(fixture.inner));

    // the grown graph is re-analyzable
    compute_local_sets(state)?;
    compute_reaching_definitions(state)?;
    compute_dominators(state)?;
    assert_eq!(natural_loops(state)?.len(), 2);

    // an empty preheader merges back into its predecessor
    assert_eq!(merge_blocks(state)?, 1);
    assert!(!state.contains_block(preheader));
    Ok(())
}
