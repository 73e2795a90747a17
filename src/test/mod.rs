//! IR fixtures shared by the unit tests.

use crate::ir::{AnalysisState, BinaryOp, BlockId, CfgBuilder, InstrId, Operand};

/// `a = 1; b = 2; c = a + b; d = a + b; return c` in a single block.
pub struct StraightLine {
    pub state: AnalysisState,
    pub body: BlockId,
    pub first_sum: InstrId,
    pub second_sum: InstrId,
}

pub fn straight_line() -> StraightLine {
    let mut builder = CfgBuilder::new();
    let body = builder.block();
    let (a, b, c, d) = (
        builder.var("a"),
        builder.var("b"),
        builder.var("c"),
        builder.var("d"),
    );
    builder.assign(body, a, Operand::Const(1)).unwrap();
    builder.assign(body, b, Operand::Const(2)).unwrap();
    let first_sum = builder.compute(body, c, BinaryOp::Add, a, b).unwrap();
    let second_sum = builder.compute(body, d, BinaryOp::Add, a, b).unwrap();
    builder.ret(body, c).unwrap();
    let (entry, exit) = (builder.entry(), builder.exit());
    builder.edge(entry, body).edge(body, exit);

    StraightLine {
        state: builder.finish().unwrap(),
        body,
        first_sum,
        second_sum,
    }
}

/// A counting loop:
///
/// ```text
/// BB1: i = 0; n = 10; a = 5
/// BB2: L1: ifTrue i < n goto L2 else goto L3
/// BB3: L2: t = n * 2; k = a + 1; a = i; i = i + 1; j = i * 4; goto L1
/// BB4: L3: return j
/// ```
pub struct CountingLoop {
    pub state: AnalysisState,
    pub init: BlockId,
    pub header: BlockId,
    pub body: BlockId,
    pub tail: BlockId,
    pub invariant: InstrId,
    pub mixed: InstrId,
    pub increment: InstrId,
    pub scaled: InstrId,
}

pub fn counting_loop() -> CountingLoop {
    let mut builder = CfgBuilder::new();
    let init = builder.block();
    let header = builder.block();
    let body = builder.block();
    let tail = builder.block();

    let (i, n, a, t, k, j) = (
        builder.var("i"),
        builder.var("n"),
        builder.var("a"),
        builder.var("t"),
        builder.var("k"),
        builder.var("j"),
    );

    builder.assign(init, i, Operand::Const(0)).unwrap();
    builder.assign(init, n, Operand::Const(10)).unwrap();
    builder.assign(init, a, Operand::Const(5)).unwrap();

    builder.label(header, "L1").unwrap();
    builder
        .branch(header, BinaryOp::Lt, i, n, "L2", "L3")
        .unwrap();

    builder.label(body, "L2").unwrap();
    let invariant = builder
        .compute(body, t, BinaryOp::Mul, n, Operand::Const(2))
        .unwrap();
    let mixed = builder
        .compute(body, k, BinaryOp::Add, a, Operand::Const(1))
        .unwrap();
    builder.assign(body, a, i).unwrap();
    let increment = builder
        .compute(body, i, BinaryOp::Add, i, Operand::Const(1))
        .unwrap();
    let scaled = builder
        .compute(body, j, BinaryOp::Mul, i, Operand::Const(4))
        .unwrap();
    builder.jump(body, "L1").unwrap();

    builder.label(tail, "L3").unwrap();
    builder.ret(tail, j).unwrap();

    let (entry, exit) = (builder.entry(), builder.exit());
    builder
        .edge(entry, init)
        .edge(init, header)
        .edge(header, body)
        .edge(header, tail)
        .edge(body, header)
        .edge(tail, exit);

    CountingLoop {
        state: builder.finish().unwrap(),
        init,
        header,
        body,
        tail,
        invariant,
        mixed,
        increment,
        scaled,
    }
}

/// A diamond: `BB1` branches to `BB2` and `BB3`, which both join in `BB4`.
///
/// ```text
/// BB1: x = y; ifTrue p < 0 goto L1 else goto L2
/// BB2: L1: s = a + b; goto L3
/// BB3: L2: s = a + b; goto L3
/// BB4: L3: r = a + b; z = x + s; return z
/// ```
pub struct Diamond {
    pub state: AnalysisState,
    pub split: BlockId,
    pub left: BlockId,
    pub right: BlockId,
    pub join: BlockId,
    pub copy: InstrId,
    pub joined_sum: InstrId,
}

pub fn diamond() -> Diamond {
    let mut builder = CfgBuilder::new();
    let split = builder.block();
    let left = builder.block();
    let right = builder.block();
    let join = builder.block();

    let (x, y, p, a, b, s, r, z) = (
        builder.var("x"),
        builder.var("y"),
        builder.var("p"),
        builder.var("a"),
        builder.var("b"),
        builder.var("s"),
        builder.var("r"),
        builder.var("z"),
    );

    let copy = builder.assign(split, x, y).unwrap();
    builder
        .branch(split, BinaryOp::Lt, p, Operand::Const(0), "L1", "L2")
        .unwrap();

    builder.label(left, "L1").unwrap();
    builder.compute(left, s, BinaryOp::Add, a, b).unwrap();
    builder.jump(left, "L3").unwrap();

    builder.label(right, "L2").unwrap();
    builder.compute(right, s, BinaryOp::Add, a, b).unwrap();
    builder.jump(right, "L3").unwrap();

    builder.label(join, "L3").unwrap();
    let joined_sum = builder.compute(join, r, BinaryOp::Add, a, b).unwrap();
    builder.compute(join, z, BinaryOp::Add, x, s).unwrap();
    builder.ret(join, z).unwrap();

    let (entry, exit) = (builder.entry(), builder.exit());
    builder
        .edge(entry, split)
        .edge(split, left)
        .edge(split, right)
        .edge(left, join)
        .edge(right, join)
        .edge(join, exit);

    Diamond {
        state: builder.finish().unwrap(),
        split,
        left,
        right,
        join,
        copy,
        joined_sum,
    }
}
