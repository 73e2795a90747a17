//! Analysis passes.
//!
//! Each pass recomputes one family of facts on the current IR and, when
//! verbose, writes them to the report sink. None of them changes the IR.

use crate::{
    analysis::{
        compute_available_expressions, compute_dominators, compute_induction_variables,
        compute_live_variables, compute_loop_invariants, compute_natural_loops,
        compute_reaching_definitions, compute_sets,
    },
    compiler::{report, Pass, PassContext, PassId, PassKind},
    ir::AnalysisState,
    Result,
};

macro_rules! analysis_pass {
    (
        $(#[$meta:meta])*
        $name:ident {
            id: $id:ident,
            description: $desc:literal,
            dependencies: [$($dep:ident),*],
            compute: $compute:path,
            report: $report:path $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Pass for $name {
            fn id(&self) -> PassId {
                PassId::$id
            }

            fn kind(&self) -> PassKind {
                PassKind::Analysis
            }

            fn description(&self) -> &'static str {
                $desc
            }

            fn dependencies(&self) -> &'static [PassId] {
                &[$(PassId::$dep),*]
            }

            fn run(&self, state: &mut AnalysisState, ctx: &mut PassContext<'_>) -> Result<bool> {
                $compute(state)?;
                if let Some(sink) = ctx.sink.as_deref_mut() {
                    $report(state, sink)?;
                }
                Ok(false)
            }
        }
    };
}

analysis_pass! {
    /// Rebuilds the tables, the local sets, reaching copies and du-chains.
    SetsPass {
        id: Sets,
        description: "Local sets, reaching copies and definition-use chains",
        dependencies: [],
        compute: compute_sets,
        report: report::write_sets,
    }
}

analysis_pass! {
    /// Reaching definitions (`in_rd`/`out_rd`).
    ReachingDefinitionsPass {
        id: ReachingDefinitions,
        description: "Reaching definitions",
        dependencies: [Sets],
        compute: compute_reaching_definitions,
        report: report::write_reaching,
    }
}

analysis_pass! {
    /// Live variables (`in_lv`/`out_lv`).
    LiveVariablesPass {
        id: LiveVariables,
        description: "Live variables",
        dependencies: [Sets],
        compute: compute_live_variables,
        report: report::write_liveness,
    }
}

analysis_pass! {
    /// Available expressions (`e_in`/`e_out`).
    AvailableExpressionsPass {
        id: AvailableExpressions,
        description: "Available expressions",
        dependencies: [Sets],
        compute: compute_available_expressions,
        report: report::write_available,
    }
}

analysis_pass! {
    /// Dominator sets.
    DominatorsPass {
        id: Dominators,
        description: "Dominators",
        dependencies: [],
        compute: compute_dominators,
        report: report::write_dominators,
    }
}

analysis_pass! {
    /// Natural loops, stored per header.
    NaturalLoopsPass {
        id: NaturalLoops,
        description: "Natural loops",
        dependencies: [Dominators],
        compute: compute_natural_loops,
        report: report::write_loops,
    }
}

analysis_pass! {
    /// Loop-invariant computations of every natural loop.
    LoopInvariantsPass {
        id: LoopInvariants,
        description: "Loop-invariant computations",
        dependencies: [ReachingDefinitions, NaturalLoops],
        compute: compute_loop_invariants,
        report: report::write_invariants,
    }
}

analysis_pass! {
    /// Induction variables of every natural loop.
    InductionVariablesPass {
        id: InductionVariables,
        description: "Induction variables",
        dependencies: [LoopInvariants],
        compute: compute_induction_variables,
        report: report::write_induction_vars,
    }
}
