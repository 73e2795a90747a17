//! Pass scheduler for orchestrating analyses and optimizations.
//!
//! The `PassScheduler` validates the dependency and invalidation declarations
//! of its registered passes, then executes a [`SchedulerConfig`] in three
//! steps:
//!
//! 1. Requested optimizations run in rounds until a full round changes
//!    nothing. Before each optimization its dependencies are brought up to
//!    date; after a change, the analyses it invalidates are marked stale,
//!    together with everything depending on them.
//! 2. Every `done` flag is reset.
//! 3. Requested analyses run once over the final IR, in dependency order.

use std::{collections::VecDeque, fmt};

use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    compiler::{
        passes::{
            AvailableExpressionsPass, CopyPropagationPass, CsePass, DominatorsPass,
            InductionVariablesPass, LiveVariablesPass, LoopInvariantsPass, NaturalLoopsPass,
            ReachingDefinitionsPass, SetsPass, StrengthReductionPass,
        },
        EventKind, EventLog, Pass, PassContext, PassId, PassKind, SchedulerConfig,
    },
    ir::AnalysisState,
    Error, Result,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Finished,
}

/// Orchestrates pass execution over one [`AnalysisState`].
///
/// # Example
///
/// ```rust
/// use tacflow::compiler::{EventKind, EventLog, PassId, PassScheduler, SchedulerConfig};
/// use tacflow::ir::{BinaryOp, CfgBuilder, Operand};
///
/// let mut builder = CfgBuilder::new();
/// let body = builder.block();
/// let (a, b, c, d) = (builder.var("a"), builder.var("b"), builder.var("c"), builder.var("d"));
/// builder.compute(body, c, BinaryOp::Add, a, b)?;
/// builder.compute(body, d, BinaryOp::Add, a, b)?;
/// builder.ret(body, d)?;
/// let (entry, exit) = (builder.entry(), builder.exit());
/// builder.edge(entry, body).edge(body, exit);
/// let mut state = builder.finish()?;
///
/// let mut events = EventLog::new();
/// let config = SchedulerConfig::new().with_pass(PassId::Cse);
/// PassScheduler::default().run(&mut state, &config, &mut events, None)?;
/// assert_eq!(events.count(EventKind::CommonSubexpression), 1);
/// # Ok::<(), tacflow::Error>(())
/// ```
pub struct PassScheduler {
    passes: Vec<Box<dyn Pass>>,
}

impl Default for PassScheduler {
    fn default() -> Self {
        let mut scheduler = Self::new();
        scheduler
            .register(SetsPass)
            .register(ReachingDefinitionsPass)
            .register(LiveVariablesPass)
            .register(AvailableExpressionsPass)
            .register(DominatorsPass)
            .register(NaturalLoopsPass)
            .register(LoopInvariantsPass)
            .register(InductionVariablesPass)
            .register(CsePass)
            .register(CopyPropagationPass)
            .register(StrengthReductionPass);
        scheduler
    }
}

impl PassScheduler {
    /// Creates a scheduler without any registered pass.
    #[must_use]
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Registers a pass, replacing a registered pass with the same id.
    pub fn register(&mut self, pass: impl Pass + 'static) -> &mut Self {
        let pass: Box<dyn Pass> = Box::new(pass);
        match self.passes.iter_mut().find(|p| p.id() == pass.id()) {
            Some(slot) => *slot = pass,
            None => self.passes.push(pass),
        }
        self
    }

    /// Returns the registered pass with the given id.
    #[must_use]
    pub fn pass(&self, id: PassId) -> Option<&dyn Pass> {
        self.passes.iter().find(|p| p.id() == id).map(|p| &**p)
    }

    /// Returns the ids of the registered passes in registration order.
    pub fn pass_ids(&self) -> impl Iterator<Item = PassId> + '_ {
        self.passes.iter().map(|p| p.id())
    }

    fn lookup(&self, id: PassId) -> Result<&dyn Pass> {
        self.pass(id)
            .ok_or_else(|| Error::Scheduling(format!("pass {id} is not registered")))
    }

    /// Checks the declarations of every registered pass.
    ///
    /// Dependencies must name registered analyses. Analyses invalidate
    /// nothing; optimizations only invalidate registered analyses. The
    /// dependency graph must be acyclic.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scheduling`] describing the first offending
    /// declaration.
    pub fn validate(&self) -> Result<()> {
        for pass in &self.passes {
            let id = pass.id();
            for &dep in pass.dependencies() {
                let target = self.pass(dep).ok_or_else(|| {
                    Error::Scheduling(format!("{id} depends on unregistered pass {dep}"))
                })?;
                if target.kind() != PassKind::Analysis {
                    return Err(Error::Scheduling(format!(
                        "{id} depends on {dep}, which is an {}",
                        target.kind()
                    )));
                }
            }

            match pass.kind() {
                PassKind::Analysis => {
                    if let Some(first) = pass.invalidates().first() {
                        return Err(Error::Scheduling(format!(
                            "analysis {id} declares that it invalidates {first}"
                        )));
                    }
                }
                PassKind::Optimization => {
                    for &stale in pass.invalidates() {
                        let target = self.pass(stale).ok_or_else(|| {
                            Error::Scheduling(format!("{id} invalidates unregistered pass {stale}"))
                        })?;
                        if target.kind() != PassKind::Analysis {
                            return Err(Error::Scheduling(format!(
                                "{id} invalidates {stale}, which is an {}",
                                target.kind()
                            )));
                        }
                    }
                }
            }
        }

        let mut marks: FxHashMap<PassId, Mark> = FxHashMap::default();
        let mut path = Vec::new();
        for pass in &self.passes {
            self.visit(pass.id(), &mut marks, &mut path)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        id: PassId,
        marks: &mut FxHashMap<PassId, Mark>,
        path: &mut Vec<PassId>,
    ) -> Result<()> {
        match marks.get(&id) {
            Some(Mark::Finished) => return Ok(()),
            Some(Mark::Visiting) => {
                path.push(id);
                let start = path.iter().position(|&p| p == id).unwrap_or(0);
                let cycle: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
                return Err(Error::Scheduling(format!(
                    "circular dependency {}",
                    cycle.join(" -> ")
                )));
            }
            None => {}
        }

        marks.insert(id, Mark::Visiting);
        path.push(id);
        for &dep in self.lookup(id)?.dependencies() {
            self.visit(dep, marks, path)?;
        }
        path.pop();
        marks.insert(id, Mark::Finished);
        Ok(())
    }

    /// Runs the passes requested by `config`.
    ///
    /// Verbose analyses write their facts to `sink` during the final analysis
    /// step; verbose optimizations write the events they recorded. Without a
    /// sink, verbose flags are ignored.
    ///
    /// Returns the number of optimization rounds executed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scheduling`] if validation fails or a requested pass
    /// is not registered, and propagates any error raised by a pass.
    pub fn run(
        &self,
        state: &mut AnalysisState,
        config: &SchedulerConfig,
        events: &mut EventLog,
        mut sink: Option<&mut dyn fmt::Write>,
    ) -> Result<usize> {
        self.validate()?;

        let mut analyses = Vec::new();
        let mut optimizations = Vec::new();
        for &id in &config.requested {
            match self.lookup(id)?.kind() {
                PassKind::Analysis => analyses.push(id),
                PassKind::Optimization => optimizations.push(id),
            }
        }

        let mut done: FxHashSet<PassId> = FxHashSet::default();
        let mut rounds = 0;
        if !optimizations.is_empty() {
            loop {
                if config.max_rounds.is_some_and(|max| rounds >= max) {
                    warn!("optimizations stopped after {} rounds", rounds);
                    break;
                }
                rounds += 1;

                let mut changed = false;
                for &id in &optimizations {
                    let pass = self.lookup(id)?;
                    self.schedule(pass.dependencies(), state, &mut done, events, &mut None, config)?;
                    let verbose = config.is_verbose(id);
                    if self.execute(pass, state, events, &mut sink, verbose)? {
                        changed = true;
                        self.invalidate(pass.invalidates(), &mut done);
                    }
                }

                debug!("optimization round {} changed: {}", rounds, changed);
                if !changed {
                    break;
                }
            }
        }

        done.clear();
        self.schedule(&analyses, state, &mut done, events, &mut sink, config)?;
        Ok(rounds)
    }

    /// Runs `targets` and their missing dependencies through a work queue.
    ///
    /// A pass with unfinished dependencies is queued again behind them.
    fn schedule(
        &self,
        targets: &[PassId],
        state: &mut AnalysisState,
        done: &mut FxHashSet<PassId>,
        events: &mut EventLog,
        sink: &mut Option<&mut dyn fmt::Write>,
        config: &SchedulerConfig,
    ) -> Result<()> {
        let mut queue: VecDeque<PassId> = targets.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            if done.contains(&id) {
                continue;
            }
            let pass = self.lookup(id)?;
            let pending: Vec<PassId> = pass
                .dependencies()
                .iter()
                .copied()
                .filter(|dep| !done.contains(dep))
                .collect();
            if !pending.is_empty() {
                queue.push_front(id);
                for &dep in pending.iter().rev() {
                    queue.push_front(dep);
                }
                continue;
            }

            self.execute(pass, state, events, sink, config.is_verbose(id))?;
            done.insert(id);
        }
        Ok(())
    }

    fn execute(
        &self,
        pass: &dyn Pass,
        state: &mut AnalysisState,
        events: &mut EventLog,
        sink: &mut Option<&mut dyn fmt::Write>,
        verbose: bool,
    ) -> Result<bool> {
        let name = pass.id().to_string();
        debug!("running {} pass {}", pass.kind(), name);
        events
            .record(EventKind::PassStarted)
            .pass(name.clone())
            .message(pass.description());
        let before = events.len();

        let changed = match sink.as_mut() {
            Some(out) if verbose && pass.kind() == PassKind::Analysis => {
                pass.run(state, &mut PassContext::verbose(events, &mut **out))?
            }
            _ => pass.run(state, &mut PassContext::new(events))?,
        };

        if let Some(out) = sink.as_mut() {
            if verbose && pass.kind() == PassKind::Optimization {
                let out: &mut dyn fmt::Write = &mut **out;
                for event in events.iter().skip(before) {
                    writeln!(out, "{event}")?;
                }
            }
        }

        debug!("{} finished, changed: {}", name, changed);
        events
            .record(EventKind::PassCompleted)
            .pass(name)
            .message(if changed { "changed" } else { "unchanged" });
        Ok(changed)
    }

    /// Clears the `done` flag of `stale` and of everything depending on it,
    /// transitively.
    fn invalidate(&self, stale: &[PassId], done: &mut FxHashSet<PassId>) {
        let mut seen: FxHashSet<PassId> = FxHashSet::default();
        let mut stack = stale.to_vec();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            done.remove(&id);
            for pass in &self.passes {
                if pass.dependencies().contains(&id) {
                    stack.push(pass.id());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{counting_loop, straight_line};

    struct FakePass {
        id: PassId,
        kind: PassKind,
        dependencies: &'static [PassId],
        invalidates: &'static [PassId],
    }

    impl FakePass {
        fn analysis(id: PassId, dependencies: &'static [PassId]) -> Self {
            Self {
                id,
                kind: PassKind::Analysis,
                dependencies,
                invalidates: &[],
            }
        }
    }

    impl Pass for FakePass {
        fn id(&self) -> PassId {
            self.id
        }

        fn kind(&self) -> PassKind {
            self.kind
        }

        fn description(&self) -> &'static str {
            "fake"
        }

        fn dependencies(&self) -> &'static [PassId] {
            self.dependencies
        }

        fn invalidates(&self) -> &'static [PassId] {
            self.invalidates
        }

        fn run(&self, _state: &mut AnalysisState, _ctx: &mut PassContext<'_>) -> Result<bool> {
            Ok(false)
        }
    }

    fn scheduling_message(result: Result<()>) -> String {
        match result {
            Err(Error::Scheduling(message)) => message,
            other => panic!("expected a scheduling error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_declarations_are_valid() {
        let scheduler = PassScheduler::default();
        scheduler.validate().unwrap();
        assert_eq!(scheduler.pass_ids().count(), 11);
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut scheduler = PassScheduler::default();
        scheduler.register(FakePass::analysis(PassId::Sets, &[]));
        assert_eq!(scheduler.pass_ids().count(), 11);
        assert_eq!(scheduler.pass(PassId::Sets).unwrap().description(), "fake");
    }

    #[test]
    fn test_circular_dependency_rejected() {
        let mut scheduler = PassScheduler::default();
        scheduler.register(FakePass::analysis(PassId::Sets, &[PassId::InductionVariables]));
        let message = scheduling_message(scheduler.validate());
        assert!(message.starts_with("circular dependency"));
        assert!(message.contains("SETS"));
    }

    #[test]
    fn test_dependency_on_optimization_rejected() {
        let mut scheduler = PassScheduler::default();
        scheduler.register(FakePass::analysis(PassId::LiveVariables, &[PassId::Cse]));
        let message = scheduling_message(scheduler.validate());
        assert!(message.contains("LV depends on CSE"));
    }

    #[test]
    fn test_invalidating_analysis_rejected() {
        let mut scheduler = PassScheduler::default();
        scheduler.register(FakePass {
            id: PassId::Dominators,
            kind: PassKind::Analysis,
            dependencies: &[],
            invalidates: &[PassId::Sets],
        });
        scheduling_message(scheduler.validate());
    }

    #[test]
    fn test_optimization_invalidating_optimization_rejected() {
        let mut scheduler = PassScheduler::default();
        scheduler.register(FakePass {
            id: PassId::Cse,
            kind: PassKind::Optimization,
            dependencies: &[PassId::AvailableExpressions],
            invalidates: &[PassId::CopyPropagation],
        });
        let message = scheduling_message(scheduler.validate());
        assert!(message.contains("CSE invalidates CP"));
    }

    #[test]
    fn test_unregistered_request_rejected() {
        let mut scheduler = PassScheduler::new();
        scheduler.register(SetsPass);
        let mut fixture = straight_line();
        let mut events = EventLog::new();
        let config = SchedulerConfig::new().with_pass(PassId::LiveVariables);

        let result = scheduler.run(&mut fixture.state, &config, &mut events, None);
        assert!(matches!(result, Err(Error::Scheduling(_))));
        assert!(events.is_empty());
    }

    #[test]
    fn test_dependencies_run_before_dependents() {
        let mut fixture = counting_loop();
        let mut events = EventLog::new();
        let config = SchedulerConfig::new().with_pass(PassId::InductionVariables);

        let rounds = PassScheduler::default()
            .run(&mut fixture.state, &config, &mut events, None)
            .unwrap();
        assert_eq!(rounds, 0);

        let started: Vec<String> = events
            .iter()
            .filter(|e| e.kind == EventKind::PassStarted)
            .filter_map(|e| e.pass.clone())
            .collect();
        let position = |name: &str| started.iter().position(|p| p == name).unwrap();
        assert_eq!(started.len(), 6);
        assert!(position("SETS") < position("RD"));
        assert!(position("CD") < position("NL"));
        assert!(position("RD") < position("LI"));
        assert!(position("LI") < position("IV"));
        assert!(!fixture.state.induction_vars().is_empty());
    }

    #[test]
    fn test_full_pipeline_reaches_fixpoint() {
        let mut fixture = counting_loop();
        let mut events = EventLog::new();

        let rounds = PassScheduler::default()
            .run(&mut fixture.state, &SchedulerConfig::all(), &mut events, None)
            .unwrap();

        assert_eq!(rounds, 2);
        assert_eq!(events.count(EventKind::StrengthReduced), 1);
        assert_eq!(
            fixture.state.display_instruction(fixture.scaled).unwrap(),
            "j = sr1"
        );
        // the final analyses see the reduced loop
        let vars = &fixture.state.induction_vars()[&fixture.header];
        assert!(vars.iter().all(|v| v.is_basic()));
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn test_round_limit() {
        let mut fixture = counting_loop();
        let mut events = EventLog::new();
        let config = SchedulerConfig::new()
            .with_pass(PassId::StrengthReduction)
            .with_max_rounds(1);

        let rounds = PassScheduler::default()
            .run(&mut fixture.state, &config, &mut events, None)
            .unwrap();
        assert_eq!(rounds, 1);
    }

    #[test]
    fn test_verbose_optimization_writes_events() {
        let mut fixture = straight_line();
        let mut events = EventLog::new();
        let mut out = String::new();
        let config = SchedulerConfig::new().with_verbose(PassId::Cse);

        PassScheduler::default()
            .run(&mut fixture.state, &config, &mut events, Some(&mut out))
            .unwrap();
        assert_eq!(
            out,
            "[CSE] common subexpression eliminated: d = a + b -> d = cse1\n"
        );
    }

    #[test]
    fn test_verbose_analysis_only_reports_once() {
        let mut fixture = straight_line();
        let mut events = EventLog::new();
        let mut out = String::new();
        let config = SchedulerConfig::new()
            .with_pass(PassId::Cse)
            .with_verbose(PassId::AvailableExpressions);

        PassScheduler::default()
            .run(&mut fixture.state, &config, &mut events, Some(&mut out))
            .unwrap();
        assert_eq!(out.matches("e_Out : ").count(), 1);
        assert!(out.contains("e_Out : (a + b)"));
    }
}
