/*!
The solver --- to which formulas are added, and within which solves take place.

The solver is the orchestration layer.
It owns the coordinate maps, the proof trace, and (through a layered composition) the engine:
the solver holds a [searcher](crate::search), the searcher holds the
[propagation engine](crate::propagation), and the engine holds the
[clause database](crate::db).
The simplification passes are services of the solver, each an optional piece of state dispatched
to by the [inprocessing schedule](Solver::simplify_problem).

Cross-component consistency is the solver's responsibility: any pass which values, removes,
merges, or renumbers a variable does so through solver methods, which keep the coordinate maps,
assumption records, proof trace, and per-subsystem shadow data in lockstep.

# Example

```rust
# use marten_sat::config::Config;
# use marten_sat::solver::Solver;
# use marten_sat::reports::SolveReport;
# use marten_sat::structures::literal::Lit;
let mut solver = Solver::from_config(Config::default());

let vars: Vec<_> = (0..3).map(|_| solver.new_var()).collect();

solver.add_clause(&[Lit::new(vars[0], true), Lit::new(vars[1], true)]).unwrap();
solver.add_clause(&[Lit::new(vars[1], false), Lit::new(vars[2], true)]).unwrap();

assert_eq!(solver.solve().unwrap(), SolveReport::Satisfiable);
```
*/

mod assumptions;
mod ingest;
mod model;
mod renumber;
mod schedule;
mod solve;
mod stats;
mod xor;

pub use assumptions::AssumptionPair;
pub use stats::SolveStats;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    config::Config,
    coordinates::VarMaps,
    misc::log::targets,
    proof::Trace,
    reports::SolveReport,
    search::{SearchStats, Searcher},
    simplify::{
        cache::ImplCache, components::CompHandler, occurrence::OccSimplifier, scc::VarReplacer,
        stamp::Stamps,
    },
    structures::literal::{Lit, Var, VAR_MAX},
    sync::BinQueue,
    types::err::{ErrorKind, IngestError},
};

/// A per-variable subsystem: anything which keeps shadow data sized by the variable count.
///
/// The solver notifies every subsystem of variable creation, memory shrinking, and renumbering
/// in a deterministic fixed order, so shadow data stays in lockstep with the master tables.
pub trait VarNotify {
    /// `n` fresh variables were appended.
    fn on_new_vars(&mut self, n: usize);

    /// Per-variable structures may shrink to `new_n` entries.
    fn on_save_var_memory(&mut self, new_n: usize) {
        let _ = new_n;
    }

    /// The inter space was permuted; `outer_to_inter` and `inter_to_outer` are the fresh maps.
    fn on_renumber(&mut self, outer_to_inter: &[Var], inter_to_outer: &[Var]) {
        let _ = (outer_to_inter, inter_to_outer);
    }
}

/// The solver.
pub struct Solver {
    /// The configuration.
    pub config: Config,

    /// The searcher, which holds the propagation engine and the clause database.
    pub searcher: Searcher,

    /// The coordinate maps: outside, outer, and inter numbering.
    pub maps: VarMaps,

    /// False once unsatisfiability has been established. Sticky: every mutating operation on an
    /// unsatisfiable solver short-circuits.
    pub(crate) ok: bool,

    /// The report of the most recent solve.
    pub(crate) status: SolveReport,

    /// The model of the most recent satisfiable solve, in outside space.
    pub(crate) model: Vec<Option<bool>>,

    /// The extended model in outer space, before auxiliaries are hidden.
    pub(crate) full_model: Vec<Option<bool>>,

    /// On an assumption-driven unsatisfiable result, the failing assumptions in outside space.
    pub(crate) conflict: Vec<Lit>,

    /// The assumptions for the next solve, as given by the caller.
    pub(crate) outside_assumptions: Vec<Lit>,

    /// The installed assumptions: inter literal paired with the caller's original.
    pub(crate) assumptions: Vec<AssumptionPair>,

    /// Assumption membership, indexed by inter variable.
    pub(crate) assumptions_set: Vec<bool>,

    /// The equivalent-literal replacer. Always present; gated by configuration at dispatch.
    pub(crate) replacer: VarReplacer,

    /// The occurrence-based simplifier (variable elimination, subsumption), if enabled.
    pub(crate) occ: Option<OccSimplifier>,

    /// The component handler, if enabled.
    pub(crate) comp: Option<CompHandler>,

    /// The implication cache, if enabled.
    pub(crate) cache: Option<ImplCache>,

    /// Binary implication graph stamps, if enabled.
    pub(crate) stamps: Option<Stamps>,

    /// The proof trace, if attached.
    pub proof: Option<Trace>,

    /// The outbound binary clause queue.
    pub sync: BinQueue,

    /// Cooperative cancellation, polled between schedule tokens and search iterations.
    must_interrupt: Arc<AtomicBool>,

    /// When the current solve began, for the wall-clock limit.
    pub(crate) solve_started: Option<std::time::Instant>,

    /// Counters across the lifetime of the solver.
    pub stats: SolveStats,

    /// Search statistics folded across episodes.
    pub(crate) sum_search_stats: SearchStats,

    /// If set, only these (outside) variables are candidates for undefining.
    pub(crate) independent_vars: Option<Vec<Var>>,
}

impl Solver {
    /// Creates a solver from some given configuration.
    pub fn from_config(config: Config) -> Self {
        let searcher = Searcher::new(&config);
        let occ = config
            .subsystems
            .perform_occur_based_simp
            .then(OccSimplifier::default);
        let comp = config.subsystems.do_comp_handler.then(CompHandler::default);
        let cache = config.subsystems.do_cache.then(ImplCache::default);
        let stamps = config.subsystems.do_stamp.then(Stamps::default);
        let independent_vars = config.preprocess.independent_vars.clone();

        Solver {
            config,
            searcher,
            maps: VarMaps::default(),

            ok: true,
            status: SolveReport::Unknown,

            model: Vec::default(),
            full_model: Vec::default(),
            conflict: Vec::default(),

            outside_assumptions: Vec::default(),
            assumptions: Vec::default(),
            assumptions_set: Vec::default(),

            replacer: VarReplacer::default(),
            occ,
            comp,
            cache,
            stamps,

            proof: None,
            sync: BinQueue::default(),

            must_interrupt: Arc::new(AtomicBool::new(false)),

            solve_started: None,
            stats: SolveStats::default(),
            sum_search_stats: SearchStats::default(),
            independent_vars,
        }
    }

    /// Attaches a proof trace. Records are only complete if attached before any clause.
    pub fn set_proof_trace(&mut self, trace: Trace) {
        self.proof = Some(trace);
    }

    /// A handle on the interrupt flag, settable from elsewhere.
    ///
    /// A set flag causes the current solve to return an unknown report promptly; changes already
    /// applied to the formula are kept and remain valid for the next call.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.must_interrupt.clone()
    }

    /// Whether an interrupt has been requested.
    pub(crate) fn interrupt_requested(&self) -> bool {
        self.must_interrupt.load(Ordering::Relaxed)
    }

    /// Whether unsatisfiability has been established.
    pub fn okay(&self) -> bool {
        self.ok
    }

    /// The report of the most recent solve.
    pub fn report(&self) -> SolveReport {
        self.status
    }

    /// The model of the most recent satisfiable solve, indexed by outside variable.
    pub fn model(&self) -> &[Option<bool>] {
        &self.model
    }

    /// The model value of an outside variable.
    pub fn model_value_of(&self, var: Var) -> Option<bool> {
        self.model.get(var as usize).copied().flatten()
    }

    /// The model value of an outside literal.
    pub fn model_value_of_lit(&self, literal: Lit) -> Option<bool> {
        self.model_value_of(literal.var())
            .map(|value| value == literal.polarity())
    }

    /// On an assumption-driven unsatisfiable result, the failing assumptions in outside space.
    pub fn conflict(&self) -> &[Lit] {
        &self.conflict
    }

    /// Restricts [undefine](Solver::undefine) to the given outside variables.
    pub fn set_independent_vars(&mut self, vars: Vec<Var>) {
        self.independent_vars = Some(vars);
    }

    /// A count of variables the caller has declared.
    pub fn n_vars(&self) -> usize {
        self.maps.n_outside()
    }

    /// A count of variables including the auxiliaries of XOR cutting.
    pub fn n_vars_outer(&self) -> usize {
        self.maps.n_outer()
    }

    /// A count of free variables: no value, not removed.
    pub fn n_free_vars(&self) -> usize {
        self.searcher.engine.cnf.free_var_count()
    }

    /// Declares a fresh variable, returning its outside index.
    pub fn new_var(&mut self) -> Var {
        let outside = self.maps.n_outside() as Var;
        self.new_var_internal(false)
            .expect("variable limit reached");
        outside
    }

    /// Declares `n` fresh variables.
    pub fn new_vars(&mut self, n: usize) -> Result<(), ErrorKind> {
        for _ in 0..n {
            self.new_var_internal(false)?;
        }
        Ok(())
    }

    /// Creates a variable in every space, notifying each per-variable subsystem in a fixed
    /// order: searcher (engine, heap), replacer, occurrence simplifier, component handler,
    /// cache, stamps, assumption membership.
    ///
    /// Returns the outer index of the variable.
    pub(crate) fn new_var_internal(&mut self, is_bva: bool) -> Result<Var, ErrorKind> {
        if self.maps.n_outer() as u32 >= VAR_MAX {
            return Err(IngestError::TooManyVars.into());
        }
        self.check_switchoff_limits_newvar();

        let outer = self.maps.push_var(is_bva);
        self.searcher.on_new_var(is_bva);

        self.replacer.on_new_vars(1);
        if let Some(occ) = self.occ.as_mut() {
            occ.on_new_vars(1);
        }
        if let Some(comp) = self.comp.as_mut() {
            comp.on_new_vars(1);
        }
        if let Some(cache) = self.cache.as_mut() {
            cache.on_new_vars(1);
        }
        if let Some(stamps) = self.stamps.as_mut() {
            stamps.on_new_vars(1);
        }
        self.assumptions_set.push(false);

        log::trace!(target: targets::VALUATION, "Fresh variable {outer} (bva: {is_bva})");
        Ok(outer)
    }

    /// Shrinks per-variable shadow structures after a renumber has moved every interesting
    /// variable below `new_n`, notifying subsystems in creation order.
    pub(crate) fn save_on_var_memory(&mut self, new_n: usize) {
        self.replacer.on_save_var_memory(new_n);
        if let Some(occ) = self.occ.as_mut() {
            occ.on_save_var_memory(new_n);
        }
        if let Some(comp) = self.comp.as_mut() {
            comp.on_save_var_memory(new_n);
        }
        if let Some(cache) = self.cache.as_mut() {
            cache.on_save_var_memory(new_n);
        }
        if let Some(stamps) = self.stamps.as_mut() {
            stamps.on_save_var_memory(new_n);
        }
        self.assumptions_set.shrink_to_fit();
    }

    /// Disables the per-literal subsystems when the variable count makes their memory use
    /// unreasonable.
    fn check_switchoff_limits_newvar(&mut self) {
        let count = self.maps.n_outer();

        if self.stamps.is_some() && count > 15_000_000 {
            log::info!("Switching off stamping: too many variables");
            self.stamps = None;
            self.config.subsystems.do_stamp = false;
        }

        if self.cache.is_some() && count > 5_000_000 {
            log::info!("Switching off the implication cache: too many variables");
            self.cache = None;
            self.config.subsystems.do_cache = false;
        }
    }

    /// An estimate of the heap memory held by the major structures, in bytes.
    pub fn mem_used(&self) -> usize {
        let arena = self.searcher.engine.cnf.arena.mem_used();
        let cache = self.cache.as_ref().map_or(0, |c| c.mem_used());
        let per_var = self.searcher.engine.cnf.var_count()
            * (std::mem::size_of::<Option<bool>>()
                + std::mem::size_of::<crate::db::variable::VarData>());
        arena + cache + per_var
    }

    /// Marks the solver unsatisfiable, concluding any attached proof.
    pub(crate) fn note_unsat(&mut self) {
        if self.ok {
            log::info!("Formula established unsatisfiable");
            self.ok = false;
            if let Some(trace) = self.proof.as_mut() {
                trace.add_empty_clause();
            }
        }
    }

    /// Enqueues a literal at the root level and propagates.
    ///
    /// A conflict establishes unsatisfiability.
    pub(crate) fn fully_enqueue_this(&mut self, literal: Lit) -> bool {
        debug_assert_eq!(self.searcher.engine.current_level(), 0);

        match self.searcher.engine.value_of_lit(literal) {
            None => {
                self.searcher
                    .engine
                    .enqueue(literal, crate::propagation::Reason::Free);
                if self.searcher.engine.propagate().is_err() {
                    self.note_unsat();
                }
            }
            Some(false) => self.note_unsat(),
            Some(true) => {}
        }
        self.ok
    }

    /// Enqueues each literal at the root level, stopping on unsatisfiability.
    pub(crate) fn fully_enqueue_these(&mut self, literals: &[Lit]) -> bool {
        for &literal in literals {
            if !self.fully_enqueue_this(literal) {
                return false;
            }
        }
        true
    }
}
