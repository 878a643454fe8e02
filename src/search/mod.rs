/*!
The conflict-driven clause-learning searcher.

# Overview

The searcher owns the [propagation engine](crate::propagation) and drives the
propagate/decide/analyse loop within a conflict budget handed down by the orchestrator:

```none
          +---------------+
  +-------| make_decision |
  |       +---------------+
  |               ⌃
  |               | no conflict, valuation partial
  |               |
  |               |              +-----> satisfiable, if no decision remains
  ⌄   +-----------+--------+     |
--+-->|     propagate      |-----+
  ⌃   +--------------------+     |
  |               |              +-----> unsatisfiable, on a root-level conflict
  |               | conflict     |       or a failed assumption
  |               ⌄
  |       +---------------+
  +-------| analyse/learn |
          +---------------+
```

Assumptions are installed as the first decisions, one level each, and re-asserted after every
restart, so they hold for the whole of a search episode.
A conflict with an assumption is resolved into a final conflict clause over the assumption
literals (see [analyse_final](Searcher::analyse_final)), which the orchestrator translates back
to the caller's numbering.

The searcher reports through a [SearchResult]; it never concludes satisfiability on behalf of
the solver --- the orchestrator extends and verifies the model first.

# Heuristics

- Variable activity (VSIDS) on an [index heap](crate::generic::index_heap), with on-demand
  rescoring and a decay which anneals towards
  [var_decay_max](crate::config::SearchConfig::var_decay_max).
- Phase saving, with the polarity mode configurable.
- Restarts paced by luby sequence, geometric growth, or short-term glue deterioration.
- Learnt clauses are placed in one of three tiers by glue, and the tiers reduce on independent
  schedules.
*/

mod analysis;
mod reduce;

pub use analysis::AnalysisOutcome;

use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

use crate::{
    config::{ClauseDBConfig, PolarityMode, RestartType, SearchConfig},
    db::variable::Removed,
    generic::{index_heap::IndexHeap, luby::Luby, minimal_pcg::MinimalPCG32},
    misc::log::targets,
    proof::Trace,
    propagation::{PropEngine, Reason},
    structures::{clause::StoredClause, literal::Lit},
};

/// The outcome of a search episode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchResult {
    /// Every variable the searcher considers has a value, and no clause is falsified.
    Satisfiable,

    /// A root-level conflict, or a conflict with the assumptions.
    ///
    /// In the latter case [final_conflict](Searcher::final_conflict) holds a clause over the
    /// negated assumption literals.
    Unsatisfiable,

    /// The conflict budget was exhausted.
    Unknown,
}

/// Statistics accumulated over a search episode.
#[derive(Clone, Copy, Debug, Default)]
pub struct SearchStats {
    pub conflicts: u64,
    pub decisions: u64,
    pub propagations: u64,
    pub restarts: u64,

    pub learnt_units: u64,
    pub learnt_binaries: u64,
    pub learnt_longs: u64,

    /// Learnt clauses which landed in tier 0.
    pub red_cl_in_which0: u64,

    /// Literals removed by recursive minimisation.
    pub rec_min_lit_rem: u64,

    /// Literals of learnt clauses before any minimisation.
    pub lits_red_non_min: u64,

    /// Work performed by recursive minimisation, in reason-clause literals visited.
    pub rec_minim_cost: u64,

    /// Literals of learnt clauses entering extra (binary) minimisation.
    pub more_minim_lits_start: u64,

    /// Literals of learnt clauses after extra minimisation.
    pub more_minim_lits_end: u64,
}

impl SearchStats {
    /// Folds another set of statistics into this one.
    pub fn absorb(&mut self, other: &SearchStats) {
        self.conflicts += other.conflicts;
        self.decisions += other.decisions;
        self.propagations += other.propagations;
        self.restarts += other.restarts;
        self.learnt_units += other.learnt_units;
        self.learnt_binaries += other.learnt_binaries;
        self.learnt_longs += other.learnt_longs;
        self.red_cl_in_which0 += other.red_cl_in_which0;
        self.rec_min_lit_rem += other.rec_min_lit_rem;
        self.lits_red_non_min += other.lits_red_non_min;
        self.rec_minim_cost += other.rec_minim_cost;
        self.more_minim_lits_start += other.more_minim_lits_start;
        self.more_minim_lits_end += other.more_minim_lits_end;
    }
}

/// The searcher.
pub struct Searcher {
    /// The propagation engine, which in turn owns the clause database.
    pub engine: PropEngine,

    /// A local copy of the search configuration, refreshed by the orchestrator on
    /// reconfiguration.
    pub config: SearchConfig,

    /// A local copy of the clause database configuration, for tiering and reduction.
    pub db_config: ClauseDBConfig,

    /// Variable activities; every free variable is active on the heap.
    activity_heap: IndexHeap<f64>,

    /// The amount the next bumped variable is bumped by.
    var_inc: f64,

    /// The current activity decay, annealed towards the configured maximum.
    var_decay: f64,

    /// Assumptions for the current solve, as inter literals in assertion order.
    pub assumptions: Vec<Lit>,

    /// On an assumption-driven unsatisfiable result, a clause over the negated assumptions.
    pub final_conflict: Vec<Lit>,

    /// Analysis scratch: whether a variable has been visited.
    seen: Vec<bool>,

    /// Analysis scratch, indexed by literal.
    seen_lits: Vec<bool>,

    /// Recent learnt-clause glues, for glue-paced restarts.
    glue_history: VecDeque<u32>,

    /// Sum of all learnt-clause glues, for the long-term average.
    glue_sum: f64,

    /// Count of all learnt clauses, for the long-term average.
    glue_count: u64,

    /// The source of randomness.
    rng: MinimalPCG32,

    /// The luby sequence, for luby-paced restarts.
    luby: Luby,

    /// Conflicts since the last restart.
    conflicts_since_restart: u64,

    /// The conflict allowance of the current restart segment.
    restart_limit: u64,

    /// Count of restarts, for geometric pacing.
    geometric_restarts: u32,

    /// The current allowance of tier 2 clauses, grown by reduction.
    pub temp_lev2_allowance: usize,

    /// Conflicts at which the next tier 1 / tier 2 reduction is due.
    next_lev1_reduce: u64,
    next_lev2_reduce: u64,

    /// Statistics for the current episode.
    pub stats: SearchStats,
}

impl Searcher {
    pub fn new(config: &crate::config::Config) -> Self {
        Searcher {
            engine: PropEngine::default(),
            config: config.search.clone(),
            db_config: config.clause_db.clone(),

            activity_heap: IndexHeap::default(),
            var_inc: 1.0,
            var_decay: 0.8,

            assumptions: Vec::default(),
            final_conflict: Vec::default(),
            seen: Vec::default(),
            seen_lits: Vec::default(),

            glue_history: VecDeque::default(),
            glue_sum: 0.0,
            glue_count: 0,

            rng: MinimalPCG32::from_seed(config.solve.seed.to_le_bytes()),
            luby: Luby::default(),
            conflicts_since_restart: 0,
            restart_limit: 0,
            geometric_restarts: 0,

            temp_lev2_allowance: config.clause_db.max_temp_lev2_learnt_clauses,
            next_lev1_reduce: config.clause_db.every_lev1_reduce,
            next_lev2_reduce: config.clause_db.every_lev2_reduce,

            stats: SearchStats::default(),
        }
    }

    /// Extends every per-variable structure with a fresh variable.
    pub fn on_new_var(&mut self, is_bva: bool) {
        let var = self.engine.cnf.var_count();
        self.engine.on_new_var(is_bva);
        self.activity_heap.add(var, 0.0);
        self.seen.push(false);
        self.seen_lits.push(false);
        self.seen_lits.push(false);
    }

    /// Resets per-episode statistics.
    pub fn clear_stats(&mut self) {
        self.stats = SearchStats::default();
    }

    /// Clears and refills the activity heap with every free variable.
    ///
    /// Called after simplification, which values, removes, and renumbers variables behind the
    /// heap's back.
    pub fn rebuild_order_heap(&mut self) {
        // The heap may have been truncated in memory-save mode; restore its width first.
        for var in self.activity_heap.count()..self.engine.cnf.var_count() {
            self.activity_heap.add(var, 0.0);
        }
        for var in 0..self.engine.cnf.var_count() {
            self.activity_heap.remove(var);
        }
        for var in 0..self.engine.cnf.var_count() {
            if self.engine.cnf.assigns[var].is_none()
                && self.engine.cnf.var_data[var].removed == Removed::None
            {
                self.activity_heap.activate(var);
            }
        }
    }

    /// Rebuilds the activity heap and analysis scratch under a variable permutation.
    pub fn renumber_heuristics(&mut self, old_to_new: &[u32]) {
        let count = self.engine.cnf.var_count();
        let mut activities: Vec<f64> = vec![0.0; count];
        for old in 0..count {
            activities[old_to_new[old] as usize] = *self.activity_heap.value_at(old);
        }

        self.activity_heap = IndexHeap::default();
        for (var, activity) in activities.into_iter().enumerate() {
            self.activity_heap.add(var, activity);
        }
        self.rebuild_order_heap();

        self.seen = vec![false; count];
        self.seen_lits = vec![false; count * 2];
    }

    /// Drops heap entries above the effective variable bound, in memory-save mode.
    pub fn truncate_heap(&mut self, bound: usize) {
        self.activity_heap.truncate(bound);
        // The scratch vectors keep their full size: variables above the bound may return
        // through unelimination or component re-admission.
    }

    /// Bumps the activity of a variable, rescoring all activities if needed.
    pub fn bump_var_activity(&mut self, var: usize) {
        const RESCORE_AT: f64 = 1e100;

        let inc = self.var_inc;
        self.activity_heap.apply_to_index(var, |a| a + inc);

        if *self.activity_heap.value_at(var) > RESCORE_AT {
            let factor = 1.0 / RESCORE_AT;
            self.activity_heap.apply_to_all(|a| a * factor);
            self.var_inc *= factor;
        }
    }

    /// Decays variable activities by inflating the increment, annealing the decay rate towards
    /// its configured ceiling.
    fn decay_var_activity(&mut self) {
        self.var_inc /= self.var_decay;

        if self.stats.conflicts % 5000 == 0 && self.var_decay < self.config.var_decay_max.value {
            self.var_decay = (self.var_decay + 0.01).min(self.config.var_decay_max.value);
        }
    }

    /// Returns released variables to the activity heap after a backjump.
    fn reheap_released(&mut self) {
        for index in 0..self.engine.released.len() {
            let var = self.engine.released[index] as usize;
            if self.engine.cnf.var_data[var].removed == Removed::None {
                self.activity_heap.activate(var);
            }
        }
    }

    /// Determines the satisfiability of the database, within a conflict budget.
    ///
    /// Learnt clauses and deletions are recorded to `proof`, when a trace is attached.
    pub fn search(&mut self, budget: u64, proof: &mut Option<Trace>) -> SearchResult {
        self.final_conflict.clear();
        self.prime_restart_limit();
        self.conflicts_since_restart = 0;
        let mut episode_conflicts: u64 = 0;

        loop {
            let trail_before = self.engine.trail.len();
            let propagation = self.engine.propagate();
            self.stats.propagations += (self.engine.trail.len() - trail_before) as u64;

            match propagation {
                Err(conflict) => {
                    self.stats.conflicts += 1;
                    episode_conflicts += 1;
                    self.conflicts_since_restart += 1;

                    if self.engine.current_level() == 0 {
                        log::info!(target: targets::ANALYSIS, "Root-level conflict");
                        if let Some(trace) = proof {
                            trace.add_empty_clause();
                        }
                        return SearchResult::Unsatisfiable;
                    }

                    match self.analyse_and_learn(conflict, proof) {
                        AnalysisOutcome::Continue => {}
                        AnalysisOutcome::Unsatisfiable => {
                            if let Some(trace) = proof {
                                trace.add_empty_clause();
                            }
                            return SearchResult::Unsatisfiable;
                        }
                    }

                    self.decay_var_activity();
                    self.maybe_reduce(proof);

                    if episode_conflicts >= budget {
                        self.engine.cancel_until(0);
                        self.reheap_released();
                        return SearchResult::Unknown;
                    }

                    if self.restart_due() {
                        self.stats.restarts += 1;
                        self.conflicts_since_restart = 0;
                        self.prime_restart_limit();
                        self.engine.cancel_until(0);
                        self.reheap_released();
                    }
                }

                Ok(()) => {
                    // Re-assert any assumption without a level of its own.
                    match self.assert_next_assumption() {
                        Ok(true) => continue,
                        Ok(false) => {}
                        Err(()) => return SearchResult::Unsatisfiable,
                    }

                    match self.make_decision() {
                        Some(decision) => {
                            self.stats.decisions += 1;
                            self.engine.new_decision_level();
                            self.engine.enqueue(decision, Reason::Free);
                        }
                        None => {
                            return SearchResult::Satisfiable;
                        }
                    }
                }
            }
        }
    }

    /// Places the next assumption lacking a decision level, if any.
    ///
    /// Returns true if a level was opened, false if every assumption is placed, and an error if
    /// an assumption is false on the current valuation --- in which case
    /// [final_conflict](Searcher::final_conflict) has been filled.
    fn assert_next_assumption(&mut self) -> Result<bool, ()> {
        while (self.engine.current_level() as usize) < self.assumptions.len() {
            let assumption = self.assumptions[self.engine.current_level() as usize];

            match self.engine.value_of_lit(assumption) {
                Some(true) => {
                    // Hold the level open regardless, so level arithmetic against the
                    // assumption count stays aligned.
                    self.engine.new_decision_level();
                }

                Some(false) => {
                    log::info!(target: targets::ANALYSIS, "Assumption {assumption} failed");
                    self.analyse_final(assumption);
                    return Err(());
                }

                None => {
                    self.engine.new_decision_level();
                    self.engine.enqueue(assumption, Reason::Free);
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Chooses an unvalued variable of greatest activity, paired with a polarity.
    fn make_decision(&mut self) -> Option<Lit> {
        let random_cutoff = self.config.random_decision_freq;
        if random_cutoff > 0.0 && self.rng.gen::<f64>() < random_cutoff {
            let free: Vec<usize> = (0..self.engine.cnf.var_count())
                .filter(|&v| {
                    self.engine.cnf.assigns[v].is_none()
                        && self.engine.cnf.var_data[v].removed == Removed::None
                })
                .collect();
            if let Some(&var) = free.get(self.rng.gen_range(0..free.len().max(1))) {
                return Some(Lit::new(var as u32, self.decision_polarity(var)));
            }
        }

        while let Some(var) = self.activity_heap.pop_max() {
            if self.engine.cnf.assigns[var].is_none()
                && self.engine.cnf.var_data[var].removed == Removed::None
            {
                return Some(Lit::new(var as u32, self.decision_polarity(var)));
            }
        }
        None
    }

    /// The polarity for a fresh decision on `var`, per the configured mode.
    fn decision_polarity(&mut self, var: usize) -> bool {
        match self.config.polarity_mode {
            PolarityMode::Positive => true,
            PolarityMode::Negative => false,
            PolarityMode::Saved => self.engine.cnf.var_data[var].saved_polarity,
            PolarityMode::Random => self.rng.gen(),
        }
    }

    /// Notes the glue of a fresh learnt clause in the restart histories.
    fn note_glue(&mut self, glue: u32) {
        self.glue_sum += glue as f64;
        self.glue_count += 1;
        self.glue_history.push_back(glue);
        while self.glue_history.len() > self.config.short_term_history_size {
            self.glue_history.pop_front();
        }
    }

    /// Sets the conflict allowance of the next restart segment.
    fn prime_restart_limit(&mut self) {
        self.restart_limit = match self.config.restart_type {
            RestartType::Luby => {
                let step = self.luby.next().unwrap_or(1) as u64;
                self.config.luby_u * step
            }
            RestartType::Geometric => {
                let mult = 1.5_f64.powi(self.geometric_restarts as i32);
                self.geometric_restarts = self.geometric_restarts.saturating_add(1);
                ((self.config.restart_first as f64) * mult) as u64
            }
            // Glue restarts trigger on deterioration, checked each conflict; the limit acts as
            // a generous fallback.
            RestartType::Glue => self.config.luby_u * 16,
        };
        self.restart_limit = self.restart_limit.max(1);
    }

    /// Whether a restart is due.
    fn restart_due(&mut self) -> bool {
        match self.config.restart_type {
            RestartType::Luby | RestartType::Geometric => {
                self.conflicts_since_restart >= self.restart_limit
            }
            RestartType::Glue => {
                if self.glue_history.len() < self.config.short_term_history_size
                    || self.glue_count == 0
                {
                    return self.conflicts_since_restart >= self.restart_limit;
                }
                let short: f64 = self.glue_history.iter().map(|&g| g as f64).sum::<f64>()
                    / self.glue_history.len() as f64;
                let long = self.glue_sum / self.glue_count as f64;
                short * 0.8 > long || self.conflicts_since_restart >= self.restart_limit
            }
        }
    }

    /// Installs a learnt clause, enqueuing its asserting literal.
    ///
    /// The clause is given with the asserting literal first and a literal of the backjump level
    /// second. The engine is expected to be at the backjump level already.
    fn install_learnt(&mut self, learnt: Vec<Lit>, glue: u32, proof: &mut Option<Trace>) {
        if let Some(trace) = proof {
            trace.add_clause(&learnt);
        }

        match learnt.len() {
            0 => unreachable!("empty learnt clause"),

            1 => {
                self.stats.learnt_units += 1;
                self.engine.enqueue(learnt[0], Reason::Free);
            }

            2 => {
                self.stats.learnt_binaries += 1;
                self.engine.attach_binary(learnt[0], learnt[1], true);
                self.engine.enqueue(learnt[0], Reason::Binary(learnt[1]));
            }

            _ => {
                self.stats.learnt_longs += 1;

                let asserted = learnt[0];
                let mut clause = StoredClause::new(learnt, true);
                clause.glue = glue;
                clause.activity = self.var_inc;

                let tier = self.engine.cnf.tier_for_glue(
                    glue,
                    self.db_config.glue_put_lev0_if_below_or_eq.value,
                    self.db_config.glue_put_lev1_if_below_or_eq.value,
                );
                clause.tier = tier;
                if tier == 0 {
                    self.stats.red_cl_in_which0 += 1;
                }

                let offset = self.engine.cnf.arena.alloc(clause);
                self.engine.cnf.store_offset(offset, true, tier);
                self.engine.attach_clause(offset);
                self.engine.enqueue(asserted, crate::propagation::Reason::Long(offset));
            }
        }
    }
}
