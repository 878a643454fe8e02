/*!
The solve state machine.

```none
Idle → Preparing → Searching ⇄ Simplifying → Terminal(sat | unsat | unknown)
```

- **Preparing.** A solver already unsatisfiable goes terminal at once.
  Otherwise the auxiliary-hiding map is rebuilt, assumptions are installed, and --- in replay
  mode --- saved state and a saved solution are loaded from file.
- **Startup simplify.** When configured, the startup schedule runs before the first search
  episode.
- **Iterate.** Search episodes alternate with full simplify rounds.
  Each episode's conflict budget is `base · incⁱ`, capped by the growth limit and by whatever
  remains of the cumulative conflict limit; a budget of zero ends the solve as unknown.
  Gaussian matrix discovery runs before the first episode.
  After each episode the searcher's statistics fold into the cumulative counters and the
  minimisation effectiveness heuristics retune themselves.
- **Terminal.** On satisfiable: the model is extended and verified.
  On unsatisfiable under assumptions: the conflict is translated back to the caller's
  numbering.
  The conflict and time limits reset to unlimited for the next call.

Every iteration checks the wall clock, the cumulative conflict count, the interrupt flag, the
variable table, and the sticky `ok` flag.
*/

use crate::{
    config::PreprocessMode,
    misc::log::targets,
    reports::SolveReport,
    search::SearchResult,
    types::err::ErrorKind,
};

use super::Solver;

impl Solver {
    /// Determines the satisfiability of the formula under the current assumptions, unless a
    /// resource limit intervenes.
    ///
    /// A terminal unsatisfiable state (without assumptions) is sticky: further calls return
    /// unsatisfiable at once.
    /// Otherwise the solver remains usable: clauses and assumptions may be added and solve
    /// called again.
    pub fn solve(&mut self) -> Result<SolveReport, ErrorKind> {
        self.stats.num_solve_calls += 1;
        self.conflict.clear();
        self.solve_started = Some(std::time::Instant::now());
        self.config.simplify.global_timeout_multiplier =
            self.config.simplify.orig_global_timeout_multiplier;

        // Local copies in the searcher follow the primary configuration.
        self.searcher.config = self.config.search.clone();
        self.searcher.db_config = self.config.clause_db.clone();

        let mut status = SolveReport::Unknown;

        if !self.ok {
            log::info!("Solve called on an unsatisfiable solver");
            status = SolveReport::Unsatisfiable;
            return self.conclude(status);
        }

        self.maps.rebuild_bva_map();
        self.install_assumptions();
        if !self.ok {
            status = SolveReport::Unsatisfiable;
            return self.conclude(status);
        }

        if self.config.preprocess.mode == Some(PreprocessMode::Replay) {
            status = self.replay_from_files()?;

            // The replayed model was extended from file; conclude without rebuilding it.
            self.searcher.engine.cancel_until(0);
            self.unfill_assumptions();
            self.config.solve.max_conflicts = u64::MAX;
            self.config.solve.max_time = std::time::Duration::ZERO;
            self.solve_started = None;
            self.status = status;
            log::info!("Replay concluded: {status}");
            return Ok(status);
        }

        // Startup simplification.
        if status == SolveReport::Unknown
            && self.searcher.engine.cnf.var_count() > 0
            && self.config.simplify.do_simplify_problem
            && self.config.simplify.simplify_at_startup
            && (self.stats.num_simplify == 0 || self.config.simplify.simplify_at_every_startup)
        {
            status = self.simplify_problem(!self.config.simplify.full_simplify_at_startup)?;
        }

        if status == SolveReport::Unknown
            && self.config.preprocess.mode != Some(PreprocessMode::WriteSimplified)
        {
            self.find_and_solve_xor_matrices();
            if !self.ok {
                status = SolveReport::Unsatisfiable;
            } else {
                status = self.iterate_until_solved()?;
            }
        }

        if self.config.preprocess.mode == Some(PreprocessMode::WriteSimplified) {
            self.write_simplified(status)?;
        }

        self.conclude(status)
    }

    /// Search episodes alternating with simplify rounds, until terminal or out of budget.
    fn iterate_until_solved(&mut self) -> Result<SolveReport, ErrorKind> {
        // A formula over no variables is satisfiable by the empty model.
        if self.searcher.engine.cnf.var_count() == 0 {
            return Ok(SolveReport::Satisfiable);
        }

        let mut status = SolveReport::Unknown;
        let mut iteration: u32 = 0;

        while status == SolveReport::Unknown && !self.limits_hit() {
            iteration += 1;

            let budget = self.episode_budget(iteration);
            if budget == 0 {
                log::info!(target: targets::SCHEDULE, "Conflict budget exhausted");
                break;
            }

            log::info!(target: targets::SCHEDULE, "Search episode {iteration}, budget {budget}");
            self.searcher.rebuild_order_heap();
            let result = self.searcher.search(budget, &mut self.proof);

            // Fold the episode's statistics into the cumulative counters.
            self.stats.sum_conflicts += self.searcher.stats.conflicts;
            let episode_stats = self.searcher.stats;
            self.sum_search_stats.absorb(&episode_stats);

            self.check_recursive_minimization_effectiveness(result);
            self.check_minimization_effectiveness(result);
            self.searcher.clear_stats();
            self.check_too_many_low_glues();

            match result {
                SearchResult::Satisfiable => status = SolveReport::Satisfiable,
                SearchResult::Unsatisfiable => {
                    status = SolveReport::Unsatisfiable;
                    // A root-level conflict is terminal; a failed assumption leaves the
                    // formula itself open, and the solver usable.
                    if self.searcher.final_conflict.is_empty() {
                        self.ok = false;
                    }
                }
                SearchResult::Unknown => {
                    if self.limits_hit() {
                        break;
                    }
                    if self.config.simplify.do_simplify_problem
                        && !self.config.solve.never_stop_search
                    {
                        status = self.simplify_problem(false)?;
                    }
                }
            }
        }

        Ok(status)
    }

    /// The conflict budget of an episode: geometric growth, capped, within what remains of the
    /// cumulative limit.
    fn episode_budget(&self, iteration: u32) -> u64 {
        if self.config.solve.never_stop_search {
            return 500_000_000;
        }

        let growth = self
            .config
            .solve
            .search_budget_inc
            .value
            .powi(iteration as i32 - 1)
            .min(self.config.solve.search_budget_inc_max);
        let budget = (self.config.solve.search_budget_base as f64 * growth) as u64;

        let remaining = self
            .config
            .solve
            .max_conflicts
            .saturating_sub(self.stats.sum_conflicts);
        budget.min(remaining)
    }

    /// Terminal handling: model extension and verification on satisfiable, conflict
    /// translation on unsatisfiable, and limit reset.
    fn conclude(&mut self, status: SolveReport) -> Result<SolveReport, ErrorKind> {
        match status {
            SolveReport::Satisfiable => {
                self.extend_solution();
                self.searcher.engine.cancel_until(0);
            }
            SolveReport::Unsatisfiable => {
                self.searcher.engine.cancel_until(0);
                if !self.assumptions.is_empty() {
                    self.translate_final_conflict();
                }
            }
            SolveReport::Unknown => {
                self.searcher.engine.cancel_until(0);
            }
        }

        self.unfill_assumptions();
        self.config.solve.max_conflicts = u64::MAX;
        self.config.solve.max_time = std::time::Duration::ZERO;
        self.solve_started = None;

        self.status = status;
        log::info!("Solve concluded: {status}");
        Ok(status)
    }

    /// Disables recursive minimisation when its cost per removed literal is out of proportion.
    fn check_recursive_minimization_effectiveness(&mut self, result: SearchResult) {
        let stats = &self.searcher.stats;
        if result != SearchResult::Unknown
            || !self.config.search.do_recursive_minim
            || stats.rec_min_lit_rem + stats.lits_red_non_min <= 100_000
        {
            return;
        }

        let removed_percent =
            100.0 * stats.rec_min_lit_rem as f64 / stats.lits_red_non_min.max(1) as f64;
        let cost_per_gained = stats.rec_minim_cost as f64 / removed_percent.max(f64::MIN_POSITIVE);

        if cost_per_gained > 200_000_000.0 {
            log::info!(target: targets::ANALYSIS, "Recursive minimisation too costly, disabling");
            self.config.search.do_recursive_minim = false;
            self.searcher.config.do_recursive_minim = false;
        }
    }

    /// Retunes or disables extra minimisation from its removed-literal percentage.
    fn check_minimization_effectiveness(&mut self, result: SearchResult) {
        let stats = &self.searcher.stats;
        if result != SearchResult::Unknown
            || !self.config.search.do_minim_red_more
            || stats.more_minim_lits_start <= 100_000
        {
            return;
        }

        let removed_percent = 100.0
            * (stats.more_minim_lits_start - stats.more_minim_lits_end) as f64
            / stats.more_minim_lits_start as f64;

        if removed_percent < 1.0 {
            log::info!(target: targets::ANALYSIS, "Extra minimisation ineffective ({removed_percent:.2}%), disabling");
            self.config.search.do_minim_red_more = false;
            self.searcher.config.do_minim_red_more = false;
        } else if removed_percent > 7.0 {
            log::info!(target: targets::ANALYSIS, "Extra minimisation effective ({removed_percent:.2}%), tripling limits");
            self.searcher.config.more_minim_limit_binary =
                3 * self.config.search.more_minim_limit_binary;
            self.searcher.config.more_minim_limit_cache =
                3 * self.config.search.more_minim_limit_cache;
        } else {
            self.searcher.config.more_minim_limit_binary =
                self.config.search.more_minim_limit_binary;
            self.searcher.config.more_minim_limit_cache =
                self.config.search.more_minim_limit_cache;
        }
    }

    /// Lowers the tier 0 glue cutoff when too great a share of learnt clauses lands there.
    fn check_too_many_low_glues(&mut self) {
        if self.config.clause_db.glue_put_lev0_if_below_or_eq.value <= 2
            || self.stats.sum_conflicts < self.config.clause_db.min_num_confl_adjust_glue_cutoff
            || self.stats.adjusted_glue_cutoff
            || self.config.clause_db.adjust_glue_if_too_many_low >= 1.0
        {
            return;
        }

        let share = self.sum_search_stats.red_cl_in_which0 as f64
            / self.stats.sum_conflicts.max(1) as f64;
        if share > self.config.clause_db.adjust_glue_if_too_many_low {
            let lowered = self.config.clause_db.glue_put_lev0_if_below_or_eq.value - 1;
            self.config.clause_db.glue_put_lev0_if_below_or_eq.set(lowered);
            self.searcher.db_config.glue_put_lev0_if_below_or_eq.set(lowered);
            self.stats.adjusted_glue_cutoff = true;
            log::info!(target: targets::REDUCTION, "Tier 0 cutoff lowered to {lowered}: {:.1}% of conflicts landed there", share * 100.0);
        }
    }
}
