/*!
The inprocessing scheduler.

[simplify_problem](crate::solver::Solver::simplify_problem) interprets a comma-separated
strategy string, one pass per token:

| Token | Effect |
|---|---|
| `find-comps` | Run the component finder, if the free variables are below the limit. |
| `handle-comps` | Detach and solve a component (every second simplify round only). |
| `scc-vrepl` | Merge equivalent literals, if the gain reaches 0.1% of the free variables. |
| `cache-clean` | Remove stale entries from the implication cache. |
| `cache-tryboth` | Derive units from the intersection of each variable's reach sets. |
| `sub-impl` | Deduplicate binary clauses. |
| `intree-probe` | Probe the roots of the binary implication graph. |
| `probe` | Classical failed-literal probing. |
| `sub-str-cls-with-bin` | Subsume and strengthen long clauses with binaries. |
| `distill-cls` | Distill long clauses by partial assertion and propagation. |
| `str-impl` | Strengthen with binary implication stamps. |
| `check-cache-size` | Disable the cache if it outgrew its memory allowance. |
| `renumber` / `must-renumber` | Renumber variables; `must-` ignores the savings threshold. |
| `occ-*` | Buffered; consecutive `occ-` tokens dispatch once to the occurrence simplifier. |
| (empty) | Ignored. |

An unknown token is a hard error.
Between every two tokens the limits are checked: wall clock, cumulative conflicts, the
interrupt flag, an empty variable table, and the sticky `ok` flag; any of these ends the
schedule at once.
Renumbering is always preceded by cache cleaning to a fixed point, as renumbering invalidates
literal identity inside the cache.

After the schedule: unused watch capacity is reclaimed, the pass-budget multiplier grows (up to
its cap), and every `reconfigure_at`-th round may apply a
[reconfiguration preset](crate::config::presets).
*/

use crate::{
    config::presets,
    misc::log::targets,
    reports::SolveReport,
    simplify::components,
    types::err::{ErrorKind, ScheduleError},
};

use super::Solver;

impl Solver {
    /// Whether a resource limit or interrupt ends simplification now.
    pub(crate) fn limits_hit(&self) -> bool {
        if self.stats.sum_conflicts >= self.config.solve.max_conflicts {
            return true;
        }
        if !self.config.solve.max_time.is_zero() {
            if let Some(started) = self.solve_started {
                if started.elapsed() > self.config.solve.max_time {
                    return true;
                }
            }
        }
        self.interrupt_requested() || self.searcher.engine.cnf.var_count() == 0 || !self.ok
    }

    /// Runs a round of simplification: the startup schedule when `startup`, the full schedule
    /// otherwise.
    ///
    /// Returns [Unsatisfiable](SolveReport::Unsatisfiable) if the round established it, and
    /// [Unknown](SolveReport::Unknown) otherwise.
    pub(crate) fn simplify_problem(&mut self, startup: bool) -> Result<SolveReport, ErrorKind> {
        debug_assert!(self.ok);
        debug_assert_eq!(self.searcher.engine.current_level(), 0);
        log::info!(target: targets::SCHEDULE, "Simplify round {} (startup: {startup})", self.stats.num_simplify);

        let schedule = match startup {
            true => self.config.simplify.schedule_startup.clone(),
            false => self.config.simplify.schedule_nonstartup.clone(),
        };

        self.execute_strategy(startup, &schedule)?;

        self.free_unused_watches();

        let simplify = &mut self.config.simplify;
        simplify.global_timeout_multiplier *= simplify.global_timeout_multiplier_multiplier;
        simplify.global_timeout_multiplier = simplify.global_timeout_multiplier.min(
            simplify.orig_global_timeout_multiplier * simplify.global_multiplier_multiplier_max,
        );

        self.maybe_reconfigure()?;
        self.stats.num_simplify += 1;

        if !self.ok {
            return Ok(SolveReport::Unsatisfiable);
        }
        self.searcher.rebuild_order_heap();
        Ok(SolveReport::Unknown)
    }

    /// Interprets a strategy string.
    fn execute_strategy(&mut self, startup: bool, strategy: &str) -> Result<(), ErrorKind> {
        let mut occ_buffer = String::new();

        // A trailing empty token flushes any buffered occ tokens.
        let tokens = strategy.split(',').map(str::trim).chain(std::iter::once(""));

        for raw in tokens {
            if self.limits_hit() {
                return Ok(());
            }

            let token = raw.to_lowercase();

            if !occ_buffer.is_empty() && !token.starts_with("occ") {
                self.dispatch_occ(startup, &occ_buffer);
                occ_buffer.clear();
                if self.limits_hit() {
                    return Ok(());
                }
            }

            if !token.is_empty() && !token.starts_with("occ") {
                log::info!(target: targets::SCHEDULE, "Executing token: {token}");
            }

            match token.as_str() {
                "find-comps" => {
                    if self.n_free_vars() < self.config.subsystems.comp_var_limit {
                        let count = components::count_components(self);
                        log::info!(target: targets::COMPONENT, "Components found: {count}");
                    }
                }

                "handle-comps" => {
                    if self.config.subsystems.do_comp_handler
                        && self.n_free_vars() < self.config.subsystems.comp_var_limit
                        // Finding components can be costly, so only every second round.
                        && self.stats.num_simplify % 2 == 0
                    {
                        let mut comp = self.comp.take();
                        if let Some(handler) = comp.as_mut() {
                            handler.handle(self);
                        }
                        self.comp = comp;
                    }
                }

                "scc-vrepl" => self.scc_vrepl(),

                "cache-clean" => {
                    let mut cache = self.cache.take();
                    if let Some(cache) = cache.as_mut() {
                        cache.clean(self);
                    }
                    self.cache = cache;
                }

                "cache-tryboth" => self.cache_try_both(),

                "sub-impl" => {
                    if self.config.subsystems.do_str_sub_implicit {
                        self.subsume_implicit();
                    }
                }

                "intree-probe" => {
                    if self.config.subsystems.do_intree_probe {
                        self.intree_probe();
                    }
                }

                "probe" => {
                    if self.config.subsystems.do_probe {
                        self.probe();
                    }
                }

                "sub-str-cls-with-bin" => {
                    if self.config.subsystems.do_distill_clauses {
                        self.sub_str_cls_with_bin();
                    }
                }

                "distill-cls" => {
                    if self.config.subsystems.do_distill_clauses {
                        self.distill_clauses();
                    }
                }

                "str-impl" => {
                    if self.config.subsystems.do_str_sub_implicit {
                        self.str_impl_with_stamps();
                    }
                }

                "check-cache-size" => self.check_cache_size(),

                "renumber" | "must-renumber" => {
                    if self.config.subsystems.do_renumber_vars {
                        // Stale cache entries would survive renumbering as wrong literals.
                        self.cache_clean_until_stable();
                        if !self.ok {
                            return Ok(());
                        }
                        self.renumber_variables(token == "must-renumber");
                    }
                }

                "" => {}

                occ if occ.starts_with("occ") => {
                    occ_buffer.push_str(occ);
                    occ_buffer.push(',');
                }

                unknown => {
                    log::error!(target: targets::SCHEDULE, "Unknown strategy token '{unknown}'");
                    return Err(ScheduleError::UnknownToken(unknown.to_string()).into());
                }
            }

            if !self.ok {
                return Ok(());
            }
        }

        Ok(())
    }

    /// Dispatches a buffered run of `occ-` tokens to the occurrence simplifier, and expands
    /// `occ-gauss` into matrix rediscovery.
    fn dispatch_occ(&mut self, startup: bool, buffered: &str) {
        log::info!(target: targets::SCHEDULE, "Executing occ tokens: {buffered}");

        if self.config.subsystems.perform_occur_based_simp {
            let mut occ = self.occ.take();
            if let Some(simplifier) = occ.as_mut() {
                simplifier.simplify(startup, buffered, self);
            }
            self.occ = occ;
        }

        if self.ok && buffered.contains("occ-gauss") {
            self.find_and_solve_xor_matrices();
        }
    }

    /// Disables and frees the cache if it has outgrown its memory allowance.
    fn check_cache_size(&mut self) {
        let Some(cache) = self.cache.as_mut() else {
            return;
        };
        let used_mb = cache.mem_used() / (1024 * 1024);
        if used_mb > self.config.subsystems.max_cache_size_mb {
            log::info!(target: targets::CACHE, "Cache at {used_mb} MB over limit, disabling");
            cache.free();
            self.cache = None;
            self.config.subsystems.do_cache = false;
        }
    }

    /// Releases the watch slots of removed variables.
    ///
    /// Only stale long watchers (of freed or reshaped clauses) may remain there; a live
    /// watcher on a removed variable would mean a clause survived with the variable in it.
    fn free_unused_watches(&mut self) {
        for var in 0..self.searcher.engine.cnf.var_count() as u32 {
            let removed = self.searcher.engine.cnf.var_data[var as usize].removed;
            if removed == crate::db::variable::Removed::None {
                continue;
            }

            for polarity in [true, false] {
                let literal = crate::structures::literal::Lit::new(var, polarity);
                let stale = self.searcher.engine.cnf.watches.clear_of(literal);
                for watcher in stale {
                    match watcher {
                        crate::db::watches::Watcher::Long { offset, generation, .. } => {
                            debug_assert!(
                                !self.searcher.engine.cnf.arena.is_allocated(offset)
                                    || self.searcher.engine.cnf.arena.get(offset).generation
                                        != generation,
                                "live long watcher on a removed variable"
                            );
                        }
                        crate::db::watches::Watcher::Binary { other, .. } => {
                            debug_assert!(
                                false,
                                "live binary watcher {literal} {other} on a removed variable"
                            );
                            let _ = other;
                        }
                    }
                }
            }
        }
        self.searcher.engine.cnf.watches.reclaim();
    }

    /// Applies the configured reconfiguration preset at the `reconfigure_at`-th round.
    fn maybe_reconfigure(&mut self) -> Result<(), ErrorKind> {
        let enough_structure = self.searcher.engine.cnf.var_count() > 2
            && (self.searcher.engine.cnf.long_clause_count() > 1
                || self.searcher.engine.cnf.binary.irredundant
                    + self.searcher.engine.cnf.binary.redundant
                    > 0);

        if !enough_structure || self.stats.num_simplify != self.config.simplify.reconfigure_at {
            return Ok(());
        }

        let mut preset = self.config.simplify.reconfigure_val;
        if preset == 100 {
            preset = self.preset_from_features();
        }
        if preset == 0 {
            return Ok(());
        }

        let reset_allowance = presets::apply_preset(&mut self.config, preset)
            .map_err(ErrorKind::Schedule)?;

        // Local copies in the searcher follow the primary configuration.
        self.searcher.config = self.config.search.clone();
        self.searcher.db_config = self.config.clause_db.clone();
        if reset_allowance {
            self.searcher.temp_lev2_allowance =
                self.config.clause_db.max_temp_lev2_learnt_clauses;
        }

        Ok(())
    }

    /// A preset chosen from cheap structural features of the problem.
    fn preset_from_features(&self) -> u32 {
        let vars = self.n_free_vars().max(1);
        let long = self.searcher.engine.cnf.long_clause_count();
        let binary = (self.searcher.engine.cnf.binary.irredundant
            + self.searcher.engine.cnf.binary.redundant) as usize;

        let clause_var_ratio = (long + binary) as f64 / vars as f64;
        let binary_share = binary as f64 / (long + binary).max(1) as f64;

        if !self.searcher.engine.cnf.xors.is_empty() {
            // Parity-heavy problems want the searcher kept running.
            6
        } else if clause_var_ratio > 10.0 {
            12
        } else if binary_share > 0.7 {
            7
        } else {
            13
        }
    }
}
