/*!
Configuration of a solver.

Primary configuration is by way of a [Config] struct, passed to the solver on creation.
The configuration is a tree: limits on the overall solve, tunables for the searcher and the
clause database, the inprocessing schedules, switches for each optional subsystem, and the
preprocess (state save/replay) setup.

Some structures clone the parts of the configuration relevant to them on creation.
*/

mod config_option;
pub use config_option::ConfigOption;

pub mod presets;

use std::path::PathBuf;
use std::time::Duration;

use crate::structures::{clause::Glue, literal::Var};

/// Which rule paces restarts within the searcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartType {
    /// Restart intervals follow the luby sequence.
    Luby,

    /// Restart intervals grow geometrically.
    Geometric,

    /// Restart on short-term glue deterioration.
    Glue,
}

/// How the polarity of a fresh decision is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolarityMode {
    /// Always positive.
    Positive,

    /// Always negative.
    Negative,

    /// The last value the variable held (phase saving).
    Saved,

    /// Random, by way of the searcher's rng.
    Random,
}

/// The preprocess mode of a solve, selecting between plain solving, writing simplified state,
/// and replaying a solution against saved state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreprocessMode {
    /// Solve, with inprocessing.
    Solve,

    /// Simplify, then write the solver state and the simplified formula to file.
    WriteSimplified,

    /// Load saved state and a solution file, and extend the solution to the original formula.
    Replay,
}

/// Limits and pacing for a call to solve.
#[derive(Clone, Debug)]
pub struct SolveConfig {
    /// The cumulative conflict limit. Reset to unlimited when a solve returns.
    pub max_conflicts: u64,

    /// The wall-clock limit. Zero is unlimited. Reset to unlimited when a solve returns.
    pub max_time: Duration,

    /// The conflict budget given to the first search episode.
    pub search_budget_base: u64,

    /// Per-iteration growth of the search budget.
    pub search_budget_inc: ConfigOption<f64>,

    /// Cap on the accumulated growth of the search budget.
    pub search_budget_inc_max: f64,

    /// Hand the searcher an effectively unbounded budget, skipping further simplification.
    pub never_stop_search: bool,

    /// Seed for the searcher's rng.
    pub seed: u64,
}

impl Default for SolveConfig {
    fn default() -> Self {
        SolveConfig {
            max_conflicts: u64::MAX,
            max_time: Duration::ZERO,
            search_budget_base: 50_000,
            search_budget_inc: ConfigOption {
                name: "search_budget_inc",
                min: 1.0,
                max: 10.0,
                value: 1.4,
            },
            search_budget_inc_max: 10.0,
            never_stop_search: false,
            seed: 0,
        }
    }
}

/// Configuration of the searcher.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Which rule paces restarts.
    pub restart_type: RestartType,

    /// Conflicts before the first restart, for geometric pacing.
    pub restart_first: u64,

    /// The `u` value the luby sequence is multiplied by when pacing restarts.
    pub luby_u: u64,

    /// How the polarity of a fresh decision is chosen.
    pub polarity_mode: PolarityMode,

    /// The ceiling variable-activity decay is adjusted towards.
    pub var_decay_max: ConfigOption<f64>,

    /// The probability a decision is taken at random rather than by activity.
    pub random_decision_freq: f64,

    /// Permit recursive minimisation of learnt clauses.
    pub do_recursive_minim: bool,

    /// Permit the extra minimisation of learnt clauses with binary clauses and the cache.
    pub do_minim_red_more: bool,

    /// Limit on binary-clause lookups during extra minimisation.
    pub more_minim_limit_binary: u32,

    /// Limit on cache lookups during extra minimisation.
    pub more_minim_limit_cache: u32,

    /// Only learnt clauses of at most this many literals are extra-minimised.
    pub max_num_lits_more_minim: u32,

    /// The count of recent glues kept for glue-based restarts.
    pub short_term_history_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            restart_type: RestartType::Luby,
            restart_first: 100,
            luby_u: 100,
            polarity_mode: PolarityMode::Saved,
            var_decay_max: ConfigOption {
                name: "var_decay_max",
                min: 0.0,
                max: 1.0,
                value: 0.95,
            },
            random_decision_freq: 0.0,
            do_recursive_minim: true,
            do_minim_red_more: true,
            more_minim_limit_binary: 200,
            more_minim_limit_cache: 400,
            max_num_lits_more_minim: 10,
            short_term_history_size: 50,
        }
    }
}

/// Configuration of the clause database, in particular the redundant tiers.
#[derive(Clone, Debug)]
pub struct ClauseDBConfig {
    /// Learnt clauses of glue at or below this sit in tier 0, and are never reduced.
    pub glue_put_lev0_if_below_or_eq: ConfigOption<Glue>,

    /// Learnt clauses of glue at or below this (and above the tier 0 cutoff) sit in tier 1.
    /// Zero disables the tier.
    pub glue_put_lev1_if_below_or_eq: ConfigOption<Glue>,

    /// Conflicts between reductions of tier 1.
    pub every_lev1_reduce: u64,

    /// Conflicts between reductions of tier 2.
    pub every_lev2_reduce: u64,

    /// The count of tier 2 clauses kept through a reduction.
    pub max_temp_lev2_learnt_clauses: usize,

    /// Growth of the tier 2 allowance after each reduction.
    pub inc_max_temp_lev2_red_cls: f64,

    /// The share of clauses kept by glue during a reduction.
    pub ratio_keep_glue: f64,

    /// The share of clauses kept by activity during a reduction.
    pub ratio_keep_activity: f64,

    /// Lower the tier 0 cutoff if more than this share of conflicts land in tier 0.
    /// A value at or above 1.0 disables the adjustment.
    pub adjust_glue_if_too_many_low: f64,

    /// Conflicts before the tier 0 cutoff adjustment is considered.
    pub min_num_confl_adjust_glue_cutoff: u64,
}

impl Default for ClauseDBConfig {
    fn default() -> Self {
        ClauseDBConfig {
            glue_put_lev0_if_below_or_eq: ConfigOption {
                name: "glue_put_lev0_if_below_or_eq",
                min: 0,
                max: 100,
                value: 3,
            },
            glue_put_lev1_if_below_or_eq: ConfigOption {
                name: "glue_put_lev1_if_below_or_eq",
                min: 0,
                max: 100,
                value: 6,
            },
            every_lev1_reduce: 10_000,
            every_lev2_reduce: 15_000,
            max_temp_lev2_learnt_clauses: 30_000,
            inc_max_temp_lev2_red_cls: 1.0,
            ratio_keep_glue: 0.5,
            ratio_keep_activity: 0.5,
            adjust_glue_if_too_many_low: 0.65,
            min_num_confl_adjust_glue_cutoff: 100_000,
        }
    }
}

/// Configuration of inprocessing: whether, when, and which schedule.
#[derive(Clone, Debug)]
pub struct SimplifyConfig {
    /// Run simplification at all.
    pub do_simplify_problem: bool,

    /// Run the startup schedule before the first search episode.
    pub simplify_at_startup: bool,

    /// Run the startup schedule at the start of every solve call, not only the first.
    pub simplify_at_every_startup: bool,

    /// Use the full (non-startup) schedule at startup.
    pub full_simplify_at_startup: bool,

    /// The comma-separated schedule executed at startup.
    pub schedule_startup: String,

    /// The comma-separated schedule executed between search episodes.
    pub schedule_nonstartup: String,

    /// Multiplier applied to every pass-internal budget. Grows each simplify round.
    pub global_timeout_multiplier: f64,

    /// The value the multiplier is reset to at the start of a solve.
    pub orig_global_timeout_multiplier: f64,

    /// Per-round growth of the multiplier.
    pub global_timeout_multiplier_multiplier: f64,

    /// Cap on the growth, as a multiple of the original multiplier.
    pub global_multiplier_multiplier_max: f64,

    /// Extract features and consider a reconfiguration preset after this many simplify rounds.
    pub reconfigure_at: u64,

    /// The preset applied at the reconfigure point. Zero leaves the configuration alone.
    pub reconfigure_val: u32,

    /// In [WriteSimplified](PreprocessMode::WriteSimplified) mode, write the simplified formula
    /// even when the solve concluded during preprocessing.
    pub emit_cnf_despite_solution: bool,

    /// The share of eliminable variables the occurrence simplifier may remove per round.
    pub var_elim_ratio_per_iter: f64,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        SimplifyConfig {
            do_simplify_problem: true,
            simplify_at_startup: true,
            simplify_at_every_startup: false,
            full_simplify_at_startup: false,
            schedule_startup: String::from(
                "sub-impl, occ-backw-sub-str, occ-clean-implicit, occ-bve, occ-gauss, \
                 intree-probe, probe, distill-cls, scc-vrepl, sub-impl, str-impl, sub-impl, \
                 check-cache-size, renumber",
            ),
            schedule_nonstartup: String::from(
                "handle-comps, scc-vrepl, cache-clean, cache-tryboth, sub-impl, intree-probe, \
                 probe, sub-str-cls-with-bin, distill-cls, occ-backw-sub-str, occ-bve, \
                 scc-vrepl, sub-impl, str-impl, sub-impl, check-cache-size, renumber",
            ),
            global_timeout_multiplier: 1.0,
            orig_global_timeout_multiplier: 1.0,
            global_timeout_multiplier_multiplier: 1.1,
            global_multiplier_multiplier_max: 3.0,
            reconfigure_at: 2,
            reconfigure_val: 0,
            emit_cnf_despite_solution: true,
            var_elim_ratio_per_iter: 1.6,
        }
    }
}

/// Switches and limits for the optional subsystems.
#[derive(Clone, Debug)]
pub struct SubsystemConfig {
    /// Permit classical failed-literal probing.
    pub do_probe: bool,

    /// Permit in-tree failed-literal probing.
    pub do_intree_probe: bool,

    /// Permit the implication cache.
    pub do_cache: bool,

    /// Disable and free the cache when it exceeds this many megabytes.
    pub max_cache_size_mb: usize,

    /// Permit occurrence-based simplification (variable elimination, subsumption).
    pub perform_occur_based_simp: bool,

    /// Permit blocked-clause elimination within occurrence-based simplification.
    ///
    /// Once run, no further clauses may be added to the solver.
    pub do_blocked_clause: bool,

    /// Permit stamping over the binary implication graph.
    pub do_stamp: bool,

    /// Permit subsumption and strengthening of implicit (binary) clauses.
    pub do_str_sub_implicit: bool,

    /// Permit distillation (vivification) of long clauses.
    pub do_distill_clauses: bool,

    /// Permit equivalent-literal discovery and replacement.
    pub do_find_and_replace_eq_lits: bool,

    /// Permit the component handler.
    pub do_comp_handler: bool,

    /// Only look for components when fewer free variables than this remain.
    pub comp_var_limit: usize,

    /// Permit variable renumbering.
    pub do_renumber_vars: bool,

    /// Shrink per-variable structures after a renumber.
    pub do_save_memory: bool,
}

impl Default for SubsystemConfig {
    fn default() -> Self {
        SubsystemConfig {
            do_probe: true,
            do_intree_probe: true,
            do_cache: true,
            max_cache_size_mb: 2048,
            perform_occur_based_simp: true,
            do_blocked_clause: false,
            do_stamp: true,
            do_str_sub_implicit: true,
            do_distill_clauses: true,
            do_find_and_replace_eq_lits: true,
            do_comp_handler: true,
            comp_var_limit: 1_000_000,
            do_renumber_vars: true,
            do_save_memory: true,
        }
    }
}

/// The preprocess (state save/replay) setup.
#[derive(Clone, Debug, Default)]
pub struct PreprocessConfig {
    /// Which preprocess mode the next solve runs in.
    pub mode: Option<PreprocessMode>,

    /// Where solver state is saved to, or loaded from.
    pub saved_state_file: Option<PathBuf>,

    /// Where the simplified formula is written in [WriteSimplified](PreprocessMode::WriteSimplified) mode.
    pub simplified_cnf: Option<PathBuf>,

    /// The solution file consulted in [Replay](PreprocessMode::Replay) mode.
    pub solution_file: Option<PathBuf>,

    /// If set, only these (outside) variables are candidates for
    /// [undefine](crate::solver::Solver::undefine).
    pub independent_vars: Option<Vec<Var>>,
}

/// The primary configuration structure.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Limits and pacing for a call to solve.
    pub solve: SolveConfig,

    /// Configuration of the searcher.
    pub search: SearchConfig,

    /// Configuration of the clause database.
    pub clause_db: ClauseDBConfig,

    /// Configuration of inprocessing.
    pub simplify: SimplifyConfig,

    /// Switches and limits for the optional subsystems.
    pub subsystems: SubsystemConfig,

    /// The preprocess (state save/replay) setup.
    pub preprocess: PreprocessConfig,
}
