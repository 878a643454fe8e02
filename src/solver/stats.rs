//! Counters across the lifetime of a solver.

/// Counters across the lifetime of a solver.
///
/// Per-episode search statistics are folded into
/// [sum_search_stats](crate::solver::Solver::sum_search_stats) as episodes conclude; the
/// counters here belong to the orchestrator itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct SolveStats {
    /// Calls to [solve](crate::solver::Solver::solve).
    pub num_solve_calls: u64,

    /// Completed simplification rounds.
    pub num_simplify: u64,

    /// Conflicts accumulated across every search episode.
    pub sum_conflicts: u64,

    /// Root-level assignments which arrived through clause ingestion.
    pub zero_level_assigns_by_cnf: u64,

    /// Variables merged into equivalence representatives, in total.
    pub vars_replaced: u64,

    /// Variables eliminated by resolution, in total.
    pub vars_eliminated: u64,

    /// Variables currently owned by detached components.
    pub vars_decomposed: u64,

    /// Renumber passes which ran to completion.
    pub renumbers: u64,

    /// Whether the tier 0 glue cutoff has been lowered due to too many low-glue clauses.
    pub adjusted_glue_cutoff: bool,
}
