//! High-level reports on a solve.

/// The outcome of a call to [solve](crate::solver::Solver::solve).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SolveReport {
    /// A model of the formula was found, and is available through
    /// [model](crate::solver::Solver::model).
    Satisfiable,

    /// The formula is unsatisfiable under the current assumptions.
    ///
    /// If assumptions were set, a conflict clause over the assumption literals is available
    /// through [conflict](crate::solver::Solver::conflict).
    Unsatisfiable,

    /// No conclusion was reached before a resource limit, or an interrupt.
    Unknown,
}

impl std::fmt::Display for SolveReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Satisfiable => write!(f, "SATISFIABLE"),
            Self::Unsatisfiable => write!(f, "UNSATISFIABLE"),
            Self::Unknown => write!(f, "INDETERMINATE"),
        }
    }
}
