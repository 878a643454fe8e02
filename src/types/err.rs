/*!
Error types used in the library.

- Most of these are very unlikely to occur during use.
- Some are internally expected --- e.g. propagation conflicts are used to control the flow of a
  solve, and never escape the library.
- Others are external --- e.g. a solver will return a [VarOutOfRange](IngestError::VarOutOfRange)
  error to highlight a clause mentioning a variable which was never declared.

An unsatisfiable formula is *not* an error.
Unsatisfiability is recorded as a sticky state of the solver, and mutating operations on an
unsatisfiable solver short-circuit with an `ok` of false.
*/

use crate::structures::literal::Var;

/// A union of varied error kinds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// An error while ingesting a clause or XOR constraint.
    Ingest(IngestError),

    /// An error while interpreting an inprocessing schedule.
    Schedule(ScheduleError),

    /// An error while saving or loading persisted solver state.
    State(StateError),

    /// Cooperative cancellation was requested.
    ///
    /// Solves poll an interrupt flag between schedule tokens and search iterations, and return
    /// an unknown report cleanly --- this kind only surfaces from operations with no report to
    /// return.
    Interrupted,
}

/// Errors while ingesting a clause or XOR constraint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IngestError {
    /// A clause or XOR constraint exceeded 2^28 literals.
    ///
    /// The offending addition is abandoned, though the solver remains usable.
    TooLongClause,

    /// The variable count would exceed what literals can represent.
    TooManyVars,

    /// A clause mentioned a variable at or above the declared variable count.
    VarOutOfRange {
        /// The undeclared variable.
        var: Var,
        /// The current count of declared (outside) variables.
        limit: u32,
    },

    /// A clause was added after blocked-clause elimination had been run.
    ///
    /// Blocked-clause elimination is not model-preserving for clauses added later, so this is a
    /// hard failure rather than something to recover from.
    Blocking,
}

impl From<IngestError> for ErrorKind {
    fn from(e: IngestError) -> Self {
        ErrorKind::Ingest(e)
    }
}

/// Errors while interpreting an inprocessing schedule string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScheduleError {
    /// A token of the schedule string was not recognised.
    UnknownToken(String),

    /// A reconfiguration preset id outside the recognised set.
    UnknownPreset(u32),
}

impl From<ScheduleError> for ErrorKind {
    fn from(e: ScheduleError) -> Self {
        ErrorKind::Schedule(e)
    }
}

/// Errors while saving or loading persisted solver state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StateError {
    /// The file could not be read or written.
    Io(String),

    /// The file did not start with the expected magic bytes.
    NotAStateFile,

    /// The file was written by an incompatible version of the library.
    Version(u32),

    /// The file was saved against a different variable numbering.
    ///
    /// Persisted state is only loadable against the exact outer space it was saved from.
    VarCountMismatch {
        saved: u32,
        current: u32,
    },

    /// The file ended early, or a field failed to decode.
    Corrupt,

    /// A solution file line could not be parsed.
    SolutionLine(usize),
}

impl From<StateError> for ErrorKind {
    fn from(e: StateError) -> Self {
        ErrorKind::State(e)
    }
}

impl From<std::io::Error> for StateError {
    fn from(e: std::io::Error) -> Self {
        StateError::Io(e.to_string())
    }
}
