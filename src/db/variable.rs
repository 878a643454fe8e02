//! Per-variable metadata.

/// How, if at all, a variable has been removed from active solving.
///
/// The kinds are mutually exclusive.
/// A removed variable may return: elimination is undone when a fresh clause mentions the
/// variable, and decomposed variables are re-admitted when their component's clauses are
/// restored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removed {
    /// Active.
    None,

    /// Removed by resolution-based variable elimination.
    Elimed,

    /// Merged into an equivalence class representative.
    Replaced,

    /// Owned by a disconnected component being solved separately.
    Decomposed,
}

impl std::fmt::Display for Removed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Elimed => write!(f, "eliminated"),
            Self::Replaced => write!(f, "replaced"),
            Self::Decomposed => write!(f, "decomposed"),
        }
    }
}

/// Metadata kept per variable.
#[derive(Clone, Copy, Debug)]
pub struct VarData {
    /// How, if at all, the variable has been removed.
    pub removed: Removed,

    /// The last polarity the variable held, for phase saving.
    pub saved_polarity: bool,

    /// Whether the variable is an auxiliary introduced by bounded variable addition
    /// (here, by XOR cutting). Auxiliaries are hidden from the caller.
    pub is_bva: bool,
}
