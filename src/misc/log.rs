/*!
Miscellaneous items related to [logging](log).

Calls to the log macro are made throughout the library.
These are intended to provide useful information for extending the library and/or fixing issues.

Note, no log implementation is provided.
For more details, see [log].
*/

/// Targets to be used within a [log]! macro.
pub mod targets {
    pub const PROPAGATION: &str = "propagation";
    pub const ANALYSIS: &str = "analysis";
    pub const REDUCTION: &str = "reduction";
    pub const CLAUSE_DB: &str = "clause_db";
    pub const VALUATION: &str = "valuation";
    pub const INGEST: &str = "ingest";
    pub const XOR: &str = "xor";
    pub const SCHEDULE: &str = "schedule";
    pub const RENUMBER: &str = "renumber";
    pub const REPLACE: &str = "replace";
    pub const OCCURRENCE: &str = "occurrence";
    pub const PROBE: &str = "probe";
    pub const DISTILL: &str = "distill";
    pub const CACHE: &str = "cache";
    pub const STAMP: &str = "stamp";
    pub const COMPONENT: &str = "component";
    pub const MATRIX: &str = "matrix";
    pub const EXTEND: &str = "extend";
    pub const PROOF: &str = "proof";
    pub const STATE: &str = "state";
    pub const SUBSUMPTION: &str = "subsumption";
}
