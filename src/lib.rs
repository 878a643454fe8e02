//! A library for determining the satisfiability of boolean formulas written in conjunctive normal form, extended with parity (XOR) constraints.
//!
//! marten_sat is a conflict-driven clause-learning solver whose distinguishing feature is the
//! *orchestration layer*: a [solver](crate::solver) which owns the clause database and variable
//! metadata across three numbering spaces, normalises and ingests clauses (including the CNF
//! encoding of XOR constraints), and alternates search with a configurable schedule of
//! simplification passes — equivalence replacement, bounded variable elimination, probing,
//! distillation, component decomposition, Gaussian reasoning over parity constraints, and
//! variable renumbering — while keeping every cross-component invariant intact.
//!
//! # Orientation
//!
//! The library is designed around the core structure of a [Solver](crate::solver::Solver).
//!
//! Internally, and at a high level, a solve is viewed in terms of manipulation of, and
//! relationships between, a handful of databases:
//! - The formula is stored in a [clause database](crate::db), with unit clauses installed
//!   directly on the [trail](crate::db::trail), binary clauses held only in the
//!   [watch lists](crate::db::watches), and longer clauses allocated in an
//!   [arena](crate::db::arena).
//! - A valuation is stored alongside per-variable metadata, in the *inter* numbering space.
//! - The [coordinate maps](crate::coordinates) relate the caller's numbering (*outside*) to the
//!   internal spaces (*outer* and *inter*), so that simplification is free to eliminate, merge,
//!   and renumber variables without the caller noticing.
//!
//! Useful starting points:
//! - The high-level [solve procedure](crate::solver::Solver::solve) for the search/simplify loop.
//! - The [ingestion pipeline](crate::solver::Solver::add_clause) for how clauses enter the solver.
//! - The [inprocessing schedule](crate::config::SimplifyConfig) for which passes run, and when.
//! - The [configuration](crate::config) for what is supported.
//!
//! # Example
//!
//! ```rust
//! # use marten_sat::config::Config;
//! # use marten_sat::solver::Solver;
//! # use marten_sat::reports::SolveReport;
//! # use marten_sat::structures::literal::Lit;
//! let mut solver = Solver::from_config(Config::default());
//!
//! let x = solver.new_var();
//! let y = solver.new_var();
//!
//! solver.add_clause(&[Lit::new(x, true)]).unwrap();
//! solver.add_clause(&[Lit::new(x, false), Lit::new(y, true)]).unwrap();
//!
//! assert_eq!(solver.solve().unwrap(), SolveReport::Satisfiable);
//! assert_eq!(solver.model_value_of(y), Some(true));
//! ```
//!
//! # Proofs
//!
//! The solver can emit a DRAT trace of clause additions and deletions through a
//! [proof sink](crate::proof). Emission is in logical-time order: whenever a clause is rewritten,
//! the new form is recorded before the old form is deleted.
//!
//! # Logs
//!
//! Calls to [log!](log) are made throughout, with a target per subsystem (see [misc::log]) so
//! output can be narrowed, e.g. `RUST_LOG=renumber=debug`. No log implementation is provided.

#![allow(clippy::single_match)]
#![allow(clippy::collapsible_else_if)]

pub mod config;
pub mod solver;

pub mod coordinates;
pub mod db;
pub mod propagation;
pub mod search;
pub mod simplify;

pub mod extend;
pub mod proof;
pub mod state;
pub mod sync;

pub mod generic;
pub mod misc;
pub mod reports;
pub mod structures;
pub mod types;
