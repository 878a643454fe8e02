/*!
The simplification passes.

Each pass is a service of the [solver](crate::solver): passes with persistent state own a
structure held by the solver (taken and restored around dispatch, so the pass may call back
into the solver), and stateless passes are solver methods.
All passes run at decision level zero, and any pass which establishes unsatisfiability does so
by setting the solver's sticky `ok` flag before returning.

Which passes run, and in which order, is decided by the
[inprocessing schedule](crate::solver::Solver::simplify_problem).
*/

pub mod cache;
pub mod components;
pub mod distill;
pub mod matrix;
pub mod occurrence;
pub mod probe;
pub mod scc;
pub mod stamp;
pub mod subsume;
