use std::{
    cell::RefCell,
    io::Write,
    rc::Rc,
};

use marten_sat::{
    config::Config, proof::Trace, reports::SolveReport, solver::Solver, structures::literal::Lit,
};

/// A sink sharing its buffer, so records can be read while the solver owns the trace.
struct SharedSink(Rc<RefCell<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

mod proof {
    use super::*;

    #[test]
    fn unsatisfiable_proof_ends_with_the_empty_clause() {
        let buffer = Rc::new(RefCell::new(Vec::new()));

        let mut solver = Solver::from_config(Config::default());
        solver.set_proof_trace(Trace::new(Box::new(SharedSink(buffer.clone()))));

        let x = solver.new_var();
        assert!(solver.add_clause(&[Lit::new(x, true)]).unwrap());
        assert!(!solver.add_clause(&[Lit::new(x, false)]).unwrap());

        assert_eq!(solver.solve(), Ok(SolveReport::Unsatisfiable));
        solver.proof.as_mut().unwrap().flush();

        let text = String::from_utf8(buffer.borrow().clone()).unwrap();
        assert!(text.lines().any(|line| line.trim() == "0"));
    }

    #[test]
    fn rewritten_clauses_add_before_deleting() {
        let buffer = Rc::new(RefCell::new(Vec::new()));

        let mut solver = Solver::from_config(Config::default());
        solver.set_proof_trace(Trace::new(Box::new(SharedSink(buffer.clone()))));

        let vars: Vec<_> = (0..3).map(|_| solver.new_var()).collect();

        // The unit satisfies part of the long clause, so ingestion stores a cleaned form.
        assert!(solver.add_clause(&[Lit::new(vars[0], false)]).unwrap());
        assert!(solver
            .add_clause(&[
                Lit::new(vars[0], true),
                Lit::new(vars[1], true),
                Lit::new(vars[2], true)
            ])
            .unwrap());

        solver.proof.as_mut().unwrap().flush();
        let text = String::from_utf8(buffer.borrow().clone()).unwrap();

        let addition = text.lines().position(|l| l.trim() == "2 3 0");
        let deletion = text.lines().position(|l| l.trim() == "d 1 2 3 0");
        assert!(addition.is_some(), "cleaned clause recorded: {text}");
        assert!(deletion.is_some(), "original clause deleted: {text}");
        assert!(addition < deletion);
    }
}

mod state {
    use super::*;
    use std::path::PathBuf;

    fn scratch_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("marten_sat_test_{name}_{}", std::process::id()));
        path
    }

    #[test]
    fn state_round_trips() {
        let path = scratch_file("round_trip");

        let mut solver = Solver::from_config(Config::default());
        let vars: Vec<_> = (0..4).map(|_| solver.new_var()).collect();
        assert!(solver.add_clause(&[Lit::new(vars[0], true)]).unwrap());
        assert!(solver
            .add_clause(&[Lit::new(vars[1], true), Lit::new(vars[2], true)])
            .unwrap());

        solver.save_state(&path, SolveReport::Unknown).unwrap();

        // A second solver over the same variables accepts the state.
        let mut twin = Solver::from_config(Config::default());
        for _ in 0..4 {
            twin.new_var();
        }
        assert!(twin
            .add_clause(&[Lit::new(vars[1], true), Lit::new(vars[2], true)])
            .unwrap());

        assert_eq!(twin.load_state(&path), Ok(SolveReport::Unknown));
        assert_eq!(twin.solve(), Ok(SolveReport::Satisfiable));
        // The root unit came across with the state.
        assert_eq!(twin.model_value_of(vars[0]), Some(true));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn state_refuses_a_different_numbering() {
        use marten_sat::types::err::{ErrorKind, StateError};

        let path = scratch_file("mismatch");

        let mut solver = Solver::from_config(Config::default());
        for _ in 0..4 {
            solver.new_var();
        }
        solver.save_state(&path, SolveReport::Unknown).unwrap();

        let mut other = Solver::from_config(Config::default());
        other.new_var();

        match other.load_state(&path) {
            Err(ErrorKind::State(StateError::VarCountMismatch { saved, current })) => {
                assert_eq!(saved, 4);
                assert_eq!(current, 1);
            }
            other => panic!("expected a mismatch, got {other:?}"),
        }

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn solution_files_parse() {
        let path = scratch_file("solution");
        std::fs::write(&path, "c a comment\ns SATISFIABLE\nv 1 -2 3 0\n").unwrap();

        let mut solver = Solver::from_config(Config::default());
        for _ in 0..3 {
            solver.new_var();
        }

        assert_eq!(
            solver.load_solution_from_file(&path),
            Ok(SolveReport::Satisfiable)
        );
        assert_eq!(solver.model_value_of(0), Some(true));
        assert_eq!(solver.model_value_of(1), Some(false));
        assert_eq!(solver.model_value_of(2), Some(true));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn indeterminate_solution_files_short_circuit() {
        let path = scratch_file("indeterminate");
        std::fs::write(&path, "s INDETERMINATE\n").unwrap();

        let mut solver = Solver::from_config(Config::default());
        solver.new_var();

        assert_eq!(
            solver.load_solution_from_file(&path),
            Ok(SolveReport::Unknown)
        );

        let _ = std::fs::remove_file(&path);
    }
}

mod undefine {
    use super::*;

    #[test]
    fn unneeded_values_can_be_cleared() {
        let mut solver = Solver::from_config(Config::default());
        let p = solver.new_var();
        let q = solver.new_var();

        // Only one of the two is needed to satisfy the clause.
        assert!(solver.add_clause(&[Lit::new(p, true), Lit::new(q, true)]).unwrap());
        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));

        let candidates = [p, q];
        let cleared = solver.undefine(&candidates);

        // At most one can be unset: the other must keep carrying the clause.
        assert!(cleared <= 1);
        let still_satisfied = solver.model_value_of(p) == Some(true)
            || solver.model_value_of(q) == Some(true);
        assert!(still_satisfied);
    }
}
