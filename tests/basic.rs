use marten_sat::{config::Config, reports::SolveReport, solver::Solver, structures::literal::Lit};

fn lit(solver_vars: &[u32], index: usize, polarity: bool) -> Lit {
    Lit::new(solver_vars[index], polarity)
}

mod basic {
    use super::*;

    #[test]
    fn one_literal() {
        let mut solver = Solver::from_config(Config::default());
        let x = solver.new_var();

        assert_eq!(solver.add_clause(&[Lit::new(x, true)]), Ok(true));
        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        assert_eq!(solver.model_value_of(x), Some(true));
    }

    #[test]
    fn unit_chain_propagates() {
        let mut solver = Solver::from_config(Config::default());
        let vars: Vec<_> = (0..3).map(|_| solver.new_var()).collect();

        assert!(solver.add_clause(&[lit(&vars, 0, true)]).unwrap());
        assert!(solver
            .add_clause(&[lit(&vars, 0, false), lit(&vars, 1, true)])
            .unwrap());
        assert!(solver
            .add_clause(&[lit(&vars, 1, false), lit(&vars, 2, true)])
            .unwrap());

        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        for &var in &vars {
            assert_eq!(solver.model_value_of(var), Some(true));
        }
    }

    #[test]
    fn contradictory_units_are_unsat() {
        let mut solver = Solver::from_config(Config::default());
        let x = solver.new_var();

        assert_eq!(solver.add_clause(&[Lit::new(x, true)]), Ok(true));
        // The second unit contradicts at the root: ok flips immediately.
        assert_eq!(solver.add_clause(&[Lit::new(x, false)]), Ok(false));
        assert!(!solver.okay());

        assert_eq!(solver.solve(), Ok(SolveReport::Unsatisfiable));
        assert!(solver.conflict().is_empty());

        // Unsatisfiability is sticky.
        assert_eq!(solver.add_clause(&[Lit::new(x, true)]), Ok(false));
        assert_eq!(solver.solve(), Ok(SolveReport::Unsatisfiable));
    }

    #[test]
    fn all_four_binaries_conflict() {
        let mut solver = Solver::from_config(Config::default());
        let p = solver.new_var();
        let q = solver.new_var();

        assert!(solver.add_clause(&[Lit::new(p, true), Lit::new(q, true)]).unwrap());
        assert!(solver.add_clause(&[Lit::new(p, false), Lit::new(q, false)]).unwrap());
        assert!(solver.add_clause(&[Lit::new(p, true), Lit::new(q, false)]).unwrap());
        let ok = solver.add_clause(&[Lit::new(p, false), Lit::new(q, true)]).unwrap();

        if ok {
            assert_eq!(solver.solve(), Ok(SolveReport::Unsatisfiable));
        } else {
            assert_eq!(solver.solve(), Ok(SolveReport::Unsatisfiable));
        }
    }

    #[test]
    fn duplicates_and_tautologies() {
        let mut solver = Solver::from_config(Config::default());
        let p = solver.new_var();
        let q = solver.new_var();

        // A tautological clause changes nothing.
        assert!(solver
            .add_clause(&[Lit::new(p, true), Lit::new(q, false), Lit::new(p, false)])
            .unwrap());

        // Duplicate literals collapse; the solve is otherwise unconstrained.
        assert!(solver
            .add_clause(&[Lit::new(p, true), Lit::new(p, true), Lit::new(q, true)])
            .unwrap());

        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        let model_p = solver.model_value_of(p);
        let model_q = solver.model_value_of(q);
        assert!(model_p == Some(true) || model_q == Some(true));
    }

    #[test]
    fn out_of_range_variable_is_refused() {
        use marten_sat::types::err::{ErrorKind, IngestError};

        let mut solver = Solver::from_config(Config::default());
        let _ = solver.new_var();

        let result = solver.add_clause(&[Lit::new(7, true)]);
        assert_eq!(
            result,
            Err(ErrorKind::Ingest(IngestError::VarOutOfRange { var: 7, limit: 1 }))
        );
    }

    #[test]
    fn empty_variable_table_is_satisfiable() {
        let mut solver = Solver::from_config(Config::default());
        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
    }
}

mod incremental {
    use super::*;

    #[test]
    fn clause_added_after_sat_forces_a_new_model() {
        let mut solver = Solver::from_config(Config::default());
        let vars: Vec<_> = (0..4).map(|_| solver.new_var()).collect();

        assert!(solver
            .add_clause(&[lit(&vars, 0, true), lit(&vars, 1, true)])
            .unwrap());
        assert!(solver
            .add_clause(&[lit(&vars, 2, true), lit(&vars, 3, true)])
            .unwrap());

        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        let first_model: Vec<_> = vars.iter().map(|&v| solver.model_value_of(v)).collect();

        // Forbid the found model.
        let blocking: Vec<Lit> = vars
            .iter()
            .zip(&first_model)
            .map(|(&v, value)| Lit::new(v, !value.unwrap()))
            .collect();
        let ok = solver.add_clause(&blocking).unwrap();

        match solver.solve() {
            Ok(SolveReport::Satisfiable) => {
                assert!(ok);
                let second_model: Vec<_> =
                    vars.iter().map(|&v| solver.model_value_of(v)).collect();
                assert_ne!(first_model, second_model);
            }
            Ok(SolveReport::Unsatisfiable) => {}
            other => panic!("unexpected report {other:?}"),
        }
    }

    #[test]
    fn solve_twice_without_changes() {
        let mut solver = Solver::from_config(Config::default());
        let p = solver.new_var();
        let q = solver.new_var();
        assert!(solver.add_clause(&[Lit::new(p, true), Lit::new(q, true)]).unwrap());

        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
    }
}

mod larger {
    use super::*;

    /// The pigeonhole principle for three pigeons and two holes, as CNF.
    #[test]
    fn pigeonhole_three_two_is_unsat() {
        let mut solver = Solver::from_config(Config::default());

        // pigeon p sits in hole h: vars[p][h].
        let vars: Vec<Vec<u32>> = (0..3)
            .map(|_| (0..2).map(|_| solver.new_var()).collect())
            .collect();

        // Every pigeon somewhere.
        for pigeon in &vars {
            let clause: Vec<Lit> = pigeon.iter().map(|&v| Lit::new(v, true)).collect();
            assert!(solver.add_clause(&clause).unwrap());
        }

        // No two pigeons share a hole.
        for hole in 0..2 {
            for a in 0..3 {
                for b in (a + 1)..3 {
                    let clause = [
                        Lit::new(vars[a][hole], false),
                        Lit::new(vars[b][hole], false),
                    ];
                    if !solver.add_clause(&clause).unwrap() {
                        break;
                    }
                }
            }
        }

        assert_eq!(solver.solve(), Ok(SolveReport::Unsatisfiable));
    }

    /// A satisfiable chain of implications with a few side constraints; the model is verified
    /// internally on every satisfiable conclusion.
    #[test]
    fn implication_ladder_is_sat() {
        let mut solver = Solver::from_config(Config::default());
        let vars: Vec<_> = (0..24).map(|_| solver.new_var()).collect();

        for window in vars.windows(2) {
            assert!(solver
                .add_clause(&[Lit::new(window[0], false), Lit::new(window[1], true)])
                .unwrap());
        }
        assert!(solver.add_clause(&[Lit::new(vars[0], true)]).unwrap());
        assert!(solver
            .add_clause(&[
                Lit::new(vars[5], false),
                Lit::new(vars[11], true),
                Lit::new(vars[17], true)
            ])
            .unwrap());

        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        for &var in &vars {
            assert_eq!(solver.model_value_of(var), Some(true));
        }
    }
}
