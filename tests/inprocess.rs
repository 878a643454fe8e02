use marten_sat::{
    config::Config,
    reports::SolveReport,
    solver::Solver,
    structures::literal::Lit,
    types::err::{ErrorKind, ScheduleError},
};

mod equivalence {
    use super::*;

    #[test]
    fn implication_cycle_merges_and_survives_renumbering() {
        let mut solver = Solver::from_config(Config::default());
        let vars: Vec<_> = (0..8).map(|_| solver.new_var()).collect();

        // vars[0] ≡ vars[1] by a binary cycle.
        assert!(solver
            .add_clause(&[Lit::new(vars[0], true), Lit::new(vars[1], false)])
            .unwrap());
        assert!(solver
            .add_clause(&[Lit::new(vars[0], false), Lit::new(vars[1], true)])
            .unwrap());

        // Some padding clauses so simplification has something to hold on to.
        for window in vars[2..].windows(2) {
            assert!(solver
                .add_clause(&[Lit::new(window[0], true), Lit::new(window[1], true)])
                .unwrap());
        }

        // A clause over the merged variable, added after the merge happens inside solve.
        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));

        let equivalences = solver.get_all_binary_xors();
        assert_eq!(equivalences.len(), 1);

        // The two variables agree in the model.
        assert_eq!(
            solver.model_value_of(vars[0]),
            solver.model_value_of(vars[1])
        );

        // Ingestion of a clause over a replaced variable rewrites onto the representative, and
        // further solves stay consistent.
        assert!(solver
            .add_clause(&[Lit::new(vars[1], true), Lit::new(vars[7], true)])
            .unwrap());
        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        assert_eq!(
            solver.model_value_of(vars[0]),
            solver.model_value_of(vars[1])
        );
    }

    #[test]
    fn contradictory_cycle_is_unsat() {
        let mut solver = Solver::from_config(Config::default());
        let p = solver.new_var();
        let q = solver.new_var();

        // p ≡ q and p ≡ ¬q together put a literal and its negation in one component.
        assert!(solver.add_clause(&[Lit::new(p, true), Lit::new(q, false)]).unwrap());
        assert!(solver.add_clause(&[Lit::new(p, false), Lit::new(q, true)]).unwrap());
        assert!(solver.add_clause(&[Lit::new(p, true), Lit::new(q, true)]).unwrap());
        let ok = solver
            .add_clause(&[Lit::new(p, false), Lit::new(q, false)])
            .unwrap();

        if ok {
            assert_eq!(solver.solve(), Ok(SolveReport::Unsatisfiable));
        }
        assert!(!solver.okay());
    }
}

mod scheduling {
    use super::*;

    #[test]
    fn unknown_token_is_a_hard_error() {
        let mut config = Config::default();
        config.simplify.schedule_startup = String::from("scc-vrepl, frobnicate");

        let mut solver = Solver::from_config(config);
        let p = solver.new_var();
        let q = solver.new_var();
        assert!(solver.add_clause(&[Lit::new(p, true), Lit::new(q, true)]).unwrap());

        assert_eq!(
            solver.solve(),
            Err(ErrorKind::Schedule(ScheduleError::UnknownToken(
                String::from("frobnicate")
            )))
        );
    }

    #[test]
    fn empty_tokens_are_ignored() {
        let mut config = Config::default();
        config.simplify.schedule_startup = String::from(", ,scc-vrepl,, renumber ,");

        let mut solver = Solver::from_config(config);
        let p = solver.new_var();
        let q = solver.new_var();
        assert!(solver.add_clause(&[Lit::new(p, true), Lit::new(q, true)]).unwrap());

        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
    }

    #[test]
    fn simplification_can_be_disabled() {
        let mut config = Config::default();
        config.simplify.do_simplify_problem = false;

        let mut solver = Solver::from_config(config);
        let vars: Vec<_> = (0..6).map(|_| solver.new_var()).collect();
        for window in vars.windows(2) {
            assert!(solver
                .add_clause(&[Lit::new(window[0], false), Lit::new(window[1], true)])
                .unwrap());
        }
        assert!(solver.add_clause(&[Lit::new(vars[0], true)]).unwrap());

        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        assert_eq!(solver.model_value_of(vars[5]), Some(true));
    }

    #[test]
    fn repeated_renumber_is_stable() {
        let mut config = Config::default();
        // Two forced renumbers in a row: the second finds nothing to move.
        config.simplify.schedule_startup = String::from("must-renumber, must-renumber");

        let mut solver = Solver::from_config(config);
        let vars: Vec<_> = (0..6).map(|_| solver.new_var()).collect();

        // Value half the variables at the root so renumbering has something to push back.
        for &var in &vars[..3] {
            assert!(solver.add_clause(&[Lit::new(var, true)]).unwrap());
        }
        assert!(solver
            .add_clause(&[
                Lit::new(vars[3], true),
                Lit::new(vars[4], true),
                Lit::new(vars[5], true)
            ])
            .unwrap());

        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        for &var in &vars[..3] {
            assert_eq!(solver.model_value_of(var), Some(true));
        }
    }
}

mod reconfiguration {
    use super::*;

    #[test]
    fn presets_apply_mid_solve() {
        let mut config = Config::default();
        config.simplify.reconfigure_at = 0;
        config.simplify.reconfigure_val = 7;

        let mut solver = Solver::from_config(config);
        let vars: Vec<_> = (0..8).map(|_| solver.new_var()).collect();
        for window in vars.windows(3) {
            assert!(solver
                .add_clause(&[
                    Lit::new(window[0], true),
                    Lit::new(window[1], true),
                    Lit::new(window[2], true)
                ])
                .unwrap());
        }

        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let mut config = Config::default();
        config.simplify.reconfigure_at = 0;
        config.simplify.reconfigure_val = 5;

        let mut solver = Solver::from_config(config);
        let vars: Vec<_> = (0..8).map(|_| solver.new_var()).collect();
        for window in vars.windows(3) {
            assert!(solver
                .add_clause(&[
                    Lit::new(window[0], true),
                    Lit::new(window[1], true),
                    Lit::new(window[2], true)
                ])
                .unwrap());
        }

        assert_eq!(
            solver.solve(),
            Err(ErrorKind::Schedule(ScheduleError::UnknownPreset(5)))
        );
    }
}

mod limits {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn interrupt_returns_unknown() {
        let mut solver = Solver::from_config(Config::default());
        let vars: Vec<_> = (0..10).map(|_| solver.new_var()).collect();
        for window in vars.windows(2) {
            assert!(solver
                .add_clause(&[Lit::new(window[0], true), Lit::new(window[1], true)])
                .unwrap());
        }

        solver.interrupt_handle().store(true, Ordering::Relaxed);
        assert_eq!(solver.solve(), Ok(SolveReport::Unknown));

        // Clearing the flag restores the solver.
        solver.interrupt_handle().store(false, Ordering::Relaxed);
        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
    }

    #[test]
    fn conflict_limit_resets_after_a_solve() {
        let mut config = Config::default();
        config.solve.max_conflicts = 0;

        let mut solver = Solver::from_config(config);
        let p = solver.new_var();
        let q = solver.new_var();
        assert!(solver.add_clause(&[Lit::new(p, true), Lit::new(q, true)]).unwrap());

        // A zero conflict budget concludes nothing…
        assert_eq!(solver.solve(), Ok(SolveReport::Unknown));
        // …and the limit does not linger into the next call.
        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
    }
}
