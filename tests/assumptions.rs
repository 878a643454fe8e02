use marten_sat::{config::Config, reports::SolveReport, solver::Solver, structures::literal::Lit};

mod assumptions {
    use super::*;

    #[test]
    fn failing_assumptions_name_themselves() {
        let mut solver = Solver::from_config(Config::default());
        let p = solver.new_var();
        let q = solver.new_var();

        assert!(solver.add_clause(&[Lit::new(p, true), Lit::new(q, true)]).unwrap());

        let assumed = [Lit::new(p, false), Lit::new(q, false)];
        solver.set_assumptions(&assumed).unwrap();

        assert_eq!(solver.solve(), Ok(SolveReport::Unsatisfiable));

        let mut conflict = solver.conflict().to_vec();
        conflict.sort();
        assert_eq!(conflict, vec![Lit::new(p, false), Lit::new(q, false)]);

        // The formula itself is untouched: the solver remains usable.
        assert!(solver.okay());
    }

    #[test]
    fn assumptions_do_not_outlive_clearing() {
        let mut solver = Solver::from_config(Config::default());
        let p = solver.new_var();
        let q = solver.new_var();

        assert!(solver.add_clause(&[Lit::new(p, true), Lit::new(q, true)]).unwrap());

        solver
            .set_assumptions(&[Lit::new(p, false), Lit::new(q, false)])
            .unwrap();
        assert_eq!(solver.solve(), Ok(SolveReport::Unsatisfiable));

        solver.set_assumptions(&[]).unwrap();
        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
    }

    #[test]
    fn satisfiable_under_assumptions_honours_them() {
        let mut solver = Solver::from_config(Config::default());
        let vars: Vec<_> = (0..3).map(|_| solver.new_var()).collect();

        assert!(solver
            .add_clause(&[
                Lit::new(vars[0], true),
                Lit::new(vars[1], true),
                Lit::new(vars[2], true)
            ])
            .unwrap());

        solver
            .set_assumptions(&[Lit::new(vars[0], false), Lit::new(vars[1], false)])
            .unwrap();

        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        assert_eq!(solver.model_value_of(vars[0]), Some(false));
        assert_eq!(solver.model_value_of(vars[1]), Some(false));
        assert_eq!(solver.model_value_of(vars[2]), Some(true));
    }

    #[test]
    fn single_failing_assumption() {
        let mut solver = Solver::from_config(Config::default());
        let p = solver.new_var();

        assert!(solver.add_clause(&[Lit::new(p, true)]).unwrap());
        solver.set_assumptions(&[Lit::new(p, false)]).unwrap();

        assert_eq!(solver.solve(), Ok(SolveReport::Unsatisfiable));
        assert_eq!(solver.conflict(), &[Lit::new(p, false)]);
    }

    #[test]
    fn assumption_conflict_via_a_chain() {
        let mut solver = Solver::from_config(Config::default());
        let vars: Vec<_> = (0..4).map(|_| solver.new_var()).collect();

        // 0 → 1 → 2 → 3.
        for window in vars.windows(2) {
            assert!(solver
                .add_clause(&[Lit::new(window[0], false), Lit::new(window[1], true)])
                .unwrap());
        }

        solver
            .set_assumptions(&[Lit::new(vars[0], true), Lit::new(vars[3], false)])
            .unwrap();

        assert_eq!(solver.solve(), Ok(SolveReport::Unsatisfiable));

        // Both assumptions take part in the conflict.
        let mut conflict = solver.conflict().to_vec();
        conflict.sort();
        assert_eq!(
            conflict,
            vec![Lit::new(vars[0], true), Lit::new(vars[3], false)]
        );
    }
}
