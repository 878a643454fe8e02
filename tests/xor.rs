use marten_sat::{config::Config, reports::SolveReport, solver::Solver, structures::literal::Lit};

mod parity {
    use super::*;

    #[test]
    fn three_variable_xor_propagates() {
        let mut solver = Solver::from_config(Config::default());
        let vars: Vec<_> = (0..3).map(|_| solver.new_var()).collect();

        assert!(solver.add_xor_clause(&vars, true).unwrap());

        // Fix two of the three: the parity constraint decides the third.
        assert!(solver.add_clause(&[Lit::new(vars[0], true)]).unwrap());
        assert!(solver.add_clause(&[Lit::new(vars[1], true)]).unwrap());

        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        assert_eq!(solver.model_value_of(vars[2]), Some(true));
    }

    #[test]
    fn xor_false_residue_flips_the_third() {
        let mut solver = Solver::from_config(Config::default());
        let vars: Vec<_> = (0..3).map(|_| solver.new_var()).collect();

        assert!(solver.add_xor_clause(&vars, false).unwrap());
        assert!(solver.add_clause(&[Lit::new(vars[0], true)]).unwrap());
        assert!(solver.add_clause(&[Lit::new(vars[1], true)]).unwrap());

        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        assert_eq!(solver.model_value_of(vars[2]), Some(false));
    }

    #[test]
    fn empty_xor_with_odd_parity_is_unsat() {
        let mut solver = Solver::from_config(Config::default());
        assert_eq!(solver.add_xor_clause(&[], true), Ok(false));
        assert!(!solver.okay());
    }

    #[test]
    fn empty_xor_with_even_parity_is_nothing() {
        let mut solver = Solver::from_config(Config::default());
        assert_eq!(solver.add_xor_clause(&[], false), Ok(true));
        assert!(solver.okay());
    }

    #[test]
    fn singleton_xor_is_a_unit() {
        let mut solver = Solver::from_config(Config::default());
        let x = solver.new_var();

        assert!(solver.add_xor_clause(&[x], true).unwrap());
        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        assert_eq!(solver.model_value_of(x), Some(true));
    }

    #[test]
    fn duplicated_variable_cancels() {
        let mut solver = Solver::from_config(Config::default());
        let x = solver.new_var();
        let y = solver.new_var();

        // x ⊕ x ⊕ y = true reduces to y = true.
        assert!(solver.add_xor_clause(&[x, x, y], true).unwrap());
        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        assert_eq!(solver.model_value_of(y), Some(true));
    }

    #[test]
    fn pair_xor_encodes_equality() {
        let mut solver = Solver::from_config(Config::default());
        let x = solver.new_var();
        let y = solver.new_var();

        // x ⊕ y = false, so x and y agree.
        assert!(solver.add_xor_clause(&[x, y], false).unwrap());
        assert!(solver.add_clause(&[Lit::new(x, true)]).unwrap());

        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        assert_eq!(solver.model_value_of(y), Some(true));
    }

    #[test]
    fn wide_xor_cuts_and_still_propagates() {
        let mut solver = Solver::from_config(Config::default());
        let vars: Vec<_> = (0..7).map(|_| solver.new_var()).collect();

        assert!(solver.add_xor_clause(&vars, true).unwrap());

        // Auxiliaries from the cutting never surface in the outside numbering.
        assert_eq!(solver.n_vars(), 7);
        assert!(solver.n_vars_outer() > 7);

        // Fix all but the last variable to false; the last carries the parity.
        for &var in &vars[..6] {
            assert!(solver.add_clause(&[Lit::new(var, false)]).unwrap());
        }

        assert_eq!(solver.solve(), Ok(SolveReport::Satisfiable));
        assert_eq!(solver.model_value_of(vars[6]), Some(true));
    }

    #[test]
    fn contradictory_parities_are_unsat() {
        let mut solver = Solver::from_config(Config::default());
        let vars: Vec<_> = (0..3).map(|_| solver.new_var()).collect();

        assert!(solver.add_xor_clause(&vars, true).unwrap());
        let ok = solver.add_xor_clause(&vars, false).unwrap();

        if ok {
            assert_eq!(solver.solve(), Ok(SolveReport::Unsatisfiable));
        } else {
            assert!(!solver.okay());
        }
    }
}
