//! Reconfiguration presets.
//!
//! A preset is a named bundle of configuration values --- clause-cleaning policy, restart type,
//! variable decay, minimisation limits --- applied mid-solve when problem features suggest the
//! default configuration is a poor fit.
//!
//! The recognised ids are `{3, 4, 6, 7, 12, 13, 14, 15}`; any other id is an error.

use crate::{
    config::{Config, PolarityMode, RestartType},
    types::err::ScheduleError,
};

/// Applies the preset with the given id to the configuration.
///
/// Returns true if the tier 2 clause allowance should be reset to its configured base.
pub fn apply_preset(config: &mut Config, id: u32) -> Result<bool, ScheduleError> {
    let mut reset_temp_clause_allowance = false;

    match id {
        3 => {
            // Glue-driven clause cleaning.
            config.clause_db.every_lev1_reduce = 0;
            config.clause_db.every_lev2_reduce = 0;
            config.clause_db.glue_put_lev1_if_below_or_eq.set(0);

            config.clause_db.adjust_glue_if_too_many_low = 1.0;
            config.clause_db.ratio_keep_activity = 0.0;
            config.clause_db.ratio_keep_glue = 0.5;
            config.clause_db.inc_max_temp_lev2_red_cls = 1.03;
            reset_temp_clause_allowance = true;
        }

        4 => {
            config.clause_db.every_lev1_reduce = 0;
            config.clause_db.every_lev2_reduce = 0;
            config.clause_db.glue_put_lev1_if_below_or_eq.set(0);
            config.clause_db.max_temp_lev2_learnt_clauses = 10_000;
            reset_temp_clause_allowance = true;
        }

        6 => {
            // No more simplifying.
            config.solve.never_stop_search = true;
        }

        7 => {
            // Geometric restarts, but keep low-glue clauses.
            config.simplify.var_elim_ratio_per_iter = 1.0;
            config.search.restart_type = RestartType::Geometric;
            config.search.polarity_mode = PolarityMode::Negative;

            config.clause_db.every_lev1_reduce = 0;
            config.clause_db.every_lev2_reduce = 0;
            config.clause_db.glue_put_lev1_if_below_or_eq.set(0);
            config.clause_db.inc_max_temp_lev2_red_cls = 1.02;
            reset_temp_clause_allowance = true;
        }

        12 => {
            // A mix of clause keeping rules.
            config.simplify.var_elim_ratio_per_iter = 1.0;
            config.clause_db.every_lev1_reduce = 0;
            config.clause_db.every_lev2_reduce = 0;

            config.clause_db.glue_put_lev0_if_below_or_eq.set(2);
            config.clause_db.glue_put_lev1_if_below_or_eq.set(4);
            config.clause_db.ratio_keep_glue = 0.1;
            config.clause_db.ratio_keep_activity = 0.3;
            config.clause_db.inc_max_temp_lev2_red_cls = 1.04;

            // More 'slow' in adjusting activities.
            config.search.var_decay_max.set(0.90);
            reset_temp_clause_allowance = true;
        }

        13 => {
            config.simplify.orig_global_timeout_multiplier = 5.0;
            config.simplify.global_timeout_multiplier =
                config.simplify.orig_global_timeout_multiplier;
            config.simplify.global_multiplier_multiplier_max = 5.0;

            config.solve.search_budget_inc.set(1.15);
            config.search.more_minim_limit_cache = 1200;
            config.search.more_minim_limit_binary = 600;
            config.search.max_num_lits_more_minim = 20;
            config.clause_db.max_temp_lev2_learnt_clauses = 10_000;

            // More 'fast' in adjusting activities.
            config.search.var_decay_max.set(0.99);
        }

        14 => {
            config.search.short_term_history_size = 600;
        }

        15 => {
            // Close to the original MiniSat setup.
            config.simplify.var_elim_ratio_per_iter = 1.0;
            config.search.restart_type = RestartType::Geometric;
            config.search.polarity_mode = PolarityMode::Negative;

            config.clause_db.every_lev1_reduce = 0;
            config.clause_db.every_lev2_reduce = 0;
            config.clause_db.glue_put_lev1_if_below_or_eq.set(0);
            config.clause_db.glue_put_lev0_if_below_or_eq.set(0);
            config.clause_db.inc_max_temp_lev2_red_cls = 1.02;

            config.clause_db.ratio_keep_glue = 0.0;
            config.clause_db.ratio_keep_activity = 0.5;
            reset_temp_clause_allowance = true;
        }

        unknown => return Err(ScheduleError::UnknownPreset(unknown)),
    }

    log::info!("reconfigured solver to preset {id}");
    Ok(reset_temp_clause_allowance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognised_presets() {
        for id in [3, 4, 6, 7, 12, 13, 14, 15] {
            let mut config = Config::default();
            assert!(apply_preset(&mut config, id).is_ok());
        }
    }

    #[test]
    fn unknown_preset() {
        let mut config = Config::default();
        assert_eq!(
            apply_preset(&mut config, 5),
            Err(ScheduleError::UnknownPreset(5))
        );
    }
}
