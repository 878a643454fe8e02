/*!
Reduction of the redundant clause tiers.

Tier 0 is kept without question.
Tier 1 is periodically skimmed: the least active half of its clauses (those above the tier 0
glue cutoff) are demoted to tier 2.
Tier 2 is periodically reduced to an allowance, by activity; the allowance grows a little with
each reduction.

When the periodic schedules are disabled (as some reconfiguration presets do) tier 2 is instead
reduced whenever it exceeds the allowance, keeping the configured shares of clauses by glue and
by activity.
*/

use crate::{db::arena::ClauseOffset, misc::log::targets, proof::Trace};

use super::Searcher;

impl Searcher {
    /// Frees the redundant clause at `offset`: watches detached, store entry removed, deletion
    /// recorded, arena slot released.
    pub fn free_learnt(&mut self, offset: ClauseOffset, proof: &mut Option<Trace>) {
        self.engine.detach_clause(offset);
        self.engine.cnf.unstore_offset(offset);
        let clause = self.engine.cnf.arena.free(offset);
        if let Some(trace) = proof {
            trace.delete_clause(clause.lits());
        }
    }

    /// Runs any reduction which has fallen due.
    pub(super) fn maybe_reduce(&mut self, proof: &mut Option<Trace>) {
        let every_lev1 = self.db_config.every_lev1_reduce;
        let every_lev2 = self.db_config.every_lev2_reduce;

        if every_lev2 != 0 {
            if self.stats.conflicts >= self.next_lev2_reduce {
                self.next_lev2_reduce += every_lev2;
                self.reduce_lev2_by_activity(proof);
            }
        } else if self.engine.cnf.long_red[2].len() > self.temp_lev2_allowance {
            self.reduce_lev2_by_ratio(proof);
        }

        if every_lev1 != 0 && self.stats.conflicts >= self.next_lev1_reduce {
            self.next_lev1_reduce += every_lev1;
            self.demote_lev1();
        }
    }

    /// Reduces tier 2 to the current allowance, keeping the most active clauses, and grows the
    /// allowance.
    fn reduce_lev2_by_activity(&mut self, proof: &mut Option<Trace>) {
        let allowance = self.temp_lev2_allowance;
        if self.engine.cnf.long_red[2].len() <= allowance {
            return;
        }

        let mut offsets = std::mem::take(&mut self.engine.cnf.long_red[2]);
        offsets.sort_by(|&a, &b| {
            let act_a = self.engine.cnf.arena.get(a).activity;
            let act_b = self.engine.cnf.arena.get(b).activity;
            act_b.partial_cmp(&act_a).unwrap_or(std::cmp::Ordering::Equal)
        });

        let dropped = offsets.split_off(allowance);
        self.engine.cnf.long_red[2] = offsets;

        let removed = self.drop_unlocked(dropped, 2, proof);
        log::info!(target: targets::REDUCTION, "Tier 2 reduced by {removed} clauses");

        self.temp_lev2_allowance =
            ((self.temp_lev2_allowance as f64) * self.db_config.inc_max_temp_lev2_red_cls) as usize;
    }

    /// Reduces tier 2 keeping the configured shares by glue and by activity.
    fn reduce_lev2_by_ratio(&mut self, proof: &mut Option<Trace>) {
        let offsets = std::mem::take(&mut self.engine.cnf.long_red[2]);
        let total = offsets.len();

        let keep_by_glue = ((total as f64) * self.db_config.ratio_keep_glue) as usize;
        let keep_by_activity = ((total as f64) * self.db_config.ratio_keep_activity) as usize;

        let mut by_glue = offsets.clone();
        by_glue.sort_by_key(|&o| self.engine.cnf.arena.get(o).glue);

        let mut keep: Vec<ClauseOffset> = by_glue[..keep_by_glue.min(total)].to_vec();

        let mut by_activity = offsets;
        by_activity.sort_by(|&a, &b| {
            let act_a = self.engine.cnf.arena.get(a).activity;
            let act_b = self.engine.cnf.arena.get(b).activity;
            act_b.partial_cmp(&act_a).unwrap_or(std::cmp::Ordering::Equal)
        });
        for offset in by_activity {
            if keep.len() >= keep_by_glue + keep_by_activity {
                // The rest are dropped below.
                if !keep.contains(&offset) {
                    self.engine.cnf.long_red[2].push(offset);
                }
                continue;
            }
            if !keep.contains(&offset) {
                keep.push(offset);
            }
        }

        let dropped = std::mem::take(&mut self.engine.cnf.long_red[2]);
        self.engine.cnf.long_red[2] = keep;

        let removed = self.drop_unlocked(dropped, 2, proof);
        log::info!(target: targets::REDUCTION, "Tier 2 reduced by {removed} clauses (ratio)");
    }

    /// Demotes the least active half of tier 1 (above the tier 0 glue cutoff) to tier 2.
    fn demote_lev1(&mut self) {
        let mut offsets = std::mem::take(&mut self.engine.cnf.long_red[1]);
        offsets.sort_by(|&a, &b| {
            let act_a = self.engine.cnf.arena.get(a).activity;
            let act_b = self.engine.cnf.arena.get(b).activity;
            act_b.partial_cmp(&act_a).unwrap_or(std::cmp::Ordering::Equal)
        });

        let keep_until = offsets.len() / 2;
        let cutoff = self.db_config.glue_put_lev0_if_below_or_eq.value;

        for (position, offset) in offsets.iter().enumerate() {
            let clause = self.engine.cnf.arena.get_mut(*offset);
            if position < keep_until || clause.glue <= cutoff {
                self.engine.cnf.long_red[1].push(*offset);
            } else {
                clause.tier = 2;
                self.engine.cnf.long_red[2].push(*offset);
            }
        }
    }

    /// Frees the given tier clauses, skipping any clause currently locked as a reason on the
    /// trail. Skipped clauses return to their tier. Returns the count freed.
    fn drop_unlocked(
        &mut self,
        dropped: Vec<ClauseOffset>,
        tier: usize,
        proof: &mut Option<Trace>,
    ) -> usize {
        let mut removed = 0;
        for offset in dropped {
            if self.clause_is_reason(offset) {
                self.engine.cnf.long_red[tier].push(offset);
                continue;
            }

            self.engine.detach_clause(offset);
            let clause = self.engine.cnf.arena.free(offset);
            if let Some(trace) = proof {
                trace.delete_clause(clause.lits());
            }
            removed += 1;
        }
        removed
    }

    /// Whether the clause at `offset` is the reason of some current assignment.
    fn clause_is_reason(&self, offset: ClauseOffset) -> bool {
        let first = self.engine.cnf.arena.get(offset).lits()[0];
        self.engine.cnf.value_of_lit(first) == Some(true)
            && self.engine.reason[first.var() as usize] == crate::propagation::Reason::Long(offset)
    }
}
