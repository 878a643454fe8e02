/*!
Analysis of a conflict into an asserting clause.

Takes a clause which is unsatisfiable on the current valuation and applies resolution backwards
through the trail, using the clauses which (eventually) made the observation of the conflict
possible given the decisions made, until a unique implication point for the current level
remains.

The asserting clause is then minimised:
- *Recursive* minimisation drops any literal whose reasons are built entirely from literals
  already in the clause (checked to a bounded depth through the implication graph).
- *Extra* minimisation drops any literal implied by another literal of the clause through a
  binary clause.

Both minimisations record effectiveness counters, which the orchestrator uses to retune or
disable them between search episodes.
*/

use crate::{
    misc::log::targets,
    proof::Trace,
    propagation::{Conflict, Reason},
    structures::literal::Lit,
};

use super::Searcher;

/// Possible results of conflict analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// A clause was learnt and asserted; the search continues.
    Continue,

    /// Analysis established unsatisfiability.
    Unsatisfiable,
}

impl Searcher {
    /// The literals of the reason clause for `pivot`, excluding `pivot` itself.
    ///
    /// For a long reason the asserted literal sits at position 0 --- propagation maintains this,
    /// as a watched literal which is true is never displaced.
    fn reason_tail(&self, pivot: Lit) -> Vec<Lit> {
        match self.reason_of(pivot) {
            Reason::Free => Vec::default(),
            Reason::Binary(other) => vec![other],
            Reason::Long(offset) => {
                let clause = self.engine.cnf.arena.get(offset);
                debug_assert_eq!(clause.lits()[0], pivot);
                clause.lits()[1..].to_vec()
            }
        }
    }

    fn reason_of(&self, literal: Lit) -> Reason {
        self.engine.reason[literal.var() as usize]
    }

    /// Analyses a conflict at a decision level above zero, learns the asserting clause, and
    /// backjumps.
    pub(super) fn analyse_and_learn(
        &mut self,
        conflict: Conflict,
        proof: &mut Option<Trace>,
    ) -> AnalysisOutcome {
        let current = self.engine.current_level();
        log::trace!(target: targets::ANALYSIS, "Analysis at level {current}");

        // First unique implication point resolution.
        let mut learnt: Vec<Lit> = vec![Lit::new(0, false)]; // Slot for the asserting literal.
        let mut to_clear: Vec<Lit> = Vec::default();
        let mut path_count: usize = 0;
        let mut pivot: Option<Lit> = None;
        let mut index = self.engine.trail.lits.len();

        loop {
            let tail = match pivot {
                None => self.engine.conflict_lits(conflict),
                Some(p) => self.reason_tail(p),
            };

            for q in tail {
                let var = q.var() as usize;
                if !self.seen[var] && self.engine.level[var] > 0 {
                    self.seen[var] = true;
                    to_clear.push(q);
                    self.bump_var_activity(var);

                    if self.engine.level[var] >= current {
                        path_count += 1;
                    } else {
                        learnt.push(q);
                    }
                }
            }

            // The next literal to resolve on is the most recent marked literal of the trail.
            loop {
                index -= 1;
                if self.seen[self.engine.trail.lits[index].var() as usize] {
                    break;
                }
            }

            let next = self.engine.trail.lits[index];
            self.seen[next.var() as usize] = false;
            path_count -= 1;

            if path_count == 0 {
                learnt[0] = !next;
                break;
            }
            pivot = Some(next);
        }

        self.stats.lits_red_non_min += learnt.len() as u64;

        self.minimise_recursive(&mut learnt);
        self.minimise_with_binaries(&mut learnt);

        for literal in to_clear {
            self.seen[literal.var() as usize] = false;
        }

        // Glue, and the backjump level: the greatest level among the non-asserting literals,
        // whose witness is moved to the watched position.
        let mut glue_levels: Vec<u32> = learnt
            .iter()
            .map(|l| self.engine.level[l.var() as usize])
            .collect();
        glue_levels.sort_unstable();
        glue_levels.dedup();
        let glue = glue_levels.len() as u32;
        self.note_glue(glue);

        let backjump_level = match learnt.len() {
            1 => 0,
            _ => {
                let mut max_position = 1;
                for position in 2..learnt.len() {
                    if self.engine.level[learnt[position].var() as usize]
                        > self.engine.level[learnt[max_position].var() as usize]
                    {
                        max_position = position;
                    }
                }
                learnt.swap(1, max_position);
                self.engine.level[learnt[1].var() as usize]
            }
        };

        log::trace!(target: targets::ANALYSIS, "Learnt {} literals, glue {glue}, backjump to {backjump_level}", learnt.len());

        self.engine.cancel_until(backjump_level);
        self.reheap_released();
        self.install_learnt(learnt, glue, proof);

        AnalysisOutcome::Continue
    }

    /// Drops literals of the learnt clause whose reasons are built entirely from literals
    /// already in the clause, to a bounded depth.
    fn minimise_recursive(&mut self, learnt: &mut Vec<Lit>) {
        if !self.config.do_recursive_minim || learnt.len() <= 1 {
            return;
        }

        let before = learnt.len();
        let keep_head = learnt[0];
        let mut kept: Vec<Lit> = vec![keep_head];

        for position in 1..learnt.len() {
            let candidate = learnt[position];
            if self.reason_of(!candidate) == Reason::Free || !self.literal_redundant(candidate) {
                kept.push(candidate);
            }
        }

        self.stats.rec_min_lit_rem += (before - kept.len()) as u64;
        *learnt = kept;
    }

    /// Whether every path from the (falsified) literal back through the implication graph ends
    /// in a literal of the learnt clause or a root-level fact.
    ///
    /// The learnt literals carry a `seen` mark, which the check relies on.
    fn literal_redundant(&mut self, literal: Lit) -> bool {
        const DEPTH_LIMIT: usize = 32;

        let mut stack: Vec<Lit> = vec![!literal];
        let mut visited: Vec<Lit> = Vec::default();

        while let Some(next) = stack.pop() {
            if visited.len() > DEPTH_LIMIT {
                return false;
            }
            visited.push(next);
            self.stats.rec_minim_cost += 1;

            for antecedent in self.reason_tail(next) {
                let var = antecedent.var() as usize;
                if self.engine.level[var] == 0 || self.seen[var] {
                    continue;
                }
                if self.reason_of(!antecedent) == Reason::Free {
                    return false;
                }
                if !visited.contains(&!antecedent) {
                    stack.push(!antecedent);
                }
            }
        }
        true
    }

    /// Drops literals implied by another literal of the clause through a binary clause.
    fn minimise_with_binaries(&mut self, learnt: &mut Vec<Lit>) {
        if !self.config.do_minim_red_more
            || learnt.len() <= 2
            || learnt.len() > self.config.max_num_lits_more_minim as usize
        {
            return;
        }

        self.stats.more_minim_lits_start += learnt.len() as u64;

        for literal in learnt.iter() {
            self.seen_lits[literal.index()] = true;
        }

        let mut budget = self.config.more_minim_limit_binary as usize;
        let mut position = 1;
        while position < learnt.len() && budget > 0 {
            let candidate = learnt[position];

            // A binary clause ¬candidate ∨ w with w elsewhere in the learnt clause makes the
            // candidate redundant: whenever the candidate is true, w satisfies the clause.
            let mut redundant = false;
            for watcher in self.engine.cnf.watches.of(!candidate) {
                budget = budget.saturating_sub(1);
                if budget == 0 {
                    break;
                }
                if let crate::db::watches::Watcher::Binary { other, .. } = watcher {
                    if *other != candidate && self.seen_lits[other.index()] {
                        redundant = true;
                        break;
                    }
                }
            }

            if redundant {
                self.seen_lits[candidate.index()] = false;
                learnt.swap_remove(position);
            } else {
                position += 1;
            }
        }

        for literal in learnt.iter() {
            self.seen_lits[literal.index()] = false;
        }

        self.stats.more_minim_lits_end += learnt.len() as u64;
    }

    /// Resolves a failed assumption into a conflict over the assumptions which entail the
    /// failure, filling [final_conflict](Searcher::final_conflict) with those assumption
    /// literals.
    pub(super) fn analyse_final(&mut self, failed: Lit) {
        self.final_conflict.clear();
        self.final_conflict.push(failed);

        if self.engine.current_level() == 0 {
            return;
        }

        let mut to_clear: Vec<usize> = Vec::default();
        self.seen[failed.var() as usize] = true;
        to_clear.push(failed.var() as usize);

        let root = match self.engine.trail.lim.first() {
            Some(&start) => start,
            None => self.engine.trail.lits.len(),
        };

        for index in (root..self.engine.trail.lits.len()).rev() {
            let literal = self.engine.trail.lits[index];
            let var = literal.var() as usize;
            if !self.seen[var] {
                continue;
            }

            match self.engine.reason[var] {
                Reason::Free => {
                    // An assumption: record it as given.
                    debug_assert!(self.assumptions.contains(&literal));
                    self.final_conflict.push(literal);
                }
                _ => {
                    for antecedent in self.reason_tail(literal) {
                        let a_var = antecedent.var() as usize;
                        if self.engine.level[a_var] > 0 && !self.seen[a_var] {
                            self.seen[a_var] = true;
                            to_clear.push(a_var);
                        }
                    }
                }
            }
        }

        for var in to_clear {
            self.seen[var] = false;
        }
    }
}
