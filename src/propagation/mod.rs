/*!
The propagation engine: watches, trail, and decision levels.

# Overview

Propagates a variable being assigned some value, given as a literal.
This is done by examining the watchers of the literal with the opposite polarity, and for each:
updating the watches of the clause if possible, queuing the consequence of an asserting clause,
or identifying that the clause conflicts with the current valuation.

Propagation happens in two steps per assignment, distinguished by clause length --- first binary
watchers, then long watchers.
Binary clauses never require access to the arena or an update to watches, so the split is free
and keeps the common case quick.

# Complications

Use is made of a raw pointer to the watch list under examination, obtained through
[of_mut_ptr](crate::db::watches::WatchLists::of_mut_ptr).
This avoids a mutable borrow of the database for the watch list conflicting with the borrows
needed to read the valuation, mutate the arena, and push to the trail.
The *borrowed* list itself is never mutated through any other path: a watch is only ever moved
to a literal which is not false, and the list under examination belongs to a literal which *is*
false.

# Stale watchers

Long watchers carry the clause generation they were installed against.
A watcher whose generation no longer matches its clause (the clause was strengthened or
renumbered), or whose arena slot has been freed, is discarded when encountered.
*/

use crate::{
    db::{
        arena::ClauseOffset,
        trail::{LevelIndex, Trail},
        watches::Watcher,
        Cnf,
    },
    misc::log::targets,
    structures::literal::{Lit, Var},
};

/// Why a variable holds its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reason {
    /// A decision, an assumption, or a root-level fact.
    Free,

    /// Propagation of a binary clause; the literal is the *other* literal of the clause.
    Binary(Lit),

    /// Propagation of the long clause at the offset.
    Long(ClauseOffset),
}

/// A clause found unsatisfiable under the current valuation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conflict {
    /// A binary clause, given by its literals.
    Binary { a: Lit, b: Lit },

    /// The long clause at the offset.
    Long(ClauseOffset),
}

/// The propagation engine.
///
/// Owns the [clause database](Cnf) and the [trail], per the layered composition of the solver:
/// the orchestrator holds a searcher, which holds the engine, which holds the database.
pub struct PropEngine {
    /// The clause database.
    pub cnf: Cnf,

    /// The trail.
    pub trail: Trail,

    /// The reason each variable holds its value, indexed by variable.
    pub reason: Vec<Reason>,

    /// The decision level each variable was valued at, indexed by variable.
    pub level: Vec<LevelIndex>,

    /// Variables released by the most recent [cancel_until](PropEngine::cancel_until).
    pub released: Vec<Var>,
}

impl Default for PropEngine {
    fn default() -> Self {
        PropEngine {
            cnf: Cnf::default(),
            trail: Trail::default(),
            reason: Vec::default(),
            level: Vec::default(),
            released: Vec::default(),
        }
    }
}

impl PropEngine {
    /// Extends every per-variable structure with a fresh variable.
    pub fn on_new_var(&mut self, is_bva: bool) {
        self.cnf.on_new_var(is_bva);
        self.reason.push(Reason::Free);
        self.level.push(0);
    }

    /// The current decision level.
    pub fn current_level(&self) -> LevelIndex {
        self.trail.level()
    }

    /// The value of a literal on the current valuation.
    pub fn value_of_lit(&self, literal: Lit) -> Option<bool> {
        self.cnf.value_of_lit(literal)
    }

    /// Opens a fresh decision level.
    pub fn new_decision_level(&mut self) {
        self.trail.new_level();
    }

    /// Assigns a literal true at the current level and queues it for propagation.
    ///
    /// The caller ensures the literal has no value.
    pub fn enqueue(&mut self, literal: Lit, reason: Reason) {
        debug_assert!(self.cnf.value_of(literal.var()).is_none());
        log::trace!(target: targets::PROPAGATION, "Queued {literal} at level {}", self.current_level());

        let var = literal.var() as usize;
        self.cnf.assigns[var] = Some(literal.polarity());
        self.reason[var] = reason;
        self.level[var] = self.current_level();
        self.trail.push(literal);
    }

    /// Installs a binary clause: watches on both literals, and the count updated.
    pub fn attach_binary(&mut self, a: Lit, b: Lit, redundant: bool) {
        self.cnf.watches.attach_binary(a, b, redundant);
        match redundant {
            true => self.cnf.binary.redundant += 1,
            false => self.cnf.binary.irredundant += 1,
        }
    }

    /// Removes a binary clause.
    pub fn detach_binary(&mut self, a: Lit, b: Lit, redundant: bool) {
        if self.cnf.watches.detach_binary(a, b) {
            match redundant {
                true => self.cnf.binary.redundant -= 1,
                false => self.cnf.binary.irredundant -= 1,
            }
        }
    }

    /// Installs watches for the long clause at the offset, on its first two literals.
    pub fn attach_clause(&mut self, offset: ClauseOffset) {
        let clause = self.cnf.arena.get(offset);
        debug_assert!(clause.len() >= 3);

        let first = clause.lits()[0];
        let second = clause.lits()[1];
        let generation = clause.generation;

        self.cnf.watches.attach_long(first, offset, second, generation);
        self.cnf.watches.attach_long(second, offset, first, generation);
    }

    /// Removes the watches of the long clause at the offset.
    pub fn detach_clause(&mut self, offset: ClauseOffset) {
        let clause = self.cnf.arena.get(offset);
        let first = clause.lits()[0];
        let second = clause.lits()[1];

        self.cnf.watches.detach_long(first, offset);
        self.cnf.watches.detach_long(second, offset);
    }

    /// Removes levels above `level`, releasing assignments and saving phases.
    ///
    /// The released variables are left in [released](PropEngine::released) for the searcher to
    /// return to its activity heap.
    pub fn cancel_until(&mut self, level: LevelIndex) {
        self.released.clear();
        for literal in self.trail.clear_above(level) {
            let var = literal.var() as usize;
            self.cnf.var_data[var].saved_polarity = literal.polarity();
            self.cnf.assigns[var] = None;
            self.reason[var] = Reason::Free;
            self.released.push(literal.var());
        }
    }

    /// Propagates all queued assignments. On conflict the queue is left unfinished; the caller
    /// is expected to backjump (which resets the queue head) or conclude unsatisfiability.
    pub fn propagate(&mut self) -> Result<(), Conflict> {
        while let Some(literal) = self.trail.next_to_propagate() {
            self.propagate_one(literal)?;
        }
        Ok(())
    }

    /// Propagates a single assignment: the watchers of the falsified literal are examined.
    fn propagate_one(&mut self, literal: Lit) -> Result<(), Conflict> {
        let false_lit = !literal;
        let level = self.current_level();

        // Binary block.
        {
            // Safety: binary watchers are read only; the list is not touched through any other
            // path, as enqueuing mutates the trail and valuation alone.
            let binary_list = unsafe { &*self.cnf.watches.of_mut_ptr(false_lit) };

            for watcher in binary_list {
                let Watcher::Binary { other, .. } = watcher else {
                    continue;
                };

                match self.cnf.value_of_lit(*other) {
                    None => {
                        let var = other.var() as usize;
                        self.cnf.assigns[var] = Some(other.polarity());
                        self.reason[var] = Reason::Binary(false_lit);
                        self.level[var] = level;
                        self.trail.push(*other);
                    }

                    Some(false) => {
                        log::trace!(target: targets::PROPAGATION, "Binary conflict {false_lit} {other}");
                        return Err(Conflict::Binary {
                            a: false_lit,
                            b: *other,
                        });
                    }

                    Some(true) => {}
                }
            }
        }

        // Long block.
        {
            // Safety: the list belongs to a false literal, and watches only ever move to
            // literals which are not false, so no alias to the list is created below.
            let long_list = unsafe { &mut *self.cnf.watches.of_mut_ptr(false_lit) };

            let mut index = 0;
            let mut length = long_list.len();

            'long_loop: while index < length {
                let Watcher::Long {
                    offset,
                    blocker,
                    generation,
                } = long_list[index]
                else {
                    index += 1;
                    continue 'long_loop;
                };

                // Discard watchers of freed or reshaped clauses.
                if !self.cnf.arena.is_allocated(offset)
                    || self.cnf.arena.get(offset).generation != generation
                {
                    long_list.swap_remove(index);
                    length -= 1;
                    continue 'long_loop;
                }

                if self.cnf.value_of_lit(blocker) == Some(true) {
                    index += 1;
                    continue 'long_loop;
                }

                // The false literal is moved to position 1; position 0 is then the candidate
                // assertion.
                let (first, clause_length) = {
                    let clause = self.cnf.arena.get_mut(offset);
                    if clause.lits()[0] == false_lit {
                        clause.swap(0, 1);
                    }
                    debug_assert_eq!(clause.lits()[1], false_lit);
                    (clause.lits()[0], clause.len())
                };

                if self.cnf.value_of_lit(first) == Some(true) {
                    long_list[index] = Watcher::Long {
                        offset,
                        blocker: first,
                        generation,
                    };
                    index += 1;
                    continue 'long_loop;
                }

                // Search for a replacement watch.
                let mut replacement = None;
                for position in 2..clause_length {
                    let candidate = self.cnf.arena.get(offset).lits()[position];
                    if self.cnf.value_of_lit(candidate) != Some(false) {
                        replacement = Some(position);
                        break;
                    }
                }

                match replacement {
                    Some(position) => {
                        let clause = self.cnf.arena.get_mut(offset);
                        clause.swap(1, position);
                        let fresh_watch = clause.lits()[1];

                        self.cnf
                            .watches
                            .attach_long(fresh_watch, offset, first, generation);
                        long_list.swap_remove(index);
                        length -= 1;
                        continue 'long_loop;
                    }

                    None => match self.cnf.value_of_lit(first) {
                        None => {
                            let var = first.var() as usize;
                            self.cnf.assigns[var] = Some(first.polarity());
                            self.reason[var] = Reason::Long(offset);
                            self.level[var] = level;
                            self.trail.push(first);

                            index += 1;
                            continue 'long_loop;
                        }

                        Some(false) => {
                            log::trace!(target: targets::PROPAGATION, "Conflict in clause at {offset}");
                            return Err(Conflict::Long(offset));
                        }

                        Some(true) => {
                            // Covered by the check above; kept for clarity of the match.
                            index += 1;
                            continue 'long_loop;
                        }
                    },
                }
            }
        }

        Ok(())
    }

    /// The literals of the conflicting clause.
    pub fn conflict_lits(&self, conflict: Conflict) -> Vec<Lit> {
        match conflict {
            Conflict::Binary { a, b } => vec![a, b],
            Conflict::Long(offset) => self.cnf.arena.get(offset).lits().to_vec(),
        }
    }
}
