/*!
Persisted solver state, and solution files.

# State files

[save_state](crate::solver::Solver::save_state) writes a versioned binary file:
magic bytes and a format version, the solve status, the variable counts, the root-level
valuation and saved polarities, the equivalence table, and the occurrence simplifier's
elimination records.
Fields are little-endian, with vectors length-prefixed; the encoding is hand-rolled, as the
file is an internal checkpoint rather than an interchange format.

A state file is loadable only against the exact outer space it was saved from ---
[load_state](crate::solver::Solver::load_state) verifies the variable counts and refuses
otherwise.

# Solution files

[load_solution_from_file](crate::solver::Solver::load_solution_from_file) reads a DIMACS-like
file: an `s SATISFIABLE|UNSATISFIABLE|INDETERMINATE` header, then `v` lines of signed integers
terminated by zero (one per line, or wrapped).
Replay mode combines a state file with a solution file: the solution covers the simplified
formula, and the loaded records let the extender lift it to the original.
*/

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::{
    config::PreprocessMode,
    db::variable::Removed,
    extend,
    misc::log::targets,
    reports::SolveReport,
    simplify::occurrence::ElimRecord,
    structures::literal::{Lit, Var},
    types::err::{ErrorKind, StateError},
};

const MAGIC: &[u8; 4] = b"MSST";
const VERSION: u32 = 1;

fn write_u32(sink: &mut impl Write, value: u32) -> Result<(), StateError> {
    sink.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn read_u32(source: &mut impl Read) -> Result<u32, StateError> {
    let mut bytes = [0_u8; 4];
    source.read_exact(&mut bytes).map_err(|_| StateError::Corrupt)?;
    Ok(u32::from_le_bytes(bytes))
}

fn write_u8(sink: &mut impl Write, value: u8) -> Result<(), StateError> {
    sink.write_all(&[value])?;
    Ok(())
}

fn read_u8(source: &mut impl Read) -> Result<u8, StateError> {
    let mut byte = [0_u8; 1];
    source.read_exact(&mut byte).map_err(|_| StateError::Corrupt)?;
    Ok(byte[0])
}

fn write_lit(sink: &mut impl Write, literal: Lit) -> Result<(), StateError> {
    write_u32(sink, literal.index() as u32)
}

fn read_lit(source: &mut impl Read) -> Result<Lit, StateError> {
    Ok(Lit::from_index(read_u32(source)? as usize))
}

fn write_clause(sink: &mut impl Write, clause: &[Lit]) -> Result<(), StateError> {
    write_u32(sink, clause.len() as u32)?;
    for &literal in clause {
        write_lit(sink, literal)?;
    }
    Ok(())
}

fn read_clause(source: &mut impl Read) -> Result<Vec<Lit>, StateError> {
    let len = read_u32(source)? as usize;
    let mut clause = Vec::with_capacity(len);
    for _ in 0..len {
        clause.push(read_lit(source)?);
    }
    Ok(clause)
}

fn status_byte(status: SolveReport) -> u8 {
    match status {
        SolveReport::Unknown => 0,
        SolveReport::Satisfiable => 1,
        SolveReport::Unsatisfiable => 2,
    }
}

fn status_of_byte(byte: u8) -> Result<SolveReport, StateError> {
    match byte {
        0 => Ok(SolveReport::Unknown),
        1 => Ok(SolveReport::Satisfiable),
        2 => Ok(SolveReport::Unsatisfiable),
        _ => Err(StateError::Corrupt),
    }
}

impl crate::solver::Solver {
    /// Writes the solver state to a file. See the module documentation for the format.
    pub fn save_state(&self, path: &Path, status: SolveReport) -> Result<(), ErrorKind> {
        debug_assert_eq!(self.searcher.engine.current_level(), 0);
        log::info!(target: targets::STATE, "Saving state to {}", path.display());

        let mut sink = BufWriter::new(File::create(path).map_err(StateError::from)?);
        let result: Result<(), StateError> = (|| {
            sink.write_all(MAGIC)?;
            write_u32(&mut sink, VERSION)?;
            write_u8(&mut sink, status_byte(status))?;

            let n_outer = self.maps.n_outer() as u32;
            write_u32(&mut sink, n_outer)?;
            write_u32(&mut sink, self.maps.n_outside() as u32)?;

            // Root-level valuation and saved polarities, in outer order.
            for outer in 0..n_outer {
                let inter = self.maps.inter_from_outer(outer);
                let value = match self.searcher.engine.cnf.value_of(inter) {
                    None => 0,
                    Some(true) => 1,
                    Some(false) => 2,
                };
                let polarity =
                    u8::from(self.searcher.engine.cnf.var_data[inter as usize].saved_polarity);
                write_u8(&mut sink, value | (polarity << 4))?;
            }

            // The equivalence table.
            for &entry in self.replacer.table() {
                write_lit(&mut sink, entry)?;
            }

            // Elimination records.
            let records: &[ElimRecord] = match self.occ.as_ref() {
                Some(occ) => occ.elim_stack(),
                None => &[],
            };
            let blocked = self
                .occ
                .as_ref()
                .is_some_and(|occ| occ.anything_has_been_blocked());
            write_u8(&mut sink, u8::from(blocked))?;
            write_u32(&mut sink, records.len() as u32)?;
            for record in records {
                match record {
                    ElimRecord::Elimed { var, clauses } => {
                        write_u8(&mut sink, 0)?;
                        write_u32(&mut sink, *var)?;
                        write_u32(&mut sink, clauses.len() as u32)?;
                        for clause in clauses {
                            write_clause(&mut sink, clause)?;
                        }
                    }
                    ElimRecord::Blocked { on, clause } => {
                        write_u8(&mut sink, 1)?;
                        write_lit(&mut sink, *on)?;
                        write_clause(&mut sink, clause)?;
                    }
                }
            }

            sink.flush()?;
            Ok(())
        })();

        result.map_err(ErrorKind::State)
    }

    /// Loads solver state saved by [save_state](crate::solver::Solver::save_state), returning
    /// the saved status.
    pub fn load_state(&mut self, path: &Path) -> Result<SolveReport, ErrorKind> {
        log::info!(target: targets::STATE, "Loading state from {}", path.display());
        let mut source = BufReader::new(File::open(path).map_err(StateError::from)?);

        let result: Result<SolveReport, StateError> = (|| {
            let mut magic = [0_u8; 4];
            source.read_exact(&mut magic).map_err(|_| StateError::Corrupt)?;
            if &magic != MAGIC {
                return Err(StateError::NotAStateFile);
            }

            let version = read_u32(&mut source)?;
            if version != VERSION {
                return Err(StateError::Version(version));
            }

            let status = status_of_byte(read_u8(&mut source)?)?;

            let n_outer = read_u32(&mut source)?;
            let n_outside = read_u32(&mut source)?;
            if n_outer != self.maps.n_outer() as u32 || n_outside != self.maps.n_outside() as u32
            {
                return Err(StateError::VarCountMismatch {
                    saved: n_outer,
                    current: self.maps.n_outer() as u32,
                });
            }

            // Valuation and polarities.
            let mut root_units: Vec<Lit> = Vec::default();
            for outer in 0..n_outer {
                let byte = read_u8(&mut source)?;
                let inter = self.maps.inter_from_outer(outer);
                self.searcher.engine.cnf.var_data[inter as usize].saved_polarity =
                    (byte >> 4) & 1 == 1;
                match byte & 0x0F {
                    0 => {}
                    1 => root_units.push(Lit::new(inter, true)),
                    2 => root_units.push(Lit::new(inter, false)),
                    _ => return Err(StateError::Corrupt),
                }
            }

            // The equivalence table.
            let mut table = Vec::with_capacity(n_outer as usize);
            for _ in 0..n_outer {
                table.push(read_lit(&mut source)?);
            }
            let replaced_count = table
                .iter()
                .enumerate()
                .filter(|(var, entry)| entry.var() as usize != *var)
                .count();
            for (var, entry) in table.iter().enumerate() {
                if entry.var() as usize != var {
                    let inter = self.maps.inter_from_outer(var as Var);
                    self.searcher.engine.cnf.var_data[inter as usize].removed =
                        Removed::Replaced;
                }
            }
            self.replacer.set_table(table, replaced_count);

            // Elimination records.
            let blocked = read_u8(&mut source)? == 1;
            let record_count = read_u32(&mut source)? as usize;
            let mut records = Vec::with_capacity(record_count);
            for _ in 0..record_count {
                match read_u8(&mut source)? {
                    0 => {
                        let var = read_u32(&mut source)?;
                        let clause_count = read_u32(&mut source)? as usize;
                        let mut clauses = Vec::with_capacity(clause_count);
                        for _ in 0..clause_count {
                            clauses.push(read_clause(&mut source)?);
                        }

                        let inter = self.maps.inter_from_outer(var);
                        self.searcher.engine.cnf.var_data[inter as usize].removed =
                            Removed::Elimed;
                        records.push(ElimRecord::Elimed { var, clauses });
                    }
                    1 => {
                        let on = read_lit(&mut source)?;
                        let clause = read_clause(&mut source)?;
                        records.push(ElimRecord::Blocked { on, clause });
                    }
                    _ => return Err(StateError::Corrupt),
                }
            }
            if let Some(occ) = self.occ.as_mut() {
                occ.set_elim_stack(records, blocked);
            }

            // Re-prove the root units on this solver.
            for unit in root_units {
                if !self.fully_enqueue_this(unit) {
                    break;
                }
            }

            Ok(status)
        })();

        result.map_err(ErrorKind::State)
    }

    /// Reads a solution file into the outside model, returning the status it declares.
    pub fn load_solution_from_file(&mut self, path: &Path) -> Result<SolveReport, ErrorKind> {
        log::info!(target: targets::STATE, "Loading solution from {}", path.display());
        let source = BufReader::new(File::open(path).map_err(StateError::from)?);

        let mut status = SolveReport::Unknown;
        self.model = vec![None; self.maps.n_outside()];

        for (line_number, line) in source.lines().enumerate() {
            let line = line.map_err(StateError::from).map_err(ErrorKind::State)?;
            let line = line.trim();

            match line.chars().next() {
                Some('s') => {
                    status = match line[1..].trim() {
                        "SATISFIABLE" => SolveReport::Satisfiable,
                        "UNSATISFIABLE" => return Ok(SolveReport::Unsatisfiable),
                        "INDETERMINATE" => return Ok(SolveReport::Unknown),
                        _ => {
                            return Err(StateError::SolutionLine(line_number).into());
                        }
                    };
                }

                Some('v') => {
                    for token in line[1..].split_whitespace() {
                        let parsed: i64 = token
                            .parse()
                            .map_err(|_| StateError::SolutionLine(line_number))
                            .map_err(ErrorKind::State)?;
                        if parsed == 0 {
                            continue;
                        }
                        let var = (parsed.unsigned_abs() - 1) as usize;
                        if var >= self.model.len() {
                            return Err(StateError::SolutionLine(line_number).into());
                        }
                        self.model[var] = Some(parsed > 0);
                    }
                }

                Some('\u{0}') | None => {
                    log::warn!(target: targets::STATE, "Empty line {line_number} in solution file");
                }

                _ => {}
            }
        }

        Ok(status)
    }

    /// Replay mode: load saved state, load the solution, and lift it over the records.
    pub(crate) fn replay_from_files(&mut self) -> Result<SolveReport, ErrorKind> {
        let state_path = self
            .config
            .preprocess
            .saved_state_file
            .clone()
            .ok_or(ErrorKind::State(StateError::Io(String::from(
                "no saved state file configured",
            ))))?;
        let solution_path = self
            .config
            .preprocess
            .solution_file
            .clone()
            .ok_or(ErrorKind::State(StateError::Io(String::from(
                "no solution file configured",
            ))))?;

        let status = self.load_state(&state_path)?;
        if status == SolveReport::Unsatisfiable {
            self.ok = false;
            return Ok(status);
        }

        let status = self.load_solution_from_file(&solution_path)?;
        if status != SolveReport::Satisfiable {
            return Ok(status);
        }

        // Lift the outside solution to outer, overlay the root valuation, and extend.
        let mut outer_model: Vec<Option<bool>> = vec![None; self.maps.n_outer()];
        for (outside, value) in self.model.iter().enumerate() {
            let outer = self.maps.outer_from_outside(outside as Var);
            outer_model[outer as usize] = *value;
        }
        for inter in 0..self.searcher.engine.cnf.var_count() {
            if let Some(value) = self.searcher.engine.cnf.assigns[inter] {
                let outer = self.maps.outer_from_inter(inter as Var);
                outer_model[outer as usize] = Some(value);
            }
        }

        let empty: &[ElimRecord] = &[];
        let elim_stack = match self.occ.as_ref() {
            Some(occ) => occ.elim_stack(),
            None => empty,
        };
        extend::extend_model(&mut outer_model, elim_stack, &self.replacer);
        self.full_model = outer_model;
        self.model = (0..self.maps.n_outside() as Var)
            .map(|outside| self.full_model[self.maps.outer_from_outside(outside) as usize])
            .collect();

        Ok(SolveReport::Satisfiable)
    }

    /// Write-simplified mode: persist state and the simplified formula after inprocessing.
    ///
    /// The simplified formula is written even when the solve concluded during preprocessing
    /// (with a warning), unless
    /// [emit_cnf_despite_solution](crate::config::SimplifyConfig::emit_cnf_despite_solution)
    /// says otherwise.
    pub(crate) fn write_simplified(&mut self, status: SolveReport) -> Result<(), ErrorKind> {
        debug_assert_eq!(
            self.config.preprocess.mode,
            Some(PreprocessMode::WriteSimplified)
        );

        self.searcher.engine.cancel_until(0);
        if status != SolveReport::Unsatisfiable && self.ok {
            // No valued literal should survive into the written clauses.
            self.clean_clauses_at_level0();
        }

        if status == SolveReport::Satisfiable {
            log::warn!(target: targets::STATE, "Solution found during preprocessing, but writing simplified formula to file");
            if !self.config.simplify.emit_cnf_despite_solution {
                if let Some(path) = self.config.preprocess.saved_state_file.clone() {
                    self.save_state(&path, status)?;
                }
                return Ok(());
            }
        }

        if let Some(path) = self.config.preprocess.saved_state_file.clone() {
            self.save_state(&path, status)?;
        }
        if let Some(path) = self.config.preprocess.simplified_cnf.clone() {
            self.dump_irredundant(&path, status)?;
        }

        Ok(())
    }

    /// Writes the irredundant simplified formula as DIMACS, in outer numbering.
    fn dump_irredundant(&self, path: &Path, status: SolveReport) -> Result<(), ErrorKind> {
        let mut sink = BufWriter::new(File::create(path).map_err(StateError::from)?);

        let result: Result<(), StateError> = (|| {
            if status == SolveReport::Unsatisfiable || !self.ok {
                writeln!(sink, "p cnf 1 2")?;
                writeln!(sink, "1 0")?;
                writeln!(sink, "-1 0")?;
                return Ok(());
            }

            let units: Vec<Lit> = self
                .searcher
                .engine
                .trail
                .lits
                .iter()
                .map(|&l| self.maps.outer_from_inter_lit(l))
                .collect();
            let binaries: Vec<(Lit, Lit)> = self
                .searcher
                .engine
                .cnf
                .watches
                .binary_clauses()
                .filter(|(_, _, red)| !red)
                .map(|(a, b, _)| {
                    (
                        self.maps.outer_from_inter_lit(a),
                        self.maps.outer_from_inter_lit(b),
                    )
                })
                .collect();

            let clause_count =
                units.len() + binaries.len() + self.searcher.engine.cnf.long_irred.len();
            writeln!(sink, "p cnf {} {clause_count}", self.maps.n_outer())?;

            for unit in units {
                writeln!(sink, "{unit} 0")?;
            }
            for (a, b) in binaries {
                writeln!(sink, "{a} {b} 0")?;
            }
            for &offset in &self.searcher.engine.cnf.long_irred {
                let clause = self.searcher.engine.cnf.arena.get(offset);
                for &literal in clause.lits() {
                    write!(sink, "{} ", self.maps.outer_from_inter_lit(literal))?;
                }
                writeln!(sink, "0")?;
            }

            sink.flush()?;
            Ok(())
        })();

        result.map_err(ErrorKind::State)
    }
}
