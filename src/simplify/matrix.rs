/*!
Gaussian reasoning over parity constraints.

Parity constraints sharing variables form a *matrix*; each matrix is a linear system over
GF(2), and Gaussian elimination on it surfaces facts propagation cannot see:
- an inconsistent row establishes unsatisfiability,
- a row of one variable is a unit,
- a row of two variables is an equivalence, added as its pair of binary clauses (and merged by
  the next SCC pass).

Constraints may retain replaced or valued variables between passes; discovery begins by
refreshing every constraint through the equivalence table and the root-level valuation, which
also handles the short residues (empty, unit, pair) a refresh can produce.

The reduced rows of three or more variables replace the constraint store.
*/

use crate::{
    misc::log::targets,
    solver::Solver,
    structures::{clause::XorClause, literal::Lit},
};

/// A matrix row: variable indices local to the matrix, and a parity.
#[derive(Clone, Debug)]
struct Row {
    /// Bitset over the matrix's variables.
    cols: Vec<u64>,
    rhs: bool,
}

impl Row {
    fn new(width: usize) -> Self {
        Row {
            cols: vec![0; width.div_ceil(64)],
            rhs: false,
        }
    }

    fn set(&mut self, col: usize) {
        self.cols[col / 64] ^= 1 << (col % 64);
    }

    fn get(&self, col: usize) -> bool {
        (self.cols[col / 64] >> (col % 64)) & 1 == 1
    }

    fn xor_with(&mut self, other: &Row) {
        for (word, other_word) in self.cols.iter_mut().zip(&other.cols) {
            *word ^= other_word;
        }
        self.rhs ^= other.rhs;
    }

    fn first_set(&self) -> Option<usize> {
        for (index, word) in self.cols.iter().enumerate() {
            if *word != 0 {
                return Some(index * 64 + word.trailing_zeros() as usize);
            }
        }
        None
    }

    fn count_set(&self) -> usize {
        self.cols.iter().map(|w| w.count_ones() as usize).sum()
    }

    fn set_columns(&self) -> Vec<usize> {
        let mut columns = Vec::with_capacity(self.count_set());
        for (index, word) in self.cols.iter().enumerate() {
            let mut bits = *word;
            while bits != 0 {
                columns.push(index * 64 + bits.trailing_zeros() as usize);
                bits &= bits - 1;
            }
        }
        columns
    }
}

impl Solver {
    /// Refreshes every parity constraint, groups them into matrices, and eliminates.
    pub(crate) fn find_and_solve_xor_matrices(&mut self) {
        if self.searcher.engine.cnf.xors.is_empty() || !self.okay() {
            return;
        }

        self.refresh_xors();
        if !self.okay() {
            return;
        }

        let xors = std::mem::take(&mut self.searcher.engine.cnf.xors);
        if xors.is_empty() {
            return;
        }

        // Union-find over constraints, through shared variables.
        let mut group_of_var: std::collections::HashMap<u32, usize> =
            std::collections::HashMap::new();
        let mut parent: Vec<usize> = (0..xors.len()).collect();

        fn find(parent: &mut [usize], x: usize) -> usize {
            let mut root = x;
            while parent[root] != root {
                root = parent[root];
            }
            let mut walk = x;
            while parent[walk] != root {
                let next = parent[walk];
                parent[walk] = root;
                walk = next;
            }
            root
        }

        for (index, xor) in xors.iter().enumerate() {
            for &var in &xor.vars {
                match group_of_var.get(&var) {
                    Some(&other) => {
                        let ra = find(&mut parent, index);
                        let rb = find(&mut parent, other);
                        if ra != rb {
                            parent[ra] = rb;
                        }
                    }
                    None => {
                        group_of_var.insert(var, index);
                    }
                }
            }
        }

        let mut matrices: std::collections::HashMap<usize, Vec<&XorClause>> =
            std::collections::HashMap::new();
        for (index, xor) in xors.iter().enumerate() {
            let root = find(&mut parent, index);
            matrices.entry(root).or_default().push(xor);
        }

        log::info!(target: targets::MATRIX, "{} matrices over {} constraints", matrices.len(), xors.len());

        let mut surviving: Vec<XorClause> = Vec::default();
        for (_, matrix) in matrices {
            let reduced = self.eliminate_matrix(&matrix);
            if !self.okay() {
                return;
            }
            surviving.extend(reduced);
        }

        self.searcher.engine.cnf.xors = surviving;
    }

    /// Gaussian elimination of one matrix. Returns the reduced rows of three or more
    /// variables; shorter rows are acted on directly.
    fn eliminate_matrix(&mut self, matrix: &[&XorClause]) -> Vec<XorClause> {
        // Dense local columns.
        let mut var_of_col: Vec<u32> = Vec::default();
        let mut col_of_var: std::collections::HashMap<u32, usize> =
            std::collections::HashMap::new();
        for xor in matrix {
            for &var in &xor.vars {
                col_of_var.entry(var).or_insert_with(|| {
                    var_of_col.push(var);
                    var_of_col.len() - 1
                });
            }
        }
        let width = var_of_col.len();

        let mut rows: Vec<Row> = matrix
            .iter()
            .map(|xor| {
                let mut row = Row::new(width);
                for &var in &xor.vars {
                    row.set(col_of_var[&var]);
                }
                row.rhs = xor.rhs;
                row
            })
            .collect();

        // Forward elimination.
        for row_index in 0..rows.len() {
            let Some(pivot_col) = rows[row_index].first_set() else {
                continue;
            };

            for other_index in 0..rows.len() {
                if other_index != row_index && rows[other_index].get(pivot_col) {
                    let (a, b) = split_rows(&mut rows, other_index, row_index);
                    a.xor_with(b);
                }
            }
        }

        let mut surviving = Vec::default();
        for row in rows {
            match row.count_set() {
                0 => {
                    if row.rhs {
                        log::info!(target: targets::MATRIX, "Inconsistent parity row");
                        self.note_unsat();
                        return Vec::default();
                    }
                }

                1 => {
                    let var = var_of_col[row.set_columns()[0]];
                    let unit = Lit::new(var, row.rhs);
                    log::debug!(target: targets::MATRIX, "Parity unit {unit}");
                    if let Some(trace) = self.proof.as_mut() {
                        trace.add_clause(&[unit]);
                    }
                    if !self.fully_enqueue_this(unit) {
                        return Vec::default();
                    }
                }

                2 => {
                    let columns = row.set_columns();
                    let a = var_of_col[columns[0]];
                    let b = var_of_col[columns[1]];
                    log::debug!(target: targets::MATRIX, "Parity equivalence {a} ⊕ {b} = {}", row.rhs);
                    self.add_clause_int(
                        vec![Lit::new(a, true), Lit::new(b, row.rhs)],
                        false,
                        2,
                        true,
                        None,
                    );
                    if self.okay() {
                        self.add_clause_int(
                            vec![Lit::new(a, false), Lit::new(b, !row.rhs)],
                            false,
                            2,
                            true,
                            None,
                        );
                    }
                    if !self.okay() {
                        return Vec::default();
                    }
                }

                _ => {
                    let vars: Vec<u32> = row
                        .set_columns()
                        .into_iter()
                        .map(|c| var_of_col[c])
                        .collect();
                    surviving.push(XorClause::new(vars, row.rhs));
                }
            }
        }

        surviving
    }

    /// Refreshes constraints through the equivalence table and root-level valuation, acting on
    /// short residues.
    pub(crate) fn refresh_xors(&mut self) {
        let xors = std::mem::take(&mut self.searcher.engine.cnf.xors);

        for xor in xors {
            if !self.okay() {
                return;
            }

            let mut rhs = xor.rhs;
            let mut lits: Vec<Lit> = Vec::with_capacity(xor.vars.len());
            for var in xor.vars {
                let replaced = self.lit_replaced_with_inter(Lit::new(var, true));
                if !replaced.polarity() {
                    rhs ^= true;
                }
                lits.push(Lit::new(replaced.var(), true));
            }

            // Re-normalisation re-installs the constraint (without re-cutting, as any residue
            // of three or more variables is re-inserted directly).
            let mut vars: Vec<u32> = lits.iter().map(Lit::var).collect();
            vars.sort_unstable();

            let mut cleaned: Vec<u32> = Vec::with_capacity(vars.len());
            for var in vars {
                if cleaned.last() == Some(&var) {
                    cleaned.pop();
                    continue;
                }
                match self.searcher.engine.cnf.value_of(var) {
                    Some(value) => rhs ^= value,
                    None => cleaned.push(var),
                }
            }

            match cleaned.len() {
                0 => {
                    if rhs {
                        self.note_unsat();
                        return;
                    }
                }
                1 => {
                    let unit = Lit::new(cleaned[0], rhs);
                    if let Some(trace) = self.proof.as_mut() {
                        trace.add_clause(&[unit]);
                    }
                    self.fully_enqueue_this(unit);
                }
                2 => {
                    self.add_clause_int(
                        vec![Lit::new(cleaned[0], true), Lit::new(cleaned[1], rhs)],
                        false,
                        2,
                        true,
                        None,
                    );
                    if self.okay() {
                        self.add_clause_int(
                            vec![Lit::new(cleaned[0], false), Lit::new(cleaned[1], !rhs)],
                            false,
                            2,
                            true,
                            None,
                        );
                    }
                }
                _ => {
                    self.searcher
                        .engine
                        .cnf
                        .xors
                        .push(XorClause::new(cleaned, rhs));
                }
            }
        }
    }
}

/// Two disjoint mutable rows.
fn split_rows(rows: &mut [Row], a: usize, b: usize) -> (&mut Row, &mut Row) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = rows.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = rows.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
