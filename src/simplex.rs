//! Exact two-phase simplex over a [`Matrix`] tableau
//!
//! The last row of the tableau is the objective (cost) row and the last
//! column holds the right-hand side. `basis[i]` names the column that is
//! basic in constraint row `i`.

use log::trace;

use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::rational::Rational;

#[derive(Debug, Clone)]
pub struct Simplex {
    tableau: Matrix,
    basis: Vec<usize>,
}

impl Simplex {
    /// `basis` must hold one column per constraint row, each with a nonzero
    /// coefficient of magnitude one in that row.
    pub fn new(tableau: Matrix, basis: Vec<usize>) -> Self {
        debug_assert_eq!(basis.len() + 1, tableau.rows());
        Self { tableau, basis }
    }

    pub fn tableau(&self) -> &Matrix {
        &self.tableau
    }

    pub fn into_tableau(self) -> Matrix {
        self.tableau
    }

    fn constraint_rows(&self) -> usize {
        self.tableau.rows() - 1
    }

    fn rhs_col(&self) -> usize {
        self.tableau.cols() - 1
    }

    /// Gauss-Jordan pivot on `(row, col)`, including the objective row.
    pub fn pivot(&mut self, row: usize, col: usize) -> Result<()> {
        trace!("pivot row {row} col {col}");
        let scale = self.tableau.get(row, col).reciprocal()?;
        self.tableau.mul_row(row, &scale);
        for r in 0..self.tableau.rows() {
            if r == row {
                continue;
            }
            let ratio = self.tableau.get(r, col).clone();
            self.tableau.sub_scaled_row(r, row, &ratio);
        }
        self.basis[row] = col;
        Ok(())
    }

    /// Phase 0: make every basic variable nonnegative.
    ///
    /// Rows whose basic coefficient is negative with a zero (or negative)
    /// right-hand side are negated in place. The rest are cleared one at a
    /// time by pivoting on their largest positive coefficient.
    pub fn eliminate_negative_bases(&mut self) -> Result<()> {
        let rhs = self.rhs_col();
        let mut negative = vec![false; self.constraint_rows()];
        let minus_one = Rational::from(-1);

        for (row, flag) in negative.iter_mut().enumerate() {
            if !self.tableau.get(row, self.basis[row]).is_negative() {
                continue;
            }
            if self.tableau.get(row, rhs).is_positive() {
                *flag = true;
            } else {
                self.tableau.mul_row(row, &minus_one);
            }
        }

        while let Some(row) = negative.iter().position(|&n| n) {
            let mut max = Rational::zero();
            let mut max_col = None;
            for col in 0..rhs {
                let x = self.tableau.get(row, col);
                if *x > max {
                    max = x.clone();
                    max_col = Some(col);
                }
            }
            let Some(col) = max_col else {
                return Err(Error::InfeasibleNetwork(format!(
                    "no positive coefficient to clear negative basis in row {row}"
                )));
            };

            let mut min_ratio: Option<Rational> = None;
            let mut matches = Vec::new();
            for r in 0..self.constraint_rows() {
                let x = self.tableau.get(r, col);
                if !x.is_positive() {
                    continue;
                }
                let ratio = self.tableau.get(r, rhs).try_div(x)?;
                if ratio.is_negative() {
                    continue;
                }
                match &min_ratio {
                    Some(best) if ratio > *best => {}
                    Some(best) if ratio == *best => matches.push(r),
                    _ => {
                        min_ratio = Some(ratio);
                        matches = vec![r];
                    }
                }
            }
            let Some(&first) = matches.first() else {
                return Err(Error::InfeasibleNetwork(format!(
                    "no ratio-test row for column {col}"
                )));
            };
            let pivot_row = matches
                .iter()
                .copied()
                .find(|&r| negative[r])
                .unwrap_or(first);
            negative[pivot_row] = false;
            self.pivot(pivot_row, col)?;
        }
        Ok(())
    }

    /// Phase 1: standard minimisation. Enters the most negative objective
    /// column (leftmost on ties) until none is negative.
    pub fn optimize(&mut self) -> Result<()> {
        let obj = self.constraint_rows();
        let rhs = self.rhs_col();
        loop {
            let mut min: Option<&Rational> = None;
            let mut min_col = 0;
            for col in 0..rhs {
                let x = self.tableau.get(obj, col);
                if min.is_none_or(|m| x < m) {
                    min = Some(x);
                    min_col = col;
                }
            }
            if !min.is_some_and(Rational::is_negative) {
                return Ok(());
            }

            let mut best: Option<(Rational, usize)> = None;
            for row in 0..obj {
                let x = self.tableau.get(row, min_col);
                if !x.is_positive() {
                    continue;
                }
                let ratio = self.tableau.get(row, rhs).try_div(x)?;
                if best.as_ref().is_none_or(|(b, _)| ratio < *b) {
                    best = Some((ratio, row));
                }
            }
            let Some((_, row)) = best else {
                return Err(Error::Unbounded { column: min_col });
            };
            self.pivot(row, min_col)?;
        }
    }

    pub fn solve(&mut self) -> Result<()> {
        self.eliminate_negative_bases()?;
        self.optimize()
    }

    /// Value of every non-RHS column: the row's RHS for basic columns, zero
    /// for the rest.
    pub fn values(&self) -> Vec<Rational> {
        let rhs = self.rhs_col();
        let mut values = vec![Rational::zero(); rhs];
        for (row, &col) in self.basis.iter().enumerate() {
            values[col] = self.tableau.get(row, rhs).clone();
        }
        values
    }

    /// Current objective value (the objective row's RHS is its negation).
    pub fn objective(&self) -> Rational {
        -self.tableau.get(self.constraint_rows(), self.rhs_col())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tableau(rows: &[&[i64]]) -> Matrix {
        let mut m = Matrix::new(rows.len(), rows[0].len());
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                m.set(r, c, Rational::from(*v));
            }
        }
        m
    }

    #[test]
    fn minimises_with_slack_basis() {
        // minimise -x - y  s.t.  x + 2y + s1 = 4,  3x + y + s2 = 6
        let m = tableau(&[
            &[1, 2, 1, 0, 4],
            &[3, 1, 0, 1, 6],
            &[-1, -1, 0, 0, 0],
        ]);
        let mut s = Simplex::new(m, vec![2, 3]);
        s.solve().unwrap();
        let values = s.values();
        assert_eq!(values[0], Rational::new(8, 5).unwrap());
        assert_eq!(values[1], Rational::new(6, 5).unwrap());
        assert_eq!(s.objective(), Rational::new(-14, 5).unwrap());
    }

    #[test]
    fn clears_negative_basis_before_optimising() {
        // minimise x + 2y  s.t.  x + y - e = 3  (e basic with coefficient -1)
        let m = tableau(&[&[1, 1, -1, 3], &[1, 2, 0, 0]]);
        let mut s = Simplex::new(m, vec![2]);
        s.solve().unwrap();
        let values = s.values();
        assert_eq!(values[0], Rational::from(3));
        assert!(values[1].is_zero());
        assert!(values[2].is_zero());
        assert_eq!(s.objective(), Rational::from(3));
    }

    #[test]
    fn zero_rhs_rows_are_negated() {
        let m = tableau(&[&[1, -1, -1, 0], &[0, 1, 0, 0]]);
        let mut s = Simplex::new(m, vec![2]);
        s.eliminate_negative_bases().unwrap();
        assert_eq!(s.tableau().row(0), &tableau(&[&[-1, 1, 1, 0]]).row(0)[..]);
    }

    #[test]
    fn infeasible_row_is_reported() {
        // -x - e = 2 has no nonnegative solution
        let m = tableau(&[&[-1, -1, 2], &[1, 0, 0]]);
        let mut s = Simplex::new(m, vec![1]);
        assert!(matches!(s.solve(), Err(Error::InfeasibleNetwork(_))));
    }

    #[test]
    fn unbounded_column_is_reported() {
        // minimise -x  s.t.  -x + s = 1
        let m = tableau(&[&[-1, 1, 1], &[-1, 0, 0]]);
        let mut s = Simplex::new(m, vec![1]);
        assert!(matches!(s.solve(), Err(Error::Unbounded { column: 0 })));
    }
}
