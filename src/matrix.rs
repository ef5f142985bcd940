//! Dense row-major matrix of rationals

use std::fmt;
use std::ops::{Index, IndexMut, Range};

use crate::rational::Rational;

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    mat: Vec<Rational>,
}

impl Matrix {
    /// Zero-filled `rows x cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            mat: vec![Rational::zero(); rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> &Rational {
        &self.mat[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: Rational) {
        self.mat[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[Rational] {
        &self.mat[row * self.cols..(row + 1) * self.cols]
    }

    pub fn mul_row(&mut self, row: usize, value: &Rational) {
        for x in &mut self.mat[row * self.cols..(row + 1) * self.cols] {
            *x = &*x * value;
        }
    }

    /// `row[target] -= factor * row[source]`
    pub fn sub_scaled_row(&mut self, target: usize, source: usize, factor: &Rational) {
        if target == source || factor.is_zero() {
            return;
        }
        for col in 0..self.cols {
            let delta = factor * self.get(source, col);
            if !delta.is_zero() {
                self.mat[target * self.cols + col] -= delta;
            }
        }
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for col in 0..self.cols {
            self.mat.swap(a * self.cols + col, b * self.cols + col);
        }
    }

    pub fn zero_row(&mut self, row: usize) {
        for x in &mut self.mat[row * self.cols..(row + 1) * self.cols] {
            *x = Rational::zero();
        }
    }

    pub fn zero_column(&mut self, col: usize) {
        for row in 0..self.rows {
            self.set(row, col, Rational::zero());
        }
    }

    pub fn set_column(&mut self, col: usize, column: &[Rational]) {
        for (row, value) in column.iter().enumerate().take(self.rows) {
            self.set(row, col, value.clone());
        }
    }

    /// Copy with `n` zero columns appended on the right.
    pub fn append_columns(&self, n: usize) -> Matrix {
        let mut out = Matrix::new(self.rows, self.cols + n);
        for row in 0..self.rows {
            for col in 0..self.cols {
                out.set(row, col, self.get(row, col).clone());
            }
        }
        out
    }

    /// Copy with `column` appended on the right.
    pub fn append_column(&self, column: &[Rational]) -> Matrix {
        let mut out = self.append_columns(1);
        out.set_column(self.cols, column);
        out
    }

    /// Copy of a rectangular block.
    pub fn block(&self, rows: Range<usize>, cols: Range<usize>) -> Matrix {
        let mut out = Matrix::new(rows.len(), cols.len());
        for (i, row) in rows.enumerate() {
            for (j, col) in cols.clone().enumerate() {
                out.set(i, j, self.get(row, col).clone());
            }
        }
        out
    }

    /// Reduce in place to reduced row echelon form and return the pivot
    /// columns.
    ///
    /// Elimination is fraction-free: each non-pivot row becomes
    /// `pivot * row - value * pivot_row`. Pivot rows are normalised by their
    /// pivot in a final pass.
    pub fn rref(&mut self) -> Vec<usize> {
        let mut pivots = Vec::new();
        let mut piv_row = 0;
        let mut piv_col = 0;

        while piv_col < self.cols && piv_row < self.rows {
            let Some(found) = (piv_row..self.rows).find(|&r| !self.get(r, piv_col).is_zero()) else {
                piv_col += 1;
                continue;
            };
            pivots.push(piv_col);
            self.swap_rows(piv_row, found);

            let pivot_val = self.get(piv_row, piv_col).clone();
            for row in 0..self.rows {
                if row == piv_row {
                    continue;
                }
                let val = self.get(row, piv_col).clone();
                if val.is_zero() {
                    continue;
                }
                for col in 0..self.cols {
                    let new_val =
                        &pivot_val * self.get(row, col) - &val * self.get(piv_row, col);
                    self.set(row, col, new_val);
                }
            }
            piv_row += 1;
        }

        for (row, &col) in pivots.iter().enumerate() {
            let pivot_val = self.get(row, col).clone();
            self.set(row, col, Rational::one());
            for c in col + 1..self.cols {
                // pivot_val is nonzero by construction
                if let Ok(x) = self.get(row, c).try_div(&pivot_val) {
                    self.set(row, c, x);
                }
            }
        }
        pivots
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Rational;

    fn index(&self, (row, col): (usize, usize)) -> &Rational {
        self.get(row, col)
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Rational {
        &mut self.mat[row * self.cols + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<String> = self.mat.iter().map(|x| x.to_decimal(3)).collect();
        let widths: Vec<usize> = (0..self.cols)
            .map(|col| {
                (0..self.rows)
                    .map(|row| cells[row * self.cols + col].len())
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        for row in 0..self.rows {
            let line: Vec<String> = (0..self.cols)
                .map(|col| format!("{:>w$}", cells[row * self.cols + col], w = widths[col]))
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}
