mod determinant;
mod reduce;

pub use determinant::*;
pub use reduce::*;

use crate::ast::MathValue;
use crate::error::{Error, Result};
use std::fmt;

/// Fractional digits kept by [`Matrix::prettify`].
pub const DISPLAY_PRECISION: u32 = 6;

/// A dense matrix of hybrid values, stored as columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    columns: Vec<Vec<MathValue>>,
}

impl Matrix {
    /// Every column must have the same length. At least one column is
    /// required; columns may be empty.
    pub fn from_columns(columns: Vec<Vec<MathValue>>) -> Result<Self> {
        let Some(first) = columns.first() else {
            return Err(Error::shape("a matrix needs at least one column"));
        };
        let rows = first.len();
        if let Some((index, column)) = columns
            .iter()
            .enumerate()
            .find(|(_, column)| column.len() != rows)
        {
            return Err(Error::shape(format!(
                "column {} has {} entries, expected {}",
                index,
                column.len(),
                rows
            )));
        }
        Ok(Self { columns })
    }

    pub fn from_rows(rows: Vec<Vec<MathValue>>) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(Error::shape("a matrix needs at least one row"));
        };
        let width = first.len();
        if rows.iter().any(|row| row.len() != width) {
            return Err(Error::shape("rows have different lengths"));
        }
        let columns = (0..width)
            .map(|col| rows.iter().map(|row| row[col].clone()).collect())
            .collect();
        Self::from_columns(columns)
    }

    pub fn identity(size: usize) -> Self {
        let mut matrix = Self::zeros(size, size.max(1));
        for i in 0..size {
            matrix.columns[i][i] = MathValue::from(1);
        }
        matrix
    }

    /// A `rows`x`cols` zero matrix. At least one (possibly empty) column is
    /// always kept.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            columns: vec![vec![MathValue::from(0); rows]; cols.max(1)],
        }
    }

    pub fn rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_square(&self) -> bool {
        self.rows() == self.cols()
    }

    pub fn is_numeric(&self) -> bool {
        self.columns
            .iter()
            .flatten()
            .all(MathValue::is_numeric)
    }

    pub fn get(&self, row: usize, col: usize) -> Result<&MathValue> {
        self.check_bounds(row, col)?;
        Ok(&self.columns[col][row])
    }

    pub fn set(&mut self, row: usize, col: usize, value: impl Into<MathValue>) -> Result<()> {
        self.check_bounds(row, col)?;
        self.columns[col][row] = value.into();
        Ok(())
    }

    pub fn column(&self, col: usize) -> Result<&[MathValue]> {
        self.columns
            .get(col)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                Error::shape(format!(
                    "column {} is outside a {}x{} matrix",
                    col,
                    self.rows(),
                    self.cols()
                ))
            })
    }

    pub fn row(&self, row: usize) -> Result<Vec<MathValue>> {
        if row >= self.rows() {
            return Err(Error::shape(format!(
                "row {} is outside a {}x{} matrix",
                row,
                self.rows(),
                self.cols()
            )));
        }
        Ok(self.columns.iter().map(|column| column[row].clone()).collect())
    }

    pub fn columns(&self) -> &[Vec<MathValue>] {
        &self.columns
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::shape(format!(
                "entry ({}, {}) is outside a {}x{} matrix",
                row,
                col,
                self.rows(),
                self.cols()
            )));
        }
        Ok(())
    }

    /// Unchecked read for algorithms that iterate within the shape.
    pub(crate) fn entry(&self, row: usize, col: usize) -> &MathValue {
        &self.columns[col][row]
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_bounds(a.max(b), 0)?;
        if a != b {
            for column in &mut self.columns {
                column.swap(a, b);
            }
        }
        Ok(())
    }

    pub fn scale_row(&mut self, row: usize, factor: &MathValue) -> Result<()> {
        self.check_bounds(row, 0)?;
        for column in &mut self.columns {
            column[row] = column[row].mul(factor)?;
        }
        Ok(())
    }

    /// `target += factor * source`
    pub fn add_scaled_row(
        &mut self,
        target: usize,
        source: usize,
        factor: &MathValue,
    ) -> Result<()> {
        self.check_bounds(target.max(source), 0)?;
        for column in &mut self.columns {
            let scaled = column[source].mul(factor)?;
            column[target] = column[target].add(&scaled)?;
        }
        Ok(())
    }

    /// `[self | other]`
    pub fn augment(&self, other: &Matrix) -> Result<Matrix> {
        if self.rows() != other.rows() {
            return Err(Error::shape(format!(
                "cannot augment {} rows with {} rows",
                self.rows(),
                other.rows()
            )));
        }
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        Ok(Matrix { columns })
    }

    /// Keeps the columns from `start` onwards.
    pub fn columns_from(&self, start: usize) -> Result<Matrix> {
        if start >= self.cols() {
            return Err(Error::shape(format!(
                "no columns left after dropping {} of {}",
                start,
                self.cols()
            )));
        }
        Ok(Matrix {
            columns: self.columns[start..].to_vec(),
        })
    }

    pub fn transpose(&self) -> Matrix {
        let columns = (0..self.rows())
            .map(|row| self.columns.iter().map(|column| column[row].clone()).collect())
            .collect::<Vec<_>>();
        if columns.is_empty() {
            return Matrix::zeros(0, self.cols());
        }
        Matrix { columns }
    }

    pub fn multiply(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols() != other.rows() {
            return Err(Error::shape(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows(),
                self.cols(),
                other.rows(),
                other.cols()
            )));
        }
        let mut columns = Vec::with_capacity(other.cols());
        for other_column in &other.columns {
            let mut column = Vec::with_capacity(self.rows());
            for row in 0..self.rows() {
                let mut sum: Option<MathValue> = None;
                for (k, value) in other_column.iter().enumerate() {
                    let product = self.entry(row, k).mul(value)?;
                    sum = Some(match sum {
                        None => product,
                        Some(total) => total.add(&product)?,
                    });
                }
                column.push(sum.unwrap_or_else(|| MathValue::from(0)));
            }
            columns.push(column);
        }
        Matrix::from_columns(columns)
    }

    /// Rounds numeric entries to [`DISPLAY_PRECISION`] digits and snaps
    /// near-zero noise to zero. Symbolic entries are left alone.
    pub fn prettify(&mut self) {
        for value in self.columns.iter_mut().flatten() {
            *value = value.rounded(DISPLAY_PRECISION);
        }
    }
}

/// Row-major, one bracketed row per line.
impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows() {
            if row > 0 {
                writeln!(f)?;
            }
            f.write_str("[")?;
            for (col, column) in self.columns.iter().enumerate() {
                if col > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{}", column[row])?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    pub(crate) fn matrix(rows: &[&[i64]]) -> Matrix {
        Matrix::from_rows(
            rows.iter()
                .map(|row| row.iter().map(|&v| MathValue::from(v)).collect())
                .collect(),
        )
        .unwrap()
    }

    pub(crate) fn random_matrix(rng: &mut StdRng, size: usize) -> Matrix {
        let rows = (0..size)
            .map(|_| {
                (0..size)
                    .map(|_| MathValue::from(rng.random_range(-9i64..=9)))
                    .collect()
            })
            .collect();
        Matrix::from_rows(rows).unwrap()
    }

    pub(crate) fn close(a: &MathValue, b: &MathValue, tolerance: Decimal) -> bool {
        match (a.as_number(), b.as_number()) {
            (Some(a), Some(b)) => (a - b).abs() <= tolerance,
            _ => a == b,
        }
    }

    pub(crate) fn seeded() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    #[test]
    fn test_column_orientation() {
        let m = Matrix::from_columns(vec![
            vec![MathValue::from(1), MathValue::from(2)],
            vec![MathValue::from(3), MathValue::from(4)],
        ])
        .unwrap();
        assert_eq!(m.get(0, 1).unwrap(), &MathValue::from(3));
        assert_eq!(m.row(1).unwrap(), vec![MathValue::from(2), MathValue::from(4)]);
        assert_eq!(m.to_string(), "[1 3]\n[2 4]");
    }

    #[test]
    fn test_shape_errors() {
        assert!(Matrix::from_columns(vec![]).is_err());
        assert!(matches!(
            Matrix::from_columns(vec![vec![MathValue::from(1)], vec![]]),
            Err(Error::MatrixShape(_))
        ));

        let mut m = Matrix::identity(2);
        assert!(m.get(2, 0).is_err());
        assert!(m.set(0, 5, dec!(1)).is_err());
        assert!(m.row(3).is_err());
        assert!(m.swap_rows(0, 2).is_err());
    }

    #[test]
    fn test_row_operations() {
        let mut m = matrix(&[&[1, 2], &[3, 4]]);
        m.swap_rows(0, 1).unwrap();
        assert_eq!(m, matrix(&[&[3, 4], &[1, 2]]));
        m.scale_row(1, &MathValue::from(2)).unwrap();
        assert_eq!(m, matrix(&[&[3, 4], &[2, 4]]));
        m.add_scaled_row(0, 1, &MathValue::from(-1)).unwrap();
        assert_eq!(m, matrix(&[&[1, 0], &[2, 4]]));
    }

    #[test]
    fn test_multiply_and_augment() {
        let a = matrix(&[&[1, 2], &[3, 4]]);
        let b = matrix(&[&[0, 1], &[1, 0]]);
        assert_eq!(a.multiply(&b).unwrap(), matrix(&[&[2, 1], &[4, 3]]));
        assert_eq!(a.multiply(&Matrix::identity(2)).unwrap(), a);

        let wide = a.augment(&b).unwrap();
        assert_eq!(wide.cols(), 4);
        assert_eq!(wide.columns_from(2).unwrap(), b);
        assert!(a.multiply(&matrix(&[&[1, 2, 3]])).is_err());
    }

    #[test]
    fn test_symbolic_entries() {
        let m = Matrix::from_rows(vec![
            vec![MathValue::symbol("a"), MathValue::from(1)],
            vec![MathValue::from(0), MathValue::from(2)],
        ])
        .unwrap();
        assert!(!m.is_numeric());
        let product = m.multiply(&Matrix::identity(2)).unwrap();
        assert_eq!(product.get(0, 0).unwrap(), &MathValue::symbol("((a * 1) + 0)"));
    }

    #[test]
    fn test_prettify() {
        let mut m = Matrix::from_rows(vec![vec![
            MathValue::from(dec!(0.00000001)),
            MathValue::from(dec!(1.23456789)),
            MathValue::symbol("x"),
        ]])
        .unwrap();
        m.prettify();
        assert_eq!(m.to_string(), "[0 1.234568 x]");
    }

    #[test]
    fn test_transpose() {
        let m = matrix(&[&[1, 2, 3], &[4, 5, 6]]);
        assert_eq!(m.transpose(), matrix(&[&[1, 4], &[2, 5], &[3, 6]]));
    }

    #[test]
    fn test_random_matrices_have_requested_shape() {
        let mut rng = seeded();
        let m = random_matrix(&mut rng, 4);
        assert!(m.is_square());
        assert!(m.is_numeric());
        assert_eq!(m.rows(), 4);
    }
}
