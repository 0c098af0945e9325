use crate::ast::MathValue;
use crate::error::{Error, Result};
use crate::matrix::{determinant_triangular, Matrix};
use log::{debug, trace};

/// First row at or below `from` with a non-zero entry in `col`.
fn find_pivot(matrix: &Matrix, col: usize, from: usize) -> Option<usize> {
    (from..matrix.rows()).find(|&row| !matrix.entry(row, col).is_zero())
}

/// Moves a usable pivot into `row`, scales it to one, and returns false when
/// the column has no pivot at or below `row`.
fn normalize_pivot(matrix: &mut Matrix, row: usize, col: usize) -> Result<bool> {
    let Some(pivot_row) = find_pivot(matrix, col, row) else {
        return Ok(false);
    };
    matrix.swap_rows(row, pivot_row)?;

    let reciprocal = MathValue::from(1).div(matrix.entry(row, col))?;
    matrix.scale_row(row, &reciprocal)?;
    matrix.set(row, col, 1)?;
    Ok(true)
}

fn eliminate(
    matrix: &mut Matrix,
    pivot_row: usize,
    col: usize,
    rows: impl Iterator<Item = usize>,
) -> Result<()> {
    for row in rows {
        if row == pivot_row {
            continue;
        }
        let factor = matrix.entry(row, col).clone();
        if factor.is_zero() {
            continue;
        }
        matrix.add_scaled_row(row, pivot_row, &factor.negate())?;
        matrix.set(row, col, 0)?;
    }
    Ok(())
}

/// Reduced row echelon form by Gauss-Jordan elimination. The input is left
/// untouched.
pub fn row_reduce(matrix: &Matrix) -> Result<Matrix> {
    let mut reduced = matrix.clone();
    let rows = reduced.rows();
    let mut lead = 0;

    for col in 0..reduced.cols() {
        if lead >= rows {
            break;
        }
        if !normalize_pivot(&mut reduced, lead, col)? {
            trace!("No pivot in column {}", col);
            continue;
        }
        eliminate(&mut reduced, lead, col, 0..rows)?;
        lead += 1;
    }

    reduced.prettify();
    debug!("Row reduced {}x{} matrix, rank {}", rows, reduced.cols(), lead);
    Ok(reduced)
}

/// Row echelon form: pivots scaled to one, zeros below each pivot only.
pub fn echelon_form(matrix: &Matrix) -> Result<Matrix> {
    let mut reduced = matrix.clone();
    let rows = reduced.rows();
    let mut lead = 0;

    for col in 0..reduced.cols() {
        if lead >= rows {
            break;
        }
        if !normalize_pivot(&mut reduced, lead, col)? {
            continue;
        }
        eliminate(&mut reduced, lead, col, lead + 1..rows)?;
        lead += 1;
    }

    reduced.prettify();
    Ok(reduced)
}

/// Upper-triangular form with the same determinant as `matrix`.
///
/// A zero pivot is replaced by the first non-zero entry below it; the swapped
/// row is negated so the determinant keeps its sign. Rows below the pivot are
/// cleared bottom-up using the pivot's reciprocal.
pub fn make_triangular(matrix: &Matrix) -> Result<Matrix> {
    if !matrix.is_square() {
        return Err(Error::shape(format!(
            "cannot triangularize a {}x{} matrix",
            matrix.rows(),
            matrix.cols()
        )));
    }

    let mut triangular = matrix.clone();
    let size = triangular.rows();

    for k in 0..size {
        if triangular.entry(k, k).is_zero() {
            let Some(row) = find_pivot(&triangular, k, k + 1) else {
                // column is already clear below the diagonal
                continue;
            };
            triangular.swap_rows(k, row)?;
            triangular.scale_row(k, &MathValue::from(-1))?;
        }

        let reciprocal = MathValue::from(1).div(triangular.entry(k, k))?;
        for row in (k + 1..size).rev() {
            let entry = triangular.entry(row, k).clone();
            if entry.is_zero() {
                triangular.set(row, k, 0)?;
                continue;
            }
            let factor = entry.mul(&reciprocal)?.negate();
            triangular.add_scaled_row(row, k, &factor)?;
            triangular.set(row, k, 0)?;
        }
    }

    Ok(triangular)
}

/// Inverse via `[A | I]` reduced to `[I | A⁻¹]`.
pub fn invert(matrix: &Matrix) -> Result<Matrix> {
    if !matrix.is_square() {
        return Err(Error::shape(format!(
            "cannot invert a {}x{} matrix",
            matrix.rows(),
            matrix.cols()
        )));
    }
    if !matrix.is_numeric() {
        return Err(Error::Unsupported(
            "inverting a matrix with symbolic entries".to_string(),
        ));
    }
    if determinant_triangular(matrix)?.is_zero() {
        return Err(Error::SingularMatrix);
    }

    let size = matrix.rows();
    let augmented = matrix.augment(&Matrix::identity(size))?;
    row_reduce(&augmented)?.columns_from(size)
}

/// Solves `matrix · x = rhs` for a square, non-singular `matrix`.
pub fn solve(matrix: &Matrix, rhs: &[MathValue]) -> Result<Vec<MathValue>> {
    if !matrix.is_square() {
        return Err(Error::shape(format!(
            "cannot solve a {}x{} system",
            matrix.rows(),
            matrix.cols()
        )));
    }
    if rhs.len() != matrix.rows() {
        return Err(Error::shape(format!(
            "right-hand side has {} entries, expected {}",
            rhs.len(),
            matrix.rows()
        )));
    }
    if matrix.is_numeric() && determinant_triangular(matrix)?.is_zero() {
        return Err(Error::SingularMatrix);
    }

    let augmented = matrix.augment(&Matrix::from_columns(vec![rhs.to_vec()])?)?;
    let reduced = row_reduce(&augmented)?;
    Ok(reduced.column(matrix.cols())?.to_vec())
}
