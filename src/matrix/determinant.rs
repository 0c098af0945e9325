use crate::ast::MathValue;
use crate::error::{Error, Result};
use crate::matrix::{make_triangular, Matrix, DISPLAY_PRECISION};
use log::debug;

fn require_square(matrix: &Matrix, operation: &str) -> Result<()> {
    if matrix.is_square() {
        Ok(())
    } else {
        Err(Error::shape(format!(
            "{} needs a square matrix, got {}x{}",
            operation,
            matrix.rows(),
            matrix.cols()
        )))
    }
}

/// Determinant by the fastest path the entries allow: triangularization for
/// numeric matrices, cofactor expansion otherwise.
pub fn determinant(matrix: &Matrix) -> Result<MathValue> {
    if matrix.is_numeric() {
        determinant_triangular(matrix)
    } else {
        determinant_cofactor(matrix)
    }
}

/// Product of the diagonal of [`make_triangular`].
pub fn determinant_triangular(matrix: &Matrix) -> Result<MathValue> {
    require_square(matrix, "determinant")?;
    let triangular = make_triangular(matrix)?;

    let mut product = MathValue::from(1);
    for i in 0..triangular.rows() {
        product = product.mul(triangular.entry(i, i))?;
    }
    Ok(product.rounded(DISPLAY_PRECISION))
}

/// Laplace expansion along the first row. Works on symbolic entries.
pub fn determinant_cofactor(matrix: &Matrix) -> Result<MathValue> {
    require_square(matrix, "determinant")?;
    if matrix.rows() == 0 {
        return Ok(MathValue::from(1));
    }
    Ok(expand(matrix)?.rounded(DISPLAY_PRECISION))
}

fn expand(matrix: &Matrix) -> Result<MathValue> {
    let size = matrix.rows();
    match size {
        1 => return Ok(matrix.entry(0, 0).clone()),
        2 => {
            let ad = matrix.entry(0, 0).mul(matrix.entry(1, 1))?;
            let bc = matrix.entry(0, 1).mul(matrix.entry(1, 0))?;
            return ad.sub(&bc);
        }
        _ => {}
    }

    let mut total: Option<MathValue> = None;
    for col in 0..size {
        let entry = matrix.entry(0, col);
        if entry.is_zero() {
            continue;
        }
        let term = entry.mul(&expand(&minor(matrix, 0, col))?)?;
        let negative = col % 2 == 1;
        total = Some(match (total, negative) {
            (None, false) => term,
            (None, true) => term.negate(),
            (Some(sum), false) => sum.add(&term)?,
            (Some(sum), true) => sum.sub(&term)?,
        });
    }
    Ok(total.unwrap_or_else(|| MathValue::from(0)))
}

/// `matrix` without `row` and `col`.
pub fn minor(matrix: &Matrix, row: usize, col: usize) -> Matrix {
    let columns = matrix
        .columns()
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != col)
        .map(|(_, column)| {
            column
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != row)
                .map(|(_, value)| value.clone())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    if columns.is_empty() {
        return Matrix::zeros(0, 0);
    }
    // every column lost exactly one entry, so the shape stays consistent
    Matrix::from_columns(columns).unwrap_or_else(|_| Matrix::zeros(0, 0))
}

/// `det(matrix - symbol·I)` expanded symbolically.
pub fn characteristic_polynomial(matrix: &Matrix, symbol: &str) -> Result<MathValue> {
    require_square(matrix, "characteristic polynomial")?;
    let lambda = MathValue::symbol(symbol);

    let mut shifted = matrix.clone();
    for i in 0..shifted.rows() {
        let value = shifted.entry(i, i).sub(&lambda)?;
        shifted.set(i, i, value)?;
    }

    let polynomial = determinant_cofactor(&shifted)?;
    debug!("Characteristic polynomial in {}: {}", symbol, polynomial);
    Ok(polynomial)
}
