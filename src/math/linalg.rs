use nalgebra::{DMatrix, DVector, Dyn, RowDVector, LU};

use crate::error::{PhError, Result};

/// LU factorisation of `Aᵀ`, used to solve `v·A = b` for row vectors `v`
/// without ever forming `A⁻¹`.
#[derive(Debug, Clone)]
pub struct LeftSolver {
    lu: LU<f64, Dyn, Dyn>,
    n: usize,
}

impl LeftSolver {
    pub fn new(a: &DMatrix<f64>) -> Result<Self> {
        if !a.is_square() {
            return Err(PhError::DimensionMismatch {
                context: "left solve",
                expected: a.nrows(),
                found: a.ncols(),
            });
        }
        let lu = LU::new(a.transpose());
        if !lu.is_invertible() {
            return Err(PhError::config("sub-generator matrix is singular"));
        }
        Ok(Self { lu, n: a.nrows() })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    /// Returns `v` such that `v·A = b`.
    pub fn solve(&self, b: &RowDVector<f64>) -> Result<RowDVector<f64>> {
        if b.len() != self.n {
            return Err(PhError::DimensionMismatch {
                context: "left solve",
                expected: self.n,
                found: b.len(),
            });
        }
        self.lu
            .solve(&b.transpose())
            .map(|v| v.transpose())
            .ok_or_else(|| PhError::config("sub-generator matrix is singular"))
    }
}

/// Exit-rate vector `a = -A·1`.
pub fn exit_rates(a: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(a.nrows(), a.row_iter().map(|row| -row.sum()))
}

/// Assembles `[[tl, tr], [0, br]]`.
pub fn block_upper(tl: &DMatrix<f64>, tr: &DMatrix<f64>, br: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let (n1, n2) = (tl.nrows(), br.nrows());
    if tr.nrows() != n1 {
        return Err(PhError::DimensionMismatch { context: "block assembly", expected: n1, found: tr.nrows() });
    }
    if tr.ncols() != n2 {
        return Err(PhError::DimensionMismatch { context: "block assembly", expected: n2, found: tr.ncols() });
    }
    let mut m = DMatrix::<f64>::zeros(n1 + n2, n1 + n2);
    m.view_mut((0, 0), (n1, n1)).copy_from(tl);
    m.view_mut((0, n1), (n1, n2)).copy_from(tr);
    m.view_mut((n1, n1), (n2, n2)).copy_from(br);
    Ok(m)
}

/// Concatenates two row vectors.
pub fn concat_rows(left: &RowDVector<f64>, right: &RowDVector<f64>) -> RowDVector<f64> {
    RowDVector::from_iterator(left.len() + right.len(), left.iter().chain(right.iter()).copied())
}
