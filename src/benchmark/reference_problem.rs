use crate::matrix_io::SparseMatrix;
use nalgebra::DVector;

/// a linear system whose true solution is known by construction: x_true is
/// the all-ones vector and b = A*x_true. This makes the relative-error
/// metric meaningful without an independently verified reference solution.
#[derive(Debug, Clone)]
pub struct ReferenceProblem {
    pub x_true: DVector<f64>,
    pub b: DVector<f64>,
}

/// pure computation, always succeeds for a well-formed square matrix
pub fn build_reference_problem(a: &SparseMatrix) -> ReferenceProblem {
    let n = a.ncols();
    let x_true = DVector::from_element(n, 1.0);
    let b = a.mul_vector(&x_true);
    ReferenceProblem { x_true, b }
}
