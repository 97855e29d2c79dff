//! loading Matrix Market files into an in-memory sparse representation and
//! converting between the storage formats the solvers accept
use log::info;
use nalgebra::DVector;
use nalgebra_sparse::io::load_coo_from_matrix_market_file;
use nalgebra_sparse::{CooMatrix, CscMatrix, CsrMatrix};
use std::fmt;
use std::path::Path;
use strum_macros::Display;

use faer::sparse::{SparseColMat, Triplet};

/// storage format tag of a loaded matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StorageFormat {
    Coordinate,
    CompressedColumn,
    CompressedRow,
}

/// errors of the matrix loading phase; fatal for the matrix they occur on,
/// the batch continues
#[derive(Debug)]
pub enum LoadError {
    /// unreadable or malformed Matrix Market file
    Read(String),
    /// the harness benchmarks square systems only
    NotSquare { nrows: usize, ncols: usize },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Read(msg) => write!(f, "failed to read matrix file: {}", msg),
            LoadError::NotSquare { nrows, ncols } => {
                write!(f, "matrix is not square: {}x{}", nrows, ncols)
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// an immutable square sparse matrix in one of the three storage formats
/// the pipeline can hold. Never mutated after load - only read or converted
/// to a new value of a different format.
#[derive(Debug, Clone)]
pub enum SparseMatrix {
    Coo(CooMatrix<f64>),
    Csc(CscMatrix<f64>),
    Csr(CsrMatrix<f64>),
}

impl SparseMatrix {
    pub fn nrows(&self) -> usize {
        match self {
            SparseMatrix::Coo(m) => m.nrows(),
            SparseMatrix::Csc(m) => m.nrows(),
            SparseMatrix::Csr(m) => m.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            SparseMatrix::Coo(m) => m.ncols(),
            SparseMatrix::Csc(m) => m.ncols(),
            SparseMatrix::Csr(m) => m.ncols(),
        }
    }

    pub fn nnz(&self) -> usize {
        match self {
            SparseMatrix::Coo(m) => m.nnz(),
            SparseMatrix::Csc(m) => m.nnz(),
            SparseMatrix::Csr(m) => m.nnz(),
        }
    }

    pub fn format(&self) -> StorageFormat {
        match self {
            SparseMatrix::Coo(_) => StorageFormat::Coordinate,
            SparseMatrix::Csc(_) => StorageFormat::CompressedColumn,
            SparseMatrix::Csr(_) => StorageFormat::CompressedRow,
        }
    }

    /// true when the matrix is already in a solver-compatible compressed format
    pub fn is_compressed(&self) -> bool {
        !matches!(self, SparseMatrix::Coo(_))
    }

    pub fn triplet_iter(&self) -> Box<dyn Iterator<Item = (usize, usize, f64)> + '_> {
        match self {
            SparseMatrix::Coo(m) => Box::new(m.triplet_iter().map(|(i, j, v)| (i, j, *v))),
            SparseMatrix::Csc(m) => Box::new(m.triplet_iter().map(|(i, j, v)| (i, j, *v))),
            SparseMatrix::Csr(m) => Box::new(m.triplet_iter().map(|(i, j, v)| (i, j, *v))),
        }
    }

    /// sparse matrix-vector product A*x
    pub fn mul_vector(&self, x: &DVector<f64>) -> DVector<f64> {
        assert_eq!(self.ncols(), x.len(), "matrix and vector shapes differ");
        let mut b = DVector::zeros(self.nrows());
        for (i, j, v) in self.triplet_iter() {
            b[i] += v * x[j];
        }
        b
    }

    /// convert to compressed-column storage; identity for a matrix already in CSC
    pub fn to_csc(&self) -> SparseMatrix {
        match self {
            SparseMatrix::Coo(m) => SparseMatrix::Csc(CscMatrix::from(m)),
            SparseMatrix::Csc(m) => SparseMatrix::Csc(m.clone()),
            SparseMatrix::Csr(m) => SparseMatrix::Csc(CscMatrix::from(m)),
        }
    }

    /// build the faer compressed-column matrix both direct solvers operate on
    pub fn to_solver_matrix(&self) -> Result<SparseColMat<usize, f64>, String> {
        let triplets: Vec<Triplet<usize, usize, f64>> = self
            .triplet_iter()
            .map(|(i, j, v)| Triplet::new(i, j, v))
            .collect();
        SparseColMat::<usize, f64>::try_new_from_triplets(self.nrows(), self.ncols(), &triplets)
            .map_err(|e| format!("{:?}", e))
    }
}

/// read a sparse matrix from a Matrix Market file (coordinate encoding,
/// symmetric storage expanded by the reader)
pub fn load_matrix_market(path: &Path) -> Result<SparseMatrix, LoadError> {
    let coo = load_coo_from_matrix_market_file::<f64, _>(path)
        .map_err(|e| LoadError::Read(format!("{}: {}", path.display(), e)))?;
    if coo.nrows() != coo.ncols() {
        return Err(LoadError::NotSquare {
            nrows: coo.nrows(),
            ncols: coo.ncols(),
        });
    }
    info!(
        "loaded {}: n = {}, nnz = {}",
        path.display(),
        coo.nrows(),
        coo.nnz()
    );
    Ok(SparseMatrix::Coo(coo))
}
