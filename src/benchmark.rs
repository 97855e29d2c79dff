//! benchmark harness for direct sparse solvers: builds a reference problem
//! with a known solution, picks a solve strategy, measures timings, error
//! and memory, and persists per-matrix reports
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// batch driver iterating a configured list of matrices
pub mod driver;
/// wall-clock timers, relative error and the memory probe
pub mod metrics;
/// synthetic right-hand side so the true solution is known exactly
pub mod reference_problem;
/// persistence of metrics and solution vectors
pub mod report;
/// two-tier solve strategy: sparse Cholesky preferred, sparse LU fallback
pub mod solver_selector;
