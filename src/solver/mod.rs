//! Numerical solvers behind the weights optimisers

pub mod cholesky;
pub mod simplex;

pub use self::cholesky::{cholesky, cholesky_solve};
pub use self::simplex::SimplexQpSolver;
