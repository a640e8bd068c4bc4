//! Kernel functions for coreset construction

pub(crate) mod gramian;
pub mod heuristic;
pub mod laplacian;
pub mod linear;
pub mod pcimq;
pub mod squared_exponential;
pub mod stein;
pub mod traits;

pub use self::heuristic::{median_heuristic, median_heuristic_sampled};
pub use self::laplacian::*;
pub use self::linear::*;
pub use self::pcimq::*;
pub use self::squared_exponential::*;
pub use self::stein::*;
pub use self::traits::*;
