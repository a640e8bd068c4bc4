//! Coreset constructors that select a subset of the original points

pub mod herding;
pub mod random_sample;
pub mod rp_cholesky;
pub mod stein_thinning;
pub mod traits;

pub use self::herding::{greedy_body, GreedyState, KernelHerding};
pub use self::random_sample::RandomSample;
pub use self::rp_cholesky::RPCholesky;
pub use self::stein_thinning::SteinThinning;
pub use self::traits::CoresetMethod;
