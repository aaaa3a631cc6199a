//! Cost Estimator — credit cost of an inference operation
//!
//! Callers use the estimate to enforce spend budgets before asking the
//! admission controller for a token. An operation whose cost cannot be
//! measured is an error, and callers should refuse to proceed with it.

pub mod estimator;

pub use estimator::{
    CostError, CostEstimator, CostResult, CreditEstimate, MAX_CREDITS, MIN_CREDITS,
};
