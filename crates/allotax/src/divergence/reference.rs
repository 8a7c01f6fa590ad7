//! Reference divergence backend.
//!
//! Single-threaded and always available. This is the correctness baseline
//! every other backend is cross-verified against.

use crate::alpha::Alpha;
use crate::combine::CombinedPair;

use super::kernel;
use super::{BackendError, DivergenceBackend, DivergenceResult};

/// Sequential, allocation-light implementation of the divergence formulas.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceBackend;

impl ReferenceBackend {
    /// Create a new reference backend.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the divergence of a combined pair. Never fails.
    #[must_use]
    pub fn run(&self, combined: &CombinedPair, alpha: Alpha) -> DivergenceResult {
        let [left, right] = combined;
        let inv_r1: Vec<f64> = left.ranks.iter().map(|&r| kernel::inverse_rank(r)).collect();
        let inv_r2: Vec<f64> = right.ranks.iter().map(|&r| kernel::inverse_rank(r)).collect();

        let contributions: Vec<f64> = inv_r1
            .iter()
            .zip(&inv_r2)
            .map(|(&x, &y)| kernel::element(x, y, alpha))
            .collect();

        let normalization =
            kernel::normalization(&left.counts, &right.counts, &inv_r1, &inv_r2, alpha);

        let shares = contributions
            .iter()
            .map(|&d| kernel::share(d, normalization))
            .collect();

        DivergenceResult {
            contributions,
            shares,
            normalization,
        }
    }
}

impl DivergenceBackend for ReferenceBackend {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn compute(
        &self,
        combined: &CombinedPair,
        alpha: Alpha,
    ) -> Result<DivergenceResult, BackendError> {
        Ok(self.run(combined, alpha))
    }
}
