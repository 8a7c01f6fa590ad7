//! Rank-turbulence divergence engine.
//!
//! The engine owns an optional accelerated backend next to the always
//! available [`ReferenceBackend`]. Every call goes through
//! [`DivergenceEngine::compute`], which tries the accelerated path when it
//! is ready and falls back to the reference path on any error, panic or
//! malformed result. Callers observe the same result shape either way.
//!
//! ```text
//! DivergenceEngine::compute()
//!   │
//!   ├── accelerated ready? ── ParallelBackend (rayon, feature = "parallel")
//!   │        │ error / panic / shape mismatch → warn!
//!   │        ▼
//!   └── ReferenceBackend (sequential, source of truth)
//! ```

pub mod kernel;
pub mod reference;

#[cfg(feature = "parallel")]
pub mod parallel;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::alpha::Alpha;
use crate::combine::CombinedPair;

pub use reference::ReferenceBackend;

#[cfg(feature = "parallel")]
pub use parallel::{AcceleratedHandle, ParallelBackend};

/// Output of the divergence engine, parallel to the combined pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceResult {
    /// Raw per-category contributions, before normalization.
    pub contributions: Vec<f64>,
    /// Per-category divergence shares, `contribution / normalization`.
    pub shares: Vec<f64>,
    /// Normalization constant.
    pub normalization: f64,
}

impl DivergenceResult {
    /// Number of categories covered.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.shares.len()
    }

    /// True when no category is covered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// Total divergence, the sum of the shares.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.shares.iter().sum()
    }
}

/// Reasons an accelerated backend can decline or fail a computation.
///
/// These never reach pipeline callers; the engine logs them and recomputes
/// with the reference backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend has not finished initializing.
    #[error("backend is not initialized yet")]
    NotReady,
    /// The backend's worker pool could not be built.
    #[error("worker pool unavailable: {0}")]
    Pool(String),
    /// The backend returned a result of the wrong shape.
    #[error("malformed result: expected {expected} elements, got {got}")]
    Malformed {
        /// Number of categories in the input.
        expected: usize,
        /// Number of values returned.
        got: usize,
    },
    /// The backend returned a NaN, infinite or negative normalization.
    #[error("malformed result: normalization is not finite and non-negative")]
    InvalidNormalization,
    /// The backend returned a zero normalization although both systems
    /// have a nonzero count.
    #[error("malformed result: zero normalization for non-degenerate input")]
    ZeroNormalization,
    /// The backend returned a NaN or infinite per-category value.
    #[error("malformed result: {field}[{index}] is not finite")]
    NonFinite {
        /// `"contributions"` or `"shares"`.
        field: &'static str,
        /// Position of the first offending value.
        index: usize,
    },
    /// The backend panicked.
    #[error("backend panicked: {0}")]
    Panicked(String),
}

/// A strategy for computing rank-turbulence divergence.
///
/// Implementations must be pure: same inputs, same outputs, no retained
/// references to the combined pair.
pub trait DivergenceBackend: Send + Sync {
    /// Human-readable name for diagnostics.
    fn name(&self) -> &'static str;

    /// Whether the backend can serve a call right now. Must not block.
    fn is_ready(&self) -> bool {
        true
    }

    /// Computes the divergence of `combined` at exponent `alpha`.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the backend cannot produce a result.
    fn compute(
        &self,
        combined: &CombinedPair,
        alpha: Alpha,
    ) -> Result<DivergenceResult, BackendError>;
}

/// Computes the divergence of a combined pair with the reference backend.
///
/// # Examples
///
/// ```
/// use allotax::{combine, divergence, Alpha, ElementRecord};
///
/// let a = vec![ElementRecord::new("x", 10.0), ElementRecord::new("y", 5.0)];
/// let b = vec![ElementRecord::new("x", 4.0), ElementRecord::new("z", 8.0)];
/// let combined = combine(&a, &b).unwrap();
/// let rtd = divergence(&combined, Alpha::Finite(1.0));
/// assert!(rtd.normalization > 0.0);
/// assert_eq!(rtd.shares.len(), 3);
/// ```
#[must_use]
pub fn divergence(combined: &CombinedPair, alpha: Alpha) -> DivergenceResult {
    ReferenceBackend::new().run(combined, alpha)
}

/// Dispatcher over the reference backend and an optional accelerated one.
///
/// The engine holds no results between calls; it is safe to share across
/// threads and to call concurrently.
#[derive(Clone, Default)]
pub struct DivergenceEngine {
    reference: ReferenceBackend,
    accelerated: Option<Arc<dyn DivergenceBackend>>,
}

impl DivergenceEngine {
    /// An engine that only ever runs the reference backend.
    #[must_use]
    pub fn reference_only() -> Self {
        Self::default()
    }

    /// An engine that tries `backend` first.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn DivergenceBackend>) -> Self {
        Self {
            reference: ReferenceBackend::new(),
            accelerated: Some(backend),
        }
    }

    /// An engine whose accelerated backend initializes in the background.
    ///
    /// Usable immediately: calls made before initialization completes run
    /// on the reference backend. Without the `parallel` feature this is the
    /// same as [`DivergenceEngine::reference_only`].
    #[must_use]
    pub fn spawn() -> Self {
        #[cfg(feature = "parallel")]
        {
            Self::with_backend(Arc::new(ParallelBackend::new(AcceleratedHandle::spawn())))
        }
        #[cfg(not(feature = "parallel"))]
        {
            Self::reference_only()
        }
    }

    /// Name of the backend the next call would use.
    #[must_use]
    pub fn active_backend(&self) -> &'static str {
        match &self.accelerated {
            Some(backend) if backend.is_ready() => backend.name(),
            _ => self.reference.name(),
        }
    }

    /// Computes the divergence, preferring the accelerated backend.
    #[must_use]
    pub fn compute(&self, combined: &CombinedPair, alpha: Alpha) -> DivergenceResult {
        if let Some(backend) = self.accelerated.as_deref().filter(|b| b.is_ready()) {
            match try_backend(backend, combined, alpha) {
                Ok(result) => return result,
                Err(err) => warn!(
                    backend = backend.name(),
                    error = %err,
                    "accelerated divergence failed, using reference backend"
                ),
            }
        }
        debug!(elements = combined[0].len(), %alpha, "reference divergence");
        self.reference.run(combined, alpha)
    }

    /// Runs the reference backend directly, bypassing any accelerated one.
    #[must_use]
    pub fn compute_reference(&self, combined: &CombinedPair, alpha: Alpha) -> DivergenceResult {
        self.reference.run(combined, alpha)
    }

    /// Runs the accelerated backend only, without fallback.
    ///
    /// Returns `None` when the engine has no accelerated backend.
    #[must_use]
    pub fn compute_accelerated(
        &self,
        combined: &CombinedPair,
        alpha: Alpha,
    ) -> Option<Result<DivergenceResult, BackendError>> {
        self.accelerated
            .as_deref()
            .map(|backend| try_backend(backend, combined, alpha))
    }
}

impl core::fmt::Debug for DivergenceEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DivergenceEngine")
            .field("accelerated", &self.accelerated.as_ref().map(|b| b.name()))
            .field("active", &self.active_backend())
            .finish()
    }
}

/// Calls a backend, converting panics and malformed shapes into errors.
fn try_backend(
    backend: &dyn DivergenceBackend,
    combined: &CombinedPair,
    alpha: Alpha,
) -> Result<DivergenceResult, BackendError> {
    if !backend.is_ready() {
        return Err(BackendError::NotReady);
    }
    let result = panic::catch_unwind(AssertUnwindSafe(|| backend.compute(combined, alpha)))
        .map_err(|payload| BackendError::Panicked(panic_message(payload.as_ref())))??;

    let expected = combined[0].len();
    for got in [result.contributions.len(), result.shares.len()] {
        if got != expected {
            return Err(BackendError::Malformed { expected, got });
        }
    }
    validate_values(combined, &result)?;
    Ok(result)
}

/// Rejects results a correct backend can never produce: a normalization
/// that is not finite or is negative, zero despite both systems holding a
/// nonzero count, or any non-finite contribution or share.
fn validate_values(combined: &CombinedPair, result: &DivergenceResult) -> Result<(), BackendError> {
    let normalization = result.normalization;
    if !normalization.is_finite() || normalization < 0.0 {
        return Err(BackendError::InvalidNormalization);
    }
    let live = |side: usize| combined[side].counts.iter().any(|&c| c > 0.0);
    if normalization == 0.0 && live(0) && live(1) {
        return Err(BackendError::ZeroNormalization);
    }
    for (field, values) in [
        ("contributions", &result.contributions),
        ("shares", &result.shares),
    ] {
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(BackendError::NonFinite { field, index });
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
