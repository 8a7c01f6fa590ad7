//! Data-parallel divergence backend (rayon).
//!
//! Inverse ranks, element contributions and shares are evaluated across a
//! dedicated worker pool. The normalization sums stay sequential and go
//! through the shared kernel, so results are bit-identical to
//! [`ReferenceBackend`](super::ReferenceBackend).
//!
//! The pool lives behind an [`AcceleratedHandle`]: an explicitly owned,
//! cloneable slot that is filled once, possibly from a background thread.
//! Nothing here is process-global.

use std::sync::{Arc, OnceLock};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use crate::alpha::Alpha;
use crate::combine::CombinedPair;

use super::kernel;
use super::{BackendError, DivergenceBackend, DivergenceResult};

/// Smallest slice handed to a single worker.
const MIN_CHUNK: usize = 1024;

/// Owned handle to the accelerated worker pool.
///
/// Clones share the same slot. [`is_ready`](Self::is_ready) never blocks.
#[derive(Clone, Default)]
pub struct AcceleratedHandle {
    pool: Arc<OnceLock<ThreadPool>>,
}

impl AcceleratedHandle {
    /// A handle whose pool has not been built.
    #[must_use]
    pub fn pending() -> Self {
        Self::default()
    }

    /// Starts building the pool on a background thread and returns at once.
    ///
    /// Failure to build is logged and leaves the handle permanently pending,
    /// which makes every engine using it run the reference backend.
    #[must_use]
    pub fn spawn() -> Self {
        let handle = Self::pending();
        let worker = handle.clone();
        let spawned = std::thread::Builder::new()
            .name("allotax-accel-init".into())
            .spawn(move || {
                if let Err(err) = worker.initialize() {
                    warn!(error = %err, "accelerated divergence backend unavailable");
                }
            });
        if let Err(err) = spawned {
            warn!(error = %err, "could not start accelerated backend initialization");
        }
        handle
    }

    /// Builds the pool on the calling thread and returns a ready handle.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Pool`] if the worker pool cannot be built.
    pub fn ready() -> Result<Self, BackendError> {
        let handle = Self::pending();
        handle.initialize()?;
        Ok(handle)
    }

    /// Builds the pool if it is not built yet. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Pool`] if the worker pool cannot be built.
    pub fn initialize(&self) -> Result<(), BackendError> {
        if self.pool.get().is_some() {
            return Ok(());
        }
        let pool = ThreadPoolBuilder::new()
            .thread_name(|i| format!("allotax-rtd-{i}"))
            .build()
            .map_err(|err| BackendError::Pool(err.to_string()))?;
        let threads = pool.current_num_threads();
        // A concurrent initializer may have won; its pool is equivalent.
        let _ = self.pool.set(pool);
        debug!(threads, "accelerated divergence backend ready");
        Ok(())
    }

    /// True once the pool has been built.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.pool.get().is_some()
    }

    fn pool(&self) -> Option<&ThreadPool> {
        self.pool.get()
    }
}

impl core::fmt::Debug for AcceleratedHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AcceleratedHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Rayon-backed divergence backend.
#[derive(Debug, Clone)]
pub struct ParallelBackend {
    handle: AcceleratedHandle,
}

impl ParallelBackend {
    /// Wraps a (possibly still pending) accelerated handle.
    #[must_use]
    pub fn new(handle: AcceleratedHandle) -> Self {
        Self { handle }
    }

    /// The handle this backend draws its pool from.
    #[must_use]
    pub fn handle(&self) -> &AcceleratedHandle {
        &self.handle
    }
}

impl DivergenceBackend for ParallelBackend {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn is_ready(&self) -> bool {
        self.handle.is_ready()
    }

    fn compute(
        &self,
        combined: &CombinedPair,
        alpha: Alpha,
    ) -> Result<DivergenceResult, BackendError> {
        let pool = self.handle.pool().ok_or(BackendError::NotReady)?;
        let [left, right] = combined;

        Ok(pool.install(|| {
            let inv_r1: Vec<f64> = left
                .ranks
                .par_iter()
                .with_min_len(MIN_CHUNK)
                .map(|&r| kernel::inverse_rank(r))
                .collect();
            let inv_r2: Vec<f64> = right
                .ranks
                .par_iter()
                .with_min_len(MIN_CHUNK)
                .map(|&r| kernel::inverse_rank(r))
                .collect();

            let contributions: Vec<f64> = inv_r1
                .par_iter()
                .zip(inv_r2.par_iter())
                .with_min_len(MIN_CHUNK)
                .map(|(&x, &y)| kernel::element(x, y, alpha))
                .collect();

            let normalization =
                kernel::normalization(&left.counts, &right.counts, &inv_r1, &inv_r2, alpha);

            let shares = contributions
                .par_iter()
                .with_min_len(MIN_CHUNK)
                .map(|&d| kernel::share(d, normalization))
                .collect();

            DivergenceResult {
                contributions,
                shares,
                normalization,
            }
        }))
    }
}
