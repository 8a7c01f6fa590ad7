//! Comparison facade.
//!
//! [`Allotaxonograph`] runs the pipeline stages in their fixed order and
//! bundles the outputs with the derived dashboard metrics:
//!
//! ```text
//! sys1, sys2 ──▶ combine ──▶ divergence ──▶ diamond_bin ──▶ shift_list (top N)
//!      │                                                          │
//!      └──────────────────────▶ balance ──────────────────────────┴──▶ Comparison
//! ```
//!
//! The facade keeps no results between calls. Each [`compare`] is
//! independent and may run concurrently with others on the same instance.
//!
//! [`compare`]: Allotaxonograph::compare

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alpha::Alpha;
use crate::balance::{balance, BalanceEntry};
use crate::combine::{combine, CombinedPair};
use crate::config::{BackendMode, ComparisonConfig, Preset};
use crate::diamond::{diamond_bin, max_log10_rank, DiamondBinResult};
use crate::divergence::{DivergenceEngine, DivergenceResult};
use crate::error::Result;
use crate::record::ElementRecord;
use crate::shift::{self, shift_list, ShiftEntry};

#[cfg(feature = "parallel")]
use crate::divergence::{AcceleratedHandle, ParallelBackend};
#[cfg(feature = "parallel")]
use std::sync::Arc;

/// Runs comparisons under one configuration.
///
/// [`Allotaxonograph::new`] in [`BackendMode::Auto`] builds a fresh worker
/// pool on a background thread. Code that creates many facades should build
/// one [`AcceleratedHandle`](crate::AcceleratedHandle) and pass it to
/// `with_handle`, or clone one facade, so the pool is shared.
#[derive(Debug, Clone)]
pub struct Allotaxonograph {
    engine: DivergenceEngine,
    config: ComparisonConfig,
}

impl Default for Allotaxonograph {
    fn default() -> Self {
        Self::new(ComparisonConfig::default())
    }
}

impl Allotaxonograph {
    /// Builds a facade; with [`BackendMode::Auto`] the accelerated backend
    /// starts initializing in the background.
    #[must_use]
    pub fn new(config: ComparisonConfig) -> Self {
        let engine = match config.backend {
            BackendMode::Auto => DivergenceEngine::spawn(),
            BackendMode::Reference => DivergenceEngine::reference_only(),
        };
        Self { engine, config }
    }

    /// Builds a facade around an existing engine. `config.backend` is ignored.
    #[must_use]
    pub fn with_engine(engine: DivergenceEngine, config: ComparisonConfig) -> Self {
        Self { engine, config }
    }

    /// Builds a facade whose accelerated backend draws from `handle`.
    ///
    /// Facades built from clones of one handle share its worker pool. With
    /// [`BackendMode::Reference`] the handle is not used.
    #[cfg(feature = "parallel")]
    #[must_use]
    pub fn with_handle(handle: AcceleratedHandle, config: ComparisonConfig) -> Self {
        let engine = match config.backend {
            BackendMode::Auto => {
                DivergenceEngine::with_backend(Arc::new(ParallelBackend::new(handle)))
            }
            BackendMode::Reference => DivergenceEngine::reference_only(),
        };
        Self { engine, config }
    }

    /// Default settings with a preset exponent.
    #[must_use]
    pub fn from_preset(preset: Preset) -> Self {
        Self::new(ComparisonConfig::from_preset(preset))
    }

    /// Replaces the exponent.
    #[must_use]
    pub fn with_alpha(mut self, alpha: Alpha) -> Self {
        self.config.alpha = alpha;
        self
    }

    /// Replaces the number of shift entries kept.
    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.config.top_n = top_n;
        self
    }

    /// Replaces both titles.
    #[must_use]
    pub fn with_titles(mut self, system1: impl Into<String>, system2: impl Into<String>) -> Self {
        self.config.titles = [system1.into(), system2.into()];
        self
    }

    /// Current settings.
    #[must_use]
    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// The divergence engine in use.
    #[must_use]
    pub fn engine(&self) -> &DivergenceEngine {
        &self.engine
    }

    /// Compares two systems.
    ///
    /// # Errors
    ///
    /// Returns a validation error if either system holds a malformed record.
    /// Nothing is computed in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use allotax::{Allotaxonograph, ComparisonConfig, BackendMode, ElementRecord};
    ///
    /// let a = vec![ElementRecord::new("x", 10.0), ElementRecord::new("y", 5.0)];
    /// let b = vec![ElementRecord::new("x", 4.0), ElementRecord::new("z", 8.0)];
    /// let cfg = ComparisonConfig::default().with_backend(BackendMode::Reference);
    /// let cmp = Allotaxonograph::new(cfg).compare(&a, &b).unwrap();
    /// assert_eq!(cmp.combined[0].categories, ["x", "y", "z"]);
    /// assert_eq!(cmp.balance.len(), 6);
    /// assert_eq!(cmp.max_log10(), 1);
    /// ```
    pub fn compare(&self, system1: &[ElementRecord], system2: &[ElementRecord]) -> Result<Comparison> {
        let alpha = self.config.alpha;
        let combined = combine(system1, system2)?;

        let backend = self.engine.active_backend();
        let divergence = self.engine.compute(&combined, alpha);
        let diamond = diamond_bin(&combined, &divergence);
        let mut shifts = shift_list(&combined, &diamond);
        shifts.truncate(self.config.top_n);
        let balance = balance(system1, system2);

        debug!(
            elements = combined[0].len(),
            %alpha,
            backend,
            n_cells = diamond.n_cells,
            "comparison computed"
        );

        Ok(Comparison {
            alpha,
            titles: self.config.titles.clone(),
            combined,
            divergence,
            diamond,
            shifts,
            balance,
        })
    }
}

/// Every pipeline output of one comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Exponent used.
    pub alpha: Alpha,
    /// Titles of system 1 and system 2.
    pub titles: [String; 2],
    /// Both systems over the shared universe.
    pub combined: CombinedPair,
    /// Per-category divergence.
    pub divergence: DivergenceResult,
    /// Diamond grid and reorder.
    pub diamond: DiamondBinResult,
    /// Top-N shift entries.
    pub shifts: Vec<ShiftEntry>,
    /// Six balance entries.
    pub balance: Vec<BalanceEntry>,
}

impl Comparison {
    /// Rounded-up largest log10 rank over both systems; 0 when empty.
    #[must_use]
    pub fn max_log10(&self) -> i32 {
        max_log10_rank(&self.combined).map_or(0, |v| v as i32)
    }

    /// `ceil(log10(largest cell count)) + 1`, or 2 when no cell is occupied.
    #[must_use]
    pub fn max_count_log(&self) -> i32 {
        match self.diamond.max_cell_count() {
            0 => 2,
            n => (n as f64).log10().ceil() as i32 + 1,
        }
    }

    /// Largest shift magnitude in the top-N list, or 1 when empty.
    #[must_use]
    pub fn max_shift(&self) -> f64 {
        shift::max_shift(&self.shifts)
    }

    /// Symmetric x-axis domain of the shift chart.
    #[must_use]
    pub fn x_domain(&self) -> [f64; 2] {
        let m = self.max_shift() * 1.5;
        [-m, m]
    }

    /// Divergence normalization constant.
    #[inline]
    #[must_use]
    pub fn normalization(&self) -> f64 {
        self.divergence.normalization
    }

    /// Serializable summary for downstream renderers.
    #[must_use]
    pub fn export(&self) -> ComparisonExport {
        ComparisonExport {
            divergence: self.divergence.clone(),
            shifts: self.shifts.clone(),
            balance: self.balance.clone(),
            meta: ExportMeta {
                alpha: self.alpha,
                titles: self.titles.clone(),
                max_log10: self.max_log10(),
                max_count_log: self.max_count_log(),
            },
        }
    }
}

/// The renderer-facing subset of a [`Comparison`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonExport {
    /// Per-category divergence.
    pub divergence: DivergenceResult,
    /// Top-N shift entries.
    pub shifts: Vec<ShiftEntry>,
    /// Six balance entries.
    pub balance: Vec<BalanceEntry>,
    /// Settings and scale metrics.
    pub meta: ExportMeta,
}

/// Settings and axis scales of an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMeta {
    /// Exponent used.
    pub alpha: Alpha,
    /// Titles of system 1 and system 2.
    pub titles: [String; 2],
    /// See [`Comparison::max_log10`].
    pub max_log10: i32,
    /// See [`Comparison::max_count_log`].
    pub max_count_log: i32,
}

impl ComparisonExport {
    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if a value cannot be represented in
    /// JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn reference() -> Allotaxonograph {
        Allotaxonograph::new(ComparisonConfig::default().with_backend(BackendMode::Reference))
    }

    fn recs(pairs: &[(&str, f64)]) -> Vec<ElementRecord> {
        pairs.iter().map(|&(c, n)| ElementRecord::new(c, n)).collect()
    }

    #[test]
    fn end_to_end_example() {
        let a = recs(&[("x", 10.0), ("y", 5.0)]);
        let b = recs(&[("x", 4.0), ("z", 8.0)]);
        let cmp = reference().with_alpha(Alpha::Finite(1.0)).compare(&a, &b).unwrap();
        assert_eq!(cmp.combined[0].categories, ["x", "y", "z"]);
        assert_eq!(cmp.combined[0].ranks, [1.0, 2.0, 3.0]);
        assert!(cmp.normalization() > 0.0);
        assert!(cmp
            .diamond
            .occupied()
            .any(|c| c.categories.iter().any(|t| t == "x")));
        assert_eq!(cmp.max_count_log(), 1);
        assert_eq!(cmp.x_domain(), [-1.5 * cmp.max_shift(), 1.5 * cmp.max_shift()]);
    }

    #[test]
    fn top_n_truncates_shifts() {
        let a: Vec<ElementRecord> = (0..50)
            .map(|i| ElementRecord::new(format!("w{i}"), (i + 1) as f64))
            .collect();
        let b: Vec<ElementRecord> = (25..75)
            .map(|i| ElementRecord::new(format!("w{i}"), (80 - i) as f64))
            .collect();
        let cmp = reference().compare(&a, &b).unwrap();
        assert_eq!(cmp.shifts.len(), 30);
        let cmp = reference().with_top_n(5).compare(&a, &b).unwrap();
        assert_eq!(cmp.shifts.len(), 5);
    }

    #[test]
    fn empty_inputs() {
        let cmp = reference().compare(&[], &[]).unwrap();
        assert_eq!(cmp.max_log10(), 0);
        assert_eq!(cmp.max_count_log(), 2);
        assert_eq!(cmp.max_shift(), 1.0);
        assert_eq!(cmp.x_domain(), [-1.5, 1.5]);
        assert_eq!(cmp.normalization(), 0.0);
        assert_eq!(cmp.diamond.grid.len(), 256);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let a = recs(&[("x", -1.0)]);
        assert!(matches!(
            reference().compare(&a, &[]),
            Err(Error::NegativeCount { .. })
        ));
    }

    #[test]
    fn repeated_calls_are_identical() {
        let a = recs(&[("a", 3.0), ("b", 3.0), ("c", 1.0)]);
        let b = recs(&[("b", 2.0), ("d", 9.0)]);
        let facade = Allotaxonograph::from_preset(Preset::Robust);
        assert_eq!(facade.compare(&a, &b).unwrap(), facade.compare(&a, &b).unwrap());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn facades_share_one_handle() {
        use crate::divergence::AcceleratedHandle;

        let handle = AcceleratedHandle::pending();
        let first = Allotaxonograph::with_handle(handle.clone(), ComparisonConfig::default());
        let second = Allotaxonograph::with_handle(
            handle.clone(),
            ComparisonConfig::default().with_alpha(Alpha::Infinity),
        );
        assert_eq!(first.engine().active_backend(), "reference");
        assert_eq!(second.engine().active_backend(), "reference");

        handle.initialize().unwrap();
        assert_eq!(first.engine().active_backend(), "parallel");
        assert_eq!(second.engine().active_backend(), "parallel");

        let a = recs(&[("x", 10.0), ("y", 5.0)]);
        let b = recs(&[("x", 4.0), ("z", 8.0)]);
        let shared = first.compare(&a, &b).unwrap();
        assert_eq!(shared, reference().compare(&a, &b).unwrap());

        let reference_mode = Allotaxonograph::with_handle(
            handle,
            ComparisonConfig::default().with_backend(BackendMode::Reference),
        );
        assert_eq!(reference_mode.engine().active_backend(), "reference");
    }

    #[test]
    fn export_shape() {
        let a = recs(&[("x", 10.0), ("y", 5.0)]);
        let b = recs(&[("x", 4.0), ("z", 8.0)]);
        let cmp = reference()
            .with_titles("before", "after")
            .with_alpha(Alpha::Infinity)
            .compare(&a, &b)
            .unwrap();
        let export = cmp.export();
        assert_eq!(export.meta.titles, ["before", "after"]);
        assert_eq!(export.meta.alpha, Alpha::Infinity);
        let json: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();
        assert_eq!(json["meta"]["alpha"], "infinity");
        assert_eq!(json["balance"].as_array().unwrap().len(), 6);
        assert_eq!(json["balance"][0]["axis"], "total_count");
    }
}
