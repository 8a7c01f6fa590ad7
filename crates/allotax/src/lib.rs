//! Rank-turbulence comparison of two weighted categorical distributions.
//!
//! Given two systems (word-frequency tables, name-popularity tables,
//! species-abundance tables, ...), the pipeline aligns them onto one shared
//! category universe and produces the numeric artifacts of an
//! allotaxonograph: per-category rank-turbulence divergence, a diamond
//! histogram over log-rank space, a word-shift list and a balance summary.
//!
//! # Pipeline
//!
//! ```text
//! ElementRecord[] ×2
//!   │
//!   ├─▶ combine ─────▶ CombinedPair (shared order, tied ranks)
//!   │                    │
//!   │                    ├─▶ divergence(α) ─▶ DivergenceResult
//!   │                    │                        │
//!   │                    └────────────────────────┴─▶ diamond_bin ─▶ DiamondBinResult
//!   │                                                                    │
//!   │                                                       shift_list ◀─┘
//!   └─▶ balance ─▶ BalanceEntry[6]
//! ```
//!
//! Every stage is a pure function: inputs are borrowed, outputs are fresh.
//! [`Allotaxonograph`] runs the stages in order under a
//! [`ComparisonConfig`].
//!
//! # Divergence regimes
//!
//! | `alpha` | Contribution of one category |
//! |---------|------------------------------|
//! | `0` | `log10(max rank / min rank)` |
//! | `(0, ∞)` | `(α+1)/α · \|r₁^-α − r₂^-α\|^(1/(α+1))` |
//! | `∞` | larger inverse rank, or 0 when equal |
//!
//! # Backends
//!
//! [`DivergenceEngine`] dispatches to an optional accelerated backend (the
//! rayon-based `ParallelBackend`, feature `parallel`, on by default) and
//! falls back to [`ReferenceBackend`] whenever the accelerated backend is
//! not ready, errors, panics or returns a malformed result. Both compute the
//! same expressions in the same summation order.
//!
//! # Example
//!
//! ```
//! use allotax::{Alpha, Allotaxonograph, BackendMode, ComparisonConfig, ElementRecord};
//!
//! let a = vec![ElementRecord::new("x", 10.0), ElementRecord::new("y", 5.0)];
//! let b = vec![ElementRecord::new("x", 4.0), ElementRecord::new("z", 8.0)];
//!
//! let config = ComparisonConfig::default()
//!     .with_alpha(Alpha::Finite(1.0))
//!     .with_backend(BackendMode::Reference);
//! let cmp = Allotaxonograph::new(config).compare(&a, &b).unwrap();
//!
//! assert_eq!(cmp.combined[0].categories, ["x", "y", "z"]);
//! assert!(cmp.normalization() > 0.0);
//! assert!(cmp.diamond.occupied().any(|c| c.categories.iter().any(|t| t == "x")));
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

// Exponent and its regimes
pub mod alpha;

// Caller records and validation
pub mod record;

// Tie-averaged ranking
pub mod rank;

// Union of the two systems
pub mod combine;

// Divergence engine and backends
pub mod divergence;

// Log-rank grid
pub mod diamond;

// Word-shift and balance projections
pub mod shift;
pub mod balance;

// Settings and TOML loading
pub mod config;

// Facade running the full pipeline
pub mod pipeline;

// Invariant checks over a finished comparison
pub mod conformance;

pub mod error;

pub use alpha::{Alpha, Regime};
pub use balance::{balance, BalanceAxis, BalanceEntry};
pub use combine::{combine, CombinedPair, CombinedSystem};
pub use config::{BackendMode, ComparisonConfig, Preset};
pub use diamond::{diamond_bin, DiamondBinResult, DiamondCell, Side};
pub use divergence::{
    divergence, BackendError, DivergenceBackend, DivergenceEngine, DivergenceResult,
    ReferenceBackend,
};
pub use error::{Error, Result};
pub use pipeline::{Allotaxonograph, Comparison, ComparisonExport, ExportMeta};
pub use record::{ElementRecord, SystemId};
pub use shift::{shift_list, ShiftEntry};

#[cfg(feature = "parallel")]
pub use divergence::{AcceleratedHandle, ParallelBackend};
