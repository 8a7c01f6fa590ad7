//! Error types for the comparison pipeline.
//!
//! Only input validation and configuration parsing can fail. Everything past
//! the [`combine`](crate::combine::combine) boundary is total over validated
//! input, and accelerated-backend failures are recovered inside the
//! divergence engine rather than reported here.

use thiserror::Error;

use crate::record::SystemId;

/// Errors surfaced to callers of the pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A record carried a negative count.
    #[error("{system}: category `{category}` has negative count {count}")]
    NegativeCount {
        /// System the record belongs to.
        system: SystemId,
        /// Offending category.
        category: String,
        /// The rejected count.
        count: f64,
    },

    /// A record carried a NaN or infinite count.
    #[error("{system}: category `{category}` has a non-finite count")]
    NonFiniteCount {
        /// System the record belongs to.
        system: SystemId,
        /// Offending category.
        category: String,
    },

    /// A supplied probability was outside `[0, 1]` or not finite.
    #[error("{system}: category `{category}` has probability {probability} outside [0, 1]")]
    InvalidProbability {
        /// System the record belongs to.
        system: SystemId,
        /// Offending category.
        category: String,
        /// The rejected probability.
        probability: f64,
    },

    /// A supplied universe size was zero.
    #[error("{system}: category `{category}` declares a universe size of zero")]
    InvalidUniverseSize {
        /// System the record belongs to.
        system: SystemId,
        /// Offending category.
        category: String,
    },

    /// A record had an empty category label.
    #[error("{system}: record {index} has an empty category")]
    EmptyCategory {
        /// System the record belongs to.
        system: SystemId,
        /// Position of the record in its system.
        index: usize,
    },

    /// The divergence exponent could not be parsed or was out of range.
    #[error("invalid alpha: {0}")]
    InvalidAlpha(String),

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
