//! Caller-supplied element records.
//!
//! One [`ElementRecord`] describes one category of one system. Records are
//! read-only to the pipeline; derived fields (probability, universe size)
//! are computed into new structures and never written back.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which side of the comparison a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemId {
    /// The first (left, "System 1") distribution.
    System1,
    /// The second (right, "System 2") distribution.
    System2,
}

impl SystemId {
    /// Zero-based index of the system inside a combined pair.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            SystemId::System1 => 0,
            SystemId::System2 => 1,
        }
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemId::System1 => f.write_str("system 1"),
            SystemId::System2 => f.write_str("system 2"),
        }
    }
}

/// One weighted category as supplied by a caller.
///
/// Field aliases accept the column names used by existing allotaxonometer
/// datasets (`types`, `counts`, `probs`, `totalunique`).
///
/// # Examples
///
/// ```
/// use allotax::ElementRecord;
///
/// let r: ElementRecord = serde_json::from_str(r#"{"types": "covid", "counts": 10}"#).unwrap();
/// assert_eq!(r.category, "covid");
/// assert_eq!(r.count, 10.0);
/// assert!(r.probability.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    /// Category label (word, name, species, ...).
    #[serde(alias = "types", alias = "type")]
    pub category: String,
    /// Non-negative weight of the category.
    #[serde(alias = "counts")]
    pub count: f64,
    /// Share of the system's total count; derived when absent.
    #[serde(default, alias = "probs", skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    /// Number of distinct categories in the compared universe; derived when absent.
    #[serde(default, alias = "totalunique", skip_serializing_if = "Option::is_none")]
    pub universe_size: Option<usize>,
}

impl ElementRecord {
    /// Creates a record with only a category and a count.
    #[must_use]
    pub fn new(category: impl Into<String>, count: f64) -> Self {
        Self {
            category: category.into(),
            count,
            probability: None,
            universe_size: None,
        }
    }

    /// Sets an explicit probability.
    #[must_use]
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }

    /// Sets an explicit universe size.
    #[must_use]
    pub fn with_universe_size(mut self, universe_size: usize) -> Self {
        self.universe_size = Some(universe_size);
        self
    }
}

/// Validates every record of one system.
///
/// # Errors
///
/// Returns the first malformed record found: empty category, negative or
/// non-finite count, probability outside `[0, 1]`, or a zero universe size.
pub fn validate(system: SystemId, records: &[ElementRecord]) -> Result<()> {
    for (index, record) in records.iter().enumerate() {
        if record.category.is_empty() {
            return Err(Error::EmptyCategory { system, index });
        }
        if !record.count.is_finite() {
            return Err(Error::NonFiniteCount {
                system,
                category: record.category.clone(),
            });
        }
        if record.count < 0.0 {
            return Err(Error::NegativeCount {
                system,
                category: record.category.clone(),
                count: record.count,
            });
        }
        if let Some(p) = record.probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::InvalidProbability {
                    system,
                    category: record.category.clone(),
                    probability: p,
                });
            }
        }
        if record.universe_size == Some(0) {
            return Err(Error::InvalidUniverseSize {
                system,
                category: record.category.clone(),
            });
        }
    }
    Ok(())
}
