//! Union combiner.
//!
//! Aligns the two systems onto one shared category universe. The universe is
//! built once, in first-seen order across system 1 then system 2; a category
//! missing from one side is kept with a zero count on that side (and therefore
//! a bottom, tied rank), never dropped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rank::tied_rank;
use crate::record::{self, ElementRecord, SystemId};

/// One system projected onto the shared universe.
///
/// All sequences are parallel and indexed by union position. The two members
/// of a [`CombinedPair`] always carry identical `categories`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedSystem {
    /// Shared category labels in union discovery order.
    pub categories: Vec<String>,
    /// Counts, zero where the category is absent from this system.
    pub counts: Vec<f64>,
    /// Probabilities, zero where the category is absent from this system.
    pub probabilities: Vec<f64>,
    /// Tie-averaged descending ranks over `counts`.
    pub ranks: Vec<f64>,
    /// Size of the compared universe.
    pub universe_size: usize,
}

impl CombinedSystem {
    /// Number of shared categories.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// True when the shared universe is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Largest rank on this side, or `None` for an empty universe.
    #[must_use]
    pub fn max_rank(&self) -> Option<f64> {
        self.ranks.iter().copied().reduce(f64::max)
    }
}

/// The two combined systems, indexed by [`SystemId::index`].
pub type CombinedPair = [CombinedSystem; 2];

#[derive(Clone, Copy, Default)]
struct Slot {
    count: [f64; 2],
    probability: [f64; 2],
}

/// Combines two raw systems into a pair over their category union.
///
/// Probabilities omitted by a record are derived as the record's count over
/// the total count of its *own* system. Universe size is the union size
/// unless the system's records declare one, in which case the largest
/// declared value is kept. When a category repeats inside one system the
/// last record wins.
///
/// # Errors
///
/// Returns a validation error if any record is malformed; see
/// [`record::validate`]. Nothing is built in that case.
///
/// # Examples
///
/// ```
/// use allotax::{combine, ElementRecord};
///
/// let a = vec![ElementRecord::new("x", 10.0), ElementRecord::new("y", 5.0)];
/// let b = vec![ElementRecord::new("x", 4.0), ElementRecord::new("z", 8.0)];
/// let [left, right] = combine(&a, &b).unwrap();
/// assert_eq!(left.categories, ["x", "y", "z"]);
/// assert_eq!(left.ranks, [1.0, 2.0, 3.0]);
/// assert_eq!(right.counts, [4.0, 0.0, 8.0]);
/// ```
pub fn combine(system1: &[ElementRecord], system2: &[ElementRecord]) -> Result<CombinedPair> {
    record::validate(SystemId::System1, system1)?;
    record::validate(SystemId::System2, system2)?;

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(system1.len() + system2.len());
    let mut categories: Vec<String> = Vec::with_capacity(system1.len() + system2.len());
    let mut slots: Vec<Slot> = Vec::with_capacity(system1.len() + system2.len());

    for (side, records) in [system1, system2].into_iter().enumerate() {
        let total: f64 = records.iter().map(|r| r.count).sum();
        for r in records {
            let i = *index.entry(r.category.as_str()).or_insert_with(|| {
                categories.push(r.category.clone());
                slots.push(Slot::default());
                slots.len() - 1
            });
            slots[i].count[side] = r.count;
            slots[i].probability[side] = r.probability.unwrap_or_else(|| derive_probability(r.count, total));
        }
    }

    let union_size = categories.len();
    let side = |s: usize, records: &[ElementRecord]| {
        let counts: Vec<f64> = slots.iter().map(|slot| slot.count[s]).collect();
        let probabilities = slots.iter().map(|slot| slot.probability[s]).collect();
        let ranks = tied_rank(&counts);
        let universe_size = records
            .iter()
            .filter_map(|r| r.universe_size)
            .max()
            .unwrap_or(union_size);
        CombinedSystem {
            categories: categories.clone(),
            counts,
            probabilities,
            ranks,
            universe_size,
        }
    };

    Ok([side(0, system1), side(1, system2)])
}

#[inline]
fn derive_probability(count: f64, total: f64) -> f64 {
    if total > 0.0 {
        count / total
    } else {
        0.0
    }
}
