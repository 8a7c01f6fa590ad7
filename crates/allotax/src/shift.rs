//! Word-shift projector.
//!
//! Lists every category with its signed divergence share, largest magnitude
//! first. The sign records the direction of rank movement: negative when the
//! category ranks higher (smaller rank number) in system 1.

use serde::{Deserialize, Serialize};

use crate::combine::CombinedPair;
use crate::diamond::DiamondBinResult;

/// One bar of the word-shift chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftEntry {
    /// `"<category> (<rank 1> ⇋ <rank 2>)"`.
    pub label: String,
    /// Rank in system 1 minus rank in system 2.
    pub rank_delta: f64,
    /// Divergence share, negated when `rank_delta < 0`.
    pub signed_metric: f64,
}

/// Builds the full shift list over the original (combined) order.
///
/// Shares are taken from `bins` and mapped back through its reorder
/// permutation, so the list does not depend on the binner's ordering. Ties
/// in magnitude keep the combined order.
///
/// # Examples
///
/// ```
/// use allotax::{combine, diamond_bin, divergence, shift_list, Alpha, ElementRecord};
///
/// let a = vec![ElementRecord::new("x", 10.0), ElementRecord::new("y", 5.0)];
/// let b = vec![ElementRecord::new("x", 4.0), ElementRecord::new("z", 8.0)];
/// let combined = combine(&a, &b).unwrap();
/// let bins = diamond_bin(&combined, &divergence(&combined, Alpha::Finite(1.0)));
/// let shifts = shift_list(&combined, &bins);
/// assert_eq!(shifts.len(), 3);
/// assert!(shifts[0].signed_metric.abs() >= shifts[2].signed_metric.abs());
/// ```
#[must_use]
pub fn shift_list(combined: &CombinedPair, bins: &DiamondBinResult) -> Vec<ShiftEntry> {
    let [left, right] = combined;

    let mut shares = vec![0.0; bins.order.len()];
    for (&original, &share) in bins.order.iter().zip(&bins.ordered_contributions) {
        shares[original] = share;
    }

    let mut entries: Vec<ShiftEntry> = left
        .categories
        .iter()
        .zip(left.ranks.iter().zip(&right.ranks))
        .zip(&shares)
        .map(|((category, (&r1, &r2)), &share)| {
            let rank_delta = r1 - r2;
            ShiftEntry {
                label: format!("{category} ({r1} ⇋ {r2})"),
                rank_delta,
                signed_metric: if rank_delta < 0.0 { -share } else { share },
            }
        })
        .collect();

    entries.sort_by(|a, b| b.signed_metric.abs().total_cmp(&a.signed_metric.abs()));
    entries
}

/// Largest `|signed_metric|` in `entries`, or 1 when there are none.
#[must_use]
pub fn max_shift(entries: &[ShiftEntry]) -> f64 {
    entries
        .iter()
        .map(|e| e.signed_metric.abs())
        .reduce(f64::max)
        .unwrap_or(1.0)
}
