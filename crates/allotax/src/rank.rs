//! Tied ranking.
//!
//! Rank 1 goes to the largest weight. Positions sharing a weight all receive
//! the mean of the integer ranks the group occupies, so a three-way tie over
//! ranks {4, 5, 6} yields 5 for each member.
//!
//! Real count tables are dominated by ties (every category absent from one
//! side has count zero), so positions are grouped first and only the
//! *distinct* weights are sorted.

use std::collections::HashMap;

/// Assigns tie-averaged descending ranks to `weights`.
///
/// The output has one rank per input position, in input order.
///
/// # Examples
///
/// ```
/// use allotax::rank::tied_rank;
///
/// assert_eq!(tied_rank(&[5.0, 4.0, 4.0, 2.0, 1.0]), vec![1.0, 2.5, 2.5, 4.0, 5.0]);
/// assert_eq!(tied_rank(&[]), Vec::<f64>::new());
/// assert_eq!(tied_rank(&[7.0]), vec![1.0]);
/// ```
#[must_use]
pub fn tied_rank(weights: &[f64]) -> Vec<f64> {
    if weights.is_empty() {
        return Vec::new();
    }

    let mut groups: HashMap<u64, Vec<usize>> = HashMap::new();
    for (i, &w) in weights.iter().enumerate() {
        groups.entry(weight_key(w)).or_default().push(i);
    }

    let mut distinct: Vec<u64> = groups.keys().copied().collect();
    distinct.sort_unstable_by(|a, b| f64::from_bits(*b).total_cmp(&f64::from_bits(*a)));

    let mut ranks = vec![0.0; weights.len()];
    let mut next_rank = 1usize;
    for key in distinct {
        let members = &groups[&key];
        let ties = members.len();
        let mean = next_rank as f64 + (ties as f64 - 1.0) / 2.0;
        for &i in members {
            ranks[i] = mean;
        }
        next_rank += ties;
    }
    ranks
}

/// Bit pattern used to group equal weights; folds `-0.0` into `0.0`.
#[inline]
fn weight_key(w: f64) -> u64 {
    (w + 0.0).to_bits()
}
