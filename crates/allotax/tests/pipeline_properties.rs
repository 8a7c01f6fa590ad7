//! Property-based tests for the comparison pipeline.
//!
//! Inputs are small random systems drawn from a shared label pool, so that
//! overlaps, exclusive categories, zero counts and ties all occur often.

use std::collections::HashSet;

use allotax::diamond::{cell_count, max_log10_rank};
use allotax::rank::tied_rank;
use allotax::{
    balance, combine, diamond_bin, divergence, shift_list, Allotaxonograph, Alpha, BackendMode,
    ComparisonConfig, ElementRecord,
};
use proptest::prelude::*;

/// A system of up to `max` records over labels `c0..c39`, one record per
/// label, counts from a narrow range to force ties.
fn system(max: usize) -> impl Strategy<Value = Vec<ElementRecord>> {
    prop::collection::btree_map(0u8..40, 0u32..12, 0..max).prop_map(|m| {
        m.into_iter()
            .map(|(label, count)| ElementRecord::new(format!("c{label}"), f64::from(count)))
            .collect()
    })
}

fn alpha() -> impl Strategy<Value = Alpha> {
    prop_oneof![
        Just(Alpha::Finite(0.0)),
        Just(Alpha::Infinity),
        (0.01f64..8.0).prop_map(Alpha::Finite),
        // Small enough that (α+1)/α overflows or x^α − y^α cancels.
        (-323.0f64..-2.0).prop_map(|e| Alpha::Finite(10f64.powf(e))),
    ]
}

// =============================================================================
// Ranking
// =============================================================================

proptest! {
    /// Ranks of n positions always sum to n(n+1)/2 and lie in [1, n].
    #[test]
    fn prop_tied_rank_sum(weights in prop::collection::vec(0u32..6, 0..60)) {
        let weights: Vec<f64> = weights.into_iter().map(f64::from).collect();
        let ranks = tied_rank(&weights);
        let n = weights.len() as f64;
        prop_assert_eq!(ranks.len(), weights.len());
        prop_assert_eq!(ranks.iter().sum::<f64>(), n * (n + 1.0) / 2.0);
        prop_assert!(ranks.iter().all(|&r| (1.0..=n).contains(&r)));
    }

    /// Heavier weights never rank below lighter ones; equal weights share a rank.
    #[test]
    fn prop_tied_rank_monotone(weights in prop::collection::vec(0u32..6, 0..60)) {
        let weights: Vec<f64> = weights.into_iter().map(f64::from).collect();
        let ranks = tied_rank(&weights);
        for i in 0..weights.len() {
            for j in 0..weights.len() {
                if weights[i] > weights[j] {
                    prop_assert!(ranks[i] < ranks[j]);
                } else if weights[i] == weights[j] {
                    prop_assert_eq!(ranks[i], ranks[j]);
                }
            }
        }
    }
}

// =============================================================================
// Union
// =============================================================================

proptest! {
    /// Both sides share one order whose set is exactly the raw union.
    #[test]
    fn prop_union_complete(a in system(25), b in system(25)) {
        let [left, right] = combine(&a, &b).unwrap();
        prop_assert_eq!(&left.categories, &right.categories);

        let raw: HashSet<&str> = a.iter().chain(&b).map(|r| r.category.as_str()).collect();
        let union: HashSet<&str> = left.categories.iter().map(String::as_str).collect();
        prop_assert_eq!(union.len(), left.len());
        prop_assert_eq!(raw, union);
        prop_assert_eq!(left.universe_size, left.len());
    }

    /// Absent categories carry a zero count on the side that lacks them.
    #[test]
    fn prop_union_zero_fill(a in system(25), b in system(25)) {
        let [left, right] = combine(&a, &b).unwrap();
        let in_a: HashSet<&str> = a.iter().map(|r| r.category.as_str()).collect();
        for (i, category) in left.categories.iter().enumerate() {
            if !in_a.contains(category.as_str()) {
                prop_assert_eq!(left.counts[i], 0.0);
                prop_assert_eq!(left.probabilities[i], 0.0);
            }
        }
        prop_assert_eq!(left.counts.len(), right.counts.len());
    }
}

// =============================================================================
// Divergence and grid
// =============================================================================

proptest! {
    /// Shares are contributions over the normalization, which is finite and
    /// positive whenever both sides have a nonzero count.
    #[test]
    fn prop_normalization_invariant(a in system(25), b in system(25), alpha in alpha()) {
        let combined = combine(&a, &b).unwrap();
        let rtd = divergence(&combined, alpha);
        prop_assert_eq!(rtd.len(), combined[0].len());

        let live = |s: &allotax::CombinedSystem| s.counts.iter().any(|&c| c > 0.0);
        if live(&combined[0]) && live(&combined[1]) {
            prop_assert!(rtd.normalization.is_finite() && rtd.normalization > 0.0);
            for (d, s) in rtd.contributions.iter().zip(&rtd.shares) {
                prop_assert_eq!(*s, d / rtd.normalization);
            }
        }
        prop_assert!(rtd.shares.iter().all(|s| s.is_finite()));
    }

    /// The grid always has n_cells² cells and bins every category once.
    #[test]
    fn prop_grid_complete(a in system(40), b in system(40), alpha in alpha()) {
        let combined = combine(&a, &b).unwrap();
        let bins = diamond_bin(&combined, &divergence(&combined, alpha));
        let n = cell_count(max_log10_rank(&combined).unwrap_or(1.0));
        prop_assert_eq!(bins.n_cells, n);
        prop_assert_eq!(bins.grid.len(), n * n);
        prop_assert_eq!(bins.grid.iter().map(|c| c.count).sum::<usize>(), combined[0].len());

        let mut order = bins.order.clone();
        order.sort_unstable();
        prop_assert_eq!(order, (0..combined[0].len()).collect::<Vec<_>>());
    }

    /// Shift magnitudes are the divergence shares, sorted descending.
    #[test]
    fn prop_shift_sorted(a in system(25), b in system(25), alpha in alpha()) {
        let combined = combine(&a, &b).unwrap();
        let rtd = divergence(&combined, alpha);
        let shifts = shift_list(&combined, &diamond_bin(&combined, &rtd));
        prop_assert_eq!(shifts.len(), combined[0].len());
        prop_assert!(shifts
            .windows(2)
            .all(|w| w[0].signed_metric.abs() >= w[1].signed_metric.abs()));

        let mut magnitudes: Vec<f64> = shifts.iter().map(|e| e.signed_metric.abs()).collect();
        let mut shares = rtd.shares.clone();
        magnitudes.sort_by(f64::total_cmp);
        shares.sort_by(f64::total_cmp);
        prop_assert_eq!(magnitudes, shares);
    }

    /// Balance shares are bounded and signed by system.
    #[test]
    fn prop_balance_bounded(a in system(25), b in system(25)) {
        let entries = balance(&a, &b);
        prop_assert_eq!(entries.len(), 6);
        for (i, e) in entries.iter().enumerate() {
            prop_assert!((-1.0..=1.0).contains(&e.signed_share));
            prop_assert_eq!(e.signed_share.is_sign_negative(), i % 2 == 1);
        }
    }
}

// =============================================================================
// Idempotence
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Two runs with identical inputs are bit-identical.
    #[test]
    fn prop_pipeline_idempotent(a in system(30), b in system(30), alpha in alpha()) {
        let facade = Allotaxonograph::new(
            ComparisonConfig::default()
                .with_alpha(alpha)
                .with_backend(BackendMode::Reference),
        );
        let first = facade.compare(&a, &b).unwrap();
        let second = facade.compare(&a, &b).unwrap();
        prop_assert_eq!(first, second);
    }
}
