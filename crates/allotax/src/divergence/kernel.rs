//! Rank-turbulence formulas shared by every backend.
//!
//! Backends differ only in how they schedule the element-wise work; the
//! arithmetic lives here so that each backend evaluates the same expressions
//! in the same order. Sums are always taken sequentially in index order.

use crate::alpha::{Alpha, Regime};

/// Inverse ranks `1 / rank`.
#[inline]
pub fn inverse_rank(rank: f64) -> f64 {
    1.0 / rank
}

/// Divergence contribution of one category from its two inverse ranks.
///
/// - `∞`: `0` when equal, else the larger inverse rank.
/// - `0`: `log10(max(rank) / min(rank))`.
/// - general: `(α+1)/α · |x^α − y^α|^(1/(α+1))`.
#[inline]
pub fn element(x: f64, y: f64, alpha: Alpha) -> f64 {
    match alpha.regime() {
        Regime::Infinite => {
            if x == y {
                0.0
            } else {
                x.max(y)
            }
        }
        Regime::Zero => {
            let hi = (1.0 / x).max(1.0 / y);
            let lo = (1.0 / x).min(1.0 / y);
            (hi / lo).log10()
        }
        Regime::General => powered(x, y, alpha.value()),
    }
}

/// `(α+1)/α · |x^α − y^α|^(1/(α+1))` for finite `α > 0`.
///
/// Rewritten as `(α+1) · α^(−α/(α+1)) · q^(1/(α+1))` with
/// `q = |x^α − y^α| / α`, where each `(v^α − 1)/α` is taken through
/// `exp_m1`. This stays finite and nonzero for exponents so small that
/// `(α+1)/α` overflows or `x^α − y^α` rounds to zero.
#[inline]
pub fn powered(x: f64, y: f64, a: f64) -> f64 {
    let q = (scaled_power(x, a) - scaled_power(y, a)).abs();
    let exponent = 1.0 / (a + 1.0);
    (a + 1.0) * (-a * exponent * a.ln()).exp() * q.powf(exponent)
}

/// `(v^α − 1) / α`, which tends to `ln v` as `α → 0`.
#[inline]
fn scaled_power(v: f64, a: f64) -> f64 {
    let ln = v.ln();
    let u = a * ln;
    if u == 0.0 {
        ln
    } else {
        ln * (u.exp_m1() / u)
    }
}

/// Placeholder inverse rank for a category present on one side only.
///
/// `n_present` counts categories with a nonzero count on the side being
/// normalized, `n_other` those on the opposite side.
#[inline]
pub fn disjoint(n_present: f64, n_other: f64) -> f64 {
    1.0 / (n_other + n_present / 2.0)
}

/// Normalization constant over the categories present on each side.
///
/// Each present category is compared against the disjoint placeholder of
/// the opposite side, as if the two systems shared no categories at all.
pub fn normalization(
    counts1: &[f64],
    counts2: &[f64],
    inv_r1: &[f64],
    inv_r2: &[f64],
    alpha: Alpha,
) -> f64 {
    let present1 = || present(counts1, inv_r1);
    let present2 = || present(counts2, inv_r2);

    let n1 = present1().count() as f64;
    let n2 = present2().count() as f64;

    let inv_r1_disjoint = disjoint(n1, n2);
    let inv_r2_disjoint = disjoint(n2, n1);

    match alpha.regime() {
        Regime::Infinite => present1().sum::<f64>() + present2().sum::<f64>(),
        Regime::Zero => {
            let term1: f64 = present1().map(|r| (r / inv_r2_disjoint).ln().abs()).sum();
            let term2: f64 = present2().map(|r| (r / inv_r1_disjoint).ln().abs()).sum();
            term1 + term2
        }
        Regime::General => {
            let a = alpha.value();
            let term1: f64 = present1().map(|r| powered(r, inv_r2_disjoint, a)).sum();
            let term2: f64 = present2().map(|r| powered(inv_r1_disjoint, r, a)).sum();
            term1 + term2
        }
    }
}

/// Divides a contribution by the normalization; a zero normalization
/// (nothing present on either side) yields a zero share.
#[inline]
pub fn share(contribution: f64, normalization: f64) -> f64 {
    if normalization == 0.0 {
        0.0
    } else {
        contribution / normalization
    }
}

/// Inverse ranks of the categories with a nonzero count.
fn present<'a>(counts: &'a [f64], inv: &'a [f64]) -> impl Iterator<Item = f64> + 'a {
    counts
        .iter()
        .zip(inv)
        .filter(|(c, _)| **c > 0.0)
        .map(|(_, r)| *r)
}
