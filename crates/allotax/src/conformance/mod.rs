//! Invariant checker.
//!
//! Re-verifies the pipeline's guarantees on an actual [`Comparison`] and
//! reports each one as a [`TestResult`]. Nothing here panics on a broken
//! invariant; it is reported instead.
//!
//! | Validator | Property |
//! |-----------|----------|
//! | `pipeline/union` | both sides share one category order equal to the raw union |
//! | `pipeline/ranks` | ranks lie in `[1, n]` and sum to `n(n+1)/2` |
//! | `pipeline/probabilities` | probabilities lie in `[0, 1]`; derived ones sum to 1 |
//! | `pipeline/normalization` | normalization finite and positive |
//! | `pipeline/shares` | shares equal contributions over the normalization |
//! | `pipeline/grid` | `n_cells²` cells, every category binned once |
//! | `pipeline/reorder` | reorder is a permutation in descending share order |
//! | `pipeline/shift` | shift list sorted by descending magnitude |
//! | `pipeline/balance` | six entries with shares in `[-1, 1]` |
//! | `backend/equivalence` | accelerated and reference results agree |
//!
//! # Examples
//!
//! ```
//! use allotax::conformance::check;
//! use allotax::{Allotaxonograph, ElementRecord};
//!
//! let a = vec![ElementRecord::new("x", 10.0), ElementRecord::new("y", 5.0)];
//! let b = vec![ElementRecord::new("x", 4.0), ElementRecord::new("z", 8.0)];
//! let cmp = Allotaxonograph::default().compare(&a, &b).unwrap();
//! assert!(check(&a, &b, &cmp).all_passed());
//! ```

pub mod report;

use std::collections::HashSet;

use crate::alpha::Alpha;
use crate::combine::{CombinedPair, CombinedSystem};
use crate::diamond::{cell_count, max_log10_rank};
use crate::divergence::{BackendError, DivergenceEngine, DivergenceResult};
use crate::pipeline::Comparison;
use crate::record::{ElementRecord, SystemId};

pub use report::{ConformanceReport, Severity, TestResult};

/// Relative tolerance for backend and share comparisons.
pub const RELATIVE_TOLERANCE: f64 = 1e-6;

/// Absolute tolerance for sums expected to be exact up to rounding.
const SUM_TOLERANCE: f64 = 1e-9;

/// Runs every pipeline check on `comparison`, which must have been computed
/// from `system1` and `system2`.
#[must_use]
pub fn check(
    system1: &[ElementRecord],
    system2: &[ElementRecord],
    comparison: &Comparison,
) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    let combined = &comparison.combined;

    validate_union(&mut report, system1, system2, combined);
    for system in [SystemId::System1, SystemId::System2] {
        let raw = match system {
            SystemId::System1 => system1,
            SystemId::System2 => system2,
        };
        let side = &combined[system.index()];
        validate_ranks(&mut report, system, side);
        validate_probabilities(&mut report, system, raw, side);
    }
    validate_normalization(&mut report, combined, &comparison.divergence);
    validate_shares(&mut report, &comparison.divergence);
    validate_grid(&mut report, comparison);
    validate_reorder(&mut report, comparison);
    validate_shift(&mut report, comparison);
    validate_balance(&mut report, comparison);

    report
}

/// Compares the engine's accelerated result against its reference result.
///
/// Warns when there is no accelerated backend or it is not ready yet; fails
/// when it errors or disagrees beyond [`RELATIVE_TOLERANCE`].
#[must_use]
pub fn check_backend_equivalence(
    engine: &DivergenceEngine,
    combined: &CombinedPair,
    alpha: Alpha,
) -> TestResult {
    const NAME: &str = "backend/equivalence";

    let accelerated = match engine.compute_accelerated(combined, alpha) {
        None => return TestResult::warn(NAME, "no accelerated backend configured"),
        Some(Err(BackendError::NotReady)) => {
            return TestResult::warn(NAME, "accelerated backend not ready, skipped")
        }
        Some(Err(err)) => {
            return TestResult::fail(NAME, format!("accelerated backend failed: {err}"))
        }
        Some(Ok(result)) => result,
    };
    let reference = engine.compute_reference(combined, alpha);

    let mut details = Vec::new();
    for (i, (a, r)) in accelerated
        .contributions
        .iter()
        .zip(&reference.contributions)
        .enumerate()
    {
        if !close(*a, *r) {
            details.push(format!(
                "{}: accelerated {a} vs reference {r}",
                combined[0].categories[i]
            ));
        }
    }
    if !close(accelerated.normalization, reference.normalization) {
        details.push(format!(
            "normalization: accelerated {} vs reference {}",
            accelerated.normalization, reference.normalization
        ));
    }
    TestResult::from_details(
        NAME,
        format!(
            "{} contributions agree within {RELATIVE_TOLERANCE} (alpha = {alpha})",
            reference.len()
        ),
        format!("{} value(s) disagree (alpha = {alpha})", details.len()),
        details,
    )
}

/// `a` and `b` agree within [`RELATIVE_TOLERANCE`] of the larger magnitude.
fn close(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= RELATIVE_TOLERANCE * a.abs().max(b.abs())
}

fn validate_union(
    report: &mut ConformanceReport,
    system1: &[ElementRecord],
    system2: &[ElementRecord],
    combined: &CombinedPair,
) {
    const NAME: &str = "pipeline/union";
    let [left, right] = combined;

    if left.categories != right.categories {
        report.push(TestResult::fail(
            NAME,
            "the two combined systems disagree on category order",
        ));
        return;
    }

    let raw: HashSet<&str> = system1
        .iter()
        .chain(system2)
        .map(|r| r.category.as_str())
        .collect();
    let combined_set: HashSet<&str> = left.categories.iter().map(String::as_str).collect();

    let mut details = Vec::new();
    if combined_set.len() != left.len() {
        details.push("combined categories contain duplicates".to_owned());
    }
    details.extend(
        raw.difference(&combined_set)
            .map(|c| format!("`{c}` missing from the union")),
    );
    details.extend(
        combined_set
            .difference(&raw)
            .map(|c| format!("`{c}` is not in either input")),
    );
    for side in combined {
        for (what, len) in [
            ("counts", side.counts.len()),
            ("probabilities", side.probabilities.len()),
            ("ranks", side.ranks.len()),
        ] {
            if len != side.len() {
                details.push(format!("{what} has {len} entries for {} categories", side.len()));
            }
        }
    }

    report.push(TestResult::from_details(
        NAME,
        format!("{} categories, identical on both sides", left.len()),
        "union is incomplete or misaligned",
        details,
    ));
}

fn validate_ranks(report: &mut ConformanceReport, system: SystemId, side: &CombinedSystem) {
    let name = format!("pipeline/ranks ({system})");
    let n = side.len() as f64;
    let sum: f64 = side.ranks.iter().sum();
    let expected = n * (n + 1.0) / 2.0;

    let mut details: Vec<String> = side
        .ranks
        .iter()
        .zip(&side.categories)
        .filter(|(r, _)| !(1.0..=n).contains(*r))
        .map(|(r, c)| format!("`{c}` has rank {r} outside [1, {n}]"))
        .collect();
    if (sum - expected).abs() > SUM_TOLERANCE * expected.max(1.0) {
        details.push(format!("ranks sum to {sum}, expected {expected}"));
    }

    report.push(TestResult::from_details(
        name,
        "tie-averaged ranks are consistent",
        "tie-averaged ranks are inconsistent",
        details,
    ));
}

fn validate_probabilities(
    report: &mut ConformanceReport,
    system: SystemId,
    raw: &[ElementRecord],
    side: &CombinedSystem,
) {
    let name = format!("pipeline/probabilities ({system})");

    let out_of_range: Vec<String> = side
        .probabilities
        .iter()
        .zip(&side.categories)
        .filter(|(p, _)| !(0.0..=1.0).contains(*p))
        .map(|(p, c)| format!("`{c}` has probability {p}"))
        .collect();
    if !out_of_range.is_empty() {
        report.push(TestResult::fail_with_details(
            name,
            "probabilities outside [0, 1]",
            out_of_range,
        ));
        return;
    }

    let derived = raw.iter().all(|r| r.probability.is_none());
    let total: f64 = raw.iter().map(|r| r.count).sum();
    if !derived || total == 0.0 {
        report.push(TestResult::pass(name, "probabilities lie in [0, 1]"));
        return;
    }

    let sum: f64 = side.probabilities.iter().sum();
    if (sum - 1.0).abs() <= SUM_TOLERANCE {
        report.push(TestResult::pass(name, "derived probabilities sum to 1"));
    } else {
        report.push(TestResult::warn(
            name,
            format!("derived probabilities sum to {sum}; duplicate categories in the input?"),
        ));
    }
}

fn validate_normalization(
    report: &mut ConformanceReport,
    combined: &CombinedPair,
    divergence: &DivergenceResult,
) {
    const NAME: &str = "pipeline/normalization";
    let n = divergence.normalization;
    let present = |side: &CombinedSystem| side.counts.iter().any(|&c| c > 0.0);

    if n.is_finite() && n > 0.0 {
        report.push(TestResult::pass(NAME, format!("normalization = {n}")));
    } else if n == 0.0 && !combined.iter().all(present) {
        report.push(TestResult::warn(
            NAME,
            "normalization is 0: a system has no nonzero count, all shares are 0",
        ));
    } else {
        report.push(TestResult::fail(
            NAME,
            format!("normalization = {n}, expected finite and positive"),
        ));
    }
}

fn validate_shares(report: &mut ConformanceReport, divergence: &DivergenceResult) {
    const NAME: &str = "pipeline/shares";
    let n = divergence.normalization;
    if n == 0.0 || !n.is_finite() {
        let all_zero = divergence.shares.iter().all(|&s| s == 0.0);
        report.push(if all_zero {
            TestResult::pass(NAME, "degenerate normalization, all shares are 0")
        } else {
            TestResult::fail(NAME, "degenerate normalization with nonzero shares")
        });
        return;
    }

    let details: Vec<String> = divergence
        .contributions
        .iter()
        .zip(&divergence.shares)
        .enumerate()
        .filter(|(_, (d, s))| !close(**s, **d / n))
        .map(|(i, (d, s))| format!("element {i}: share {s}, contribution {d}"))
        .collect();
    report.push(TestResult::from_details(
        NAME,
        format!("shares total {}", divergence.total()),
        "shares do not match contributions over the normalization",
        details,
    ));
}

fn validate_grid(report: &mut ConformanceReport, comparison: &Comparison) {
    const NAME: &str = "pipeline/grid";
    let diamond = &comparison.diamond;
    let expected_cells = cell_count(max_log10_rank(&comparison.combined).unwrap_or(1.0));

    let mut details = Vec::new();
    if diamond.n_cells != expected_cells {
        details.push(format!(
            "grid side is {}, expected {expected_cells}",
            diamond.n_cells
        ));
    }
    if diamond.grid.len() != diamond.n_cells * diamond.n_cells {
        details.push(format!(
            "{} cells for a side of {}",
            diamond.grid.len(),
            diamond.n_cells
        ));
    }
    let binned: usize = diamond.grid.iter().map(|c| c.count).sum();
    if binned != comparison.combined[0].len() {
        details.push(format!(
            "{binned} categories binned out of {}",
            comparison.combined[0].len()
        ));
    }
    report.push(TestResult::from_details(
        NAME,
        format!(
            "{0} × {0} grid, {1} occupied cells",
            diamond.n_cells,
            diamond.occupied().count()
        ),
        "diamond grid is incomplete",
        details,
    ));
}

fn validate_reorder(report: &mut ConformanceReport, comparison: &Comparison) {
    const NAME: &str = "pipeline/reorder";
    let diamond = &comparison.diamond;
    let n = comparison.combined[0].len();

    let mut seen = vec![false; n];
    let is_permutation = diamond.order.len() == n
        && diamond
            .order
            .iter()
            .all(|&i| i < n && !std::mem::replace(&mut seen[i], true));

    let mut details = Vec::new();
    if !is_permutation {
        details.push("order is not a permutation of the combined indices".to_owned());
    }
    if diamond
        .ordered_contributions
        .windows(2)
        .any(|w| w[0] < w[1])
    {
        details.push("ordered contributions are not descending".to_owned());
    }
    report.push(TestResult::from_details(
        NAME,
        "reorder is a descending permutation",
        "reorder is broken",
        details,
    ));
}

fn validate_shift(report: &mut ConformanceReport, comparison: &Comparison) {
    const NAME: &str = "pipeline/shift";
    let shifts = &comparison.shifts;

    let mut details = Vec::new();
    if shifts.len() > comparison.combined[0].len() {
        details.push(format!(
            "{} entries for {} categories",
            shifts.len(),
            comparison.combined[0].len()
        ));
    }
    if shifts
        .windows(2)
        .any(|w| w[0].signed_metric.abs() < w[1].signed_metric.abs())
    {
        details.push("entries are not sorted by descending magnitude".to_owned());
    }
    details.extend(
        shifts
            .iter()
            .filter(|e| (e.rank_delta < 0.0) != (e.signed_metric < 0.0) && e.signed_metric != 0.0)
            .map(|e| format!("`{}` has a sign that contradicts its rank change", e.label)),
    );
    report.push(TestResult::from_details(
        NAME,
        format!("{} entries in descending magnitude", shifts.len()),
        "shift list is malformed",
        details,
    ));
}

fn validate_balance(report: &mut ConformanceReport, comparison: &Comparison) {
    const NAME: &str = "pipeline/balance";
    let balance = &comparison.balance;

    if balance.len() != 6 {
        report.push(TestResult::fail(
            NAME,
            format!("{} entries, expected 6", balance.len()),
        ));
        return;
    }
    let details: Vec<String> = balance
        .iter()
        .enumerate()
        .filter_map(|(i, e)| {
            let expected = if i % 2 == 0 {
                SystemId::System2
            } else {
                SystemId::System1
            };
            if !(-1.0..=1.0).contains(&e.signed_share) {
                Some(format!("{}: share {} outside [-1, 1]", e.axis.label(), e.signed_share))
            } else if e.system() != expected {
                Some(format!("{}: entry {i} should describe {expected}", e.axis.label()))
            } else {
                None
            }
        })
        .collect();
    report.push(TestResult::from_details(
        NAME,
        "six signed shares within [-1, 1]",
        "balance entries are malformed",
        details,
    ));
}
