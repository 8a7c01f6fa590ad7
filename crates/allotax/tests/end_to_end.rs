//! End-to-end tests of the comparison pipeline.
//!
//! Each test drives the public stage functions or the facade the way a
//! renderer would, then checks the outputs against hand-computed values and
//! the invariant checker.

use allotax::conformance::{check, Severity};
use allotax::{
    balance, combine, diamond_bin, divergence, shift_list, Allotaxonograph, Alpha, BackendMode,
    ComparisonConfig, ElementRecord, Error, Preset, SystemId,
};

fn recs(pairs: &[(&str, f64)]) -> Vec<ElementRecord> {
    pairs.iter().map(|&(c, n)| ElementRecord::new(c, n)).collect()
}

fn reference(alpha: Alpha) -> Allotaxonograph {
    Allotaxonograph::new(
        ComparisonConfig::default()
            .with_alpha(alpha)
            .with_backend(BackendMode::Reference),
    )
}

// =============================================================================
// Worked example
// =============================================================================

#[test]
fn worked_example_stage_by_stage() {
    let a = recs(&[("x", 10.0), ("y", 5.0)]);
    let b = recs(&[("x", 4.0), ("z", 8.0)]);

    let combined = combine(&a, &b).unwrap();
    assert_eq!(combined[0].categories, ["x", "y", "z"]);
    assert_eq!(combined[0].ranks, [1.0, 2.0, 3.0]);
    assert_eq!(combined[1].ranks, [2.0, 3.0, 1.0]);

    let rtd = divergence(&combined, Alpha::Finite(1.0));
    assert!(rtd.normalization > 0.0 && rtd.normalization.is_finite());

    // x: inverse ranks 1 and 1/2 → 2·sqrt(1/2).
    let expected_x = 2.0 * 0.5f64.sqrt();
    assert!((rtd.contributions[0] - expected_x).abs() < 1e-12);
    assert!((rtd.shares[0] - expected_x / rtd.normalization).abs() < 1e-12);

    let bins = diamond_bin(&combined, &rtd);
    assert_eq!(bins.grid.len(), bins.n_cells * bins.n_cells);
    assert!(bins
        .occupied()
        .any(|c| c.categories.iter().any(|t| t == "x")));

    let shifts = shift_list(&combined, &bins);
    assert_eq!(shifts.len(), 3);

    let bal = balance(&a, &b);
    assert_eq!(bal.len(), 6);
}

#[test]
fn worked_example_through_the_facade() {
    let a = recs(&[("x", 10.0), ("y", 5.0)]);
    let b = recs(&[("x", 4.0), ("z", 8.0)]);
    let cmp = reference(Alpha::Finite(1.0)).compare(&a, &b).unwrap();

    let report = check(&a, &b, &cmp);
    assert!(report.all_passed(), "{report:?}");
    assert_eq!(report.count(Severity::Warning), 0);

    let export = cmp.export();
    assert_eq!(export.meta.max_log10, 1);
    assert_eq!(export.meta.max_count_log, 1);
    assert_eq!(export.meta.titles, ["System 1", "System 2"]);
}

// =============================================================================
// Regimes
// =============================================================================

#[test]
fn every_preset_satisfies_the_invariants() {
    let a: Vec<ElementRecord> = (1..=200)
        .map(|i| ElementRecord::new(format!("w{i}"), (10_000 / i) as f64))
        .collect();
    let b: Vec<ElementRecord> = (50..=300)
        .map(|i| ElementRecord::new(format!("w{i}"), (9_000 / (301 - i)) as f64))
        .collect();

    for preset in [Preset::Standard, Preset::Sensitive, Preset::Robust] {
        let cmp = reference(preset.alpha()).compare(&a, &b).unwrap();
        let report = check(&a, &b, &cmp);
        assert!(report.all_passed(), "{preset}: {report:?}");
        assert_eq!(cmp.shifts.len(), 30);
        assert!(cmp.normalization() > 0.0);
    }
}

#[test]
fn alpha_zero_uses_log_rank_ratio() {
    let a = recs(&[("a", 100.0), ("b", 10.0), ("c", 1.0)]);
    let b = recs(&[("c", 100.0), ("b", 10.0), ("a", 1.0)]);
    let combined = combine(&a, &b).unwrap();
    let rtd = divergence(&combined, Alpha::Finite(0.0));
    // a: ranks 1 and 3.
    assert!((rtd.contributions[0] - 3f64.log10()).abs() < 1e-12);
    // b: rank 2 on both sides.
    assert_eq!(rtd.contributions[1], 0.0);
    assert!(rtd.normalization > 0.0);
}

#[test]
fn tiny_alpha_keeps_a_finite_positive_normalization() {
    let a = recs(&[("x", 10.0), ("y", 5.0)]);
    let b = recs(&[("x", 4.0), ("z", 8.0)]);
    let combined = combine(&a, &b).unwrap();
    for value in [1e-20, 1e-320] {
        let alpha = Alpha::new(value).unwrap();
        let rtd = divergence(&combined, alpha);
        assert!(
            rtd.normalization.is_finite() && rtd.normalization > 0.0,
            "alpha = {value}: {}",
            rtd.normalization
        );
        assert!(rtd.shares.iter().all(|s| s.is_finite() && *s > 0.0), "alpha = {value}");
        let cmp = reference(alpha).compare(&a, &b).unwrap();
        assert!(check(&a, &b, &cmp).all_passed(), "alpha = {value}");
    }
}

#[test]
fn shares_sum_to_contributions_over_normalization() {
    let a = recs(&[("a", 5.0), ("b", 3.0), ("c", 3.0), ("d", 1.0)]);
    let b = recs(&[("b", 6.0), ("d", 6.0), ("e", 2.0)]);
    let combined = combine(&a, &b).unwrap();
    for alpha in [0.1, 0.58, 1.0, 4.0] {
        let rtd = divergence(&combined, Alpha::Finite(alpha));
        let shares: f64 = rtd.shares.iter().map(|s| s.abs()).sum();
        let raw: f64 = rtd.contributions.iter().map(|d| d.abs()).sum();
        assert!(
            (shares - raw / rtd.normalization).abs() < 1e-12,
            "alpha = {alpha}"
        );
    }
}

// =============================================================================
// Degenerate and invalid input
// =============================================================================

#[test]
fn empty_systems_produce_empty_outputs() {
    let cmp = reference(Alpha::STANDARD).compare(&[], &[]).unwrap();
    assert!(cmp.combined[0].is_empty());
    assert!(cmp.divergence.is_empty());
    assert_eq!(cmp.diamond.grid.len(), 16 * 16);
    assert!(cmp.shifts.is_empty());
    assert_eq!(cmp.diamond.max_loss_contribution, None);
    assert!(cmp.balance.iter().all(|e| e.signed_share == 0.0));
}

#[test]
fn one_sided_comparison_is_well_defined() {
    let a = recs(&[("a", 3.0), ("b", 1.0)]);
    let cmp = reference(Alpha::Finite(0.58)).compare(&a, &[]).unwrap();
    assert_eq!(cmp.combined[1].counts, [0.0, 0.0]);
    assert_eq!(cmp.combined[1].ranks, [1.5, 1.5]);
    assert!(cmp.divergence.shares.iter().all(|s| s.is_finite()));

    let report = check(&a, &[], &cmp);
    assert!(report.all_passed(), "{report:?}");
}

#[test]
fn malformed_records_fail_before_anything_is_built() {
    let a = recs(&[("a", 1.0)]);
    let bad = vec![ElementRecord::new("b", 1.0).with_probability(1.5)];
    match reference(Alpha::STANDARD).compare(&a, &bad) {
        Err(Error::InvalidProbability {
            system, category, ..
        }) => {
            assert_eq!(system, SystemId::System2);
            assert_eq!(category, "b");
        }
        other => unreachable!("expected an invalid probability, got {other:?}"),
    }
}

#[test]
fn records_load_from_legacy_json() {
    let json = r#"[
        {"types": "covid", "counts": 120, "probs": 0.6, "totalunique": 4},
        {"types": "vaccine", "counts": 80, "probs": 0.4, "totalunique": 4}
    ]"#;
    let a: Vec<ElementRecord> = serde_json::from_str(json).unwrap();
    let b = recs(&[("vaccine", 10.0), ("mask", 5.0)]);
    let combined = combine(&a, &b).unwrap();
    assert_eq!(combined[0].universe_size, 4);
    assert_eq!(combined[1].universe_size, 3);
    assert_eq!(combined[0].probabilities, [0.6, 0.4, 0.0]);
}

#[test]
fn missing_count_is_a_deserialization_error() {
    let json = r#"[{"category": "a"}]"#;
    assert!(serde_json::from_str::<Vec<ElementRecord>>(json).is_err());
}

// =============================================================================
// Purity
// =============================================================================

#[test]
fn stages_do_not_mutate_their_inputs() {
    let a = recs(&[("a", 2.0), ("b", 9.0), ("c", 4.0)]);
    let b = recs(&[("c", 7.0), ("a", 1.0)]);
    let combined = combine(&a, &b).unwrap();
    let snapshot = combined.clone();

    let rtd = divergence(&combined, Alpha::Infinity);
    let bins = diamond_bin(&combined, &rtd);
    let first = shift_list(&combined, &bins);
    let second = shift_list(&combined, &diamond_bin(&combined, &rtd));

    assert_eq!(combined, snapshot);
    assert_eq!(first, second);
}
