//! Balance projector.
//!
//! A coarse three-axis comparison of the raw inputs, independent of ranks
//! and divergence. Each axis yields two entries: system 2's share (positive)
//! and system 1's share (negative).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::record::{ElementRecord, SystemId};

/// Quantity compared by a [`BalanceEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceAxis {
    /// Records in one system over records in both.
    TotalCount,
    /// Records in one system over distinct categories in the union.
    AllTypes,
    /// Categories only this system has, over its own records.
    ExclusiveTypes,
}

impl BalanceAxis {
    /// Display label used by the balance chart.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            BalanceAxis::TotalCount => "total count",
            BalanceAxis::AllTypes => "all types",
            BalanceAxis::ExclusiveTypes => "exclusive types",
        }
    }
}

/// One bar of the balance chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceEntry {
    /// Quantity compared.
    pub axis: BalanceAxis,
    /// Share, rounded to 3 decimals; positive for system 2.
    pub signed_share: f64,
}

impl BalanceEntry {
    /// The system this entry describes.
    #[must_use]
    pub fn system(&self) -> SystemId {
        if self.signed_share.is_sign_negative() {
            SystemId::System1
        } else {
            SystemId::System2
        }
    }
}

/// Computes the six balance entries, system 2 before system 1 on each axis.
///
/// Any ratio with a zero denominator is reported as 0.
///
/// # Examples
///
/// ```
/// use allotax::{balance, BalanceAxis, ElementRecord};
///
/// let a = vec![ElementRecord::new("x", 10.0), ElementRecord::new("y", 5.0)];
/// let b = vec![ElementRecord::new("x", 4.0), ElementRecord::new("z", 8.0)];
/// let entries = balance(&a, &b);
/// assert_eq!(entries.len(), 6);
/// assert_eq!(entries[0].axis, BalanceAxis::TotalCount);
/// assert_eq!(entries[0].signed_share, 0.5);
/// assert_eq!(entries[3].signed_share, -0.667);
/// ```
#[must_use]
pub fn balance(system1: &[ElementRecord], system2: &[ElementRecord]) -> Vec<BalanceEntry> {
    let types1: HashSet<&str> = system1.iter().map(|r| r.category.as_str()).collect();
    let types2: HashSet<&str> = system2.iter().map(|r| r.category.as_str()).collect();

    let len1 = system1.len() as f64;
    let len2 = system2.len() as f64;
    let total = len1 + len2;
    let union = types1.union(&types2).count() as f64;
    let only2 = types2.difference(&types1).count() as f64;
    let only1 = types1.difference(&types2).count() as f64;

    let entry = |axis, numerator: f64, denominator: f64, sign: f64| BalanceEntry {
        axis,
        signed_share: sign * round3(ratio(numerator, denominator)),
    };

    vec![
        entry(BalanceAxis::TotalCount, len2, total, 1.0),
        entry(BalanceAxis::TotalCount, len1, total, -1.0),
        entry(BalanceAxis::AllTypes, len2, union, 1.0),
        entry(BalanceAxis::AllTypes, len1, union, -1.0),
        entry(BalanceAxis::ExclusiveTypes, only2, len2, 1.0),
        entry(BalanceAxis::ExclusiveTypes, only1, len1, -1.0),
    ]
}

#[inline]
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[inline]
fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
