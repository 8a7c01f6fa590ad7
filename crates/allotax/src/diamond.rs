//! Diamond binner.
//!
//! Reorders a comparison by descending divergence share and aggregates every
//! category into a square grid over log10-rank space, one axis per system.
//! The grid is dense: every cell in range is present, occupied or not.
//!
//! ```text
//!   y = coord(rank in system 1)
//!   ▲
//!   │ left    ╱
//!   │       ╱
//!   │     ╱   right
//!   │   ╱
//!   └──────────────▶ x = coord(rank in system 2)
//!
//!   coord(rank) = floor(log10(rank) / CELL_LENGTH)
//! ```
//!
//! Nothing here mutates its inputs: the reordered systems are fresh copies.

use serde::{Deserialize, Serialize};

use crate::combine::{CombinedPair, CombinedSystem};
use crate::divergence::DivergenceResult;

/// Width of one grid cell in log10-rank units.
pub const CELL_LENGTH: f64 = 1.0 / 15.0;

/// Value substituted for a contribution masked out of the loss/gain maxima.
pub const MASKED: f64 = -1.0;

/// Which half of the diamond a cell lies in, by coordinates alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// `x > y`.
    Left,
    /// `x <= y`.
    Right,
}

/// One cell of the diamond grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiamondCell {
    /// Column, from the system 2 rank.
    pub x: usize,
    /// Row, from the system 1 rank.
    pub y: usize,
    /// Number of categories in the cell.
    pub count: usize,
    /// `(min, max)` system 1 rank among members.
    pub rank_range_left: Option<(f64, f64)>,
    /// `(min, max)` system 2 rank among members.
    pub rank_range_right: Option<(f64, f64)>,
    /// `(system 1 rank, system 2 rank)` of the first member, in share order.
    pub representative_ranks: Option<(f64, f64)>,
    /// `(x + y) / 2`.
    pub diagonal_coordinate: f64,
    /// `(x − y)²`.
    pub squared_diagonal_distance: usize,
    /// Half of the diamond the cell belongs to.
    pub side: Side,
    /// Member category labels, in share order.
    pub categories: Vec<String>,
}

impl DiamondCell {
    fn empty(x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            count: 0,
            rank_range_left: None,
            rank_range_right: None,
            representative_ranks: None,
            diagonal_coordinate: (x + y) as f64 / 2.0,
            squared_diagonal_distance: x.abs_diff(y).pow(2),
            side: if x <= y { Side::Right } else { Side::Left },
            categories: Vec::new(),
        }
    }

    fn push(&mut self, category: &str, rank1: f64, rank2: f64) {
        self.count += 1;
        self.rank_range_left = Some(widen(self.rank_range_left, rank1));
        self.rank_range_right = Some(widen(self.rank_range_right, rank2));
        self.representative_ranks.get_or_insert((rank1, rank2));
        self.categories.push(category.to_owned());
    }

    /// True when no category falls in the cell.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Member labels joined with `", "`.
    #[must_use]
    pub fn label(&self) -> String {
        self.categories.join(", ")
    }
}

fn widen(range: Option<(f64, f64)>, value: f64) -> (f64, f64) {
    match range {
        Some((lo, hi)) => (lo.min(value), hi.max(value)),
        None => (value, value),
    }
}

/// Output of [`diamond_bin`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiamondBinResult {
    /// Side length of the grid.
    pub n_cells: usize,
    /// `n_cells²` cells, x-major: cell `(x, y)` is at `x * n_cells + y`.
    pub grid: Vec<DiamondCell>,
    /// Divergence shares in descending order.
    pub ordered_contributions: Vec<f64>,
    /// `order[i]` is the original index of the `i`-th reordered element.
    pub order: Vec<usize>,
    /// Largest share once elements whose system 1 rank exceeds their
    /// system 2 rank are masked; `None` for an empty universe.
    pub max_loss_contribution: Option<f64>,
    /// Largest share once elements whose system 2 rank is below their
    /// system 1 rank are masked; `None` for an empty universe.
    pub max_gain_contribution: Option<f64>,
    /// Copies of both systems, permuted into `order`.
    pub reordered: CombinedPair,
}

impl DiamondBinResult {
    /// The cell at `(x, y)`, if in range.
    #[must_use]
    pub fn cell(&self, x: usize, y: usize) -> Option<&DiamondCell> {
        if x < self.n_cells && y < self.n_cells {
            self.grid.get(x * self.n_cells + y)
        } else {
            None
        }
    }

    /// Cells holding at least one category.
    pub fn occupied(&self) -> impl Iterator<Item = &DiamondCell> {
        self.grid.iter().filter(|c| !c.is_empty())
    }

    /// Largest number of categories in one cell.
    #[must_use]
    pub fn max_cell_count(&self) -> usize {
        self.grid.iter().map(|c| c.count).max().unwrap_or(0)
    }
}

/// Grid coordinate of a rank.
#[inline]
#[must_use]
pub fn rank_coordinate(rank: f64) -> usize {
    // Ranks start at 1, so the quotient is non-negative; `as` saturates.
    (rank.log10() / CELL_LENGTH).floor() as usize
}

/// `ceil(max(log10 max rank in system 1, log10 max rank in system 2))`,
/// or `None` for an empty universe.
#[must_use]
pub fn max_log10_rank(combined: &CombinedPair) -> Option<f64> {
    combined
        .iter()
        .filter_map(CombinedSystem::max_rank)
        .map(f64::log10)
        .reduce(f64::max)
        .map(f64::ceil)
}

/// Side length of the grid for a given rounded max log10 rank.
///
/// The input is clamped to at least 1, so the smallest grid is 16 × 16.
#[must_use]
pub fn cell_count(max_log10: f64) -> usize {
    (max_log10.max(1.0) / CELL_LENGTH).floor() as usize + 1
}

/// Bins a comparison into the diamond grid.
///
/// # Examples
///
/// ```
/// use allotax::{combine, diamond_bin, divergence, Alpha, ElementRecord};
///
/// let a = vec![ElementRecord::new("x", 10.0), ElementRecord::new("y", 5.0)];
/// let b = vec![ElementRecord::new("x", 4.0), ElementRecord::new("z", 8.0)];
/// let combined = combine(&a, &b).unwrap();
/// let bins = diamond_bin(&combined, &divergence(&combined, Alpha::Finite(1.0)));
/// assert_eq!(bins.grid.len(), bins.n_cells * bins.n_cells);
/// assert!(bins.occupied().any(|c| c.categories.iter().any(|t| t == "x")));
/// ```
#[must_use]
pub fn diamond_bin(combined: &CombinedPair, divergence: &DivergenceResult) -> DiamondBinResult {
    let shares = &divergence.shares;

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| shares[b].total_cmp(&shares[a]));

    let ordered_contributions: Vec<f64> = order.iter().map(|&i| shares[i]).collect();
    let reordered = [permute(&combined[0], &order), permute(&combined[1], &order)];
    let [left, right] = &reordered;

    let masked_max = |mask: fn(f64, f64) -> bool| {
        ordered_contributions
            .iter()
            .zip(left.ranks.iter().zip(&right.ranks))
            .map(|(&d, (&r1, &r2))| if mask(r1, r2) { MASKED } else { d })
            .reduce(f64::max)
    };
    let max_loss_contribution = masked_max(|r1, r2| r1 > r2);
    let max_gain_contribution = masked_max(|r1, r2| r2 < r1);

    let n_cells = cell_count(max_log10_rank(&reordered).unwrap_or(1.0));
    let mut grid: Vec<DiamondCell> = (0..n_cells)
        .flat_map(|x| (0..n_cells).map(move |y| DiamondCell::empty(x, y)))
        .collect();

    let last = n_cells - 1;
    for i in 0..left.len() {
        let (r1, r2) = (left.ranks[i], right.ranks[i]);
        let x = rank_coordinate(r2).min(last);
        let y = rank_coordinate(r1).min(last);
        grid[x * n_cells + y].push(&left.categories[i], r1, r2);
    }

    DiamondBinResult {
        n_cells,
        grid,
        ordered_contributions,
        order,
        max_loss_contribution,
        max_gain_contribution,
        reordered,
    }
}

fn permute(system: &CombinedSystem, order: &[usize]) -> CombinedSystem {
    CombinedSystem {
        categories: order.iter().map(|&i| system.categories[i].clone()).collect(),
        counts: order.iter().map(|&i| system.counts[i]).collect(),
        probabilities: order.iter().map(|&i| system.probabilities[i]).collect(),
        ranks: order.iter().map(|&i| system.ranks[i]).collect(),
        universe_size: system.universe_size,
    }
}
