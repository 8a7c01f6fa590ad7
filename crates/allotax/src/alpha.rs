//! The rank-turbulence exponent.
//!
//! `alpha` ranges over `[0, ∞]` and has three regimes: `0` (log rank ratio),
//! finite positive (powered difference of inverse ranks) and `∞` (largest
//! inverse rank wins). Infinity is its own variant, never a large number.

use core::fmt;
use core::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Divergence exponent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Alpha {
    /// A finite, non-negative exponent.
    Finite(f64),
    /// The exact `alpha = ∞` regime.
    Infinity,
}

/// Which formula family an exponent selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    /// `alpha = 0`.
    Zero,
    /// `0 < alpha < ∞`.
    General,
    /// `alpha = ∞`.
    Infinite,
}

impl Alpha {
    /// Default exponent of the standard preset.
    pub const STANDARD: Alpha = Alpha::Finite(0.58);

    /// Builds a finite exponent, or [`Alpha::Infinity`] for `f64::INFINITY`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAlpha`] for NaN, negative values and `-∞`.
    pub fn new(value: f64) -> Result<Self, Error> {
        if value.is_nan() || value < 0.0 {
            return Err(Error::InvalidAlpha(format!("{value} is not in [0, ∞]")));
        }
        if value == f64::INFINITY {
            Ok(Alpha::Infinity)
        } else {
            Ok(Alpha::Finite(value))
        }
    }

    /// The regime this exponent selects.
    #[must_use]
    pub fn regime(self) -> Regime {
        match self {
            Alpha::Infinity => Regime::Infinite,
            Alpha::Finite(a) if a == 0.0 => Regime::Zero,
            Alpha::Finite(_) => Regime::General,
        }
    }

    /// Numeric value; `f64::INFINITY` for the infinite regime.
    #[must_use]
    pub fn value(self) -> f64 {
        match self {
            Alpha::Finite(a) => a,
            Alpha::Infinity => f64::INFINITY,
        }
    }
}

impl Default for Alpha {
    fn default() -> Self {
        Alpha::STANDARD
    }
}

impl fmt::Display for Alpha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alpha::Finite(a) => write!(f, "{a}"),
            Alpha::Infinity => f.write_str("infinity"),
        }
    }
}

impl FromStr for Alpha {
    type Err = Error;

    /// Accepts decimal text and `inf`, `infinity` or `∞` in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t == "∞" || t.eq_ignore_ascii_case("inf") || t.eq_ignore_ascii_case("infinity") {
            return Ok(Alpha::Infinity);
        }
        let value: f64 = t
            .parse()
            .map_err(|_| Error::InvalidAlpha(format!("`{s}` is not a number or `infinity`")))?;
        Alpha::new(value)
    }
}

impl Serialize for Alpha {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Alpha::Finite(a) => serializer.serialize_f64(*a),
            Alpha::Infinity => serializer.serialize_str("infinity"),
        }
    }
}

impl<'de> Deserialize<'de> for Alpha {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AlphaVisitor;

        impl Visitor<'_> for AlphaVisitor {
            type Value = Alpha;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative number or \"infinity\"")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Alpha, E> {
                Alpha::new(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Alpha, E> {
                Alpha::new(v as f64).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Alpha, E> {
                Alpha::new(v as f64).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Alpha, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AlphaVisitor)
    }
}
