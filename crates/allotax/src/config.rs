//! Comparison configuration.
//!
//! A [`ComparisonConfig`] can be built in code or loaded from TOML. Every key
//! is optional; a `preset` sets the exponent unless `alpha` is also present.
//!
//! ```toml
//! preset = "robust"      # standard | sensitive | robust
//! alpha = 0.3            # number, or "infinity"
//! top_n = 50
//! titles = ["2019", "2020"]
//! backend = "reference"  # auto | reference
//! ```

use core::fmt;
use core::str::FromStr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::alpha::Alpha;
use crate::error::{Error, Result};

/// Default number of shift entries kept.
pub const DEFAULT_TOP_N: usize = 30;

/// Named exponent presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// `alpha = 0.58`.
    #[default]
    Standard,
    /// `alpha = 0.1`, emphasizes rare categories.
    Sensitive,
    /// `alpha = ∞`, only the most prominent rank per category counts.
    Robust,
}

impl Preset {
    /// Exponent selected by the preset.
    #[must_use]
    pub const fn alpha(self) -> Alpha {
        match self {
            Preset::Standard => Alpha::STANDARD,
            Preset::Sensitive => Alpha::Finite(0.1),
            Preset::Robust => Alpha::Infinity,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Preset::Standard => "standard",
            Preset::Sensitive => "sensitive",
            Preset::Robust => "robust",
        })
    }
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Preset::Standard),
            "sensitive" => Ok(Preset::Sensitive),
            "robust" => Ok(Preset::Robust),
            other => Err(Error::Config(format!(
                "unknown preset `{other}` (expected standard, sensitive or robust)"
            ))),
        }
    }
}

/// Divergence backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Initialize the accelerated backend in the background and use it once
    /// ready.
    #[default]
    Auto,
    /// Always run the reference backend.
    Reference,
}

/// Settings of one comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawConfig")]
pub struct ComparisonConfig {
    /// Divergence exponent.
    pub alpha: Alpha,
    /// Number of shift entries kept.
    pub top_n: usize,
    /// Display titles of system 1 and system 2.
    pub titles: [String; 2],
    /// Backend selection.
    pub backend: BackendMode,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            alpha: Alpha::STANDARD,
            top_n: DEFAULT_TOP_N,
            titles: default_titles(),
            backend: BackendMode::Auto,
        }
    }
}

fn default_titles() -> [String; 2] {
    ["System 1".to_owned(), "System 2".to_owned()]
}

/// On-disk form: every key optional, plus `preset`.
#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    preset: Option<Preset>,
    alpha: Option<Alpha>,
    top_n: Option<usize>,
    titles: Option<[String; 2]>,
    backend: Option<BackendMode>,
}

impl From<RawConfig> for ComparisonConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = ComparisonConfig::default();
        Self {
            alpha: raw
                .alpha
                .or(raw.preset.map(Preset::alpha))
                .unwrap_or(defaults.alpha),
            top_n: raw.top_n.unwrap_or(defaults.top_n),
            titles: raw.titles.unwrap_or(defaults.titles),
            backend: raw.backend.unwrap_or(defaults.backend),
        }
    }
}

impl ComparisonConfig {
    /// Default settings with the exponent of `preset`.
    #[must_use]
    pub fn from_preset(preset: Preset) -> Self {
        Self::default().with_alpha(preset.alpha())
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed TOML, unknown keys or an
    /// invalid value.
    ///
    /// # Examples
    ///
    /// ```
    /// use allotax::{Alpha, ComparisonConfig};
    ///
    /// let cfg = ComparisonConfig::from_toml_str("preset = \"robust\"\ntop_n = 10").unwrap();
    /// assert_eq!(cfg.alpha, Alpha::Infinity);
    /// assert_eq!(cfg.top_n, 10);
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| Error::Config(err.to_string()))
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&text).map_err(|err| match err {
            Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Replaces the exponent.
    #[must_use]
    pub fn with_alpha(mut self, alpha: Alpha) -> Self {
        self.alpha = alpha;
        self
    }

    /// Replaces the number of shift entries kept.
    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Replaces both titles.
    #[must_use]
    pub fn with_titles(mut self, system1: impl Into<String>, system2: impl Into<String>) -> Self {
        self.titles = [system1.into(), system2.into()];
        self
    }

    /// Replaces the backend selection.
    #[must_use]
    pub fn with_backend(mut self, backend: BackendMode) -> Self {
        self.backend = backend;
        self
    }
}
