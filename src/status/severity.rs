//! Tiered threshold classification.
//!
//! ```text
//!   critical.min   warning.min            warning.max   critical.max
//!  ──────┼─────────────┼──────────────────────┼─────────────┼──────
//!  CRIT  │   WARNING   │        NORMAL        │   WARNING   │  CRIT
//! ```
//!
//! Bounds are inclusive: a value sitting exactly on `warning.max` is
//! still normal, exactly on `critical.max` still a warning.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::StatusView;
use crate::error::ConfigError;

/// Classification of a single metric, ordered for worst-of aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive `[min, max]` band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `NaN` is never outside: both comparisons are false.
    fn excludes(self, value: f64) -> bool {
        value < self.min || value > self.max
    }
}

/// Warning band nested inside a critical band.
///
/// Same shape as the `ranges` objects the dashboard cards are configured
/// with: `{ "warning": {min, max}, "critical": {min, max} }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TieredRange {
    pub warning: Bounds,
    pub critical: Bounds,
}

impl TieredRange {
    /// Build a range, rejecting anything that is not properly nested.
    pub fn new(warning: Bounds, critical: Bounds) -> Result<Self, ConfigError> {
        let range = Self { warning, critical };
        range.validate("range")?;
        Ok(range)
    }

    /// Check `critical.min <= warning.min <= warning.max <= critical.max`.
    ///
    /// `what` names the metric in the error.
    pub fn validate(&self, what: &'static str) -> Result<(), ConfigError> {
        let nested = self.critical.min <= self.warning.min
            && self.warning.min <= self.warning.max
            && self.warning.max <= self.critical.max;
        if nested {
            Ok(())
        } else {
            Err(ConfigError::InvalidRange(what))
        }
    }
}

/// Map a value onto a severity.
///
/// An absent range always yields `Normal`: instrumentation without
/// configured thresholds must never block a view.  `NaN` also falls
/// through to `Normal`; callers holding possibly-missing data should go
/// through [`classify_reading`] instead.
pub fn classify(value: f64, range: Option<&TieredRange>) -> Severity {
    let Some(range) = range else {
        return Severity::Normal;
    };
    if range.critical.excludes(value) {
        Severity::Critical
    } else if range.warning.excludes(value) {
        Severity::Warning
    } else {
        Severity::Normal
    }
}

/// Classify a reading that may be missing or non-numeric.
///
/// Absent and non-finite values come back as [`StatusView::Unknown`]
/// rather than masquerading as `Normal`.
pub fn classify_reading(value: Option<f64>, range: Option<&TieredRange>) -> StatusView {
    match value {
        Some(v) if v.is_finite() => classify(v, range).into(),
        _ => StatusView::Unknown,
    }
}

/// The higher-priority of two severities.
pub fn worst_of(a: Severity, b: Severity) -> Severity {
    a.max(b)
}

/// Fold any number of severities; `None` when the iterator is empty.
pub fn worst(iter: impl IntoIterator<Item = Severity>) -> Option<Severity> {
    iter.into_iter().reduce(worst_of)
}
