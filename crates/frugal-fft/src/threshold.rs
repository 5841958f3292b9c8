//! Cue thresholds: the test a node applies to one cue value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::CueValues;
use crate::error::FftError;

/// Comparison applied between a numeric cue value and a cutoff.
///
/// The declaration order is the canonical tie-break order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Direction {
    /// `value > cutoff`
    Above,
    /// `value >= cutoff`
    AtOrAbove,
    /// `value < cutoff`
    Below,
    /// `value <= cutoff`
    AtOrBelow,
}

impl Direction {
    /// All directions in canonical order.
    pub const ALL: [Direction; 4] = [
        Direction::Above,
        Direction::AtOrAbove,
        Direction::Below,
        Direction::AtOrBelow,
    ];

    /// Apply the comparison.
    #[must_use]
    pub fn holds(self, value: f64, cutoff: f64) -> bool {
        match self {
            Direction::Above => value > cutoff,
            Direction::AtOrAbove => value >= cutoff,
            Direction::Below => value < cutoff,
            Direction::AtOrBelow => value <= cutoff,
        }
    }

    /// Return the operator symbol.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Direction::Above => ">",
            Direction::AtOrAbove => ">=",
            Direction::Below => "<",
            Direction::AtOrBelow => "<=",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A test turning one cue value into a positive/negative signal.
///
/// The test holding means the cue points towards the positive class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Threshold {
    /// Numeric comparison.
    Numeric {
        /// Comparison operator.
        direction: Direction,
        /// Cutoff value.
        cutoff: f64,
    },
    /// Membership in a set of categorical levels.
    Categorical {
        /// Level labels that signal positive, ascending.
        levels: Vec<String>,
    },
}

impl Threshold {
    /// Return `"numeric"` or `"categorical"`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Threshold::Numeric { .. } => "numeric",
            Threshold::Categorical { .. } => "categorical",
        }
    }

    /// Bind this threshold to a cue column.
    ///
    /// Categorical levels are matched by label, so the column may come
    /// from a different dataset than the one the threshold was fitted on.
    ///
    /// # Errors
    ///
    /// Returns [`FftError::CueKindMismatch`] when the column kind differs.
    pub fn resolve<'a>(
        &self,
        cue_name: &str,
        values: &'a CueValues,
    ) -> Result<ResolvedTest<'a>, FftError> {
        match (self, values) {
            (Threshold::Numeric { direction, cutoff }, CueValues::Numeric(values)) => {
                Ok(ResolvedTest::Numeric {
                    direction: *direction,
                    cutoff: *cutoff,
                    values,
                })
            }
            (Threshold::Categorical { levels: chosen }, CueValues::Categorical { levels, codes }) => {
                let mask = levels
                    .iter()
                    .map(|l| chosen.contains(l))
                    .collect();
                Ok(ResolvedTest::Categorical { mask, codes })
            }
            _ => Err(FftError::CueKindMismatch {
                name: cue_name.to_string(),
                expected: self.kind(),
                found: values.kind(),
            }),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Numeric { direction, cutoff } => write!(f, "{direction} {cutoff}"),
            Threshold::Categorical { levels } => write!(f, "in {{{}}}", levels.join(", ")),
        }
    }
}

/// A threshold bound to one dataset column.
#[derive(Debug)]
pub enum ResolvedTest<'a> {
    /// Numeric comparison over a column.
    Numeric {
        /// Comparison operator.
        direction: Direction,
        /// Cutoff value.
        cutoff: f64,
        /// The column.
        values: &'a [Option<f64>],
    },
    /// Level membership over a column.
    Categorical {
        /// `mask[code]` is `true` when the level signals positive.
        mask: Vec<bool>,
        /// The column's level codes.
        codes: &'a [Option<usize>],
    },
}

impl ResolvedTest<'_> {
    /// Test one case. `None` when its value is missing.
    #[must_use]
    pub fn test(&self, case: usize) -> Option<bool> {
        match self {
            ResolvedTest::Numeric {
                direction,
                cutoff,
                values,
            } => values[case].map(|v| direction.holds(v, *cutoff)),
            ResolvedTest::Categorical { mask, codes } => codes[case].map(|c| mask[c]),
        }
    }
}
