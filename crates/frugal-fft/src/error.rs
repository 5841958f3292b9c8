use std::fmt;

use crate::rank::SkippedCue;

/// Broad category of an [`FftError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configuration value is invalid. Surfaces before any work is done.
    Configuration,
    /// The input data cannot be used as given.
    Data,
    /// Construction ran but had nothing to build from.
    Construction,
}

/// Errors from fast-and-frugal tree construction and evaluation.
#[derive(Debug, thiserror::Error)]
pub enum FftError {
    /// Returned when max_levels is zero.
    #[error("max_levels must be at least 1, got {max_levels}")]
    InvalidMaxLevels {
        /// The invalid max_levels value provided.
        max_levels: usize,
    },

    /// Returned when stopping_par is outside [0.0, 1.0].
    #[error("stopping_par must be in [0.0, 1.0], got {value}")]
    InvalidStoppingPar {
        /// The invalid stopping_par value provided.
        value: f64,
    },

    /// Returned when the sensitivity weight is outside [0.0, 1.0].
    #[error("sens_w must be in [0.0, 1.0], got {value}")]
    InvalidSensitivityWeight {
        /// The invalid weight provided.
        value: f64,
    },

    /// Returned when a goal name does not match any known statistic.
    #[error("unknown {field} \"{name}\" (expected bacc, wacc, acc, dprime, or cost)")]
    UnknownGoal {
        /// The configuration field being parsed (`goal` or `goal_chase`).
        field: &'static str,
        /// The name that failed to parse.
        name: String,
    },

    /// Returned when an algorithm name does not match any known strategy.
    #[error("unknown algorithm \"{name}\" (expected global, conditional, max, or zigzag)")]
    UnknownAlgorithm {
        /// The name that failed to parse.
        name: String,
    },

    /// Returned when a stopping rule name does not match any known rule.
    #[error("unknown stopping_rule \"{name}\" (expected population-fraction or stat-delta)")]
    UnknownStoppingRule {
        /// The name that failed to parse.
        name: String,
    },

    /// Returned when an outcome cost vector does not hold exactly four values.
    #[error("cost_outcomes must hold 4 values (hit, false_alarm, miss, correct_rejection), got {got}")]
    InvalidOutcomeCostCount {
        /// Number of values supplied.
        got: usize,
    },

    /// Returned when a cost value is NaN or infinite.
    #[error("non-finite cost {value} for {field}")]
    NonFiniteCost {
        /// Name of the outcome or cue the cost belongs to.
        field: String,
        /// The offending value.
        value: f64,
    },

    /// Returned when cost_cues names a cue absent from the dataset.
    #[error("cost_cues names unknown cue \"{name}\"")]
    UnknownCostCue {
        /// The unknown cue name.
        name: String,
    },

    /// Returned when a train fraction is not in (0.0, 1.0).
    #[error("train_fraction must be in (0.0, 1.0), got {fraction}")]
    InvalidTrainFraction {
        /// The invalid fraction provided.
        fraction: f64,
    },

    /// Returned when a dataset has zero cases.
    #[error("dataset has zero cases")]
    EmptyDataset,

    /// Returned when a dataset has zero cue columns.
    #[error("dataset has zero cue columns")]
    ZeroCues,

    /// Returned when a cue column length differs from the outcome column.
    #[error("cue \"{cue}\" has {got} values, expected {expected}")]
    CueLengthMismatch {
        /// Name of the offending cue.
        cue: String,
        /// Number of cases (outcome column length).
        expected: usize,
        /// Number of values in the cue column.
        got: usize,
    },

    /// Returned when two cue columns share a name.
    #[error("duplicate cue name \"{name}\"")]
    DuplicateCueName {
        /// The duplicated name.
        name: String,
    },

    /// Returned when a numeric cue value is NaN or infinite.
    #[error("non-finite value in cue \"{cue}\" at case {case_index}")]
    NonFiniteValue {
        /// Name of the offending cue.
        cue: String,
        /// Zero-based case index.
        case_index: usize,
    },

    /// Returned when the outcome column does not hold exactly two classes.
    #[error("outcome column \"{column}\" is not binary: found {} distinct values ({})", .distinct.len(), .distinct.join(", "))]
    NonBinaryOutcome {
        /// Name of the outcome column.
        column: String,
        /// The distinct values found (up to a handful).
        distinct: Vec<String>,
    },

    /// Returned when a tree references a cue the dataset does not have.
    #[error("dataset has no cue named \"{name}\"")]
    MissingCue {
        /// The cue name the tree expects.
        name: String,
    },

    /// Returned when a cue is numeric in one dataset and categorical in another.
    #[error("cue \"{name}\" is {found} in this dataset, expected {expected}")]
    CueKindMismatch {
        /// Name of the cue.
        name: String,
        /// The kind the threshold was built for.
        expected: &'static str,
        /// The kind found in the dataset.
        found: &'static str,
    },

    /// Returned when a deserialized tree breaks the tree shape.
    #[error("malformed tree: {reason}")]
    MalformedTree {
        /// What is wrong with the node list.
        reason: &'static str,
    },

    /// Returned when every cue was skipped and there is nothing to build.
    #[error("no usable cues: {}", SkippedList(.skipped))]
    NoUsableCues {
        /// Every cue that was skipped, with the reason.
        skipped: Vec<SkippedCue>,
    },
}

impl FftError {
    /// Return the taxonomy category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            FftError::InvalidMaxLevels { .. }
            | FftError::InvalidStoppingPar { .. }
            | FftError::InvalidSensitivityWeight { .. }
            | FftError::UnknownGoal { .. }
            | FftError::UnknownAlgorithm { .. }
            | FftError::UnknownStoppingRule { .. }
            | FftError::InvalidOutcomeCostCount { .. }
            | FftError::NonFiniteCost { .. }
            | FftError::UnknownCostCue { .. }
            | FftError::InvalidTrainFraction { .. } => ErrorKind::Configuration,
            FftError::EmptyDataset
            | FftError::ZeroCues
            | FftError::CueLengthMismatch { .. }
            | FftError::DuplicateCueName { .. }
            | FftError::NonFiniteValue { .. }
            | FftError::NonBinaryOutcome { .. }
            | FftError::MissingCue { .. }
            | FftError::CueKindMismatch { .. }
            | FftError::MalformedTree { .. } => ErrorKind::Data,
            FftError::NoUsableCues { .. } => ErrorKind::Construction,
        }
    }
}

struct SkippedList<'a>(&'a [SkippedCue]);

impl fmt::Display for SkippedList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("dataset has no cues");
        }
        for (i, skipped) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} ({})", skipped.name, skipped.reason)?;
        }
        Ok(())
    }
}
