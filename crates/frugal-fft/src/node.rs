use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::CueIndex;
use crate::finder::CueFit;
use crate::threshold::Threshold;

/// Which branch of a node's test decides immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitOn {
    /// Cases passing the test are decided; the rest continue.
    Positive,
    /// Cases failing the test are decided; the rest continue.
    Negative,
    /// Terminal: every case reaching the node is decided.
    Both,
}

impl ExitOn {
    /// Single-letter code used in fan patterns.
    #[must_use]
    pub fn code(self) -> char {
        match self {
            ExitOn::Positive => 'P',
            ExitOn::Negative => 'N',
            ExitOn::Both => 'B',
        }
    }
}

impl fmt::Display for ExitOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitOn::Positive => "positive",
            ExitOn::Negative => "negative",
            ExitOn::Both => "both",
        };
        f.write_str(name)
    }
}

/// One level of a fast-and-frugal tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Cue column in the construction dataset.
    pub cue: CueIndex,
    /// Cue name, used to resolve the cue in other datasets.
    pub cue_name: String,
    /// Test applied to the cue value.
    pub threshold: Threshold,
    /// Branch that exits at this node.
    pub exit: ExitOn,
    /// Decision for cases passing the test, when that branch exits.
    pub true_decision: bool,
    /// Decision for cases failing the test, when that branch exits.
    pub false_decision: bool,
    /// Decision for cases with a missing value. Used only when terminal.
    pub missing_decision: bool,
}

impl Node {
    /// Create a non-terminal node exiting on `exit`.
    pub(crate) fn exiting(fit: &CueFit, exit: ExitOn) -> Self {
        Self {
            cue: fit.cue,
            cue_name: fit.name.clone(),
            threshold: fit.threshold.clone(),
            exit,
            true_decision: true,
            false_decision: false,
            missing_decision: false,
        }
    }

    /// Create a terminal node deciding by the test.
    pub(crate) fn terminal(fit: &CueFit, missing_decision: bool) -> Self {
        Self {
            missing_decision,
            ..Self::exiting(fit, ExitOn::Both)
        }
    }

    /// Return `true` when the node decides every case reaching it.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.exit == ExitOn::Both
    }

    /// Decide a case given its test outcome, or `None` to pass it on.
    ///
    /// A non-terminal node defers cases whose value is missing.
    #[must_use]
    pub fn decide(&self, signal: Option<bool>) -> Option<bool> {
        match (self.exit, signal) {
            (ExitOn::Both | ExitOn::Positive, Some(true)) => Some(self.true_decision),
            (ExitOn::Both | ExitOn::Negative, Some(false)) => Some(self.false_decision),
            (ExitOn::Both, None) => Some(self.missing_decision),
            _ => None,
        }
    }

    /// Decide a case as if this node were terminal.
    #[must_use]
    pub fn decide_terminal(&self, signal: Option<bool>) -> bool {
        match signal {
            Some(true) => self.true_decision,
            Some(false) => self.false_decision,
            None => self.missing_decision,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} (exit {})", self.cue_name, self.threshold, self.exit)
    }
}
