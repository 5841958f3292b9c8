//! Fast-and-frugal trees: classification and per-level evaluation.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::FftError;
use crate::node::{ExitOn, Node};
use crate::stats::{ConfusionStats, Counts, Scoring};
use crate::threshold::ResolvedTest;

/// An ordered sequence of nodes whose last node decides every remaining case.
///
/// Deserialization rejects an empty node list or a non-terminal last node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFft")]
pub struct Fft {
    nodes: Vec<Node>,
}

/// Unchecked serialized form of [`Fft`].
#[derive(Deserialize)]
struct RawFft {
    nodes: Vec<Node>,
}

impl TryFrom<RawFft> for Fft {
    type Error = FftError;

    fn try_from(raw: RawFft) -> Result<Self, Self::Error> {
        match raw.nodes.last() {
            None => Err(FftError::MalformedTree { reason: "no nodes" }),
            Some(last) if !last.is_terminal() => Err(FftError::MalformedTree {
                reason: "last node is not terminal",
            }),
            Some(_) => Ok(Self { nodes: raw.nodes }),
        }
    }
}

/// Per-case output of applying a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Decision for each case.
    pub decisions: Vec<bool>,
    /// Zero-based level that decided each case.
    pub levels: Vec<usize>,
}

/// Reach and decision counts at one level of an evaluated tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    /// One-based level.
    pub level: usize,
    /// Cue tested at this level.
    pub cue: String,
    /// Exit branch at this level.
    pub exit: ExitOn,
    /// Cases reaching this level.
    pub reached: usize,
    /// Cases decided at this level.
    pub decided: usize,
    /// Confusion counts of the cases decided here.
    pub counts: Counts,
}

/// Performance of one tree on one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Statistics over all cases.
    pub overall: ConfusionStats,
    /// One entry per level, in order.
    pub levels: Vec<LevelStats>,
}

impl Fft {
    /// Wrap a node sequence. The last node must be terminal.
    pub(crate) fn new(nodes: Vec<Node>) -> Self {
        debug_assert!(nodes.last().is_some_and(Node::is_terminal));
        Self { nodes }
    }

    /// Return the nodes in level order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the number of levels.
    #[must_use]
    pub fn n_levels(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of distinct cues used.
    #[must_use]
    pub fn n_distinct_cues(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| n.cue_name.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Return the exit pattern, e.g. `"PNB"`.
    #[must_use]
    pub fn pattern(&self) -> String {
        self.nodes.iter().map(|n| n.exit.code()).collect()
    }

    /// Bind every node to its cue column in `data`, matched by name.
    pub(crate) fn resolve<'a>(&self, data: &'a Dataset) -> Result<Vec<ResolvedTest<'a>>, FftError> {
        self.nodes
            .iter()
            .map(|node| {
                let index = data
                    .cue_index(&node.cue_name)
                    .ok_or_else(|| FftError::MissingCue {
                        name: node.cue_name.clone(),
                    })?;
                node.threshold.resolve(&node.cue_name, data.cue(index).values())
            })
            .collect()
    }

    /// Decide every case of `data`.
    ///
    /// Each case is decided by exactly one level.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`FftError::MissingCue`] | `data` lacks a cue the tree uses |
    /// | [`FftError::CueKindMismatch`] | a cue has a different kind in `data` |
    pub fn classify(&self, data: &Dataset) -> Result<Classification, FftError> {
        let tests = self.resolve(data)?;
        let last = self.nodes.len() - 1;
        let mut decisions = Vec::with_capacity(data.n_cases());
        let mut levels = Vec::with_capacity(data.n_cases());

        for case in 0..data.n_cases() {
            let mut outcome = None;
            for (level, (node, test)) in self.nodes.iter().zip(&tests).enumerate() {
                let signal = test.test(case);
                let decision = if level == last {
                    Some(node.decide_terminal(signal))
                } else {
                    node.decide(signal)
                };
                if let Some(d) = decision {
                    outcome = Some((level, d));
                    break;
                }
            }
            let (level, decision) = outcome.unwrap_or((last, false));
            decisions.push(decision);
            levels.push(level);
        }

        Ok(Classification { decisions, levels })
    }

    /// Return the decision for every case of `data`.
    ///
    /// # Errors
    ///
    /// Same as [`Fft::classify`].
    pub fn predict(&self, data: &Dataset) -> Result<Vec<bool>, FftError> {
        Ok(self.classify(data)?.decisions)
    }

    /// Compute overall and per-level statistics on `data`.
    ///
    /// Every case reaching a level is charged that level's cue cost.
    ///
    /// # Errors
    ///
    /// Same as [`Fft::classify`].
    pub fn evaluate(&self, data: &Dataset, scoring: &Scoring) -> Result<TreeStats, FftError> {
        let classification = self.classify(data)?;
        let outcomes = data.outcomes();

        let mut levels: Vec<LevelStats> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| LevelStats {
                level: i + 1,
                cue: node.cue_name.clone(),
                exit: node.exit,
                reached: 0,
                decided: 0,
                counts: Counts::default(),
            })
            .collect();

        let mut overall = Counts::default();
        for (case, (&decision, &level)) in classification
            .decisions
            .iter()
            .zip(&classification.levels)
            .enumerate()
        {
            overall.record(decision, outcomes[case]);
            levels[level].decided += 1;
            levels[level].counts.record(decision, outcomes[case]);
            for reached in &mut levels[..=level] {
                reached.reached += 1;
            }
        }

        let cue_cost: f64 = levels
            .iter()
            .map(|l| l.reached as f64 * scoring.costs().cue_cost(&l.cue))
            .sum();

        Ok(TreeStats {
            overall: scoring.stats(overall, cue_cost),
            levels,
        })
    }
}

impl fmt::Display for Fft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

/// Majority outcome among `cases`; ties and empty sets decide negative.
pub(crate) fn majority(outcomes: &[bool], cases: &[usize]) -> bool {
    let positives = cases.iter().filter(|&&c| outcomes[c]).count();
    positives * 2 > cases.len()
}
