//! Pruning: drop trailing levels that do too little.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::FftError;
use crate::node::{ExitOn, Node};
use crate::stats::{Goal, Scoring, compare_scores};
use crate::tree::{Fft, majority};

/// Criterion deciding when a trailing level is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoppingRule {
    /// Remove the last level while fewer than `stopping_par * N` cases reach it.
    PopulationFraction,
    /// Remove the last level while it improves the chase goal by less than
    /// `stopping_par` over the tree without it.
    StatDelta,
}

impl FromStr for StoppingRule {
    type Err = FftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "population-fraction" | "population_fraction" => Ok(StoppingRule::PopulationFraction),
            "stat-delta" | "stat_delta" => Ok(StoppingRule::StatDelta),
            _ => Err(FftError::UnknownStoppingRule {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for StoppingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoppingRule::PopulationFraction => f.write_str("population-fraction"),
            StoppingRule::StatDelta => f.write_str("stat-delta"),
        }
    }
}

/// Shortens grown trees against their construction data.
#[derive(Debug, Clone)]
pub struct Pruner {
    rule: StoppingRule,
    stopping_par: f64,
    goal_chase: Goal,
    scoring: Scoring,
}

impl Pruner {
    /// Create a pruner. `goal_chase` and `scoring` are used by [`StoppingRule::StatDelta`].
    #[must_use]
    pub fn new(rule: StoppingRule, stopping_par: f64, goal_chase: Goal, scoring: Scoring) -> Self {
        Self {
            rule,
            stopping_par,
            goal_chase,
            scoring,
        }
    }

    /// Prune one tree. The result is never longer than `tree` and keeps at
    /// least one level.
    ///
    /// # Errors
    ///
    /// Same as [`Fft::classify`].
    pub fn prune(&self, tree: &Fft, data: &Dataset) -> Result<Fft, FftError> {
        let n_levels = tree.n_levels();
        let reaching = reaching_cases(tree, data)?;

        let keep = match self.rule {
            StoppingRule::PopulationFraction => {
                let floor = self.stopping_par * data.n_cases() as f64;
                let mut keep = n_levels;
                while keep > 1 && (reaching[keep - 1].len() as f64) < floor {
                    keep -= 1;
                }
                keep
            }
            StoppingRule::StatDelta => {
                let mut keep = n_levels;
                let mut score = self.chase_score(tree, data)?;
                while keep > 1 {
                    let shorter = truncate(tree, keep - 1, data, &reaching[keep - 2])?;
                    let shorter_score = self.chase_score(&shorter, data)?;
                    let gain_too_small = match (score, shorter_score) {
                        (Some(s), Some(t)) => s - t < self.stopping_par,
                        _ => compare_scores(score, shorter_score).is_le(),
                    };
                    if !gain_too_small {
                        break;
                    }
                    keep -= 1;
                    score = shorter_score;
                }
                keep
            }
        };

        if keep == n_levels {
            return Ok(tree.clone());
        }
        debug!(from = n_levels, to = keep, rule = %self.rule, "pruned tree");
        truncate(tree, keep, data, &reaching[keep - 1])
    }

    /// Prune every tree of a fan and drop repeats.
    ///
    /// Returns `(fan_index, tree)` pairs in fan order; a pruned tree equal to
    /// an earlier one is dropped.
    ///
    /// # Errors
    ///
    /// Same as [`Fft::classify`].
    pub fn prune_fan(&self, fan: &[Fft], data: &Dataset) -> Result<Vec<(usize, Fft)>, FftError> {
        let mut kept: Vec<(usize, Fft)> = Vec::with_capacity(fan.len());
        for (index, tree) in fan.iter().enumerate() {
            let pruned = self.prune(tree, data)?;
            if !kept.iter().any(|(_, t)| *t == pruned) {
                kept.push((index, pruned));
            }
        }
        debug!(n_in = fan.len(), n_out = kept.len(), "pruned fan");
        Ok(kept)
    }

    fn chase_score(&self, tree: &Fft, data: &Dataset) -> Result<Option<f64>, FftError> {
        let stats = tree.evaluate(data, &self.scoring)?;
        Ok(self.goal_chase.score(&stats.overall))
    }
}

/// Cases reaching each level of `tree`.
fn reaching_cases(tree: &Fft, data: &Dataset) -> Result<Vec<Vec<usize>>, FftError> {
    let classification = tree.classify(data)?;
    let mut reaching = vec![Vec::new(); tree.n_levels()];
    for (case, &level) in classification.levels.iter().enumerate() {
        for cases in &mut reaching[..=level] {
            cases.push(case);
        }
    }
    Ok(reaching)
}

/// Keep the first `keep` levels, making the new last level terminal.
///
/// `reaching` holds the cases reaching that level.
fn truncate(tree: &Fft, keep: usize, data: &Dataset, reaching: &[usize]) -> Result<Fft, FftError> {
    let mut nodes: Vec<Node> = tree.nodes()[..keep].to_vec();
    if let Some(last) = nodes.last_mut() {
        make_terminal(last, data, reaching)?;
    }
    Ok(Fft::new(nodes))
}

/// Convert an exiting node into a terminal one.
///
/// The exit branch keeps its decision. The deferred branch takes the
/// majority outcome of its cases, or the opposite decision when empty.
/// Missing values take the majority of every case reaching the node.
pub(crate) fn make_terminal(node: &mut Node, data: &Dataset, reaching: &[usize]) -> Result<(), FftError> {
    let outcomes = data.outcomes();
    let index = data
        .cue_index(&node.cue_name)
        .ok_or_else(|| FftError::MissingCue {
            name: node.cue_name.clone(),
        })?;
    let test = node.threshold.resolve(&node.cue_name, data.cue(index).values())?;

    let branch = |want: bool| -> Vec<usize> {
        reaching
            .iter()
            .copied()
            .filter(|&c| test.test(c) == Some(want))
            .collect()
    };

    match node.exit {
        ExitOn::Positive => {
            let deferred = branch(false);
            node.false_decision = if deferred.is_empty() {
                !node.true_decision
            } else {
                majority(outcomes, &deferred)
            };
        }
        ExitOn::Negative => {
            let deferred = branch(true);
            node.true_decision = if deferred.is_empty() {
                !node.false_decision
            } else {
                majority(outcomes, &deferred)
            };
        }
        ExitOn::Both => {}
    }
    node.exit = ExitOn::Both;
    node.missing_decision = majority(outcomes, reaching);
    Ok(())
}
