//! Single-tree builders: one greedily grown tree, no fan.
//!
//! Both builders pick each level's cue and threshold the way conditional
//! fan growth does: the best unused cue over the cases still undecided.
//! They differ only in how the exit branch of each non-terminal level is
//! chosen, which is delegated to an [`ExitPolicy`].

use std::fmt;

use tracing::{debug, instrument};

use crate::dataset::Dataset;
use crate::error::FftError;
use crate::finder::{CueFit, ThresholdFinder};
use crate::node::{ExitOn, Node};
use crate::prune::make_terminal;
use crate::rank::{CueRanking, rank_cues};
use crate::tree::{Fft, majority};

/// Chooses the exit branch of a non-terminal level.
pub trait ExitPolicy: fmt::Debug + Send + Sync {
    /// Return [`ExitOn::Positive`] or [`ExitOn::Negative`] for zero-based
    /// `level`, given the cue fit over the cases reaching it.
    fn exit(&self, level: usize, fit: &CueFit) -> ExitOn;
}

/// Exit on the branch whose decisions are more reliable on the cases at hand.
///
/// Compares positive and negative predictive value of the level's fit;
/// positive wins ties and an undefined value loses.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxPolicy;

impl ExitPolicy for MaxPolicy {
    fn exit(&self, _level: usize, fit: &CueFit) -> ExitOn {
        let ppv = fit.stats.ppv.unwrap_or(f64::NEG_INFINITY);
        let npv = fit.stats.npv.unwrap_or(f64::NEG_INFINITY);
        if ppv >= npv {
            ExitOn::Positive
        } else {
            ExitOn::Negative
        }
    }
}

/// Alternate exits: positive, negative, positive, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct ZigzagPolicy;

impl ExitPolicy for ZigzagPolicy {
    fn exit(&self, level: usize, _fit: &CueFit) -> ExitOn {
        if level % 2 == 0 {
            ExitOn::Positive
        } else {
            ExitOn::Negative
        }
    }
}

/// Grows exactly one tree under an [`ExitPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct SingleTreeBuilder<'a> {
    finder: &'a ThresholdFinder,
    policy: &'a dyn ExitPolicy,
    max_levels: usize,
}

impl<'a> SingleTreeBuilder<'a> {
    /// Create a builder.
    #[must_use]
    pub fn new(finder: &'a ThresholdFinder, policy: &'a dyn ExitPolicy, max_levels: usize) -> Self {
        Self {
            finder,
            policy,
            max_levels,
        }
    }

    /// Grow the tree.
    ///
    /// `ranking` must rank every cue over all cases of `data`; its best fit
    /// is the first level. Growth stops at `max_levels`, when no case is
    /// left undecided, or when no unused cue can be fitted to the cases
    /// left, in which case the last level is closed off as terminal.
    ///
    /// # Errors
    ///
    /// Returns [`FftError::NoUsableCues`] when `ranking` holds no fits.
    #[instrument(skip_all, fields(policy = ?self.policy, max_levels = self.max_levels))]
    pub fn build(&self, data: &Dataset, ranking: &CueRanking) -> Result<Fft, FftError> {
        let Some(first) = ranking.best() else {
            return Err(FftError::NoUsableCues {
                skipped: ranking.skipped.clone(),
            });
        };
        let outcomes = data.outcomes();

        let mut nodes: Vec<Node> = Vec::new();
        let mut used = Vec::new();
        let mut remaining = data.all_cases();
        let mut fit: CueFit = first.clone();

        loop {
            let level = nodes.len();
            if level + 1 >= self.max_levels {
                nodes.push(Node::terminal(&fit, majority(outcomes, &remaining)));
                break;
            }

            let node = Node::exiting(&fit, self.policy.exit(level, &fit));
            let test = node.threshold.resolve(&node.cue_name, data.cue(fit.cue).values())?;
            let deferred: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&c| node.decide(test.test(c)).is_none())
                .collect();
            used.push(fit.cue);

            let next = if deferred.is_empty() {
                None
            } else {
                rank_cues(self.finder, data, &deferred, &used)
                    .fits
                    .into_iter()
                    .next()
            };

            match next {
                Some(next_fit) => {
                    nodes.push(node);
                    remaining = deferred;
                    fit = next_fit;
                }
                None => {
                    debug!(level, n_deferred = deferred.len(), "growth stopped early");
                    let mut node = node;
                    make_terminal(&mut node, data, &remaining)?;
                    nodes.push(node);
                    break;
                }
            }
        }

        Ok(Fft::new(nodes))
    }
}
