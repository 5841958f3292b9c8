//! Fan generation: every exit-direction pattern at every depth.
//!
//! Trees are grown breadth-first from an explicit frontier of growth states.
//! A state holds the exiting nodes chosen so far and the construction cases
//! none of them decided. Expanding a state emits the tree that ends at the
//! next level, then pushes one child per exit direction when another level
//! is allowed. Frontier states are independent, so each depth is expanded
//! in parallel and collected in order.
//!
//! For `L` levels a fan holds at most `2^L - 1` trees, ordered by depth and
//! then by exit pattern with positive exits first.

use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::dataset::{CueIndex, Dataset};
use crate::error::FftError;
use crate::finder::{CueFit, ThresholdFinder};
use crate::node::{ExitOn, Node};
use crate::rank::{CueRanking, rank_cues};
use crate::tree::{Fft, majority};

/// How each level's cue and threshold are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanMode {
    /// Level `k` uses the `k`-th cue of the whole-dataset ranking.
    Global,
    /// Each level re-ranks the unused cues over the cases still undecided
    /// on that path and takes the best.
    Conditional,
}

/// A partially grown tree.
#[derive(Debug, Clone)]
struct GrowthState {
    nodes: Vec<Node>,
    remaining: Vec<usize>,
    used: Vec<CueIndex>,
}

/// Enumerates the fan of candidate trees for one dataset.
#[derive(Debug, Clone, Copy)]
pub struct FanGenerator<'a> {
    finder: &'a ThresholdFinder,
    max_levels: usize,
}

impl<'a> FanGenerator<'a> {
    /// Create a generator growing trees of at most `max_levels` levels.
    #[must_use]
    pub fn new(finder: &'a ThresholdFinder, max_levels: usize) -> Self {
        Self { finder, max_levels }
    }

    /// Generate the fan.
    ///
    /// `ranking` must be the ranking of every cue over all cases of `data`.
    /// It fixes every level in global mode and the first level in
    /// conditional mode.
    ///
    /// # Errors
    ///
    /// Returns [`FftError::NoUsableCues`] when `ranking` holds no fits.
    #[instrument(skip_all, fields(mode = ?mode, max_levels = self.max_levels))]
    pub fn generate(
        &self,
        data: &Dataset,
        ranking: &CueRanking,
        mode: FanMode,
    ) -> Result<Vec<Fft>, FftError> {
        if ranking.is_empty() {
            return Err(FftError::NoUsableCues {
                skipped: ranking.skipped.clone(),
            });
        }
        let depth_limit = self.max_levels.min(ranking.fits.len());

        let mut frontier = vec![GrowthState {
            nodes: Vec::new(),
            remaining: data.all_cases(),
            used: Vec::new(),
        }];
        let mut fan = Vec::new();

        for depth in 1..=depth_limit {
            let grow = depth < depth_limit;
            let expanded: Vec<(Option<Fft>, Vec<GrowthState>)> = frontier
                .into_par_iter()
                .map(|state| self.expand(data, ranking, mode, state, grow))
                .collect::<Result<_, _>>()?;

            frontier = Vec::new();
            for (tree, children) in expanded {
                fan.extend(tree);
                frontier.extend(children);
            }
            debug!(depth, n_trees = fan.len(), frontier = frontier.len(), "fan depth done");
            if frontier.is_empty() {
                break;
            }
        }

        info!(n_trees = fan.len(), depth_limit, "fan generated");
        Ok(fan)
    }

    fn expand(
        &self,
        data: &Dataset,
        ranking: &CueRanking,
        mode: FanMode,
        state: GrowthState,
        grow: bool,
    ) -> Result<(Option<Fft>, Vec<GrowthState>), FftError> {
        let level = state.nodes.len();
        let fit = match (mode, level) {
            (FanMode::Global, _) | (FanMode::Conditional, 0) => ranking.fits.get(level).cloned(),
            (FanMode::Conditional, _) if state.remaining.is_empty() => None,
            (FanMode::Conditional, _) => {
                rank_cues(self.finder, data, &state.remaining, &state.used)
                    .fits
                    .into_iter()
                    .next()
            }
        };
        let Some(fit) = fit else {
            return Ok((None, Vec::new()));
        };

        let mut nodes = state.nodes.clone();
        nodes.push(Node::terminal(&fit, majority(data.outcomes(), &state.remaining)));
        let tree = Fft::new(nodes);

        let mut children = Vec::new();
        if grow {
            for exit in [ExitOn::Positive, ExitOn::Negative] {
                children.push(child(data, &state, &fit, exit)?);
            }
        }
        Ok((Some(tree), children))
    }
}

/// Extend `state` with a node exiting on `exit`, keeping the deferred cases.
fn child(
    data: &Dataset,
    state: &GrowthState,
    fit: &CueFit,
    exit: ExitOn,
) -> Result<GrowthState, FftError> {
    let node = Node::exiting(fit, exit);
    let test = node.threshold.resolve(&node.cue_name, data.cue(fit.cue).values())?;
    let remaining = state
        .remaining
        .iter()
        .copied()
        .filter(|&c| node.decide(test.test(c)).is_none())
        .collect();

    let mut nodes = state.nodes.clone();
    nodes.push(node);
    let mut used = state.used.clone();
    used.push(fit.cue);
    Ok(GrowthState {
        nodes,
        remaining,
        used,
    })
}
