//! Fast-and-frugal trees: construct, prune, select, predict.
//!
//! Builds small ordered decision procedures for a binary outcome, where
//! each level tests one cue and may decide immediately or pass the case
//! on. Provides per-cue threshold search with pluggable categorical
//! predicate search, cue ranking, global and conditional fan enumeration,
//! max and zigzag single-tree builders, pruning, cost-aware evaluation,
//! and goal-based tree selection. Cue fitting and tree evaluation run in
//! parallel via rayon with deterministic results.

mod config;
mod dataset;
mod error;
mod fan;
mod finder;
mod node;
mod prune;
mod rank;
mod result;
mod select;
mod single;
mod stats;
mod threshold;
mod tree;

pub use config::{Algorithm, FftConfig};
pub use dataset::{Cue, CueIndex, CueValues, Dataset, binary_outcomes};
pub use error::{ErrorKind, FftError};
pub use fan::{FanGenerator, FanMode};
pub use finder::{CueFit, ExhaustiveSubsets, GreedyPrefix, LevelTally, PredicateSearch, ThresholdFinder};
pub use node::{ExitOn, Node};
pub use prune::{Pruner, StoppingRule};
pub use rank::{CueRanking, SkipReason, SkippedCue, rank_cues};
pub use result::{FftResult, FitMetadata};
pub use select::{RankedTree, TreeSelector};
pub use single::{ExitPolicy, MaxPolicy, SingleTreeBuilder, ZigzagPolicy};
pub use stats::{
    ConfusionStats, CostModel, Counts, Goal, OutcomeCosts, Scoring, compare_scores,
    inverse_normal_cdf,
};
pub use threshold::{Direction, ResolvedTest, Threshold};
pub use tree::{Classification, Fft, LevelStats, TreeStats};
