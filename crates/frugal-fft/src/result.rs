//! Fit result types.

use serde::{Deserialize, Serialize};

use crate::config::Algorithm;
use crate::dataset::Dataset;
use crate::error::FftError;
use crate::finder::CueFit;
use crate::prune::StoppingRule;
use crate::rank::{CueRanking, SkippedCue};
use crate::select::RankedTree;
use crate::stats::{CostModel, Goal, Scoring};
use crate::tree::TreeStats;

/// Metadata about the fit run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitMetadata {
    /// Construction strategy used.
    pub algorithm: Algorithm,
    /// Selection goal.
    pub goal: Goal,
    /// Chase goal.
    pub goal_chase: Goal,
    /// Configured level limit.
    pub max_levels: usize,
    /// Pruning rule applied to every grown tree.
    pub stopping_rule: StoppingRule,
    /// Parameter of the pruning rule.
    pub stopping_par: f64,
    /// Sensitivity weight used by weighted accuracy.
    pub sens_w: f64,
    /// Outcome and cue costs used by every statistic.
    pub costs: CostModel,
    /// Number of training cases.
    pub n_train: usize,
    /// Number of test cases, when a test set was supplied.
    pub n_test: Option<usize>,
    /// Number of cue columns.
    pub n_cues: usize,
    /// Number of cues that could be fitted.
    pub n_usable_cues: usize,
    /// Number of trees grown before pruning.
    pub fan_size: usize,
    /// Number of distinct trees after pruning.
    pub n_candidates: usize,
}

/// Result of fast-and-frugal tree construction.
///
/// Holds every candidate tree in rank order, the whole-dataset cue ranking,
/// and run metadata.
#[derive(Debug, Clone)]
pub struct FftResult {
    trees: Vec<RankedTree>,
    ranking: CueRanking,
    metadata: FitMetadata,
    scoring: Scoring,
}

impl FftResult {
    /// Create a new fit result.
    pub(crate) fn new(
        trees: Vec<RankedTree>,
        ranking: CueRanking,
        metadata: FitMetadata,
        scoring: Scoring,
    ) -> Self {
        Self {
            trees,
            ranking,
            metadata,
            scoring,
        }
    }

    /// Return every tree, best first.
    #[must_use]
    pub fn trees(&self) -> &[RankedTree] {
        &self.trees
    }

    /// Return the top-ranked tree.
    #[must_use]
    pub fn best(&self) -> Option<&RankedTree> {
        self.trees.first()
    }

    /// Return the cue fits over all training cases, best first.
    #[must_use]
    pub fn cue_fits(&self) -> &[CueFit] {
        &self.ranking.fits
    }

    /// Return the cues that could not be fitted.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedCue] {
        &self.ranking.skipped
    }

    /// Return the whole-dataset cue ranking.
    #[must_use]
    pub fn cue_ranking(&self) -> &CueRanking {
        &self.ranking
    }

    /// Return run metadata.
    #[must_use]
    pub fn metadata(&self) -> &FitMetadata {
        &self.metadata
    }

    /// Return the scoring context used for every statistic.
    #[must_use]
    pub fn scoring(&self) -> &Scoring {
        &self.scoring
    }

    /// Evaluate every ranked tree on `data`, in rank order.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`FftError::MissingCue`] | `data` lacks a cue a tree uses |
    /// | [`FftError::CueKindMismatch`] | a cue has a different kind in `data` |
    pub fn evaluate(&self, data: &Dataset) -> Result<Vec<TreeStats>, FftError> {
        self.trees
            .iter()
            .map(|r| r.tree.evaluate(data, &self.scoring))
            .collect()
    }

    /// Predict `data` with the top-ranked tree.
    ///
    /// # Errors
    ///
    /// Same as [`FftResult::evaluate`].
    pub fn predict(&self, data: &Dataset) -> Result<Vec<bool>, FftError> {
        match self.best() {
            Some(best) => best.tree.predict(data),
            None => Ok(Vec::new()),
        }
    }
}
