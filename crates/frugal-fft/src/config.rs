//! Configuration builder and the `fit` entry point.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::dataset::Dataset;
use crate::error::FftError;
use crate::fan::{FanGenerator, FanMode};
use crate::finder::{GreedyPrefix, PredicateSearch, ThresholdFinder};
use crate::prune::{Pruner, StoppingRule};
use crate::rank::{CueRanking, rank_cues, warn_skipped};
use crate::result::{FftResult, FitMetadata};
use crate::select::TreeSelector;
use crate::single::{MaxPolicy, SingleTreeBuilder, ZigzagPolicy};
use crate::stats::{CostModel, Goal, Scoring};

/// Tree construction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Fan over the whole-dataset cue ranking.
    Global,
    /// Fan with cues and thresholds re-fitted per path.
    Conditional,
    /// One tree exiting on the more reliable branch at each level.
    Max,
    /// One tree alternating positive and negative exits.
    Zigzag,
}

impl FromStr for Algorithm {
    type Err = FftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(Algorithm::Global),
            "conditional" => Ok(Algorithm::Conditional),
            "max" => Ok(Algorithm::Max),
            "zigzag" => Ok(Algorithm::Zigzag),
            _ => Err(FftError::UnknownAlgorithm {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Global => "global",
            Algorithm::Conditional => "conditional",
            Algorithm::Max => "max",
            Algorithm::Zigzag => "zigzag",
        };
        f.write_str(name)
    }
}

/// Configuration for fast-and-frugal tree construction.
///
/// Construct via [`FftConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter          | Default              |
/// |--------------------|----------------------|
/// | `max_levels`       | 4                    |
/// | `algorithm`        | `Conditional`        |
/// | `goal`             | `Bacc`               |
/// | `goal_chase`       | `Bacc`               |
/// | `stopping_rule`    | `PopulationFraction` |
/// | `stopping_par`     | 0.10                 |
/// | `sens_w`           | 0.5                  |
/// | `costs`            | all zero             |
/// | `predicate_search` | [`GreedyPrefix`]     |
#[derive(Debug, Clone)]
pub struct FftConfig {
    pub(crate) max_levels: usize,
    pub(crate) algorithm: Algorithm,
    pub(crate) goal: Goal,
    pub(crate) goal_chase: Goal,
    pub(crate) stopping_rule: StoppingRule,
    pub(crate) stopping_par: f64,
    pub(crate) sens_w: f64,
    pub(crate) costs: CostModel,
    pub(crate) predicate_search: Arc<dyn PredicateSearch>,
}

impl FftConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_levels: 4,
            algorithm: Algorithm::Conditional,
            goal: Goal::Bacc,
            goal_chase: Goal::Bacc,
            stopping_rule: StoppingRule::PopulationFraction,
            stopping_par: 0.10,
            sens_w: 0.5,
            costs: CostModel::new(),
            predicate_search: Arc::new(GreedyPrefix),
        }
    }

    /// Set the maximum number of levels per tree.
    #[must_use]
    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    /// Set the construction strategy.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the statistic used to select the final tree.
    #[must_use]
    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goal = goal;
        self
    }

    /// Set the statistic maximized by threshold search and cue ranking.
    #[must_use]
    pub fn with_goal_chase(mut self, goal_chase: Goal) -> Self {
        self.goal_chase = goal_chase;
        self
    }

    /// Set the pruning rule.
    #[must_use]
    pub fn with_stopping_rule(mut self, stopping_rule: StoppingRule) -> Self {
        self.stopping_rule = stopping_rule;
        self
    }

    /// Set the pruning parameter. Must be in [0.0, 1.0].
    #[must_use]
    pub fn with_stopping_par(mut self, stopping_par: f64) -> Self {
        self.stopping_par = stopping_par;
        self
    }

    /// Set the sensitivity weight used by weighted accuracy.
    #[must_use]
    pub fn with_sens_w(mut self, sens_w: f64) -> Self {
        self.sens_w = sens_w;
        self
    }

    /// Set outcome and cue costs.
    #[must_use]
    pub fn with_costs(mut self, costs: CostModel) -> Self {
        self.costs = costs;
        self
    }

    /// Set the categorical predicate search strategy.
    #[must_use]
    pub fn with_predicate_search(mut self, search: Arc<dyn PredicateSearch>) -> Self {
        self.predicate_search = search;
        self
    }

    // --- Getters ---

    /// Return the maximum number of levels.
    #[must_use]
    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Return the construction strategy.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Return the selection goal.
    #[must_use]
    pub fn goal(&self) -> Goal {
        self.goal
    }

    /// Return the chase goal.
    #[must_use]
    pub fn goal_chase(&self) -> Goal {
        self.goal_chase
    }

    /// Return the pruning rule.
    #[must_use]
    pub fn stopping_rule(&self) -> StoppingRule {
        self.stopping_rule
    }

    /// Return the pruning parameter.
    #[must_use]
    pub fn stopping_par(&self) -> f64 {
        self.stopping_par
    }

    /// Return the sensitivity weight.
    #[must_use]
    pub fn sens_w(&self) -> f64 {
        self.sens_w
    }

    /// Return the cost model.
    #[must_use]
    pub fn costs(&self) -> &CostModel {
        &self.costs
    }

    /// Return the scoring context these settings describe.
    #[must_use]
    pub fn scoring(&self) -> Scoring {
        Scoring::new(self.sens_w, self.costs.clone())
    }

    fn finder(&self) -> ThresholdFinder {
        ThresholdFinder::new(self.goal_chase, self.scoring())
            .with_predicate_search(Arc::clone(&self.predicate_search))
    }

    fn validate(&self, data: &Dataset) -> Result<(), FftError> {
        if self.max_levels == 0 {
            return Err(FftError::InvalidMaxLevels {
                max_levels: self.max_levels,
            });
        }
        if !(0.0..=1.0).contains(&self.stopping_par) {
            return Err(FftError::InvalidStoppingPar {
                value: self.stopping_par,
            });
        }
        if !(0.0..=1.0).contains(&self.sens_w) {
            return Err(FftError::InvalidSensitivityWeight { value: self.sens_w });
        }
        if let Some(name) = self
            .costs
            .cue_costs()
            .keys()
            .find(|name| data.cue_index(name).is_none())
        {
            return Err(FftError::UnknownCostCue { name: name.clone() });
        }
        Ok(())
    }

    /// Rank every cue of `data` by the chase goal over all cases.
    ///
    /// Degenerate cues are reported in [`CueRanking::skipped`].
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`FftError::InvalidMaxLevels`] | `max_levels` is zero |
    /// | [`FftError::InvalidStoppingPar`] | `stopping_par` is outside [0.0, 1.0] |
    /// | [`FftError::InvalidSensitivityWeight`] | `sens_w` is outside [0.0, 1.0] |
    /// | [`FftError::UnknownCostCue`] | a cue cost names a cue `data` lacks |
    #[instrument(skip_all, fields(n_cases = data.n_cases(), n_cues = data.n_cues()))]
    pub fn rank_cues(&self, data: &Dataset) -> Result<CueRanking, FftError> {
        self.validate(data)?;
        let ranking = rank_cues(&self.finder(), data, &data.all_cases(), &[]);
        warn_skipped(&ranking.skipped);
        Ok(ranking)
    }

    /// Build, prune, and rank trees on `train`.
    ///
    /// When `test` is given, every ranked tree is also evaluated on it.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`FftError::InvalidMaxLevels`] | `max_levels` is zero |
    /// | [`FftError::InvalidStoppingPar`] | `stopping_par` is outside [0.0, 1.0] |
    /// | [`FftError::InvalidSensitivityWeight`] | `sens_w` is outside [0.0, 1.0] |
    /// | [`FftError::UnknownCostCue`] | a cue cost names a cue `train` lacks |
    /// | [`FftError::NoUsableCues`] | every cue was skipped |
    /// | [`FftError::MissingCue`] | `test` lacks a cue a tree uses |
    /// | [`FftError::CueKindMismatch`] | a cue has a different kind in `test` |
    #[instrument(skip_all, fields(
        algorithm = %self.algorithm,
        n_train = train.n_cases(),
        n_test = ?test.map(Dataset::n_cases)
    ))]
    pub fn fit(&self, train: &Dataset, test: Option<&Dataset>) -> Result<FftResult, FftError> {
        self.validate(train)?;
        let scoring = self.scoring();
        let finder = self.finder();

        info!(
            algorithm = %self.algorithm,
            goal = %self.goal,
            goal_chase = %self.goal_chase,
            max_levels = self.max_levels,
            n_cues = train.n_cues(),
            "fitting fast-and-frugal trees"
        );

        let ranking = rank_cues(&finder, train, &train.all_cases(), &[]);
        warn_skipped(&ranking.skipped);
        if ranking.is_empty() {
            return Err(FftError::NoUsableCues {
                skipped: ranking.skipped,
            });
        }
        info!(
            n_usable = ranking.fits.len(),
            n_skipped = ranking.skipped.len(),
            "cues ranked"
        );

        let fan = match self.algorithm {
            Algorithm::Global => {
                FanGenerator::new(&finder, self.max_levels).generate(train, &ranking, FanMode::Global)?
            }
            Algorithm::Conditional => FanGenerator::new(&finder, self.max_levels).generate(
                train,
                &ranking,
                FanMode::Conditional,
            )?,
            Algorithm::Max => vec![
                SingleTreeBuilder::new(&finder, &MaxPolicy, self.max_levels).build(train, &ranking)?,
            ],
            Algorithm::Zigzag => vec![
                SingleTreeBuilder::new(&finder, &ZigzagPolicy, self.max_levels)
                    .build(train, &ranking)?,
            ],
        };

        let pruner = Pruner::new(
            self.stopping_rule,
            self.stopping_par,
            self.goal_chase,
            scoring.clone(),
        );
        let candidates = pruner.prune_fan(&fan, train)?;
        let n_candidates = candidates.len();

        let trees = TreeSelector::new(self.goal, scoring.clone()).select(candidates, train, test)?;

        let metadata = FitMetadata {
            algorithm: self.algorithm,
            goal: self.goal,
            goal_chase: self.goal_chase,
            max_levels: self.max_levels,
            stopping_rule: self.stopping_rule,
            stopping_par: self.stopping_par,
            sens_w: self.sens_w,
            costs: self.costs.clone(),
            n_train: train.n_cases(),
            n_test: test.map(Dataset::n_cases),
            n_cues: train.n_cues(),
            n_usable_cues: ranking.fits.len(),
            fan_size: fan.len(),
            n_candidates,
        };
        info!(fan_size = fan.len(), n_candidates, "fit complete");

        Ok(FftResult::new(trees, ranking, metadata, scoring))
    }
}

impl Default for FftConfig {
    fn default() -> Self {
        Self::new()
    }
}
