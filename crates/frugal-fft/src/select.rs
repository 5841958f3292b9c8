//! Tree selection: evaluate candidates and rank them by the goal.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::dataset::Dataset;
use crate::error::FftError;
use crate::stats::{Goal, Scoring, compare_scores};
use crate::tree::{Fft, TreeStats};

/// A candidate tree with its rank and performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTree {
    /// One-based rank; 1 is best.
    pub rank: usize,
    /// Position of the unpruned tree in the fan.
    pub fan_index: usize,
    /// The tree.
    pub tree: Fft,
    /// Performance on the construction data.
    pub train: TreeStats,
    /// Performance on held-out data, when supplied.
    pub test: Option<TreeStats>,
}

/// Ranks candidate trees by the goal statistic on the construction data.
///
/// Ties go to fewer levels, then fewer distinct cues, then earlier fan
/// position.
#[derive(Debug, Clone)]
pub struct TreeSelector {
    goal: Goal,
    scoring: Scoring,
}

impl TreeSelector {
    /// Create a selector.
    #[must_use]
    pub fn new(goal: Goal, scoring: Scoring) -> Self {
        Self { goal, scoring }
    }

    /// Evaluate and rank `candidates` given as `(fan_index, tree)` pairs.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`FftError::MissingCue`] | `test` lacks a cue a tree uses |
    /// | [`FftError::CueKindMismatch`] | a cue has a different kind in `test` |
    #[instrument(skip_all, fields(n_candidates = candidates.len(), goal = %self.goal))]
    pub fn select(
        &self,
        candidates: Vec<(usize, Fft)>,
        train: &Dataset,
        test: Option<&Dataset>,
    ) -> Result<Vec<RankedTree>, FftError> {
        let mut ranked: Vec<RankedTree> = candidates
            .into_par_iter()
            .map(|(fan_index, tree)| -> Result<RankedTree, FftError> {
                let train_stats = tree.evaluate(train, &self.scoring)?;
                let test_stats = test
                    .map(|data| tree.evaluate(data, &self.scoring))
                    .transpose()?;
                Ok(RankedTree {
                    rank: 0,
                    fan_index,
                    tree,
                    train: train_stats,
                    test: test_stats,
                })
            })
            .collect::<Result<_, _>>()?;

        ranked.sort_by(|a, b| self.compare(a, b));
        for (i, r) in ranked.iter_mut().enumerate() {
            r.rank = i + 1;
        }

        if let Some(best) = ranked.first() {
            info!(
                fan_index = best.fan_index,
                levels = best.tree.n_levels(),
                score = ?self.goal.score(&best.train.overall),
                "selected tree"
            );
        }
        Ok(ranked)
    }

    /// Better trees order first.
    fn compare(&self, a: &RankedTree, b: &RankedTree) -> Ordering {
        compare_scores(
            self.goal.score(&b.train.overall),
            self.goal.score(&a.train.overall),
        )
        .then_with(|| a.tree.n_levels().cmp(&b.tree.n_levels()))
        .then_with(|| a.tree.n_distinct_cues().cmp(&b.tree.n_distinct_cues()))
        .then_with(|| a.fan_index.cmp(&b.fan_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Cue;
    use crate::fan::{FanGenerator, FanMode};
    use crate::finder::ThresholdFinder;
    use crate::rank::rank_cues;

    fn data() -> Dataset {
        Dataset::new(
            "y",
            vec![true, true, false, false, true, false],
            vec![
                Cue::numeric(
                    "a",
                    vec![Some(5.0), Some(6.0), Some(1.0), Some(2.0), Some(1.5), Some(7.0)],
                ),
                Cue::numeric(
                    "b",
                    vec![Some(1.0), Some(1.0), Some(0.0), Some(0.0), Some(1.0), Some(1.0)],
                ),
            ],
        )
        .unwrap()
    }

    fn candidates(ds: &Dataset) -> Vec<(usize, Fft)> {
        let f = ThresholdFinder::new(Goal::Bacc, Scoring::default());
        let ranking = rank_cues(&f, ds, &ds.all_cases(), &[]);
        FanGenerator::new(&f, 2)
            .generate(ds, &ranking, FanMode::Global)
            .unwrap()
            .into_iter()
            .enumerate()
            .collect()
    }

    #[test]
    fn ranked_descending_with_dense_ranks() {
        let ds = data();
        let selector = TreeSelector::new(Goal::Bacc, Scoring::default());
        let ranked = selector.select(candidates(&ds), &ds, None).unwrap();
        assert_eq!(ranked.len(), 3);
        for (i, r) in ranked.iter().enumerate() {
            assert_eq!(r.rank, i + 1);
            assert!(r.test.is_none());
        }
        for pair in ranked.windows(2) {
            let a = Goal::Bacc.score(&pair[0].train.overall);
            let b = Goal::Bacc.score(&pair[1].train.overall);
            assert!(compare_scores(a, b).is_ge());
        }
    }

    #[test]
    fn equal_scores_keep_fan_order() {
        let ds = data();
        let mut cands = candidates(&ds);
        // Duplicate the one-level tree at a later fan position.
        let single = cands[0].1.clone();
        cands.push((9, single));
        let selector = TreeSelector::new(Goal::Acc, Scoring::default());
        let ranked = selector.select(cands, &ds, None).unwrap();
        let positions: Vec<usize> = ranked
            .iter()
            .filter(|r| r.tree.n_levels() == 1)
            .map(|r| r.fan_index)
            .collect();
        assert_eq!(positions, vec![0, 9]);
    }

    #[test]
    fn test_stats_computed_when_given() {
        let ds = data();
        let selector = TreeSelector::new(Goal::Bacc, Scoring::default());
        let ranked = selector.select(candidates(&ds), &ds, Some(&ds)).unwrap();
        for r in &ranked {
            assert_eq!(r.test.as_ref(), Some(&r.train));
        }
    }
}
