//! Cue ranking: fit every cue, then order the fits by the chase goal.

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::{CueIndex, Dataset};
use crate::finder::{CueFit, ThresholdFinder};
use crate::stats::compare_scores;

/// Why a cue was left out of ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The considered values admit no split.
    Constant,
    /// Every considered value is missing.
    AllMissing,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Constant => f.write_str("constant value"),
            SkipReason::AllMissing => f.write_str("all values missing"),
        }
    }
}

/// A cue left out of ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCue {
    /// Cue name.
    pub name: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Cue fits ordered best first, plus the cues that could not be fitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CueRanking {
    /// Fits in descending goal order; ties keep dataset column order.
    pub fits: Vec<CueFit>,
    /// Skipped cues in dataset column order.
    pub skipped: Vec<SkippedCue>,
}

impl CueRanking {
    /// Return the best fit, if any cue was usable.
    #[must_use]
    pub fn best(&self) -> Option<&CueFit> {
        self.fits.first()
    }

    /// Return `true` when no cue could be fitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fits.is_empty()
    }
}

/// Fit and rank every cue not in `exclude` over `cases`.
///
/// Cues are fitted in parallel. The result does not depend on the
/// thread count.
pub fn rank_cues(
    finder: &ThresholdFinder,
    data: &Dataset,
    cases: &[usize],
    exclude: &[CueIndex],
) -> CueRanking {
    let candidates: Vec<CueIndex> = data
        .cue_indices()
        .filter(|c| !exclude.contains(c))
        .collect();

    let results: Vec<_> = candidates
        .into_par_iter()
        .map(|cue| (cue, finder.fit_cue(data, cue, cases)))
        .collect();

    let mut ranking = CueRanking::default();
    for (cue, result) in results {
        match result {
            Ok(fit) => ranking.fits.push(fit),
            Err(reason) => ranking.skipped.push(SkippedCue {
                name: data.cue(cue).name().to_string(),
                reason,
            }),
        }
    }

    let goal = finder.goal();
    // Stable sort keeps column order among equal scores.
    ranking
        .fits
        .sort_by(|a, b| compare_scores(goal.score(&b.stats), goal.score(&a.stats)));

    debug!(
        n_cases = cases.len(),
        n_fitted = ranking.fits.len(),
        n_skipped = ranking.skipped.len(),
        "ranked cues"
    );
    ranking
}

/// Log each skipped cue once.
pub(crate) fn warn_skipped(skipped: &[SkippedCue]) {
    for s in skipped {
        warn!(cue = %s.name, reason = %s.reason, "skipping cue");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Cue;
    use crate::stats::{Goal, Scoring};

    fn data() -> Dataset {
        let outcomes = vec![false, false, false, true, true, true];
        Dataset::new(
            "y",
            outcomes,
            vec![
                // Half right.
                Cue::numeric(
                    "weak",
                    vec![Some(1.0), Some(2.0), Some(3.0), Some(1.0), Some(2.0), Some(3.0)],
                ),
                Cue::numeric("flat", vec![Some(7.0); 6]),
                // Perfect separation.
                Cue::numeric(
                    "strong",
                    vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(6.0)],
                ),
                Cue::numeric("empty", vec![None; 6]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn strongest_cue_first() {
        let ds = data();
        let finder = ThresholdFinder::new(Goal::Bacc, Scoring::default());
        let ranking = rank_cues(&finder, &ds, &ds.all_cases(), &[]);
        let names: Vec<&str> = ranking.fits.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["strong", "weak"]);
        assert_eq!(ranking.best().unwrap().cue, CueIndex::new(2));
    }

    #[test]
    fn degenerate_cues_reported() {
        let ds = data();
        let finder = ThresholdFinder::new(Goal::Bacc, Scoring::default());
        let ranking = rank_cues(&finder, &ds, &ds.all_cases(), &[]);
        assert_eq!(
            ranking.skipped,
            vec![
                SkippedCue {
                    name: "flat".to_string(),
                    reason: SkipReason::Constant
                },
                SkippedCue {
                    name: "empty".to_string(),
                    reason: SkipReason::AllMissing
                },
            ]
        );
    }

    #[test]
    fn excluded_cues_not_fitted() {
        let ds = data();
        let finder = ThresholdFinder::new(Goal::Bacc, Scoring::default());
        let ranking = rank_cues(&finder, &ds, &ds.all_cases(), &[CueIndex::new(2)]);
        assert_eq!(ranking.fits.len(), 1);
        assert_eq!(ranking.fits[0].name, "weak");
    }

    #[test]
    fn equal_scores_keep_column_order() {
        let outcomes = vec![false, true, false, true];
        let ds = Dataset::new(
            "y",
            outcomes,
            vec![
                Cue::numeric("b", vec![Some(0.0), Some(1.0), Some(0.0), Some(1.0)]),
                Cue::numeric("a", vec![Some(0.0), Some(1.0), Some(0.0), Some(1.0)]),
            ],
        )
        .unwrap();
        let finder = ThresholdFinder::new(Goal::Acc, Scoring::default());
        let ranking = rank_cues(&finder, &ds, &ds.all_cases(), &[]);
        assert_eq!(ranking.fits[0].name, "b");
        assert_eq!(ranking.fits[1].name, "a");
    }

    #[test]
    fn skip_reason_display() {
        assert_eq!(SkipReason::Constant.to_string(), "constant value");
        assert_eq!(SkipReason::AllMissing.to_string(), "all values missing");
    }
}
