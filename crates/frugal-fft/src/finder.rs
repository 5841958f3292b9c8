//! Per-cue threshold search.
//!
//! For a numeric cue every observed value is a candidate cutoff and all four
//! directions are tried; candidates that put every case on one side are not
//! considered. The best (direction, cutoff) by the chase goal wins, ties
//! going to the smaller cutoff and then to the direction declared first in
//! [`Direction`].
//!
//! Categorical cues need a subset of levels. Exact search is exponential in
//! the level count, so the default [`GreedyPrefix`] ranks levels by their
//! positive rate and only tries prefixes of that ranking. It is an
//! approximation and can miss the optimal subset. [`ExhaustiveSubsets`] is a
//! drop-in brute-force replacement for cues with few levels.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dataset::{CueIndex, CueValues, Dataset};
use crate::rank::SkipReason;
use crate::stats::{ConfusionStats, Counts, Goal, Scoring, compare_scores};
use crate::threshold::{Direction, Threshold};

/// The best threshold found for one cue over one set of cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueFit {
    /// Column of the cue in the fitted dataset.
    pub cue: CueIndex,
    /// Cue name.
    pub name: String,
    /// Best threshold.
    pub threshold: Threshold,
    /// Statistics of classifying the searched cases by this threshold alone.
    ///
    /// Cases with a missing value are not counted.
    pub stats: ConfusionStats,
}

/// Positive/negative tally of the searched cases for one categorical level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelTally {
    /// Level code within the column.
    pub code: usize,
    /// Positive cases at this level.
    pub positives: usize,
    /// Negative cases at this level.
    pub negatives: usize,
}

impl LevelTally {
    fn positive_rate(&self) -> f64 {
        self.positives as f64 / (self.positives + self.negatives) as f64
    }
}

/// Strategy choosing which categorical levels signal positive.
pub trait PredicateSearch: fmt::Debug + Send + Sync {
    /// Pick a non-empty proper subset of the tallied levels.
    ///
    /// `tallies` holds at least two levels, each with at least one case,
    /// in ascending code order. `score` rates the confusion counts of a
    /// candidate subset (higher is better, `None` is worst). Returns the
    /// chosen level codes.
    fn search(&self, tallies: &[LevelTally], score: &dyn Fn(Counts) -> Option<f64>) -> Vec<usize>;
}

/// Greedy prefix search over levels ranked by positive rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyPrefix;

impl PredicateSearch for GreedyPrefix {
    fn search(&self, tallies: &[LevelTally], score: &dyn Fn(Counts) -> Option<f64>) -> Vec<usize> {
        let mut order: Vec<&LevelTally> = tallies.iter().collect();
        order.sort_by(|a, b| {
            b.positive_rate()
                .total_cmp(&a.positive_rate())
                .then(a.code.cmp(&b.code))
        });

        let total = totals(tallies);
        let mut inside = Counts::default();
        let mut best: Option<(usize, Option<f64>)> = None;

        for (i, tally) in order.iter().take(order.len() - 1).enumerate() {
            inside.hi += tally.positives;
            inside.fa += tally.negatives;
            let s = score(complete(inside, total));
            if best.is_none_or(|(_, b)| compare_scores(s, b).is_gt()) {
                best = Some((i + 1, s));
            }
        }

        let len = best.map_or(1, |(len, _)| len);
        let mut codes: Vec<usize> = order[..len].iter().map(|t| t.code).collect();
        codes.sort_unstable();
        codes
    }
}

/// Brute-force search over every level subset.
///
/// Falls back to [`GreedyPrefix`] above `max_levels` distinct levels.
#[derive(Debug, Clone, Copy)]
pub struct ExhaustiveSubsets {
    max_levels: usize,
}

impl ExhaustiveSubsets {
    /// Hard ceiling on `max_levels`.
    pub const LIMIT: usize = 16;

    /// Search exhaustively for cues with at most `max_levels` levels (capped at [`Self::LIMIT`]).
    #[must_use]
    pub fn new(max_levels: usize) -> Self {
        Self {
            max_levels: max_levels.min(Self::LIMIT),
        }
    }
}

impl PredicateSearch for ExhaustiveSubsets {
    fn search(&self, tallies: &[LevelTally], score: &dyn Fn(Counts) -> Option<f64>) -> Vec<usize> {
        let k = tallies.len();
        if k > self.max_levels {
            return GreedyPrefix.search(tallies, score);
        }

        let total = totals(tallies);
        let mut best: Option<(u32, Option<f64>)> = None;

        for mask in 1u32..(1u32 << k) - 1 {
            let mut inside = Counts::default();
            for (bit, tally) in tallies.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    inside.hi += tally.positives;
                    inside.fa += tally.negatives;
                }
            }
            let s = score(complete(inside, total));
            let better = match best {
                None => true,
                Some((b_mask, b_score)) => compare_scores(s, b_score)
                    .then_with(|| b_mask.count_ones().cmp(&mask.count_ones()))
                    .then_with(|| {
                        // Lexicographically smaller level list wins.
                        let diff = mask ^ b_mask;
                        let lowest = diff & diff.wrapping_neg();
                        if mask & lowest != 0 {
                            std::cmp::Ordering::Greater
                        } else {
                            std::cmp::Ordering::Less
                        }
                    })
                    .is_gt(),
            };
            if better {
                best = Some((mask, s));
            }
        }

        let mask = best.map_or(1, |(m, _)| m);
        tallies
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, t)| t.code)
            .collect()
    }
}

/// Total positives in `hi` and negatives in `fa`.
fn totals(tallies: &[LevelTally]) -> Counts {
    tallies.iter().fold(Counts::default(), |mut acc, t| {
        acc.hi += t.positives;
        acc.fa += t.negatives;
        acc
    })
}

/// Fill misses and correct rejections from the totals.
fn complete(inside: Counts, total: Counts) -> Counts {
    Counts {
        hi: inside.hi,
        fa: inside.fa,
        mi: total.hi - inside.hi,
        cr: total.fa - inside.fa,
    }
}

/// Finds the threshold maximizing the chase goal for one cue.
#[derive(Debug, Clone)]
pub struct ThresholdFinder {
    goal: Goal,
    scoring: Scoring,
    predicate_search: Arc<dyn PredicateSearch>,
}

impl ThresholdFinder {
    /// Create a finder using greedy categorical search.
    #[must_use]
    pub fn new(goal: Goal, scoring: Scoring) -> Self {
        Self {
            goal,
            scoring,
            predicate_search: Arc::new(GreedyPrefix),
        }
    }

    /// Replace the categorical predicate search strategy.
    #[must_use]
    pub fn with_predicate_search(mut self, search: Arc<dyn PredicateSearch>) -> Self {
        self.predicate_search = search;
        self
    }

    /// Return the goal being maximized.
    #[must_use]
    pub fn goal(&self) -> Goal {
        self.goal
    }

    /// Return the scoring context.
    #[must_use]
    pub fn scoring(&self) -> &Scoring {
        &self.scoring
    }

    /// Find the best threshold for `cue` over `cases`.
    ///
    /// Cases whose value is missing are ignored. Each considered case is
    /// charged the cue's usage cost once.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SkipReason::AllMissing`] | every considered value is missing |
    /// | [`SkipReason::Constant`] | the present values admit no split |
    pub fn fit_cue(
        &self,
        data: &Dataset,
        cue: CueIndex,
        cases: &[usize],
    ) -> Result<CueFit, SkipReason> {
        let column = data.cue(cue);
        let outcomes = data.outcomes();
        let unit_cost = self.scoring.costs().cue_cost(column.name());

        let (threshold, counts) = match column.values() {
            CueValues::Numeric(values) => self.search_numeric(values, outcomes, cases, unit_cost)?,
            CueValues::Categorical { levels, codes } => {
                self.search_categorical(levels, codes, outcomes, cases, unit_cost)?
            }
        };

        let stats = self.scoring.stats(counts, unit_cost * counts.n() as f64);
        Ok(CueFit {
            cue,
            name: column.name().to_string(),
            threshold,
            stats,
        })
    }

    fn score(&self, counts: Counts, unit_cost: f64) -> Option<f64> {
        let stats = self.scoring.stats(counts, unit_cost * counts.n() as f64);
        self.goal.score(&stats)
    }

    fn search_numeric(
        &self,
        values: &[Option<f64>],
        outcomes: &[bool],
        cases: &[usize],
        unit_cost: f64,
    ) -> Result<(Threshold, Counts), SkipReason> {
        let mut present: Vec<(f64, bool)> = cases
            .iter()
            .filter_map(|&c| values[c].map(|v| (v, outcomes[c])))
            .collect();
        if present.is_empty() {
            return Err(SkipReason::AllMissing);
        }
        present.sort_by(|a, b| a.0.total_cmp(&b.0));

        // Distinct values with their class tallies, ascending.
        let mut distinct: Vec<(f64, usize, usize)> = Vec::new();
        for (v, outcome) in present {
            match distinct.last_mut() {
                Some(last) if last.0 == v => {
                    if outcome {
                        last.1 += 1;
                    } else {
                        last.2 += 1;
                    }
                }
                _ => distinct.push((v, usize::from(outcome), usize::from(!outcome))),
            }
        }
        if distinct.len() < 2 {
            return Err(SkipReason::Constant);
        }

        let total = distinct.iter().fold(Counts::default(), |mut acc, &(_, p, n)| {
            acc.hi += p;
            acc.fa += n;
            acc
        });
        let last = distinct.len() - 1;

        // `below` holds the tallies of values strictly below the current cutoff.
        let mut below = Counts::default();
        let mut best: Option<(Direction, f64, Counts, Option<f64>)> = None;

        for (i, &(cutoff, pos, neg)) in distinct.iter().enumerate() {
            let at_or_below = Counts {
                hi: below.hi + pos,
                fa: below.fa + neg,
                ..Counts::default()
            };
            for direction in Direction::ALL {
                let inside = match direction {
                    Direction::Above if i < last => flip(at_or_below, total),
                    Direction::AtOrAbove if i > 0 => flip(below, total),
                    Direction::Below if i > 0 => below,
                    Direction::AtOrBelow if i < last => at_or_below,
                    _ => continue,
                };
                let counts = complete(inside, total);
                let s = self.score(counts, unit_cost);
                if best
                    .as_ref()
                    .is_none_or(|(.., b)| compare_scores(s, *b).is_gt())
                {
                    best = Some((direction, cutoff, counts, s));
                }
            }
            below = at_or_below;
        }

        let (direction, cutoff, counts, _) = best.ok_or(SkipReason::Constant)?;
        Ok((Threshold::Numeric { direction, cutoff }, counts))
    }

    fn search_categorical(
        &self,
        levels: &[String],
        codes: &[Option<usize>],
        outcomes: &[bool],
        cases: &[usize],
        unit_cost: f64,
    ) -> Result<(Threshold, Counts), SkipReason> {
        let mut tallies: Vec<LevelTally> = (0..levels.len())
            .map(|code| LevelTally {
                code,
                positives: 0,
                negatives: 0,
            })
            .collect();
        let mut any_present = false;
        for &c in cases {
            if let Some(code) = codes[c] {
                any_present = true;
                if outcomes[c] {
                    tallies[code].positives += 1;
                } else {
                    tallies[code].negatives += 1;
                }
            }
        }
        if !any_present {
            return Err(SkipReason::AllMissing);
        }
        tallies.retain(|t| t.positives + t.negatives > 0);
        if tallies.len() < 2 {
            return Err(SkipReason::Constant);
        }

        let score = |counts: Counts| self.score(counts, unit_cost);
        let mut chosen = self.predicate_search.search(&tallies, &score);
        chosen.sort_unstable();
        chosen.dedup();

        let total = totals(&tallies);
        let inside = tallies
            .iter()
            .filter(|t| chosen.binary_search(&t.code).is_ok())
            .fold(Counts::default(), |mut acc, t| {
                acc.hi += t.positives;
                acc.fa += t.negatives;
                acc
            });

        let threshold = Threshold::Categorical {
            levels: chosen.iter().map(|&code| levels[code].clone()).collect(),
        };
        Ok((threshold, complete(inside, total)))
    }
}

/// Tallies of the complement of `part` within `total`.
fn flip(part: Counts, total: Counts) -> Counts {
    Counts {
        hi: total.hi - part.hi,
        fa: total.fa - part.fa,
        ..Counts::default()
    }
}
