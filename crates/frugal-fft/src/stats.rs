//! Confusion counts and every statistic derived from them.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FftError;

/// The four cells of a binary confusion matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// Positive cases decided positive.
    pub hi: usize,
    /// Negative cases decided positive.
    pub fa: usize,
    /// Positive cases decided negative.
    pub mi: usize,
    /// Negative cases decided negative.
    pub cr: usize,
}

impl Counts {
    /// Tally decisions against outcomes, pairwise.
    #[must_use]
    pub fn from_decisions(decisions: &[bool], outcomes: &[bool]) -> Self {
        let mut counts = Counts::default();
        for (&d, &o) in decisions.iter().zip(outcomes) {
            counts.record(d, o);
        }
        counts
    }

    /// Add one case to the matching cell.
    pub fn record(&mut self, decision: bool, outcome: bool) {
        match (decision, outcome) {
            (true, true) => self.hi += 1,
            (true, false) => self.fa += 1,
            (false, true) => self.mi += 1,
            (false, false) => self.cr += 1,
        }
    }

    /// Total number of cases.
    #[must_use]
    pub fn n(&self) -> usize {
        self.hi + self.fa + self.mi + self.cr
    }
}

impl Add for Counts {
    type Output = Counts;

    fn add(self, rhs: Counts) -> Counts {
        Counts {
            hi: self.hi + rhs.hi,
            fa: self.fa + rhs.fa,
            mi: self.mi + rhs.mi,
            cr: self.cr + rhs.cr,
        }
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Counts) {
        *self = *self + rhs;
    }
}

/// Statistic used to rank thresholds, cues, and trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Goal {
    /// Balanced accuracy: mean of sensitivity and specificity.
    Bacc,
    /// Weighted accuracy: `sens_w * sens + (1 - sens_w) * spec`.
    Wacc,
    /// Raw accuracy.
    Acc,
    /// Sensitivity index `z(hit rate) - z(false alarm rate)`.
    Dprime,
    /// Total cost (lower is better).
    Cost,
}

impl Goal {
    /// Parse a goal name for the given configuration field.
    ///
    /// # Errors
    ///
    /// Returns [`FftError::UnknownGoal`] naming `field` when `name` is unknown.
    pub fn parse(field: &'static str, name: &str) -> Result<Self, FftError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "bacc" => Ok(Goal::Bacc),
            "wacc" => Ok(Goal::Wacc),
            "acc" => Ok(Goal::Acc),
            "dprime" => Ok(Goal::Dprime),
            "cost" => Ok(Goal::Cost),
            _ => Err(FftError::UnknownGoal {
                field,
                name: name.to_string(),
            }),
        }
    }

    /// Return the goal value with higher meaning better.
    ///
    /// Cost is negated. `None` when the statistic is undefined.
    #[must_use]
    pub fn score(self, stats: &ConfusionStats) -> Option<f64> {
        match self {
            Goal::Bacc => stats.bacc,
            Goal::Wacc => stats.wacc,
            Goal::Acc => stats.acc,
            Goal::Dprime => stats.dprime,
            Goal::Cost => Some(-stats.cost),
        }
    }
}

impl FromStr for Goal {
    type Err = FftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Goal::parse("goal", s)
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Goal::Bacc => "bacc",
            Goal::Wacc => "wacc",
            Goal::Acc => "acc",
            Goal::Dprime => "dprime",
            Goal::Cost => "cost",
        };
        f.write_str(name)
    }
}

/// Total order over optional scores: undefined ranks below every defined value.
#[must_use]
pub fn compare_scores(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Cost attached to each confusion outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeCosts {
    /// Cost of a hit.
    pub hit: f64,
    /// Cost of a false alarm.
    pub false_alarm: f64,
    /// Cost of a miss.
    pub miss: f64,
    /// Cost of a correct rejection.
    pub correct_rejection: f64,
}

impl OutcomeCosts {
    fn total(&self, counts: Counts) -> f64 {
        counts.hi as f64 * self.hit
            + counts.fa as f64 * self.false_alarm
            + counts.mi as f64 * self.miss
            + counts.cr as f64 * self.correct_rejection
    }
}

/// Per-outcome costs plus per-cue usage costs.
///
/// A cue's cost is charged once for every case a node using that cue
/// consults. Cues absent from the map cost nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    outcomes: OutcomeCosts,
    cues: BTreeMap<String, f64>,
}

impl CostModel {
    /// Create a zero-cost model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outcome costs from a `[hit, false_alarm, miss, correct_rejection]` slice.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`FftError::InvalidOutcomeCostCount`] | `costs.len() != 4` |
    /// | [`FftError::NonFiniteCost`] | any cost is NaN or infinite |
    pub fn with_outcome_slice(mut self, costs: &[f64]) -> Result<Self, FftError> {
        let [hit, false_alarm, miss, correct_rejection] = costs else {
            return Err(FftError::InvalidOutcomeCostCount { got: costs.len() });
        };
        for (field, value) in [
            ("hit", *hit),
            ("false_alarm", *false_alarm),
            ("miss", *miss),
            ("correct_rejection", *correct_rejection),
        ] {
            if !value.is_finite() {
                return Err(FftError::NonFiniteCost {
                    field: field.to_string(),
                    value,
                });
            }
        }
        self.outcomes = OutcomeCosts {
            hit: *hit,
            false_alarm: *false_alarm,
            miss: *miss,
            correct_rejection: *correct_rejection,
        };
        Ok(self)
    }

    /// Set the usage cost of one cue.
    ///
    /// # Errors
    ///
    /// Returns [`FftError::NonFiniteCost`] when `cost` is NaN or infinite.
    pub fn with_cue_cost(mut self, cue: impl Into<String>, cost: f64) -> Result<Self, FftError> {
        let cue = cue.into();
        if !cost.is_finite() {
            return Err(FftError::NonFiniteCost { field: cue, value: cost });
        }
        self.cues.insert(cue, cost);
        Ok(self)
    }

    /// Return the outcome costs.
    #[must_use]
    pub fn outcomes(&self) -> OutcomeCosts {
        self.outcomes
    }

    /// Return the per-cue costs.
    #[must_use]
    pub fn cue_costs(&self) -> &BTreeMap<String, f64> {
        &self.cues
    }

    /// Return the usage cost of `cue` (0 when unset).
    #[must_use]
    pub fn cue_cost(&self, cue: &str) -> f64 {
        self.cues.get(cue).copied().unwrap_or(0.0)
    }
}

/// Converts confusion counts into [`ConfusionStats`].
#[derive(Debug, Clone, PartialEq)]
pub struct Scoring {
    sens_w: f64,
    costs: CostModel,
}

impl Scoring {
    /// Create a scoring context.
    #[must_use]
    pub fn new(sens_w: f64, costs: CostModel) -> Self {
        Self { sens_w, costs }
    }

    /// Return the sensitivity weight used for weighted accuracy.
    #[must_use]
    pub fn sens_w(&self) -> f64 {
        self.sens_w
    }

    /// Return the cost model.
    #[must_use]
    pub fn costs(&self) -> &CostModel {
        &self.costs
    }

    /// Compute every statistic from `counts` plus the total cue usage cost.
    #[must_use]
    pub fn stats(&self, counts: Counts, cue_cost: f64) -> ConfusionStats {
        ConfusionStats::from_counts(counts, self.sens_w, self.costs.outcomes.total(counts), cue_cost)
    }
}

impl Default for Scoring {
    fn default() -> Self {
        Self::new(0.5, CostModel::default())
    }
}

/// Confusion counts and derived statistics.
///
/// Ratios whose denominator is zero are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionStats {
    /// The four confusion counts.
    pub counts: Counts,
    /// Number of cases.
    pub n: usize,
    /// Hit rate: `hi / (hi + mi)`.
    pub sens: Option<f64>,
    /// Correct rejection rate: `cr / (cr + fa)`.
    pub spec: Option<f64>,
    /// False alarm rate: `fa / (fa + cr)`.
    pub far: Option<f64>,
    /// Positive predictive value: `hi / (hi + fa)`.
    pub ppv: Option<f64>,
    /// Negative predictive value: `cr / (cr + mi)`.
    pub npv: Option<f64>,
    /// Accuracy: `(hi + cr) / n`.
    pub acc: Option<f64>,
    /// Balanced accuracy: `(sens + spec) / 2`.
    pub bacc: Option<f64>,
    /// Weighted accuracy: `w * sens + (1 - w) * spec`.
    pub wacc: Option<f64>,
    /// `z(sens) - z(far)` with boundary rates clamped.
    pub dprime: Option<f64>,
    /// Sum of outcome costs.
    pub cost_outcomes: f64,
    /// Sum of cue usage costs.
    pub cost_cues: f64,
    /// `cost_outcomes + cost_cues`.
    pub cost: f64,
    /// `cost / n`.
    pub mean_cost: Option<f64>,
}

impl ConfusionStats {
    fn from_counts(counts: Counts, sens_w: f64, cost_outcomes: f64, cost_cues: f64) -> Self {
        let n = counts.n();
        let sens = ratio(counts.hi, counts.hi + counts.mi);
        let spec = ratio(counts.cr, counts.cr + counts.fa);
        let far = ratio(counts.fa, counts.fa + counts.cr);
        let ppv = ratio(counts.hi, counts.hi + counts.fa);
        let npv = ratio(counts.cr, counts.cr + counts.mi);
        let acc = ratio(counts.hi + counts.cr, n);

        let (bacc, wacc) = match (sens, spec) {
            (Some(se), Some(sp)) => (
                Some((se + sp) / 2.0),
                Some(sens_w * se + (1.0 - sens_w) * sp),
            ),
            _ => (None, None),
        };

        let dprime = match (
            clamped_rate(counts.hi, counts.hi + counts.mi),
            clamped_rate(counts.fa, counts.fa + counts.cr),
        ) {
            (Some(hr), Some(fr)) => Some(inverse_normal_cdf(hr) - inverse_normal_cdf(fr)),
            _ => None,
        };

        let cost = cost_outcomes + cost_cues;

        Self {
            counts,
            n,
            sens,
            spec,
            far,
            ppv,
            npv,
            acc,
            bacc,
            wacc,
            dprime,
            cost_outcomes,
            cost_cues,
            cost,
            mean_cost: if n == 0 { None } else { Some(cost / n as f64) },
        }
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    if den == 0 {
        None
    } else {
        Some(num as f64 / den as f64)
    }
}

/// Rate with 0 and 1 moved half a case inward so the z-transform stays finite.
fn clamped_rate(num: usize, den: usize) -> Option<f64> {
    if den == 0 {
        return None;
    }
    let d = den as f64;
    let rate = if num == 0 {
        0.5 / d
    } else if num == den {
        (d - 0.5) / d
    } else {
        num as f64 / d
    };
    Some(rate)
}

/// Standard normal quantile function.
///
/// Acklam's rational approximation (relative error below 1.15e-9).
#[must_use]
#[allow(clippy::excessive_precision)]
pub fn inverse_normal_cdf(p: f64) -> f64 {
    let p = p.clamp(1e-15, 1.0 - 1e-15);

    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.02425;

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(hi: usize, fa: usize, mi: usize, cr: usize) -> Counts {
        Counts { hi, fa, mi, cr }
    }

    #[test]
    fn accuracy_family() {
        let s = Scoring::default().stats(counts(30, 10, 20, 40), 0.0);
        assert_eq!(s.n, 100);
        assert!((s.acc.unwrap() - 0.7).abs() < 1e-12);
        assert!((s.sens.unwrap() - 0.6).abs() < 1e-12);
        assert!((s.spec.unwrap() - 0.8).abs() < 1e-12);
        assert!((s.bacc.unwrap() - 0.7).abs() < 1e-12);
        assert!((s.far.unwrap() - 0.2).abs() < 1e-12);
        assert!((s.ppv.unwrap() - 0.75).abs() < 1e-12);
        assert!((s.npv.unwrap() - 40.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn weighted_accuracy_uses_weight() {
        let s = Scoring::new(0.8, CostModel::new()).stats(counts(30, 10, 20, 40), 0.0);
        assert!((s.wacc.unwrap() - (0.8 * 0.6 + 0.2 * 0.8)).abs() < 1e-12);
    }

    #[test]
    fn no_positives_is_undefined() {
        let s = Scoring::default().stats(counts(0, 3, 0, 7), 0.0);
        assert!(s.sens.is_none());
        assert!(s.bacc.is_none());
        assert!(s.dprime.is_none());
        assert!((s.acc.unwrap() - 0.7).abs() < 1e-12);
        assert!(Goal::Bacc.score(&s).is_none());
    }

    #[test]
    fn dprime_clamps_perfect_rates() {
        let s = Scoring::default().stats(counts(10, 0, 0, 10), 0.0);
        let d = s.dprime.unwrap();
        assert!(d.is_finite());
        let expected = inverse_normal_cdf(9.5 / 10.0) - inverse_normal_cdf(0.5 / 10.0);
        assert!((d - expected).abs() < 1e-12);
    }

    #[test]
    fn dprime_matches_z_difference() {
        let s = Scoring::default().stats(counts(84, 16, 16, 84), 0.0);
        // z(0.84) - z(0.16) = 2 * 0.994458
        assert!((s.dprime.unwrap() - 1.988916).abs() < 1e-4);
    }

    #[test]
    fn inverse_normal_known_values() {
        assert!(inverse_normal_cdf(0.5).abs() < 1e-9);
        assert!((inverse_normal_cdf(0.975) - 1.959964).abs() < 1e-5);
        assert!((inverse_normal_cdf(0.01) + 2.326348).abs() < 1e-5);
    }

    #[test]
    fn cost_sums_outcomes_and_cues() {
        let model = CostModel::new()
            .with_outcome_slice(&[0.0, 1.0, 5.0, 0.0])
            .unwrap();
        let s = Scoring::new(0.5, model).stats(counts(5, 2, 3, 10), 4.0);
        assert!((s.cost_outcomes - 17.0).abs() < 1e-12);
        assert!((s.cost - 21.0).abs() < 1e-12);
        assert!((s.mean_cost.unwrap() - 21.0 / 20.0).abs() < 1e-12);
        assert!((Goal::Cost.score(&s).unwrap() + 21.0).abs() < 1e-12);
    }

    #[test]
    fn wrong_cost_vector_length() {
        let err = CostModel::new().with_outcome_slice(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, FftError::InvalidOutcomeCostCount { got: 2 }));
    }

    #[test]
    fn non_finite_cue_cost() {
        let err = CostModel::new().with_cue_cost("age", f64::NAN).unwrap_err();
        assert!(matches!(err, FftError::NonFiniteCost { .. }));
    }

    #[test]
    fn cue_cost_defaults_to_zero() {
        let model = CostModel::new().with_cue_cost("age", 2.5).unwrap();
        assert!((model.cue_cost("age") - 2.5).abs() < f64::EPSILON);
        assert!(model.cue_cost("chol").abs() < f64::EPSILON);
    }

    #[test]
    fn goal_names_parse() {
        assert_eq!("BACC".parse::<Goal>().unwrap(), Goal::Bacc);
        assert_eq!(Goal::parse("goal_chase", "dprime").unwrap(), Goal::Dprime);
        let err = Goal::parse("goal_chase", "f1").unwrap_err();
        assert!(matches!(err, FftError::UnknownGoal { field: "goal_chase", .. }));
        assert_eq!(Goal::Wacc.to_string(), "wacc");
    }

    #[test]
    fn undefined_scores_rank_last() {
        assert_eq!(compare_scores(Some(-5.0), None), Ordering::Greater);
        assert_eq!(compare_scores(None, Some(0.1)), Ordering::Less);
        assert_eq!(compare_scores(Some(0.5), Some(0.7)), Ordering::Less);
    }

    #[test]
    fn counts_from_decisions() {
        let c = Counts::from_decisions(&[true, true, false, false], &[true, false, true, false]);
        assert_eq!(c, counts(1, 1, 1, 1));
    }
}
