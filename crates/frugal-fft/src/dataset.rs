//! Column-major case storage: one binary outcome plus numeric or categorical cues.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::FftError;

/// Zero-based cue column index within a [`Dataset`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct CueIndex(usize);

impl CueIndex {
    /// Create a new cue index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CueIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Values of one cue column. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub enum CueValues {
    /// Real-valued cue.
    Numeric(Vec<Option<f64>>),
    /// Cue drawn from a finite set of labels.
    ///
    /// `levels` is sorted and de-duplicated; `codes[i]` indexes into it.
    Categorical {
        /// Distinct level labels in ascending order.
        levels: Vec<String>,
        /// Per-case level code.
        codes: Vec<Option<usize>>,
    },
}

impl CueValues {
    /// Return `"numeric"` or `"categorical"`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            CueValues::Numeric(_) => "numeric",
            CueValues::Categorical { .. } => "categorical",
        }
    }

    /// Number of cases in the column.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            CueValues::Numeric(values) => values.len(),
            CueValues::Categorical { codes, .. } => codes.len(),
        }
    }

    /// Return `true` if the column holds no cases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return `true` if the value for `case` is missing.
    #[must_use]
    pub fn is_missing(&self, case: usize) -> bool {
        match self {
            CueValues::Numeric(values) => values[case].is_none(),
            CueValues::Categorical { codes, .. } => codes[case].is_none(),
        }
    }

    fn select(&self, cases: &[usize]) -> CueValues {
        match self {
            CueValues::Numeric(values) => {
                CueValues::Numeric(cases.iter().map(|&c| values[c]).collect())
            }
            CueValues::Categorical { levels, codes } => CueValues::Categorical {
                levels: levels.clone(),
                codes: cases.iter().map(|&c| codes[c]).collect(),
            },
        }
    }
}

/// A named cue column.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    name: String,
    values: CueValues,
}

impl Cue {
    /// Build a numeric cue. `None` entries are missing values.
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values: CueValues::Numeric(values),
        }
    }

    /// Build a categorical cue from raw labels. `None` entries are missing values.
    pub fn categorical<S: AsRef<str>>(name: impl Into<String>, labels: &[Option<S>]) -> Self {
        let levels: Vec<String> = labels
            .iter()
            .flatten()
            .map(|s| s.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let lookup: BTreeMap<&str, usize> = levels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i))
            .collect();
        let codes = labels
            .iter()
            .map(|l| l.as_ref().map(|s| lookup[s.as_ref()]))
            .collect();
        Self {
            name: name.into(),
            values: CueValues::Categorical { levels, codes },
        }
    }

    /// Return the cue name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the cue values.
    #[must_use]
    pub fn values(&self) -> &CueValues {
        &self.values
    }
}

/// An immutable set of cases sharing one cue schema.
///
/// Outcomes are binary: `true` is the positive class.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    outcome_name: String,
    outcomes: Vec<bool>,
    cues: Vec<Cue>,
}

impl Dataset {
    /// Create a validated dataset.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`FftError::EmptyDataset`] | `outcomes` is empty |
    /// | [`FftError::ZeroCues`] | `cues` is empty |
    /// | [`FftError::CueLengthMismatch`] | a cue column length differs from `outcomes` |
    /// | [`FftError::DuplicateCueName`] | two cues share a name |
    /// | [`FftError::NonFiniteValue`] | a numeric value is NaN or infinite |
    pub fn new(
        outcome_name: impl Into<String>,
        outcomes: Vec<bool>,
        cues: Vec<Cue>,
    ) -> Result<Self, FftError> {
        if outcomes.is_empty() {
            return Err(FftError::EmptyDataset);
        }
        if cues.is_empty() {
            return Err(FftError::ZeroCues);
        }
        let n_cases = outcomes.len();
        let mut seen = HashSet::new();
        for cue in &cues {
            if cue.values.len() != n_cases {
                return Err(FftError::CueLengthMismatch {
                    cue: cue.name.clone(),
                    expected: n_cases,
                    got: cue.values.len(),
                });
            }
            if !seen.insert(cue.name.as_str()) {
                return Err(FftError::DuplicateCueName {
                    name: cue.name.clone(),
                });
            }
            if let CueValues::Numeric(values) = &cue.values
                && let Some(case_index) = values
                    .iter()
                    .position(|v| v.is_some_and(|x| !x.is_finite()))
            {
                return Err(FftError::NonFiniteValue {
                    cue: cue.name.clone(),
                    case_index,
                });
            }
        }
        Ok(Self {
            outcome_name: outcome_name.into(),
            outcomes,
            cues,
        })
    }

    /// Return the outcome column name.
    #[must_use]
    pub fn outcome_name(&self) -> &str {
        &self.outcome_name
    }

    /// Return the outcome vector (`true` = positive).
    #[must_use]
    pub fn outcomes(&self) -> &[bool] {
        &self.outcomes
    }

    /// Return all cue columns in input order.
    #[must_use]
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// Return the cue at `index`.
    #[must_use]
    pub fn cue(&self, index: CueIndex) -> &Cue {
        &self.cues[index.index()]
    }

    /// Look up a cue by name.
    #[must_use]
    pub fn cue_index(&self, name: &str) -> Option<CueIndex> {
        self.cues
            .iter()
            .position(|c| c.name == name)
            .map(CueIndex::new)
    }

    /// Iterate over all cue indices in input order.
    pub fn cue_indices(&self) -> impl Iterator<Item = CueIndex> + '_ {
        (0..self.cues.len()).map(CueIndex::new)
    }

    /// Return the number of cases.
    #[must_use]
    pub fn n_cases(&self) -> usize {
        self.outcomes.len()
    }

    /// Return the number of cue columns.
    #[must_use]
    pub fn n_cues(&self) -> usize {
        self.cues.len()
    }

    /// Return the number of positive cases.
    #[must_use]
    pub fn n_positive(&self) -> usize {
        self.outcomes.iter().filter(|&&o| o).count()
    }

    /// Return every case index, ascending.
    #[must_use]
    pub fn all_cases(&self) -> Vec<usize> {
        (0..self.n_cases()).collect()
    }

    /// Build a new dataset holding only `cases`, in the given order.
    fn select(&self, cases: &[usize]) -> Dataset {
        Dataset {
            outcome_name: self.outcome_name.clone(),
            outcomes: cases.iter().map(|&c| self.outcomes[c]).collect(),
            cues: self
                .cues
                .iter()
                .map(|cue| Cue {
                    name: cue.name.clone(),
                    values: cue.values.select(cases),
                })
                .collect(),
        }
    }

    /// Split into stratified train and test datasets.
    ///
    /// Case indices are shuffled within each outcome class, and the leading
    /// `round(train_fraction * class_size)` cases of each class go to the
    /// training set. Both halves keep the original case order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`FftError::InvalidTrainFraction`] | `train_fraction` not in (0, 1) |
    /// | [`FftError::EmptyDataset`] | either half would have zero cases |
    pub fn split_stratified(
        &self,
        train_fraction: f64,
        seed: u64,
    ) -> Result<(Dataset, Dataset), FftError> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(FftError::InvalidTrainFraction {
                fraction: train_fraction,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut train = Vec::with_capacity(self.n_cases());
        let mut test = Vec::with_capacity(self.n_cases());

        for class in [true, false] {
            let mut indices: Vec<usize> = (0..self.n_cases())
                .filter(|&i| self.outcomes[i] == class)
                .collect();
            indices.shuffle(&mut rng);
            let n_train = (indices.len() as f64 * train_fraction).round() as usize;
            train.extend_from_slice(&indices[..n_train]);
            test.extend_from_slice(&indices[n_train..]);
        }

        if train.is_empty() || test.is_empty() {
            return Err(FftError::EmptyDataset);
        }
        train.sort_unstable();
        test.sort_unstable();
        Ok((self.select(&train), self.select(&test)))
    }
}

/// Coerce a raw outcome column into booleans.
///
/// With `positive` set, cases equal to that label are positive and the
/// column must hold exactly that label plus one other. Without it, the
/// column must use `0`/`1` or `true`/`false` (case-insensitive).
///
/// # Errors
///
/// Returns [`FftError::NonBinaryOutcome`] when the column does not hold
/// exactly two classes or the labels cannot be interpreted.
pub fn binary_outcomes<S: AsRef<str>>(
    column: &str,
    raw: &[S],
    positive: Option<&str>,
) -> Result<Vec<bool>, FftError> {
    let distinct: BTreeSet<&str> = raw.iter().map(|s| s.as_ref().trim()).collect();
    let non_binary = || FftError::NonBinaryOutcome {
        column: column.to_string(),
        distinct: distinct.iter().take(8).map(|s| s.to_string()).collect(),
    };

    if distinct.len() > 2 {
        return Err(non_binary());
    }

    match positive {
        Some(label) => {
            if !distinct.contains(label) || distinct.len() != 2 {
                return Err(non_binary());
            }
            Ok(raw.iter().map(|s| s.as_ref().trim() == label).collect())
        }
        None => raw
            .iter()
            .map(|s| match s.as_ref().trim().to_ascii_lowercase().as_str() {
                "1" | "true" => Ok(true),
                "0" | "false" => Ok(false),
                _ => Err(non_binary()),
            })
            .collect(),
    }
}
