//! CSV case reader with column type inference.

use std::path::{Path, PathBuf};

use frugal_fft::{Cue, Dataset, binary_outcomes};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Cell values read as missing.
const MISSING_TOKENS: [&str; 4] = ["", "NA", "NaN", "?"];

fn is_missing(cell: &str) -> bool {
    MISSING_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(cell))
}

/// Reads cases from a headered CSV file.
///
/// One column holds the binary outcome; every other column becomes a cue.
/// A cue column is numeric when every non-missing cell parses as a finite
/// float, otherwise categorical. Empty cells and `NA`, `NaN`, `?` (any
/// case) are missing.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingOutcomeColumn`] | Outcome column not in the header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::Data`] | Outcome not binary, no cue columns, or duplicate cue names |
pub struct DatasetReader {
    path: PathBuf,
    outcome: Option<String>,
    positive: Option<String>,
}

impl DatasetReader {
    /// Create a new reader for the given CSV file path.
    ///
    /// The first column is the outcome unless [`Self::with_outcome`] names another.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            outcome: None,
            positive: None,
        }
    }

    /// Name the outcome column.
    #[must_use]
    pub fn with_outcome(mut self, column: impl Into<String>) -> Self {
        self.outcome = Some(column.into());
        self
    }

    /// Name the outcome label treated as positive.
    ///
    /// Without it the outcome must be `0`/`1` or `true`/`false`.
    #[must_use]
    pub fn with_positive_label(mut self, label: impl Into<String>) -> Self {
        self.positive = Some(label.into());
        self
    }

    /// Read and validate the CSV file, returning a [`Dataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets the row-length check below report the row.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr
            .headers()
            .map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?
            .clone();
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");

        let outcome_index = match &self.outcome {
            Some(name) => header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| IoError::MissingOutcomeColumn {
                    path: self.path.clone(),
                    column: name.clone(),
                })?,
            None => 0,
        };

        let mut columns: Vec<Vec<String>> = vec![Vec::new(); expected_cols];
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;
            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }
            for (column, cell) in columns.iter_mut().zip(record.iter()) {
                column.push(cell.to_string());
            }
        }

        let n_rows = columns.first().map_or(0, Vec::len);
        if n_rows == 0 {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let outcome_name = header.get(outcome_index).unwrap_or_default().to_string();
        let outcomes = binary_outcomes(
            &outcome_name,
            &columns[outcome_index],
            self.positive.as_deref(),
        )?;

        let cues: Vec<Cue> = header
            .iter()
            .zip(&columns)
            .enumerate()
            .filter(|(i, _)| *i != outcome_index)
            .map(|(_, (name, cells))| parse_cue(name, cells))
            .collect();
        let n_numeric = cues
            .iter()
            .filter(|c| c.values().kind() == "numeric")
            .count();

        let dataset = Dataset::new(outcome_name, outcomes, cues)?;
        info!(
            n_cases = dataset.n_cases(),
            n_cues = dataset.n_cues(),
            n_numeric,
            n_positive = dataset.n_positive(),
            "dataset loaded"
        );
        Ok(dataset)
    }
}

/// Build a numeric cue when every present cell is a finite float, else categorical.
fn parse_cue(name: &str, cells: &[String]) -> Cue {
    let numeric: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| {
            if is_missing(cell) {
                Some(None)
            } else {
                cell.parse::<f64>().ok().filter(|v| v.is_finite()).map(Some)
            }
        })
        .collect();

    match numeric {
        Some(values) => Cue::numeric(name, values),
        None => {
            let labels: Vec<Option<&str>> = cells
                .iter()
                .map(|cell| (!is_missing(cell)).then_some(cell.as_str()))
                .collect();
            Cue::categorical(name, &labels)
        }
    }
}
