//! JSON result writer for fitted trees and cue rankings.

use std::fs;
use std::path::{Path, PathBuf};

use frugal_fft::{CueFit, CueRanking, FftResult, FitMetadata, Node, SkippedCue, TreeStats};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes fit results and cue rankings to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_trees.json` and
/// `{experiment}_cues.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write every ranked tree to `{experiment}_trees.json` and return its path.
    ///
    /// Each entry carries the tree definition and its train (and test, when
    /// present) performance table.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | The result cannot be encoded |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(n_trees = result.trees().len()))]
    pub fn write_fit(&self, result: &FftResult) -> Result<PathBuf, IoError> {
        let path = self.path_for("trees");

        let trees: Vec<TreeEntry<'_>> = result
            .trees()
            .iter()
            .map(|r| TreeEntry {
                rank: r.rank,
                fan_index: r.fan_index,
                pattern: r.tree.pattern(),
                description: r.tree.to_string(),
                nodes: r.tree.nodes(),
                train: &r.train,
                test: r.test.as_ref(),
            })
            .collect();

        let artifact = TreesArtifact {
            experiment: self.experiment.as_str(),
            metadata: result.metadata(),
            trees,
        };
        self.write_json(&path, &artifact)?;

        info!(path = %path.display(), "tree result written");
        Ok(path)
    }

    /// Write a cue ranking to `{experiment}_cues.json` and return its path.
    ///
    /// # Errors
    ///
    /// Same as [`ResultWriter::write_fit`].
    #[instrument(skip_all, fields(n_cues = ranking.fits.len()))]
    pub fn write_cues(&self, ranking: &CueRanking) -> Result<PathBuf, IoError> {
        let path = self.path_for("cues");

        let artifact = CuesArtifact {
            experiment: self.experiment.as_str(),
            cues: ranking
                .fits
                .iter()
                .enumerate()
                .map(|(i, fit)| CueEntry { rank: i + 1, fit })
                .collect(),
            skipped: &ranking.skipped,
        };
        self.write_json(&path, &artifact)?;

        info!(path = %path.display(), "cue ranking written");
        Ok(path)
    }

    fn path_for(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}.json", self.experiment.as_str()))
    }

    fn write_json<T: Serialize>(&self, path: &Path, artifact: &T) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// --- Artifact structs (borrowed views, serialization only) ---

#[derive(Serialize)]
struct TreesArtifact<'a> {
    experiment: &'a str,
    metadata: &'a FitMetadata,
    trees: Vec<TreeEntry<'a>>,
}

#[derive(Serialize)]
struct TreeEntry<'a> {
    rank: usize,
    fan_index: usize,
    pattern: String,
    description: String,
    nodes: &'a [Node],
    train: &'a TreeStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    test: Option<&'a TreeStats>,
}

#[derive(Serialize)]
struct CuesArtifact<'a> {
    experiment: &'a str,
    cues: Vec<CueEntry<'a>>,
    skipped: &'a [SkippedCue],
}

#[derive(Serialize)]
struct CueEntry<'a> {
    rank: usize,
    #[serde(flatten)]
    fit: &'a CueFit,
}
