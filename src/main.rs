use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use frugal_fft::{
    Algorithm, CostModel, Dataset, ExhaustiveSubsets, FftConfig, Goal, GreedyPrefix,
    PredicateSearch, StoppingRule,
};
use frugal_io::{DatasetReader, ExperimentName, ResultWriter};

#[derive(Parser)]
#[command(name = "frugal")]
#[command(about = "Fast-and-frugal tree construction and evaluation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for the train/test split
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Input data and output location.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Path to the input CSV file
    #[arg(long)]
    data: PathBuf,

    /// Outcome column name (defaults to the first column)
    #[arg(long)]
    outcome: Option<String>,

    /// Outcome label treated as positive (required unless the outcome is 0/1 or true/false)
    #[arg(long)]
    positive: Option<String>,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

/// Parameters shared by cue ranking and tree construction.
#[derive(Args, Debug, Clone)]
struct ScoringArgs {
    /// Statistic used to pick cue thresholds and order cues
    #[arg(long, default_value = "bacc")]
    goal_chase: String,

    /// Sensitivity weight for wacc, in [0, 1]
    #[arg(long, default_value_t = 0.5)]
    sens_w: f64,

    /// Outcome costs as hi,fa,mi,cr
    #[arg(long, value_delimiter = ',')]
    cost_outcomes: Option<Vec<f64>>,

    /// Cue usage cost as name=cost (repeatable)
    #[arg(long = "cost-cue")]
    cost_cues: Vec<String>,

    /// Categorical level search: "greedy" or "exhaustive"
    #[arg(long, default_value = "greedy")]
    categorical_search: String,

    /// Largest level count searched exhaustively
    #[arg(long, default_value_t = 8)]
    exhaustive_levels: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Build, prune, and rank fast-and-frugal trees
    Fit {
        #[command(flatten)]
        input: DataArgs,

        /// Path to a held-out test CSV with the same columns
        #[arg(long, conflicts_with = "train_fraction")]
        test: Option<PathBuf>,

        /// Fraction of cases used for training; the rest form the test set
        #[arg(long)]
        train_fraction: Option<f64>,

        /// Construction algorithm: "global", "conditional", "max", or "zigzag"
        #[arg(long, default_value = "conditional")]
        algorithm: String,

        /// Statistic used to rank the final trees
        #[arg(long, default_value = "bacc")]
        goal: String,

        /// Maximum number of levels per tree
        #[arg(long, default_value_t = 4)]
        max_levels: usize,

        /// Pruning rule: "population-fraction" or "stat-delta"
        #[arg(long, default_value = "population-fraction")]
        stopping_rule: String,

        /// Parameter of the pruning rule, in [0, 1]
        #[arg(long, default_value_t = 0.10)]
        stopping_par: f64,

        #[command(flatten)]
        scoring: ScoringArgs,
    },

    /// Fit and rank every cue on the full dataset
    Cues {
        #[command(flatten)]
        input: DataArgs,

        #[command(flatten)]
        scoring: ScoringArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct FitOutput {
    experiment: String,
    algorithm: String,
    n_train: usize,
    n_test: Option<usize>,
    fan_size: usize,
    n_candidates: usize,
    best: Option<BestTreeOutput>,
    output: PathBuf,
}

#[derive(Serialize)]
struct BestTreeOutput {
    pattern: String,
    description: String,
    train_score: Option<f64>,
    test_score: Option<f64>,
}

#[derive(Serialize)]
struct CuesOutput {
    experiment: String,
    n_cases: usize,
    cues: Vec<CueOutput>,
    skipped: Vec<String>,
    output: PathBuf,
}

#[derive(Serialize)]
struct CueOutput {
    name: String,
    threshold: String,
    score: Option<f64>,
}

fn read_dataset(path: &Path, input: &DataArgs) -> Result<Dataset> {
    let mut reader = DatasetReader::new(path);
    if let Some(outcome) = &input.outcome {
        reader = reader.with_outcome(outcome.clone());
    }
    if let Some(positive) = &input.positive {
        reader = reader.with_positive_label(positive.clone());
    }
    reader
        .read()
        .with_context(|| format!("failed to read {}", path.display()))
}

fn parse_cost_model(args: &ScoringArgs) -> Result<CostModel> {
    let mut costs = CostModel::new();
    if let Some(outcomes) = &args.cost_outcomes {
        costs = costs.with_outcome_slice(outcomes)?;
    }
    for entry in &args.cost_cues {
        let (name, value) = entry
            .split_once('=')
            .with_context(|| format!("invalid cue cost \"{entry}\" (expected name=cost)"))?;
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("invalid cost value in \"{entry}\""))?;
        costs = costs.with_cue_cost(name.trim(), value)?;
    }
    Ok(costs)
}

fn parse_predicate_search(args: &ScoringArgs) -> Result<Arc<dyn PredicateSearch>> {
    match args.categorical_search.as_str() {
        "greedy" => Ok(Arc::new(GreedyPrefix)),
        "exhaustive" => Ok(Arc::new(ExhaustiveSubsets::new(args.exhaustive_levels))),
        other => anyhow::bail!("unknown categorical search: {other} (expected greedy or exhaustive)"),
    }
}

fn base_config(args: &ScoringArgs) -> Result<FftConfig> {
    Ok(FftConfig::new()
        .with_goal_chase(Goal::parse("goal_chase", &args.goal_chase)?)
        .with_sens_w(args.sens_w)
        .with_costs(parse_cost_model(args)?)
        .with_predicate_search(parse_predicate_search(args)?))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Fit {
            input,
            test,
            train_fraction,
            algorithm,
            goal,
            max_levels,
            stopping_rule,
            stopping_par,
            scoring,
        } => {
            let experiment_name = ExperimentName::new(input.experiment.clone())?;
            let algorithm: Algorithm = algorithm.parse()?;
            let stopping_rule: StoppingRule = stopping_rule.parse()?;
            let goal = Goal::parse("goal", &goal)?;

            let config = base_config(&scoring)?
                .with_algorithm(algorithm)
                .with_goal(goal)
                .with_max_levels(max_levels)
                .with_stopping_rule(stopping_rule)
                .with_stopping_par(stopping_par);

            // Read data, then split or load the test set
            let dataset = read_dataset(&input.data, &input)?;
            let (train, test) = match (test, train_fraction) {
                (Some(path), _) => (dataset, Some(read_dataset(&path, &input)?)),
                (None, Some(fraction)) => {
                    let (train, test) = dataset
                        .split_stratified(fraction, cli.seed)
                        .context("failed to split dataset")?;
                    info!(
                        n_train = train.n_cases(),
                        n_test = test.n_cases(),
                        seed = cli.seed,
                        "dataset split"
                    );
                    (train, Some(test))
                }
                (None, None) => (dataset, None),
            };

            let result = config
                .fit(&train, test.as_ref())
                .context("tree construction failed")?;

            // Write JSON artifact
            let writer = ResultWriter::new(&input.output_dir, experiment_name)?;
            let path = writer.write_fit(&result)?;

            // Build and print stdout summary
            let metadata = result.metadata();
            let output = FitOutput {
                experiment: input.experiment,
                algorithm: algorithm.to_string(),
                n_train: metadata.n_train,
                n_test: metadata.n_test,
                fan_size: metadata.fan_size,
                n_candidates: metadata.n_candidates,
                best: result.best().map(|best| BestTreeOutput {
                    pattern: best.tree.pattern(),
                    description: best.tree.to_string(),
                    train_score: goal.score(&best.train.overall),
                    test_score: best.test.as_ref().and_then(|t| goal.score(&t.overall)),
                }),
                output: path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Cues { input, scoring } => {
            let experiment_name = ExperimentName::new(input.experiment.clone())?;
            let config = base_config(&scoring)?;
            let goal_chase = config.goal_chase();

            let dataset = read_dataset(&input.data, &input)?;
            let ranking = config
                .rank_cues(&dataset)
                .context("cue ranking failed")?;

            let writer = ResultWriter::new(&input.output_dir, experiment_name)?;
            let path = writer.write_cues(&ranking)?;

            let output = CuesOutput {
                experiment: input.experiment,
                n_cases: dataset.n_cases(),
                cues: ranking
                    .fits
                    .iter()
                    .map(|fit| CueOutput {
                        name: fit.name.clone(),
                        threshold: fit.threshold.to_string(),
                        score: goal_chase.score(&fit.stats),
                    })
                    .collect(),
                skipped: ranking
                    .skipped
                    .iter()
                    .map(|s| format!("{} ({})", s.name, s.reason))
                    .collect(),
                output: path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
