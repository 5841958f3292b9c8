//! Construction invariants for frugal-fft.
//!
//! Each test fits trees on a deterministic synthetic dataset and checks a
//! property that must hold for any correct construction, independent of
//! the exact trees produced.

use proptest::prelude::*;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use frugal_fft::{
    Algorithm, CostModel, Cue, Dataset, Direction, FftConfig, FftError, Goal, Scoring,
    StoppingRule, Threshold,
};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic dataset
// ---------------------------------------------------------------------------

/// Generate a 200-case dataset with four cues of varying strength.
///
/// `strong` shifts by 2.0 with the outcome plus noise in [0, 3).
/// `weak` shifts by 0.5 plus noise in [0, 3).
/// `noise` is pure noise in [0, 1).
/// `group` is categorical: level `a` leans positive, `c` leans negative.
fn make_dataset(seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n = 200;
    let outcomes: Vec<bool> = (0..n).map(|i| i % 5 < 2).collect();

    let mut strong = Vec::with_capacity(n);
    let mut weak = Vec::with_capacity(n);
    let mut noise = Vec::with_capacity(n);
    let mut group = Vec::with_capacity(n);
    for &y in &outcomes {
        let shift = if y { 1.0 } else { 0.0 };
        strong.push(Some((shift * 2.0 + rng.r#gen::<f64>() * 3.0).round()));
        weak.push(Some((shift * 0.5 + rng.r#gen::<f64>() * 3.0).round()));
        noise.push(Some((rng.r#gen::<f64>() * 10.0).round()));
        let u: f64 = rng.r#gen();
        let label = match (y, u) {
            (true, u) if u < 0.6 => "a",
            (false, u) if u < 0.6 => "c",
            (_, u) if u < 0.8 => "b",
            _ => "d",
        };
        group.push(Some(label));
    }

    Dataset::new(
        "outcome",
        outcomes,
        vec![
            Cue::numeric("strong", strong),
            Cue::numeric("weak", weak),
            Cue::numeric("noise", noise),
            Cue::categorical("group", &group),
        ],
    )
    .unwrap()
}

/// Every tree's per-level counts must partition the dataset.
fn assert_partition(result: &frugal_fft::FftResult, n: usize) {
    for ranked in result.trees() {
        let levels = &ranked.train.levels;
        let decided: usize = levels.iter().map(|l| l.decided).sum();
        assert_eq!(decided, n, "tree {} decides {decided} of {n}", ranked.tree);
        assert_eq!(levels[0].reached, n);
        for pair in levels.windows(2) {
            assert_eq!(pair[1].reached, pair[0].reached - pair[0].decided);
        }
        let last = levels.last().unwrap();
        assert_eq!(last.decided, last.reached);
    }
}

// ---------------------------------------------------------------------------
// a) depth-one round trip
// ---------------------------------------------------------------------------

/// A one-level tree on a cue reproduces that cue's search statistics.
#[test]
fn depth_one_tree_matches_cue_fit() {
    let ds = make_dataset(42);
    let config = FftConfig::new()
        .with_algorithm(Algorithm::Global)
        .with_max_levels(1)
        .with_stopping_par(0.0);

    for cue in ds.cues() {
        let single = Dataset::new("outcome", ds.outcomes().to_vec(), vec![cue.clone()]).unwrap();
        let result = config.fit(&single, None).unwrap();
        let fit = &result.cue_fits()[0];
        let best = result.best().unwrap();
        assert_eq!(best.tree.n_levels(), 1);
        assert_eq!(best.tree.nodes()[0].threshold, fit.threshold);
        assert_eq!(best.train.overall, fit.stats, "cue {}", cue.name());
    }
}

// ---------------------------------------------------------------------------
// b) partition
// ---------------------------------------------------------------------------

#[test]
fn every_case_decided_exactly_once() {
    let ds = make_dataset(7);
    for algorithm in [
        Algorithm::Global,
        Algorithm::Conditional,
        Algorithm::Max,
        Algorithm::Zigzag,
    ] {
        let result = FftConfig::new()
            .with_algorithm(algorithm)
            .with_stopping_par(0.0)
            .fit(&ds, None)
            .unwrap();
        assert_partition(&result, ds.n_cases());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_partition_on_random_data(
        rows in prop::collection::vec((any::<bool>(), 0u8..4, 0u8..6, 0u8..3, any::<bool>()), 8..60),
        conditional in any::<bool>(),
    ) {
        let outcomes: Vec<bool> = rows.iter().map(|r| r.0).collect();
        let a: Vec<Option<f64>> = rows.iter().map(|r| Some(f64::from(r.1))).collect();
        let b: Vec<Option<f64>> = rows
            .iter()
            .map(|r| if r.4 { None } else { Some(f64::from(r.2)) })
            .collect();
        let labels: Vec<Option<String>> = rows.iter().map(|r| Some(format!("l{}", r.3))).collect();
        let ds = Dataset::new(
            "y",
            outcomes,
            vec![Cue::numeric("a", a), Cue::numeric("b", b), Cue::categorical("c", &labels)],
        )
        .unwrap();

        let algorithm = if conditional { Algorithm::Conditional } else { Algorithm::Global };
        let result = FftConfig::new()
            .with_algorithm(algorithm)
            .with_max_levels(3)
            .with_stopping_par(0.0)
            .fit(&ds, None);
        let result = match result {
            Ok(r) => r,
            Err(FftError::NoUsableCues { .. }) => return Ok(()),
            Err(e) => return Err(TestCaseError::fail(e.to_string())),
        };

        for ranked in result.trees() {
            let c = ranked.tree.classify(&ds).unwrap();
            prop_assert_eq!(c.levels.len(), ds.n_cases());
            prop_assert!(c.levels.iter().all(|&l| l < ranked.tree.n_levels()));
            let decided: usize = ranked.train.levels.iter().map(|l| l.decided).sum();
            prop_assert_eq!(decided, ds.n_cases());
        }
    }
}

// ---------------------------------------------------------------------------
// c) global and conditional agree at depth one
// ---------------------------------------------------------------------------

#[test]
fn depth_one_identical_across_fan_modes() {
    let ds = make_dataset(3);
    let fit = |algorithm| {
        FftConfig::new()
            .with_algorithm(algorithm)
            .with_max_levels(1)
            .fit(&ds, None)
            .unwrap()
    };
    let global = fit(Algorithm::Global);
    let conditional = fit(Algorithm::Conditional);
    assert_eq!(global.best().unwrap().tree, conditional.best().unwrap().tree);
}

// ---------------------------------------------------------------------------
// d) pruning floor
// ---------------------------------------------------------------------------

#[test]
fn pruned_trees_meet_population_floor() {
    let ds = make_dataset(11);
    let n = ds.n_cases() as f64;
    for p in [0.05, 0.2, 0.5, 0.9] {
        let result = FftConfig::new()
            .with_algorithm(Algorithm::Global)
            .with_stopping_rule(StoppingRule::PopulationFraction)
            .with_stopping_par(p)
            .fit(&ds, None)
            .unwrap();
        for ranked in result.trees() {
            let last = ranked.train.levels.last().unwrap();
            assert!(
                ranked.tree.n_levels() == 1 || last.reached as f64 >= p * n,
                "p={p}: last level reached {} < {}",
                last.reached,
                p * n
            );
        }
    }
}

// ---------------------------------------------------------------------------
// e) cost goal picks the cheapest tree
// ---------------------------------------------------------------------------

#[test]
fn cost_goal_selects_minimum_cost() {
    let ds = make_dataset(5);
    let costs = CostModel::new()
        .with_outcome_slice(&[0.0, 1.0, 4.0, 0.0])
        .unwrap()
        .with_cue_cost("strong", 0.3)
        .unwrap()
        .with_cue_cost("group", 0.05)
        .unwrap();
    let result = FftConfig::new()
        .with_algorithm(Algorithm::Global)
        .with_goal(Goal::Cost)
        .with_costs(costs)
        .with_stopping_par(0.0)
        .fit(&ds, None)
        .unwrap();

    let best = result.best().unwrap();
    let min = result
        .trees()
        .iter()
        .map(|r| r.train.overall.cost)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(best.train.overall.cost, min);
    for r in result.trees() {
        if r.train.overall.cost == min {
            assert!(best.tree.n_levels() <= r.tree.n_levels());
        }
    }
}

// ---------------------------------------------------------------------------
// f) idempotence
// ---------------------------------------------------------------------------

#[test]
fn repeated_fits_are_identical() {
    let ds = make_dataset(42);
    let config = FftConfig::new().with_algorithm(Algorithm::Conditional);
    let first = config.fit(&ds, None).unwrap();
    let second = config.fit(&ds, None).unwrap();
    assert_eq!(first.trees(), second.trees());
    assert_eq!(first.cue_fits(), second.cue_fits());
}

/// Ranking and selection must not depend on how many threads do the work.
#[test]
fn fits_identical_across_thread_counts() {
    let ds = make_dataset(42);
    let fit_with = |threads: usize, algorithm: Algorithm| {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap();
        pool.install(|| {
            FftConfig::new()
                .with_algorithm(algorithm)
                .with_stopping_par(0.0)
                .fit(&ds, None)
                .unwrap()
        })
    };

    for algorithm in [Algorithm::Global, Algorithm::Conditional, Algorithm::Max] {
        let serial = fit_with(1, algorithm);
        let parallel = fit_with(4, algorithm);
        assert_eq!(serial.trees(), parallel.trees(), "{algorithm}");
        assert_eq!(serial.cue_fits(), parallel.cue_fits(), "{algorithm}");
    }
}

// ---------------------------------------------------------------------------
// g) end-to-end: "age > 55"
// ---------------------------------------------------------------------------

/// Ten positives and ten negatives where "age > 55" is right 60% of the time
/// in each class.
#[test]
fn above_55_gives_balanced_accuracy_point_six() {
    let mut ages = Vec::new();
    let mut outcomes = Vec::new();
    for (age, positives, negatives) in [(60.0, 6, 4), (55.0, 2, 3), (50.0, 2, 3)] {
        for _ in 0..positives {
            ages.push(Some(age));
            outcomes.push(true);
        }
        for _ in 0..negatives {
            ages.push(Some(age));
            outcomes.push(false);
        }
    }
    let ds = Dataset::new("disease", outcomes, vec![Cue::numeric("age", ages)]).unwrap();
    let result = FftConfig::new()
        .with_algorithm(Algorithm::Global)
        .with_max_levels(1)
        .fit(&ds, None)
        .unwrap();
    let best = result.best().unwrap();
    assert_eq!(
        best.tree.nodes()[0].threshold,
        Threshold::Numeric {
            direction: Direction::Above,
            cutoff: 55.0
        }
    );
    let stats = &best.train.overall;
    assert!((stats.sens.unwrap() - 0.6).abs() < 1e-12);
    assert!((stats.spec.unwrap() - 0.6).abs() < 1e-12);
    assert!((stats.bacc.unwrap() - 0.6).abs() < 1e-12);
}

// ---------------------------------------------------------------------------
// h) cost proportional to errors selects like accuracy
// ---------------------------------------------------------------------------

#[test]
fn error_proportional_cost_selects_like_accuracy() {
    let ds = make_dataset(9);
    let base = FftConfig::new()
        .with_algorithm(Algorithm::Global)
        .with_stopping_par(0.0);
    let by_acc = base.clone().with_goal(Goal::Acc).fit(&ds, None).unwrap();
    let costs = CostModel::new()
        .with_outcome_slice(&[0.0, 1.0, 1.0, 0.0])
        .unwrap();
    let by_cost = base
        .with_goal(Goal::Cost)
        .with_costs(costs)
        .fit(&ds, None)
        .unwrap();

    let order = |r: &frugal_fft::FftResult| -> Vec<usize> {
        r.trees().iter().map(|t| t.fan_index).collect()
    };
    assert_eq!(order(&by_acc), order(&by_cost));
}

// ---------------------------------------------------------------------------
// i) held-out evaluation and errors
// ---------------------------------------------------------------------------

#[test]
fn test_split_evaluated_with_same_trees() {
    let ds = make_dataset(21);
    let (train, test) = ds.split_stratified(0.5, 42).unwrap();
    let result = FftConfig::new().fit(&train, Some(&test)).unwrap();
    for ranked in result.trees() {
        let held_out = ranked.test.as_ref().unwrap();
        assert_eq!(held_out.overall.n, test.n_cases());
        assert_eq!(held_out, &ranked.tree.evaluate(&test, result.scoring()).unwrap());
    }
}

#[test]
fn test_set_missing_a_cue_is_data_error() {
    let ds = make_dataset(21);
    let other = Dataset::new(
        "outcome",
        vec![true, false],
        vec![Cue::numeric("unrelated", vec![Some(1.0), Some(2.0)])],
    )
    .unwrap();
    let err = FftConfig::new().fit(&ds, Some(&other)).unwrap_err();
    assert_eq!(err.kind(), frugal_fft::ErrorKind::Data);
}

#[test]
fn scoring_matches_config() {
    let config = FftConfig::new().with_sens_w(0.8);
    assert_eq!(config.scoring(), Scoring::new(0.8, CostModel::new()));
}
