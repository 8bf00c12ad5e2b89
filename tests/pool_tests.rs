//! Worker pool tests: dispatch order, failure isolation, respawn, reuse across runs.

use anyhow::{Result, bail};
use romcat::pool::{PoolHandler, PoolProgress, ProgressReporter, UnitTask, WorkerPool};
use std::collections::HashSet;

/// Squares its input. `13` panics inside the unit, `7` returns an error.
struct Square;

impl UnitTask for Square {
    type Input = u64;
    type Output = (u64, u64);

    fn execute(&self, n: u64, progress: &ProgressReporter) -> Result<(u64, u64)> {
        progress.report(format!("squaring {n}"));
        match n {
            13 => panic!("poisoned input"),
            7 => bail!("refusing seven"),
            _ => Ok((n, n * n)),
        }
    }
}

#[derive(Default)]
struct Recorder {
    started: Vec<u64>,
    results: Vec<(u64, u64)>,
    errors: Vec<(u64, String)>,
    progress: Vec<PoolProgress>,
    messages: usize,
}

impl PoolHandler<u64, (u64, u64)> for Recorder {
    fn on_complete(&mut self, progress: PoolProgress, _unit: usize, output: (u64, u64)) -> Result<()> {
        self.progress.push(progress);
        self.results.push(output);
        Ok(())
    }

    fn on_error(&mut self, _unit: usize, input: u64, error: anyhow::Error) -> Result<()> {
        self.errors.push((input, format!("{error:#}")));
        Ok(())
    }

    fn on_start(&mut self, _unit: usize, input: &u64) {
        self.started.push(*input);
    }

    fn on_progress(&mut self, _unit: usize, _message: &str) {
        self.messages += 1;
    }
}

// --- results and failures ---

#[test]
fn test_all_items_complete() {
    let mut pool = WorkerPool::initialize(4, Square).unwrap();
    let mut rec = Recorder::default();
    let summary = pool.run((1..=20).filter(|n| *n != 7 && *n != 13).collect(), &mut rec).unwrap();
    pool.finalize().unwrap();

    assert_eq!(summary.completed, 18);
    assert_eq!(summary.failed, 0);
    let got: HashSet<_> = rec.results.iter().copied().collect();
    for n in (1..=20u64).filter(|n| *n != 7 && *n != 13) {
        assert!(got.contains(&(n, n * n)));
    }
}

#[test]
fn test_poisoned_item_is_isolated() {
    let mut pool = WorkerPool::initialize(3, Square).unwrap();
    let mut rec = Recorder::default();
    let items: Vec<u64> = (1..=12).chain([13]).chain(14..=20).collect();
    let summary = pool.run(items, &mut rec).unwrap();

    assert_eq!(summary.total, 20);
    assert_eq!(summary.completed, 19);
    assert_eq!(summary.failed, 1);
    assert_eq!(rec.results.len(), 19);
    assert_eq!(rec.errors.len(), 1);
    assert_eq!(rec.errors[0].0, 13);
    assert!(rec.errors[0].1.contains("poisoned input"));
    pool.finalize().unwrap();
}

#[test]
fn test_error_result_reported_with_original_input() {
    let mut pool = WorkerPool::initialize(2, Square).unwrap();
    let mut rec = Recorder::default();
    let summary = pool.run(vec![6, 7, 8], &mut rec).unwrap();
    pool.finalize().unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(rec.errors, vec![(7, "refusing seven".to_string())]);
}

#[test]
fn test_failed_items_are_not_retried() {
    let mut pool = WorkerPool::initialize(1, Square).unwrap();
    let mut rec = Recorder::default();
    pool.run(vec![13, 13, 2], &mut rec).unwrap();
    pool.finalize().unwrap();

    assert_eq!(rec.started, vec![13, 13, 2]);
    assert_eq!(rec.errors.len(), 2);
    assert_eq!(rec.results, vec![(2, 4)]);
}

// --- dispatch and progress ---

#[test]
fn test_dispatch_follows_input_order() {
    let mut pool = WorkerPool::initialize(2, Square).unwrap();
    let mut rec = Recorder::default();
    let items: Vec<u64> = (1..=10).filter(|n| *n != 7).collect();
    pool.run(items.clone(), &mut rec).unwrap();
    pool.finalize().unwrap();

    assert_eq!(rec.started, items);
}

#[test]
fn test_completion_counters_are_contiguous() {
    let mut pool = WorkerPool::initialize(4, Square).unwrap();
    let mut rec = Recorder::default();
    pool.run((20..40).collect(), &mut rec).unwrap();
    pool.finalize().unwrap();

    for (i, p) in rec.progress.iter().enumerate() {
        assert_eq!(p.total, 20);
        assert_eq!(p.finished, i + 1);
        assert!(p.running >= 1 && p.running <= 4);
    }
    assert_eq!(rec.messages, 20);
}

// --- lifecycle ---

#[test]
fn test_pool_is_reusable_after_a_crash() {
    let mut pool = WorkerPool::initialize(2, Square).unwrap();
    let mut first = Recorder::default();
    pool.run(vec![13, 13, 13], &mut first).unwrap();
    assert_eq!(first.errors.len(), 3);

    let mut second = Recorder::default();
    let summary = pool.run(vec![3, 4], &mut second).unwrap();
    assert_eq!(summary.completed, 2);
    assert_eq!(pool.size(), 2);
    pool.finalize().unwrap();
}

#[test]
fn test_empty_run_returns_immediately() {
    let mut pool = WorkerPool::initialize(2, Square).unwrap();
    let mut rec = Recorder::default();
    let summary = pool.run(Vec::new(), &mut rec).unwrap();
    assert_eq!(summary.total, 0);
    pool.finalize().unwrap();
}

#[test]
fn test_zero_units_rejected() {
    assert!(WorkerPool::initialize(0, Square).is_err());
}

#[test]
fn test_callback_error_aborts_run() {
    struct FailFast;
    impl PoolHandler<u64, (u64, u64)> for FailFast {
        fn on_complete(&mut self, _: PoolProgress, _: usize, _: (u64, u64)) -> Result<()> {
            bail!("store unavailable")
        }
    }

    let mut pool = WorkerPool::initialize(2, Square).unwrap();
    let err = pool.run((1..=6).collect(), &mut FailFast).unwrap_err();
    assert!(format!("{err:#}").contains("store unavailable"));

    // In-flight work drained; the pool accepts a new run.
    let mut rec = Recorder::default();
    assert_eq!(pool.run(vec![2], &mut rec).unwrap().completed, 1);
    pool.finalize().unwrap();
}
