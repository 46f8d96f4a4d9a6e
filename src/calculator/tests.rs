use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::*;
use crate::error::Error;
use crate::formula::{Formula, FormulaAtom};
use crate::oracle::OracleClient;
use crate::test_utils::{client, sample_formula, FailingOracle, GatedOracle, ScriptedOracle};

fn red_is_valid() -> Arc<ScriptedOracle> {
    ScriptedOracle::new(|f| f.to_string().starts_with("red"), |_, _| true)
}

fn batch(client: OracleClient) -> BatchValidityCalculator {
    BatchValidityCalculator::new(client, Duration::from_secs(10)).unwrap()
}

fn atom(predicate: &str) -> FormulaAtom {
    FormulaAtom {
        predicate: predicate.to_string(),
        args: vec![0],
    }
}

/// A headless formula over one object with the given body atoms.
fn denial(body: &[&str]) -> Formula {
    Formula {
        variables: vec!["o".to_string()],
        body: body.iter().map(|p| atom(p)).collect(),
        head: Vec::new(),
        inequalities: Vec::new(),
    }
}

// ========== BATCH TESTS ==========

#[test]
fn batch_answers_all_pending_formulas_in_one_call() {
    let oracle = red_is_valid();
    let calc = batch(client(oracle.clone()));
    calc.submit_formula(&sample_formula("red"));
    calc.submit_formula(&sample_formula("blue"));
    calc.submit_formula(&sample_formula("green"));
    assert_eq!(calc.pending(), 3);
    assert_eq!(oracle.validity_calls(), 0);

    assert!(calc.is_valid(&sample_formula("red")).unwrap());
    assert_eq!(oracle.validity_calls(), 1);
    assert_eq!(oracle.formulas_checked(), 3);
    assert_eq!(calc.pending(), 0);

    assert!(!calc.is_valid(&sample_formula("blue")).unwrap());
    assert!(!calc.is_valid(&sample_formula("green")).unwrap());
    assert_eq!(oracle.validity_calls(), 1);
    assert_eq!(calc.stats().snapshot().cache_hits, 2);
}

#[test]
fn batch_submission_is_idempotent() {
    let oracle = red_is_valid();
    let calc = batch(client(oracle.clone()));
    calc.submit_formula(&sample_formula("red"));
    calc.submit_formula(&sample_formula("red"));
    assert!(calc.is_valid(&sample_formula("red")).unwrap());
    assert_eq!(oracle.formulas_checked(), 1);
    let stats = calc.stats().snapshot();
    assert_eq!(stats.submitted, 1);
    assert_eq!(stats.duplicates, 1);
}

#[test]
fn batch_rejects_unsubmitted_queries() {
    let calc = batch(client(red_is_valid()));
    assert!(matches!(
        calc.is_valid(&sample_formula("red")),
        Err(Error::UnsubmittedFormula { .. })
    ));
}

#[test]
fn batch_oracle_failures_carry_context() {
    let calc = batch(client(Arc::new(FailingOracle)));
    calc.submit_formula(&sample_formula("red"));
    let err = calc.is_valid(&sample_formula("red")).unwrap_err();
    assert!(err.is_oracle_failure());
    assert!(err.to_string().contains("model checker crashed"));
    // the batch stays queued for a retry
    assert_eq!(calc.pending(), 1);
}

#[test]
fn batch_shutdown_cancels_outstanding_queries() {
    let calc = batch(client(red_is_valid()));
    calc.submit_formula(&sample_formula("red"));
    calc.shutdown();
    assert!(matches!(
        calc.is_valid(&sample_formula("red")),
        Err(Error::Cancelled { .. })
    ));
    assert!(matches!(
        calc.entails(&[], &sample_formula("red")),
        Err(Error::Cancelled { .. })
    ));
}

#[test]
fn batch_entailment_goes_straight_to_the_oracle() {
    let oracle = ScriptedOracle::new(|_| true, |premises, _| premises.len() > 1);
    let calc = batch(client(oracle.clone()));
    let red = sample_formula("red");
    assert!(!calc.entails(&[red.clone()], &red).unwrap());
    assert!(calc.entails(&[red.clone(), red.clone()], &red).unwrap());
    assert_eq!(oracle.entailment_calls(), 2);
}

#[test]
fn batch_keeps_equivalent_formulas_apart() {
    let oracle = ScriptedOracle::new(|_| true, |_, _| true);
    let calc = batch(client(oracle.clone()));
    let pq = denial(&["p", "q"]);
    let qp = denial(&["q", "p"]);
    assert_ne!(pq, qp);
    calc.submit_formula(&pq);
    calc.submit_formula(&qp);
    assert_eq!(calc.stats().snapshot().submitted, 2);
    assert_eq!(calc.stats().snapshot().duplicates, 0);

    assert!(calc.is_valid(&pq).unwrap());
    assert!(calc.is_valid(&qp).unwrap());
    assert_eq!(oracle.validity_calls(), 1);
    assert_eq!(oracle.formulas_checked(), 2);
}

#[test]
fn batch_wait_is_bounded() {
    let (release, gate) = crossbeam_channel::unbounded();
    let calc = BatchValidityCalculator::new(
        client(Arc::new(GatedOracle { gate })),
        Duration::from_millis(200),
    )
    .unwrap();
    let red = sample_formula("red");
    calc.submit_formula(&red);
    assert!(matches!(
        calc.is_valid(&red),
        Err(Error::OracleTimeout { .. })
    ));

    // the batch stays in flight; a later query collects it without resending
    release.send(()).unwrap();
    let answer = (0..10)
        .map(|_| calc.is_valid(&red))
        .find(|r| !matches!(r, Err(Error::OracleTimeout { .. })))
        .unwrap();
    assert!(answer.unwrap());
    assert_eq!(calc.stats().snapshot().oracle_calls, 1);
    calc.shutdown();
}

#[test]
fn batch_shutdown_does_not_wait_for_a_hung_oracle() {
    let (release, gate) = crossbeam_channel::unbounded::<()>();
    let calc = BatchValidityCalculator::new(
        client(Arc::new(GatedOracle { gate })),
        Duration::from_secs(10),
    )
    .unwrap();
    let red = sample_formula("red");
    calc.submit_formula(&red);
    calc.submit_formula(&sample_formula("blue"));

    thread::scope(|scope| {
        let waiter = scope.spawn(|| calc.is_valid(&red));
        thread::sleep(Duration::from_millis(50));
        calc.shutdown();
        assert_eq!(calc.pending(), 0);
        assert!(matches!(
            calc.is_valid(&sample_formula("blue")),
            Ok(true) | Err(Error::Cancelled { .. })
        ));
        drop(release);
        let answer = waiter.join().unwrap();
        assert!(matches!(answer, Ok(true) | Err(Error::Cancelled { .. })));
    });
}

#[test]
fn batch_entailment_wait_is_bounded() {
    let (_release, gate) = crossbeam_channel::unbounded::<()>();
    let calc = BatchValidityCalculator::new(
        client(Arc::new(GatedOracle { gate })),
        Duration::from_millis(50),
    )
    .unwrap();
    let red = sample_formula("red");
    assert!(matches!(
        calc.entails(&[red.clone()], &red),
        Err(Error::OracleTimeout { .. })
    ));
}

// ========== PARALLEL TESTS ==========

#[test]
fn parallel_checks_each_formula_once() {
    let oracle = red_is_valid();
    let calc =
        ParallelValidityCalculator::start(client(oracle.clone()), 2, Duration::from_secs(10))
            .unwrap();
    assert_eq!(calc.workers(), 2);
    for _ in 0..3 {
        calc.submit_formula(&sample_formula("red"));
    }
    calc.submit_formula(&sample_formula("blue"));

    assert!(calc.is_valid(&sample_formula("red")).unwrap());
    assert!(calc.is_valid(&sample_formula("red")).unwrap());
    assert!(!calc.is_valid(&sample_formula("blue")).unwrap());
    assert_eq!(oracle.validity_calls(), 2);

    let stats = calc.stats().snapshot();
    assert_eq!(stats.submitted, 2);
    assert_eq!(stats.duplicates, 2);
    assert_eq!(stats.cache_hits, 1);
    calc.shutdown();
}

#[test]
fn parallel_rejects_unsubmitted_queries() {
    let calc =
        ParallelValidityCalculator::start(client(red_is_valid()), 1, Duration::from_secs(10))
            .unwrap();
    assert!(matches!(
        calc.is_valid(&sample_formula("red")),
        Err(Error::UnsubmittedFormula { .. })
    ));
}

#[test]
fn parallel_wait_is_bounded() {
    let (release, gate) = crossbeam_channel::unbounded();
    let calc = ParallelValidityCalculator::start(
        client(Arc::new(GatedOracle { gate })),
        1,
        Duration::from_millis(50),
    )
    .unwrap();
    calc.submit_formula(&sample_formula("red"));
    assert!(matches!(
        calc.is_valid(&sample_formula("red")),
        Err(Error::OracleTimeout { .. })
    ));
    // a later wait can still collect the answer
    release.send(()).unwrap();
    let calc_answer = calc.is_valid(&sample_formula("red"));
    assert!(matches!(calc_answer, Ok(true) | Err(Error::OracleTimeout { .. })));
    drop(release);
    calc.shutdown();
}

#[test]
fn parallel_shutdown_cancels_pending_queries() {
    let (release, gate) = crossbeam_channel::unbounded::<()>();
    let calc = ParallelValidityCalculator::start(
        client(Arc::new(GatedOracle { gate })),
        1,
        Duration::from_secs(10),
    )
    .unwrap();
    calc.submit_formula(&sample_formula("red"));
    calc.submit_formula(&sample_formula("blue"));
    calc.shutdown();

    assert!(matches!(
        calc.is_valid(&sample_formula("red")),
        Err(Error::Cancelled { .. })
    ));
    assert!(matches!(
        calc.is_valid(&sample_formula("blue")),
        Err(Error::Cancelled { .. })
    ));

    calc.submit_formula(&sample_formula("green"));
    assert!(matches!(
        calc.is_valid(&sample_formula("green")),
        Err(Error::Cancelled { .. })
    ));
    assert!(matches!(
        calc.entails(&[], &sample_formula("red")),
        Err(Error::Cancelled { .. })
    ));
    drop(release);
}

#[test]
fn parallel_oracle_failures_are_remembered() {
    let calc =
        ParallelValidityCalculator::start(client(Arc::new(FailingOracle)), 1, Duration::from_secs(10))
            .unwrap();
    calc.submit_formula(&sample_formula("red"));
    for _ in 0..2 {
        let err = calc.is_valid(&sample_formula("red")).unwrap_err();
        assert!(matches!(err, Error::Oracle { .. }));
    }
    assert!(matches!(
        calc.entails(&[], &sample_formula("red")),
        Err(Error::Oracle { .. })
    ));
    calc.shutdown();
}

#[test]
fn parallel_entailment_uses_the_pool() {
    let oracle = ScriptedOracle::new(|_| true, |premises, _| !premises.is_empty());
    let calc =
        ParallelValidityCalculator::start(client(oracle.clone()), 2, Duration::from_secs(10))
            .unwrap();
    let red = sample_formula("red");
    assert!(calc.entails(&[red.clone()], &red).unwrap());
    assert!(!calc.entails(&[], &red).unwrap());
    assert_eq!(oracle.entailment_calls(), 2);
    calc.shutdown();
}

#[test]
fn zero_workers_is_a_configuration_error() {
    let result = ParallelValidityCalculator::start(client(red_is_valid()), 0, Duration::from_secs(1));
    assert!(matches!(result, Err(Error::Config(_))));
}

// ========== FACTORY TESTS ==========

#[test]
fn built_batch_calculator_honours_the_timeout() {
    let (_release, gate) = crossbeam_channel::unbounded::<()>();
    let calc = build(
        &CalculatorKind::Batch,
        client(Arc::new(GatedOracle { gate })),
        Duration::from_millis(100),
    )
    .unwrap();
    calc.submit_formula(&sample_formula("red"));
    assert!(matches!(
        calc.is_valid(&sample_formula("red")),
        Err(Error::OracleTimeout { .. })
    ));
    calc.shutdown();
}

#[test]
fn build_selects_the_configured_calculator() {
    let batch = build(
        &CalculatorKind::Batch,
        client(red_is_valid()),
        Duration::from_secs(1),
    )
    .unwrap();
    batch.submit_formula(&sample_formula("red"));
    assert!(batch.is_valid(&sample_formula("red")).unwrap());

    let parallel = build(
        &CalculatorKind::Parallel { workers: 1 },
        client(red_is_valid()),
        Duration::from_secs(10),
    )
    .unwrap();
    parallel.submit_formula(&sample_formula("red"));
    assert!(parallel.is_valid(&sample_formula("red")).unwrap());
    parallel.shutdown();
}
