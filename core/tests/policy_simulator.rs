use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use ringwatch_core::{
    config::PolicyParams,
    error::EngineError,
    policy_simulator::{simulate, sweep},
    risk_scorer::RiskScore,
};

fn scores(values: &[u16]) -> Vec<RiskScore> {
    values.iter().copied().map(RiskScore::new).collect()
}

#[test]
fn block_below_review_is_rejected() {
    let result = simulate(&scores(&[900, 100]), 700, 950, &PolicyParams::default());
    match result {
        Err(EngineError::InvalidPolicy { block_threshold, review_threshold, .. }) => {
            assert_eq!(block_threshold, 700);
            assert_eq!(review_threshold, 950);
        }
        other => panic!("Expected InvalidPolicy, got {other:?}"),
    }
}

#[test]
fn out_of_range_thresholds_are_rejected() {
    let result = simulate(&scores(&[500]), 1200, 800, &PolicyParams::default());
    assert!(matches!(result, Err(EngineError::InvalidPolicy { .. })));
}

#[test]
fn equal_thresholds_are_allowed() {
    let impact = simulate(&scores(&[900, 100]), 800, 800, &PolicyParams::default()).unwrap();
    assert_eq!(impact.block_fraction, impact.review_fraction);
}

#[test]
fn empty_population_projects_nothing() {
    let impact = simulate(&[], 950, 800, &PolicyParams::default()).unwrap();
    assert_eq!(impact.projected_fraud_reduction, 0.0);
    assert_eq!(impact.projected_false_positive_rate, 0.0);
    assert_eq!(impact.block_fraction, 0.0);
    assert_eq!(impact.review_fraction, 0.0);
}

#[test]
fn impact_follows_documented_formula() {
    // p = 1.0, 0.9, 0.5, 0.0 → fraud mass 2.4, legit mass 1.6.
    // 1000 blocked: catches 1.0. 900 reviewed: catches 0.45, hits 0.05 legit.
    let impact = simulate(&scores(&[1000, 900, 500, 0]), 950, 800, &PolicyParams::default()).unwrap();

    assert!((impact.projected_fraud_reduction - 1.45 / 2.4).abs() < 1e-9);
    assert!((impact.projected_false_positive_rate - 0.05 / 1.6).abs() < 1e-9);
    assert_eq!(impact.block_fraction, 0.25);
    assert_eq!(impact.review_fraction, 0.5);
}

#[test]
fn impact_is_monotone_in_both_thresholds() {
    let mut rng = Pcg64Mcg::seed_from_u64(77);
    let population: Vec<RiskScore> = (0..400).map(|_| RiskScore::new(rng.gen_range(0..=1000))).collect();
    let params = PolicyParams::default();

    // Lower block threshold, fixed review.
    let mut previous = simulate(&population, 1000, 600, &params).unwrap();
    for block in (600..1000).rev().step_by(25) {
        let current = simulate(&population, block, 600, &params).unwrap();
        assert!(current.projected_fraud_reduction >= previous.projected_fraud_reduction);
        assert!(current.projected_false_positive_rate >= previous.projected_false_positive_rate);
        previous = current;
    }

    // Lower review threshold, fixed block.
    let mut previous = simulate(&population, 900, 900, &params).unwrap();
    for review in (0..900).rev().step_by(50) {
        let current = simulate(&population, 900, review, &params).unwrap();
        assert!(current.projected_fraud_reduction >= previous.projected_fraud_reduction);
        assert!(current.projected_false_positive_rate >= previous.projected_false_positive_rate);
        assert!(current.review_fraction >= previous.review_fraction);
        previous = current;
    }
}

#[test]
fn sweep_skips_blocks_below_review() {
    let population = scores(&[950, 850, 720, 300]);
    let curve = sweep(&population, 800, 700, 1000, 10, &PolicyParams::default()).unwrap();

    assert_eq!(curve.len(), 21);
    assert_eq!(curve[0].block_threshold, 800);
    assert_eq!(curve.last().map(|i| i.block_threshold), Some(1000));
    assert!(curve.iter().all(|i| i.review_threshold == 800));
}

#[test]
fn sweep_keeps_its_grid_when_review_is_off_grid() {
    let population = scores(&[950, 850, 720, 300]);
    let curve = sweep(&population, 805, 700, 1000, 10, &PolicyParams::default()).unwrap();

    assert_eq!(curve.len(), 20);
    assert_eq!(curve[0].block_threshold, 810);
    assert!(curve.iter().all(|i| i.block_threshold % 10 == 0));
    assert_eq!(curve.last().map(|i| i.block_threshold), Some(1000));
}

#[test]
fn sweep_with_no_grid_point_above_review_is_empty() {
    let curve = sweep(&scores(&[500]), 995, 700, 990, 100, &PolicyParams::default()).unwrap();
    assert!(curve.is_empty());
}

#[test]
fn sweep_rejects_zero_step() {
    let result = sweep(&scores(&[500]), 800, 800, 1000, 0, &PolicyParams::default());
    assert!(matches!(result, Err(EngineError::InvalidPolicy { .. })));
}
