use tempora_core::{
    AdaptiveEngine, ConfigError, Duration, FactorRange, Hierarchy, OpKind, TemporalEngine,
    TemporalError, TemporalSystem, UnitSpec,
};

fn adaptive(agents: usize) -> AdaptiveEngine {
    AdaptiveEngine::new(TemporalEngine::default(), agents).expect("valid agent count")
}

#[test]
fn construction_requires_at_least_one_agent() {
    let err = AdaptiveEngine::new(TemporalEngine::default(), 0).unwrap_err();
    assert_eq!(err, ConfigError::InvalidAgentCount(0));
}

#[test]
fn optimal_ranges_scale_with_the_agent_count() {
    let two = adaptive(2);
    assert_eq!(
        two.optimal_ranges(),
        &[
            FactorRange { min: 2, max: 10 },
            FactorRange { min: 5, max: 24 },
            FactorRange { min: 10, max: 100 },
        ]
    );

    let three = adaptive(3);
    assert_eq!(three.optimal_ranges()[0], FactorRange { min: 3, max: 15 });
}

#[test]
fn wrapped_operations_are_counted_once_each() {
    let mut adaptive = adaptive(2);
    let t1 = adaptive.create(&[("epoch", 1), ("cycle", 12), ("step", 30)]).unwrap();
    let t2 = adaptive.create(&[("cycle", 10), ("step", 45)]).unwrap();

    adaptive.add(&t1, &Duration::new(&[("cycle", 5)])).unwrap();
    adaptive.subtract(&t2, &Duration::new(&[("step", 10)])).unwrap();
    adaptive.compare(&t1, &t2).unwrap();
    adaptive.to_human(&t1).unwrap();
    adaptive.from_human(&[("minutes", 3)]).unwrap();

    let tracker = adaptive.tracker();
    assert_eq!(tracker.op_count(OpKind::Add), 1);
    assert_eq!(tracker.op_count(OpKind::Subtract), 1);
    assert_eq!(tracker.op_count(OpKind::Compare), 1);
    assert_eq!(tracker.op_count(OpKind::ToHuman), 1);
    assert_eq!(tracker.op_count(OpKind::FromHuman), 1);
    assert_eq!(tracker.tick(), 5);
}

#[test]
fn threshold_resets_the_tick_but_keeps_history() {
    let mut adaptive = adaptive(2);
    adaptive.set_adaptation_threshold(5);

    let tp = adaptive.create(&[("cycle", 1)]).unwrap();
    for _ in 0..10 {
        adaptive.compare(&tp, &tp).unwrap();
    }

    // Two tuning passes ran (at tick 5 and 10); the tick is back at zero
    // while the lifetime counter keeps the full history.
    assert_eq!(adaptive.tracker().tick(), 0);
    assert_eq!(adaptive.tracker().op_count(OpKind::Compare), 10);
    // Untagged usage never drives an adjustment.
    assert_eq!(adaptive.hierarchy().revision(), 0);
}

#[test]
fn heavy_tagged_usage_clamps_an_out_of_range_factor() {
    let mut adaptive = adaptive(2);
    adaptive.set_adaptation_threshold(4);

    for _ in 0..4 {
        adaptive.track_operation(OpKind::Add, Some("cycle"));
    }

    // cycle sits in the middle band [5, 24]; its factor 60 clamps to 24.
    let cycle = &adaptive.hierarchy().units()[1];
    assert_eq!(cycle.subdivision_to_next, Some(24));
    assert_eq!(adaptive.hierarchy().revision(), 1);
}

#[test]
fn in_range_factors_follow_usage_shares() {
    let hierarchy = Hierarchy::build(vec![
        UnitSpec::with_factor("outer", 4),
        UnitSpec::with_factor("mid", 20),
        UnitSpec::with_factor("inner", 50),
        UnitSpec::base("base"),
    ])
    .unwrap();
    let mut adaptive = AdaptiveEngine::new(TemporalEngine::new(hierarchy), 2).unwrap();
    adaptive.set_adaptation_threshold(20);

    // mid lands between the 5% and 10% share marks and shrinks by three
    // tenths; inner dominates and grows by half, capped by its range.
    adaptive.track_operation(OpKind::Add, Some("mid"));
    for _ in 0..19 {
        adaptive.track_operation(OpKind::Add, Some("inner"));
    }

    let factors: Vec<_> = adaptive
        .hierarchy()
        .units()
        .iter()
        .map(|u| u.subdivision_to_next)
        .collect();
    assert_eq!(factors, [Some(4), Some(14), Some(75), None]);
}

#[test]
fn optimize_for_agent_count_reclamps_every_factor() {
    let mut adaptive = adaptive(2);
    adaptive.optimize_for_agent_count(3).unwrap();

    assert_eq!(adaptive.agent_count(), 3);
    assert_eq!(adaptive.optimal_ranges()[0], FactorRange { min: 3, max: 15 });

    // 24/60/1000 all sat above their bands and were pulled to the maxima.
    let factors: Vec<_> = adaptive
        .hierarchy()
        .units()
        .iter()
        .map(|u| u.subdivision_to_next)
        .collect();
    assert_eq!(factors, [Some(15), Some(24), Some(100), None]);

    let err = adaptive.optimize_for_agent_count(0).unwrap_err();
    assert_eq!(err, ConfigError::InvalidAgentCount(0));
}

#[test]
fn structural_changes_recompute_the_range_table() {
    let mut adaptive = adaptive(2);

    adaptive.insert_unit_after("megacycle", 4, "epoch").unwrap();
    // 1 epoch = 24 megacycles = 24*4*60*1000 microsteps.
    let epoch = adaptive.create(&[("epoch", 1)]).unwrap();
    assert_eq!(adaptive.to_absolute(&epoch).unwrap(), 5_760_000);
    // Four non-base units now: two coarse positions, one middle, one fine.
    assert_eq!(
        adaptive.optimal_ranges(),
        &[
            FactorRange { min: 2, max: 10 },
            FactorRange { min: 2, max: 10 },
            FactorRange { min: 5, max: 24 },
            FactorRange { min: 10, max: 100 },
        ]
    );

    adaptive.remove_unit("megacycle").unwrap();
    adaptive.remove_unit("cycle").unwrap();
    // 1 epoch = 24 steps = 24_000 microsteps.
    let epoch = adaptive.create(&[("epoch", 1)]).unwrap();
    assert_eq!(adaptive.to_absolute(&epoch).unwrap(), 24_000);
    assert_eq!(
        adaptive.optimal_ranges(),
        &[
            FactorRange { min: 2, max: 10 },
            FactorRange { min: 5, max: 24 },
        ]
    );
}

#[test]
fn tuning_invalidates_previously_issued_timepoints() {
    let mut adaptive = adaptive(2);
    adaptive.set_adaptation_threshold(1);

    let tp = adaptive.create(&[("cycle", 3)]).unwrap();
    // One tagged operation reaches the threshold and clamps cycle's factor,
    // bumping the revision under the stale-rejection rule.
    adaptive.track_operation(OpKind::Add, Some("cycle"));
    assert_eq!(adaptive.hierarchy().revision(), 1);

    let err = adaptive.add(&tp, &Duration::zero()).unwrap_err();
    assert!(matches!(err, TemporalError::StaleTimepoint { .. }));
}

#[test]
fn delegated_adjust_factor_keeps_validation() {
    let mut adaptive = adaptive(2);
    adaptive.adjust_factor("cycle", 30).unwrap();
    assert_eq!(
        adaptive.hierarchy().units()[1].subdivision_to_next,
        Some(30)
    );

    let err = adaptive.adjust_factor("microstep", 5).unwrap_err();
    assert_eq!(err, ConfigError::BaseUnitImmutable("microstep".to_string()));
}
