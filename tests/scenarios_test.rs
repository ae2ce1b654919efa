use hlcopy::domain::{
    Address, ChangeKind, Coin, Decimal, DecisionKind, DecisionReason, Direction, Position,
    PositionSnapshot, ReconcileNotice, TimeMs, Whitelist,
};
use hlcopy::engine::{
    compute_targets, detect_changes, reconcile, CopyMode, EngineConfig, IntentAction, Thresholds,
};
use hlcopy::orchestration::{step, CopyState, Observation};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn tracked_addr() -> Address {
    "0x95b8b411653328db32f59b143c6d45f8501e2b35".parse().unwrap()
}

fn local_addr() -> Address {
    "0x0000000000000000000000000000000000000001".parse().unwrap()
}

fn pos(coin: &str, size: &str, entry: &str, value: &str, lev: &str) -> Position {
    Position::new(Coin::new(coin), d(size), d(entry), d(value), d(lev))
}

/// Tracked account as observed in production: HYPE and WLFI dominate equity.
fn tracked_snapshot(ts: i64) -> PositionSnapshot {
    PositionSnapshot::new(
        tracked_addr(),
        d("2054213.79"),
        TimeMs::new(ts),
        vec![
            pos("HYPE", "120000", "38.5", "5933252.41", "5"),
            pos("WLFI", "7000000", "0.19", "1440876.38", "3"),
        ],
    )
    .unwrap()
}

fn local_snapshot(ts: i64, positions: Vec<Position>) -> PositionSnapshot {
    PositionSnapshot::new(local_addr(), d("1085.99"), TimeMs::new(ts), positions).unwrap()
}

fn hype_only() -> Whitelist {
    Whitelist::from_pairs(["HYPE/USDC:USDC"])
}

#[test]
fn test_scenario_a_scale_factor_and_hype_target() {
    let tracked = tracked_snapshot(1_000);
    let local = local_snapshot(1_000, vec![]);

    let hype_share = tracked
        .share_of_equity(tracked.get(&Coin::new("HYPE")).unwrap().notional())
        .unwrap();
    assert_eq!(hype_share.to_percent().round_dp(2), d("288.83"));

    let plan = compute_targets(&tracked, &local, &EngineConfig::default()).unwrap();
    assert_eq!(plan.scale_factor.round_dp(6), d("0.000529"));

    let hype = plan.target(&Coin::new("HYPE")).unwrap();
    assert_eq!(hype.direction, Direction::Long);
    assert_eq!(hype.target_local_notional.round_dp(2), d("3136.70"));
}

#[test]
fn test_scenario_b_small_drift_is_no_action() {
    let tracked = tracked_snapshot(1_000);
    let local = local_snapshot(1_000, vec![pos("HYPE", "60.3", "49", "2981.67", "6")]);
    let config = EngineConfig::default();

    let plan = compute_targets(&tracked, &local, &config).unwrap();
    let rec = reconcile(&plan, &local, &hype_only(), &[], &config);

    let hype = rec.decision(&Coin::new("HYPE")).unwrap();
    assert_eq!(hype.kind, DecisionKind::NoAction);
    assert_eq!(hype.reason, DecisionReason::WithinTolerance);
    assert_eq!(hype.diff_pct.unwrap().to_percent().round_dp(1), d("-4.9"));
}

#[test]
fn test_scenario_c_unlisted_coin_is_flagged_not_entered() {
    let tracked = tracked_snapshot(1_000);
    let local = local_snapshot(1_000, vec![pos("HYPE", "60.3", "49", "2981.67", "6")]);
    let config = EngineConfig::default();

    let plan = compute_targets(&tracked, &local, &config).unwrap();
    let wlfi = Coin::new("WLFI");
    let target = plan.target(&wlfi).unwrap();
    assert_eq!(target.target_local_notional.round_dp(2), d("761.74"));

    let rec = reconcile(&plan, &local, &hype_only(), &[], &config);
    assert!(rec.decision(&wlfi).is_none());
    assert!(rec.actionable().all(|dec| dec.kind != DecisionKind::Enter));
    assert!(rec.notices.iter().any(|n| matches!(
        n,
        ReconcileNotice::MissingNotTradable { coin, .. } if coin == &wlfi
    )));
}

#[test]
fn test_scenario_d_local_short_is_force_exited() {
    let tracked = tracked_snapshot(1_000);
    // Far below any threshold, and the tolerance band is huge.
    let local = local_snapshot(1_000, vec![pos("BTC", "-0.00005", "100000", "5", "10")]);
    let config = EngineConfig {
        thresholds: Thresholds::from_percent(d("50"), d("1000")),
        ..EngineConfig::default()
    };
    assert_eq!(config.mode, CopyMode::LongOnly);

    let plan = compute_targets(&tracked, &local, &config).unwrap();
    let rec = reconcile(&plan, &local, &Whitelist::All, &[], &config);

    let btc = rec.decision(&Coin::new("BTC")).unwrap();
    assert_eq!(btc.kind, DecisionKind::ForceExitWrongDirection);
    assert_eq!(btc.reason, DecisionReason::DirectionNotCopied);
    assert_eq!(btc.direction, Direction::Short);
}

#[test]
fn test_full_cycle_for_production_snapshot() {
    let state = CopyState::new(tracked_addr(), local_addr());
    let observation = Observation {
        tracked: Some(tracked_snapshot(1_000)),
        local: Some(local_snapshot(
            1_000,
            vec![
                pos("HYPE", "60.3", "49", "2981.67", "6"),
                pos("BTC", "-0.00005", "100000", "5", "10"),
            ],
        )),
        whitelist: hype_only(),
    };

    let (next, outcome) = step(&state, observation, &EngineConfig::default()).unwrap();
    assert_eq!(next.cycles, 1);

    // Bootstrap: HYPE and WLFI are reported as opened, nothing else.
    assert!(outcome.changes.iter().all(|c| c.kind == ChangeKind::OpenedLong));
    assert_eq!(outcome.changes.len(), 2);

    assert_eq!(outcome.intents.len(), 1);
    let intent = &outcome.intents[0];
    assert_eq!(intent.coin, Coin::new("BTC"));
    assert_eq!(intent.action, IntentAction::ForceExit);
    assert_eq!(intent.priority, 0);

    assert!(outcome
        .notices
        .iter()
        .any(|n| n.coin() == &Coin::new("WLFI")));
}

#[test]
fn test_reconcile_is_deterministic() {
    let tracked = tracked_snapshot(1_000);
    let local = local_snapshot(
        1_000,
        vec![
            pos("HYPE", "40", "49", "1900", "6"),
            pos("SOL", "1", "150", "150", "6"),
            pos("BTC", "-0.00005", "100000", "5", "10"),
        ],
    );
    let config = EngineConfig::default();
    let plan = compute_targets(&tracked, &local, &config).unwrap();

    let first = reconcile(&plan, &local, &Whitelist::All, &[], &config);
    let second = reconcile(&plan, &local, &Whitelist::All, &[], &config);
    assert_eq!(first, second);

    // At most one decision per coin.
    let mut coins: Vec<_> = first.decisions.iter().map(|dec| dec.coin.clone()).collect();
    let total = coins.len();
    coins.dedup();
    assert_eq!(coins.len(), total);
}

#[test]
fn test_adjustment_threshold_boundary_is_inclusive() {
    let tracked = PositionSnapshot::new(
        tracked_addr(),
        d("10000"),
        TimeMs::new(1),
        vec![pos("BTC", "0.01", "100000", "1000", "5")],
    )
    .unwrap();
    let config = EngineConfig::default();

    let at_edge = PositionSnapshot::new(
        local_addr(),
        d("10000"),
        TimeMs::new(1),
        vec![pos("BTC", "0.011", "100000", "1100", "5")],
    )
    .unwrap();
    let plan = compute_targets(&tracked, &at_edge, &config).unwrap();
    let rec = reconcile(&plan, &at_edge, &Whitelist::All, &[], &config);
    assert_eq!(
        rec.decision(&Coin::new("BTC")).unwrap().kind,
        DecisionKind::NoAction
    );

    let past_edge = PositionSnapshot::new(
        local_addr(),
        d("10000"),
        TimeMs::new(1),
        vec![pos("BTC", "0.011", "100000", "1100.01", "5")],
    )
    .unwrap();
    let plan = compute_targets(&tracked, &past_edge, &config).unwrap();
    let rec = reconcile(&plan, &past_edge, &Whitelist::All, &[], &config);
    assert_eq!(
        rec.decision(&Coin::new("BTC")).unwrap().kind,
        DecisionKind::Decrease
    );
}

#[test]
fn test_bootstrap_yields_only_opened_events() {
    let current = PositionSnapshot::new(
        tracked_addr(),
        d("100000"),
        TimeMs::new(1),
        vec![
            pos("BTC", "0.5", "90000", "50000", "5"),
            pos("ETH", "-3", "3000", "9000", "5"),
        ],
    )
    .unwrap();

    let events = detect_changes(None, &current, &Thresholds::default());
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.kind.is_opened()));
    assert_eq!(events[0].kind, ChangeKind::OpenedLong);
    assert_eq!(events[1].kind, ChangeKind::OpenedShort);
}
