//! TTL expiry, horizon boundaries, and outcome classification.

use chrono::{DateTime, TimeZone, Utc};
use dtn_sim_core::{
    BundleOutcome, ContactEngine, EngineConfig, Node, PhyProfile, RoutingKind, StaticOracle, Vec3,
};

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

/// Source and destination permanently out of range of each other.
fn isolated_pair() -> (Vec<Node>, StaticOracle) {
    let nodes = vec![Node::satellite("SAT-1"), Node::ground_station("GS-DST")];
    let oracle = StaticOracle::new(vec![
        Vec3::new(7000.0, 0.0, 0.0),
        Vec3::new(-7000.0, 0.0, 0.0),
    ]);
    (nodes, oracle)
}

fn isolated_config() -> EngineConfig {
    EngineConfig {
        num_bundles: 1,
        routing: RoutingKind::Epidemic,
        phy: PhyProfile {
            name: "test-link".to_string(),
            data_rate_bps: 8_000.0,
            handshake_overhead_s: 1.0,
            max_range_km: 500.0,
            bit_error_rate: 0.0,
        },
        start_time: start_time(),
        horizon_minutes: 20.0,
        step_seconds: 60.0,
        bundle_src_names: vec!["SAT-1".to_string()],
        bundle_dst_names: vec!["GS-DST".to_string()],
        bundle_release_offsets_minutes: vec![0.0],
        ..EngineConfig::default()
    }
}

#[test]
fn test_unreachable_destination_expires_after_ttl() {
    let (nodes, oracle) = isolated_pair();
    let mut config = isolated_config();
    config.ttl_minutes = 10.0;

    let mut engine = ContactEngine::new(config, nodes, Box::new(oracle)).unwrap();
    let summary = engine.run().unwrap();

    assert_eq!(summary.expired, 1);
    let report = &summary.reports[0];
    assert_eq!(report.outcome, BundleOutcome::Expired);
    // With 60 s steps, age first exceeds 600 s at t = 660
    assert_eq!(report.expired_at_s, Some(660.0));
    assert!(report.expired_at_s.unwrap() - report.release_time_s > 600.0);
    assert_eq!(engine.event_log().events_of_type("Expired").len(), 1);
}

#[test]
fn test_ttl_zero_never_expires() {
    let (nodes, oracle) = isolated_pair();
    let mut config = isolated_config();
    config.ttl_minutes = 0.0;

    let mut engine = ContactEngine::new(config, nodes, Box::new(oracle)).unwrap();
    let summary = engine.run().unwrap();

    assert_eq!(summary.expired, 0);
    assert_eq!(summary.not_delivered, 1);
    assert_eq!(summary.reports[0].outcome, BundleOutcome::NotDelivered);
}

#[test]
fn test_horizon_at_or_below_offset_is_empty_run() {
    let (nodes, oracle) = isolated_pair();
    let mut config = isolated_config();
    config.sim_start_offset_minutes = 20.0;
    config.horizon_minutes = 20.0;

    let mut engine = ContactEngine::new(config, nodes, Box::new(oracle)).unwrap();
    let summary = engine.run().unwrap();

    assert!(summary.nothing_simulated);
    assert_eq!(summary.ticks_executed, 0);
    assert_eq!(summary.not_simulated, 1);
    assert_eq!(summary.delivered + summary.expired + summary.not_delivered, 0);
}

#[test]
fn test_outcomes_are_exhaustive_and_exclusive() {
    // Mixed population: one deliverable pair, one expiring bundle, one
    // never-released bundle
    let nodes = vec![
        Node::ground_station("GS-A"),
        Node::ground_station("GS-B"),
        Node::satellite("SAT-FAR"),
    ];
    let oracle = StaticOracle::new(vec![
        Vec3::new(6400.0, 0.0, 0.0),
        Vec3::new(6400.0, 200.0, 0.0),
        Vec3::new(-7000.0, 0.0, 0.0),
    ]);
    let config = EngineConfig {
        num_bundles: 3,
        routing: RoutingKind::Epidemic,
        phy: PhyProfile {
            name: "test-link".to_string(),
            data_rate_bps: 8_000.0,
            handshake_overhead_s: 1.0,
            max_range_km: 500.0,
            bit_error_rate: 0.0,
        },
        start_time: start_time(),
        horizon_minutes: 20.0,
        step_seconds: 60.0,
        ttl_minutes: 5.0,
        bundle_src_names: vec![
            "GS-A".to_string(),
            "SAT-FAR".to_string(),
            "GS-A".to_string(),
        ],
        bundle_dst_names: vec![
            "GS-B".to_string(),
            "GS-B".to_string(),
            "GS-B".to_string(),
        ],
        // Third bundle releases an hour past the horizon
        bundle_release_offsets_minutes: vec![0.0, 0.0, 60.0],
        ..EngineConfig::default()
    };

    let mut engine = ContactEngine::new(config, nodes, Box::new(oracle)).unwrap();
    let summary = engine.run().unwrap();

    assert_eq!(summary.delivered, 1);
    assert_eq!(summary.expired, 1);
    assert_eq!(summary.not_simulated, 1);
    assert_eq!(summary.not_delivered, 0);
    assert_eq!(
        summary.delivered + summary.expired + summary.not_delivered + summary.not_simulated,
        summary.reports.len()
    );

    // Per-report cross-checks (invariants 2 and 3)
    for report in &summary.reports {
        match report.outcome {
            BundleOutcome::Delivered => {
                assert!(report.delivered_at_s.unwrap() >= report.release_time_s);
                assert!(report.expired_at_s.is_none());
            }
            BundleOutcome::Expired => {
                assert!(report.expired_at_s.unwrap() - report.release_time_s > 5.0 * 60.0);
                assert!(report.delivered_at_s.is_none());
            }
            BundleOutcome::NotDelivered | BundleOutcome::NotSimulated => {
                assert!(report.delivered_at_s.is_none());
                assert!(report.expired_at_s.is_none());
            }
        }
    }
}

#[test]
fn test_horizon_extension_preserves_deliveries() {
    // Buffer law analogue on the time axis: a longer horizon can only add
    // outcomes, never revoke a delivery
    let nodes = vec![Node::ground_station("GS-A"), Node::ground_station("GS-B")];
    let oracle = StaticOracle::new(vec![
        Vec3::new(6400.0, 0.0, 0.0),
        Vec3::new(6400.0, 200.0, 0.0),
    ]);
    let config_for = |horizon: f64| EngineConfig {
        num_bundles: 1,
        routing: RoutingKind::Epidemic,
        phy: PhyProfile {
            name: "test-link".to_string(),
            data_rate_bps: 8_000.0,
            handshake_overhead_s: 1.0,
            max_range_km: 500.0,
            bit_error_rate: 0.0,
        },
        start_time: start_time(),
        horizon_minutes: horizon,
        step_seconds: 60.0,
        bundle_src_names: vec!["GS-A".to_string()],
        bundle_dst_names: vec!["GS-B".to_string()],
        bundle_release_offsets_minutes: vec![0.0],
        ..EngineConfig::default()
    };

    let mut short = ContactEngine::new(config_for(10.0), nodes.clone(), Box::new(oracle.clone()))
        .unwrap();
    let short_summary = short.run().unwrap();

    let mut long =
        ContactEngine::new(config_for(60.0), nodes, Box::new(oracle)).unwrap();
    let long_summary = long.run().unwrap();

    assert_eq!(short_summary.delivered, 1);
    assert!(long_summary.delivered >= short_summary.delivered);
    assert_eq!(
        short_summary.reports[0].delivered_at_s,
        long_summary.reports[0].delivered_at_s
    );
}
