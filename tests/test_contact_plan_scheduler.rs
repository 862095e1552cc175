//! Contact-plan scheduler end-to-end: conservation, duplicate suppression,
//! buffer monotonicity, air-byte accounting.

use chrono::{DateTime, Duration, TimeZone, Utc};
use dtn_sim_core::{
    ContactPlan, ContactWindow, CopyMode, DropPolicy, LinkDirection, PlanScheduler,
    SchedulerConfig,
};

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

fn window(sat: &str, link: LinkDirection, start_s: f64, end_s: f64, rate: f64) -> ContactWindow {
    ContactWindow {
        satellite: sat.to_string(),
        link,
        start_s,
        end_s,
        rate_bytes_per_s: rate,
        capacity_bytes: rate * (end_s - start_s),
        propagation_delay_s: 0.005,
        mean_range_km: 1200.0,
    }
}

/// One LEO with a pass every 90 minutes over the whole span.
fn periodic_plan(stop_s: f64, rate: f64) -> ContactPlan {
    let mut windows = Vec::new();
    let mut t = 600.0;
    while t + 3000.0 < stop_s {
        windows.push(window("LEO-1", LinkDirection::Uplink, t, t + 300.0, rate));
        windows.push(window(
            "LEO-1",
            LinkDirection::Downlink,
            t + 2400.0,
            t + 2700.0,
            rate,
        ));
        t += 5400.0;
    }
    ContactPlan::from_windows(windows).unwrap()
}

#[test]
fn test_single_copy_conservation() {
    // Scenario: one LEO, oldest-drop buffers, 7-day span, 4 h TTL.
    // Every created bundle ends in exactly one of: delivered, buffer
    // dropped, TTL dropped, still in flight.
    let stop_s: i64 = 7 * 86_400;
    let config = SchedulerConfig {
        start_time: start_time(),
        stop_time: start_time() + Duration::seconds(stop_s),
        lambda_msg_per_second: 0.001,
        msg_size_bytes: 10_000,
        source_buffer_bytes: 300_000,
        satellite_buffer_bytes: 200_000,
        buffer_policy: DropPolicy::Oldest,
        routing: CopyMode::Single,
        min_dwell_seconds: 300.0,
        ttl_seconds: 4.0 * 3600.0,
        rng_seed: 31,
        ..SchedulerConfig::default()
    };
    let plan = periodic_plan(stop_s as f64, 10_000.0);

    let mut scheduler = PlanScheduler::new(config, &plan).unwrap();
    let report = scheduler.run().unwrap();

    assert!(report.created > 0);
    assert!(report.delivered > 0, "a 7-day plan must deliver something");
    assert_eq!(
        report.delivered as u64
            + report.buffer_drops
            + report.ttl_drops
            + report.in_flight as u64,
        report.created as u64,
        "bundle conservation: delivered {} + buffer {} + ttl {} + in-flight {} != created {}",
        report.delivered,
        report.buffer_drops,
        report.ttl_drops,
        report.in_flight,
        report.created
    );

    // Exactly one delivery record per delivered id
    let mut ids: Vec<u64> = report.deliveries.iter().map(|d| d.bundle_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), report.deliveries.len());

    // Latencies are consistent and non-negative
    for delivery in &report.deliveries {
        assert!(delivery.latency_s >= 0.0);
        assert!(
            (delivery.delivered_at_s - delivery.created_at_s - delivery.latency_s).abs() < 1e-9
        );
    }
}

#[test]
fn test_air_bytes_dominate_delivered_payload() {
    // Invariant: air bytes >= payload bytes delivered x ARQ factor
    let stop_s: i64 = 2 * 86_400;
    let config = SchedulerConfig {
        start_time: start_time(),
        stop_time: start_time() + Duration::seconds(stop_s),
        lambda_msg_per_second: 0.002,
        msg_size_bytes: 10_000,
        routing: CopyMode::Single,
        rng_seed: 77,
        ..SchedulerConfig::default()
    };
    let plan = periodic_plan(stop_s as f64, 10_000.0);

    let mut scheduler = PlanScheduler::new(config, &plan).unwrap();
    let report = scheduler.run().unwrap();

    assert!(report.delivered > 0);
    assert!(report.air_bytes >= report.payload_bytes_delivered as f64 * 1.05 - 1e-6);
}

#[test]
fn test_spray_produces_duplicate_suppression() {
    // Two satellites, spray budget 2: every delivered bundle has a second
    // copy arriving in the later downlink, suppressed at the destination
    let stop_s: i64 = 7_200;
    let config = SchedulerConfig {
        start_time: start_time(),
        stop_time: start_time() + Duration::seconds(stop_s),
        lambda_msg_per_second: 0.0, // fallback workload: 100 bundles
        msg_size_bytes: 10_000,
        routing: CopyMode::Spray,
        spray_copies: 2,
        min_dwell_seconds: 0.0,
        ttl_seconds: 0.0,
        rng_seed: 5,
        ..SchedulerConfig::default()
    };
    let rate = 100_000.0;
    let plan = ContactPlan::from_windows(vec![
        window("LEO-A", LinkDirection::Uplink, 5_000.0, 5_500.0, rate),
        window("LEO-B", LinkDirection::Uplink, 5_600.0, 6_100.0, rate),
        window("LEO-A", LinkDirection::Downlink, 6_200.0, 6_700.0, rate),
        window("LEO-B", LinkDirection::Downlink, 6_750.0, 7_150.0, rate),
    ])
    .unwrap();

    let mut scheduler = PlanScheduler::new(config, &plan).unwrap();
    let report = scheduler.run().unwrap();

    assert_eq!(report.created, 100, "fallback workload size");
    assert!(report.delivered > 0);
    assert!(report.dup_suppressed > 0, "second copies must be suppressed");

    // Exactly one delivery record per id even with two copies in flight
    let ids: Vec<u64> = report.deliveries.iter().map(|d| d.bundle_id).collect();
    let unique = {
        let mut v = ids.clone();
        v.sort_unstable();
        v.dedup();
        v.len()
    };
    assert_eq!(unique, ids.len());

    // Every bundle uplinked to both satellites and downlinked twice yields
    // one record plus one suppression
    assert!(report.dup_suppressed <= report.delivered as u64);
}

#[test]
fn test_buffer_capacity_monotonicity() {
    // Law: growing either buffer never increases buffer drops
    let stop_s: i64 = 3 * 86_400;
    let plan = periodic_plan(stop_s as f64, 10_000.0);

    let run_with_source_buffer = |bytes: u64| {
        let config = SchedulerConfig {
            start_time: start_time(),
            stop_time: start_time() + Duration::seconds(stop_s),
            lambda_msg_per_second: 0.002,
            msg_size_bytes: 10_000,
            source_buffer_bytes: bytes,
            satellite_buffer_bytes: 5_000_000,
            buffer_policy: DropPolicy::Oldest,
            routing: CopyMode::Single,
            ttl_seconds: 0.0,
            rng_seed: 13,
            ..SchedulerConfig::default()
        };
        let mut scheduler = PlanScheduler::new(config, &plan).unwrap();
        scheduler.run().unwrap()
    };

    let tight = run_with_source_buffer(100_000);
    let medium = run_with_source_buffer(500_000);
    let roomy = run_with_source_buffer(50_000_000);

    assert!(tight.buffer_drops >= medium.buffer_drops);
    assert!(medium.buffer_drops >= roomy.buffer_drops);
    assert!(tight.created == medium.created && medium.created == roomy.created);
}

#[test]
fn test_dwell_spanning_window_blocks_same_pass() {
    // Boundary: dwell equal to the gap between uplink end and downlink
    // start blocks the same pass entirely
    let stop_s: i64 = 20_000;
    let mk_config = |dwell: f64| SchedulerConfig {
        start_time: start_time(),
        stop_time: start_time() + Duration::seconds(stop_s),
        lambda_msg_per_second: 0.0,
        msg_size_bytes: 10_000,
        routing: CopyMode::Single,
        min_dwell_seconds: dwell,
        ttl_seconds: 0.0,
        rng_seed: 21,
        ..SchedulerConfig::default()
    };
    let rate = 100_000.0;
    // Single pass: uplink then an immediate downlink, then a late pass
    let plan = ContactPlan::from_windows(vec![
        window("LEO-1", LinkDirection::Uplink, 10_000.0, 10_300.0, rate),
        window("LEO-1", LinkDirection::Downlink, 10_300.0, 10_600.0, rate),
        window("LEO-1", LinkDirection::Downlink, 15_000.0, 15_300.0, rate),
    ])
    .unwrap();

    // Without dwell the first downlink serves the same pass
    let mut fast = PlanScheduler::new(mk_config(0.0), &plan).unwrap();
    let fast_report = fast.run().unwrap();
    assert!(fast_report.delivered > 0);
    assert!(fast_report
        .deliveries
        .iter()
        .all(|d| d.delivered_at_s < 11_000.0));

    // With a dwell past the first downlink, delivery waits for the late pass
    let mut held = PlanScheduler::new(mk_config(600.0), &plan).unwrap();
    let held_report = held.run().unwrap();
    assert!(held_report.delivered > 0);
    assert!(held_report
        .deliveries
        .iter()
        .all(|d| d.delivered_at_s >= 15_000.0));
}
