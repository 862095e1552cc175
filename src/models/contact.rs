//! Contact-plan model
//!
//! A contact window is a directed link opportunity between a ground station
//! and a satellite, pre-computed by an external pass predictor. The
//! serialised schema ([`ContactRecord`]) carries wall-clock timestamps and
//! elevation statistics; the engine form ([`ContactWindow`]) is reduced to
//! seconds since run start, rate, capacity, and propagation delay.
//!
//! Windows are immutable during a run and consumed in ascending
//! `(start, satellite, link)` order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Direction of a contact window relative to the satellite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    /// Ground-station source transmits to the satellite.
    Uplink,
    /// Satellite transmits to the ground-station destination.
    Downlink,
}

impl fmt::Display for LinkDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkDirection::Uplink => write!(f, "uplink"),
            LinkDirection::Downlink => write!(f, "downlink"),
        }
    }
}

/// Errors raised while validating a contact plan.
#[derive(Debug, Error, PartialEq)]
pub enum ContactPlanError {
    #[error("contact for {satellite} ({link}) has end <= start")]
    EmptyWindow {
        satellite: String,
        link: LinkDirection,
    },

    #[error("contact for {satellite} ({link}) has non-positive rate")]
    InvalidRate {
        satellite: String,
        link: LinkDirection,
    },

    #[error(
        "contact for {satellite} ({link}) capacity mismatch: declared {declared} bytes, rate x duration gives {derived} bytes"
    )]
    CapacityMismatch {
        satellite: String,
        link: LinkDirection,
        declared: f64,
        derived: f64,
    },
}

/// One row of the serialised contact-plan schema.
///
/// This mirrors the pass-predictor export format; elevation statistics are
/// carried through for reporting but do not influence scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub satellite: String,
    pub link: LinkDirection,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub mean_elev_deg: f64,
    pub max_elev_deg: f64,
    pub mean_range_km: f64,
    pub mean_rate_mbps: f64,
    pub rate_bytes_per_second: f64,
    pub capacity_bytes: f64,
    pub propagation_delay_seconds: f64,
}

/// Engine form of a contact window: seconds since run start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactWindow {
    pub satellite: String,
    pub link: LinkDirection,
    pub start_s: f64,
    pub end_s: f64,
    pub rate_bytes_per_s: f64,
    pub capacity_bytes: f64,
    pub propagation_delay_s: f64,
    pub mean_range_km: f64,
}

impl ContactWindow {
    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }
}

/// Provider of contact windows for a time span.
///
/// The scheduler consumes this interface; the concrete plan is owned by the
/// caller and immutable during a run.
pub trait ContactPlanSource {
    /// Windows whose start falls in `[start_s, stop_s)`, ascending by
    /// `(start, satellite, link)`.
    fn contacts(&self, start_s: f64, stop_s: f64) -> Vec<ContactWindow>;
}

/// A validated, sorted sequence of contact windows.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use dtn_sim_core::models::contact::{ContactPlan, ContactRecord, LinkDirection};
///
/// let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
/// let record = ContactRecord {
///     satellite: "LEO-1".to_string(),
///     link: LinkDirection::Uplink,
///     start_time: start + chrono::Duration::seconds(600),
///     end_time: start + chrono::Duration::seconds(900),
///     duration_seconds: 300.0,
///     mean_elev_deg: 34.0,
///     max_elev_deg: 61.0,
///     mean_range_km: 1410.0,
///     mean_rate_mbps: 0.8,
///     rate_bytes_per_second: 100_000.0,
///     capacity_bytes: 30_000_000.0,
///     propagation_delay_seconds: 0.005,
/// };
///
/// let plan = ContactPlan::from_records(vec![record], start).unwrap();
/// assert_eq!(plan.len(), 1);
/// assert_eq!(plan.windows()[0].start_s, 600.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContactPlan {
    windows: Vec<ContactWindow>,
}

impl ContactPlan {
    /// Tolerance for the `capacity = rate * duration` invariant, in bytes.
    const CAPACITY_TOLERANCE_BYTES: f64 = 1.0;

    /// Build a plan from serialised records, anchored at `run_start`.
    ///
    /// Validates `end > start`, positive rate, and the capacity invariant,
    /// then sorts by `(start, satellite, link)`.
    pub fn from_records(
        records: Vec<ContactRecord>,
        run_start: DateTime<Utc>,
    ) -> Result<Self, ContactPlanError> {
        let mut windows = Vec::with_capacity(records.len());
        for rec in records {
            if rec.end_time <= rec.start_time {
                return Err(ContactPlanError::EmptyWindow {
                    satellite: rec.satellite,
                    link: rec.link,
                });
            }
            if rec.rate_bytes_per_second <= 0.0 {
                return Err(ContactPlanError::InvalidRate {
                    satellite: rec.satellite,
                    link: rec.link,
                });
            }
            let start_s = seconds_since(run_start, rec.start_time);
            let end_s = seconds_since(run_start, rec.end_time);
            let derived = rec.rate_bytes_per_second * (end_s - start_s);
            if (derived - rec.capacity_bytes).abs() > Self::CAPACITY_TOLERANCE_BYTES {
                return Err(ContactPlanError::CapacityMismatch {
                    satellite: rec.satellite,
                    link: rec.link,
                    declared: rec.capacity_bytes,
                    derived,
                });
            }
            windows.push(ContactWindow {
                satellite: rec.satellite,
                link: rec.link,
                start_s,
                end_s,
                rate_bytes_per_s: rec.rate_bytes_per_second,
                capacity_bytes: rec.capacity_bytes,
                propagation_delay_s: rec.propagation_delay_seconds,
                mean_range_km: rec.mean_range_km,
            });
        }
        Self::sort_windows(&mut windows);
        Ok(Self { windows })
    }

    /// Build a plan directly from engine-form windows (tests, embedding).
    pub fn from_windows(mut windows: Vec<ContactWindow>) -> Result<Self, ContactPlanError> {
        for w in &windows {
            if w.end_s <= w.start_s {
                return Err(ContactPlanError::EmptyWindow {
                    satellite: w.satellite.clone(),
                    link: w.link,
                });
            }
            if w.rate_bytes_per_s <= 0.0 {
                return Err(ContactPlanError::InvalidRate {
                    satellite: w.satellite.clone(),
                    link: w.link,
                });
            }
            let derived = w.rate_bytes_per_s * w.duration_s();
            if (derived - w.capacity_bytes).abs() > Self::CAPACITY_TOLERANCE_BYTES {
                return Err(ContactPlanError::CapacityMismatch {
                    satellite: w.satellite.clone(),
                    link: w.link,
                    declared: w.capacity_bytes,
                    derived,
                });
            }
        }
        Self::sort_windows(&mut windows);
        Ok(Self { windows })
    }

    fn sort_windows(windows: &mut [ContactWindow]) {
        windows.sort_by(|a, b| {
            a.start_s
                .partial_cmp(&b.start_s)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.satellite.cmp(&b.satellite))
                .then_with(|| a.link.cmp(&b.link))
        });
    }

    pub fn windows(&self) -> &[ContactWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl ContactPlanSource for ContactPlan {
    fn contacts(&self, start_s: f64, stop_s: f64) -> Vec<ContactWindow> {
        self.windows
            .iter()
            .filter(|w| w.start_s >= start_s && w.start_s < stop_s)
            .cloned()
            .collect()
    }
}

fn seconds_since(anchor: DateTime<Utc>, t: DateTime<Utc>) -> f64 {
    (t - anchor).num_milliseconds() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(sat: &str, link: LinkDirection, start_s: f64, end_s: f64) -> ContactWindow {
        let rate = 1000.0;
        ContactWindow {
            satellite: sat.to_string(),
            link,
            start_s,
            end_s,
            rate_bytes_per_s: rate,
            capacity_bytes: rate * (end_s - start_s),
            propagation_delay_s: 0.01,
            mean_range_km: 1500.0,
        }
    }

    #[test]
    fn test_rejects_empty_window() {
        let w = window("LEO-1", LinkDirection::Uplink, 100.0, 100.0);
        let err = ContactPlan::from_windows(vec![w]).unwrap_err();
        assert!(matches!(err, ContactPlanError::EmptyWindow { .. }));
    }

    #[test]
    fn test_rejects_capacity_mismatch() {
        let mut w = window("LEO-1", LinkDirection::Uplink, 0.0, 100.0);
        w.capacity_bytes = 5.0;
        let err = ContactPlan::from_windows(vec![w]).unwrap_err();
        assert!(matches!(err, ContactPlanError::CapacityMismatch { .. }));
    }

    #[test]
    fn test_sorted_by_start_then_satellite_then_link() {
        let plan = ContactPlan::from_windows(vec![
            window("LEO-2", LinkDirection::Uplink, 50.0, 60.0),
            window("LEO-1", LinkDirection::Downlink, 50.0, 60.0),
            window("LEO-1", LinkDirection::Uplink, 10.0, 20.0),
            window("LEO-1", LinkDirection::Uplink, 50.0, 60.0),
        ])
        .unwrap();

        let order: Vec<(f64, &str, LinkDirection)> = plan
            .windows()
            .iter()
            .map(|w| (w.start_s, w.satellite.as_str(), w.link))
            .collect();
        assert_eq!(
            order,
            vec![
                (10.0, "LEO-1", LinkDirection::Uplink),
                (50.0, "LEO-1", LinkDirection::Uplink),
                (50.0, "LEO-1", LinkDirection::Downlink),
                (50.0, "LEO-2", LinkDirection::Uplink),
            ]
        );
    }

    #[test]
    fn test_contacts_filters_by_start() {
        let plan = ContactPlan::from_windows(vec![
            window("LEO-1", LinkDirection::Uplink, 10.0, 20.0),
            window("LEO-1", LinkDirection::Downlink, 500.0, 600.0),
        ])
        .unwrap();

        let slice = plan.contacts(0.0, 100.0);
        assert_eq!(slice.len(), 1);
        assert_eq!(slice[0].start_s, 10.0);
    }
}
