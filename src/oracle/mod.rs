//! Position oracle interface
//!
//! The engine consumes positions, it never propagates orbits. A
//! [`PositionOracle`] answers `xyz_km(node, t)` in an Earth-centred frame,
//! in kilometres, and must be pure for a given `t`. Satellite positions
//! come from an external propagator behind this trait; ground stations are
//! fixed points obtained with [`geodetic_to_ecef_km`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// WGS-84 semi-major axis, km.
const WGS84_A_KM: f64 = 6378.137;
/// WGS-84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// Cartesian position in kilometres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn dot(&self, other: &Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Euclidean distance to `other`, km.
    pub fn distance(&self, other: &Vec3) -> f64 {
        self.sub(other).norm()
    }
}

/// Errors surfaced by a position oracle.
///
/// Oracle failures abort the run as configuration-class errors; the engine
/// never retries a position query.
#[derive(Debug, Error, PartialEq)]
pub enum OracleError {
    #[error("node index {node} out of range (oracle covers {count} nodes)")]
    NodeOutOfRange { node: usize, count: usize },

    #[error("no position available for node {node} at t={time_s}s")]
    Unavailable { node: usize, time_s: f64 },
}

/// Pure position source: `(node index, seconds since run start) -> km`.
pub trait PositionOracle {
    fn xyz_km(&self, node: usize, t_s: f64) -> Result<Vec3, OracleError>;
}

/// Geodetic (degrees, km) to ECEF (km) for ground stations, WGS-84.
pub fn geodetic_to_ecef_km(lat_deg: f64, lon_deg: f64, alt_km: f64) -> Vec3 {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let e2 = WGS84_F * (2.0 - WGS84_F);
    let sin_lat = lat.sin();
    let n = WGS84_A_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    Vec3::new(
        (n + alt_km) * lat.cos() * lon.cos(),
        (n + alt_km) * lat.cos() * lon.sin(),
        (n * (1.0 - e2) + alt_km) * sin_lat,
    )
}

/// Oracle over fixed positions, one per node index.
///
/// Suits all-ground-station topologies and unit tests.
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    positions: Vec<Vec3>,
}

impl StaticOracle {
    pub fn new(positions: Vec<Vec3>) -> Self {
        Self { positions }
    }
}

impl PositionOracle for StaticOracle {
    fn xyz_km(&self, node: usize, _t_s: f64) -> Result<Vec3, OracleError> {
        self.positions
            .get(node)
            .copied()
            .ok_or(OracleError::NodeOutOfRange {
                node,
                count: self.positions.len(),
            })
    }
}

/// Oracle over per-node closures of time.
///
/// Adapts an external propagator without forcing it behind a new trait; the
/// closures must themselves be pure in `t`.
pub struct FnOracle {
    #[allow(clippy::type_complexity)]
    fns: Vec<Box<dyn Fn(f64) -> Vec3 + Send + Sync>>,
}

impl FnOracle {
    pub fn new(fns: Vec<Box<dyn Fn(f64) -> Vec3 + Send + Sync>>) -> Self {
        Self { fns }
    }
}

impl PositionOracle for FnOracle {
    fn xyz_km(&self, node: usize, t_s: f64) -> Result<Vec3, OracleError> {
        match self.fns.get(node) {
            Some(f) => Ok(f(t_s)),
            None => Err(OracleError::NodeOutOfRange {
                node,
                count: self.fns.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geodetic_equator_prime_meridian() {
        let p = geodetic_to_ecef_km(0.0, 0.0, 0.0);
        assert!((p.x - WGS84_A_KM).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!(p.z.abs() < 1e-6);
    }

    #[test]
    fn test_geodetic_north_pole() {
        let p = geodetic_to_ecef_km(90.0, 0.0, 0.0);
        assert!(p.x.abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        // Polar radius b = a(1 - f)
        let b = WGS84_A_KM * (1.0 - WGS84_F);
        assert!((p.z - b).abs() < 1e-6, "z = {}, b = {}", p.z, b);
    }

    #[test]
    fn test_static_oracle_out_of_range() {
        let oracle = StaticOracle::new(vec![Vec3::new(1.0, 0.0, 0.0)]);
        assert!(oracle.xyz_km(0, 10.0).is_ok());
        assert_eq!(
            oracle.xyz_km(3, 10.0).unwrap_err(),
            OracleError::NodeOutOfRange { node: 3, count: 1 }
        );
    }

    #[test]
    fn test_fn_oracle_is_pure_in_t() {
        let oracle = FnOracle::new(vec![Box::new(|t| Vec3::new(t, 0.0, 0.0))]);
        assert_eq!(oracle.xyz_km(0, 5.0).unwrap(), Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(oracle.xyz_km(0, 5.0).unwrap(), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_vector_helpers() {
        let a = Vec3::new(1.0, 2.0, 2.0);
        let b = Vec3::new(0.0, 0.0, 0.0);
        assert_eq!(a.norm(), 3.0);
        assert_eq!(a.distance(&b), 3.0);
        assert_eq!(a.dot(&a), 9.0);
    }
}
