#![allow(dead_code)]
//! Shared fixtures: a deterministic reconstructor and ring-shaped events.

use nalgebra::Vector3;
use threehit_core::{
    BarrelGeometry, DecaySolution, Hit, Reconstructor, SolutionMode, LIGHT_SPEED_CM_NS,
};

/// Error code returned for hits outside the barrel.
pub const OUTSIDE_BARREL: i32 = 4;

/// Reconstructor that places the decay at a fixed point.
///
/// Fails with [`OUTSIDE_BARREL`] if any loaded hit lies beyond half the
/// barrel length. The decay time is the mean of the hit times corrected
/// for flight from the decay point.
#[derive(Debug, Clone)]
pub struct FixedPointReconstructor {
    point: Vector3<f64>,
    half_length: f64,
    slots: [Option<Hit>; 3],
}

impl FixedPointReconstructor {
    pub fn new(point: Vector3<f64>) -> Self {
        Self {
            point,
            half_length: f64::INFINITY,
            slots: [None; 3],
        }
    }
}

impl Reconstructor for FixedPointReconstructor {
    fn configure(&mut self, geometry: &BarrelGeometry) {
        self.half_length = geometry.barrel_length_cm / 2.0;
    }

    fn set_gamma(&mut self, slot: usize, hit: &Hit) {
        self.slots[slot] = Some(*hit);
    }

    fn solution(&mut self, _mode: SolutionMode) -> DecaySolution {
        let hits: Vec<Hit> = self.slots.iter().flatten().copied().collect();
        let outside = hits.iter().any(|hit| hit.z().abs() > self.half_length);
        let time_ns = hits
            .iter()
            .map(|hit| hit.time_ns - (hit.position - self.point).norm() / LIGHT_SPEED_CM_NS)
            .sum::<f64>()
            / 3.0;
        DecaySolution {
            point: self.point,
            time_ns,
            error_code: if outside { OUTSIDE_BARREL } else { 0 },
        }
    }
}

/// Decay point used by most scenarios: near the centre, inside `|z| < 1`.
pub fn central_point() -> Vector3<f64> {
    Vector3::new(1.0, 0.5, 0.2)
}

/// Three hits 120 degrees apart on a ring of radius 40 cm in the z = 0 plane.
///
/// Hits 0 and 2 are simultaneous; hit 1 is delayed so that the scatter-test
/// residual of the event equals `scatter_residual` (for residuals below the
/// 69.3 cm chord length).
pub fn ring_event(scatter_residual: f64, t0: f64) -> [Hit; 3] {
    let radius = 40.0;
    let chord = radius * 3.0_f64.sqrt();
    let delay = (chord - scatter_residual) / LIGHT_SPEED_CM_NS;
    let times = [t0, t0 + delay, t0];
    [0.0_f64, 120.0, 240.0]
        .map(f64::to_radians)
        .iter()
        .zip(times)
        .map(|(angle, t)| {
            Hit::new(
                Vector3::new(radius * angle.cos(), radius * angle.sin(), 0.0),
                t,
                250.0,
                12.0,
            )
        })
        .collect::<Vec<_>>()
        .try_into()
        .expect("three hits")
}

/// A single hit at (30, 40, 0) with the given TOT, usable as a prompt photon.
pub fn prompt_hit(time_ns: f64, tot_ns: f64) -> Hit {
    Hit::new(Vector3::new(30.0, 40.0, 0.0), time_ns, 900.0, tot_ns)
}
