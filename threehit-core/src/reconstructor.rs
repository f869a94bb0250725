//! Interface to the three-hit trilateration service.
//!
//! The solver itself lives outside this workspace. It is stateful: the
//! three gamma slots are filled, then a solution is pulled. Each worker
//! owns its own instance.

use nalgebra::Vector3;

use crate::config::BarrelGeometry;
use crate::hit::Hit;

/// Which of the solver's candidate solutions to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolutionMode {
    /// The first root of the sphere/cone intersection.
    First,
    /// The second root; the one inside the detector for physical events.
    #[default]
    Second,
}

/// Decay point and time produced by the reconstructor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecaySolution {
    /// Decay point (cm).
    pub point: Vector3<f64>,
    /// Decay time (ns).
    pub time_ns: f64,
    /// Solver status; anything but zero means no physical solution.
    pub error_code: i32,
}

impl DecaySolution {
    /// True when the solver found a physical solution.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.error_code == 0
    }
}

/// Three-gamma trilateration service.
pub trait Reconstructor {
    /// Hands the detector geometry to the solver. Called once before use.
    fn configure(&mut self, geometry: &BarrelGeometry);

    /// Loads a hit into gamma slot 0, 1 or 2.
    fn set_gamma(&mut self, slot: usize, hit: &Hit);

    /// Solves for the decay point and time of the loaded gammas.
    fn solution(&mut self, mode: SolutionMode) -> DecaySolution;

    /// Loads all three hits and solves in one call.
    fn reconstruct(&mut self, hits: &[Hit; 3], mode: SolutionMode) -> DecaySolution {
        for (slot, hit) in hits.iter().enumerate() {
            self.set_gamma(slot, hit);
        }
        self.solution(mode)
    }
}

impl<R: Reconstructor + ?Sized> Reconstructor for Box<R> {
    fn configure(&mut self, geometry: &BarrelGeometry) {
        (**self).configure(geometry);
    }

    fn set_gamma(&mut self, slot: usize, hit: &Hit) {
        (**self).set_gamma(slot, hit);
    }

    fn solution(&mut self, mode: SolutionMode) -> DecaySolution {
        (**self).solution(mode)
    }
}
