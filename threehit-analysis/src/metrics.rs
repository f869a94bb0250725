//! Per-event consistency metrics.
//!
//! Every metric is a pure function of the three hits (plus, for a few, the
//! reconstructed decay point). Lists of three values are returned sorted
//! ascending unless stated otherwise. [`ConsistencyResult::compute`]
//! evaluates the whole set once per event so the cut stages only read.

use nalgebra::Vector3;
use threehit_core::{
    AnalysisConfig, DecaySolution, Hit, Reconstructor, SolutionMode, TotCalibration,
};

use crate::geometry::{
    angle_between, annihilation_point, azimuthal_angle_deg, hit_distance, sorted3,
    spatial_angle_deg, PAIRS,
};

/// Scatter test: smallest `|distance - c·|Δt||` over the three hit pairs.
///
/// Small values mean one hit is compatible with a photon scattered from
/// another. Invariant under permutation of the hits.
pub fn scatter_test(hits: &[Hit; 3], light_speed: f64) -> f64 {
    PAIRS
        .iter()
        .map(|&(i, j)| {
            let distance = hit_distance(&hits[i], &hits[j]);
            let time_diff = (hits[i].time_ns - hits[j].time_ns).abs();
            (distance - time_diff * light_speed).abs()
        })
        .fold(f64::INFINITY, f64::min)
}

/// Distances of the three pairwise annihilation points from the detector centre, sorted.
pub fn pairwise_annihilation_distances(hits: &[Hit; 3], light_speed: f64) -> [f64; 3] {
    sorted3(PAIRS.map(|(i, j)| annihilation_point(&hits[i], &hits[j], light_speed).norm()))
}

/// Minimum distance of a pairwise annihilation point from the detector centre (`dLOR`).
pub fn lor_distance(hits: &[Hit; 3], light_speed: f64) -> f64 {
    pairwise_annihilation_distances(hits, light_speed)[0]
}

/// Minimum of `|point| - radius` over the pairwise annihilation points.
///
/// Negative values mean the point lies inside the reference sphere.
pub fn spherical_radius_deviation(hits: &[Hit; 3], light_speed: f64, radius: f64) -> f64 {
    lor_distance(hits, light_speed) - radius
}

/// As [`spherical_radius_deviation`] for the cylindrical reference radius.
pub fn cylindrical_radius_deviation(hits: &[Hit; 3], light_speed: f64, radius: f64) -> f64 {
    lor_distance(hits, light_speed) - radius
}

/// Distances of the pairwise annihilation points from a reconstructed decay point, sorted.
pub fn trilateration_consistency(
    hits: &[Hit; 3],
    light_speed: f64,
    decay_point: &Vector3<f64>,
) -> [f64; 3] {
    sorted3(PAIRS.map(|(i, j)| {
        (annihilation_point(&hits[i], &hits[j], light_speed) - decay_point).norm()
    }))
}

/// The three inter-hit distances, sorted.
pub fn inter_hit_distances(hits: &[Hit; 3]) -> [f64; 3] {
    sorted3(PAIRS.map(|(i, j)| hit_distance(&hits[i], &hits[j])))
}

/// Absolute differences between the sorted inter-hit distances, sorted.
pub fn inter_hit_distance_spread(hits: &[Hit; 3]) -> [f64; 3] {
    let d = inter_hit_distances(hits);
    sorted3([(d[0] - d[1]).abs(), (d[0] - d[2]).abs(), (d[1] - d[2]).abs()])
}

/// Azimuthal (XY) angles between the hit pairs in degrees, sorted.
pub fn azimuthal_angles_deg(hits: &[Hit; 3]) -> [f64; 3] {
    sorted3(PAIRS.map(|(i, j)| azimuthal_angle_deg(&hits[i], &hits[j])))
}

/// 3-D angles between the hit position vectors in degrees, in pair order.
pub fn spatial_angles_deg(hits: &[Hit; 3]) -> [f64; 3] {
    PAIRS.map(|(i, j)| spatial_angle_deg(&hits[i], &hits[j]))
}

/// Photon directions from a decay point to each hit.
pub fn momenta(hits: &[Hit; 3], decay_point: &Vector3<f64>) -> [Vector3<f64>; 3] {
    [
        hits[0].position - decay_point,
        hits[1].position - decay_point,
        hits[2].position - decay_point,
    ]
}

/// Angles between the photon directions in radians, in pair order
/// (`θ01`, `θ12`, `θ02`).
pub fn momentum_angles(momenta: &[Vector3<f64>; 3]) -> [f64; 3] {
    PAIRS.map(|(i, j)| angle_between(&momenta[i], &momenta[j]))
}

/// Photon energies of a three-photon decay at rest, from the opening angles.
///
/// `angles` are (`θ01`, `θ12`, `θ02`) in radians. Energy and momentum
/// conservation fix the energies up to the electron mass scale; they sum to
/// twice the electron mass. Degenerate (collinear) configurations produce
/// non-finite values.
pub fn energy_from_angles(angles: [f64; 3], electron_mass_kev: f64) -> [f64; 3] {
    let [c0, c1, c2] = angles.map(f64::cos);
    let shape = 1.0 + c0 - c2 - c1;
    let m2 = 2.0 * electron_mass_kev;
    [
        -m2 * (-c2 + c0 * c1) / ((c0 - 1.0) * shape),
        -m2 * (c0 * c2 - c1) / ((c0 - 1.0) * shape),
        m2 * (1.0 + c0) / shape,
    ]
}

/// Expected TOT for each hit's deposited energy, in hit order.
pub fn tot_from_energies(hits: &[Hit; 3], calibration: &TotCalibration) -> [f64; 3] {
    hits.each_ref().map(|hit| calibration.tot_from_energy(hit.energy_kev))
}

/// Spin-correlation operators `S·k1` and `S·(k1×k2)`.
///
/// `S` is the unit decay-point vector, `k1` and `k2` the longest and second
/// longest photon directions. `None` when the decay point is at the origin.
pub fn spin_operators(momenta: &[Vector3<f64>; 3], decay_point: &Vector3<f64>) -> Option<[f64; 2]> {
    let spin = decay_point.try_normalize(0.0)?;
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| momenta[a].norm().total_cmp(&momenta[b].norm()));
    let k1 = momenta[order[2]];
    let k2 = momenta[order[1]];
    let along = k1.try_normalize(0.0).map_or(0.0, |k| spin.dot(&k));
    let normal = k1
        .cross(&k2)
        .try_normalize(0.0)
        .map_or(0.0, |n| spin.dot(&n));
    Some([along, normal])
}

/// Runs the trilateration service on the three hits.
pub fn reconstruct_decay<R: Reconstructor + ?Sized>(
    hits: &[Hit; 3],
    reconstructor: &mut R,
) -> DecaySolution {
    reconstructor.reconstruct(hits, SolutionMode::Second)
}

/// Emission time of a prompt photon detected at `hit`, assuming it started at the centre.
pub fn prompt_emission_time(hit: &Hit, light_speed: f64) -> f64 {
    hit.time_ns - hit.position.norm() / light_speed
}

/// Positronium lifetime in ns: decay time minus prompt emission time.
#[inline]
pub fn lifetime_ns(decay_time_ns: f64, emission_time_ns: f64) -> f64 {
    decay_time_ns - emission_time_ns
}

/// Converts ns to µs.
#[inline]
pub fn ns_to_us(value_ns: f64) -> f64 {
    value_ns / 1000.0
}

/// Quantities that only exist once the decay point is reconstructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayGeometry {
    /// Decay point to hit vectors, in hit order.
    pub momenta: [Vector3<f64>; 3],
    /// Opening angles in radians (`θ01`, `θ12`, `θ02`).
    pub momentum_angles: [f64; 3],
    /// Photon energies from the opening angles (keV), in hit order.
    pub energies: [f64; 3],
    /// Sorted distances of the pairwise annihilation points from the decay point.
    pub trilateration: [f64; 3],
    /// `S·k1` and `S·(k1×k2)`; `None` for a decay point at the origin.
    pub spin: Option<[f64; 2]>,
}

impl DecayGeometry {
    fn compute(hits: &[Hit; 3], decay_point: &Vector3<f64>, config: &AnalysisConfig) -> Self {
        let momenta = momenta(hits, decay_point);
        let momentum_angles = momentum_angles(&momenta);
        Self {
            momenta,
            momentum_angles,
            energies: energy_from_angles(momentum_angles, config.electron_mass_kev),
            trilateration: trilateration_consistency(hits, config.light_speed_cm_ns, decay_point),
            spin: spin_operators(&momenta, decay_point),
        }
    }

    /// True when every photon energy is strictly positive.
    pub fn energies_physical(&self) -> bool {
        self.energies.iter().all(|&e| e > 0.0)
    }

    /// Opening angles in degrees, sorted.
    pub fn sorted_angles_deg(&self) -> [f64; 3] {
        sorted3(self.momentum_angles.map(f64::to_degrees))
    }
}

/// Every metric of one three-hit event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsistencyResult {
    /// See [`scatter_test`].
    pub scatter_residual: f64,
    /// See [`pairwise_annihilation_distances`].
    pub lor_distances: [f64; 3],
    /// Smallest pairwise point radius minus the spherical reference radius.
    pub spherical_deviation: f64,
    /// Smallest pairwise point radius minus the cylindrical reference radius.
    pub cylindrical_deviation: f64,
    /// See [`inter_hit_distances`].
    pub inter_hit_distances: [f64; 3],
    /// See [`inter_hit_distance_spread`].
    pub inter_hit_spread: [f64; 3],
    /// Sorted azimuthal pair angles (deg).
    pub azimuthal_angles: [f64; 3],
    /// 3-D pair angles (deg), in pair order.
    pub spatial_angles: [f64; 3],
    /// Measured TOT, in hit order.
    pub measured_tot: [f64; 3],
    /// TOT expected from deposited energy, in hit order.
    pub energy_tot: [f64; 3],
    /// Deposited energy (keV), in hit order.
    pub deposited_energy: [f64; 3],
    /// Raw reconstructor output.
    pub decay: DecaySolution,
    /// Present only for a valid decay solution.
    pub decay_geometry: Option<DecayGeometry>,
}

impl ConsistencyResult {
    /// Evaluates all metrics for one event.
    pub fn compute<R: Reconstructor + ?Sized>(
        hits: &[Hit; 3],
        reconstructor: &mut R,
        config: &AnalysisConfig,
    ) -> Self {
        let c = config.light_speed_cm_ns;
        let lor_distances = pairwise_annihilation_distances(hits, c);
        let decay = reconstruct_decay(hits, reconstructor);
        let decay_geometry = decay
            .is_valid()
            .then(|| DecayGeometry::compute(hits, &decay.point, config));

        Self {
            scatter_residual: scatter_test(hits, c),
            lor_distances,
            spherical_deviation: lor_distances[0] - config.reference_radii.spherical_cm,
            cylindrical_deviation: lor_distances[0] - config.reference_radii.cylindrical_cm,
            inter_hit_distances: inter_hit_distances(hits),
            inter_hit_spread: inter_hit_distance_spread(hits),
            azimuthal_angles: azimuthal_angles_deg(hits),
            spatial_angles: spatial_angles_deg(hits),
            measured_tot: hits.each_ref().map(|hit| hit.tot_ns),
            energy_tot: tot_from_energies(hits, &config.tot_calibration),
            deposited_energy: hits.each_ref().map(|hit| hit.energy_kev),
            decay,
            decay_geometry,
        }
    }

    /// Minimum pairwise annihilation distance (`dLOR`).
    #[inline]
    pub fn lor_distance(&self) -> f64 {
        self.lor_distances[0]
    }

    /// Sum of the two smallest azimuthal angles (deg).
    #[inline]
    pub fn azimuthal_sum(&self) -> f64 {
        self.azimuthal_angles[0] + self.azimuthal_angles[1]
    }

    /// Difference of the two smallest azimuthal angles (deg).
    #[inline]
    pub fn azimuthal_diff(&self) -> f64 {
        self.azimuthal_angles[1] - self.azimuthal_angles[0]
    }

    /// True when every measured TOT is below `max_tot_ns`.
    pub fn tot_below(&self, max_tot_ns: f64) -> bool {
        self.measured_tot.iter().all(|&tot| tot < max_tot_ns)
    }
}
