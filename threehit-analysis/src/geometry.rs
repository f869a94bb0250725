//! Geometric primitives on hits: angles, lines of response and distances.
//!
//! All positions are in cm and times in ns. Functions taking a light speed
//! expect it in cm/ns.

use nalgebra::{Vector2, Vector3};
use threehit_core::Hit;

/// Hit index pairs in the order the pairwise observables are reported.
pub const PAIRS: [(usize, usize); 3] = [(0, 1), (1, 2), (0, 2)];

/// Angle between two vectors in radians, in `[0, π]`.
///
/// Returns zero when either vector has zero length.
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let norms = a.norm() * b.norm();
    if norms == 0.0 {
        return 0.0;
    }
    (a.dot(b) / norms).clamp(-1.0, 1.0).acos()
}

/// Angle between the transverse (XY) projections of two hit positions, in degrees.
pub fn azimuthal_angle_deg(a: &Hit, b: &Hit) -> f64 {
    let pa = Vector2::new(a.x(), a.y());
    let pb = Vector2::new(b.x(), b.y());
    let norms = pa.norm() * pb.norm();
    if norms == 0.0 {
        return 0.0;
    }
    (pa.dot(&pb) / norms).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Full 3-D angle between two hit position vectors, in degrees.
pub fn spatial_angle_deg(a: &Hit, b: &Hit) -> f64 {
    angle_between(&a.position, &b.position).to_degrees()
}

/// Straight-line distance between two hits.
#[inline]
pub fn hit_distance(a: &Hit, b: &Hit) -> f64 {
    (a.position - b.position).norm()
}

/// Two-photon annihilation point on the line of response through `a` and `b`.
///
/// Starts from the midpoint and moves along the LOR towards the earlier hit
/// by half the time difference times the light speed.
pub fn annihilation_point(a: &Hit, b: &Hit, light_speed: f64) -> Vector3<f64> {
    let tof = a.time_ns - b.time_ns;
    let middle = 0.5 * (a.position + b.position);
    let versor = (b.position - a.position)
        .try_normalize(0.0)
        .unwrap_or_else(Vector3::zeros);
    middle + versor * (0.5 * tof * light_speed)
}

/// Transverse radius of a point.
#[inline]
pub fn transverse_radius(point: &Vector3<f64>) -> f64 {
    point.x.hypot(point.y)
}

/// Sorts three values ascending. NaN sorts last.
pub fn sorted3(mut values: [f64; 3]) -> [f64; 3] {
    values.sort_by(f64::total_cmp);
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use threehit_core::LIGHT_SPEED_CM_NS;

    fn hit_at(x: f64, y: f64, z: f64, t: f64) -> Hit {
        Hit::new(Vector3::new(x, y, z), t, 200.0, 10.0)
    }

    #[test]
    fn test_angle_between() {
        let x = Vector3::x();
        let y = Vector3::y();
        assert_relative_eq!(angle_between(&x, &y), std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(angle_between(&x, &(-x)), std::f64::consts::PI);
        assert_eq!(angle_between(&x, &Vector3::zeros()), 0.0);
    }

    #[test]
    fn test_azimuthal_angle_ignores_z() {
        let a = hit_at(10.0, 0.0, 20.0, 0.0);
        let b = hit_at(0.0, 10.0, -15.0, 0.0);
        assert_relative_eq!(azimuthal_angle_deg(&a, &b), 90.0, epsilon = 1e-10);
    }

    #[test]
    fn test_spatial_angle_uses_z() {
        let a = hit_at(10.0, 0.0, 10.0, 0.0);
        let b = hit_at(10.0, 0.0, -10.0, 0.0);
        assert_relative_eq!(spatial_angle_deg(&a, &b), 90.0, epsilon = 1e-10);
        assert_relative_eq!(azimuthal_angle_deg(&a, &b), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_annihilation_point_simultaneous_is_midpoint() {
        let a = hit_at(-40.0, 0.0, 0.0, 3.0);
        let b = hit_at(40.0, 10.0, 0.0, 3.0);
        let point = annihilation_point(&a, &b, LIGHT_SPEED_CM_NS);
        assert_relative_eq!(point, Vector3::new(0.0, 5.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_annihilation_point_moves_towards_earlier_hit() {
        // Source at x = 10: hit b is 30 cm away, hit a is 50 cm away.
        let a = hit_at(-40.0, 0.0, 0.0, 50.0 / LIGHT_SPEED_CM_NS);
        let b = hit_at(40.0, 0.0, 0.0, 30.0 / LIGHT_SPEED_CM_NS);
        let point = annihilation_point(&a, &b, LIGHT_SPEED_CM_NS);
        assert_relative_eq!(point, Vector3::new(10.0, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_annihilation_point_coincident_hits() {
        let a = hit_at(5.0, 5.0, 5.0, 0.0);
        let b = hit_at(5.0, 5.0, 5.0, 2.0);
        let point = annihilation_point(&a, &b, LIGHT_SPEED_CM_NS);
        assert_relative_eq!(point, Vector3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn test_sorted3() {
        assert_eq!(sorted3([3.0, 1.0, 2.0]), [1.0, 2.0, 3.0]);
    }
}
