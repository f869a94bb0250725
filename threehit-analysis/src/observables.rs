//! The observable catalogue.
//!
//! Each [`Observable`] knows its kind name(s), its binning and how to read
//! its value(s) off an [`EventView`]. The cut pipeline decides which
//! observables are emitted at which stage; names are composed with
//! [`observable_name`] from the kind, the stage suffix and the category label.

use nalgebra::Vector3;
use threehit_core::{observable_name, StatisticsSink};

use crate::geometry::transverse_radius;
use crate::metrics::{ns_to_us, ConsistencyResult, DecayGeometry};

/// Category-count histogram, filled with [`EventCategory::id`](threehit_core::EventCategory::id).
pub const CATEGORY_COUNT: &str = "HitMult";
/// Reconstructor status code of every three-hit event.
pub const ERROR_CODE: &str = "error_tri";
/// Measured TOT of every hit (data mode).
pub const TOT_ALL_HITS: &str = "tot_allHits";
/// TOT of single-hit events.
pub const TOT_SINGLE_HIT: &str = "tot_1HitEvt";
/// Per-category hit multiplicity.
pub const HIT_MULTIPLICITY: &str = "HitMult";
/// Generated multiplicity of each hit against the sum of the other two.
pub const GEN_MULT_PER_GAMMA: [&str; 3] = ["genGammaMult_g1", "genGammaMult_g2", "genGammaMult_g3"];
/// Hit ordinal against generated multiplicity.
pub const HIT_GEN_MULT: &str = "hit_genMult";
/// Hit ordinal against truth vertex index.
pub const HIT_VERTEX: &str = "hit_vtx";
/// As [`HIT_GEN_MULT`] for events with one common vertex.
pub const HIT_GEN_MULT_SAME_VERTEX: &str = "hit_genMult_sameVtx";
/// As [`HIT_GEN_MULT`] for events with two hits on a common vertex.
pub const HIT_GEN_MULT_TWO_SAME_VERTEX: &str = "hit_genMult_2gSameVtx";
/// Ordered pair of the other two codes, keyed by the first hit's code (1, 2 or 3).
pub const SAME_VERTEX_PAIR_MULT: [&str; 3] = [
    "genMult1_sameVtx_g2g3",
    "genMult2_sameVtx_g2g3",
    "genMult3_sameVtx_g2g3",
];
/// As `genMult1_sameVtx_g2g3` after the LOR distance cut.
pub const SAME_VERTEX_PAIR_MULT_AFTER_LOR: &str = "genMult1_sameVtx_g2g3_afterDLOR";

/// Uniform binning along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Axis {
    /// Number of bins.
    pub bins: usize,
    /// Lower edge of the first bin.
    pub min: f64,
    /// Upper edge of the last bin.
    pub max: f64,
}

impl Axis {
    /// Creates an axis.
    pub const fn new(bins: usize, min: f64, max: f64) -> Self {
        Self { bins, min, max }
    }
}

/// Binning of a 1-D or 2-D observable.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Binning {
    /// Single axis.
    One(Axis),
    /// X and Y axes.
    Two(Axis, Axis),
}

const POSITION: Axis = Axis::new(120, -60.0, 60.0);
const ANGLE_SUM: Axis = Axis::new(301, -0.5, 299.5);
const LOR: Axis = Axis::new(120, -0.5, 59.5);
const LOR_MIN: Axis = Axis::new(140, -10.5, 59.5);
const OPENING_ANGLE: Axis = Axis::new(200, 0.0, 180.0);
const ENERGY: Axis = Axis::new(301, -0.5, 599.5);
const GEN_MULT: Axis = Axis::new(250, -1.0, 249.0);
const HIT_ORDINAL: Axis = Axis::new(8, -2.0, 6.0);
const TOT: Axis = Axis::new(851, -10.25, 160.25);

/// Binning of the category-independent observables, by name.
pub fn global_binnings() -> Vec<(&'static str, Binning)> {
    let mut out = vec![
        (CATEGORY_COUNT, CATEGORY_BINNING),
        (ERROR_CODE, Binning::One(Axis::new(100, -0.5, 9.5))),
        (TOT_ALL_HITS, Binning::One(TOT)),
        (TOT_SINGLE_HIT, Binning::One(TOT)),
        (HIT_GEN_MULT, Binning::Two(HIT_ORDINAL, GEN_MULT)),
        (HIT_GEN_MULT_SAME_VERTEX, Binning::Two(HIT_ORDINAL, GEN_MULT)),
        (HIT_GEN_MULT_TWO_SAME_VERTEX, Binning::Two(HIT_ORDINAL, GEN_MULT)),
        (HIT_VERTEX, Binning::Two(HIT_ORDINAL, Axis::new(2500, 0.0, 5000.0))),
        (SAME_VERTEX_PAIR_MULT_AFTER_LOR, Binning::Two(GEN_MULT, GEN_MULT)),
    ];
    out.extend(GEN_MULT_PER_GAMMA.map(|name| (name, Binning::Two(GEN_MULT, GEN_MULT))));
    out.extend(SAME_VERTEX_PAIR_MULT.map(|name| (name, Binning::Two(GEN_MULT, GEN_MULT))));
    out
}

/// Binning of the category-count histograms.
pub const CATEGORY_BINNING: Binning = Binning::One(Axis::new(24, 0.5, 24.5));

/// Binning of the per-category hit multiplicity.
pub const HIT_MULTIPLICITY_BINNING: Binning = Binning::One(Axis::new(11, -0.5, 10.5));

/// Everything an observable may read for one event.
#[derive(Debug, Clone, Copy)]
pub struct EventView<'a> {
    /// Precomputed metrics.
    pub result: &'a ConsistencyResult,
    /// Decay time minus prompt emission time (ns), when a prompt photon was seen.
    pub lifetime_ns: Option<f64>,
}

impl EventView<'_> {
    fn geometry(&self) -> Option<&DecayGeometry> {
        self.result.decay_geometry.as_ref()
    }

    fn decay_point(&self) -> Option<Vector3<f64>> {
        self.result.decay.is_valid().then_some(self.result.decay.point)
    }
}

/// One kind of per-category observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observable {
    /// Deposited energy of each hit.
    DepositedEnergy,
    /// Lifetime in µs.
    Lifetime,
    /// Lifetime in ns.
    LifetimeNs,
    /// TOT expected from each hit's energy.
    TotFromEnergy,
    /// Scatter-test residual.
    ScatterTest,
    /// Sum and difference of the two smallest opening angles.
    MomentumAngleSumDiff,
    /// Minimum pairwise annihilation distance.
    LorDistance,
    /// Sum and difference of the two smallest azimuthal angles.
    AzimuthalSumDiff,
    /// Azimuthal sum against LOR distance.
    AngleVsLor,
    /// Azimuthal sum against spherical radius deviation.
    AngleVsSphericalLor,
    /// Azimuthal sum against cylindrical radius deviation.
    AngleVsCylindricalLor,
    /// Azimuthal sum against the closest trilateration distance.
    AngleVsTrilaterationLor,
    /// Closest against farthest trilateration distance.
    TrilaterationMinMax,
    /// Closest against summed trilateration distances.
    TrilaterationMinTotal,
    /// Spherical radius deviation against closest trilateration distance.
    SphericalVsTrilateration,
    /// The three inter-hit distances, one entry each.
    InterHitDistances,
    /// Smallest against largest inter-hit distance spread.
    InterHitSpread,
    /// Measured TOT of the three hits, one entry each.
    MeasuredTot,
    /// Decay point, XY projection.
    DecayPointXY,
    /// Decay point, YZ projection.
    DecayPointYZ,
    /// Decay point XY for `|z| < 1 cm`.
    DecayPointXYCentral,
    /// Decay point X.
    DecayPointX,
    /// Decay point Y.
    DecayPointY,
    /// Decay point Z.
    DecayPointZ,
    /// Decay point XY for `|z| < 10.1 cm`.
    DecayPointXYBarrelCentre,
    /// Transverse decay radius.
    DecayRadius,
    /// Transverse decay radius, second channel.
    DecayRadiusTransverse,
    /// Transverse decay radius weighted by `1/r`.
    DecayRadiusJacobian,
    /// Decay point distance from the centre.
    DecayRadius3D,
    /// Decay point distance weighted by `1/r`.
    DecayRadius3DJacobian,
    /// 3-D angles between hit position vectors, paired.
    HitAngles,
    /// Photon energies from opening angles, paired.
    PhotonEnergies,
    /// Opening angles, sorted ascending, paired.
    MomentumAngles,
    /// `S·k1`.
    SpinAlongK1,
    /// `S·(k1×k2)`.
    SpinAlongNormal,
}

impl Observable {
    /// Kind names this observable fills. Most fill one; per-hit and
    /// per-pair observables fill three.
    pub fn kinds(self) -> &'static [&'static str] {
        match self {
            Self::DepositedEnergy => &["engDep_g1", "engDep_g2", "engDep_g3"],
            Self::Lifetime => &["lifeTime"],
            Self::LifetimeNs => &["lifeTime_ns"],
            Self::TotFromEnergy => &["totHit1", "totHit2", "totHit3"],
            Self::ScatterTest => &["scattTest"],
            Self::MomentumAngleSumDiff => &["sum_diff_angles"],
            Self::LorDistance => &["dLOR"],
            Self::AzimuthalSumDiff => &["sumDiff_azmTheta"],
            Self::AngleVsLor => &["angle_dLOR"],
            Self::AngleVsSphericalLor => &["angle_dLOR_fromSph"],
            Self::AngleVsCylindricalLor => &["angle_dLOR_fromCyd"],
            Self::AngleVsTrilaterationLor => &["angle_dLOR_fromTril"],
            Self::TrilaterationMinMax => &["dLOR_fromAnnhPt"],
            Self::TrilaterationMinTotal => &["dLOR_fromAnnhPt_total"],
            Self::SphericalVsTrilateration => &["shortDlor_comp"],
            Self::InterHitDistances => &["distance_hits"],
            Self::InterHitSpread => &["hitsDis_diff"],
            Self::MeasuredTot => &["tot_data"],
            Self::DecayPointXY => &["AnnhPointXYComp"],
            Self::DecayPointYZ => &["AnnhPointYZComp"],
            Self::DecayPointXYCentral => &["AnnhPointXY_Zto0"],
            Self::DecayPointX => &["AnnhPointXComp"],
            Self::DecayPointY => &["AnnhPointYComp"],
            Self::DecayPointZ => &["AnnhPointZComp"],
            Self::DecayPointXYBarrelCentre => &["AnnhPointXY_Zto10"],
            Self::DecayRadius => &["annh_radius"],
            Self::DecayRadiusTransverse => &["annh_radius_trans"],
            Self::DecayRadiusJacobian => &["annh_radius_jacobian"],
            Self::DecayRadius3D => &["annh_radius_3D"],
            Self::DecayRadius3DJacobian => &["annh_radius3D_jacobian"],
            Self::HitAngles => &["th1th2", "th2th3", "th1th3"],
            Self::PhotonEnergies => &["E1E2", "E2E3", "E1E3"],
            Self::MomentumAngles => &["angles12", "angles23", "angles13"],
            Self::SpinAlongK1 => &["S_k1"],
            Self::SpinAlongNormal => &["S_k1_k2"],
        }
    }

    /// Histogram binning shared by every kind of this observable.
    pub fn binning(self) -> Binning {
        match self {
            Self::DepositedEnergy => Binning::One(Axis::new(1290, -10.5, 1279.5)),
            Self::Lifetime => Binning::One(Axis::new(101, -50.5, 50.5)),
            Self::LifetimeNs => Binning::One(Axis::new(1001, -500.5, 500.5)),
            Self::TotFromEnergy => Binning::One(Axis::new(41, -0.5, 40.5)),
            Self::ScatterTest => Binning::One(Axis::new(120, -10.5, 119.5)),
            Self::MomentumAngleSumDiff => Binning::Two(ANGLE_SUM, ANGLE_SUM),
            Self::LorDistance => Binning::One(LOR),
            Self::AzimuthalSumDiff => {
                Binning::Two(Axis::new(401, -0.5, 299.5), Axis::new(401, -0.5, 299.5))
            }
            Self::AngleVsLor => Binning::Two(ANGLE_SUM, LOR),
            Self::AngleVsSphericalLor | Self::AngleVsTrilaterationLor => {
                Binning::Two(ANGLE_SUM, LOR_MIN)
            }
            Self::AngleVsCylindricalLor => Binning::Two(ANGLE_SUM, Axis::new(140, -12.5, 59.5)),
            Self::TrilaterationMinMax => Binning::Two(LOR_MIN, Axis::new(340, -10.5, 159.5)),
            Self::TrilaterationMinTotal => Binning::Two(LOR_MIN, Axis::new(600, -10.5, 289.5)),
            Self::SphericalVsTrilateration => Binning::Two(LOR_MIN, LOR_MIN),
            Self::InterHitDistances => Binning::One(Axis::new(160, -10.5, 149.5)),
            Self::InterHitSpread => {
                Binning::Two(Axis::new(160, -10.5, 149.5), Axis::new(160, -10.5, 149.5))
            }
            Self::MeasuredTot => Binning::One(Axis::new(341, -10.25, 160.25)),
            Self::DecayPointXY
            | Self::DecayPointYZ
            | Self::DecayPointXYCentral
            | Self::DecayPointXYBarrelCentre => Binning::Two(POSITION, POSITION),
            Self::DecayPointX
            | Self::DecayPointY
            | Self::DecayPointZ
            | Self::DecayRadius
            | Self::DecayRadiusTransverse
            | Self::DecayRadiusJacobian
            | Self::DecayRadius3D
            | Self::DecayRadius3DJacobian => Binning::One(POSITION),
            Self::HitAngles | Self::MomentumAngles => Binning::Two(OPENING_ANGLE, OPENING_ANGLE),
            Self::PhotonEnergies => Binning::Two(ENERGY, ENERGY),
            Self::SpinAlongK1 | Self::SpinAlongNormal => Binning::One(Axis::new(100, -1.0, 1.0)),
        }
    }

    /// Sends this observable's value(s) for one event to the sink.
    ///
    /// Observables that need a reconstructed decay point or a prompt
    /// emission time emit nothing when those are missing.
    pub fn emit<S: StatisticsSink + ?Sized>(
        self,
        view: &EventView<'_>,
        stage_suffix: &str,
        label: &str,
        sink: &mut S,
    ) {
        let r = view.result;
        let name = |i: usize| observable_name(self.kinds()[i], stage_suffix, label);
        let one = |sink: &mut S, x: f64| sink.fill_1d(&name(0), x);
        let two = |sink: &mut S, x: f64, y: f64| sink.fill_2d(&name(0), x, y);

        match self {
            Self::DepositedEnergy => {
                for (i, energy) in r.deposited_energy.iter().enumerate() {
                    sink.fill_1d(&name(i), *energy);
                }
            }
            Self::Lifetime => {
                if let Some(lifetime) = view.lifetime_ns {
                    one(sink, ns_to_us(lifetime));
                }
            }
            Self::LifetimeNs => {
                if let Some(lifetime) = view.lifetime_ns {
                    one(sink, lifetime);
                }
            }
            Self::TotFromEnergy => {
                for (i, tot) in r.energy_tot.iter().enumerate() {
                    sink.fill_1d(&name(i), *tot);
                }
            }
            Self::ScatterTest => one(sink, r.scatter_residual),
            Self::MomentumAngleSumDiff => {
                if let Some(geometry) = view.geometry() {
                    let sorted = geometry.sorted_angles_deg();
                    two(sink, sorted[0] + sorted[1], sorted[1] - sorted[0]);
                }
            }
            Self::LorDistance => one(sink, r.lor_distance()),
            Self::AzimuthalSumDiff => two(sink, r.azimuthal_sum(), r.azimuthal_diff()),
            Self::AngleVsLor => two(sink, r.azimuthal_sum(), r.lor_distance()),
            Self::AngleVsSphericalLor => two(sink, r.azimuthal_sum(), r.spherical_deviation),
            Self::AngleVsCylindricalLor => two(sink, r.azimuthal_sum(), r.cylindrical_deviation),
            Self::AngleVsTrilaterationLor => {
                if let Some(geometry) = view.geometry() {
                    two(sink, r.azimuthal_sum(), geometry.trilateration[0]);
                }
            }
            Self::TrilaterationMinMax => {
                if let Some(geometry) = view.geometry() {
                    two(sink, geometry.trilateration[0], geometry.trilateration[2]);
                }
            }
            Self::TrilaterationMinTotal => {
                if let Some(geometry) = view.geometry() {
                    let total = geometry.trilateration.iter().sum();
                    two(sink, geometry.trilateration[0], total);
                }
            }
            Self::SphericalVsTrilateration => {
                if let Some(geometry) = view.geometry() {
                    two(sink, r.spherical_deviation, geometry.trilateration[0]);
                }
            }
            Self::InterHitDistances => {
                for distance in r.inter_hit_distances {
                    one(sink, distance);
                }
            }
            Self::InterHitSpread => two(sink, r.inter_hit_spread[0], r.inter_hit_spread[2]),
            Self::MeasuredTot => {
                for tot in r.measured_tot {
                    one(sink, tot);
                }
            }
            Self::DecayPointXY => {
                if let Some(p) = view.decay_point() {
                    two(sink, p.x, p.y);
                }
            }
            Self::DecayPointYZ => {
                if let Some(p) = view.decay_point() {
                    two(sink, p.y, p.z);
                }
            }
            Self::DecayPointXYCentral => {
                if let Some(p) = view.decay_point().filter(|p| p.z.abs() < 1.0) {
                    two(sink, p.x, p.y);
                }
            }
            Self::DecayPointX => {
                if let Some(p) = view.decay_point() {
                    one(sink, p.x);
                }
            }
            Self::DecayPointY => {
                if let Some(p) = view.decay_point() {
                    one(sink, p.y);
                }
            }
            Self::DecayPointZ => {
                if let Some(p) = view.decay_point() {
                    one(sink, p.z);
                }
            }
            Self::DecayPointXYBarrelCentre => {
                if let Some(p) = view.decay_point().filter(|p| p.z.abs() < 10.1) {
                    two(sink, p.x, p.y);
                }
            }
            Self::DecayRadius | Self::DecayRadiusTransverse => {
                if let Some(p) = view.decay_point() {
                    one(sink, transverse_radius(&p));
                }
            }
            Self::DecayRadiusJacobian => {
                if let Some(radius) = view.decay_point().map(|p| transverse_radius(&p)) {
                    if radius > 0.0 {
                        sink.fill_1d_weighted(&name(0), radius, radius.recip());
                    }
                }
            }
            Self::DecayRadius3D => {
                if let Some(p) = view.decay_point() {
                    one(sink, p.norm());
                }
            }
            Self::DecayRadius3DJacobian => {
                if let Some(radius) = view.decay_point().map(|p| p.norm()) {
                    if radius > 0.0 {
                        sink.fill_1d_weighted(&name(0), radius, radius.recip());
                    }
                }
            }
            Self::HitAngles => fill_pairs(sink, &name, r.spatial_angles),
            Self::PhotonEnergies => {
                if let Some(geometry) = view.geometry() {
                    fill_pairs(sink, &name, geometry.energies);
                }
            }
            Self::MomentumAngles => {
                if let Some(geometry) = view.geometry() {
                    fill_pairs(sink, &name, geometry.sorted_angles_deg());
                }
            }
            Self::SpinAlongK1 => {
                if let Some([along, _]) = view.geometry().and_then(|g| g.spin) {
                    one(sink, along);
                }
            }
            Self::SpinAlongNormal => {
                if let Some([_, normal]) = view.geometry().and_then(|g| g.spin) {
                    one(sink, normal);
                }
            }
        }
    }
}

/// Fills `(v0, v1)`, `(v1, v2)` and `(v0, v2)` into the three kinds.
fn fill_pairs<S: StatisticsSink + ?Sized>(
    sink: &mut S,
    name: &impl Fn(usize) -> String,
    values: [f64; 3],
) {
    sink.fill_2d(&name(0), values[0], values[1]);
    sink.fill_2d(&name(1), values[1], values[2]);
    sink.fill_2d(&name(2), values[0], values[2]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_are_unique() {
        let all = [
            Observable::DepositedEnergy,
            Observable::Lifetime,
            Observable::LifetimeNs,
            Observable::TotFromEnergy,
            Observable::ScatterTest,
            Observable::MomentumAngleSumDiff,
            Observable::LorDistance,
            Observable::AzimuthalSumDiff,
            Observable::AngleVsLor,
            Observable::AngleVsSphericalLor,
            Observable::AngleVsCylindricalLor,
            Observable::AngleVsTrilaterationLor,
            Observable::TrilaterationMinMax,
            Observable::TrilaterationMinTotal,
            Observable::SphericalVsTrilateration,
            Observable::InterHitDistances,
            Observable::InterHitSpread,
            Observable::MeasuredTot,
            Observable::DecayPointXY,
            Observable::DecayPointYZ,
            Observable::DecayPointXYCentral,
            Observable::DecayPointX,
            Observable::DecayPointY,
            Observable::DecayPointZ,
            Observable::DecayPointXYBarrelCentre,
            Observable::DecayRadius,
            Observable::DecayRadiusTransverse,
            Observable::DecayRadiusJacobian,
            Observable::DecayRadius3D,
            Observable::DecayRadius3DJacobian,
            Observable::HitAngles,
            Observable::PhotonEnergies,
            Observable::MomentumAngles,
            Observable::SpinAlongK1,
            Observable::SpinAlongNormal,
        ];
        let mut kinds: Vec<&str> = all.iter().flat_map(|o| o.kinds().iter().copied()).collect();
        let total = kinds.len();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), total);
    }

    #[test]
    fn test_global_binnings_cover_truth_diagnostics() {
        let names: Vec<&str> = global_binnings().into_iter().map(|(name, _)| name).collect();
        for name in GEN_MULT_PER_GAMMA.iter().chain(SAME_VERTEX_PAIR_MULT.iter()) {
            assert!(names.contains(name), "{name}");
        }
        assert!(names.contains(&CATEGORY_COUNT));
    }
}
