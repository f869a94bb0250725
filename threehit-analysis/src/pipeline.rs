//! Staged cut pipeline.
//!
//! An event walks an ordered list of stages. Each stage has a gate on the
//! precomputed [`ConsistencyResult`] and a set of observables it emits once
//! the gate passes. A failed gate ends the walk; later stages never see the
//! event.

use std::collections::BTreeMap;

use threehit_core::{observable_name, CutThresholds, EventCategory, LabelTable, StatisticsSink};

use crate::metrics::ConsistencyResult;
use crate::observables::{
    global_binnings, Binning, EventView, Observable, CATEGORY_BINNING, CATEGORY_COUNT,
    HIT_MULTIPLICITY, HIT_MULTIPLICITY_BINNING,
};

/// Pipeline stages, in walk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stage {
    /// Category assigned; counts every event.
    Classified,
    /// Reconstructor returned a physical solution.
    Reconstructed,
    /// Every photon energy from the opening angles is positive.
    EnergyValid,
    /// Every measured TOT is below the threshold.
    TotValid,
    /// Scatter-test residual above the threshold.
    ScatterValid,
    /// LOR distance above the threshold.
    LorValid,
    /// Sum of the two smallest azimuthal angles above the threshold.
    AngleValid,
}

use Observable as O;

const COMMON: [Observable; 16] = [
    O::ScatterTest,
    O::MomentumAngleSumDiff,
    O::LorDistance,
    O::AzimuthalSumDiff,
    O::AngleVsLor,
    O::AngleVsSphericalLor,
    O::AngleVsCylindricalLor,
    O::AngleVsTrilaterationLor,
    O::TrilaterationMinMax,
    O::TrilaterationMinTotal,
    O::SphericalVsTrilateration,
    O::InterHitDistances,
    O::InterHitSpread,
    O::MeasuredTot,
    O::DecayPointXY,
    O::DecayPointYZ,
];

const CENTRAL: [Observable; 3] = [O::DecayPointXYCentral, O::Lifetime, O::LifetimeNs];

const RECONSTRUCTED: [Observable; 2] = [O::DepositedEnergy, O::Lifetime];
const AFTER_ENERGY: [Observable; 17] = concat(&COMMON, &[O::TotFromEnergy]);
const AFTER_SCATTER: [Observable; 20] = concat(&AFTER_ENERGY, &CENTRAL);
const AFTER_LOR: [Observable; 19] = concat(&COMMON, &CENTRAL);

const TERMINAL: [Observable; 14] = [
    O::DecayPointX,
    O::DecayPointY,
    O::DecayPointZ,
    O::DecayPointXYBarrelCentre,
    O::DecayRadius,
    O::DecayRadiusTransverse,
    O::DecayRadiusJacobian,
    O::DecayRadius3D,
    O::DecayRadius3DJacobian,
    O::HitAngles,
    O::PhotonEnergies,
    O::MomentumAngles,
    O::SpinAlongK1,
    O::SpinAlongNormal,
];

impl Stage {
    /// Every stage in walk order.
    pub const ORDER: [Self; 7] = [
        Self::Classified,
        Self::Reconstructed,
        Self::EnergyValid,
        Self::TotValid,
        Self::ScatterValid,
        Self::LorValid,
        Self::AngleValid,
    ];

    /// Suffix inserted into the names of observables emitted at this stage.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Classified | Self::Reconstructed | Self::EnergyValid => "",
            Self::TotValid => "afterTOT",
            Self::ScatterValid => "afterSTest",
            Self::LorValid => "afterDLOR",
            Self::AngleValid => "after2DAngle",
        }
    }

    /// Category-count histogram filled when the stage is reached.
    pub fn tally(self) -> &'static str {
        match self {
            Self::Classified => CATEGORY_COUNT,
            Self::Reconstructed => "HitMult_beforeEng",
            Self::EnergyValid => "HitMult_afterEng",
            Self::TotValid => "HitMult_afterTOT",
            Self::ScatterValid => "HitMult_afterSTest",
            Self::LorValid => "HitMult_afterDLOR",
            Self::AngleValid => "HitMult_after2DAngle",
        }
    }

    /// Observables emitted with this stage's suffix.
    ///
    /// Energy-derived TOT is only shown before the TOT cut and after the
    /// scatter test.
    pub fn observables(self) -> &'static [Observable] {
        match self {
            Self::Classified => &[],
            Self::Reconstructed => &RECONSTRUCTED,
            Self::EnergyValid => &AFTER_ENERGY,
            Self::TotValid => &COMMON,
            Self::ScatterValid => &AFTER_SCATTER,
            Self::LorValid | Self::AngleValid => &AFTER_LOR,
        }
    }

    /// Observables emitted without a stage suffix once this stage is reached.
    pub fn terminal_observables(self) -> &'static [Observable] {
        match self {
            Self::AngleValid => &TERMINAL,
            _ => &[],
        }
    }

    /// True if the event passes this stage's gate.
    pub fn passes(self, result: &ConsistencyResult, cuts: &CutThresholds) -> bool {
        match self {
            Self::Classified => true,
            Self::Reconstructed => result.decay.is_valid(),
            Self::EnergyValid => result
                .decay_geometry
                .as_ref()
                .is_some_and(|geometry| geometry.energies_physical()),
            Self::TotValid => result.tot_below(cuts.max_tot_ns),
            Self::ScatterValid => result.scatter_residual > cuts.min_scatter_residual_cm,
            Self::LorValid => result.lor_distance() > cuts.min_lor_distance_cm,
            Self::AngleValid => result.azimuthal_sum() > cuts.min_angle_sum_deg,
        }
    }
}

const fn concat<const A: usize, const B: usize, const N: usize>(
    a: &[Observable; A],
    b: &[Observable; B],
) -> [Observable; N] {
    let mut out = [O::ScatterTest; N];
    let mut i = 0;
    while i < A {
        out[i] = a[i];
        i += 1;
    }
    while i < N {
        out[i] = b[i - A];
        i += 1;
    }
    out
}

/// Every observable name the analysis can emit for `labels`, with its binning.
pub fn catalogue(labels: &LabelTable) -> BTreeMap<String, Binning> {
    let mut out: BTreeMap<String, Binning> = global_binnings()
        .into_iter()
        .map(|(name, binning)| (name.to_owned(), binning))
        .collect();
    for stage in Stage::ORDER {
        out.insert(stage.tally().to_owned(), CATEGORY_BINNING);
    }
    for (_, label) in labels.iter() {
        out.insert(
            observable_name(HIT_MULTIPLICITY, "", label),
            HIT_MULTIPLICITY_BINNING,
        );
        for stage in Stage::ORDER {
            let tagged = stage.observables().iter().map(|o| (o, stage.suffix()));
            let untagged = stage.terminal_observables().iter().map(|o| (o, ""));
            for (observable, suffix) in tagged.chain(untagged) {
                for kind in observable.kinds() {
                    out.insert(observable_name(kind, suffix, label), observable.binning());
                }
            }
        }
    }
    out
}

/// Walks events through the stages and forwards observables to a sink.
#[derive(Debug, Clone, Copy)]
pub struct CutPipeline {
    cuts: CutThresholds,
}

impl CutPipeline {
    /// Creates a pipeline with the given thresholds.
    #[must_use]
    pub fn new(cuts: CutThresholds) -> Self {
        Self { cuts }
    }

    /// The thresholds in use.
    pub fn cuts(&self) -> &CutThresholds {
        &self.cuts
    }

    /// Furthest stage the event reaches, without emitting anything.
    pub fn furthest_stage(&self, result: &ConsistencyResult) -> Stage {
        let mut reached = Stage::Classified;
        for stage in Stage::ORDER {
            if !stage.passes(result, &self.cuts) {
                break;
            }
            reached = stage;
        }
        reached
    }

    /// Walks one event as `category`, emitting every observable of every
    /// stage it passes. Returns the furthest stage reached.
    pub fn run<S: StatisticsSink + ?Sized>(
        &self,
        category: EventCategory,
        label: &str,
        view: &EventView<'_>,
        sink: &mut S,
    ) -> Stage {
        let mut reached = Stage::Classified;
        for stage in Stage::ORDER {
            if !stage.passes(view.result, &self.cuts) {
                break;
            }
            reached = stage;

            sink.fill_1d(stage.tally(), f64::from(category.id()));
            // The aggregate's multiplicity is tallied for every event upstream.
            if stage == Stage::Classified && category != EventCategory::Unclassified {
                sink.fill_1d(&observable_name(HIT_MULTIPLICITY, "", label), 3.0);
            }
            for observable in stage.observables() {
                observable.emit(view, stage.suffix(), label, sink);
            }
            for observable in stage.terminal_observables() {
                observable.emit(view, "", label, sink);
            }
        }
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_tables() {
        assert!(Stage::TotValid.observables().contains(&Observable::ScatterTest));
        assert!(!Stage::TotValid.observables().contains(&Observable::TotFromEnergy));
        assert!(Stage::EnergyValid.observables().contains(&Observable::TotFromEnergy));
        assert!(Stage::ScatterValid.observables().contains(&Observable::TotFromEnergy));
        assert!(Stage::ScatterValid.observables().contains(&Observable::LifetimeNs));
        assert!(!Stage::LorValid.observables().contains(&Observable::TotFromEnergy));
        assert!(Stage::AngleValid.observables().contains(&Observable::DecayPointXYCentral));
        assert!(Stage::AngleValid.terminal_observables().contains(&Observable::SpinAlongNormal));
        assert!(!Stage::AngleValid.terminal_observables().contains(&Observable::Lifetime));
        assert!(Stage::LorValid.terminal_observables().is_empty());
    }

    #[test]
    fn test_catalogue_names() {
        let names = catalogue(&LabelTable::data());
        for name in [
            "HitMult",
            "HitMult_after2DAngle",
            "HitMult_3 hit evts",
            "engDep_g2_3 hit evts",
            "lifeTime_3 hit evts",
            "totHit1_3 hit evts",
            "totHit3_afterSTest_3 hit evts",
            "dLOR_afterDLOR_3 hit evts",
            "lifeTime_ns_after2DAngle_3 hit evts",
            "AnnhPointXY_Zto10_3 hit evts",
            "S_k1_k2_3 hit evts",
            "error_tri",
        ] {
            assert!(names.contains_key(name), "{name}");
        }
        assert!(!names.contains_key("totHit1_afterTOT_3 hit evts"));
        assert!(!names.contains_key("dLOR_oPs"));
        assert!(catalogue(&LabelTable::simulation()).contains_key("dLOR_oPs"));
    }

    #[test]
    fn test_stage_suffixes_distinct_after_energy() {
        let suffixes: Vec<_> = Stage::ORDER[3..].iter().map(|s| s.suffix()).collect();
        for (i, a) in suffixes.iter().enumerate() {
            assert!(!a.is_empty());
            for b in &suffixes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
