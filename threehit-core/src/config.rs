//! Analysis configuration.
//!
//! All thresholds of the cut pipeline, the reference radii of the LOR
//! deviation variants, the single-hit prompt selection, the energy→TOT
//! calibration and the barrel geometry handed to the reconstructor.
//! Loaded from JSON with every field optional.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::category::{AnalysisMode, LabelTable};
use crate::error::{Error, Result};

/// Speed of light (cm/ns).
pub const LIGHT_SPEED_CM_NS: f64 = 29.979_245_8;

/// Electron rest mass (keV).
pub const ELECTRON_MASS_KEV: f64 = 510.99;

/// Thresholds of the sequential cut pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutThresholds {
    /// Every measured TOT must be below this (ns).
    pub max_tot_ns: f64,
    /// The scatter-test residual must exceed this (cm).
    pub min_scatter_residual_cm: f64,
    /// The minimum pairwise annihilation distance must exceed this (cm).
    pub min_lor_distance_cm: f64,
    /// The sum of the two smallest azimuthal angles must exceed this (deg).
    pub min_angle_sum_deg: f64,
}

impl Default for CutThresholds {
    fn default() -> Self {
        Self {
            max_tot_ns: 40.0,
            min_scatter_residual_cm: 20.0,
            min_lor_distance_cm: 5.0,
            min_angle_sum_deg: 180.0,
        }
    }
}

/// Reference radii for the deviation variants of the LOR distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceRadii {
    /// Spherical reference (cm).
    pub spherical_cm: f64,
    /// Cylindrical reference (cm).
    pub cylindrical_cm: f64,
}

impl Default for ReferenceRadii {
    fn default() -> Self {
        Self {
            spherical_cm: 10.0,
            cylindrical_cm: 12.0,
        }
    }
}

/// Selection of single-hit events as prompt-photon time references.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSelection {
    /// Minimum measured TOT for data (ns).
    pub data_min_tot_ns: f64,
    /// Minimum energy-derived TOT for simulation (ns).
    pub simulation_min_tot_ns: f64,
}

impl Default for PromptSelection {
    fn default() -> Self {
        Self {
            data_min_tot_ns: 65.0,
            simulation_min_tot_ns: 20.0,
        }
    }
}

impl PromptSelection {
    /// Threshold that applies in `mode`.
    pub fn min_tot_ns(&self, mode: AnalysisMode) -> f64 {
        match mode {
            AnalysisMode::Simulation => self.simulation_min_tot_ns,
            AnalysisMode::Data => self.data_min_tot_ns,
        }
    }
}

/// Sigmoid regression from deposited energy to TOT.
///
/// `tot = plateau + (offset - plateau) / (1 + (E / midpoint)^slope)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotCalibration {
    /// High-energy asymptote (ns).
    pub plateau_ns: f64,
    /// Low-energy asymptote (ns).
    pub offset_ns: f64,
    /// Energy at the inflection point (keV).
    pub midpoint_kev: f64,
    /// Steepness exponent.
    pub slope: f64,
}

impl Default for TotCalibration {
    fn default() -> Self {
        Self {
            plateau_ns: 29.84,
            offset_ns: 2.446,
            midpoint_kev: 310.0,
            slope: 2.41,
        }
    }
}

impl TotCalibration {
    /// Converts a deposited energy to the expected TOT.
    #[inline]
    pub fn tot_from_energy(&self, energy_kev: f64) -> f64 {
        self.plateau_ns
            + (self.offset_ns - self.plateau_ns)
                / (1.0 + (energy_kev / self.midpoint_kev).powf(self.slope))
    }
}

/// Detector geometry the reconstructor is configured with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarrelGeometry {
    /// Scintillator strip length (cm).
    pub barrel_length_cm: f64,
    /// Radius of the annihilation chamber (cm).
    pub chamber_radius_cm: f64,
}

impl Default for BarrelGeometry {
    fn default() -> Self {
        Self {
            barrel_length_cm: 50.0,
            chamber_radius_cm: 10.0,
        }
    }
}

/// Full configuration of a three-hit analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Simulation or measured data.
    pub mode: AnalysisMode,
    /// Cut pipeline thresholds.
    pub cuts: CutThresholds,
    /// LOR deviation reference radii.
    pub reference_radii: ReferenceRadii,
    /// Prompt-photon selection for single-hit events.
    pub prompt: PromptSelection,
    /// Energy→TOT regression.
    pub tot_calibration: TotCalibration,
    /// Geometry handed to the reconstructor.
    pub barrel: BarrelGeometry,
    /// Speed of light (cm/ns).
    pub light_speed_cm_ns: f64,
    /// Electron rest mass (keV).
    pub electron_mass_kev: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::default(),
            cuts: CutThresholds::default(),
            reference_radii: ReferenceRadii::default(),
            prompt: PromptSelection::default(),
            tot_calibration: TotCalibration::default(),
            barrel: BarrelGeometry::default(),
            light_speed_cm_ns: LIGHT_SPEED_CM_NS,
            electron_mass_kev: ELECTRON_MASS_KEV,
        }
    }
}

impl AnalysisConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration for simulated input.
    #[must_use]
    pub fn simulation() -> Self {
        Self::default().with_mode(AnalysisMode::Simulation)
    }

    /// Default configuration for measured data.
    #[must_use]
    pub fn data() -> Self {
        Self::default().with_mode(AnalysisMode::Data)
    }

    /// Sets the analysis mode.
    #[must_use]
    pub fn with_mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the cut thresholds.
    #[must_use]
    pub fn with_cuts(mut self, cuts: CutThresholds) -> Self {
        self.cuts = cuts;
        self
    }

    /// Sets the barrel geometry.
    #[must_use]
    pub fn with_barrel(mut self, barrel: BarrelGeometry) -> Self {
        self.barrel = barrel;
        self
    }

    /// Sets the LOR deviation reference radii.
    #[must_use]
    pub fn with_reference_radii(mut self, radii: ReferenceRadii) -> Self {
        self.reference_radii = radii;
        self
    }

    /// Returns the label table matching the mode.
    pub fn labels(&self) -> LabelTable {
        LabelTable::for_mode(self.mode)
    }

    /// Returns true for simulation runs.
    pub fn is_simulation(&self) -> bool {
        self.mode == AnalysisMode::Simulation
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    /// Fails on malformed JSON or on values rejected by [`Self::validate`].
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    /// Fails if the file cannot be read, parsed or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("cuts.max_tot_ns", self.cuts.max_tot_ns),
            ("cuts.min_scatter_residual_cm", self.cuts.min_scatter_residual_cm),
            ("cuts.min_lor_distance_cm", self.cuts.min_lor_distance_cm),
            ("cuts.min_angle_sum_deg", self.cuts.min_angle_sum_deg),
            ("reference_radii.spherical_cm", self.reference_radii.spherical_cm),
            ("reference_radii.cylindrical_cm", self.reference_radii.cylindrical_cm),
            ("prompt.data_min_tot_ns", self.prompt.data_min_tot_ns),
            ("prompt.simulation_min_tot_ns", self.prompt.simulation_min_tot_ns),
            ("tot_calibration.plateau_ns", self.tot_calibration.plateau_ns),
            ("tot_calibration.offset_ns", self.tot_calibration.offset_ns),
            ("tot_calibration.slope", self.tot_calibration.slope),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(Error::InvalidConfig(format!("{name} must be finite")));
            }
        }

        let positive = [
            ("tot_calibration.midpoint_kev", self.tot_calibration.midpoint_kev),
            ("barrel.barrel_length_cm", self.barrel.barrel_length_cm),
            ("barrel.chamber_radius_cm", self.barrel.chamber_radius_cm),
            ("light_speed_cm_ns", self.light_speed_cm_ns),
            ("electron_mass_kev", self.electron_mass_kev),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.mode, AnalysisMode::Data);
        assert_relative_eq!(config.cuts.max_tot_ns, 40.0);
        assert_relative_eq!(config.cuts.min_scatter_residual_cm, 20.0);
        assert_relative_eq!(config.cuts.min_lor_distance_cm, 5.0);
        assert_relative_eq!(config.cuts.min_angle_sum_deg, 180.0);
        assert_relative_eq!(config.reference_radii.spherical_cm, 10.0);
        assert_relative_eq!(config.reference_radii.cylindrical_cm, 12.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tot_calibration_limits() {
        let calibration = TotCalibration::default();
        assert_relative_eq!(calibration.tot_from_energy(0.0), 2.446, epsilon = 1e-12);
        assert_relative_eq!(
            calibration.tot_from_energy(310.0),
            (29.84 + 2.446) / 2.0,
            epsilon = 1e-12
        );
        assert!(calibration.tot_from_energy(1.0e6) < 29.84);
        assert!(calibration.tot_from_energy(1.0e6) > 29.8);
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "mode": "simulation",
            "cuts": { "min_lor_distance_cm": 3.5 },
            "barrel": { "barrel_length_cm": 50.0 }
        }"#;
        let config = AnalysisConfig::from_json(json).unwrap();
        assert!(config.is_simulation());
        assert_relative_eq!(config.cuts.min_lor_distance_cm, 3.5);
        assert_relative_eq!(config.cuts.max_tot_ns, 40.0);
        assert_relative_eq!(config.barrel.chamber_radius_cm, 10.0);
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let json = r#"{ "barrel": { "chamber_radius_cm": 0.0 } }"#;
        let err = AnalysisConfig::from_json(json).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(msg) if msg.contains("chamber_radius_cm")));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "mode": "data", "cuts": {{ "max_tot_ns": 35.0 }} }}"#).unwrap();
        let config = AnalysisConfig::from_file(file.path()).unwrap();
        assert_eq!(config.mode, AnalysisMode::Data);
        assert_relative_eq!(config.cuts.max_tot_ns, 35.0);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            AnalysisConfig::from_json("{ not json"),
            Err(Error::ConfigParse(_))
        ));
    }
}
