//! Hit and truth-hit types for three-photon coincidence data.

use nalgebra::Vector3;

/// Scale of raw timestamps delivered by the upstream event builder.
///
/// Reconstructed data and simulation disagree on the unit, so every hit
/// time is converted to nanoseconds exactly once, when the [`Hit`] is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// Picoseconds (reconstructed detector data).
    Picoseconds,
    /// Nanoseconds.
    Nanoseconds,
}

impl TimeUnit {
    /// Converts a raw timestamp in this unit to nanoseconds.
    #[inline]
    #[must_use]
    pub fn to_ns(self, value: f64) -> f64 {
        match self {
            Self::Picoseconds => value / 1000.0,
            Self::Nanoseconds => value,
        }
    }
}

/// A single photon detection.
///
/// Hits are created once per time window by the event builder and never
/// mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Position in the detector frame (cm).
    pub position: Vector3<f64>,
    /// Detection time (ns).
    pub time_ns: f64,
    /// Deposited energy proxy (keV).
    pub energy_kev: f64,
    /// Measured time over threshold (ns).
    pub tot_ns: f64,
    /// Index of the matching record in the truth window, if any.
    pub truth_index: Option<usize>,
}

impl Hit {
    /// Creates a hit without a truth link.
    #[inline]
    #[must_use]
    pub fn new(position: Vector3<f64>, time_ns: f64, energy_kev: f64, tot_ns: f64) -> Self {
        Self {
            position,
            time_ns,
            energy_kev,
            tot_ns,
            truth_index: None,
        }
    }

    /// Creates a hit from a raw timestamp given in `unit`.
    #[inline]
    #[must_use]
    pub fn from_raw_time(
        position: Vector3<f64>,
        time: f64,
        unit: TimeUnit,
        energy_kev: f64,
        tot_ns: f64,
    ) -> Self {
        Self::new(position, unit.to_ns(time), energy_kev, tot_ns)
    }

    /// Links this hit to a truth record.
    #[inline]
    #[must_use]
    pub fn with_truth_index(mut self, index: usize) -> Self {
        self.truth_index = Some(index);
        self
    }

    /// Returns the x coordinate (cm).
    #[inline]
    pub fn x(&self) -> f64 {
        self.position.x
    }

    /// Returns the y coordinate (cm).
    #[inline]
    pub fn y(&self) -> f64 {
        self.position.y
    }

    /// Returns the z coordinate (cm).
    #[inline]
    pub fn z(&self) -> f64 {
        self.position.z
    }
}

/// Generated-gamma multiplicity code from the simulation.
///
/// The last two digits name the primary photon family (1 prompt,
/// 2 back-to-back, 3 three-photon decay); each hundred counts one
/// scatter or re-emission, so `103` is a once-scattered decay photon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GammaMultiplicity(pub i32);

impl GammaMultiplicity {
    /// Prompt (de-excitation) photon.
    pub const PROMPT: Self = Self(1);
    /// Photon from a back-to-back (two-photon) annihilation.
    pub const BACK_TO_BACK: Self = Self(2);
    /// Photon from a three-photon decay.
    pub const THREE_PHOTON: Self = Self(3);

    /// Returns the raw code.
    #[inline]
    pub fn code(self) -> i32 {
        self.0
    }

    /// Returns the primary photon family (code modulo 100).
    #[inline]
    pub fn family(self) -> i32 {
        self.0 % 100
    }

    /// Returns the number of scatters the photon underwent.
    #[inline]
    pub fn scatter_count(self) -> i32 {
        self.0 / 100
    }

    /// True for unscattered photons (codes 1, 2 and 3).
    #[inline]
    pub fn is_primary(self) -> bool {
        (1..=3).contains(&self.0)
    }
}

impl From<i32> for GammaMultiplicity {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

/// Simulation truth record behind one [`Hit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruthHit {
    /// Identity of the generation or interaction vertex.
    pub vertex_index: i32,
    /// Generation-order and scatter-history code.
    pub multiplicity: GammaMultiplicity,
}

impl TruthHit {
    /// Creates a truth hit.
    #[must_use]
    pub fn new(vertex_index: i32, multiplicity: impl Into<GammaMultiplicity>) -> Self {
        Self {
            vertex_index,
            multiplicity: multiplicity.into(),
        }
    }
}
