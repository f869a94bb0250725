//! threehit-core: Core types and service traits for three-hit coincidence analysis.
//!
//! This crate provides the data model (hits, truth hits, events, time
//! windows), the event category set with its label tables, the analysis
//! configuration, and the seams to the two external collaborators: the
//! trilateration [`Reconstructor`] and the [`StatisticsSink`].
//!

pub mod category;
pub mod config;
pub mod error;
pub mod event;
pub mod hit;
pub mod reconstructor;
pub mod sink;

pub use category::{AnalysisMode, EventCategory, LabelTable};
pub use config::{
    AnalysisConfig, BarrelGeometry, CutThresholds, PromptSelection, ReferenceRadii,
    TotCalibration, ELECTRON_MASS_KEV, LIGHT_SPEED_CM_NS,
};
pub use error::{Error, Result};
pub use event::{Event, TimeWindow, TruthWindow};
pub use hit::{GammaMultiplicity, Hit, TimeUnit, TruthHit};
pub use reconstructor::{DecaySolution, Reconstructor, SolutionMode};
pub use sink::{observable_name, NullSink, StatisticsSink};
