//! threehit-analysis: Truth classification and staged cuts for three-hit events.
//!
//! This crate provides:
//! - **Classifier** - Monte-Carlo truth topology of an event from its
//!   generated-gamma codes and vertex indices
//! - **Metrics** - scatter test, LOR distances, trilateration consistency,
//!   inter-hit distances and angle-derived photon energies
//! - **Pipeline** - ordered cut stages that emit named observables
//! - **Processing** - sequential and rayon-parallel time-window processing
//!
#![warn(missing_docs)]

pub mod classifier;
pub mod geometry;
pub mod histogram;
pub mod metrics;
pub mod observables;
pub mod pipeline;
mod processing;

pub use classifier::{
    fallback_category, Classification, PermutationSet, Rule, VertexConstraint,
    VertexTopologyClassifier, RULES,
};
pub use histogram::{Fill, FillLog, Histogram, Histogram1D, Histogram2D, HistogramSink};
pub use metrics::{ConsistencyResult, DecayGeometry};
pub use observables::{Axis, Binning, EventView, Observable};
pub use pipeline::{catalogue, CutPipeline, Stage};
pub use processing::{EventAnalyzer, EventOutcome, ProcessingStats, WindowProcessor};

// Re-export the core types callers need alongside the analysis
pub use threehit_core::{
    AnalysisConfig, AnalysisMode, EventCategory, LabelTable, Reconstructor, StatisticsSink,
};
