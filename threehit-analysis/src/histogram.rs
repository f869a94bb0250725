//! In-memory sinks implementing [`StatisticsSink`].
//!
//! [`HistogramSink`] bins fills into histograms registered up front from
//! the observable catalogue. Bin contents are weights stored in flat
//! row-major vectors; sinks from independent workers combine with
//! [`HistogramSink::merge`]. [`FillLog`] just records fills for replay.

use std::collections::BTreeMap;

use log::{debug, warn};
use threehit_core::{LabelTable, StatisticsSink};

use crate::observables::{Axis, Binning};
use crate::pipeline::catalogue;

impl Axis {
    /// Bin index of `value`, or `None` outside `[min, max)`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn bin(&self, value: f64) -> Option<usize> {
        if self.bins == 0 || !(value >= self.min && value < self.max) {
            return None;
        }
        let width = (self.max - self.min) / self.bins as f64;
        let bin = ((value - self.min) / width) as usize;
        Some(bin.min(self.bins - 1))
    }

    /// Centre of bin `index`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_center(&self, index: usize) -> f64 {
        let width = (self.max - self.min) / self.bins as f64;
        self.min + (index as f64 + 0.5) * width
    }
}

/// 1-D weighted histogram.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Histogram1D {
    axis: Axis,
    counts: Vec<f64>,
    underflow: f64,
    overflow: f64,
    entries: u64,
}

impl Histogram1D {
    /// Creates an empty histogram.
    #[must_use]
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            counts: vec![0.0; axis.bins],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0,
        }
    }

    /// Adds `weight` at `x`. Non-finite `x` is counted as an entry but not binned.
    pub fn fill(&mut self, x: f64, weight: f64) {
        self.entries += 1;
        match self.axis.bin(x) {
            Some(bin) => self.counts[bin] += weight,
            None if x < self.axis.min => self.underflow += weight,
            None if x >= self.axis.max => self.overflow += weight,
            None => {}
        }
    }

    /// Binning.
    #[must_use]
    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    /// Bin contents.
    #[must_use]
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Content at `x`, or `None` if `x` is out of range.
    #[must_use]
    pub fn get(&self, x: f64) -> Option<f64> {
        self.axis.bin(x).map(|bin| self.counts[bin])
    }

    /// Number of fills.
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Total weight in range.
    #[must_use]
    pub fn integral(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Weight below and above the axis range.
    #[must_use]
    pub fn out_of_range(&self) -> (f64, f64) {
        (self.underflow, self.overflow)
    }

    fn merge(&mut self, other: &Self) {
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.entries += other.entries;
    }
}

/// 2-D weighted histogram stored as `counts[y * nx + x]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Histogram2D {
    x_axis: Axis,
    y_axis: Axis,
    counts: Vec<f64>,
    outside: f64,
    entries: u64,
}

impl Histogram2D {
    /// Creates an empty histogram.
    #[must_use]
    pub fn new(x_axis: Axis, y_axis: Axis) -> Self {
        Self {
            x_axis,
            y_axis,
            counts: vec![0.0; x_axis.bins * y_axis.bins],
            outside: 0.0,
            entries: 0,
        }
    }

    /// Adds `weight` at `(x, y)`.
    pub fn fill(&mut self, x: f64, y: f64, weight: f64) {
        self.entries += 1;
        match (self.x_axis.bin(x), self.y_axis.bin(y)) {
            (Some(ix), Some(iy)) => self.counts[iy * self.x_axis.bins + ix] += weight,
            _ => self.outside += weight,
        }
    }

    /// X and Y binning.
    #[must_use]
    pub fn axes(&self) -> (&Axis, &Axis) {
        (&self.x_axis, &self.y_axis)
    }

    /// Content at `(x, y)`, or `None` if out of range.
    #[must_use]
    pub fn get(&self, x: f64, y: f64) -> Option<f64> {
        let ix = self.x_axis.bin(x)?;
        let iy = self.y_axis.bin(y)?;
        Some(self.counts[iy * self.x_axis.bins + ix])
    }

    /// Number of fills.
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Total weight in range.
    #[must_use]
    pub fn integral(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Projection onto the X axis.
    #[must_use]
    pub fn project_x(&self) -> Vec<f64> {
        let nx = self.x_axis.bins;
        let mut out = vec![0.0; nx];
        for row in self.counts.chunks_exact(nx.max(1)) {
            for (acc, value) in out.iter_mut().zip(row) {
                *acc += value;
            }
        }
        out
    }

    fn merge(&mut self, other: &Self) {
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        self.outside += other.outside;
        self.entries += other.entries;
    }
}

/// A registered histogram.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Histogram {
    /// One-dimensional.
    One(Histogram1D),
    /// Two-dimensional.
    Two(Histogram2D),
}

impl Histogram {
    /// Creates an empty histogram with the given binning.
    #[must_use]
    pub fn new(binning: Binning) -> Self {
        match binning {
            Binning::One(axis) => Self::One(Histogram1D::new(axis)),
            Binning::Two(x, y) => Self::Two(Histogram2D::new(x, y)),
        }
    }

    /// Binning of this histogram.
    #[must_use]
    pub fn binning(&self) -> Binning {
        match self {
            Self::One(h) => Binning::One(h.axis),
            Self::Two(h) => Binning::Two(h.x_axis, h.y_axis),
        }
    }

    /// Number of fills.
    #[must_use]
    pub fn entries(&self) -> u64 {
        match self {
            Self::One(h) => h.entries(),
            Self::Two(h) => h.entries(),
        }
    }

    /// The 1-D histogram, if this is one.
    #[must_use]
    pub fn as_1d(&self) -> Option<&Histogram1D> {
        match self {
            Self::One(h) => Some(h),
            Self::Two(_) => None,
        }
    }

    /// The 2-D histogram, if this is one.
    #[must_use]
    pub fn as_2d(&self) -> Option<&Histogram2D> {
        match self {
            Self::Two(h) => Some(h),
            Self::One(_) => None,
        }
    }
}

/// Named histograms plus a tally of fills to unregistered or mismatched names.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistogramSink {
    histograms: BTreeMap<String, Histogram>,
    rejected: BTreeMap<String, u64>,
}

impl HistogramSink {
    /// Creates a sink with nothing registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink with every observable for `labels` registered.
    #[must_use]
    pub fn for_labels(labels: &LabelTable) -> Self {
        let mut sink = Self::new();
        for (name, binning) in catalogue(labels) {
            sink.register(name, binning);
        }
        sink
    }

    /// Registers a histogram. An existing histogram under `name` is kept.
    pub fn register(&mut self, name: impl Into<String>, binning: Binning) {
        self.histograms
            .entry(name.into())
            .or_insert_with(|| Histogram::new(binning));
    }

    /// Looks a histogram up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Histogram> {
        self.histograms.get(name)
    }

    /// Number of fills under `name`, zero if unknown.
    #[must_use]
    pub fn entries(&self, name: &str) -> u64 {
        self.histograms.get(name).map_or(0, Histogram::entries)
    }

    /// Iterates over histograms in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Histogram)> {
        self.histograms.iter().map(|(name, h)| (name.as_str(), h))
    }

    /// Names of histograms that received at least one fill.
    pub fn filled(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, h)| h.entries() > 0)
            .map(|(name, _)| name)
    }

    /// Fills that could not be routed, by name.
    #[must_use]
    pub fn rejected(&self) -> &BTreeMap<String, u64> {
        &self.rejected
    }

    /// Adds every bin of `other` into `self`.
    ///
    /// Histograms only present in `other` are adopted. A histogram whose
    /// binning differs is left untouched and its entries are counted as rejected.
    pub fn merge(&mut self, other: Self) {
        for (name, theirs) in other.histograms {
            match self.histograms.get_mut(&name) {
                None => {
                    self.histograms.insert(name, theirs);
                }
                Some(ours) => match (ours, &theirs) {
                    (Histogram::One(a), Histogram::One(b)) if a.axis == b.axis => a.merge(b),
                    (Histogram::Two(a), Histogram::Two(b))
                        if a.x_axis == b.x_axis && a.y_axis == b.y_axis =>
                    {
                        a.merge(b);
                    }
                    _ => {
                        warn!("binning mismatch merging histogram {name}");
                        *self.rejected.entry(name).or_default() += theirs.entries();
                    }
                },
            }
        }
        for (name, count) in other.rejected {
            *self.rejected.entry(name).or_default() += count;
        }
    }

    fn reject(&mut self, name: &str) {
        debug!("dropping fill to unregistered histogram {name}");
        *self.rejected.entry(name.to_owned()).or_default() += 1;
    }
}

impl StatisticsSink for HistogramSink {
    fn fill_1d_weighted(&mut self, name: &str, x: f64, weight: f64) {
        match self.histograms.get_mut(name) {
            Some(Histogram::One(h)) => h.fill(x, weight),
            _ => self.reject(name),
        }
    }

    fn fill_2d(&mut self, name: &str, x: f64, y: f64) {
        match self.histograms.get_mut(name) {
            Some(Histogram::Two(h)) => h.fill(x, y, 1.0),
            _ => self.reject(name),
        }
    }
}

/// One recorded fill.
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    /// Weighted 1-D fill.
    One {
        /// Observable name.
        name: String,
        /// Value.
        x: f64,
        /// Weight.
        weight: f64,
    },
    /// 2-D fill.
    Two {
        /// Observable name.
        name: String,
        /// X value.
        x: f64,
        /// Y value.
        y: f64,
    },
}

impl Fill {
    /// Observable name of this fill.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::One { name, .. } | Self::Two { name, .. } => name,
        }
    }
}

/// Sink that records fills in order so they can be replayed later.
///
/// Parallel workers fill a log per event; the logs are replayed into the
/// real sink on the calling thread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillLog {
    fills: Vec<Fill>,
}

impl FillLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded fills, in order.
    #[must_use]
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Number of fills recorded under `name`.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.fills.iter().filter(|fill| fill.name() == name).count()
    }

    /// True if anything was recorded under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fills.iter().any(|fill| fill.name() == name)
    }

    /// Forwards every recorded fill to `sink`.
    pub fn replay<S: StatisticsSink + ?Sized>(self, sink: &mut S) {
        for fill in self.fills {
            match fill {
                Fill::One { name, x, weight } => sink.fill_1d_weighted(&name, x, weight),
                Fill::Two { name, x, y } => sink.fill_2d(&name, x, y),
            }
        }
    }
}

impl StatisticsSink for FillLog {
    fn fill_1d_weighted(&mut self, name: &str, x: f64, weight: f64) {
        self.fills.push(Fill::One {
            name: name.to_owned(),
            x,
            weight,
        });
    }

    fn fill_2d(&mut self, name: &str, x: f64, y: f64) {
        self.fills.push(Fill::Two {
            name: name.to_owned(),
            x,
            y,
        });
    }
}
