//! Time-window processing: prompt tracking, classification and the cut walk.

use log::{debug, trace};
use rayon::prelude::*;
use threehit_core::{
    observable_name, AnalysisConfig, AnalysisMode, Error, Event, EventCategory, Hit, LabelTable,
    Reconstructor, Result, StatisticsSink, TimeWindow, TruthHit, TruthWindow,
};

use crate::classifier::{Classification, VertexTopologyClassifier};
use crate::histogram::FillLog;
use crate::metrics::{lifetime_ns, prompt_emission_time, ConsistencyResult};
use crate::observables::{
    EventView, ERROR_CODE, GEN_MULT_PER_GAMMA, HIT_GEN_MULT, HIT_MULTIPLICITY,
    HIT_GEN_MULT_SAME_VERTEX, HIT_GEN_MULT_TWO_SAME_VERTEX, HIT_VERTEX, SAME_VERTEX_PAIR_MULT,
    SAME_VERTEX_PAIR_MULT_AFTER_LOR, TOT_ALL_HITS, TOT_SINGLE_HIT,
};
use crate::pipeline::{CutPipeline, Stage};

/// Counters accumulated over processed events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProcessingStats {
    /// Time windows processed.
    pub windows: u64,
    /// Events of any multiplicity.
    pub events: u64,
    /// Events with exactly one hit.
    pub single_hit_events: u64,
    /// Single-hit events accepted as prompt-photon references.
    pub prompt_candidates: u64,
    /// Events with exactly three hits.
    pub three_hit_events: u64,
    /// Three-hit events for which more than one classification rule matched.
    pub ambiguous: u64,
    /// Furthest stage reached by each three-hit event, indexed by stage order.
    pub reached: [u64; 7],
}

impl ProcessingStats {
    /// Three-hit events whose furthest stage is `stage`.
    pub fn reached(&self, stage: Stage) -> u64 {
        self.reached[stage as usize]
    }

    /// Three-hit events that got at least as far as `stage`.
    pub fn passed(&self, stage: Stage) -> u64 {
        self.reached[stage as usize..].iter().sum()
    }

    fn record(&mut self, outcome: &EventOutcome) {
        self.three_hit_events += 1;
        self.reached[outcome.stage as usize] += 1;
        if outcome
            .classification
            .as_ref()
            .is_some_and(Classification::is_ambiguous)
        {
            self.ambiguous += 1;
        }
    }

    /// Adds another set of counters.
    pub fn merge(&mut self, other: &Self) {
        self.windows += other.windows;
        self.events += other.events;
        self.single_hit_events += other.single_hit_events;
        self.prompt_candidates += other.prompt_candidates;
        self.three_hit_events += other.three_hit_events;
        self.ambiguous += other.ambiguous;
        for (a, b) in self.reached.iter_mut().zip(other.reached) {
            *a += b;
        }
    }
}

/// Result of analysing one three-hit event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventOutcome {
    /// Furthest stage of the all-events walk.
    pub stage: Stage,
    /// Truth classification (simulation only).
    pub classification: Option<Classification>,
}

/// Stateless per-event analysis shared by the sequential and parallel paths.
#[derive(Debug, Clone)]
pub struct EventAnalyzer {
    config: AnalysisConfig,
    labels: LabelTable,
    classifier: VertexTopologyClassifier,
    pipeline: CutPipeline,
}

impl EventAnalyzer {
    /// Creates an analyzer.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the configuration does not validate.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            labels: config.labels(),
            classifier: VertexTopologyClassifier::new(),
            pipeline: CutPipeline::new(config.cuts),
            config,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// The label table in use.
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Analyses one three-hit event.
    ///
    /// The event is always walked as the all-events aggregate. In simulation
    /// it is then classified from truth and walked again under its category.
    ///
    /// # Errors
    /// In simulation, fails if the truth window is missing or a hit cannot
    /// be resolved to its truth record.
    pub fn analyze<R, S>(
        &self,
        hits: &[Hit; 3],
        truth: Option<&TruthWindow>,
        prompt_emission_ns: Option<f64>,
        reconstructor: &mut R,
        sink: &mut S,
    ) -> Result<EventOutcome>
    where
        R: Reconstructor + ?Sized,
        S: StatisticsSink + ?Sized,
    {
        let truth_hits = match self.config.mode {
            AnalysisMode::Simulation => {
                let window = truth.ok_or(Error::MissingTruthWindow)?;
                Some(window.resolve(hits)?)
            }
            AnalysisMode::Data => None,
        };

        let result = ConsistencyResult::compute(hits, reconstructor, &self.config);
        sink.fill_1d(ERROR_CODE, f64::from(result.decay.error_code));

        let lifetime = prompt_emission_ns
            .filter(|_| result.decay.is_valid())
            .map(|emission| lifetime_ns(result.decay.time_ns, emission));
        let view = EventView {
            result: &result,
            lifetime_ns: lifetime,
        };

        let aggregate = EventCategory::Unclassified;
        let stage = self
            .pipeline
            .run(aggregate, self.labels.label(aggregate), &view, sink);
        trace!("event reached {stage:?} (error code {})", result.decay.error_code);

        let classification = truth_hits.map(|truth_hits| {
            let classification = self.classifier.classify(&truth_hits);
            if classification.matches.is_empty() {
                self.truth_diagnostics(&truth_hits, classification.category, &result, sink);
            }
            let category = classification.category;
            self.pipeline
                .run(category, self.labels.label(category), &view, sink);
            classification
        });

        Ok(EventOutcome {
            stage,
            classification,
        })
    }

    /// Generated-multiplicity diagnostics for events no composite rule describes.
    fn truth_diagnostics<S: StatisticsSink + ?Sized>(
        &self,
        truth: &[TruthHit; 3],
        category: EventCategory,
        result: &ConsistencyResult,
        sink: &mut S,
    ) {
        let codes = truth.each_ref().map(|t| f64::from(t.multiplicity.code()));
        let total: f64 = codes.iter().sum();
        for (i, t) in truth.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let ordinal = (i + 1) as f64;
            sink.fill_2d(GEN_MULT_PER_GAMMA[i], codes[i], total - codes[i]);
            sink.fill_2d(HIT_GEN_MULT, ordinal, codes[i]);
            sink.fill_2d(HIT_VERTEX, ordinal, f64::from(t.vertex_index));
        }

        match category {
            EventCategory::AllThreeSameVertex => {
                for (i, code) in codes.iter().enumerate() {
                    #[allow(clippy::cast_precision_loss)]
                    sink.fill_2d(HIT_GEN_MULT_SAME_VERTEX, (i + 1) as f64, *code);
                }
                let cuts = self.pipeline.cuts();
                if result.scatter_residual <= cuts.min_scatter_residual_cm {
                    return;
                }
                let first = truth[0].multiplicity.code();
                let (low, high) = if codes[1] < codes[2] {
                    (codes[1], codes[2])
                } else {
                    (codes[2], codes[1])
                };
                if let Some(name) = first
                    .checked_sub(1)
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(|i| SAME_VERTEX_PAIR_MULT.get(i))
                {
                    sink.fill_2d(name, low, high);
                }
                if first == 1 && result.lor_distance() > cuts.min_lor_distance_cm {
                    sink.fill_2d(SAME_VERTEX_PAIR_MULT_AFTER_LOR, low, high);
                }
            }
            EventCategory::TwoSameVertex => {
                for (i, code) in codes.iter().enumerate() {
                    #[allow(clippy::cast_precision_loss)]
                    sink.fill_2d(HIT_GEN_MULT_TWO_SAME_VERTEX, (i + 1) as f64, *code);
                }
            }
            _ => {}
        }
    }

    /// TOT of a single hit as the mode sees it: measured for data,
    /// derived from the deposited energy for simulation.
    pub fn single_hit_tot(&self, hit: &Hit) -> f64 {
        match self.config.mode {
            AnalysisMode::Simulation => self.config.tot_calibration.tot_from_energy(hit.energy_kev),
            AnalysisMode::Data => hit.tot_ns,
        }
    }

    /// True if a single hit qualifies as a prompt-photon reference.
    pub fn is_prompt_candidate(&self, hit: &Hit) -> bool {
        self.single_hit_tot(hit) > self.config.prompt.min_tot_ns(self.config.mode)
    }
}

/// Processes time windows in arrival order.
///
/// Holds the reconstructor and the most recent prompt emission time, which
/// carries across windows.
#[derive(Debug)]
pub struct WindowProcessor<R> {
    analyzer: EventAnalyzer,
    reconstructor: R,
    prompt_emission_ns: Option<f64>,
    stats: ProcessingStats,
}

impl<R: Reconstructor> WindowProcessor<R> {
    /// Creates a processor and hands the barrel geometry to the reconstructor.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if the configuration does not validate.
    pub fn new(config: AnalysisConfig, mut reconstructor: R) -> Result<Self> {
        let analyzer = EventAnalyzer::new(config)?;
        reconstructor.configure(&analyzer.config.barrel);
        Ok(Self {
            analyzer,
            reconstructor,
            prompt_emission_ns: None,
            stats: ProcessingStats::default(),
        })
    }

    /// The shared per-event analysis.
    pub fn analyzer(&self) -> &EventAnalyzer {
        &self.analyzer
    }

    /// Counters so far.
    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    /// Emission time of the most recent prompt photon, if any.
    pub fn prompt_emission_ns(&self) -> Option<f64> {
        self.prompt_emission_ns
    }

    /// Gives the reconstructor back.
    pub fn into_reconstructor(self) -> R {
        self.reconstructor
    }

    /// Processes every event of a window in order.
    ///
    /// # Errors
    /// Propagates truth-resolution failures in simulation mode. Events
    /// before the failing one have already been emitted.
    pub fn process_window<S: StatisticsSink + ?Sized>(
        &mut self,
        window: &TimeWindow,
        truth: Option<&TruthWindow>,
        sink: &mut S,
    ) -> Result<()> {
        self.stats.windows += 1;
        for event in window.events() {
            if let Some(hits) = self.observe(event, sink) {
                let outcome = self.analyzer.analyze(
                    hits,
                    truth,
                    self.prompt_emission_ns,
                    &mut self.reconstructor,
                    sink,
                )?;
                self.stats.record(&outcome);
            }
        }
        debug!(
            "window done: {} events, {} three-hit so far",
            window.len(),
            self.stats.three_hit_events
        );
        Ok(())
    }

    /// Processes a window with the three-hit analysis fanned out over rayon.
    ///
    /// Prompt times are resolved in a sequential pass first, so each event
    /// sees the same prompt reference as in [`process_window`](Self::process_window).
    /// Every worker builds its own reconstructor with `make_reconstructor`.
    /// Per-event fills are recorded and replayed into `sink` on this thread.
    ///
    /// # Errors
    /// Propagates the first truth-resolution failure; nothing from the
    /// parallel phase is emitted in that case.
    pub fn process_window_parallel<F, S>(
        &mut self,
        window: &TimeWindow,
        truth: Option<&TruthWindow>,
        make_reconstructor: F,
        sink: &mut S,
    ) -> Result<()>
    where
        F: Fn() -> R + Sync + Send,
        S: StatisticsSink + ?Sized,
    {
        self.stats.windows += 1;
        let mut jobs = Vec::new();
        for event in window.events() {
            if let Some(hits) = self.observe(event, sink) {
                jobs.push((hits, self.prompt_emission_ns));
            }
        }

        let analyzer = &self.analyzer;
        let results: Vec<Result<(FillLog, EventOutcome)>> = jobs
            .par_iter()
            .map_init(
                || {
                    let mut reconstructor = make_reconstructor();
                    reconstructor.configure(&analyzer.config.barrel);
                    reconstructor
                },
                |reconstructor, &(hits, prompt)| {
                    let mut log = FillLog::new();
                    let outcome = analyzer.analyze(hits, truth, prompt, reconstructor, &mut log)?;
                    Ok((log, outcome))
                },
            )
            .collect();

        let results = results.into_iter().collect::<Result<Vec<_>>>()?;
        for (log, outcome) in results {
            log.replay(sink);
            self.stats.record(&outcome);
        }
        Ok(())
    }

    /// Bookkeeping every event gets. Returns the hits of three-hit events.
    fn observe<'e, S: StatisticsSink + ?Sized>(
        &mut self,
        event: &'e Event,
        sink: &mut S,
    ) -> Option<&'e [Hit; 3]> {
        self.stats.events += 1;
        let aggregate = self.analyzer.labels.label(EventCategory::Unclassified);
        #[allow(clippy::cast_precision_loss)]
        sink.fill_1d(
            &observable_name(HIT_MULTIPLICITY, "", aggregate),
            event.len() as f64,
        );

        if self.analyzer.config.mode == AnalysisMode::Data {
            for hit in event.hits() {
                sink.fill_1d(TOT_ALL_HITS, hit.tot_ns);
            }
        }

        if let [hit] = event.hits() {
            self.single_hit(hit, sink);
        }
        event.as_triple()
    }

    fn single_hit<S: StatisticsSink + ?Sized>(&mut self, hit: &Hit, sink: &mut S) {
        self.stats.single_hit_events += 1;
        let tot = self.analyzer.single_hit_tot(hit);
        sink.fill_1d(TOT_SINGLE_HIT, tot);
        if self.analyzer.is_prompt_candidate(hit) {
            self.stats.prompt_candidates += 1;
            self.prompt_emission_ns =
                Some(prompt_emission_time(hit, self.analyzer.config.light_speed_cm_ns));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use threehit_core::{DecaySolution, SolutionMode};

    #[derive(Debug, Default)]
    struct FailingReconstructor {
        configured: bool,
    }

    impl Reconstructor for FailingReconstructor {
        fn configure(&mut self, _geometry: &threehit_core::BarrelGeometry) {
            self.configured = true;
        }

        fn set_gamma(&mut self, _slot: usize, _hit: &Hit) {}

        fn solution(&mut self, _mode: SolutionMode) -> DecaySolution {
            DecaySolution {
                point: Vector3::zeros(),
                time_ns: 0.0,
                error_code: 3,
            }
        }
    }

    fn hit(x: f64, y: f64, tot: f64) -> Hit {
        Hit::new(Vector3::new(x, y, 0.0), 0.0, 300.0, tot)
    }

    #[test]
    fn test_processor_configures_reconstructor() {
        let processor =
            WindowProcessor::new(AnalysisConfig::data(), FailingReconstructor::default()).unwrap();
        assert!(processor.into_reconstructor().configured);
    }

    #[test]
    fn test_prompt_candidate_thresholds() {
        let analyzer = EventAnalyzer::new(AnalysisConfig::data()).unwrap();
        assert!(analyzer.is_prompt_candidate(&hit(40.0, 0.0, 70.0)));
        assert!(!analyzer.is_prompt_candidate(&hit(40.0, 0.0, 30.0)));
    }

    #[test]
    fn test_single_hit_updates_prompt_time() {
        let mut processor =
            WindowProcessor::new(AnalysisConfig::data(), FailingReconstructor::default()).unwrap();
        let window = TimeWindow::new(vec![
            Event::new(vec![hit(30.0, 40.0, 80.0)]),
            Event::new(vec![hit(30.0, 40.0, 10.0), hit(-30.0, 40.0, 10.0)]),
        ]);
        let mut log = FillLog::new();
        processor.process_window(&window, None, &mut log).unwrap();

        let expected = -50.0 / threehit_core::LIGHT_SPEED_CM_NS;
        assert!((processor.prompt_emission_ns().unwrap() - expected).abs() < 1e-12);
        assert_eq!(processor.stats().events, 2);
        assert_eq!(processor.stats().single_hit_events, 1);
        assert_eq!(processor.stats().prompt_candidates, 1);
        assert_eq!(processor.stats().three_hit_events, 0);
        assert_eq!(log.count(TOT_ALL_HITS), 3);
        assert_eq!(log.count(TOT_SINGLE_HIT), 1);
        assert_eq!(log.count("HitMult_3 hit evts"), 2);
    }

    #[test]
    fn test_simulation_single_hit_tot_from_energy() {
        let config = AnalysisConfig::simulation();
        let expected = config.tot_calibration.tot_from_energy(500.0);
        let mut processor = WindowProcessor::new(config, FailingReconstructor::default()).unwrap();
        let single = Hit::new(Vector3::new(30.0, 40.0, 0.0), 10.0, 500.0, 0.0);
        let window = TimeWindow::new(vec![Event::new(vec![single])]);
        let mut log = FillLog::new();
        processor.process_window(&window, None, &mut log).unwrap();

        let fills: Vec<f64> = log
            .fills()
            .iter()
            .filter_map(|fill| match fill {
                crate::histogram::Fill::One { name, x, .. } if name == TOT_SINGLE_HIT => Some(*x),
                _ => None,
            })
            .collect();
        assert_eq!(fills, vec![expected]);
        assert!(expected > 20.0);
        assert_eq!(processor.stats().prompt_candidates, 1);
        assert!(processor.prompt_emission_ns().is_some());
        assert!(!log.contains(TOT_ALL_HITS));
    }

    #[test]
    fn test_extreme_generation_code_skips_pair_diagnostics() {
        let mut processor = WindowProcessor::new(
            AnalysisConfig::simulation(),
            FailingReconstructor::default(),
        )
        .unwrap();
        let triple = Event::new(vec![
            hit(40.0, 0.0, 10.0).with_truth_index(0),
            hit(-20.0, 34.0, 10.0).with_truth_index(1),
            hit(-20.0, -34.0, 10.0).with_truth_index(2),
        ]);
        let truth = TruthWindow::new(vec![
            TruthHit::new(4, i32::MIN),
            TruthHit::new(4, 2),
            TruthHit::new(4, 3),
        ]);
        let mut log = FillLog::new();
        processor
            .process_window(&TimeWindow::new(vec![triple]), Some(&truth), &mut log)
            .unwrap();

        assert_eq!(log.count(HIT_GEN_MULT_SAME_VERTEX), 3);
        for name in SAME_VERTEX_PAIR_MULT {
            assert!(!log.contains(name), "{name}");
        }
    }

    #[test]
    fn test_simulation_without_truth_window_fails() {
        let mut processor = WindowProcessor::new(
            AnalysisConfig::simulation(),
            FailingReconstructor::default(),
        )
        .unwrap();
        let triple = Event::new(vec![
            hit(40.0, 0.0, 10.0).with_truth_index(0),
            hit(-20.0, 34.0, 10.0).with_truth_index(1),
            hit(-20.0, -34.0, 10.0).with_truth_index(2),
        ]);
        let window = TimeWindow::new(vec![triple]);
        let err = processor
            .process_window(&window, None, &mut FillLog::new())
            .unwrap_err();
        assert!(matches!(err, Error::MissingTruthWindow));
    }

    #[test]
    fn test_stats_merge_and_passed() {
        let mut a = ProcessingStats {
            three_hit_events: 2,
            reached: [1, 0, 0, 0, 0, 1, 0],
            ..ProcessingStats::default()
        };
        let b = ProcessingStats {
            three_hit_events: 1,
            reached: [0, 0, 0, 0, 0, 0, 1],
            ..ProcessingStats::default()
        };
        a.merge(&b);
        assert_eq!(a.three_hit_events, 3);
        assert_eq!(a.passed(Stage::Classified), 3);
        assert_eq!(a.passed(Stage::LorValid), 2);
        assert_eq!(a.reached(Stage::AngleValid), 1);
    }
}
