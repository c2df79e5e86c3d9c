//! Sequence engine: one tick = drain triggers → step → gate → resolve clouds
//!
//! **Tick pipeline**
//! 1. Drain [`PendingSignals`] from the latch (each trigger is seen once).
//! 2. [`Navigator::resolve_step`] computes the new index (reload / bootstrap / step / bounds).
//! 3. Terminal or empty ticks stop here.
//! 4. [`PublishGate`] decides whether this tick emits; if not, nothing is decoded.
//! 5. [`CloudCache::resolve`] per enabled kind, optionally in parallel.
//! 6. If any kind succeeded, the index becomes the new "previous" index.
//!
//! Index movement and publishing are decoupled: a suppressed tick still moves
//! the cursor, and the next publish shows whatever index is current then.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info, trace};
use rayon::prelude::*;

use crate::config::SequenceConfig;
use crate::entities::loader::PcdLoader;
use crate::entities::traits::{FileSetResolver, PayloadDecoder};
use crate::entities::{DecodeFailure, Payload, PayloadKind, PayloadResult};
use crate::utils::files::RegexFileResolver;

use super::cloud_cache::CloudCache;
use super::event_bus::{Event, EventBus};
use super::events::{
    CloudPublishedEvent, DecodeFailedEvent, EmptySequenceEvent, EndOfSequenceEvent, SequenceReloadedEvent,
};
use super::gate::PublishGate;
use super::navigator::{Navigator, Phase, StepOutcome};
use super::signals::{PendingSignals, SignalLatch};

/// Everything one tick produced
#[derive(Debug, Clone)]
pub struct TickReport {
    pub outcome: StepOutcome,
    /// One entry per enabled kind, in declaration order
    pub per_kind: IndexMap<PayloadKind, PayloadResult>,
    pub end_of_sequence: bool,
    /// At least one cloud was emitted
    pub published: bool,
    /// File at the resolved index, if any
    pub file: Option<PathBuf>,
}

impl TickReport {
    fn new(outcome: StepOutcome, kinds: &[PayloadKind], file: Option<PathBuf>) -> Self {
        Self {
            outcome,
            per_kind: kinds.iter().map(|k| (*k, PayloadResult::Skipped)).collect(),
            end_of_sequence: outcome.end_of_sequence_fired,
            published: false,
            file,
        }
    }

    pub fn result(&self, kind: PayloadKind) -> Option<&PayloadResult> {
        self.per_kind.get(&kind)
    }

    pub fn payload(&self, kind: PayloadKind) -> Option<&Payload> {
        self.result(kind).and_then(PayloadResult::payload)
    }

    pub fn failures(&self) -> impl Iterator<Item = &DecodeFailure> {
        self.per_kind.values().filter_map(PayloadResult::failure)
    }
}

pub struct SequenceEngine {
    config: SequenceConfig,
    navigator: Navigator,
    cache: CloudCache,
    gate: PublishGate,
    latch: SignalLatch,
    decoder: Box<dyn PayloadDecoder>,
    bus: Option<EventBus>,
    ticks: u64,
}

impl std::fmt::Debug for SequenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceEngine")
            .field("config", &self.config)
            .field("navigator", &self.navigator)
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl SequenceEngine {
    pub fn new(
        config: SequenceConfig,
        resolver: Box<dyn FileSetResolver>,
        decoder: Box<dyn PayloadDecoder>,
    ) -> Self {
        info!(
            "SequenceEngine: dir={} pattern={} kinds={:?}",
            config.sequence.directory.display(),
            config.sequence.pattern,
            config.enabled_kinds()
        );
        Self {
            config,
            navigator: Navigator::new(resolver),
            cache: CloudCache::new(),
            gate: PublishGate::new(),
            latch: SignalLatch::new(),
            decoder,
            bus: None,
            ticks: 0,
        }
    }

    /// Regex directory listing + PCD decoding
    pub fn with_defaults(config: SequenceConfig) -> Self {
        Self::new(config, Box::new(RegexFileResolver::new()), Box::new(PcdLoader::new()))
    }

    /// Take triggers from `bus` and report to it
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.latch.connect(&bus);
        self.bus = Some(bus);
        self
    }

    // === Trigger entry points (idempotent, callable from any thread via latch()) ===

    pub fn on_reload_requested(&self) {
        self.latch.request_reload();
    }

    pub fn on_next_requested(&self) {
        self.latch.request_next();
    }

    pub fn on_prev_requested(&self) {
        self.latch.request_prev();
    }

    pub fn on_publish_requested(&self) {
        self.latch.request_publish();
    }

    /// Cloneable trigger handle for other threads
    pub fn latch(&self) -> SignalLatch {
        self.latch.clone()
    }

    // === Accessors ===

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    /// Replace configuration. A changed directory, pattern or sort flag schedules a reload.
    pub fn set_config(&mut self, config: SequenceConfig) {
        if config.source() != self.config.source() {
            debug!("Source changed, scheduling reload");
            self.navigator.request_reload();
        }
        self.config = config;
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn cache(&self) -> &CloudCache {
        &self.cache
    }

    pub fn gate(&self) -> &PublishGate {
        &self.gate
    }

    pub fn phase(&self) -> Phase {
        self.navigator.phase()
    }

    pub fn files(&self) -> &[PathBuf] {
        self.navigator.files()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Signals that would be consumed by the next tick
    pub fn pending(&self) -> PendingSignals {
        self.latch.peek()
    }

    /// Run one tick
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let mut signals = self.latch.drain();
        trace!("Tick {}: {:?}", self.ticks, signals);

        let outcome = self
            .navigator
            .resolve_step(&signals, &self.config.nav(), &self.config.source());
        let kinds = self.config.enabled_kinds();
        let file = outcome
            .index
            .and_then(|i| self.navigator.file(i))
            .map(Path::to_path_buf);
        let mut report = TickReport::new(outcome, &kinds, file);

        if outcome.fresh_load {
            self.cache.invalidate_all();
        }
        self.notify_step(&outcome);

        let Some(index) = outcome.publishable_index() else {
            return report;
        };
        if !self.gate.should_publish(&self.config.publish(), &mut signals) {
            return report;
        }

        let results = self.resolve_kinds(&kinds, &outcome, report.file.as_deref());

        if results.iter().any(|(_, r)| r.is_success()) {
            self.navigator.commit(index);
            report.published = true;
        }

        for (kind, result) in results {
            self.notify_result(kind, index, report.file.as_deref(), &result);
            report.per_kind.insert(kind, result);
        }
        report
    }

    /// Resolve every kind; all decodes finish before the caller looks at the results
    fn resolve_kinds(
        &self,
        kinds: &[PayloadKind],
        outcome: &StepOutcome,
        file: Option<&Path>,
    ) -> Vec<(PayloadKind, PayloadResult)> {
        let cache = &self.cache;
        let decoder = self.decoder.as_ref();

        if self.config.mode.parallel_decode && kinds.len() > 1 {
            kinds
                .par_iter()
                .map(|&kind| (kind, cache.resolve(kind, outcome, file, decoder)))
                .collect()
        } else {
            kinds
                .iter()
                .map(|&kind| (kind, cache.resolve(kind, outcome, file, decoder)))
                .collect()
        }
    }

    fn notify_step(&self, outcome: &StepOutcome) {
        if outcome.fresh_load {
            self.emit(SequenceReloadedEvent {
                file_count: self.navigator.len(),
            });
        }
        if outcome.end_of_sequence_fired {
            if let Some(index) = outcome.index {
                self.emit(EndOfSequenceEvent {
                    index,
                    wrapped: !outcome.is_terminal,
                });
            }
        }
        if outcome.empty_sequence {
            self.emit(EmptySequenceEvent);
        }
    }

    fn notify_result(&self, kind: PayloadKind, index: usize, file: Option<&Path>, result: &PayloadResult) {
        match result {
            PayloadResult::Decoded(payload) | PayloadResult::Cached(payload) => {
                self.emit(CloudPublishedEvent {
                    kind,
                    index,
                    file: file.map(Path::to_path_buf).unwrap_or_default(),
                    payload: payload.clone(),
                    from_cache: matches!(result, PayloadResult::Cached(_)),
                });
            }
            PayloadResult::Failed(failure) => self.emit(DecodeFailedEvent(failure.clone())),
            PayloadResult::Skipped => {}
        }
    }

    fn emit<E: Event + Clone>(&self, event: E) {
        if let Some(bus) = &self.bus {
            bus.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_bus::downcast_event;
    use crate::core::events::{NextCloudEvent, PublishCloudEvent};
    use crate::core::navigator::Edge;
    use crate::entities::cloud::{PointCloud, PointXyz, PointXyzRgb, PointXyzSift};
    use crate::entities::traits::ResolveError;
    use crate::entities::DecodeError;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    struct ListResolver(Vec<PathBuf>);

    impl FileSetResolver for ListResolver {
        fn resolve_files(&self, _dir: &Path, _pattern: &str) -> Result<Vec<PathBuf>, ResolveError> {
            Ok(self.0.clone())
        }
    }

    /// Records every (file, kind) call; fails for listed pairs
    #[derive(Default)]
    struct FakeDecoder {
        calls: Mutex<Vec<(PathBuf, PayloadKind)>>,
        failing: Mutex<HashSet<(PathBuf, PayloadKind)>>,
    }

    impl FakeDecoder {
        fn fail(&self, file: &str, kind: PayloadKind) {
            self.failing.lock().unwrap().insert((PathBuf::from(file), kind));
        }

        fn heal(&self) {
            self.failing.lock().unwrap().clear();
        }

        fn calls(&self) -> Vec<(PathBuf, PayloadKind)> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, kind: PayloadKind) -> usize {
            self.calls().iter().filter(|(_, k)| *k == kind).count()
        }
    }

    impl PayloadDecoder for FakeDecoder {
        fn decode(&self, file: &Path, kind: PayloadKind) -> Result<Payload, DecodeError> {
            self.calls.lock().unwrap().push((file.to_path_buf(), kind));
            if self.failing.lock().unwrap().contains(&(file.to_path_buf(), kind)) {
                return Err(DecodeError::MissingField("rgb"));
            }
            Ok(match kind {
                PayloadKind::Xyz => PointCloud::from_points(vec![PointXyz::default()]).into(),
                PayloadKind::XyzRgb => PointCloud::from_points(vec![PointXyzRgb::default(); 2]).into(),
                PayloadKind::XyzSift => PointCloud::from_points(vec![PointXyzSift::default(); 3]).into(),
            })
        }
    }

    fn config(kinds: &[PayloadKind]) -> SequenceConfig {
        let mut cfg = SequenceConfig::default();
        for k in kinds {
            cfg.set_enabled(*k, true);
        }
        cfg
    }

    fn engine(files: &[&str], cfg: SequenceConfig) -> (SequenceEngine, Arc<FakeDecoder>) {
        let decoder = Arc::new(FakeDecoder::default());
        let resolver = ListResolver(files.iter().map(PathBuf::from).collect());
        let engine = SequenceEngine::new(cfg, Box::new(resolver), Box::new(Arc::clone(&decoder)));
        (engine, decoder)
    }

    fn manual(kinds: &[PayloadKind]) -> SequenceConfig {
        let mut cfg = config(kinds);
        cfg.mode.auto_next_cloud = false;
        cfg
    }

    #[test]
    fn test_auto_next_runs_to_end_and_stops() {
        let (mut engine, decoder) = engine(&["c.dat", "a.dat", "b.dat"], config(&[PayloadKind::Xyz]));

        for expected in ["a.dat", "b.dat", "c.dat"] {
            let report = engine.tick();
            assert!(report.published);
            assert_eq!(report.file.as_deref(), Some(Path::new(expected)));
            assert!(report.result(PayloadKind::Xyz).unwrap().is_decoded());
        }

        let report = engine.tick();
        assert_eq!(report.outcome.index, Some(2));
        assert!(report.outcome.is_terminal);
        assert!(report.end_of_sequence);
        assert!(!report.published);
        assert!(matches!(report.result(PayloadKind::Xyz), Some(PayloadResult::Skipped)));
        assert_eq!(decoder.count(PayloadKind::Xyz), 3);
        assert_eq!(engine.phase(), Phase::Terminal(Edge::High));
    }

    #[test]
    fn test_repeat_tick_decodes_once_per_kind() {
        let kinds = [PayloadKind::Xyz, PayloadKind::XyzRgb, PayloadKind::XyzSift];
        let (mut engine, decoder) = engine(&["a", "b"], manual(&kinds));

        let first = engine.tick();
        let second = engine.tick();

        for kind in kinds {
            assert_eq!(decoder.count(kind), 1);
            assert!(first.result(kind).unwrap().is_decoded());
            assert!(matches!(second.result(kind), Some(PayloadResult::Cached(_))));
            assert!(first.payload(kind).unwrap().ptr_eq(second.payload(kind).unwrap()));
        }
        assert_eq!(engine.cache().stats().hits(), 3);
    }

    #[test]
    fn test_loop_wraps_and_fires_end_of_sequence() {
        let mut cfg = manual(&[PayloadKind::Xyz]);
        cfg.mode.looping = true;
        let (mut engine, _) = engine(&["a", "b", "c"], cfg);
        engine.tick();

        engine.on_prev_requested();
        let report = engine.tick();
        assert_eq!(report.outcome.index, Some(2));
        assert!(report.end_of_sequence);
        assert!(report.published);

        engine.on_next_requested();
        let report = engine.tick();
        assert_eq!(report.outcome.index, Some(0));
        assert!(report.end_of_sequence);
        assert!(report.published);
    }

    #[test]
    fn test_prev_at_start_is_terminal_without_loop() {
        let (mut engine, decoder) = engine(&["a", "b"], manual(&[PayloadKind::Xyz]));
        engine.tick();
        engine.on_prev_requested();
        let report = engine.tick();
        assert_eq!(report.outcome.index, Some(0));
        assert!(report.outcome.is_terminal);
        assert!(report.end_of_sequence);
        assert_eq!(decoder.count(PayloadKind::Xyz), 1);
    }

    fn auto_prev(looping: bool) -> SequenceConfig {
        let mut cfg = manual(&[PayloadKind::Xyz]);
        cfg.mode.auto_prev_cloud = true;
        cfg.mode.looping = looping;
        cfg
    }

    #[test]
    fn test_auto_prev_runs_into_low_end() {
        let (mut engine, decoder) = engine(&["a", "b", "c"], auto_prev(false));

        let report = engine.tick();
        assert_eq!(report.outcome.index, Some(0));
        assert!(report.published);

        let report = engine.tick();
        assert_eq!(report.outcome.index, Some(0));
        assert!(report.outcome.is_terminal);
        assert!(report.end_of_sequence);
        assert_eq!(report.outcome.edge, Some(Edge::Low));
        assert!(!report.published);
        assert_eq!(decoder.count(PayloadKind::Xyz), 1);
        assert_eq!(engine.phase(), Phase::Terminal(Edge::Low));
    }

    #[test]
    fn test_auto_prev_wraps_when_looping() {
        let (mut engine, decoder) = engine(&["a", "b", "c"], auto_prev(true));
        engine.tick();

        let report = engine.tick();
        assert_eq!(report.outcome.index, Some(2));
        assert!(report.end_of_sequence);
        assert!(!report.outcome.is_terminal);
        assert_eq!(report.file.as_deref(), Some(Path::new("c")));
        assert!(report.published);

        assert_eq!(engine.tick().outcome.index, Some(1));
        assert_eq!(decoder.count(PayloadKind::Xyz), 3);
    }

    #[test]
    fn test_auto_next_and_auto_prev_cancel() {
        let mut cfg = auto_prev(false);
        cfg.mode.auto_next_cloud = true;
        let (mut engine, decoder) = engine(&["a", "b"], cfg);
        engine.tick();

        let report = engine.tick();
        assert_eq!(report.outcome.index, Some(0));
        assert!(report.outcome.is_repeat_of_previous);
        assert!(!report.end_of_sequence);
        assert!(matches!(report.result(PayloadKind::Xyz), Some(PayloadResult::Cached(_))));
        assert_eq!(decoder.count(PayloadKind::Xyz), 1);
    }

    #[test]
    fn test_next_and_prev_in_same_tick_is_a_repeat() {
        let (mut engine, decoder) = engine(&["a", "b", "c"], manual(&[PayloadKind::Xyz]));
        engine.tick();
        engine.on_next_requested();
        engine.on_prev_requested();
        let report = engine.tick();
        assert_eq!(report.outcome.index, Some(0));
        assert!(report.outcome.is_repeat_of_previous);
        assert_eq!(decoder.count(PayloadKind::Xyz), 1);
    }

    #[test]
    fn test_partial_failure_does_not_block_progress() {
        let kinds = [PayloadKind::Xyz, PayloadKind::XyzRgb];
        let (mut engine, decoder) = engine(&["a", "b"], config(&kinds));
        decoder.fail("a", PayloadKind::XyzRgb);

        let report = engine.tick();
        assert!(report.published);
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.file, PathBuf::from("a"));
        assert_eq!(failure.kind, PayloadKind::XyzRgb);
        assert_eq!(engine.navigator().previous_index(), Some(0));

        let report = engine.tick();
        assert_eq!(report.outcome.index, Some(1));
        assert!(report.result(PayloadKind::XyzRgb).unwrap().is_decoded());
        assert!(decoder.calls().contains(&(PathBuf::from("b"), PayloadKind::XyzRgb)));
    }

    #[test]
    fn test_failed_kind_is_retried_on_repeat_index() {
        let kinds = [PayloadKind::Xyz, PayloadKind::XyzRgb];
        let (mut engine, decoder) = engine(&["a", "b"], manual(&kinds));
        decoder.fail("a", PayloadKind::XyzRgb);
        engine.tick();

        decoder.heal();
        let report = engine.tick();
        assert!(matches!(report.result(PayloadKind::Xyz), Some(PayloadResult::Cached(_))));
        assert!(report.result(PayloadKind::XyzRgb).unwrap().is_decoded());
        assert_eq!(decoder.count(PayloadKind::Xyz), 1);
        assert_eq!(decoder.count(PayloadKind::XyzRgb), 2);
    }

    #[test]
    fn test_total_failure_keeps_bootstrapping_at_zero() {
        let (mut engine, decoder) = engine(&["a", "b"], config(&[PayloadKind::Xyz]));
        decoder.fail("a", PayloadKind::Xyz);

        for _ in 0..3 {
            let report = engine.tick();
            assert_eq!(report.outcome.index, Some(0));
            assert!(!report.published);
        }
        assert_eq!(engine.navigator().previous_index(), None);
        assert_eq!(engine.phase(), Phase::AwaitingFirstLoad);
        assert_eq!(decoder.count(PayloadKind::Xyz), 3);
    }

    #[test]
    fn test_empty_sequence_never_decodes() {
        let (mut engine, decoder) = engine(&[], config(&[PayloadKind::Xyz, PayloadKind::XyzSift]));
        engine.on_next_requested();
        engine.on_publish_requested();
        for _ in 0..3 {
            let report = engine.tick();
            assert!(report.outcome.is_terminal);
            assert!(report.outcome.empty_sequence);
            assert!(!report.end_of_sequence);
            assert!(!report.published);
        }
        assert!(decoder.calls().is_empty());
        assert_eq!(engine.phase(), Phase::Empty);
    }

    #[test]
    fn test_reload_wins_and_invalidates_cache() {
        let (mut engine, decoder) = engine(&["a", "b", "c"], config(&[PayloadKind::Xyz]));
        engine.tick();
        engine.tick();

        engine.on_reload_requested();
        engine.on_next_requested();
        engine.on_prev_requested();
        let report = engine.tick();
        assert!(report.outcome.fresh_load);
        assert_eq!(report.outcome.index, Some(0));
        assert!(report.result(PayloadKind::Xyz).unwrap().is_decoded());
        assert_eq!(decoder.count(PayloadKind::Xyz), 3);

        // Signals were consumed by the reload tick
        assert!(engine.pending().is_empty());
        assert_eq!(engine.tick().outcome.index, Some(1));
    }

    #[test]
    fn test_gate_closed_moves_cursor_without_decoding() {
        let mut cfg = config(&[PayloadKind::Xyz]);
        cfg.mode.auto_publish_cloud = false;
        let (mut engine, decoder) = engine(&["a", "b", "c"], cfg);

        // Load tick: gate closed, nothing decoded, nothing committed
        let report = engine.tick();
        assert!(!report.published);
        assert!(decoder.calls().is_empty());

        engine.on_publish_requested();
        let report = engine.tick();
        assert!(report.published);
        assert_eq!(report.outcome.index, Some(0));

        // Cursor advances on a closed tick
        let report = engine.tick();
        assert_eq!(report.outcome.index, Some(1));
        assert!(!report.published);

        // Next publish shows the then-current index
        engine.on_publish_requested();
        let report = engine.tick();
        assert_eq!(report.outcome.index, Some(2));
        assert!(report.published);
        assert_eq!(decoder.calls(), vec![(PathBuf::from("a"), PayloadKind::Xyz), (PathBuf::from("c"), PayloadKind::Xyz)]);
        assert_eq!(engine.gate().suppressed(), 2);
    }

    #[test]
    fn test_parallel_decode_matches_sequential() {
        let kinds = [PayloadKind::Xyz, PayloadKind::XyzRgb, PayloadKind::XyzSift];
        let mut cfg = config(&kinds);
        cfg.mode.parallel_decode = true;
        let (mut engine, decoder) = engine(&["a", "b"], cfg);
        decoder.fail("a", PayloadKind::XyzSift);

        let report = engine.tick();
        assert!(report.published);
        assert_eq!(report.per_kind.keys().copied().collect::<Vec<_>>(), kinds.to_vec());
        assert_eq!(report.payload(PayloadKind::XyzRgb).unwrap().len(), 2);
        assert!(report.result(PayloadKind::XyzSift).unwrap().failure().is_some());
        assert_eq!(decoder.calls().len(), 3);
        assert_eq!(engine.navigator().previous_index(), Some(0));
    }

    #[test]
    fn test_no_kinds_enabled_publishes_nothing() {
        let (mut engine, decoder) = engine(&["a", "b"], config(&[]));
        let report = engine.tick();
        assert!(report.per_kind.is_empty());
        assert!(!report.published);
        assert!(decoder.calls().is_empty());
    }

    #[test]
    fn test_set_config_reloads_on_source_change() {
        let (mut engine, _) = engine(&["a", "b", "c"], config(&[PayloadKind::Xyz]));
        engine.tick();
        engine.tick();

        let mut cfg = engine.config().clone();
        cfg.mode.looping = true;
        engine.set_config(cfg.clone());
        assert_eq!(engine.tick().outcome.index, Some(2));

        cfg.sequence.pattern = r".*\.dat".into();
        engine.set_config(cfg);
        let report = engine.tick();
        assert!(report.outcome.fresh_load);
        assert_eq!(report.outcome.index, Some(0));
    }

    #[test]
    fn test_bus_triggers_and_notifications() {
        let bus = EventBus::new();
        let mut cfg = manual(&[PayloadKind::Xyz]);
        cfg.mode.auto_publish_cloud = false;
        let decoder = Arc::new(FakeDecoder::default());
        let resolver = ListResolver(vec![PathBuf::from("a"), PathBuf::from("b")]);
        let mut engine = SequenceEngine::new(cfg, Box::new(resolver), Box::new(Arc::clone(&decoder)))
            .with_event_bus(bus.clone());

        bus.emit(PublishCloudEvent);
        engine.tick();
        bus.emit(NextCloudEvent);
        bus.emit(PublishCloudEvent);
        engine.tick();
        bus.emit(NextCloudEvent);
        engine.tick();

        let events = bus.poll();
        let published: Vec<usize> = events
            .iter()
            .filter_map(|e| downcast_event::<CloudPublishedEvent>(e))
            .map(|e| e.index)
            .collect();
        assert_eq!(published, vec![0, 1]);

        let eos: Vec<&EndOfSequenceEvent> = events
            .iter()
            .filter_map(|e| downcast_event::<EndOfSequenceEvent>(e))
            .collect();
        assert_eq!(eos.len(), 1);
        assert_eq!(eos[0].index, 1);
        assert!(!eos[0].wrapped);

        let reloaded = events
            .iter()
            .filter_map(|e| downcast_event::<SequenceReloadedEvent>(e))
            .next()
            .unwrap();
        assert_eq!(reloaded.file_count, 2);
    }
}
