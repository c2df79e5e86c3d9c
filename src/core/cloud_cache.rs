//! Last-loaded cloud cache
//!
//! One slot per payload kind holding the most recent successful decode and
//! the index it came from. A repeat tick (same index as the last successful
//! load) re-emits the slot without calling the decoder; anything else decodes.
//! A failed decode leaves the slot untouched (stale), so the kind is retried
//! on every later tick until it succeeds.
//!
//! Slots are locked independently: the engine may resolve several kinds of
//! one tick in parallel.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::entities::traits::PayloadDecoder;
use crate::entities::{CacheEntry, DecodeError, DecodeFailure, PayloadKind, PayloadResult};

use super::navigator::StepOutcome;

/// Cache counters
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of decoder calls
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 { 0.0 } else { self.hits() as f64 / total as f64 }
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug)]
pub struct CloudCache {
    slots: IndexMap<PayloadKind, Mutex<Option<CacheEntry>>>,
    stats: CacheStats,
}

impl Default for CloudCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudCache {
    pub fn new() -> Self {
        Self {
            slots: PayloadKind::ALL.into_iter().map(|k| (k, Mutex::new(None))).collect(),
            stats: CacheStats::new(),
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Snapshot of the slot for `kind`
    pub fn entry(&self, kind: PayloadKind) -> Option<CacheEntry> {
        self.slots
            .get(&kind)
            .and_then(|slot| slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    /// Drop every cached payload (the file list changed)
    pub fn invalidate_all(&self) {
        for slot in self.slots.values() {
            *slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        }
        debug!("CloudCache invalidated");
    }

    /// Produce the payload of `kind` for this tick
    ///
    /// `file` is the sequence entry at `outcome.index`.
    pub fn resolve(
        &self,
        kind: PayloadKind,
        outcome: &StepOutcome,
        file: Option<&Path>,
        decoder: &dyn PayloadDecoder,
    ) -> PayloadResult {
        let (Some(index), Some(file)) = (outcome.publishable_index(), file) else {
            return PayloadResult::Skipped;
        };
        let Some(slot) = self.slots.get(&kind) else {
            return PayloadResult::Skipped;
        };

        if outcome.is_repeat_of_previous {
            let guard = slot.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(entry) = guard.as_ref().filter(|e| e.is_valid_for(index)) {
                self.stats.record_hit();
                debug!("Returning previous {} cloud", kind);
                return PayloadResult::Cached(entry.payload.clone());
            }
        }

        self.stats.record_miss();
        let decoded = decoder.decode(file, kind).and_then(|payload| {
            if payload.kind() == kind {
                Ok(payload)
            } else {
                Err(DecodeError::Unsupported(format!(
                    "decoder returned {} for {}",
                    payload.kind(),
                    kind
                )))
            }
        });

        match decoded {
            Ok(payload) => {
                info!(
                    "{} cloud of size {} loaded properly from {}",
                    kind,
                    payload.len(),
                    file.display()
                );
                *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(CacheEntry {
                    last_index: index,
                    payload: payload.clone(),
                });
                PayloadResult::Decoded(payload)
            }
            Err(e) => {
                self.stats.record_failure();
                let failure = DecodeFailure {
                    kind,
                    index,
                    file: file.to_path_buf(),
                    reason: e.to_string(),
                };
                warn!("{}", failure);
                PayloadResult::Failed(failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::cloud::{PointCloud, PointXyz, PointXyzRgb, PointXyzSift};
    use crate::entities::Payload;
    use std::collections::HashMap;

    /// Counts calls per kind; fails for kinds in `failing`
    #[derive(Default)]
    struct CountingDecoder {
        calls: Mutex<HashMap<PayloadKind, usize>>,
        failing: Vec<PayloadKind>,
    }

    impl CountingDecoder {
        fn calls(&self, kind: PayloadKind) -> usize {
            self.calls.lock().unwrap().get(&kind).copied().unwrap_or(0)
        }
    }

    impl PayloadDecoder for CountingDecoder {
        fn decode(&self, _file: &Path, kind: PayloadKind) -> Result<Payload, DecodeError> {
            *self.calls.lock().unwrap().entry(kind).or_default() += 1;
            if self.failing.contains(&kind) {
                return Err(DecodeError::MissingField("rgb"));
            }
            Ok(match kind {
                PayloadKind::Xyz => PointCloud::from_points(vec![PointXyz::default(); 2]).into(),
                PayloadKind::XyzRgb => PointCloud::from_points(vec![PointXyzRgb::default(); 2]).into(),
                PayloadKind::XyzSift => PointCloud::<PointXyzSift>::from_points(Vec::new()).into(),
            })
        }
    }

    fn at(index: usize, repeat: bool) -> StepOutcome {
        StepOutcome {
            index: Some(index),
            is_repeat_of_previous: repeat,
            ..Default::default()
        }
    }

    fn file() -> Option<&'static Path> {
        Some(Path::new("a.pcd"))
    }

    #[test]
    fn test_repeat_serves_same_handle_without_decoding() {
        let cache = CloudCache::new();
        let decoder = CountingDecoder::default();

        let first = cache.resolve(PayloadKind::Xyz, &at(0, false), file(), &decoder);
        let second = cache.resolve(PayloadKind::Xyz, &at(0, true), file(), &decoder);

        assert!(first.is_decoded());
        assert!(matches!(second, PayloadResult::Cached(_)));
        assert!(first.payload().unwrap().ptr_eq(second.payload().unwrap()));
        assert_eq!(decoder.calls(PayloadKind::Xyz), 1);
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
    }

    #[test]
    fn test_new_index_decodes() {
        let cache = CloudCache::new();
        let decoder = CountingDecoder::default();
        cache.resolve(PayloadKind::Xyz, &at(0, false), file(), &decoder);
        cache.resolve(PayloadKind::Xyz, &at(1, false), file(), &decoder);
        assert_eq!(decoder.calls(PayloadKind::Xyz), 2);
        assert_eq!(cache.entry(PayloadKind::Xyz).unwrap().last_index, 1);
    }

    #[test]
    fn test_terminal_and_empty_skip_decoder() {
        let cache = CloudCache::new();
        let decoder = CountingDecoder::default();
        let terminal = StepOutcome { is_terminal: true, ..at(3, false) };
        let empty = StepOutcome { index: None, is_terminal: true, empty_sequence: true, ..Default::default() };

        assert!(matches!(cache.resolve(PayloadKind::Xyz, &terminal, file(), &decoder), PayloadResult::Skipped));
        assert!(matches!(cache.resolve(PayloadKind::Xyz, &empty, None, &decoder), PayloadResult::Skipped));
        assert_eq!(decoder.calls(PayloadKind::Xyz), 0);
    }

    #[test]
    fn test_failure_keeps_stale_entry_and_retries() {
        let cache = CloudCache::new();
        let ok = CountingDecoder::default();
        cache.resolve(PayloadKind::XyzRgb, &at(0, false), file(), &ok);

        let failing = CountingDecoder {
            failing: vec![PayloadKind::XyzRgb],
            ..Default::default()
        };
        let result = cache.resolve(PayloadKind::XyzRgb, &at(1, false), file(), &failing);
        let failure = result.failure().unwrap();
        assert_eq!(failure.file, Path::new("a.pcd"));
        assert_eq!(failure.index, 1);

        // Stale entry survives, still tagged with the old index
        assert_eq!(cache.entry(PayloadKind::XyzRgb).unwrap().last_index, 0);

        // Repeat at index 1 has no valid entry -> decoder is called again
        cache.resolve(PayloadKind::XyzRgb, &at(1, true), file(), &failing);
        assert_eq!(failing.calls(PayloadKind::XyzRgb), 2);
        assert_eq!(cache.stats().failures(), 2);
    }

    #[test]
    fn test_kinds_are_independent() {
        let cache = CloudCache::new();
        let decoder = CountingDecoder {
            failing: vec![PayloadKind::XyzRgb],
            ..Default::default()
        };
        assert!(cache.resolve(PayloadKind::Xyz, &at(0, false), file(), &decoder).is_success());
        assert!(!cache.resolve(PayloadKind::XyzRgb, &at(0, false), file(), &decoder).is_success());
        assert!(cache.entry(PayloadKind::Xyz).is_some());
        assert!(cache.entry(PayloadKind::XyzRgb).is_none());
    }

    #[test]
    fn test_wrong_kind_from_decoder_is_failure() {
        struct Liar;
        impl PayloadDecoder for Liar {
            fn decode(&self, _file: &Path, _kind: PayloadKind) -> Result<Payload, DecodeError> {
                Ok(PointCloud::<PointXyz>::default().into())
            }
        }
        let cache = CloudCache::new();
        let result = cache.resolve(PayloadKind::XyzSift, &at(0, false), file(), &Liar);
        assert!(result.failure().is_some());
        assert!(cache.entry(PayloadKind::XyzSift).is_none());
    }

    #[test]
    fn test_invalidate_all() {
        let cache = CloudCache::new();
        let decoder = CountingDecoder::default();
        cache.resolve(PayloadKind::Xyz, &at(0, false), file(), &decoder);
        cache.invalidate_all();
        assert!(cache.entry(PayloadKind::Xyz).is_none());

        cache.resolve(PayloadKind::Xyz, &at(0, true), file(), &decoder);
        assert_eq!(decoder.calls(PayloadKind::Xyz), 2);
    }
}
