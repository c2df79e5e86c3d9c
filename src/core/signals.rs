//! Pending trigger signals
//!
//! External triggers (GUI buttons, upstream components, bus events) only set
//! flags here. The engine drains all flags at once at the start of a tick, so a
//! trigger is observed by exactly one tick and never mid-tick.

use std::sync::{Arc, Mutex};

use log::trace;

use super::event_bus::EventBus;
use super::events::{NextCloudEvent, PrevCloudEvent, PublishCloudEvent, ReloadSequenceEvent};

/// Snapshot of triggers received since the previous tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingSignals {
    pub next_requested: bool,
    pub prev_requested: bool,
    pub publish_requested: bool,
    pub reload_requested: bool,
}

impl PendingSignals {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Shared, cloneable setter handle for [`PendingSignals`]
///
/// Setters are idempotent: two `request_next()` calls before a tick still
/// advance by one.
#[derive(Debug, Clone, Default)]
pub struct SignalLatch {
    inner: Arc<Mutex<PendingSignals>>,
}

impl SignalLatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, f: impl FnOnce(&mut PendingSignals)) {
        let mut signals = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut signals);
    }

    pub fn request_next(&self) {
        trace!("Next cloud requested");
        self.set(|s| s.next_requested = true);
    }

    pub fn request_prev(&self) {
        trace!("Previous cloud requested");
        self.set(|s| s.prev_requested = true);
    }

    pub fn request_publish(&self) {
        trace!("Publish requested");
        self.set(|s| s.publish_requested = true);
    }

    pub fn request_reload(&self) {
        trace!("Sequence reload requested");
        self.set(|s| s.reload_requested = true);
    }

    /// Take all pending flags, leaving them cleared
    pub fn drain(&self) -> PendingSignals {
        let mut signals = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *signals)
    }

    /// Current flags without clearing them
    pub fn peek(&self) -> PendingSignals {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Route the four trigger events of `bus` into this latch
    pub fn connect(&self, bus: &EventBus) {
        let latch = self.clone();
        bus.subscribe::<NextCloudEvent, _>(move |_| latch.request_next());
        let latch = self.clone();
        bus.subscribe::<PrevCloudEvent, _>(move |_| latch.request_prev());
        let latch = self.clone();
        bus.subscribe::<PublishCloudEvent, _>(move |_| latch.request_publish());
        let latch = self.clone();
        bus.subscribe::<ReloadSequenceEvent, _>(move |_| latch.request_reload());
    }
}
