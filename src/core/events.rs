//! Sequence trigger and notification events.

use std::path::PathBuf;

use crate::entities::{DecodeFailure, Payload, PayloadKind};

// === Triggers (host -> engine) ===

#[derive(Clone, Debug)]
pub struct NextCloudEvent;

#[derive(Clone, Debug)]
pub struct PrevCloudEvent;

#[derive(Clone, Debug)]
pub struct PublishCloudEvent;

#[derive(Clone, Debug)]
pub struct ReloadSequenceEvent;

// === Notifications (engine -> host) ===

/// Index stepped past either end of the sequence
#[derive(Clone, Debug)]
pub struct EndOfSequenceEvent {
    /// Index after wrap/clamp
    pub index: usize,
    /// True if looping wrapped the index, false if it was clamped (terminal)
    pub wrapped: bool,
}

/// One cloud emitted by a tick
#[derive(Clone, Debug)]
pub struct CloudPublishedEvent {
    pub kind: PayloadKind,
    pub index: usize,
    pub file: PathBuf,
    pub payload: Payload,
    /// Served from cache instead of decoded
    pub from_cache: bool,
}

#[derive(Clone, Debug)]
pub struct DecodeFailedEvent(pub DecodeFailure);

/// File list is empty; nothing will be published until a reload finds files
#[derive(Clone, Debug)]
pub struct EmptySequenceEvent;

#[derive(Clone, Debug)]
pub struct SequenceReloadedEvent {
    pub file_count: usize,
}
