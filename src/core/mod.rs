//! Sequence engine: navigation, per-kind cache, publish gate, triggers
//!
//! Independent of any host: triggers come in through [`SignalLatch`] or the
//! [`EventBus`], results go out as [`TickReport`]s and bus events.

pub mod cloud_cache;
pub mod engine;
pub mod event_bus;
pub mod events;
pub mod gate;
pub mod navigator;
pub mod signals;

pub use cloud_cache::{CacheStats, CloudCache};
pub use engine::{SequenceEngine, TickReport};
pub use event_bus::EventBus;
pub use gate::PublishGate;
pub use navigator::{Edge, Navigator, NavigatorState, Phase, StepOutcome};
pub use signals::{PendingSignals, SignalLatch};
