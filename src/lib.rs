//! cloudseq - point cloud file sequence engine
//!
//! Walks a directory of PCD files one tick at a time and publishes the
//! current cloud in each enabled point format.

// Core engine (navigator, cache, gate, events)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod entities;
pub mod paths;
pub mod runner;
pub mod utils;

// Re-export commonly used types
pub use config::SequenceConfig;
pub use core::engine::{SequenceEngine, TickReport};
pub use core::event_bus::{downcast_event, BoxedEvent, EventBus};
pub use entities::{Payload, PayloadKind, PayloadResult, PcdLoader};
