//! Publish gate: decides whether a tick may emit clouds.
//!
//! With auto-publish on, every publishable tick emits. Otherwise a tick emits
//! only if a publish trigger arrived since the last decision. The trigger is
//! consumed by the decision either way.

use log::trace;

use crate::config::PublishConfig;

use super::signals::PendingSignals;

#[derive(Debug, Clone, Default)]
pub struct PublishGate {
    published: u64,
    suppressed: u64,
}

impl PublishGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide, draining `signals.publish_requested`
    pub fn should_publish(&mut self, config: &PublishConfig, signals: &mut PendingSignals) -> bool {
        let requested = std::mem::take(&mut signals.publish_requested);
        let open = config.auto_publish || requested;
        if open {
            self.published += 1;
        } else {
            self.suppressed += 1;
            trace!("Publish suppressed (no trigger, auto-publish off)");
        }
        open
    }

    /// Ticks the gate let through
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Ticks held back for lack of a trigger
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_publish_always_opens() {
        let mut gate = PublishGate::new();
        let mut signals = PendingSignals::default();
        assert!(gate.should_publish(&PublishConfig { auto_publish: true }, &mut signals));
        assert!(gate.should_publish(&PublishConfig { auto_publish: true }, &mut signals));
        assert_eq!(gate.published(), 2);
    }

    #[test]
    fn test_manual_needs_trigger_and_drains_it() {
        let mut gate = PublishGate::new();
        let cfg = PublishConfig { auto_publish: false };

        let mut signals = PendingSignals::default();
        assert!(!gate.should_publish(&cfg, &mut signals));

        signals.publish_requested = true;
        assert!(gate.should_publish(&cfg, &mut signals));
        assert!(!signals.publish_requested);
        assert!(!gate.should_publish(&cfg, &mut signals));

        assert_eq!(gate.published(), 1);
        assert_eq!(gate.suppressed(), 2);
    }

    #[test]
    fn test_trigger_drained_even_with_auto_publish() {
        let mut gate = PublishGate::new();
        let mut signals = PendingSignals {
            publish_requested: true,
            ..Default::default()
        };
        assert!(gate.should_publish(&PublishConfig { auto_publish: true }, &mut signals));
        assert!(!signals.publish_requested);
    }
}
