//! Sequence navigator: file list ownership and index arithmetic
//!
//! One call to [`Navigator::resolve_step`] per tick. Precedence:
//!
//! 1. **Reload** - re-list files, optionally sort, index = 0. Next/prev are ignored.
//! 2. **Bootstrap** - nothing loaded yet: index = 0, no stepping.
//! 3. **Step** - `+1` for auto-next or next trigger, `-1` for auto-prev or prev
//!    trigger. Both may apply in one tick and cancel out.
//! 4. **Bounds** - stepping past either end fires end-of-sequence, then wraps
//!    (loop) or clamps and marks the tick terminal (no cloud published).
//!
//! An empty file list makes every tick terminal without an index.

use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::config::{NavConfig, SourceConfig};
use crate::entities::traits::FileSetResolver;

use super::signals::PendingSignals;

/// Which end of the sequence was hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Low,
    High,
}

/// Coarse engine state, for hosts and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No cloud has been loaded successfully yet
    AwaitingFirstLoad,
    Navigating,
    /// Clamped at an end of a non-looping sequence
    Terminal(Edge),
    /// File list is empty
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigatorState {
    /// Always within `[0, len-1]` after a step, unless the list is empty
    pub current_index: i64,
    /// `None` until the first successful load
    pub previous_index: Option<usize>,
    pub reload_pending: bool,
}

impl Default for NavigatorState {
    fn default() -> Self {
        Self {
            current_index: 0,
            previous_index: None,
            reload_pending: true,
        }
    }
}

/// Result of one navigation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepOutcome {
    /// `None` only for an empty sequence
    pub index: Option<usize>,
    /// Nothing may be published this tick
    pub is_terminal: bool,
    pub end_of_sequence_fired: bool,
    /// Which end was hit, if any
    pub edge: Option<Edge>,
    /// Index equals the last successfully loaded one (and no reload happened)
    pub is_repeat_of_previous: bool,
    /// The file list was re-resolved this tick
    pub fresh_load: bool,
    pub empty_sequence: bool,
}

impl StepOutcome {
    /// Index to publish, if the tick may publish at all
    pub fn publishable_index(&self) -> Option<usize> {
        if self.is_terminal { None } else { self.index }
    }
}

/// Owns the ordered file list and navigation state
pub struct Navigator {
    resolver: Box<dyn FileSetResolver>,
    files: Vec<PathBuf>,
    state: NavigatorState,
    phase: Phase,
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("files", &self.files.len())
            .field("state", &self.state)
            .field("phase", &self.phase)
            .finish()
    }
}

impl Navigator {
    /// New navigator; the first step performs the initial load
    pub fn new(resolver: Box<dyn FileSetResolver>) -> Self {
        Self {
            resolver,
            files: Vec::new(),
            state: NavigatorState::default(),
            phase: Phase::AwaitingFirstLoad,
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn file(&self, index: usize) -> Option<&Path> {
        self.files.get(index).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn state(&self) -> NavigatorState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current index, `None` if there is no valid one
    pub fn current_index(&self) -> Option<usize> {
        if self.files.is_empty() {
            None
        } else {
            Some(self.state.current_index as usize)
        }
    }

    pub fn previous_index(&self) -> Option<usize> {
        self.state.previous_index
    }

    /// Re-resolve the file list on the next step
    pub fn request_reload(&mut self) {
        self.state.reload_pending = true;
    }

    /// Record that at least one kind loaded successfully at `index`
    pub fn commit(&mut self, index: usize) {
        self.state.previous_index = Some(index);
        if self.phase == Phase::AwaitingFirstLoad {
            self.phase = Phase::Navigating;
        }
    }

    /// Apply one tick of signals and mode flags to the index
    pub fn resolve_step(&mut self, signals: &PendingSignals, nav: &NavConfig, source: &SourceConfig) -> StepOutcome {
        if signals.reload_requested {
            self.state.reload_pending = true;
        }

        debug!(
            "Before: index={} previous_index={:?}",
            self.state.current_index, self.state.previous_index
        );

        let mut outcome = StepOutcome::default();

        if self.state.reload_pending {
            self.reload(source);
            outcome.fresh_load = true;
        } else if self.state.previous_index.is_none() {
            // First load never applies a step
            self.state.current_index = 0;
        } else if !self.files.is_empty() {
            let mut index = self.state.current_index;
            if nav.auto_advance_next || signals.next_requested {
                index += 1;
            }
            if nav.auto_advance_prev || signals.prev_requested {
                index -= 1;
            }

            let last = self.files.len() as i64 - 1;
            if index < 0 {
                outcome.end_of_sequence_fired = true;
                outcome.edge = Some(Edge::Low);
                if nav.looping {
                    index = last;
                    info!("Sequence loop");
                } else {
                    index = 0;
                    outcome.is_terminal = true;
                    info!("End of sequence");
                }
            }
            if index > last {
                outcome.end_of_sequence_fired = true;
                outcome.edge = Some(Edge::High);
                if nav.looping {
                    index = 0;
                    info!("Sequence loop");
                } else {
                    index = last;
                    outcome.is_terminal = true;
                    info!("End of sequence");
                }
            }
            self.state.current_index = index;
        }

        if self.files.is_empty() {
            outcome.index = None;
            outcome.is_terminal = true;
            outcome.empty_sequence = true;
            self.phase = Phase::Empty;
            warn!("Empty sequence!");
            return outcome;
        }

        let index = self.state.current_index as usize;
        outcome.index = Some(index);
        outcome.is_repeat_of_previous = !outcome.fresh_load && self.state.previous_index == Some(index);

        self.phase = match (outcome.is_terminal, outcome.edge) {
            (true, Some(edge)) => Phase::Terminal(edge),
            _ if self.state.previous_index.is_none() => Phase::AwaitingFirstLoad,
            _ => Phase::Navigating,
        };

        debug!(
            "After: index={} previous_index={:?} terminal={}",
            index, self.state.previous_index, outcome.is_terminal
        );
        outcome
    }

    fn reload(&mut self, source: &SourceConfig) {
        let mut files = match self.resolver.resolve_files(&source.directory, &source.pattern) {
            Ok(files) => files,
            Err(e) => {
                error!("Cannot resolve sequence files: {}", e);
                Vec::new()
            }
        };
        if source.sort {
            files.sort();
        }

        if files.is_empty() {
            error!(
                "There are no files matching the regular expression {} in {}",
                source.pattern,
                source.directory.display()
            );
        } else {
            info!("Sequence loaded: {} file(s)", files.len());
            for f in &files {
                debug!("  {}", f.display());
            }
        }

        self.files = files;
        self.state.current_index = 0;
        self.state.reload_pending = false;
    }
}
