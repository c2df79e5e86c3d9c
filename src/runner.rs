//! Headless runner: drives a [`SequenceEngine`] at a fixed tick rate.
//!
//! Used by the CLI binary. Interactive mode reads single-letter commands from
//! stdin on a helper thread and forwards them over a channel; the main loop
//! turns them into trigger events on the bus.

use std::io::BufRead;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, select};
use log::{debug, info, trace, warn};

use crate::cli::Args;
use crate::config::SequenceConfig;
use crate::core::engine::{SequenceEngine, TickReport};
use crate::core::event_bus::{EventBus, downcast_event};
use crate::core::events::{
    CloudPublishedEvent, DecodeFailedEvent, EndOfSequenceEvent, NextCloudEvent, PrevCloudEvent, PublishCloudEvent,
    ReloadSequenceEvent, SequenceReloadedEvent,
};
use crate::paths::{self, PathConfig};

/// Interactive command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Publish,
    Reload,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "n" | "next" => Some(Self::Next),
            "p" | "prev" => Some(Self::Prev),
            "s" | "publish" => Some(Self::Publish),
            "r" | "reload" => Some(Self::Reload),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }

    /// Forward as a trigger event
    pub fn emit(self, bus: &EventBus) {
        match self {
            Self::Next => bus.emit(NextCloudEvent),
            Self::Prev => bus.emit(PrevCloudEvent),
            Self::Publish => bus.emit(PublishCloudEvent),
            Self::Reload => bus.emit(ReloadSequenceEvent),
            Self::Quit => {}
        }
    }
}

/// Read commands from stdin on a background thread
///
/// The channel disconnects when stdin closes or after `q`.
pub fn spawn_stdin_reader() -> Result<Receiver<Command>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match Command::parse(&line) {
                    Some(cmd) => {
                        if tx.send(cmd).is_err() || cmd == Command::Quit {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => warn!("Unknown command '{}' (n, p, s, r, q)", line.trim()),
                }
            }
            trace!("stdin reader finished");
        })
        .context("Failed to spawn stdin reader thread")?;
    Ok(rx)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Clamped at an end of a non-looping sequence
    EndOfSequence,
    EmptySequence,
    MaxTicks,
    /// `q` or stdin closed
    Quit,
}

#[derive(Debug, Clone, Copy)]
pub struct LoopOptions {
    pub interval: Duration,
    pub max_ticks: Option<u64>,
    /// Stop on a terminal end-of-sequence or empty tick
    pub stop_at_end: bool,
}

impl LoopOptions {
    pub fn from_args(args: &Args) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / f64::from(args.fps.max(1))),
            max_ticks: args.max_ticks,
            stop_at_end: !args.interactive,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub ticks: u64,
    /// Clouds emitted, counting each kind separately
    pub published: u64,
    pub failures: u64,
    pub end_of_sequence: u64,
    pub stop: Option<StopReason>,
}

/// Tick until a stop condition; `commands` may be `crossbeam_channel::never()`
pub fn run_loop(
    engine: &mut SequenceEngine,
    bus: &EventBus,
    commands: &Receiver<Command>,
    opts: &LoopOptions,
) -> RunSummary {
    let ticker = crossbeam_channel::tick(opts.interval);
    let mut summary = RunSummary::default();

    loop {
        select! {
            recv(commands) -> cmd => match cmd {
                Ok(Command::Quit) | Err(_) => {
                    summary.stop = Some(StopReason::Quit);
                    break;
                }
                Ok(cmd) => {
                    debug!("Command: {:?}", cmd);
                    cmd.emit(bus);
                }
            },
            recv(ticker) -> _ => {
                let report = engine.tick();
                summary.ticks += 1;
                drain_events(bus, &mut summary);
                if let Some(reason) = stop_reason(&report, summary.ticks, opts) {
                    summary.stop = Some(reason);
                    break;
                }
            }
        }
    }
    summary
}

fn stop_reason(report: &TickReport, ticks: u64, opts: &LoopOptions) -> Option<StopReason> {
    if opts.stop_at_end {
        if report.outcome.empty_sequence {
            return Some(StopReason::EmptySequence);
        }
        if report.end_of_sequence && report.outcome.is_terminal {
            return Some(StopReason::EndOfSequence);
        }
    }
    match opts.max_ticks {
        Some(max) if ticks >= max => Some(StopReason::MaxTicks),
        _ => None,
    }
}

/// Log and count engine notifications queued since the last call
fn drain_events(bus: &EventBus, summary: &mut RunSummary) {
    for event in bus.poll() {
        if let Some(e) = downcast_event::<CloudPublishedEvent>(&event) {
            summary.published += 1;
            info!(
                "[{}] {} cloud: {} points{} ({})",
                e.index,
                e.kind,
                e.payload.len(),
                if e.from_cache { " (cached)" } else { "" },
                e.file.display()
            );
        } else if let Some(e) = downcast_event::<DecodeFailedEvent>(&event) {
            summary.failures += 1;
            debug!("Decode failed at {}: {}", e.0.index, e.0.reason);
        } else if let Some(e) = downcast_event::<EndOfSequenceEvent>(&event) {
            summary.end_of_sequence += 1;
            debug!("End of sequence at {} (wrapped: {})", e.index, e.wrapped);
        } else if let Some(e) = downcast_event::<SequenceReloadedEvent>(&event) {
            info!("Sequence reloaded: {} file(s)", e.file_count);
        }
    }
}

/// Resolve the configuration: config file (if any), then command-line overrides
pub fn load_config(args: &Args, path_config: &PathConfig) -> Result<SequenceConfig> {
    let mut config = match paths::find_config(args.config.as_deref(), path_config) {
        Some(file) => {
            info!("Config: {}", file.display());
            SequenceConfig::load(&file)?
        }
        None => {
            debug!("No config file, using defaults");
            SequenceConfig::default()
        }
    };
    args.apply(&mut config);
    Ok(config)
}

/// Run the sequence player with parsed arguments
pub fn run_app(args: Args) -> Result<RunSummary> {
    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());
    trace!("Command-line args: {:?}", args);

    let config = load_config(&args, &path_config)?;

    if args.save_config {
        let file = paths::config_file(paths::CONFIG_FILE, &path_config);
        paths::ensure_parent(&file)?;
        config.save(&file)?;
        info!("Saved config to {}", file.display());
    }

    if config.enabled_kinds().is_empty() {
        warn!("No cloud kind enabled (--xyz, --xyzrgb, --xyzsift): nothing will be published");
    }

    let bus = EventBus::new();
    let mut engine = SequenceEngine::with_defaults(config).with_event_bus(bus.clone());

    let commands = if args.interactive {
        spawn_stdin_reader()?
    } else {
        crossbeam_channel::never()
    };

    let summary = run_loop(&mut engine, &bus, &commands, &LoopOptions::from_args(&args));
    info!(
        "Stopped ({:?}) after {} ticks: {} clouds published, {} decode failures, cache hit rate {:.0}%",
        summary.stop,
        summary.ticks,
        summary.published,
        summary.failures,
        engine.cache().stats().hit_rate() * 100.0
    );
    Ok(summary)
}
