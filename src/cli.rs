use clap::Parser;
use std::path::PathBuf;

use crate::config::SequenceConfig;
use crate::entities::PayloadKind;

// Build version with decoder info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "PCD:    v0.7 ascii / binary / binary_compressed\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Point cloud file sequence player
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Directory holding the sequence (overrides config)
    #[arg(value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Regular expression matched against whole file names
    #[arg(short = 'p', long = "pattern", value_name = "REGEX")]
    pub pattern: Option<String>,

    /// Keep directory listing order instead of sorting
    #[arg(long = "no-sort")]
    pub no_sort: bool,

    /// Wrap around at both ends of the sequence
    #[arg(long = "loop")]
    pub looping: bool,

    /// Do not advance automatically (step with n/p in interactive mode)
    #[arg(long = "manual", conflicts_with = "reverse")]
    pub manual: bool,

    /// Advance backwards automatically
    #[arg(long = "reverse")]
    pub reverse: bool,

    /// Publish only on request (s in interactive mode)
    #[arg(long = "no-auto-publish")]
    pub no_auto_publish: bool,

    /// Publish PointXYZ clouds
    #[arg(long = "xyz")]
    pub xyz: bool,

    /// Publish PointXYZRGB clouds
    #[arg(long = "xyzrgb")]
    pub xyzrgb: bool,

    /// Publish PointXYZSIFT clouds
    #[arg(long = "xyzsift")]
    pub xyzsift: bool,

    /// Decode enabled kinds in parallel
    #[arg(long = "parallel")]
    pub parallel: bool,

    /// Ticks per second
    #[arg(long = "fps", value_name = "N", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub fps: u32,

    /// Stop after N ticks
    #[arg(long = "max-ticks", value_name = "N")]
    pub max_ticks: Option<u64>,

    /// Read commands from stdin: n(ext) p(rev) s(publish) r(eload) q(uit)
    #[arg(short = 'i', long = "interactive")]
    pub interactive: bool,

    /// Load configuration from this JSON file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Write the effective configuration to the config directory and continue
    #[arg(long = "save-config")]
    pub save_config: bool,

    /// Enable logging to file (default: cloudseq.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Args {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut SequenceConfig) {
        if let Some(dir) = &self.directory {
            config.sequence.directory = dir.clone();
        }
        if let Some(pattern) = &self.pattern {
            config.sequence.pattern = pattern.clone();
        }
        if self.no_sort {
            config.mode.sort = false;
        }
        if self.looping {
            config.mode.looping = true;
        }
        if self.manual {
            config.mode.auto_next_cloud = false;
            config.mode.auto_prev_cloud = false;
        }
        if self.reverse {
            config.mode.auto_next_cloud = false;
            config.mode.auto_prev_cloud = true;
        }
        if self.no_auto_publish {
            config.mode.auto_publish_cloud = false;
        }
        if self.parallel {
            config.mode.parallel_decode = true;
        }
        for (flag, kind) in [
            (self.xyz, PayloadKind::Xyz),
            (self.xyzrgb, PayloadKind::XyzRgb),
            (self.xyzsift, PayloadKind::XyzSift),
        ] {
            if flag {
                config.set_enabled(kind, true);
            }
        }
    }

    /// Log level from `-v` count
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
