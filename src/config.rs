//! Sequence configuration
//!
//! Persisted as JSON (`cloudseq.json`). Every key is optional; missing keys
//! take the defaults below.
//!
//! ```json
//! {
//!   "sequence": { "directory": ".", "pattern": ".*\\.(pcd)" },
//!   "mode": { "sort": true, "loop": false, "auto_publish_cloud": true,
//!             "auto_next_cloud": true, "auto_prev_cloud": false, "parallel_decode": false },
//!   "cloud": { "xyz": false, "xyzrgb": false, "xyzsift": false }
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::entities::PayloadKind;

/// Where the sequence lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    pub directory: PathBuf,
    /// Regular expression matched against whole file names
    pub pattern: String,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            pattern: r".*\.(pcd)".to_string(),
        }
    }
}

/// Navigation and publishing modes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeSection {
    pub sort: bool,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub auto_publish_cloud: bool,
    pub auto_next_cloud: bool,
    pub auto_prev_cloud: bool,
    /// Decode the enabled kinds of one tick on the rayon pool
    pub parallel_decode: bool,
}

impl Default for ModeSection {
    fn default() -> Self {
        Self {
            sort: true,
            looping: false,
            auto_publish_cloud: true,
            auto_next_cloud: true,
            auto_prev_cloud: false,
            parallel_decode: false,
        }
    }
}

/// Which payload kinds to decode and publish
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSection {
    pub xyz: bool,
    pub xyzrgb: bool,
    pub xyzsift: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub sequence: SourceSection,
    pub mode: ModeSection,
    pub cloud: CloudSection,
}

/// Inputs to file list resolution
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub directory: PathBuf,
    pub pattern: String,
    pub sort: bool,
}

/// Per-tick navigation flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavConfig {
    pub auto_advance_next: bool,
    pub auto_advance_prev: bool,
    pub looping: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishConfig {
    pub auto_publish: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self { auto_publish: true }
    }
}

impl SequenceConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Write as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn source(&self) -> SourceConfig {
        SourceConfig {
            directory: self.sequence.directory.clone(),
            pattern: self.sequence.pattern.clone(),
            sort: self.mode.sort,
        }
    }

    pub fn nav(&self) -> NavConfig {
        NavConfig {
            auto_advance_next: self.mode.auto_next_cloud,
            auto_advance_prev: self.mode.auto_prev_cloud,
            looping: self.mode.looping,
        }
    }

    pub fn publish(&self) -> PublishConfig {
        PublishConfig {
            auto_publish: self.mode.auto_publish_cloud,
        }
    }

    pub fn is_enabled(&self, kind: PayloadKind) -> bool {
        match kind {
            PayloadKind::Xyz => self.cloud.xyz,
            PayloadKind::XyzRgb => self.cloud.xyzrgb,
            PayloadKind::XyzSift => self.cloud.xyzsift,
        }
    }

    pub fn set_enabled(&mut self, kind: PayloadKind, enabled: bool) {
        match kind {
            PayloadKind::Xyz => self.cloud.xyz = enabled,
            PayloadKind::XyzRgb => self.cloud.xyzrgb = enabled,
            PayloadKind::XyzSift => self.cloud.xyzsift = enabled,
        }
    }

    /// Enabled kinds in declaration order
    pub fn enabled_kinds(&self) -> Vec<PayloadKind> {
        PayloadKind::ALL
            .into_iter()
            .filter(|k| self.is_enabled(*k))
            .collect()
    }
}
