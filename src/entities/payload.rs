//! Payload kinds, decoded payload handles and per-kind tick results.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::cloud::{PointCloud, PointXyz, PointXyzRgb, PointXyzSift};

/// Decoded-data variant the engine can be asked to produce per file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    /// Geometry only
    Xyz,
    /// Geometry + colour
    XyzRgb,
    /// Geometry + SIFT descriptor
    XyzSift,
}

impl PayloadKind {
    pub const ALL: [PayloadKind; 3] = [PayloadKind::Xyz, PayloadKind::XyzRgb, PayloadKind::XyzSift];

    pub fn name(&self) -> &'static str {
        match self {
            PayloadKind::Xyz => "PointXYZ",
            PayloadKind::XyzRgb => "PointXYZRGB",
            PayloadKind::XyzSift => "PointXYZSIFT",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable shared handle to a decoded cloud
///
/// Cloning is cheap (one `Arc` bump). Receivers that need to modify a cloud
/// go through [`Arc::make_mut`] on their own copy.
#[derive(Debug, Clone)]
pub enum Payload {
    Xyz(Arc<PointCloud<PointXyz>>),
    XyzRgb(Arc<PointCloud<PointXyzRgb>>),
    XyzSift(Arc<PointCloud<PointXyzSift>>),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Xyz(_) => PayloadKind::Xyz,
            Payload::XyzRgb(_) => PayloadKind::XyzRgb,
            Payload::XyzSift(_) => PayloadKind::XyzSift,
        }
    }

    /// Number of points in the cloud
    pub fn len(&self) -> usize {
        match self {
            Payload::Xyz(c) => c.len(),
            Payload::XyzRgb(c) => c.len(),
            Payload::XyzSift(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if both handles point at the same decoded cloud
    pub fn ptr_eq(&self, other: &Payload) -> bool {
        match (self, other) {
            (Payload::Xyz(a), Payload::Xyz(b)) => Arc::ptr_eq(a, b),
            (Payload::XyzRgb(a), Payload::XyzRgb(b)) => Arc::ptr_eq(a, b),
            (Payload::XyzSift(a), Payload::XyzSift(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_xyz(&self) -> Option<&Arc<PointCloud<PointXyz>>> {
        match self {
            Payload::Xyz(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_xyzrgb(&self) -> Option<&Arc<PointCloud<PointXyzRgb>>> {
        match self {
            Payload::XyzRgb(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_xyzsift(&self) -> Option<&Arc<PointCloud<PointXyzSift>>> {
        match self {
            Payload::XyzSift(c) => Some(c),
            _ => None,
        }
    }
}

impl From<PointCloud<PointXyz>> for Payload {
    fn from(cloud: PointCloud<PointXyz>) -> Self {
        Payload::Xyz(Arc::new(cloud))
    }
}

impl From<PointCloud<PointXyzRgb>> for Payload {
    fn from(cloud: PointCloud<PointXyzRgb>) -> Self {
        Payload::XyzRgb(Arc::new(cloud))
    }
}

impl From<PointCloud<PointXyzSift>> for Payload {
    fn from(cloud: PointCloud<PointXyzSift>) -> Self {
        Payload::XyzSift(Arc::new(cloud))
    }
}

/// Last successfully decoded payload of one kind
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Sequence index the payload was decoded from
    pub last_index: usize,
    pub payload: Payload,
}

impl CacheEntry {
    /// Entry may be re-emitted only while it matches the current index
    pub fn is_valid_for(&self, index: usize) -> bool {
        self.last_index == index
    }
}

/// Recoverable decode failure for one file/kind
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeFailure {
    pub kind: PayloadKind,
    pub index: usize,
    pub file: PathBuf,
    pub reason: String,
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot read {} cloud from {}: {}",
            self.kind,
            self.file.display(),
            self.reason
        )
    }
}

/// Outcome of one kind in one tick
#[derive(Debug, Clone)]
pub enum PayloadResult {
    /// Freshly decoded from disk
    Decoded(Payload),
    /// Served from the cache without touching the decoder
    Cached(Payload),
    /// Nothing to emit this tick (terminal, empty sequence, or publish suppressed)
    Skipped,
    Failed(DecodeFailure),
}

impl PayloadResult {
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            PayloadResult::Decoded(p) | PayloadResult::Cached(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.payload().is_some()
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self, PayloadResult::Decoded(_))
    }

    pub fn failure(&self) -> Option<&DecodeFailure> {
        match self {
            PayloadResult::Failed(f) => Some(f),
            _ => None,
        }
    }
}
