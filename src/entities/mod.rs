//! Entities: point clouds, payload handles, decoders and collaborator traits

pub mod cloud;
pub mod loader;
pub mod lzf;
pub mod payload;
pub mod traits;

pub use cloud::{PointCloud, PointXyz, PointXyzRgb, PointXyzSift};
pub use loader::{PcdHeader, PcdLoader};
pub use payload::{CacheEntry, DecodeFailure, Payload, PayloadKind, PayloadResult};
pub use traits::{DecodeError, FileSetResolver, PayloadDecoder, ResolveError};
