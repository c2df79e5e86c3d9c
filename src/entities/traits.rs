//! Collaborator traits for dependency inversion.
//!
//! The engine in `core/` only sees these interfaces. Default implementations
//! live in [`entities::loader`](super::loader) (PCD decoding) and
//! [`utils::files`](crate::utils::files) (regex directory listing); tests and
//! hosts plug in their own.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::payload::{Payload, PayloadKind};

/// Cloud decoding errors. Always recoverable from the engine's point of view.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad header: {0}")]
    Header(String),
    #[error("missing field '{0}'")]
    MissingField(&'static str),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("data truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("parse error at point {point}: {msg}")]
    Parse { point: usize, msg: String },
    #[error("decompression failed: {0}")]
    Decompress(String),
}

/// File listing errors. The navigator reports them and continues with an empty list.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot read directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Lists the files of a sequence.
///
/// Output order is unspecified; the navigator sorts when configured to.
/// An empty result is not an error.
pub trait FileSetResolver: Send + Sync {
    fn resolve_files(&self, directory: &Path, pattern: &str) -> Result<Vec<PathBuf>, ResolveError>;
}

/// Decodes one file into one payload kind.
///
/// Must be callable from several threads at once: the engine may decode the
/// enabled kinds of a tick in parallel.
pub trait PayloadDecoder: Send + Sync {
    fn decode(&self, file: &Path, kind: PayloadKind) -> Result<Payload, DecodeError>;
}

/// Blanket impl: Arc<T> implements traits if T does
impl<T: FileSetResolver + ?Sized> FileSetResolver for Arc<T> {
    fn resolve_files(&self, directory: &Path, pattern: &str) -> Result<Vec<PathBuf>, ResolveError> {
        (**self).resolve_files(directory, pattern)
    }
}

impl<T: PayloadDecoder + ?Sized> PayloadDecoder for Arc<T> {
    fn decode(&self, file: &Path, kind: PayloadKind) -> Result<Payload, DecodeError> {
        (**self).decode(file, kind)
    }
}
