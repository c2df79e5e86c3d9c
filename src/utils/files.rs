//! Sequence file discovery
//!
//! Lists the files of one directory whose names fully match a regular
//! expression (e.g. `.*\.(pcd)`). No recursion, no sorting: the navigator
//! decides the order.

use std::path::{Path, PathBuf};

use log::{debug, trace};
use regex::Regex;

use crate::entities::traits::{FileSetResolver, ResolveError};

/// Default [`FileSetResolver`] backed by `regex`
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexFileResolver;

impl RegexFileResolver {
    pub fn new() -> Self {
        Self
    }

    /// Compile `pattern` so that it must match the whole file name
    pub fn compile(pattern: &str) -> Result<Regex, ResolveError> {
        Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| ResolveError::Pattern {
            pattern: pattern.to_string(),
            source,
        })
    }
}

impl FileSetResolver for RegexFileResolver {
    fn resolve_files(&self, directory: &Path, pattern: &str) -> Result<Vec<PathBuf>, ResolveError> {
        let re = Self::compile(pattern)?;
        let entries = std::fs::read_dir(directory).map_err(|source| ResolveError::Directory {
            path: directory.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if re.is_match(name) {
                trace!("Matched {}", path.display());
                files.push(path);
            }
        }

        debug!(
            "Resolved {} file(s) matching '{}' in {}",
            files.len(),
            pattern,
            directory.display()
        );
        Ok(files)
    }
}
