//! Configuration and data file locations.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default config file name
pub const CONFIG_FILE: &str = "cloudseq.json";

/// Default log file name (used by `--log` without a value)
pub const LOG_FILE: &str = "cloudseq.log";

/// Overrides for default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI args → ENV var (CLOUDSEQ_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var("CLOUDSEQ_CONFIG_DIR").ok().map(PathBuf::from));
        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. Custom directory (CLI or CLOUDSEQ_CONFIG_DIR)
/// 2. Current directory IF it already holds cloudseq files
/// 3. Platform config directory from dirs-next (`~/.config/cloudseq` on Linux)
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    base_dir(config, dirs_next::config_dir).join(name)
}

/// Get path to a data file (logs). Same priority as [`config_file`], platform data dir last.
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    base_dir(config, dirs_next::data_dir).join(name)
}

/// Pick the config file to load: an explicit `--config` file wins,
/// otherwise the default location is used if a file exists there.
pub fn find_config(explicit: Option<&Path>, config: &PathConfig) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let default = config_file(CONFIG_FILE, config);
    default.is_file().then_some(default)
}

/// Create the directory holding `file` if missing
pub fn ensure_parent(file: &Path) -> Result<()> {
    if let Some(dir) = file.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
    }
    Ok(())
}

fn has_local_files(dir: &Path) -> bool {
    [CONFIG_FILE, LOG_FILE].iter().any(|f| dir.join(f).exists())
}

fn base_dir(config: &PathConfig, platform: fn() -> Option<PathBuf>) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }

    if let Ok(current_dir) = std::env::current_dir() {
        if has_local_files(&current_dir) {
            return current_dir;
        }
    }

    if let Some(dir) = platform() {
        return dir.join("cloudseq");
    }

    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_with_custom_dir() {
        let config = PathConfig {
            config_dir: Some(PathBuf::from("/custom")),
        };
        assert_eq!(config_file("test.json", &config), PathBuf::from("/custom/test.json"));
        assert_eq!(data_file(LOG_FILE, &config), PathBuf::from("/custom/cloudseq.log"));
    }

    #[test]
    fn test_find_config_prefers_explicit() {
        let config = PathConfig {
            config_dir: Some(PathBuf::from("/does/not/exist")),
        };
        let explicit = PathBuf::from("/tmp/other.json");
        assert_eq!(find_config(Some(&explicit), &config), Some(explicit));
        assert_eq!(find_config(None, &config), None);
    }

    #[test]
    fn test_find_config_in_custom_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{}").unwrap();
        let config = PathConfig {
            config_dir: Some(dir.path().to_path_buf()),
        };
        assert_eq!(find_config(None, &config), Some(dir.path().join(CONFIG_FILE)));
    }

    #[test]
    fn test_ensure_parent_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a/b/cloudseq.log");
        ensure_parent(&file).unwrap();
        assert!(dir.path().join("a/b").is_dir());
    }
}
