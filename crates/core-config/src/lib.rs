//! Configuration loading and parsing for `practica.toml`.
//!
//! Scope: `[executor]` (endpoint URL plus the fixed language/version
//! identifier sent with every run) and `[index]` (rows per index page).
//! Unknown fields are ignored so the file can grow without warnings, and a
//! file that fails to parse falls back to defaults rather than aborting
//! startup — a viewer with a broken config is still a viewer.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutorConfig {
    #[serde(default = "ExecutorConfig::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "ExecutorConfig::default_language")]
    pub language: String,
    #[serde(default = "ExecutorConfig::default_version")]
    pub version: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            language: Self::default_language(),
            version: Self::default_version(),
        }
    }
}

impl ExecutorConfig {
    fn default_endpoint() -> String {
        "https://emkc.org/api/v2/piston/execute".to_string()
    }
    fn default_language() -> String {
        "python".to_string()
    }
    fn default_version() -> String {
        "3.10.0".to_string()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "IndexConfig::default_items_per_page")]
    pub items_per_page: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            items_per_page: Self::default_items_per_page(),
        }
    }
}

impl IndexConfig {
    const fn default_items_per_page() -> usize {
        25
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Original file contents, when a file was read.
    pub raw: Option<String>,
    pub file: ConfigFile,
    /// Clamped rows-per-page actually used by the index view.
    pub effective_items_per_page: usize,
}

/// Best-effort config path: local working directory first, then the
/// platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("practica.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("practica").join("practica.toml");
    }
    PathBuf::from("practica.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let mut config = if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => Config {
                raw: Some(content),
                file,
                effective_items_per_page: 0,
            },
            Err(e) => {
                warn!(target: "config", file = %path.display(), %e, "config_parse_failed_using_defaults");
                Config::default()
            }
        }
    } else {
        Config::default()
    };
    config.apply();
    Ok(config)
}

impl Config {
    /// Clamp parsed values into usable ranges. A zero rows-per-page would
    /// make every index slice empty; floor it at 1.
    pub fn apply(&mut self) -> usize {
        let raw = self.file.index.items_per_page;
        let clamped = raw.max(1);
        if clamped != raw {
            info!(target: "config", raw, clamped, "items_per_page_clamped");
        }
        self.effective_items_per_page = clamped;
        clamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_when_file_missing() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_practica__.toml"))).unwrap();
        assert_eq!(cfg.file.executor.language, "python");
        assert_eq!(cfg.file.executor.version, "3.10.0");
        assert!(cfg.file.executor.endpoint.contains("piston"));
        assert_eq!(cfg.effective_items_per_page, 25);
        assert!(cfg.raw.is_none());
    }

    #[test]
    fn parses_executor_and_index_sections() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[executor]\nendpoint = \"http://localhost:2000/execute\"\nversion = \"3.12.0\"\n[index]\nitems_per_page = 10\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.executor.endpoint, "http://localhost:2000/execute");
        assert_eq!(cfg.file.executor.version, "3.12.0");
        assert_eq!(cfg.file.executor.language, "python", "unset field keeps default");
        assert_eq!(cfg.effective_items_per_page, 10);
    }

    #[test]
    fn zero_items_per_page_is_clamped_to_one() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[index]\nitems_per_page = 0\n").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.effective_items_per_page, 1);
    }

    #[test]
    fn parse_failure_falls_back_to_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[executor\nnot toml at all").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.executor.language, "python");
        assert_eq!(cfg.effective_items_per_page, 25);
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[executor]\nlanguage = \"python\"\nfuture_knob = true\n[paper]\nsize = \"a4\"\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.executor.language, "python");
    }
}
