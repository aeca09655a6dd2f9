use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings of one discovery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub scan_registry: bool,
    pub scan_drives: bool,
    pub scan_steam: bool,
    /// Uninstaller cache file; no cache when unset
    pub cache_path: Option<PathBuf>,
    /// Helper tool that talks to the Steam client
    pub steam_helper_path: Option<PathBuf>,
    /// Roots searched by the directory collector; platform defaults when empty
    pub program_directories: Vec<PathBuf>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            scan_registry: true,
            scan_drives: true,
            scan_steam: true,
            cache_path: None,
            steam_helper_path: None,
            program_directories: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&content)
            .context(format!("Failed to parse config file: {:?}", path))
    }

    pub fn with_registry(mut self, enabled: bool) -> Self {
        self.scan_registry = enabled;
        self
    }

    pub fn with_drives(mut self, enabled: bool) -> Self {
        self.scan_drives = enabled;
        self
    }

    pub fn with_steam(mut self, enabled: bool) -> Self {
        self.scan_steam = enabled;
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn with_steam_helper(mut self, path: impl Into<PathBuf>) -> Self {
        self.steam_helper_path = Some(path.into());
        self
    }

    pub fn with_program_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.program_directories.push(path.into());
        self
    }
}
