//! Steam games, listed through an external helper tool.
//!
//! The helper understands three commands:
//! - `steam` prints the Steam install directory
//! - `list` prints one app id per line
//! - `info <id>` prints `Key - Value` lines for one app
//!
//! Any output containing "error" means the helper could not answer.

use crate::collector::{CollectContext, Collector};
use crate::config::DiscoveryConfig;
use crate::progress::ListProgress;
use crate::{CandidateEntry, UninstallerKind};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

#[cfg(windows)]
const HELPER_FILE_NAME: &str = "SteamHelper.exe";
#[cfg(not(windows))]
const HELPER_FILE_NAME: &str = "steam-helper";

pub struct SteamCollector {
    helper: Option<PathBuf>,
    enabled: bool,
}

impl SteamCollector {
    pub fn new(helper: impl Into<PathBuf>) -> Self {
        Self {
            helper: Some(helper.into()),
            enabled: true,
        }
    }

    /// Uses the configured helper, or the one shipped next to the executable.
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        let helper = config.steam_helper_path.clone().or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|dir| dir.join(HELPER_FILE_NAME)))
        });
        Self {
            helper,
            enabled: config.scan_steam,
        }
    }

    fn helper(&self) -> Option<&Path> {
        self.helper.as_deref().filter(|p| p.is_file())
    }

    fn run_helper(&self, helper: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new(helper)
            .args(args)
            .output()
            .context(format!("Failed to start Steam helper: {:?}", helper))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Returns the Steam directory, or `None` when Steam is not installed.
    fn steam_location(&self, helper: &Path) -> Result<Option<PathBuf>> {
        let output = self.run_helper(helper, &["steam"])?;
        if is_error_output(&output) {
            return Ok(None);
        }

        let location = PathBuf::from(output.trim().trim_end_matches(['\\', '/']));
        Ok(location.is_dir().then_some(location))
    }
}

impl Collector for SteamCollector {
    fn display_name(&self) -> &str {
        "Steam"
    }

    fn is_enabled(&self) -> bool {
        self.enabled && self.helper().is_some()
    }

    fn collect(
        &self,
        _context: &CollectContext<'_>,
        progress: &mut dyn FnMut(&ListProgress),
    ) -> Result<Vec<CandidateEntry>> {
        let Some(helper) = self.helper() else {
            return Ok(Vec::new());
        };
        let Some(location) = self.steam_location(helper)? else {
            log::info!("Steam is not installed, skipping Steam apps");
            return Ok(Vec::new());
        };
        log::debug!("Steam found at {:?}", location);

        let output = self.run_helper(helper, &["list"])?;
        if is_error_output(&output) {
            bail!("Steam helper could not list apps: {}", output.trim());
        }

        let app_ids = parse_app_ids(&output);
        let mut apps = Vec::new();
        for (index, app_id) in app_ids.iter().enumerate() {
            progress(&ListProgress::new(index, Some(app_ids.len()), format!("Steam App {}", app_id)));

            let info = self.run_helper(helper, &["info", &app_id.to_string()])?;
            if info.trim().is_empty() {
                continue;
            }
            match parse_app_info(&info) {
                Ok(entry) => apps.push(entry),
                Err(e) => log::warn!("Skipping Steam App {}: {:#}", app_id, e),
            }
        }

        Ok(apps)
    }
}

fn is_error_output(output: &str) -> bool {
    output.trim().is_empty() || output.to_lowercase().contains("error")
}

fn parse_app_ids(output: &str) -> Vec<u32> {
    output
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect()
}

/// Builds an entry from the `Key - Value` lines of `info <id>`.
fn parse_app_info(output: &str) -> Result<CandidateEntry> {
    let fields: Vec<(&str, &str)> = output
        .lines()
        .filter_map(|line| line.split_once(" - "))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect();

    let value = |name: &str| {
        fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| *value)
    };
    let required = |name: &str| value(name).context(format!("missing field `{}`", name));

    Ok(CandidateEntry {
        display_name: Some(required("Name")?.to_string()),
        uninstall_string: required("UninstallString")?.to_string(),
        install_location: Some(PathBuf::from(required("InstallDirectory")?)),
        kind: UninstallerKind::Steam,
        estimated_size: value("SizeOnDisk").and_then(|size| size.parse().ok()),
        is_orphaned: true,
        ..Default::default()
    })
}
