//! Autostart registrations and their association with discovered entries.

use crate::enrich::executable_from_command;
use crate::CandidateEntry;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A program registered to run at login or boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupEntry {
    pub name: String,
    pub command: String,
    /// Program part of `command`, when it names a rooted path
    pub command_file: Option<PathBuf>,
    /// Where the registration was found
    pub source: String,
    pub enabled: bool,
}

impl StartupEntry {
    pub fn new(name: impl Into<String>, command: impl Into<String>, source: impl Into<String>) -> Self {
        let command = command.into();
        let command_file = executable_from_command(&command)
            .map(PathBuf::from)
            .filter(|p| p.is_absolute());
        Self {
            name: name.into(),
            command,
            command_file,
            source: source.into(),
            enabled: true,
        }
    }
}

/// Produces startup registrations from one mechanism.
pub trait StartupSource {
    fn name(&self) -> &str;
    fn detect(&self) -> Result<Vec<StartupEntry>>;
}

/// Picks the entry a startup registration belongs to, if any.
pub trait StartupMatcher {
    fn best_match(&self, entries: &[CandidateEntry], startup: &StartupEntry) -> Result<Option<usize>>;
}

/// Associates each startup entry with its best matching candidate.
///
/// Previous associations are cleared first, so calling this repeatedly with
/// the same input gives the same result.
pub fn attach_startup_entries(
    entries: &mut [CandidateEntry],
    startups: &[Arc<StartupEntry>],
    matcher: &dyn StartupMatcher,
) -> Result<()> {
    for entry in entries.iter_mut() {
        entry.clear_startup_entries();
    }

    for startup in startups {
        let Some(index) = matcher.best_match(entries, startup)? else {
            continue;
        };
        match entries.get_mut(index) {
            Some(entry) => entry.push_startup_entry(Arc::clone(startup)),
            None => bail!(
                "matcher picked entry {} of {} for startup `{}`",
                index,
                entries.len(),
                startup.name
            ),
        }
    }

    Ok(())
}

/// Login items from the XDG autostart directories.
#[derive(Debug, Clone)]
pub struct XdgAutostartSource {
    directories: Vec<PathBuf>,
}

impl XdgAutostartSource {
    pub fn new(directories: Vec<PathBuf>) -> Self {
        Self { directories }
    }

    /// User directory (`$XDG_CONFIG_HOME/autostart`) then `/etc/xdg/autostart`.
    pub fn from_environment() -> Self {
        let mut directories = Vec::new();
        match std::env::var_os("XDG_CONFIG_HOME") {
            Some(config) if !config.is_empty() => {
                directories.push(PathBuf::from(config).join("autostart"))
            }
            _ => {
                if let Some(home) = std::env::var_os("HOME") {
                    directories.push(PathBuf::from(home).join(".config").join("autostart"));
                }
            }
        }
        directories.push(PathBuf::from("/etc/xdg/autostart"));
        Self::new(directories)
    }
}

impl StartupSource for XdgAutostartSource {
    fn name(&self) -> &str {
        "XDG autostart"
    }

    fn detect(&self) -> Result<Vec<StartupEntry>> {
        let mut found = Vec::new();

        for dir in &self.directories {
            if !dir.is_dir() {
                continue;
            }

            let entries = fs::read_dir(dir)
                .context(format!("Failed to read directory: {:?}", dir))?;
            for entry in entries {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("desktop") {
                    continue;
                }
                if let Some(startup) = read_desktop_file(&path)? {
                    found.push(startup);
                }
            }
        }

        Ok(found)
    }
}

fn read_desktop_file(path: &Path) -> Result<Option<StartupEntry>> {
    let content = fs::read_to_string(path)
        .context(format!("Failed to read desktop file: {:?}", path))?;
    Ok(parse_desktop_entry(&content, &path.display().to_string()))
}

fn parse_desktop_entry(content: &str, source: &str) -> Option<StartupEntry> {
    let mut in_main_group = false;
    let mut name = None;
    let mut exec = None;
    let mut enabled = true;

    for line in content.lines().map(str::trim) {
        if line.starts_with('[') {
            in_main_group = line == "[Desktop Entry]";
            continue;
        }
        if !in_main_group {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key.trim() {
            "Name" => name = Some(value.trim().to_string()),
            "Exec" => exec = Some(value.trim().to_string()),
            "Hidden" if value.trim().eq_ignore_ascii_case("true") => enabled = false,
            "X-GNOME-Autostart-enabled" if value.trim().eq_ignore_ascii_case("false") => {
                enabled = false
            }
            _ => {}
        }
    }

    let exec = exec?;
    let name = name.unwrap_or_else(|| exec.clone());
    let mut startup = StartupEntry::new(name, exec, source);
    startup.enabled = enabled;
    Some(startup)
}
