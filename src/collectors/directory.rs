//! Program directory scanning.
//!
//! Finds applications that left an uninstaller in a program directory but
//! are not known to any more authoritative source.
//!
//! # Platform-Specific Behavior
//!
//! ## Windows
//! - Scans Program Files, Program Files (x86) and the per-user Programs folder
//! - Uninstallers are `unins*.exe` (Inno Setup) or `uninstall*.exe` (NSIS and others)
//!
//! ## Other platforms
//! - Scans `/opt` and `~/.local/opt`
//! - Uninstallers are files named `uninstall*`

use crate::collector::{CollectContext, Collector};
use crate::config::DiscoveryConfig;
use crate::progress::ListProgress;
use crate::{CandidateEntry, UninstallerKind};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the default program directories for the current platform.
fn default_program_directories() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    #[cfg(target_os = "windows")]
    {
        for var in ["ProgramFiles", "ProgramFiles(x86)"] {
            if let Ok(dir) = std::env::var(var) {
                dirs.push(PathBuf::from(dir));
            }
        }
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            dirs.push(PathBuf::from(format!(r"{}\Programs", local)));
        }
    }

    #[cfg(not(target_os = "windows"))]
    {
        dirs.push(PathBuf::from("/opt"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(format!("{}/.local/opt", home)));
        }
    }

    dirs
}

pub struct DirectoryCollector {
    roots: Vec<PathBuf>,
}

impl DirectoryCollector {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        if config.program_directories.is_empty() {
            Self::new(default_program_directories())
        } else {
            Self::new(config.program_directories.clone())
        }
    }
}

impl Collector for DirectoryCollector {
    fn display_name(&self) -> &str {
        "Program directories"
    }

    fn collect(
        &self,
        context: &CollectContext<'_>,
        progress: &mut dyn FnMut(&ListProgress),
    ) -> Result<Vec<CandidateEntry>> {
        let known: Vec<&Path> = context
            .seed
            .iter()
            .filter_map(|e| e.install_location.as_deref())
            .filter(|p| !p.as_os_str().is_empty())
            .collect();

        let mut found = Vec::new();
        for (index, root) in self.roots.iter().enumerate() {
            progress(&ListProgress::new(
                index,
                Some(self.roots.len()),
                root.display().to_string(),
            ));

            // Skip directories that don't exist
            if !root.is_dir() {
                continue;
            }

            match scan_root(root, &known) {
                Ok(mut entries) => found.append(&mut entries),
                Err(e) => log::warn!("Failed to scan directory {:?}: {:#}", root, e),
            }
        }

        Ok(found)
    }
}

/// Scans the direct children of `root` for applications with an uninstaller.
fn scan_root(root: &Path, known: &[&Path]) -> Result<Vec<CandidateEntry>> {
    let mut found = Vec::new();

    let entries = fs::read_dir(root)
        .context(format!("Failed to read directory: {:?}", root))?;

    for entry in entries {
        let path = entry?.path();
        if !path.is_dir() || is_covered(root, &path, known) {
            continue;
        }

        let Some(uninstaller) = find_uninstaller(&path)? else {
            continue;
        };
        let Some(name) = path.file_name() else {
            continue;
        };

        found.push(CandidateEntry {
            display_name: Some(name.to_string_lossy().to_string()),
            uninstall_string: format!("\"{}\"", uninstaller.display()),
            uninstaller_full_filename: uninstaller.display().to_string(),
            install_location: Some(path.clone()),
            kind: kind_of(&uninstaller),
            is_orphaned: true,
            ..Default::default()
        });
    }

    Ok(found)
}

/// A directory is covered if it contains, or lies inside, a known install
/// location. Locations at or above the scan root cover nothing.
fn is_covered(root: &Path, dir: &Path, known: &[&Path]) -> bool {
    known
        .iter()
        .filter(|location| !root.starts_with(location))
        .any(|location| location.starts_with(dir) || dir.starts_with(location))
}

fn find_uninstaller(dir: &Path) -> Result<Option<PathBuf>> {
    let mut candidates = Vec::new();

    let entries = fs::read_dir(dir)
        .context(format!("Failed to read directory: {:?}", dir))?;

    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem() else {
            continue;
        };
        let stem = stem.to_string_lossy().to_lowercase();
        if !(stem.starts_with("unins") || stem.starts_with("uninstall")) {
            continue;
        }
        if cfg!(windows) && !has_extension(&path, "exe") {
            continue;
        }
        candidates.push(path);
    }

    // Deterministic pick when several uninstallers sit side by side
    candidates.sort();
    Ok(candidates.into_iter().next())
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map_or(false, |e| e.to_string_lossy().eq_ignore_ascii_case(extension))
}

fn kind_of(uninstaller: &Path) -> UninstallerKind {
    let stem = uninstaller
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    // Inno Setup names its uninstallers unins000, unins001, ...
    if stem.len() > 5 && stem.starts_with("unins") && stem[5..].chars().all(|c| c.is_ascii_digit()) {
        UninstallerKind::InnoSetup
    } else {
        UninstallerKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_dir(root: &Path, name: &str, uninstaller: Option<&str>) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("readme.txt"), "hi").unwrap();
        if let Some(file) = uninstaller {
            fs::write(dir.join(file), "bin").unwrap();
        }
        dir
    }

    fn collect(collector: &DirectoryCollector, seed: &[CandidateEntry]) -> Vec<CandidateEntry> {
        let context = CollectContext { products: None, seed };
        collector.collect(&context, &mut |_| {}).unwrap()
    }

    #[test]
    #[cfg(not(windows))]
    fn finds_directories_with_uninstallers() {
        let root = tempfile::tempdir().unwrap();
        let game = app_dir(root.path(), "Game", Some("unins000"));
        app_dir(root.path(), "Docs", None);

        let found = collect(&DirectoryCollector::new(vec![root.path().to_path_buf()]), &[]);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].display_name.as_deref(), Some("Game"));
        assert_eq!(found[0].install_location.as_deref(), Some(game.as_path()));
        assert_eq!(found[0].kind, UninstallerKind::InnoSetup);
        assert!(found[0].is_orphaned);
    }

    #[test]
    #[cfg(not(windows))]
    fn skips_directories_known_from_seed() {
        let root = tempfile::tempdir().unwrap();
        let editor = app_dir(root.path(), "Editor", Some("uninstall"));
        app_dir(root.path(), "Viewer", Some("uninstall.sh"));

        let mut seed = CandidateEntry::new("Editor", "");
        seed.install_location = Some(editor.join("bin"));

        let found = collect(&DirectoryCollector::new(vec![root.path().to_path_buf()]), &[seed]);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].display_name.as_deref(), Some("Viewer"));
        assert_eq!(found[0].kind, UninstallerKind::Unknown);
    }

    #[test]
    #[cfg(not(windows))]
    fn seed_at_or_above_root_covers_nothing() {
        let root = tempfile::tempdir().unwrap();
        app_dir(root.path(), "Editor", Some("uninstall"));
        app_dir(root.path(), "Viewer", Some("uninstall"));

        let mut at_root = CandidateEntry::new("Suite", "");
        at_root.install_location = Some(root.path().to_path_buf());
        let mut above_root = CandidateEntry::new("Base", "");
        above_root.install_location = root.path().parent().map(Path::to_path_buf);

        let found = collect(
            &DirectoryCollector::new(vec![root.path().to_path_buf()]),
            &[at_root, above_root],
        );

        assert_eq!(found.len(), 2);
    }

    #[test]
    fn missing_roots_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let collector = DirectoryCollector::new(vec![root.path().join("missing")]);

        assert!(collect(&collector, &[]).is_empty());
    }
}
