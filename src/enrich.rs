//! Metadata enrichment of candidate entries.
//!
//! Units run in registration order and only ever fill fields that are still
//! empty. A quick pass runs the cheap units only; it exists so that install
//! locations are known before the program directories are scanned.

use crate::error::{DiscoveryError, ErrorSink};
use crate::{CandidateEntry, UninstallerKind};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// One step that populates specific fields of an entry.
pub trait InfoEnricher: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the unit is cheap enough for the quick pass.
    fn runs_in_quick_pass(&self) -> bool {
        true
    }

    fn enrich(&self, entry: &mut CandidateEntry, quick: bool) -> Result<()>;
}

/// Ordered set of enrichment units.
pub struct InfoAdderManager {
    units: Vec<Box<dyn InfoEnricher>>,
}

impl InfoAdderManager {
    pub fn new(units: Vec<Box<dyn InfoEnricher>>) -> Self {
        Self { units }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn push(&mut self, unit: impl InfoEnricher + 'static) {
        self.units.push(Box::new(unit));
    }

    pub fn unit_names(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.name()).collect()
    }

    /// Runs every applicable unit on `entry`. A failing unit is reported
    /// and the remaining units still run.
    pub fn add_missing_information(
        &self,
        entry: &mut CandidateEntry,
        quick: bool,
        errors: &dyn ErrorSink,
    ) {
        for unit in &self.units {
            if quick && !unit.runs_in_quick_pass() {
                continue;
            }
            if let Err(error) = unit.enrich(entry, quick) {
                errors.report(&DiscoveryError::Enrichment {
                    unit: unit.name().to_string(),
                    entry: entry.display_name_or_empty().to_string(),
                    error,
                });
            }
        }
    }

    /// Fill-missing copy from `source` into `target`.
    pub fn copy_missing_information(target: &mut CandidateEntry, source: &CandidateEntry) {
        target.fill_missing_from(source);
    }
}

impl Default for InfoAdderManager {
    fn default() -> Self {
        let mut manager = Self::empty();
        manager.push(UninstallerPathUnit);
        manager.push(MsiProductUnit);
        manager.push(InstallLocationUnit);
        manager.push(InstallSizeUnit);
        manager
    }
}

/// Derives the uninstaller executable from the uninstall command.
#[derive(Debug, Default, Clone, Copy)]
pub struct UninstallerPathUnit;

impl InfoEnricher for UninstallerPathUnit {
    fn name(&self) -> &str {
        "uninstaller-path"
    }

    fn enrich(&self, entry: &mut CandidateEntry, _quick: bool) -> Result<()> {
        if entry.uninstaller_full_filename.is_empty() {
            if let Some(path) = executable_from_command(&entry.uninstall_string) {
                entry.uninstaller_full_filename = path;
            }
        }
        Ok(())
    }
}

/// Extracts the program part of a command line.
///
/// Quoted programs are taken verbatim. Unquoted ones may contain spaces, so
/// the longest whitespace-delimited prefix naming an existing file wins,
/// falling back to the first token.
pub fn executable_from_command(command: &str) -> Option<String> {
    let command = command.trim();
    if command.is_empty() {
        return None;
    }

    if let Some(rest) = command.strip_prefix('"') {
        let program = rest.split('"').next().unwrap_or_default().trim();
        return (!program.is_empty()).then(|| program.to_string());
    }

    let tokens: Vec<&str> = command.split_whitespace().collect();
    for end in (1..=tokens.len()).rev() {
        let candidate = tokens[..end].join(" ");
        if Path::new(&candidate).is_file() {
            return Some(candidate);
        }
    }

    tokens.first().map(|t| t.to_string())
}

/// Recognises installer-subsystem uninstall commands and their product code.
#[derive(Debug, Default, Clone, Copy)]
pub struct MsiProductUnit;

impl InfoEnricher for MsiProductUnit {
    fn name(&self) -> &str {
        "msi-product"
    }

    fn enrich(&self, entry: &mut CandidateEntry, _quick: bool) -> Result<()> {
        if !entry.uninstall_string.to_lowercase().contains("msiexec") {
            return Ok(());
        }

        let product = braced_product_code(&entry.uninstall_string);
        if entry.bundle_id.is_none() {
            entry.bundle_id = product;
        }
        if entry.kind == UninstallerKind::Unknown && entry.bundle_id.is_some() {
            entry.kind = UninstallerKind::Msiexec;
        }
        Ok(())
    }
}

fn braced_product_code(command: &str) -> Option<uuid::Uuid> {
    let start = command.find('{')?;
    let end = start + command[start..].find('}')?;
    crate::collector::parse_product_code(&command[start..=end])
}

/// Uses the directory of a rooted uninstaller as install location.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstallLocationUnit;

impl InfoEnricher for InstallLocationUnit {
    fn name(&self) -> &str {
        "install-location"
    }

    fn enrich(&self, entry: &mut CandidateEntry, _quick: bool) -> Result<()> {
        if entry.install_location.is_some() || entry.kind == UninstallerKind::Msiexec {
            return Ok(());
        }

        let uninstaller = Path::new(&entry.uninstaller_full_filename);
        if !uninstaller.is_absolute() || !uninstaller.is_file() {
            return Ok(());
        }

        entry.install_location = uninstaller
            .parent()
            .filter(|dir| dir.is_dir())
            .map(Path::to_path_buf);
        Ok(())
    }
}

/// Measures the install location on disk. Full pass only.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstallSizeUnit;

impl InfoEnricher for InstallSizeUnit {
    fn name(&self) -> &str {
        "install-size"
    }

    fn runs_in_quick_pass(&self) -> bool {
        false
    }

    fn enrich(&self, entry: &mut CandidateEntry, _quick: bool) -> Result<()> {
        if entry.estimated_size.is_some() {
            return Ok(());
        }
        if let Some(location) = entry.install_location.as_ref().filter(|l| l.is_dir()) {
            entry.estimated_size = Some(directory_size(location)?);
        }
        Ok(())
    }
}

/// Recursively sums the size of all files below `dir`.
/// Children that cannot be read are left out of the total.
fn directory_size(dir: &Path) -> Result<u64> {
    let mut total = 0;

    let entries = fs::read_dir(dir)
        .context(format!("Failed to read directory: {:?}", dir))?;

    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            match directory_size(&entry.path()) {
                Ok(size) => total += size,
                Err(e) => log::debug!("Skipping unreadable directory: {:#}", e),
            }
        } else if file_type.is_file() {
            total += entry.metadata().map(|m| m.len()).unwrap_or_default();
        }
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Failing;

    impl InfoEnricher for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn enrich(&self, _entry: &mut CandidateEntry, _quick: bool) -> Result<()> {
            anyhow::bail!("no data")
        }
    }

    #[test]
    fn quoted_command_yields_quoted_program() {
        assert_eq!(
            executable_from_command("\"C:\\Program Files\\App\\unins000.exe\" /SILENT"),
            Some("C:\\Program Files\\App\\unins000.exe".to_string())
        );
        assert_eq!(executable_from_command("   "), None);
    }

    #[test]
    fn unquoted_command_with_spaces_finds_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("My App");
        fs::create_dir(&app_dir).unwrap();
        let uninstaller = app_dir.join("uninstall");
        fs::write(&uninstaller, b"#!/bin/sh").unwrap();

        let command = format!("{} --quiet", uninstaller.display());

        assert_eq!(
            executable_from_command(&command),
            Some(uninstaller.display().to_string())
        );
    }

    #[test]
    fn msi_unit_detects_product_code() {
        let mut entry = CandidateEntry::new(
            "Runtime",
            "MsiExec.exe /X{0A6C4F5B-9F27-4C5E-8D3A-1B2C3D4E5F60}",
        );

        MsiProductUnit.enrich(&mut entry, true).unwrap();

        assert_eq!(entry.kind, UninstallerKind::Msiexec);
        assert!(entry.bundle_id.is_some());
    }

    #[test]
    fn install_location_and_size_from_uninstaller() {
        let dir = tempfile::tempdir().unwrap();
        let uninstaller = dir.path().join("uninstall");
        fs::write(&uninstaller, vec![0u8; 10]).unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data").join("blob"), vec![0u8; 32]).unwrap();

        let mut entry = CandidateEntry::new("App", format!("\"{}\"", uninstaller.display()));
        let manager = InfoAdderManager::default();
        let errors = |e: &DiscoveryError| panic!("unexpected failure: {}", e);

        manager.add_missing_information(&mut entry, true, &errors);
        assert_eq!(entry.install_location.as_deref(), Some(dir.path()));
        assert_eq!(entry.estimated_size, None);

        manager.add_missing_information(&mut entry, false, &errors);
        assert_eq!(entry.estimated_size, Some(42));
    }

    #[test]
    fn failing_unit_is_reported_and_others_still_run() {
        let mut manager = InfoAdderManager::empty();
        manager.push(Failing);
        manager.push(UninstallerPathUnit);

        let reported = RefCell::new(Vec::new());
        let errors = |e: &DiscoveryError| reported.borrow_mut().push(e.to_string());

        let mut entry = CandidateEntry::new("App", "remove-app --all");
        manager.add_missing_information(&mut entry, false, &errors);

        assert_eq!(entry.uninstaller_full_filename, "remove-app");
        assert_eq!(reported.borrow().len(), 1);
        assert!(reported.borrow()[0].contains("failing"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_does_not_fail_size() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.bin"), vec![0u8; 16]).unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("secret"), vec![0u8; 8]).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let mut entry = CandidateEntry::new("App", "remove-app");
        entry.install_location = Some(dir.path().to_path_buf());
        let result = InstallSizeUnit.enrich(&mut entry, false);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(result.is_ok());
        // Privileged users can still read the locked directory
        assert!(matches!(entry.estimated_size, Some(16) | Some(24)));
    }
}
