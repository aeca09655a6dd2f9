use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::startup::StartupEntry;

/// How an application is expected to be uninstalled.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UninstallerKind {
    #[default]
    Unknown,
    /// Windows Installer product, removed through `msiexec`
    Msiexec,
    Steam,
    StoreApp,
    InnoSetup,
    Nsis,
    SimpleDelete,
}

/// One discovered application together with its uninstall metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateEntry {
    pub display_name: Option<String>,
    pub uninstall_string: String,
    pub uninstaller_full_filename: String,
    pub install_location: Option<PathBuf>,
    pub kind: UninstallerKind,
    /// Installer product code; only meaningful when `kind` is `Msiexec`
    pub bundle_id: Option<Uuid>,
    pub estimated_size: Option<u64>,
    pub is_orphaned: bool,
    /// Derived at the end of every run, never read back from storage
    #[serde(skip)]
    pub(crate) is_valid: bool,
    #[serde(skip)]
    pub(crate) startup_entries: Vec<Arc<StartupEntry>>,
}

impl CandidateEntry {
    pub fn new(display_name: impl Into<String>, uninstall_string: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            uninstall_string: uninstall_string.into(),
            ..Default::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub(crate) fn set_valid(&mut self, valid: bool) {
        self.is_valid = valid;
    }

    pub fn uninstall_possible(&self) -> bool {
        !self.uninstall_string.trim().is_empty()
    }

    pub fn display_name_or_empty(&self) -> &str {
        self.display_name.as_deref().unwrap_or_default()
    }

    /// Stable identity used to correlate this entry with cached metadata.
    ///
    /// Derived from the display name and uninstall command only, so fields
    /// filled in later by enrichment never change the key.
    pub fn fingerprint(&self) -> Option<String> {
        let name = self.display_name_or_empty().trim().to_lowercase();
        let command = self.uninstall_string.trim();
        if name.is_empty() && command.is_empty() {
            return None;
        }

        let key = format!("{}\n{}", name, command);
        Some(format!("{:x}", md5::compute(key.as_bytes())))
    }

    pub fn startup_entries(&self) -> &[Arc<StartupEntry>] {
        &self.startup_entries
    }

    pub(crate) fn clear_startup_entries(&mut self) {
        self.startup_entries.clear();
    }

    pub(crate) fn push_startup_entry(&mut self, startup: Arc<StartupEntry>) {
        self.startup_entries.push(startup);
    }

    /// Flat JSON view for frontends, including the attached startup entries.
    pub fn summary_json(&self) -> serde_json::Value {
        serde_json::json!({
            "display_name": self.display_name,
            "uninstall_string": self.uninstall_string,
            "uninstaller_full_filename": self.uninstaller_full_filename,
            "install_location": self.install_location.as_ref().map(|p| p.to_string_lossy()),
            "kind": format!("{:?}", self.kind),
            "bundle_id": self.bundle_id.map(|id| id.braced().to_string()),
            "estimated_size": self.estimated_size,
            "is_valid": self.is_valid,
            "is_orphaned": self.is_orphaned,
            "startup_entries": self.startup_entries.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        })
    }

    /// Copies every field of `source` into `self` where `self` is still empty.
    /// Populated fields are never overwritten.
    pub fn fill_missing_from(&mut self, source: &CandidateEntry) {
        if is_blank(self.display_name.as_deref()) && !is_blank(source.display_name.as_deref()) {
            self.display_name = source.display_name.clone();
        }
        if self.uninstall_string.is_empty() {
            self.uninstall_string = source.uninstall_string.clone();
        }
        if self.uninstaller_full_filename.is_empty() {
            self.uninstaller_full_filename = source.uninstaller_full_filename.clone();
        }
        if self.install_location.is_none() {
            self.install_location = source.install_location.clone();
        }
        if self.kind == UninstallerKind::Unknown {
            self.kind = source.kind;
        }
        if self.bundle_id.is_none() {
            self.bundle_id = source.bundle_id;
        }
        if self.estimated_size.is_none() {
            self.estimated_size = source.estimated_size;
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_missing_keeps_populated_fields() {
        let mut destination = CandidateEntry::new("X", "remove-x");
        destination.estimated_size = Some(10);

        let mut source = CandidateEntry::new("Y", "remove-y");
        source.estimated_size = Some(20);
        source.install_location = Some(PathBuf::from("/opt/y"));
        source.kind = UninstallerKind::Nsis;

        destination.fill_missing_from(&source);

        assert_eq!(destination.display_name.as_deref(), Some("X"));
        assert_eq!(destination.uninstall_string, "remove-x");
        assert_eq!(destination.estimated_size, Some(10));
        assert_eq!(destination.install_location, Some(PathBuf::from("/opt/y")));
        assert_eq!(destination.kind, UninstallerKind::Nsis);
    }

    #[test]
    fn fill_missing_replaces_blank_display_name() {
        let mut destination = CandidateEntry::default();
        destination.display_name = Some("  ".to_string());

        destination.fill_missing_from(&CandidateEntry::new("Editor", ""));

        assert_eq!(destination.display_name.as_deref(), Some("Editor"));
    }

    #[test]
    fn fill_missing_never_copies_orphaned_or_validity() {
        let mut destination = CandidateEntry::new("A", "a");
        let mut source = CandidateEntry::new("A", "a");
        source.is_orphaned = true;
        source.set_valid(true);

        destination.fill_missing_from(&source);

        assert!(!destination.is_orphaned);
        assert!(!destination.is_valid());
    }

    #[test]
    fn fingerprint_is_stable_and_case_insensitive_on_name() {
        let mut a = CandidateEntry::new("Editor", "/opt/editor/uninstall");
        let b = CandidateEntry::new("EDITOR", "/opt/editor/uninstall");
        let before = a.fingerprint();

        a.estimated_size = Some(1);
        a.install_location = Some(PathBuf::from("/opt/editor"));

        assert_eq!(before, a.fingerprint());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), CandidateEntry::new("Editor", "other").fingerprint());
    }

    #[test]
    fn validity_is_not_read_from_json() {
        let entry: CandidateEntry = serde_json::from_str(
            r#"{ "display_name": "Editor", "uninstall_string": "remove-editor",
                 "uninstaller_full_filename": "", "install_location": null,
                 "kind": "Nsis", "bundle_id": null, "estimated_size": 3,
                 "is_orphaned": false, "is_valid": true }"#,
        )
        .unwrap();

        assert_eq!(entry.kind, UninstallerKind::Nsis);
        assert!(!entry.is_valid());
        assert!(serde_json::to_value(&entry).unwrap().get("is_valid").is_none());
    }

    #[test]
    fn fingerprint_absent_for_empty_entry() {
        assert_eq!(CandidateEntry::default().fingerprint(), None);
    }
}
