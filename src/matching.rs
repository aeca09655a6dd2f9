//! Baseline relatedness scorer and startup matcher.
//!
//! Both are plain strategies; anything implementing
//! [`RelatednessScorer`] or [`StartupMatcher`] can take their place.

use crate::merge::RelatednessScorer;
use crate::startup::{StartupEntry, StartupMatcher};
use crate::CandidateEntry;
use anyhow::Result;
use std::path::Path;

/// Normalize an application name for matching between sources.
/// Removes architecture markers and edition suffixes, spaces and punctuation,
/// and converts to lowercase.
pub fn normalize_app_name(name: &str) -> String {
    let mut normalized = name.trim().to_lowercase();

    let suffixes_to_remove = [
        " (x64)", " (x86)", " (64-bit)", " (32-bit)",
        " x64", " x86", " 64-bit", " 32-bit",
        " (remove only)",
    ];

    let mut changed = true;
    while changed {
        changed = false;
        for suffix in &suffixes_to_remove {
            if let Some(stripped) = normalized.strip_suffix(suffix) {
                normalized = stripped.trim_end().to_string();
                changed = true;
            }
        }
    }

    normalized.retain(|c| c.is_alphanumeric());
    normalized
}

/// Scores by normalised name, install location, uninstaller and product code.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameRelatednessScorer;

impl RelatednessScorer for NameRelatednessScorer {
    fn score(&self, a: &CandidateEntry, b: &CandidateEntry) -> u32 {
        let mut score = 0;

        let name_a = normalize_app_name(a.display_name_or_empty());
        if !name_a.is_empty() && name_a == normalize_app_name(b.display_name_or_empty()) {
            score += 1;
        }

        if let (Some(loc_a), Some(loc_b)) = (&a.install_location, &b.install_location) {
            if same_path(loc_a, loc_b) {
                score += 1;
            }
        }

        if !a.uninstaller_full_filename.is_empty()
            && a.uninstaller_full_filename.eq_ignore_ascii_case(&b.uninstaller_full_filename)
            && Path::new(&a.uninstaller_full_filename).is_absolute()
        {
            score += 1;
        }

        if a.bundle_id.is_some() && a.bundle_id == b.bundle_id {
            score += 2;
        }

        score
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    let a = a.to_string_lossy();
    let b = b.to_string_lossy();
    let trim = |s: &str| s.trim_end_matches(['/', '\\']).to_lowercase();
    !a.is_empty() && trim(&a) == trim(&b)
}

/// Associates a startup entry with the entry whose install location holds
/// its program (deepest location wins), falling back to name equality.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstallLocationMatcher;

impl StartupMatcher for InstallLocationMatcher {
    fn best_match(&self, entries: &[CandidateEntry], startup: &StartupEntry) -> Result<Option<usize>> {
        if let Some(program) = &startup.command_file {
            let mut best: Option<(usize, usize)> = None;
            for (index, entry) in entries.iter().enumerate() {
                let Some(location) = &entry.install_location else {
                    continue;
                };
                if location.as_os_str().is_empty() || !program.starts_with(location) {
                    continue;
                }
                let depth = location.components().count();
                if best.map_or(true, |(_, top)| depth > top) {
                    best = Some((index, depth));
                }
            }
            if let Some((index, _)) = best {
                return Ok(Some(index));
            }
        }

        let name = normalize_app_name(&startup.name);
        if name.is_empty() {
            return Ok(None);
        }
        Ok(entries
            .iter()
            .position(|e| normalize_app_name(e.display_name_or_empty()) == name))
    }
}
