//! Decides whether a discovered entry still has a usable uninstaller.

use crate::collector::MsiProductSet;
use crate::{CandidateEntry, UninstallerKind};
use std::path::Path;

/// Returns true if `entry` can plausibly be uninstalled right now.
///
/// Rules, first match wins:
/// 1. no uninstaller path: invalid
/// 2. rooted path to an existing file: valid
/// 3. installer product: valid only while its product code is still registered
/// 4. anything else: valid unless it is a rooted path that no longer exists
pub fn is_valid(entry: &CandidateEntry, products: &MsiProductSet) -> bool {
    let filename = entry.uninstaller_full_filename.as_str();
    if filename.is_empty() {
        return false;
    }

    let rooted = is_rooted(filename);
    if rooted && Path::new(filename).is_file() {
        return true;
    }

    if entry.kind == UninstallerKind::Msiexec {
        return entry
            .bundle_id
            .map_or(false, |product| products.contains(&product));
    }

    // Bare commands like `msiexec.exe` resolve through PATH
    !rooted
}

/// Malformed path text counts as not rooted.
fn is_rooted(path: &str) -> bool {
    if path.chars().any(is_invalid_path_char) {
        return false;
    }
    Path::new(path).has_root()
}

fn is_invalid_path_char(c: char) -> bool {
    if c.is_control() {
        return true;
    }
    cfg!(windows) && matches!(c, '<' | '>' | '"' | '|')
}
