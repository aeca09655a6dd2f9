//! Uninstaller metadata cache.
//!
//! Enrichment can be slow (directory sizes, product lookups), so the result
//! of every run is remembered by entry fingerprint and used to pre-fill
//! empty fields on the next run.
//!
//! # Storage
//!
//! - [`JsonFileCache`] keeps one JSON document on disk
//! - [`MemoryCacheStore`] keeps everything in memory (tests, one-shot runs)
//!
//! Cache trouble is never fatal: unreadable files start empty and failed
//! writes leave the current run untouched.

use crate::{CandidateEntry, UninstallerKind};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const CACHE_FORMAT_VERSION: u32 = 1;
const CACHE_FILE_NAME: &str = "uninstaller_cache.json";

/// Persisted projection of an enriched entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub display_name: Option<String>,
    pub uninstall_string: String,
    pub uninstaller_full_filename: String,
    pub install_location: Option<PathBuf>,
    pub kind: UninstallerKind,
    pub bundle_id: Option<Uuid>,
    pub estimated_size: Option<u64>,
    pub cached_at: DateTime<Utc>,
}

impl CacheSnapshot {
    pub fn of(entry: &CandidateEntry) -> Self {
        Self {
            display_name: entry.display_name.clone(),
            uninstall_string: entry.uninstall_string.clone(),
            uninstaller_full_filename: entry.uninstaller_full_filename.clone(),
            install_location: entry.install_location.clone(),
            kind: entry.kind,
            bundle_id: entry.bundle_id,
            estimated_size: entry.estimated_size,
            cached_at: Utc::now(),
        }
    }

    /// Fills the empty fields of `entry` from this snapshot.
    pub fn fill_missing(&self, entry: &mut CandidateEntry) {
        let cached = CandidateEntry {
            display_name: self.display_name.clone(),
            uninstall_string: self.uninstall_string.clone(),
            uninstaller_full_filename: self.uninstaller_full_filename.clone(),
            install_location: self.install_location.clone(),
            kind: self.kind,
            bundle_id: self.bundle_id,
            estimated_size: self.estimated_size,
            ..Default::default()
        };
        entry.fill_missing_from(&cached);
    }
}

/// Keyed persistent storage behind [`UninstallerCache`].
pub trait CacheStore: Send {
    fn get(&self, fingerprint: &str) -> Option<CacheSnapshot>;
    fn put(&mut self, fingerprint: String, snapshot: CacheSnapshot);
    fn flush(&mut self) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryCacheStore {
    entries: HashMap<String, CacheSnapshot>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, fingerprint: &str) -> Option<CacheSnapshot> {
        self.entries.get(fingerprint).cloned()
    }

    fn put(&mut self, fingerprint: String, snapshot: CacheSnapshot) {
        self.entries.insert(fingerprint, snapshot);
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    version: u32,
    entries: HashMap<String, CacheSnapshot>,
}

/// Cache stored as a single JSON file.
#[derive(Debug)]
pub struct JsonFileCache {
    path: PathBuf,
    entries: HashMap<String, CacheSnapshot>,
}

impl JsonFileCache {
    /// Opens the cache at `path`. A missing, unreadable or outdated file
    /// gives an empty cache.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_document(&path) {
            Ok(Some(document)) if document.version == CACHE_FORMAT_VERSION => document.entries,
            Ok(Some(document)) => {
                log::info!(
                    "Ignoring uninstaller cache {:?} with format version {}",
                    path,
                    document.version
                );
                HashMap::new()
            }
            Ok(None) => HashMap::new(),
            Err(e) => {
                log::warn!("Starting with an empty uninstaller cache: {:#}", e);
                HashMap::new()
            }
        };

        Self { path, entries }
    }

    /// Opens the cache at the platform's default location.
    pub fn open_default() -> Result<Self> {
        Ok(Self::open(default_cache_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for JsonFileCache {
    fn get(&self, fingerprint: &str) -> Option<CacheSnapshot> {
        self.entries.get(fingerprint).cloned()
    }

    fn put(&mut self, fingerprint: String, snapshot: CacheSnapshot) {
        self.entries.insert(fingerprint, snapshot);
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create cache directory: {:?}", parent))?;
        }

        let document = CacheDocument {
            version: CACHE_FORMAT_VERSION,
            entries: self.entries.clone(),
        };
        let content = serde_json::to_string_pretty(&document)?;

        // Write beside the target first so a crash never leaves half a file
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content)
            .context(format!("Failed to write cache file: {:?}", temp_path))?;
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e).context(format!("Failed to replace cache file: {:?}", self.path));
        }

        Ok(())
    }
}

fn read_document(path: &Path) -> Result<Option<CacheDocument>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .context(format!("Failed to read cache file: {:?}", path))?;
    let document = serde_json::from_str(&content)
        .context(format!("Failed to parse cache file: {:?}", path))?;
    Ok(Some(document))
}

/// Get the default location of the uninstaller cache file
pub fn default_cache_path() -> Result<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(format!("{}/Library/Caches/AppDepot", home)).join(CACHE_FILE_NAME))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA environment variable not set")?;
        Ok(PathBuf::from(format!("{}\\AppDepot", appdata)).join(CACHE_FILE_NAME))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let base = match std::env::var_os("XDG_CACHE_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                let home = std::env::var("HOME").context("HOME environment variable not set")?;
                PathBuf::from(home).join(".cache")
            }
        };
        Ok(base.join("appdepot").join(CACHE_FILE_NAME))
    }
}

/// Hit/miss counters of one cache pass. Diagnostic only.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// Fingerprint-keyed view over a [`CacheStore`].
pub struct UninstallerCache {
    store: Box<dyn CacheStore>,
}

impl UninstallerCache {
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryCacheStore::new())
    }

    pub fn try_get(&self, entry: &CandidateEntry) -> Option<CacheSnapshot> {
        let fingerprint = entry.fingerprint()?;
        self.store.get(&fingerprint)
    }

    /// Stores or refreshes the snapshot of `entry`.
    /// Returns false if the entry has nothing to key it by.
    pub fn upsert(&mut self, entry: &CandidateEntry) -> bool {
        match entry.fingerprint() {
            Some(fingerprint) => {
                self.store.put(fingerprint, CacheSnapshot::of(entry));
                true
            }
            None => false,
        }
    }

    pub fn persist(&mut self) -> Result<()> {
        self.store.flush()
    }

    /// Fills empty fields of every entry from its cached snapshot.
    pub fn apply(&self, entries: &mut [CandidateEntry]) -> CacheStats {
        let mut stats = CacheStats::default();
        for entry in entries.iter_mut() {
            match self.try_get(entry) {
                Some(snapshot) => {
                    snapshot.fill_missing(entry);
                    stats.hits += 1;
                }
                None => {
                    log::debug!("Cache miss: {}", entry.display_name_or_empty());
                    stats.misses += 1;
                }
            }
        }

        log::info!("Cache hits: {}/{}", stats.hits, entries.len());
        stats
    }
}

impl std::fmt::Debug for UninstallerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UninstallerCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HUNDRED_MB: u64 = 100 * 1024 * 1024;

    #[test]
    fn snapshot_fills_only_empty_fields() {
        let mut cached = CandidateEntry::new("Editor", "remove");
        cached.estimated_size = Some(HUNDRED_MB);
        cached.install_location = Some(PathBuf::from("/opt/old"));
        let snapshot = CacheSnapshot::of(&cached);

        let mut fresh = CandidateEntry::new("Editor", "remove");
        fresh.install_location = Some(PathBuf::from("/opt/new"));
        snapshot.fill_missing(&mut fresh);

        assert_eq!(fresh.estimated_size, Some(HUNDRED_MB));
        assert_eq!(fresh.install_location, Some(PathBuf::from("/opt/new")));
    }

    #[test]
    fn apply_counts_hits_and_misses() {
        let mut cache = UninstallerCache::in_memory();
        let mut known = CandidateEntry::new("Known", "remove-known");
        known.estimated_size = Some(3);
        assert!(cache.upsert(&known));

        let mut entries = vec![
            CandidateEntry::new("Known", "remove-known"),
            CandidateEntry::new("New", "remove-new"),
        ];
        let stats = cache.apply(&mut entries);

        assert_eq!(stats, CacheStats { hits: 1, misses: 1 });
        assert_eq!(entries[0].estimated_size, Some(3));
        assert_eq!(entries[1].estimated_size, None);
    }

    #[test]
    fn upsert_rejects_entries_without_fingerprint() {
        let mut cache = UninstallerCache::in_memory();

        assert!(!cache.upsert(&CandidateEntry::default()));
    }

    #[test]
    fn json_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CACHE_FILE_NAME);

        let mut entry = CandidateEntry::new("Editor", "/opt/editor/uninstall");
        entry.estimated_size = Some(HUNDRED_MB);

        let mut run1 = UninstallerCache::new(JsonFileCache::open(&path));
        assert!(run1.upsert(&entry));
        run1.persist().unwrap();

        let run2 = UninstallerCache::new(JsonFileCache::open(&path));
        let mut fresh = CandidateEntry::new("Editor", "/opt/editor/uninstall");
        assert_eq!(run2.apply(std::slice::from_mut(&mut fresh)).hits, 1);
        assert_eq!(fresh.estimated_size, Some(HUNDRED_MB));
    }

    #[test]
    fn corrupt_json_cache_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();

        let cache = JsonFileCache::open(&path);

        assert!(cache.is_empty());
    }

    #[test]
    fn flush_fails_when_target_is_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = JsonFileCache::open(dir.path());
        cache.put("k".to_string(), CacheSnapshot::of(&CandidateEntry::new("A", "a")));

        assert!(cache.flush().is_err());
    }
}
