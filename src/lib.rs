//! AppDepot Core Library
//!
//! Finds every application installed on a machine and builds one
//! deduplicated uninstaller inventory from several overlapping sources.
//!
//! # Architecture
//!
//! This library is designed to be consumed directly from Rust (the `appdepot`
//! CLI) or via FFI by native UI frontends:
//! - **macOS**: SwiftUI app using static lib via Swift ↔ Rust FFI
//! - **Windows**: WPF app using DLL via C# ↔ Rust P/Invoke
//!
//! # Core Features Implemented
//!
//! ## Discovery (`discovery` module)
//! - `UninstallerDiscovery::run()` - Query every source and reconcile the results
//! - Store collectors run on a background thread while the registry and
//!   program directories are scanned
//!
//! ## Reconciliation (`merge`, `matching` modules)
//! - `merge_results()` - Fuzzy-match incoming entries against authoritative ones
//! - `NameRelatednessScorer` - Baseline scorer, replaceable by any `RelatednessScorer`
//!
//! ## Metadata (`enrich`, `cache`, `validity` modules)
//! - `InfoAdderManager` - Ordered enrichment units that only fill empty fields
//! - `UninstallerCache` - Fingerprint-keyed metadata reused across runs
//! - `is_valid()` - Whether an entry still has a usable uninstaller
//!
//! ## Sources (`collector`, `collectors`, `startup` modules)
//! - `Collector` - One origin of candidate entries
//! - `DirectoryCollector`, `SteamCollector` - Built-in collectors
//! - `attach_startup_entries()` - Associate autostart registrations with entries
//!
//! ## Data Structures (`entry` module)
//! - `CandidateEntry` - One discovered application with uninstall metadata
//! - `UninstallerKind` - How the application is uninstalled

pub mod cache;
pub mod collector;
pub mod collectors;
pub mod config;
pub mod discovery;
pub mod enrich;
pub mod entry;
pub mod error;
pub mod ffi;
pub mod matching;
pub mod merge;
pub mod progress;
pub mod startup;
pub mod validity;

pub use cache::{CacheSnapshot, CacheStore, JsonFileCache, MemoryCacheStore, UninstallerCache};
pub use collector::{CollectContext, Collector, MsiProductSet, ProductEnumerator};
pub use config::DiscoveryConfig;
pub use discovery::{DiscoverySources, UninstallerDiscovery};
pub use enrich::{InfoAdderManager, InfoEnricher};
pub use entry::{CandidateEntry, UninstallerKind};
pub use error::{DiscoveryError, ErrorSink, LogErrorSink};
pub use merge::{merge_results, RelatednessScorer};
pub use progress::ListProgress;
pub use startup::{attach_startup_entries, StartupEntry, StartupMatcher, StartupSource};
pub use validity::is_valid;
