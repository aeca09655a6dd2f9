//! Discovery orchestration.
//!
//! [`UninstallerDiscovery::run`] queries every source, reconciles the results
//! into one list and enriches it. Sources are consulted in order of
//! authority: installer registry first, then store collectors, then program
//! directories. Store collectors run on a background thread while the
//! registry and program directories are scanned.
//!
//! No single failing source, enrichment unit, cache or startup mechanism can
//! abort a run; failures go to the configured [`ErrorSink`].

use crate::cache::{JsonFileCache, UninstallerCache};
use crate::collector::{CollectContext, Collector, MsiProductSet, NoProducts, ProductEnumerator};
use crate::collectors::{plugin_collectors, DirectoryCollector};
use crate::config::DiscoveryConfig;
use crate::enrich::InfoAdderManager;
use crate::error::{panic_message, DiscoveryError, ErrorSink, LogErrorSink};
use crate::matching::{InstallLocationMatcher, NameRelatednessScorer};
use crate::merge::{merge_results, RelatednessScorer};
use crate::progress::{ListProgress, PhaseReporter, ProgressCallback};
use crate::startup::{attach_startup_entries, StartupEntry, StartupMatcher, StartupSource};
use crate::validity::is_valid;
use crate::CandidateEntry;
use anyhow::anyhow;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

pub const TOTAL_STEPS: usize = 8;

/// Everything the orchestrator collects from.
pub struct DiscoverySources {
    pub products: Box<dyn ProductEnumerator>,
    pub registry: Option<Box<dyn Collector>>,
    pub drives: Option<Box<dyn Collector>>,
    /// Run sequentially on the background worker, in this order
    pub plugins: Vec<Box<dyn Collector>>,
    pub startup: Vec<Box<dyn StartupSource>>,
}

impl DiscoverySources {
    pub fn new() -> Self {
        Self {
            products: Box::new(NoProducts),
            registry: None,
            drives: None,
            plugins: Vec::new(),
            startup: Vec::new(),
        }
    }

    /// Built-in sources for the current platform.
    pub fn for_platform(config: &DiscoveryConfig) -> Self {
        let mut sources = Self::new()
            .with_drive_collector(DirectoryCollector::from_config(config));
        sources.plugins = plugin_collectors(config);

        #[cfg(not(windows))]
        {
            sources = sources.with_startup_source(crate::startup::XdgAutostartSource::from_environment());
        }

        sources
    }

    pub fn with_products(mut self, products: impl ProductEnumerator + 'static) -> Self {
        self.products = Box::new(products);
        self
    }

    pub fn with_registry_collector(mut self, collector: impl Collector + 'static) -> Self {
        self.registry = Some(Box::new(collector));
        self
    }

    pub fn with_drive_collector(mut self, collector: impl Collector + 'static) -> Self {
        self.drives = Some(Box::new(collector));
        self
    }

    pub fn with_plugin_collector(mut self, collector: impl Collector + 'static) -> Self {
        self.plugins.push(Box::new(collector));
        self
    }

    pub fn with_startup_source(mut self, source: impl StartupSource + 'static) -> Self {
        self.startup.push(Box::new(source));
        self
    }
}

impl Default for DiscoverySources {
    fn default() -> Self {
        Self::new()
    }
}

pub struct UninstallerDiscovery {
    config: DiscoveryConfig,
    sources: DiscoverySources,
    cache: Option<UninstallerCache>,
    info_adder: InfoAdderManager,
    scorer: Box<dyn RelatednessScorer>,
    matcher: Box<dyn StartupMatcher>,
    errors: Box<dyn ErrorSink>,
}

impl UninstallerDiscovery {
    /// Opens the cache named by `config.cache_path`, if any.
    pub fn new(config: DiscoveryConfig, sources: DiscoverySources) -> Self {
        let cache = config
            .cache_path
            .as_ref()
            .map(|path| UninstallerCache::new(JsonFileCache::open(path)));

        Self {
            config,
            sources,
            cache,
            info_adder: InfoAdderManager::default(),
            scorer: Box::new(NameRelatednessScorer),
            matcher: Box::new(InstallLocationMatcher),
            errors: Box::new(LogErrorSink),
        }
    }

    pub fn with_cache(mut self, cache: UninstallerCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_info_adder(mut self, info_adder: InfoAdderManager) -> Self {
        self.info_adder = info_adder;
        self
    }

    pub fn with_scorer(mut self, scorer: impl RelatednessScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn with_matcher(mut self, matcher: impl StartupMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    pub fn with_error_sink(mut self, errors: impl ErrorSink + 'static) -> Self {
        self.errors = Box::new(errors);
        self
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&UninstallerCache> {
        self.cache.as_ref()
    }

    /// Takes the cache back out, e.g. to reuse it for another run.
    pub fn into_cache(self) -> Option<UninstallerCache> {
        self.cache
    }

    /// Discovers, reconciles and enriches every installed application.
    pub fn run(&mut self, progress: &mut ProgressCallback<'_>) -> Vec<CandidateEntry> {
        let Self {
            config,
            sources,
            cache,
            info_adder,
            scorer,
            matcher,
            errors,
        } = self;
        let errors: &dyn ErrorSink = &**errors;
        let scorer: &dyn RelatednessScorer = &**scorer;

        // Find installer products
        let products = enumerate_products(&*sources.products, errors, &mut *progress);

        let plugins = &sources.plugins;
        let (registry_results, drive_results, plugin_results) = thread::scope(|scope| {
            // Store collectors never touch the cache or the product set
            let worker = scope.spawn(move || collect_plugins(plugins, scorer));

            // Registry entries
            let mut phase = PhaseReporter::start(&mut *progress, 2, TOTAL_STEPS, "Scanning registry");
            let mut registry_results = if config.scan_registry {
                let context = CollectContext {
                    products: Some(&products),
                    seed: &[],
                };
                run_collector(sources.registry.as_deref(), &context, errors, &mut phase)
            } else {
                Vec::new()
            };
            log::info!("Registry: {} entries", registry_results.len());

            // Install locations are needed to seed the directory scan
            let mut phase = PhaseReporter::start(
                &mut *progress,
                3,
                TOTAL_STEPS,
                "Gathering uninstaller information",
            );
            if let Some(cache) = cache.as_ref() {
                cache.apply(&mut registry_results);
            }
            let count = registry_results.len();
            for (index, entry) in registry_results.iter_mut().enumerate() {
                phase.inner(ListProgress::new(index, Some(count), entry.display_name_or_empty()));
                info_adder.add_missing_information(entry, true, errors);
            }

            // Program directories, seeded with what the registry knows
            let mut phase = PhaseReporter::start(
                &mut *progress,
                4,
                TOTAL_STEPS,
                "Scanning program directories",
            );
            let drive_results = if config.scan_drives {
                let context = CollectContext {
                    products: Some(&products),
                    seed: &registry_results,
                };
                run_collector(sources.drives.as_deref(), &context, errors, &mut phase)
            } else {
                Vec::new()
            };
            log::info!("Program directories: {} entries", drive_results.len());

            // Join up with the worker
            let mut phase = PhaseReporter::start(
                &mut *progress,
                5,
                TOTAL_STEPS,
                "Collecting app store entries",
            );
            let outcome = worker.join().unwrap_or_else(|payload| {
                errors.report(&DiscoveryError::WorkerPanicked {
                    message: panic_message(&*payload),
                });
                PluginOutcome::default()
            });
            let total = outcome.collectors.len();
            for (index, name) in outcome.collectors.iter().enumerate() {
                phase.inner(ListProgress::new(index, Some(total), name.as_str()));
            }
            for failure in &outcome.failures {
                errors.report(failure);
            }
            log::info!("App stores: {} entries", outcome.entries.len());

            (registry_results, drive_results, outcome.entries)
        });

        // Handle duplicate entries; program directories go last
        let mut phase = PhaseReporter::start(&mut *progress, 6, TOTAL_STEPS, "Merging duplicate entries");
        let merged = merge_results(
            registry_results,
            plugin_results,
            scorer,
            Some(&mut |report: &ListProgress| {
                phase.inner(ListProgress {
                    total: report.total.map(|t| t * 2),
                    message: "Merging app store entries".to_string(),
                    ..report.clone()
                });
            }),
        );
        let mut merged = merge_results(
            merged,
            drive_results,
            scorer,
            Some(&mut |report: &ListProgress| {
                let total = report.total.unwrap_or_default();
                phase.inner(ListProgress {
                    current: report.current + total,
                    total: Some(total * 2),
                    message: "Merging program directory entries".to_string(),
                    inner: None,
                });
            }),
        );

        // Fill in any missing information
        let mut phase = PhaseReporter::start(&mut *progress, 7, TOTAL_STEPS, "Generating missing information");
        if let Some(cache) = cache.as_ref() {
            cache.apply(&mut merged);
        }
        let count = merged.len();
        for (index, entry) in merged.iter_mut().enumerate() {
            phase.inner(ListProgress::new(index, Some(count), entry.display_name_or_empty()));
            info_adder.add_missing_information(entry, false, errors);
            let valid = is_valid(entry, &products);
            entry.set_valid(valid);
        }

        // Remember everything for the next run
        if let Some(cache) = cache.as_mut() {
            for entry in &merged {
                cache.upsert(entry);
            }
            if let Err(error) = cache.persist() {
                log::warn!("Failed to save uninstaller cache: {:#}", error);
                errors.report(&DiscoveryError::Cache { error });
            }
        }

        // Detect startups and attach them to entries
        let mut phase = PhaseReporter::start(&mut *progress, 8, TOTAL_STEPS, "Detecting startup entries");
        let startups = detect_startup_entries(&sources.startup, errors, &mut phase);
        phase.inner(ListProgress::new(1, Some(1), "Merging"));
        if let Err(error) = attach_startup_entries(&mut merged, &startups, &**matcher) {
            errors.report(&DiscoveryError::StartupAttachment { error });
        }

        log::info!("Discovery finished with {} entries", merged.len());
        merged
    }
}

fn enumerate_products(
    enumerator: &dyn ProductEnumerator,
    errors: &dyn ErrorSink,
    progress: &mut ProgressCallback<'_>,
) -> MsiProductSet {
    let mut phase = PhaseReporter::start(progress, 1, TOTAL_STEPS, "Enumerating installer products");
    match enumerator.enumerate() {
        Ok(products) => {
            let mut set = MsiProductSet::new();
            for (index, product) in products.into_iter().enumerate() {
                set.insert(product);
                phase.inner(ListProgress::new(
                    index + 1,
                    None,
                    format!("{} products found", index + 1),
                ));
            }
            set
        }
        Err(error) => {
            errors.report(&DiscoveryError::ProductEnumeration { error });
            MsiProductSet::new()
        }
    }
}

fn run_collector(
    collector: Option<&dyn Collector>,
    context: &CollectContext<'_>,
    errors: &dyn ErrorSink,
    phase: &mut PhaseReporter<'_, '_>,
) -> Vec<CandidateEntry> {
    let Some(collector) = collector.filter(|c| c.is_enabled()) else {
        return Vec::new();
    };

    match collect_guarded(collector, context, &mut |report| phase.inner(report.clone())) {
        Ok(entries) => entries,
        Err(failure) => {
            errors.report(&failure);
            Vec::new()
        }
    }
}

/// Runs one collector, turning a panic into an ordinary collector failure.
fn collect_guarded(
    collector: &dyn Collector,
    context: &CollectContext<'_>,
    progress: &mut dyn FnMut(&ListProgress),
) -> Result<Vec<CandidateEntry>, DiscoveryError> {
    let name = collector.display_name().to_string();
    match panic::catch_unwind(AssertUnwindSafe(|| collector.collect(context, progress))) {
        Ok(Ok(entries)) => Ok(entries),
        Ok(Err(error)) => Err(DiscoveryError::Collector { name, error }),
        Err(payload) => Err(DiscoveryError::Collector {
            name,
            error: anyhow!("collector panicked: {}", panic_message(&*payload)),
        }),
    }
}

#[derive(Default)]
struct PluginOutcome {
    entries: Vec<CandidateEntry>,
    collectors: Vec<String>,
    failures: Vec<DiscoveryError>,
}

/// Runs the store collectors one after another, merging as it goes so a
/// later failure cannot spoil earlier results.
fn collect_plugins(collectors: &[Box<dyn Collector>], scorer: &dyn RelatednessScorer) -> PluginOutcome {
    let mut outcome = PluginOutcome::default();
    let context = CollectContext::default();

    for collector in collectors.iter().filter(|c| c.is_enabled()) {
        let name = collector.display_name().to_string();
        match collect_guarded(&**collector, &context, &mut |_| {}) {
            Ok(found) => {
                let so_far = mem::take(&mut outcome.entries);
                outcome.entries = merge_results(so_far, found, scorer, None);
            }
            Err(failure) => outcome.failures.push(failure),
        }
        outcome.collectors.push(name);
    }

    outcome
}

fn detect_startup_entries(
    sources: &[Box<dyn StartupSource>],
    errors: &dyn ErrorSink,
    phase: &mut PhaseReporter<'_, '_>,
) -> Vec<Arc<StartupEntry>> {
    let mut startups = Vec::new();

    for (index, source) in sources.iter().enumerate() {
        phase.inner(ListProgress::new(index, Some(sources.len()), source.name()));
        match source.detect() {
            Ok(found) => startups.extend(found.into_iter().map(Arc::new)),
            Err(error) => errors.report(&DiscoveryError::StartupSource {
                name: source.name().to_string(),
                error,
            }),
        }
    }

    startups
}
