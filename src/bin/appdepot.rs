use appdepot_core::cache::default_cache_path;
use appdepot_core::{DiscoveryConfig, DiscoverySources, ListProgress, UninstallerDiscovery};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "List installed applications and their uninstallers", long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Uninstaller cache file (defaults to the user cache directory)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Do not use the uninstaller cache
    #[arg(long)]
    no_cache: bool,

    #[arg(long)]
    no_registry: bool,

    #[arg(long)]
    no_drives: bool,

    #[arg(long)]
    no_steam: bool,

    /// Print the inventory as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut config = match &args.config {
        Some(path) => DiscoveryConfig::load(path)?,
        None => DiscoveryConfig::default(),
    };
    if args.no_registry {
        config.scan_registry = false;
    }
    if args.no_drives {
        config.scan_drives = false;
    }
    if args.no_steam {
        config.scan_steam = false;
    }
    if args.no_cache {
        config.cache_path = None;
    } else if let Some(cache) = args.cache {
        config.cache_path = Some(cache);
    } else if config.cache_path.is_none() {
        match default_cache_path() {
            Ok(path) => config.cache_path = Some(path),
            Err(e) => log::warn!("Running without uninstaller cache: {:#}", e),
        }
    }

    let sources = DiscoverySources::for_platform(&config);
    let mut discovery = UninstallerDiscovery::new(config, sources);
    let entries = discovery.run(&mut |progress: &ListProgress| {
        if progress.inner.is_none() {
            eprintln!("{}", progress);
        }
    });

    if args.json {
        let list: Vec<_> = entries.iter().map(|e| e.summary_json()).collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    println!("Installed applications: {}", entries.len());
    for entry in &entries {
        let marker = if entry.is_valid() { " " } else { "!" };
        println!(
            "{} {:<40} {:?}  {}",
            marker,
            entry.display_name_or_empty(),
            entry.kind,
            entry.uninstall_string
        );
        for startup in entry.startup_entries() {
            println!("      startup: {} ({})", startup.name, startup.source);
        }
    }

    Ok(())
}
