//! Built-in collectors.
//!
//! - [`DirectoryCollector`]: program directories holding an uninstaller
//! - [`SteamCollector`]: games installed through the Steam client

pub mod directory;
pub mod steam;

pub use directory::DirectoryCollector;
pub use steam::SteamCollector;

use crate::collector::Collector;
use crate::config::DiscoveryConfig;

/// Collectors run on the background worker, in this order.
pub fn plugin_collectors(config: &DiscoveryConfig) -> Vec<Box<dyn Collector>> {
    let mut collectors: Vec<Box<dyn Collector>> = Vec::new();
    collectors.push(Box::new(SteamCollector::from_config(config)));
    collectors
}
