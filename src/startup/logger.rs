//! Startup and discovery summary logging

use crate::config::{Config, EnvironmentOverrides};
use crate::registry::DiscoveryReport;
use std::path::Path;
use tracing::{info, warn};

/// Startup logger for configuration and discovery information
pub struct StartupLogger;

impl StartupLogger {
    /// Display configuration information at startup
    pub fn display_startup_info(config: &Config, config_path: &Path, overrides: &EnvironmentOverrides, version: &str) {
        info!("🚀 capbridge v{} starting...", version);
        info!("");

        Self::display_configuration(config, config_path);

        if overrides.has_overrides() {
            Self::display_environment_overrides(overrides);
        }
    }

    fn display_configuration(config: &Config, config_path: &Path) {
        info!("📁 Configuration:");
        if config_path.exists() {
            info!("   Config file: {:?} ✅", config_path);
        } else {
            info!("   Config file: built-in defaults (no config file found)");
        }
        info!("   Discovery workers: {}", config.discovery.workers);
        info!("   Max catalog key length: {}", config.catalog.max_key_length);
        info!("   Page cap: {}", config.catalog.page_cap);
        match &config.discovery.docs_dir {
            Some(dir) => info!("   Summary overrides: {:?}", dir),
            None => info!("   Summary overrides: none"),
        }
        info!("   Document providers: {}", config.providers.len());
        for provider in &config.providers {
            match provider.location() {
                Ok(location) => info!("      - {} ({})", provider.name, location),
                Err(e) => warn!("      - {} ❌ {}", provider.name, e),
            }
        }
        info!("");
    }

    fn display_environment_overrides(overrides: &EnvironmentOverrides) {
        info!("🔧 Environment Overrides:");
        for override_info in overrides.get_override_summary() {
            info!("   ✅ {}", override_info);
        }
        info!("");
    }

    /// Display the outcome of a discovery run
    pub fn display_discovery_report(report: &DiscoveryReport) {
        info!("📊 Discovery Results:");
        for outcome in &report.providers {
            match &outcome.error {
                Some(error) => warn!("   ❌ {}: {}", outcome.provider, error),
                None => info!(
                    "   ✅ {}: {} adapters ({} conflicts, {} skipped) in {}ms",
                    outcome.provider,
                    outcome.registered.len(),
                    outcome.conflicts.len(),
                    outcome.skipped.len(),
                    outcome.duration_ms
                ),
            }
            for conflict in &outcome.conflicts {
                warn!("      ⚠️  conflict: {}", conflict);
            }
        }

        let failed = report.failed_providers().len();
        if failed == 0 {
            info!(
                "   ✨ {} adapters registered from {} providers in {}ms",
                report.total_registered(),
                report.providers.len(),
                report.duration_ms
            );
        } else {
            warn!(
                "   📝 {} adapters registered, {} of {} providers failed",
                report.total_registered(),
                failed,
                report.providers.len()
            );
        }
        info!("");
    }
}
