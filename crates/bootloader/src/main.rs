//! Bootloader entry point
//!
//! Loads the configuration, sets up logging, registers the bundled module
//! loaders and runs a core server until a shutdown signal arrives.

mod cli;
mod config;
mod logging;
mod signals;

use anyhow::Context;
use cli::CliArgs;
use config::AppConfig;
use core_server::{CoreServer, InitializationReport, LoaderRegistry};
use module_api::Server;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A configured server ready to start.
pub struct Application {
    config: AppConfig,
    no_wait: bool,
    server: Arc<CoreServer>,
}

impl Application {
    /// Loads the configuration and discovers every module.
    pub async fn new(args: CliArgs) -> anyhow::Result<Self> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_overrides(&args)?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

        logging::setup_logging(&config.logging)?;
        info!(
            "🚀 Module Host Bootloader v{} | Config: {}",
            env!("CARGO_PKG_VERSION"),
            args.config_path.display()
        );

        let registry = Self::registry(&config);
        info!("🔌 Registered module loaders: {:?}", registry.names());

        let server = CoreServer::new(registry, config.core.clone())
            .await
            .context("Module discovery failed")?;

        Ok(Self {
            config,
            no_wait: args.no_wait,
            server,
        })
    }

    fn registry(config: &AppConfig) -> LoaderRegistry {
        let mut registry = LoaderRegistry::new();
        if config.greeter.enabled {
            registry.register(config.greeter.to_loader());
        }
        registry
    }

    /// Initializes every module, then waits for a shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        info!("📋 Configuration Summary:");
        info!("  🛡️ Failure policy: {}", self.config.core.failure_policy);
        info!("  🧩 Modules discovered: {}", self.server.modules().len());

        let report = self.server.start().await?;
        self.summarize(&report);

        if self.no_wait {
            return Ok(());
        }

        info!("✅ Server {} is now {}", self.server.id(), self.server.lifecycle());
        info!("🛑 Press Ctrl+C to gracefully shutdown");
        let signal = signals::wait_for_shutdown().await?;

        info!("🛑 {} received, module states at shutdown:", signal);
        for status in self.server.module_statuses() {
            info!("  - {} ({}): {}", status.name, status.module_type, status.lifecycle);
        }
        info!("👋 Bootloader shutdown complete");
        Ok(())
    }

    fn summarize(&self, report: &InitializationReport) {
        let status = self.server.status();
        if report.is_clean() {
            info!("📊 All {} modules reached INITIALIZED", status.modules.len());
            return;
        }

        for failure in &report.failures {
            warn!("  ❌ {} at {}: {}", failure.module_type, failure.target, failure.error);
        }
        for module in status.lagging_modules() {
            warn!("  ⏸️ {} stopped at {}", module.name, module.lifecycle);
        }
        if !report.quarantined.is_empty() {
            warn!("  🚧 {} modules were quarantined", report.quarantined.len());
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = CliArgs::parse();

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start application: {:?}", e);
            std::process::exit(1);
        }
    }
}
