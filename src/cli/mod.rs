//! CLI Commands
//!
//! Implementations behind the `init`, `run`, `status`, and `config`
//! subcommands.

use std::sync::Arc;

use console::style;
use tracing::info;

use crate::config::{Config, ConfigLoader};
use crate::generator::create_generator;
use crate::pipeline::{HandoffPipeline, Orchestrator, PipelineStatus, StageContract, Topology};
use crate::storage::{ProfileStore, SharedStore, SqliteStore};
use crate::types::{PersonaError, Result};

// =============================================================================
// init
// =============================================================================

/// Create the project directory, default config, and database schema.
pub fn init(force: bool) -> Result<()> {
    let project_dir = ConfigLoader::init_project(force)?;

    let config = ConfigLoader::load()?;
    SqliteStore::open_with_config(
        &config.storage.database_path,
        config.storage.pool_config(),
    )?;

    println!(
        "{} Initialized PersonaWeave in {}",
        style("✓").green(),
        project_dir.display()
    );
    println!("  Database: {}", config.storage.database_path.display());
    println!("  Edit {} to configure the generator.", ConfigLoader::project_config_path().display());
    Ok(())
}

// =============================================================================
// run
// =============================================================================

/// Options for the `run` command.
pub struct RunOptions {
    pub count: usize,
    pub topology: Topology,
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// Execute one or more pipeline runs and print per-run outcomes.
pub async fn run(options: RunOptions) -> Result<()> {
    if !ConfigLoader::is_project_initialized() {
        return Err(PersonaError::NotInitialized);
    }

    let mut config = ConfigLoader::load()?;
    if let Some(provider) = options.provider {
        config.generator.provider = provider;
    }
    if let Some(model) = options.model {
        config.generator.model = Some(model);
    }

    let generator = create_generator(&config.generator)?;
    let store = open_store(&config)?;
    info!(
        "Running {} pipeline(s) via {} topology with provider '{}'",
        options.count,
        options.topology,
        config.generator.provider
    );

    let contracts = match options.topology {
        Topology::Direct => {
            Orchestrator::with_timeouts(generator, store, config.timeouts())
                .run_batch(options.count)
                .await
        }
        Topology::Handoff => {
            // Handoff dispatch is strictly per-run; batches iterate
            let pipeline = HandoffPipeline::with_timeouts(generator, store, config.timeouts());
            let mut contracts = Vec::with_capacity(options.count);
            for _ in 0..options.count {
                contracts.push(pipeline.run().await);
            }
            contracts
        }
    };

    report(&contracts);
    Ok(())
}

fn report(contracts: &[StageContract]) {
    let mut persisted = 0usize;
    for contract in contracts {
        match contract.status() {
            PipelineStatus::Persisted => {
                persisted += 1;
                println!(
                    "{} run {} persisted: {}",
                    style("✓").green(),
                    contract.run_id,
                    contract.final_message.as_deref().unwrap_or("ok")
                );
            }
            _ => {
                let detail = contract
                    .error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown failure".to_string());
                println!(
                    "{} run {} failed: {}",
                    style("✗").red(),
                    contract.run_id,
                    detail
                );
            }
        }
    }

    println!(
        "\n{} persisted, {} failed",
        style(persisted).green(),
        style(contracts.len() - persisted).red()
    );
}

// =============================================================================
// status
// =============================================================================

/// Show the persisted corpus: row count and aggregates.
pub fn status(format: &str) -> Result<()> {
    if !ConfigLoader::is_project_initialized() {
        return Err(PersonaError::NotInitialized);
    }

    let config = ConfigLoader::load()?;
    let store = open_store(&config)?;
    let summary = store.corpus_summary()?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => {
            println!("{}", style("Profile corpus").bold());
            print!("{}", summary.render());
        }
    }
    Ok(())
}

// =============================================================================
// config
// =============================================================================

/// Show the effective merged configuration.
pub fn config_show(format: &str) -> Result<()> {
    let config = ConfigLoader::load()?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&config)?),
        _ => println!(
            "{}",
            toml::to_string_pretty(&config).map_err(|e| PersonaError::Config(e.to_string()))?
        ),
    }
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn open_store(config: &Config) -> Result<SharedStore> {
    let store = SqliteStore::open_with_config(
        &config.storage.database_path,
        config.storage.pool_config(),
    )?;
    Ok(Arc::new(store) as SharedStore)
}
