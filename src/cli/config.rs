//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliStrategy};
use crate::config::{EraserConfig, EraserConfigBuilder, GenerativeConfig, RemovalStrategy};
use anyhow::{Context, Result};

/// Convert CLI arguments to an `EraserConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the effective configuration: file (or defaults), then flags
    pub(crate) fn from_cli(cli: &Cli) -> Result<EraserConfig> {
        let base = match &cli.config {
            Some(path) => EraserConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => {
                let mut config = EraserConfig::default();
                config.removal.generative.api_key = GenerativeConfig::api_key_from_env();
                config
            },
        };

        let mut builder = EraserConfigBuilder::from_config(base);

        if let Some(strategy) = cli.strategy {
            builder = builder.strategy(strategy.into());
        }
        if let Some(endpoint) = &cli.endpoint {
            builder = builder.endpoint(endpoint.clone());
        }
        if let Some(root) = &cli.storage_root {
            builder = builder.storage_root(root.clone());
        }
        if let Some(max) = cli.max_upload_bytes {
            builder = builder.max_upload_bytes(max);
        }
        if let Some(timeout) = cli.timeout_secs {
            builder = builder.timeout_secs(timeout);
        }
        if cli.verify_content {
            builder = builder.verify_content(true);
        }
        if let Some(model) = &cli.model {
            builder = builder.generative_model(model.clone());
        }
        if let Some(bind) = &cli.bind {
            builder = builder.bind_address(bind.clone());
        }

        builder.build().context("Invalid configuration")
    }

    /// Validate flag combinations that clap cannot express
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.serve && !cli.input.is_empty() {
            anyhow::bail!("--serve does not take input files");
        }

        if let Some(pattern) = &cli.pattern {
            glob::Pattern::new(pattern)
                .with_context(|| format!("Invalid --pattern '{}'", pattern))?;
        }

        if cli.json && cli.progress {
            anyhow::bail!("--progress cannot be combined with --json");
        }

        Ok(())
    }
}

impl From<CliStrategy> for RemovalStrategy {
    fn from(strategy: CliStrategy) -> Self {
        match strategy {
            CliStrategy::RemoteService => RemovalStrategy::RemoteService,
            CliStrategy::GenerativeModel => RemovalStrategy::GenerativeModel,
        }
    }
}
