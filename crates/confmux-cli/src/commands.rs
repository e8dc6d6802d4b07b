//! Command implementations

use std::fmt::Write as _;
use std::sync::Arc;

use confmux_core::{Repository, Value};
use confmux_providers::{ArgsProvider, DefaultProvider, EnvProvider, YamlProvider};

use crate::cli::Cli;
use crate::error::{CliError, Result};

pub const CLI_WEIGHT: i64 = 40;
pub const ENV_WEIGHT: i64 = 30;
pub const YAML_WEIGHT: i64 = 20;
pub const DEFAULT_WEIGHT: i64 = 10;

/// Wire the stock providers into a repository and initialize it.
pub fn build_repository(cli: &Cli) -> Result<Repository> {
    let repo = Repository::new();

    repo.register_provider(Arc::new(DefaultProvider::new(DEFAULT_WEIGHT)))?;
    repo.register_provider(Arc::new(
        EnvProvider::new(ENV_WEIGHT).with_prefix(cli.env_prefix.as_str()),
    ))?;
    repo.register_provider(Arc::new(
        ArgsProvider::new(CLI_WEIGHT).with_args(cli.overrides.iter().map(|kv| format!("--{kv}"))),
    ))?;
    let yaml = match &cli.config {
        Some(path) => YamlProvider::from_source(YAML_WEIGHT, path),
        None => YamlProvider::new(YAML_WEIGHT).optional(),
    };
    repo.register_provider(Arc::new(yaml))?;

    repo.set_up()?;
    tracing::debug!(order = ?repo.init_order(), "Providers initialized");
    Ok(repo)
}

/// Resolve `key` and render it for stdout.
pub fn run_get(repo: &Repository, key: &str, json: bool) -> Result<String> {
    let value = repo
        .get(key)?
        .ok_or_else(|| CliError::user(format!("Key not found: {key}")))?;
    render_value(&value, json)
}

pub fn render_value(value: &Value, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(value.to_string())
    }
}

/// One line per registered key: the key, then its providers in priority order.
pub fn run_keys(repo: &Repository) -> String {
    let mut out = String::new();
    for key in repo.keys() {
        let providers = repo.providers_for(&key);
        let _ = writeln!(out, "{key}\t{}", providers.join(","));
    }
    out
}
