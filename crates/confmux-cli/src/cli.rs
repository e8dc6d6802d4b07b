//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use confmux_providers::env::DEFAULT_PREFIX;

/// confmux - Resolve configuration from flags, environment and YAML files
#[derive(Parser, Debug)]
#[command(name = "confmux")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// YAML file to load (otherwise taken from the `config.path` key, if set)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Prefix of the environment variables to read
    #[arg(long, global = true, default_value = DEFAULT_PREFIX, value_name = "PREFIX")]
    pub env_prefix: String,

    /// Override a key, highest priority (repeatable)
    #[arg(long = "set", global = true, value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the resolved value of a key
    ///
    /// A key with nested keys below it prints as a map.
    ///
    /// Examples:
    ///   confmux get server.port
    ///   confmux --set server.port=9000 get server --json
    Get {
        /// Dotted key to resolve
        key: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List every registered key with the providers serving it
    Keys,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_get_with_globals() {
        let cli = Cli::try_parse_from([
            "confmux",
            "--set",
            "a=1",
            "get",
            "server.port",
            "--json",
            "--set",
            "b=2",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Commands::Get {
                key: "server.port".to_string(),
                json: true
            }
        );
        assert_eq!(cli.overrides, vec!["a=1", "b=2"]);
        assert_eq!(cli.env_prefix, "CONFIG_");
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_keys_with_config() {
        let cli = Cli::try_parse_from(["confmux", "-v", "--config", "app.yaml", "keys"]).unwrap();
        assert_eq!(cli.command, Commands::Keys);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("app.yaml")));
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["confmux"]).is_err());
    }
}
