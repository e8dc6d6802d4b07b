//! Stock providers for confmux
//!
//! | provider | name | depends on | source |
//! |---|---|---|---|
//! | [`DefaultProvider`] | `default` | | fixed values |
//! | [`EnvProvider`] | `env` | `default` | prefixed environment variables |
//! | [`ArgsProvider`] | `cli` | `default` | `-key=value` flags |
//! | [`YamlProvider`] | `yaml` | `cli`, `env` | YAML file, path from `config.path` |
//!
//! Every provider registers all of its keys during set-up and serves them
//! from memory afterwards.

pub mod args;
pub mod default;
pub mod env;
pub mod error;
pub mod yaml;

pub use args::ArgsProvider;
pub use default::DefaultProvider;
pub use env::EnvProvider;
pub use error::{Error, Result};
pub use yaml::{CONFIG_PATH_KEY, YamlProvider};
