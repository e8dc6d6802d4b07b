//! Error types for confmux-providers

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("No config file given and '{key}' is not set")]
    MissingSource { key: String },

    #[error("'{key}' must be a string path, found {found}")]
    InvalidSource { key: String, found: String },

    #[error("Unsupported mapping key in {path}: {key}")]
    UnsupportedKey { path: PathBuf, key: String },

    #[error("Unsupported value at '{key}' in {path}: {kind}")]
    UnsupportedValue {
        path: PathBuf,
        key: String,
        kind: &'static str,
    },
}

impl From<Error> for confmux_core::Error {
    /// Only file-backed providers fail, so the error is attributed to `yaml`.
    fn from(err: Error) -> Self {
        confmux_core::Error::provider(crate::yaml::NAME, err)
    }
}
