//! YAML configuration file
//!
//! Nested mappings are flattened into dotted keys:
//!
//! ```yaml
//! server:
//!   port: 8080
//!   hosts: [a, b]
//! ```
//!
//! registers `server.port` and `server.hosts`. Only scalars and sequences of
//! scalars are stored; composite values are assembled by the repository.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use confmux_core::{Key, Provider, Repository, Value};
use parking_lot::RwLock;
use serde_yaml::Value as Yaml;

use crate::error::{Error, Result};

pub const NAME: &str = "yaml";

/// Key holding the config file path when no explicit source is given.
pub const CONFIG_PATH_KEY: &str = "config.path";

#[derive(Debug)]
pub struct YamlProvider {
    weight: i64,
    source: Option<PathBuf>,
    depends: Vec<String>,
    optional: bool,
    values: RwLock<HashMap<Key, Value>>,
}

impl YamlProvider {
    /// Read the file named by [`CONFIG_PATH_KEY`] at set-up.
    pub fn new(weight: i64) -> Self {
        Self {
            weight,
            source: None,
            depends: vec![
                crate::args::NAME.to_string(),
                crate::env::NAME.to_string(),
            ],
            optional: false,
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Read the given file, ignoring [`CONFIG_PATH_KEY`].
    pub fn from_source(weight: i64, path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            ..Self::new(weight)
        }
    }

    /// Replace the providers that must be ready before the path is looked up.
    pub fn with_depends<I, S>(mut self, depends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends = depends.into_iter().map(Into::into).collect();
        self
    }

    /// Serve nothing, instead of failing, when no path is configured.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    fn resolve_source(&self, repo: &Repository) -> confmux_core::Result<Option<PathBuf>> {
        if let Some(path) = &self.source {
            return Ok(Some(path.clone()));
        }
        match repo.get(CONFIG_PATH_KEY)? {
            Some(Value::Str(path)) => Ok(Some(PathBuf::from(path))),
            Some(other) => Err(Error::InvalidSource {
                key: CONFIG_PATH_KEY.to_string(),
                found: other.kind().to_string(),
            }
            .into()),
            None if self.optional => Ok(None),
            None => Err(Error::MissingSource {
                key: CONFIG_PATH_KEY.to_string(),
            }
            .into()),
        }
    }
}

/// Read and flatten a YAML file into dotted keys.
pub fn load(path: &Path) -> Result<HashMap<Key, Value>> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(path, &text)
}

/// Parse YAML text; `path` is only used in error messages.
pub fn parse(path: &Path, text: &str) -> Result<HashMap<Key, Value>> {
    let doc: Yaml = serde_yaml::from_str(text).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut out = HashMap::new();
    match doc {
        Yaml::Null => {}
        Yaml::Mapping(mapping) => flatten(path, &Key::root(), &mapping, &mut out)?,
        other => {
            return Err(Error::UnsupportedValue {
                path: path.to_path_buf(),
                key: String::new(),
                kind: kind(&other),
            });
        }
    }
    Ok(out)
}

fn flatten(
    path: &Path,
    prefix: &Key,
    mapping: &serde_yaml::Mapping,
    out: &mut HashMap<Key, Value>,
) -> Result<()> {
    for (name, item) in mapping {
        let segment = mapping_key(path, name)?;
        let key = prefix.child(&segment);
        match item {
            Yaml::Mapping(nested) => flatten(path, &key, nested, out)?,
            other => {
                out.insert(key.clone(), convert(path, &key, other)?);
            }
        }
    }
    Ok(())
}

fn mapping_key(path: &Path, name: &Yaml) -> Result<String> {
    match name {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        other => Err(Error::UnsupportedKey {
            path: path.to_path_buf(),
            key: format!("{other:?}"),
        }),
    }
}

fn convert(path: &Path, key: &Key, item: &Yaml) -> Result<Value> {
    let value = match item {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::Uint(u)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Yaml::String(s) => Value::Str(s.clone()),
        Yaml::Sequence(items) => Value::Seq(
            items
                .iter()
                .map(|entry| match entry {
                    Yaml::Mapping(_) => Err(Error::UnsupportedValue {
                        path: path.to_path_buf(),
                        key: key.to_string(),
                        kind: "mapping inside a sequence",
                    }),
                    other => convert(path, key, other),
                })
                .collect::<Result<Vec<_>>>()?,
        ),
        other => {
            return Err(Error::UnsupportedValue {
                path: path.to_path_buf(),
                key: key.to_string(),
                kind: kind(other),
            });
        }
    };
    Ok(value)
}

fn kind(item: &Yaml) -> &'static str {
    match item {
        Yaml::Null => "null",
        Yaml::Bool(_) => "bool",
        Yaml::Number(_) => "number",
        Yaml::String(_) => "string",
        Yaml::Sequence(_) => "sequence",
        Yaml::Mapping(_) => "mapping",
        Yaml::Tagged(_) => "tagged value",
    }
}

impl Provider for YamlProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn depends(&self) -> Vec<String> {
        self.depends.clone()
    }

    fn weight(&self) -> i64 {
        self.weight
    }

    fn set_up(&self, repo: &Repository) -> confmux_core::Result<()> {
        let Some(path) = self.resolve_source(repo)? else {
            tracing::debug!("No config file configured, skipping");
            return Ok(());
        };
        tracing::info!(path = %path.display(), "Loading config file");
        let values = load(&path)?;

        for key in values.keys() {
            repo.register_key(key.clone(), NAME)?;
        }
        tracing::debug!(path = %path.display(), keys = values.len(), "Loaded config file");
        *self.values.write() = values;
        Ok(())
    }

    fn get(&self, key: &Key) -> Option<Value> {
        self.values.read().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parsed(text: &str) -> Result<HashMap<Key, Value>> {
        parse(Path::new("test.yaml"), text)
    }

    #[test]
    fn test_flattens_nested_mappings() {
        let values = parsed("server:\n  port: 8080\n  tls:\n    enabled: true\nname: app\n").unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[&Key::new("server.port")], Value::Int(8080));
        assert_eq!(values[&Key::new("server.tls.enabled")], Value::Bool(true));
        assert_eq!(values[&Key::new("name")], Value::from("app"));
    }

    #[test]
    fn test_scalar_kinds() {
        let values = parsed("f: 1.5\nn: ~\nbig: 18446744073709551615\nneg: -3\n").unwrap();
        assert_eq!(values[&Key::new("f")], Value::Float(1.5));
        assert_eq!(values[&Key::new("n")], Value::Null);
        assert_eq!(values[&Key::new("big")], Value::Uint(u64::MAX));
        assert_eq!(values[&Key::new("neg")], Value::Int(-3));
    }

    #[test]
    fn test_non_string_mapping_keys() {
        let values = parsed("ports:\n  80: http\n  443: https\nflags:\n  true: enabled\n").unwrap();
        assert_eq!(values[&Key::new("ports.80")], Value::from("http"));
        assert_eq!(values[&Key::new("ports.443")], Value::from("https"));
        assert_eq!(values[&Key::new("flags.true")], Value::from("enabled"));
    }

    #[test]
    fn test_sequences_of_scalars() {
        let values = parsed("hosts:\n  - a\n  - b\nids: [1, 2]\n").unwrap();
        assert_eq!(values[&Key::new("hosts")], Value::from(vec!["a", "b"]));
        assert_eq!(values[&Key::new("ids")], Value::from(vec![1i64, 2]));
    }

    #[test]
    fn test_mapping_inside_sequence_is_rejected() {
        let err = parsed("servers:\n  - host: a\n").unwrap_err();
        assert!(matches!(err, Error::UnsupportedValue { ref key, .. } if key == "servers"));
    }

    #[test]
    fn test_empty_document() {
        assert!(parsed("").unwrap().is_empty());
    }

    #[test]
    fn test_top_level_scalar_is_rejected() {
        assert!(matches!(
            parsed("just text"),
            Err(Error::UnsupportedValue { .. })
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(parsed("a: [1, 2"), Err(Error::Parse { .. })));
    }
}
