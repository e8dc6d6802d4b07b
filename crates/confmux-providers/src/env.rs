//! Prefixed environment variables
//!
//! `CONFIG_SERVER_PORT=8080` becomes `server.port = "8080"`. Inside the key a
//! single underscore separates segments and a double underscore stands for a
//! literal underscore, so `CONFIG_LOG__LEVEL` becomes `log_level`.

use std::collections::HashMap;

use confmux_core::{Key, Provider, Repository, Result, Value};
use parking_lot::RwLock;

pub const NAME: &str = "env";

/// Prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "CONFIG_";

#[derive(Debug)]
pub struct EnvProvider {
    weight: i64,
    prefix: String,
    vars: Option<Vec<String>>,
    values: RwLock<HashMap<Key, Value>>,
}

impl EnvProvider {
    pub fn new(weight: i64) -> Self {
        Self {
            weight,
            prefix: DEFAULT_PREFIX.to_string(),
            vars: None,
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Read these `NAME=value` entries instead of the process environment.
    pub fn with_vars<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vars = Some(vars.into_iter().map(Into::into).collect());
        self
    }

    fn environment(&self) -> Vec<String> {
        match &self.vars {
            Some(vars) => vars.clone(),
            None => std::env::vars_os()
                .filter_map(|(k, v)| Some(format!("{}={}", k.to_str()?, v.to_str()?)))
                .collect(),
        }
    }
}

/// Turn the part of a variable name after the prefix into a dotted key.
pub fn canonicalize(name: &str) -> String {
    name.replace('_', ".").replace("..", "_").to_lowercase()
}

/// Split a raw `NAME=value` entry. An entry without `=` is a flag set to true.
fn parse_entry(entry: &str) -> (&str, Value) {
    match entry.split_once('=') {
        Some((name, value)) => (name, Value::from(value)),
        None => (entry, Value::Bool(true)),
    }
}

impl Provider for EnvProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn depends(&self) -> Vec<String> {
        vec![crate::default::NAME.to_string()]
    }

    fn weight(&self) -> i64 {
        self.weight
    }

    fn set_up(&self, repo: &Repository) -> Result<()> {
        let mut values = HashMap::new();
        for entry in self.environment() {
            let Some(rest) = entry.strip_prefix(&self.prefix) else {
                continue;
            };
            let (name, value) = parse_entry(rest);
            let key = Key::new(&canonicalize(name));
            if key.is_empty() {
                tracing::debug!(variable = %entry, "Skipping variable with an empty key");
                continue;
            }
            values.insert(key, value);
        }

        for key in values.keys() {
            repo.register_key(key.clone(), NAME)?;
        }
        tracing::debug!(prefix = %self.prefix, keys = values.len(), "Loaded environment");
        *self.values.write() = values;
        Ok(())
    }

    fn get(&self, key: &Key) -> Option<Value> {
        self.values.read().get(key).cloned()
    }
}
