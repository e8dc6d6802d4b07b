//! Fixed default values

use std::collections::HashMap;

use confmux_core::{Key, Provider, Repository, Result, Value};

pub const NAME: &str = "default";

/// Serves a fixed set of values, normally at the lowest weight.
///
/// Keeping defaults in one provider guarantees they are present whichever
/// other providers are active.
#[derive(Debug, Default)]
pub struct DefaultProvider {
    weight: i64,
    values: HashMap<Key, Value>,
}

impl DefaultProvider {
    pub fn new(weight: i64) -> Self {
        Self {
            weight,
            values: HashMap::new(),
        }
    }

    /// Replace the served values. Keys use the dotted string form.
    pub fn with_defaults<I, K, V>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.values = defaults
            .into_iter()
            .map(|(k, v)| (Key::new(k.as_ref()), v.into()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        self
    }
}

impl Provider for DefaultProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn weight(&self) -> i64 {
        self.weight
    }

    fn set_up(&self, repo: &Repository) -> Result<()> {
        for key in self.values.keys() {
            repo.register_key(key.clone(), NAME)?;
        }
        tracing::debug!(keys = self.values.len(), "Registered default values");
        Ok(())
    }

    fn get(&self, key: &Key) -> Option<Value> {
        self.values.get(key).cloned()
    }
}
