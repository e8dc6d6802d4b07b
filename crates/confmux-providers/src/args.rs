//! Command-line flags
//!
//! Accepts `-key=value` and `--key=value`. A flag without `=` is set to
//! `true`. Tokens that do not start with `-`, and the `--` terminator, are
//! ignored.

use std::collections::HashMap;

use confmux_core::{Key, Provider, Repository, Result, Value};
use parking_lot::RwLock;

pub const NAME: &str = "cli";

#[derive(Debug)]
pub struct ArgsProvider {
    weight: i64,
    args: Option<Vec<String>>,
    values: RwLock<HashMap<Key, Value>>,
}

impl ArgsProvider {
    pub fn new(weight: i64) -> Self {
        Self {
            weight,
            args: None,
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Parse these tokens instead of the process arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    fn tokens(&self) -> Vec<String> {
        match &self.args {
            Some(args) => args.clone(),
            None => std::env::args().skip(1).collect(),
        }
    }
}

/// Parse one token into a key and value, or `None` if it is not a flag.
pub fn parse_flag(token: &str) -> Option<(Key, Value)> {
    let flag = token
        .strip_prefix("--")
        .or_else(|| token.strip_prefix('-'))?;
    let (name, value) = match flag.split_once('=') {
        Some((name, value)) => (name, Value::from(value)),
        None => (flag, Value::Bool(true)),
    };
    let key = Key::new(name);
    (!key.is_empty()).then_some((key, value))
}

impl Provider for ArgsProvider {
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
        for token in self.tokens() {
            match parse_flag(&token) {
                // Later flags override earlier ones
                Some((key, value)) => {
                    values.insert(key, value);
                }
                None => tracing::trace!(%token, "Ignoring non-flag argument"),
            }
        }

        for key in values.keys() {
            repo.register_key(key.clone(), NAME)?;
        }
        tracing::debug!(keys = values.len(), "Parsed command-line flags");
        *self.values.write() = values;
        Ok(())
    }

    fn get(&self, key: &Key) -> Option<Value> {
        self.values.read().get(key).cloned()
    }
}
