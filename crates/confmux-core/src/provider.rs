//! Provider trait, lifecycle states and the readiness gate

use std::fmt;

use parking_lot::{Condvar, Mutex};

use crate::{Key, Repository, Result, Value};

/// A pluggable source of configuration values.
///
/// The [`Repository`] calls [`set_up`](Provider::set_up) once, after every
/// provider named in [`depends`](Provider::depends) is ready. During set-up the
/// provider must register every key it may ever serve through
/// [`Repository::register_key`]; later registrations are rejected.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use confmux_core::{Key, Provider, Repository, Result, Value};
///
/// struct Fixed;
///
/// impl Provider for Fixed {
///     fn name(&self) -> &str { "fixed" }
///     fn weight(&self) -> i64 { 0 }
///     fn set_up(&self, repo: &Repository) -> Result<()> {
///         repo.register_key(Key::new("answer"), self.name())
///     }
///     fn get(&self, key: &Key) -> Option<Value> {
///         (key == &Key::new("answer")).then(|| Value::Int(42))
///     }
/// }
///
/// let repo = Repository::new();
/// repo.register_provider(Arc::new(Fixed)).unwrap();
/// repo.set_up().unwrap();
/// assert_eq!(repo.get("answer").unwrap(), Some(Value::Int(42)));
/// ```
pub trait Provider: Send + Sync {
    /// Unique identifier, referenced by other providers' dependencies.
    fn name(&self) -> &str;

    /// Names of providers that must be ready before this one sets up.
    fn depends(&self) -> Vec<String> {
        Vec::new()
    }

    /// Resolution priority; higher wins.
    fn weight(&self) -> i64;

    fn set_up(&self, repo: &Repository) -> Result<()>;

    /// Release background resources. Must not block indefinitely.
    fn tear_down(&self, _repo: &Repository) -> Result<()> {
        Ok(())
    }

    /// Value for `key`, or `None` if there is nothing to serve right now.
    fn get(&self, key: &Key) -> Option<Value>;
}

/// Lifecycle of a provider inside a [`Repository`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderState {
    Registered,
    SettingUp,
    Ready,
    /// `set_up` returned an error. The provider is still torn down.
    Failed,
    TearingDown,
    Closed,
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Registered => "registered",
            Self::SettingUp => "setting up",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::TearingDown => "tearing down",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// One-shot latch: opened exactly once, never closed again.
///
/// Any number of threads may [`wait`](ReadinessGate::wait) concurrently; all
/// are released by the single [`open`](ReadinessGate::open).
#[derive(Debug, Default)]
pub struct ReadinessGate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate. Returns `false` if it was already open.
    pub fn open(&self) -> bool {
        let mut open = self.open.lock();
        if *open {
            return false;
        }
        *open = true;
        self.cond.notify_all();
        true
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }

    /// Block until the gate is open.
    pub fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
    }
}
