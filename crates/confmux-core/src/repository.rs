//! Repository: provider lifecycle and weighted resolution
//!
//! The `Repository` owns the registered providers, initializes them in
//! dependency order, keeps the per-key registry they fill during set-up, and
//! answers queries by merging provider values by weight and running the
//! result through the active schema.
//!
//! # Resolution
//!
//! For a queried key:
//!
//! 1. If providers registered the key itself, they are asked in descending
//!    weight order (ties go to the earlier registration) and the first value
//!    wins. If none of them has anything, the key is not found.
//! 2. Otherwise, if the key is a strict prefix of registered keys, every
//!    immediate child is resolved the same way, depth first, each child already
//!    mapped at its own key, and the results are assembled into a
//!    [`Value::Map`].
//! 3. The schema is applied once more at the queried key.
//!
//! # Concurrency
//!
//! Registration happens during [`Repository::set_up`]; queries may run from
//! other threads at the same time. While a provider is setting up, a query
//! from any thread other than the one running `set_up` blocks on that
//! provider's [`ReadinessGate`], so no reader sees a half-filled registry.
//! Queries from inside `set_up` itself, such as a provider reading keys of its
//! dependencies, are answered right away. Once every provider is ready the
//! registry is frozen into an immutable snapshot and the query path no longer
//! takes locks.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};

use crate::dependency::DependencyGraph;
use crate::mapper::{Mapper, MapperNode, Schema};
use crate::provider::{Provider, ProviderState, ReadinessGate};
use crate::{Error, Key, KeyValue, Result, Value};

/// Overall initialization progress of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Initializing,
    Ready,
    Failed,
    Closed,
}

struct ProviderSlot {
    name: String,
    provider: Arc<dyn Provider>,
    gate: ReadinessGate,
    state: Mutex<ProviderState>,
}

impl ProviderSlot {
    fn set_state(&self, state: ProviderState) {
        *self.state.lock() = state;
    }

    fn state(&self) -> ProviderState {
        *self.state.lock()
    }
}

/// The provider currently inside `set_up`, and the thread driving it.
struct ActiveSetUp {
    thread: ThreadId,
    slot: Arc<ProviderSlot>,
}

/// A provider's claim on a key, with the weight it had at registration.
#[derive(Clone)]
struct Registration {
    slot: Arc<ProviderSlot>,
    weight: i64,
}

#[derive(Clone, Default)]
struct Registry {
    /// Registrations per key, highest weight first.
    entries: HashMap<Key, Vec<Registration>>,
    /// Immediate child segments of every interior key.
    prefixes: HashMap<Key, BTreeSet<String>>,
}

impl Registry {
    fn insert(&mut self, key: Key, slot: &Arc<ProviderSlot>, weight: i64) {
        for (depth, prefix) in key.ancestors().enumerate() {
            self.prefixes
                .entry(prefix)
                .or_default()
                .insert(key.segments()[depth].clone());
        }

        let entry = self.entries.entry(key).or_default();
        if entry.iter().any(|r| Arc::ptr_eq(&r.slot, slot)) {
            return;
        }
        // Stable: equal weights keep registration order
        let at = entry
            .iter()
            .position(|r| r.weight < weight)
            .unwrap_or(entry.len());
        entry.insert(
            at,
            Registration {
                slot: Arc::clone(slot),
                weight,
            },
        );
    }
}

/// Composable configuration resolver over a set of providers.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use confmux_core::{Key, Provider, Repository, Result, Schema, Value, convert};
///
/// struct Static(&'static str, i64, &'static str);
///
/// impl Provider for Static {
///     fn name(&self) -> &str { self.0 }
///     fn weight(&self) -> i64 { self.1 }
///     fn set_up(&self, repo: &Repository) -> Result<()> {
///         repo.register_key(Key::new("server.port"), self.name())
///     }
///     fn get(&self, _key: &Key) -> Option<Value> { Some(Value::from(self.2)) }
/// }
///
/// let repo = Repository::new();
/// repo.register_provider(Arc::new(Static("defaults", 10, "80"))).unwrap();
/// repo.register_provider(Arc::new(Static("env", 20, "8080"))).unwrap();
/// repo.define_schema(Schema::map([
///     ("server", Schema::map([("port", Schema::converter(convert::to_int))])),
/// ]))
/// .unwrap();
/// repo.set_up().unwrap();
///
/// assert_eq!(repo.get("server.port").unwrap(), Some(Value::Int(8080)));
/// ```
pub struct Repository {
    providers: RwLock<Vec<Arc<ProviderSlot>>>,
    phase: Mutex<Phase>,
    active: Mutex<Option<ActiveSetUp>>,
    init_order: RwLock<Vec<String>>,
    staging: RwLock<Registry>,
    frozen: OnceLock<Registry>,
    schema: ArcSwap<MapperNode>,
}

impl Repository {
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            phase: Mutex::new(Phase::Pending),
            active: Mutex::new(None),
            init_order: RwLock::new(Vec::new()),
            staging: RwLock::new(Registry::default()),
            frozen: OnceLock::new(),
            schema: ArcSwap::from_pointee(MapperNode::new()),
        }
    }

    /// Add a provider to the pending set.
    ///
    /// # Errors
    ///
    /// - `Error::AlreadyInitialized` once [`set_up`](Self::set_up) has started.
    /// - `Error::DuplicateProvider` if the name is taken.
    pub fn register_provider(&self, provider: Arc<dyn Provider>) -> Result<()> {
        // Held until the push so set_up cannot start in between
        let phase = self.phase.lock();
        if *phase != Phase::Pending {
            return Err(Error::AlreadyInitialized);
        }
        let name = provider.name().to_string();
        let mut providers = self.providers.write();
        if providers.iter().any(|slot| slot.name == name) {
            return Err(Error::DuplicateProvider { name });
        }
        tracing::debug!(provider = %name, weight = provider.weight(), "Registering provider");
        providers.push(Arc::new(ProviderSlot {
            name,
            provider,
            gate: ReadinessGate::new(),
            state: Mutex::new(ProviderState::Registered),
        }));
        Ok(())
    }

    /// Extend the active schema.
    ///
    /// Definitions are applied to a copy of the current trie which then
    /// replaces it, so queries never observe a half-built trie. Concurrent
    /// definitions may lose updates.
    ///
    /// # Errors
    ///
    /// - `Error::AlreadyInitialized` once [`set_up`](Self::set_up) has
    ///   finished; the schema is read-only from then on.
    /// - `Error::Schema` for a malformed schema.
    pub fn define_schema(&self, schema: Schema) -> Result<()> {
        if matches!(*self.phase.lock(), Phase::Ready | Phase::Failed | Phase::Closed) {
            return Err(Error::AlreadyInitialized);
        }
        let mut next = MapperNode::clone(&self.schema.load());
        next.define_schema(schema)?;
        self.schema.store(Arc::new(next));
        Ok(())
    }

    /// The active schema trie.
    pub fn schema(&self) -> Arc<MapperNode> {
        self.schema.load_full()
    }

    /// Initialize every registered provider in dependency order.
    ///
    /// Each provider's dependencies, including the keys they register, are
    /// complete before its own `set_up` starts. The first failure aborts
    /// initialization and is returned as is; providers that already finished
    /// stay up until [`tear_down`](Self::tear_down).
    pub fn set_up(&self) -> Result<()> {
        let slots = {
            let mut phase = self.phase.lock();
            if *phase != Phase::Pending {
                return Err(Error::AlreadyInitialized);
            }
            *phase = Phase::Initializing;
            // Readers arriving from now on must find a provider to wait on
            let slots = match self.ordered_slots() {
                Ok(slots) => slots,
                Err(err) => {
                    *phase = Phase::Failed;
                    return Err(err);
                }
            };
            if let Some(first) = slots.first() {
                self.activate(first);
            }
            slots
        };

        for (at, slot) in slots.iter().enumerate() {
            slot.set_state(ProviderState::SettingUp);
            tracing::info!(provider = %slot.name, "Setting up provider");
            let result = slot.provider.set_up(self);

            if let Err(err) = result {
                slot.set_state(ProviderState::Failed);
                tracing::error!(provider = %slot.name, error = %err, "Provider set-up failed");
                self.finish(Phase::Failed);
                // Readers must never hang on a provider, even a failed one
                slot.gate.open();
                return Err(err);
            }

            slot.set_state(ProviderState::Ready);
            match slots.get(at + 1) {
                // Hand over before opening the gate
                Some(next) => self.activate(next),
                None => {
                    self.freeze();
                    self.finish(Phase::Ready);
                }
            }
            slot.gate.open();
            tracing::info!(provider = %slot.name, "Provider ready");
        }

        if slots.is_empty() {
            self.freeze();
            self.finish(Phase::Ready);
        }
        tracing::info!(providers = slots.len(), "Repository ready");
        Ok(())
    }

    /// Providers in initialization order; records the order.
    fn ordered_slots(&self) -> Result<Vec<Arc<ProviderSlot>>> {
        let providers = self.providers.read().clone();
        let mut graph = DependencyGraph::new();
        for slot in &providers {
            graph.add_node(slot.name.as_str());
        }
        for slot in &providers {
            for dep in slot.provider.depends() {
                graph.add_edge(&slot.name, &dep);
            }
        }
        let order = graph.topological_sort()?;
        let slots = order
            .iter()
            .filter_map(|name| providers.iter().find(|slot| &slot.name == name).cloned())
            .collect();
        *self.init_order.write() = order;
        Ok(slots)
    }

    fn activate(&self, slot: &Arc<ProviderSlot>) {
        *self.active.lock() = Some(ActiveSetUp {
            thread: thread::current().id(),
            slot: Arc::clone(slot),
        });
    }

    /// Leave the initializing phase; a concurrent teardown keeps `Closed`.
    fn finish(&self, outcome: Phase) {
        *self.active.lock() = None;
        let mut phase = self.phase.lock();
        if *phase == Phase::Initializing {
            *phase = outcome;
        }
    }

    fn freeze(&self) {
        let mut staging = self.staging.write();
        let registry = std::mem::take(&mut *staging);
        // Only reachable once per repository, guarded by the phase
        let stored = self.frozen.set(registry).is_ok();
        debug_assert!(stored, "registry frozen twice");
    }

    /// Tear providers down in reverse initialization order.
    ///
    /// Best effort: a failing provider is logged and collected, and the rest
    /// are still torn down. Providers that never started set-up are only
    /// marked closed.
    pub fn tear_down(&self) -> Result<()> {
        {
            let mut phase = self.phase.lock();
            if *phase == Phase::Closed {
                return Ok(());
            }
            *phase = Phase::Closed;
        }

        let providers = self.providers.read().clone();
        let order = self.init_order.read().clone();
        let mut failures = Vec::new();

        for name in order.iter().rev() {
            let Some(slot) = providers.iter().find(|slot| &slot.name == name) else {
                continue;
            };
            if !matches!(slot.state(), ProviderState::Ready | ProviderState::Failed) {
                continue;
            }
            slot.set_state(ProviderState::TearingDown);
            tracing::info!(provider = %name, "Tearing down provider");
            if let Err(err) = slot.provider.tear_down(self) {
                tracing::warn!(provider = %name, error = %err, "Provider teardown failed");
                failures.push((name.clone(), err));
            }
            slot.set_state(ProviderState::Closed);
        }
        for slot in &providers {
            slot.set_state(ProviderState::Closed);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::TearDown { failures })
        }
    }

    /// Claim `key` for the named provider. Called from [`Provider::set_up`].
    ///
    /// The provider's weight is read once, now. Registering the same key twice
    /// for one provider is a no-op.
    ///
    /// # Errors
    ///
    /// - `Error::RegistryFrozen` after initialization completed.
    /// - `Error::UnknownProvider` if no provider has that name.
    /// - `Error::EmptyKey` for the root key.
    pub fn register_key(&self, key: Key, provider: &str) -> Result<()> {
        if self.frozen.get().is_some() {
            return Err(Error::RegistryFrozen {
                key: key.to_string(),
            });
        }
        if key.is_empty() {
            return Err(Error::EmptyKey {
                provider: provider.to_string(),
            });
        }
        let slot = self
            .find_slot(provider)
            .ok_or_else(|| Error::UnknownProvider {
                name: provider.to_string(),
            })?;
        let weight = slot.provider.weight();

        let mut staging = self.staging.write();
        if self.frozen.get().is_some() {
            return Err(Error::RegistryFrozen {
                key: key.to_string(),
            });
        }
        tracing::debug!(key = %key, provider, weight, "Registering key");
        staging.insert(key, &slot, weight);
        Ok(())
    }

    /// Resolve `key` to a fully mapped value.
    ///
    /// Returns `Ok(None)` when no provider serves the key or anything below
    /// it. Mapper errors are returned unchanged.
    pub fn get(&self, key: impl Into<Key>) -> Result<Option<Value>> {
        let key = key.into();
        self.await_set_up();
        self.resolve(&key)
    }

    /// Block while another thread is setting up a provider.
    fn await_set_up(&self) {
        if self.frozen.get().is_some() {
            return;
        }
        let me = thread::current().id();
        loop {
            let slot = match &*self.active.lock() {
                Some(active) if active.thread != me => Arc::clone(&active.slot),
                _ => return,
            };
            slot.gate.wait();
        }
    }

    fn resolve(&self, key: &Key) -> Result<Option<Value>> {
        let raw = match self.entry(key) {
            Some(entry) => Self::resolve_leaf(key, &entry),
            None => self.resolve_composite(key)?,
        };
        let Some(value) = raw else {
            return Ok(None);
        };
        let schema = self.schema.load();
        let kv = Mapper::map(&**schema, KeyValue::new(key.clone(), value))?;
        Ok(Some(kv.into_value()))
    }

    fn resolve_leaf(key: &Key, entry: &[Registration]) -> Option<Value> {
        entry.iter().find_map(|reg| {
            let value = reg.slot.provider.get(key);
            if value.is_some() {
                tracing::trace!(key = %key, provider = %reg.slot.name, "Resolved key");
            }
            value
        })
    }

    fn resolve_composite(&self, key: &Key) -> Result<Option<Value>> {
        let mut fields = BTreeMap::new();
        for segment in self.children(key) {
            if let Some(value) = self.resolve(&key.child(&segment))? {
                fields.insert(segment, value);
            }
        }
        Ok((!fields.is_empty()).then_some(Value::Map(fields)))
    }

    fn entry(&self, key: &Key) -> Option<Vec<Registration>> {
        self.with_registry(|r| r.entries.get(key).cloned())
    }

    fn children(&self, key: &Key) -> Vec<String> {
        self.with_registry(|r| {
            r.prefixes
                .get(key)
                .map(|children| children.iter().cloned().collect())
                .unwrap_or_default()
        })
    }

    fn with_registry<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        if let Some(frozen) = self.frozen.get() {
            return f(frozen);
        }
        let staging = self.staging.read();
        // Freezing happens under the write lock, so re-check while holding the read lock
        match self.frozen.get() {
            Some(frozen) => f(frozen),
            None => f(&staging),
        }
    }

    fn find_slot(&self, name: &str) -> Option<Arc<ProviderSlot>> {
        self.providers
            .read()
            .iter()
            .find(|slot| slot.name == name)
            .cloned()
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<Key> {
        self.await_set_up();
        let mut keys: Vec<Key> = self.with_registry(|r| r.entries.keys().cloned().collect());
        keys.sort();
        keys
    }

    /// Names of the providers registered for `key`, in resolution order.
    pub fn providers_for(&self, key: impl Into<Key>) -> Vec<String> {
        let key = key.into();
        self.await_set_up();
        self.with_registry(|r| {
            r.entries
                .get(&key)
                .map(|entry| entry.iter().map(|reg| reg.slot.name.clone()).collect())
                .unwrap_or_default()
        })
    }

    /// Lifecycle state of the named provider.
    pub fn provider_state(&self, name: &str) -> Option<ProviderState> {
        self.find_slot(name).map(|slot| slot.state())
    }

    /// Provider names in registration order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers
            .read()
            .iter()
            .map(|slot| slot.name.clone())
            .collect()
    }

    /// Order computed by the last [`set_up`](Self::set_up), empty before.
    pub fn init_order(&self) -> Vec<String> {
        self.init_order.read().clone()
    }

    /// True once every provider finished set-up successfully.
    pub fn is_ready(&self) -> bool {
        *self.phase.lock() == Phase::Ready
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("providers", &self.provider_names())
            .field("phase", &*self.phase.lock())
            .field("frozen", &self.frozen.get().is_some())
            .finish()
    }
}
