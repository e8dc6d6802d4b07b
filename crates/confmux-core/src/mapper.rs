//! Schema trie: per-key and wildcard-key value mappers
//!
//! A [`MapperNode`] is a trie keyed by path segments. Each node may carry one
//! [`Mapper`]; the wildcard segment `*` stands for any concrete segment at its
//! position. Lookups prefer the exact child at every level and fall back to the
//! wildcard child only when no exact child exists.
//!
//! # Example
//!
//! ```
//! use confmux_core::{KeyValue, Mapper, MapperNode, Schema, Value, convert};
//!
//! let mut schema = MapperNode::new();
//! schema
//!     .define_schema(Schema::map([
//!         ("server", Schema::map([("port", Schema::converter(convert::to_int))])),
//!     ]))
//!     .unwrap();
//!
//! let kv = schema.map(KeyValue::new("server.port", "8080")).unwrap();
//! assert_eq!(kv.value(), &Value::Int(8080));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::convert::Converter;
use crate::key::WILDCARD;
use crate::{Error, Key, KeyValue, Result};

/// Reserved schema entry that attaches a mapper to the enclosing node.
pub const SELF_KEY: &str = "__self__";

/// A unit of value transformation.
///
/// Mappers receive the key alongside the value so a single implementation can
/// serve several (wildcard) paths.
pub trait Mapper: Send + Sync {
    fn map(&self, kv: KeyValue) -> Result<KeyValue>;
}

/// Adapter turning a [`Converter`] into a [`Mapper`]; the key passes through.
#[derive(Debug, Clone)]
pub struct ConvMapper {
    conv: Converter,
}

impl ConvMapper {
    pub fn new(conv: Converter) -> Self {
        Self { conv }
    }
}

impl Mapper for ConvMapper {
    fn map(&self, kv: KeyValue) -> Result<KeyValue> {
        let value = self.conv.convert(kv.value())?;
        Ok(kv.with_value(value))
    }
}

/// Mapper built from a closure.
pub struct FnMapper<F>(F);

impl<F> FnMapper<F>
where
    F: Fn(KeyValue) -> Result<KeyValue> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Mapper for FnMapper<F>
where
    F: Fn(KeyValue) -> Result<KeyValue> + Send + Sync,
{
    fn map(&self, kv: KeyValue) -> Result<KeyValue> {
        (self.0)(kv)
    }
}

/// Declarative schema input for [`MapperNode::define_schema`].
#[derive(Clone)]
pub enum Schema {
    /// Attach this mapper to the node.
    Mapper(Arc<dyn Mapper>),
    /// Wrap this converter into a [`ConvMapper`] and attach it.
    Converter(Converter),
    /// Child schemas by segment name; [`SELF_KEY`] targets the node itself.
    Map(Vec<(String, Schema)>),
}

impl Schema {
    pub fn mapper(mapper: impl Mapper + 'static) -> Self {
        Self::Mapper(Arc::new(mapper))
    }

    pub fn converter<F>(f: F) -> Self
    where
        F: Fn(&crate::Value) -> Result<crate::Value> + Send + Sync + 'static,
    {
        Self::Converter(Converter::new(f))
    }

    pub fn map<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Schema)>,
        S: Into<String>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(name, schema)| (name.into(), schema))
                .collect(),
        )
    }

    /// The schema that defines nothing.
    pub fn empty() -> Self {
        Self::Map(Vec::new())
    }

    fn into_mapper(self) -> Option<Arc<dyn Mapper>> {
        match self {
            Self::Mapper(mapper) => Some(mapper),
            Self::Converter(conv) => Some(Arc::new(ConvMapper::new(conv))),
            Self::Map(_) => None,
        }
    }
}

impl From<Arc<dyn Mapper>> for Schema {
    fn from(mapper: Arc<dyn Mapper>) -> Self {
        Self::Mapper(mapper)
    }
}

impl From<Converter> for Schema {
    fn from(conv: Converter) -> Self {
        Self::Converter(conv)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mapper(_) => f.write_str("Mapper(..)"),
            Self::Converter(_) => f.write_str("Converter(..)"),
            Self::Map(entries) => f.debug_map().entries(entries.iter().map(|(k, v)| (k, v))).finish(),
        }
    }
}

/// One node of the schema trie.
///
/// A node with neither a mapper nor children is equivalent to absence.
#[derive(Clone, Default)]
pub struct MapperNode {
    mapper: Option<Arc<dyn Mapper>>,
    children: HashMap<String, MapperNode>,
}

impl MapperNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mapper(&self) -> Option<&Arc<dyn Mapper>> {
        self.mapper.as_ref()
    }

    pub fn child(&self, segment: &str) -> Option<&MapperNode> {
        self.children.get(segment)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &MapperNode)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn is_empty(&self) -> bool {
        self.mapper.is_none() && self.children.values().all(MapperNode::is_empty)
    }

    /// Attach `mapper` at `key`, creating intermediate nodes.
    ///
    /// The root never receives a mapper: inserting the empty key is a no-op.
    pub fn insert(&mut self, key: &Key, mapper: Arc<dyn Mapper>) {
        if key.is_empty() {
            return;
        }
        let mut node = self;
        for segment in key.segments() {
            node = node.children.entry(segment.clone()).or_default();
        }
        node.mapper = Some(mapper);
    }

    /// Descend along `key`, preferring exact children over the wildcard.
    ///
    /// The descent is greedy: once an exact child is taken, the wildcard
    /// sibling at that level is never revisited, even if the exact branch dead
    /// ends further down.
    pub fn find(&self, key: &Key) -> Option<&MapperNode> {
        let mut node = self;
        for segment in key.segments() {
            node = node
                .children
                .get(segment)
                .or_else(|| node.children.get(WILDCARD))?;
        }
        Some(node)
    }

    /// Build the trie from a schema value.
    ///
    /// At the top level only a [`Schema::Map`] has an effect; a bare mapper or
    /// converter handed in as the whole schema is discarded. Inside a map,
    /// [`SELF_KEY`] attaches to the current node and every other entry becomes
    /// a child (a dotted name expands into nested children).
    pub fn define_schema(&mut self, schema: Schema) -> Result<()> {
        match schema {
            Schema::Map(entries) => self.define_entries(entries),
            Schema::Mapper(_) | Schema::Converter(_) => {
                tracing::warn!("Ignoring bare mapper at schema root; wrap it in {SELF_KEY}");
                Ok(())
            }
        }
    }

    fn define_nested(&mut self, schema: Schema) -> Result<()> {
        match schema {
            Schema::Map(entries) => self.define_entries(entries),
            leaf => {
                self.mapper = leaf.into_mapper();
                Ok(())
            }
        }
    }

    fn define_entries(&mut self, entries: Vec<(String, Schema)>) -> Result<()> {
        for (name, schema) in entries {
            if name == SELF_KEY {
                self.mapper = Some(schema.into_mapper().ok_or_else(|| Error::Schema {
                    message: format!("{SELF_KEY} must hold a mapper or converter, not a map"),
                })?);
                continue;
            }
            let path = Key::new(&name);
            if path.is_empty() {
                return Err(Error::Schema {
                    message: format!("empty segment name {name:?}"),
                });
            }
            tracing::debug!(key = %path, "Defining schema node");
            let mut node = &mut *self;
            for segment in path.segments() {
                node = node.children.entry(segment.clone()).or_default();
            }
            node.define_nested(schema)?;
        }
        Ok(())
    }
}

impl Mapper for MapperNode {
    /// Apply the mapper found at `kv`'s key, or pass `kv` through untouched.
    ///
    /// Composite values are handed to the node's mapper as they are; fields
    /// are not converted first.
    fn map(&self, kv: KeyValue) -> Result<KeyValue> {
        match self.find(kv.key()).and_then(MapperNode::mapper) {
            Some(mapper) => mapper.map(kv),
            None => Ok(kv),
        }
    }
}

impl PartialEq for MapperNode {
    /// Structural equality; mappers compare by identity.
    fn eq(&self, other: &Self) -> bool {
        let same_mapper = match (&self.mapper, &other.mapper) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_mapper && self.children == other.children
    }
}

impl fmt::Debug for MapperNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("MapperNode");
        s.field(
            "mapper",
            &self.mapper.as_ref().map(|m| Arc::as_ptr(m) as *const () as usize),
        );
        let mut names: Vec<_> = self.children.keys().collect();
        names.sort();
        let children: Vec<_> = names
            .into_iter()
            .map(|name| (name, &self.children[name]))
            .collect();
        s.field("children", &children).finish()
    }
}
