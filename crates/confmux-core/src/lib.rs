//! Composable configuration resolution for confmux
//!
//! This crate merges key/value data contributed by independently initialized
//! providers and converts the result into typed values through a declarative
//! schema:
//!
//! - **Keys and values**: dot-separated [`Key`]s, the dynamically typed
//!   [`Value`] and the [`KeyValue`] pair passed through every stage
//! - **Converters**: pure coercions such as [`convert::to_int`]
//! - **Schema trie**: [`MapperNode`], storing [`Mapper`]s per key path with
//!   wildcard segments, built from a [`Schema`]
//! - **Repository**: dependency-ordered provider lifecycle, weighted merge of
//!   overlapping keys, bottom-up assembly of composite values
//!
//! # Architecture
//!
//! ```text
//!                 Repository::get(key)
//!                        |
//!        +---------------+----------------+
//!        |                                |
//!   key registry                    schema trie
//!  (weight-ordered                  (MapperNode)
//!   providers)                            |
//!        |                          Mapper / Converter
//!   Provider::get
//! ```

pub mod convert;
pub mod dependency;
pub mod error;
pub mod key;
pub mod mapper;
mod must;
pub mod provider;
pub mod repository;
pub mod value;

pub use convert::Converter;
pub use error::{Error, Result};
pub use key::{KEY_SEPARATOR, Key, WILDCARD};
pub use mapper::{ConvMapper, FnMapper, Mapper, MapperNode, SELF_KEY, Schema};
pub use provider::{Provider, ProviderState, ReadinessGate};
pub use repository::Repository;
pub use value::{KeyValue, Value};
