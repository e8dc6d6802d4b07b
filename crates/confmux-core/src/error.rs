//! Error types for confmux-core

/// Result type for confmux-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a repository or resolving values.
///
/// A key that nothing can serve is not an error: lookups report it as
/// `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Provider dependencies form a cycle
    #[error("Provider dependency cycle between: {}", participants.join(", "))]
    DependencyCycle { participants: Vec<String> },

    /// A provider depends on a name nobody registered
    #[error("Provider '{provider}' depends on unregistered provider '{dependency}'")]
    UnknownDependency { provider: String, dependency: String },

    /// Two providers share a name
    #[error("Provider already registered: {name}")]
    DuplicateProvider { name: String },

    /// A key registration named a provider the repository does not know
    #[error("Unknown provider: {name}")]
    UnknownProvider { name: String },

    /// Providers were added, or initialization requested, after it started
    #[error("Repository is already initialized")]
    AlreadyInitialized,

    /// A key was registered after initialization completed
    #[error("Key registry is frozen, cannot register '{key}'")]
    RegistryFrozen { key: String },

    /// Providers cannot claim the root key
    #[error("Provider '{provider}' tried to register the empty key")]
    EmptyKey { provider: String },

    /// The schema value is malformed
    #[error("Invalid schema: {message}")]
    Schema { message: String },

    /// A provider failed to read or parse its source
    #[error("Provider '{name}' failed: {source}")]
    Provider {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// One or more providers failed to tear down
    #[error("Teardown failed for: {}", format_failures(failures))]
    TearDown { failures: Vec<(String, Error)> },

    /// A converter rejected the shape or type of a value
    #[error("Cannot convert {found} to {expected}")]
    Conversion { expected: &'static str, found: String },

    /// Error raised by a user-supplied mapper
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Create an error carrying a free-form message, for use in custom mappers.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Wrap a provider-specific failure.
    pub fn provider(
        name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Provider {
            name: name.into(),
            source: source.into(),
        }
    }

    pub(crate) fn conversion(expected: &'static str, found: &crate::Value) -> Self {
        Self::Conversion {
            expected,
            found: format!("{} {:?}", found.kind(), found),
        }
    }
}

fn format_failures(failures: &[(String, Error)]) -> String {
    failures
        .iter()
        .map(|(name, err)| format!("{name} ({err})"))
        .collect::<Vec<_>>()
        .join("; ")
}
