//! Dot-separated configuration keys

use std::fmt;

/// Separator between key segments in the canonical string form.
pub const KEY_SEPARATOR: char = '.';

/// Segment that matches any concrete segment during schema lookup.
///
/// Providers never register wildcard keys; the token only carries meaning
/// inside a [`MapperNode`](crate::MapperNode).
pub const WILDCARD: &str = "*";

/// An ordered path of segments identifying a configuration value.
///
/// Keys are canonical: segments are never empty and never contain
/// [`KEY_SEPARATOR`], so equality and hashing over the segment list agree
/// with equality over the joined string form.
///
/// # Example
///
/// ```
/// use confmux_core::Key;
///
/// let key = Key::new("server.http.port");
/// assert_eq!(key.segments(), ["server", "http", "port"]);
/// assert_eq!(key.to_string(), "server.http.port");
/// assert_eq!(key.parent(), Some(Key::new("server.http")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    segments: Vec<String>,
}

impl Key {
    /// Parse a key from its dotted string form. Empty segments are dropped,
    /// so `""` is the root key.
    pub fn new(path: &str) -> Self {
        Self::from_segments(std::iter::once(path))
    }

    /// The zero-segment key addressing the whole key space.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a key from segments, splitting any segment that still contains
    /// the separator.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments = segments
            .into_iter()
            .flat_map(|s| {
                s.as_ref()
                    .split(KEY_SEPARATOR)
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, if any.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Append one or more segments.
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(
            segment
                .split(KEY_SEPARATOR)
                .filter(|part| !part.is_empty())
                .map(str::to_string),
        );
        Self { segments }
    }

    /// The key one level up, or `None` for the root key.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// All strict prefixes, from the root key down to the parent.
    pub fn ancestors(&self) -> impl Iterator<Item = Key> + '_ {
        (0..self.segments.len()).map(|n| Self {
            segments: self.segments[..n].to_vec(),
        })
    }

    /// True when `self` equals `prefix` or lies beneath it.
    pub fn starts_with(&self, prefix: &Key) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// True when any segment is the wildcard token.
    pub fn has_wildcard(&self) -> bool {
        self.segments.iter().any(|s| s == WILDCARD)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{KEY_SEPARATOR}")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl From<&str> for Key {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for Key {
    fn from(path: String) -> Self {
        Self::new(&path)
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}
