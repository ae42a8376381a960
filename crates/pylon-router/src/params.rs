//! Captured path and matrix parameters.
//!
//! Parameters are stored as ordered `(name, value)` pairs in a small vector,
//! so the common case of one to four captures never touches the heap. Names
//! may repeat: matrix parameters such as `;color=red;color=blue` keep every
//! occurrence in arrival order.

use smallvec::SmallVec;

/// Number of parameters stored inline before spilling to the heap.
const INLINE_PARAMS: usize = 4;

/// Ordered, possibly multi-valued parameter pairs.
///
/// # Example
///
/// ```rust
/// use pylon_router::Params;
///
/// let mut params = Params::new();
/// params.push("id", "42");
/// params.push("tag", "a");
/// params.push("tag", "b");
///
/// assert_eq!(params.get("id"), Some("42"));
/// assert_eq!(params.get("tag"), Some("a"));
/// assert_eq!(params.get_all("tag"), vec!["a", "b"]);
/// assert!(params.get("missing").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    pairs: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair. Existing pairs with the same name are kept.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Returns the first value captured for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value captured for `name`, in arrival order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Returns `true` if at least one value exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(n, _)| n == name)
    }

    /// Returns `true` if no parameters were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of captured pairs, counting repeats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Iterates pairs in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, String)> for Params {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.pairs.extend(iter);
    }
}
