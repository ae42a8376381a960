//! Per-template method tables.

use http::Method;
use smallvec::SmallVec;

/// Maps HTTP methods to values for one path template.
///
/// Entries are kept sorted by method name so iteration and the `Allow`
/// header are deterministic.
///
/// # Example
///
/// ```rust
/// use pylon_router::MethodRouter;
/// use http::Method;
///
/// let mut methods = MethodRouter::new();
/// methods.insert(Method::GET, "getWidget").unwrap();
/// methods.insert(Method::DELETE, "deleteWidget").unwrap();
///
/// assert_eq!(methods.get(&Method::GET), Some(&"getWidget"));
/// assert_eq!(methods.get(&Method::HEAD), Some(&"getWidget"));
/// assert_eq!(methods.get(&Method::PUT), None);
/// assert_eq!(methods.allow_header(), "DELETE, GET, HEAD, OPTIONS");
/// ```
#[derive(Debug, Clone)]
pub struct MethodRouter<T> {
    entries: SmallVec<[(Method, T); 4]>,
}

impl<T> Default for MethodRouter<T> {
    fn default() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }
}

impl<T> MethodRouter<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` for `method`.
    ///
    /// Returns the value back if the method is already taken.
    pub fn insert(&mut self, method: Method, value: T) -> Result<(), T> {
        match self
            .entries
            .binary_search_by(|(m, _)| m.as_str().cmp(method.as_str()))
        {
            Ok(_) => Err(value),
            Err(pos) => {
                self.entries.insert(pos, (method, value));
                Ok(())
            }
        }
    }

    /// Looks up `method`. HEAD falls back to GET when not registered.
    #[must_use]
    pub fn get(&self, method: &Method) -> Option<&T> {
        self.exact(method).or_else(|| {
            if *method == Method::HEAD {
                self.exact(&Method::GET)
            } else {
                None
            }
        })
    }

    /// Looks up `method` without the HEAD fallback.
    #[must_use]
    pub fn exact(&self, method: &Method) -> Option<&T> {
        self.entries
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, v)| v)
    }

    /// Methods this table answers, including implied HEAD and OPTIONS.
    #[must_use]
    pub fn allowed(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.entries.iter().map(|(m, _)| m.clone()).collect();
        if self.exact(&Method::GET).is_some() && self.exact(&Method::HEAD).is_none() {
            methods.push(Method::HEAD);
        }
        if self.exact(&Method::OPTIONS).is_none() {
            methods.push(Method::OPTIONS);
        }
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }

    /// The `Allow` header value for this table.
    #[must_use]
    pub fn allow_header(&self) -> String {
        join_methods(&self.allowed())
    }

    /// Iterates registered entries in method-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Method, &T)> {
        self.entries.iter().map(|(m, v)| (m, v))
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Formats methods as a comma-separated `Allow` header value.
#[must_use]
pub fn join_methods(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_method_rejected() {
        let mut methods = MethodRouter::new();
        assert!(methods.insert(Method::GET, 1).is_ok());
        assert_eq!(methods.insert(Method::GET, 2), Err(2));
        assert_eq!(methods.get(&Method::GET), Some(&1));
    }

    #[test]
    fn test_head_fallback_only_when_missing() {
        let mut methods = MethodRouter::new();
        methods.insert(Method::GET, "get").unwrap();
        assert_eq!(methods.get(&Method::HEAD), Some(&"get"));
        assert_eq!(methods.exact(&Method::HEAD), None);

        methods.insert(Method::HEAD, "head").unwrap();
        assert_eq!(methods.get(&Method::HEAD), Some(&"head"));
    }

    #[test]
    fn test_iteration_sorted_by_name() {
        let mut methods = MethodRouter::new();
        methods.insert(Method::POST, 'p').unwrap();
        methods.insert(Method::DELETE, 'd').unwrap();
        methods.insert(Method::GET, 'g').unwrap();
        let names: Vec<_> = methods.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(names, vec!["DELETE", "GET", "POST"]);
    }

    #[test]
    fn test_allowed_without_get() {
        let mut methods = MethodRouter::new();
        methods.insert(Method::POST, ()).unwrap();
        assert_eq!(methods.allow_header(), "OPTIONS, POST");
    }
}
