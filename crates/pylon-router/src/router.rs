//! Specificity-ordered router.

use http::Method;

use crate::error::RouteError;
use crate::method_router::{join_methods, MethodRouter};
use crate::params::Params;
use crate::template::{split_path, PathTemplate};

/// A successful route resolution.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    /// The value registered for the matched method and template.
    pub value: &'a T,
    /// The normalized template that matched.
    pub template: &'a str,
    /// Path captures, percent-decoded.
    pub params: Params,
    /// Matrix parameters of the last path segment.
    pub matrix: Params,
}

/// Why a path could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMiss {
    /// No template matches the path.
    NotFound,
    /// At least one template matches the path but none accepts the method.
    MethodNotAllowed {
        /// Union of methods accepted by the matching templates, sorted.
        allowed: Vec<Method>,
    },
}

impl RouteMiss {
    /// The `Allow` header value for a method mismatch.
    #[must_use]
    pub fn allow_header(&self) -> Option<String> {
        match self {
            Self::NotFound => None,
            Self::MethodNotAllowed { allowed } => Some(join_methods(allowed)),
        }
    }
}

/// Router over path templates.
///
/// Templates are kept sorted by [`PathTemplate::specificity_cmp`]. Resolution
/// walks them in that order and returns the first template that matches the
/// path and accepts the method, so a literal segment always beats a
/// parameter at the same position and ties are broken deterministically.
///
/// # Example
///
/// ```rust
/// use pylon_router::{Router, RouteMiss};
/// use http::Method;
///
/// let mut router = Router::new();
/// router.insert(Method::GET, "/users/{id}", "getUser").unwrap();
/// router.insert(Method::GET, "/users/me", "getMe").unwrap();
///
/// let found = router.resolve(&Method::GET, "/users/me").unwrap();
/// assert_eq!(*found.value, "getMe");
///
/// let found = router.resolve(&Method::GET, "/users/7").unwrap();
/// assert_eq!(found.params.get("id"), Some("7"));
///
/// let miss = router.resolve(&Method::DELETE, "/users/7").unwrap_err();
/// assert!(matches!(miss, RouteMiss::MethodNotAllowed { .. }));
/// ```
#[derive(Debug, Clone)]
pub struct Router<T> {
    routes: Vec<Route<T>>,
    route_count: usize,
}

#[derive(Debug, Clone)]
struct Route<T> {
    template: PathTemplate,
    methods: MethodRouter<T>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            route_count: 0,
        }
    }
}

impl<T> Router<T> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` under `method` and `template`.
    ///
    /// Templates that normalize to the same text share one method table.
    pub fn insert(&mut self, method: Method, template: &str, value: T) -> Result<(), RouteError> {
        let parsed = PathTemplate::parse(template)?;

        let route = if let Some(pos) = self
            .routes
            .iter()
            .position(|r| r.template.as_str() == parsed.as_str())
        {
            &mut self.routes[pos]
        } else {
            let pos = self
                .routes
                .partition_point(|r| r.template.specificity_cmp(&parsed).is_lt());
            self.routes.insert(
                pos,
                Route {
                    template: parsed,
                    methods: MethodRouter::new(),
                },
            );
            &mut self.routes[pos]
        };

        let normalized = route.template.as_str().to_string();
        route
            .methods
            .insert(method.clone(), value)
            .map_err(|_| RouteError::Duplicate {
                method,
                template: normalized,
            })?;
        self.route_count += 1;
        Ok(())
    }

    /// Resolves a raw request path (no query string).
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch<'_, T>, RouteMiss> {
        let split = split_path(path);
        let mut allowed: Vec<Method> = Vec::new();
        let mut path_matched = false;

        for route in &self.routes {
            let Some(params) = route.template.matches(&split.segments) else {
                continue;
            };
            if let Some(value) = route.methods.get(method) {
                return Ok(RouteMatch {
                    value,
                    template: route.template.as_str(),
                    params,
                    matrix: split.matrix,
                });
            }
            path_matched = true;
            for m in route.methods.allowed() {
                if !allowed.contains(&m) {
                    allowed.push(m);
                }
            }
        }

        if path_matched {
            allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            Err(RouteMiss::MethodNotAllowed { allowed })
        } else {
            Err(RouteMiss::NotFound)
        }
    }

    /// Number of registered (method, template) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }

    /// Iterates `(method, template, value)` in resolution order: template
    /// specificity first, then method name.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str, &T)> {
        self.routes.iter().flat_map(|r| {
            r.methods
                .iter()
                .map(move |(m, v)| (m, r.template.as_str(), v))
        })
    }
}
