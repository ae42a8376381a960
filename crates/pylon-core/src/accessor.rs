//! Current-request lookup for shared providers.
//!
//! Filters, interceptors and mappers are registered once and shared by every
//! request, so they must never keep request data in their own fields. A
//! provider that needs the in-flight request outside the arguments it is
//! handed takes a [`ContextAccessor`] at construction and calls
//! [`ContextAccessor::current`] while handling a request.
//!
//! The pipeline runs each execution inside a [`RequestScope`] backed by
//! `tokio::task_local!`. A lookup returns a [`RequestView`] snapshot of
//! *this* request, refreshed after every filter, after matching and after
//! decoding. A filter that changes the request and then looks it up within
//! the same call sees the state from before its change; it should read the
//! `RequestContext` it was handed instead. Work moved to a separately spawned
//! task leaves the scope and gets an `illegal_state` error.

use std::future::Future;
use std::sync::Arc;

use http::{HeaderMap, Method, Uri};
use parking_lot::RwLock;
use pylon_router::Params;

use crate::context::{Properties, RequestContext, RequestId, RouteInfo};
use crate::error::{PylonError, PylonResult};
use crate::security::SecurityContext;

tokio::task_local! {
    static CURRENT: Arc<RwLock<RequestView>>;
}

/// A read-only snapshot of the in-flight request, as of the last refresh.
#[derive(Debug, Clone)]
pub struct RequestView {
    /// The request ID.
    pub request_id: RequestId,
    /// The (possibly rewritten) method.
    pub method: Method,
    /// The (possibly rewritten) URI.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// The property bag.
    pub properties: Properties,
    /// The security context.
    pub security: SecurityContext,
    /// The resolved route, once matched.
    pub route: Option<RouteInfo>,
    /// Captured path parameters.
    pub path_params: Params,
    /// Query pairs in arrival order.
    pub query: Vec<(String, String)>,
    /// Matrix parameters of the last path segment.
    pub matrix_params: Params,
}

impl From<&RequestContext> for RequestView {
    fn from(ctx: &RequestContext) -> Self {
        Self {
            request_id: ctx.request_id(),
            method: ctx.method().clone(),
            uri: ctx.uri().clone(),
            headers: ctx.headers().clone(),
            properties: ctx.properties().clone(),
            security: ctx.security().clone(),
            route: ctx.route().cloned(),
            path_params: ctx.path_params().clone(),
            query: ctx.query_pairs().to_vec(),
            matrix_params: ctx.matrix_params().clone(),
        }
    }
}

/// Resolves the current request for shared providers.
///
/// # Example
///
/// ```
/// use pylon_core::{ContextAccessor, RequestContext, RequestScope};
/// use http::Method;
///
/// # tokio_test::block_on(async {
/// let accessor = ContextAccessor::new();
/// assert!(accessor.current().is_err());
///
/// let ctx = RequestContext::builder(Method::GET, "/widgets").build().unwrap();
/// let scope = RequestScope::new(&ctx);
/// let path = scope
///     .run(async { accessor.current().map(|view| view.uri.path().to_string()) })
///     .await
///     .unwrap();
/// assert_eq!(path, "/widgets");
/// # });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAccessor {
    _private: (),
}

impl ContextAccessor {
    /// Creates an accessor.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Returns a snapshot of the current request.
    pub fn current(&self) -> PylonResult<RequestView> {
        self.with(Clone::clone)
    }

    /// Runs `f` against the current request without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&RequestView) -> R) -> PylonResult<R> {
        CURRENT
            .try_with(|slot| f(&*slot.read()))
            .map_err(|_| PylonError::illegal_state("no request is in scope"))
    }

    /// Returns `true` when called inside a pipeline execution.
    #[must_use]
    pub fn in_scope(&self) -> bool {
        CURRENT.try_with(|_| ()).is_ok()
    }
}

/// The per-execution slot behind [`ContextAccessor`].
#[derive(Debug, Clone)]
pub struct RequestScope {
    slot: Arc<RwLock<RequestView>>,
}

impl RequestScope {
    /// Creates a scope seeded from `ctx`.
    #[must_use]
    pub fn new(ctx: &RequestContext) -> Self {
        Self {
            slot: Arc::new(RwLock::new(RequestView::from(ctx))),
        }
    }

    /// Replaces the snapshot with the current state of `ctx`.
    pub fn publish(&self, ctx: &RequestContext) {
        *self.slot.write() = RequestView::from(ctx);
    }

    /// Runs `future` with this scope installed.
    pub async fn run<F: Future>(&self, future: F) -> F::Output {
        CURRENT.scope(Arc::clone(&self.slot), future).await
    }
}
