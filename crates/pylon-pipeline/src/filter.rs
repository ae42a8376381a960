//! Request and response filters.
//!
//! Filters are shared by every request, so they keep no request data in
//! their own fields. Everything they need arrives as arguments, or through
//! a [`ContextAccessor`](pylon_core::ContextAccessor) taken at construction.
//!
//! A [`RequestFilter`] registered as pre-matching runs before routing and
//! may rewrite the method or URI. Registered as post-matching it runs after
//! routing and sees the resolved [`RouteInfo`](pylon_core::RouteInfo).
//! Either kind stops the request with
//! [`RequestContext::abort_with`](pylon_core::RequestContext::abort_with).
//!
//! # Example
//!
//! ```
//! use pylon_core::{RequestContext, ResponseDescriptor};
//! use pylon_pipeline::{BoxFuture, RequestFilter};
//! use http::StatusCode;
//!
//! struct RequireApiKey;
//!
//! impl RequestFilter for RequireApiKey {
//!     fn name(&self) -> &'static str {
//!         "require-api-key"
//!     }
//!
//!     fn filter<'a>(
//!         &'a self,
//!         ctx: &'a mut RequestContext,
//!     ) -> BoxFuture<'a, pylon_core::PylonResult<()>> {
//!         Box::pin(async move {
//!             if ctx.header("x-api-key").is_none() {
//!                 ctx.abort_with(ResponseDescriptor::status(StatusCode::UNAUTHORIZED));
//!             }
//!             Ok(())
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use pylon_core::{PylonResult, RequestContext, ResponseContext};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Runs against the request before the operation.
///
/// Returning `Err` sends the request down the error path. Aborting is not
/// an error: the abort response is sent as is.
pub trait RequestFilter: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Inspects or changes the request.
    fn filter<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, PylonResult<()>>;
}

/// Runs against the response after encoding.
pub trait ResponseFilter: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Inspects or changes the response.
    ///
    /// Changing the entity or media type discards the encoded bytes, and
    /// the pipeline encodes again before sending.
    fn filter<'a>(
        &'a self,
        req: &'a RequestContext,
        res: &'a mut ResponseContext,
    ) -> BoxFuture<'a, PylonResult<()>>;
}

/// A request filter built from a synchronous closure.
///
/// ```
/// use pylon_pipeline::FnRequestFilter;
/// use serde_json::json;
///
/// let filter = FnRequestFilter::new("tenant", |ctx| {
///     let tenant = ctx.header("x-tenant").unwrap_or("public").to_string();
///     ctx.set_property("tenant", json!(tenant));
///     Ok(())
/// });
/// ```
pub struct FnRequestFilter<F> {
    name: &'static str,
    func: F,
}

impl<F> FnRequestFilter<F>
where
    F: Fn(&mut RequestContext) -> PylonResult<()> + Send + Sync + 'static,
{
    /// Wraps `func` under `name`.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> RequestFilter for FnRequestFilter<F>
where
    F: Fn(&mut RequestContext) -> PylonResult<()> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn filter<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, PylonResult<()>> {
        let result = (self.func)(ctx);
        Box::pin(std::future::ready(result))
    }
}

/// A response filter built from a synchronous closure.
pub struct FnResponseFilter<F> {
    name: &'static str,
    func: F,
}

impl<F> FnResponseFilter<F>
where
    F: Fn(&RequestContext, &mut ResponseContext) -> PylonResult<()> + Send + Sync + 'static,
{
    /// Wraps `func` under `name`.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> ResponseFilter for FnResponseFilter<F>
where
    F: Fn(&RequestContext, &mut ResponseContext) -> PylonResult<()> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn filter<'a>(
        &'a self,
        req: &'a RequestContext,
        res: &'a mut ResponseContext,
    ) -> BoxFuture<'a, PylonResult<()>> {
        let result = (self.func)(req, res);
        Box::pin(std::future::ready(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use pylon_core::{PylonError, ResponseDescriptor};
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_request_filter_mutates_context() {
        let filter = FnRequestFilter::new("mark", |ctx: &mut RequestContext| {
            ctx.set_property("seen", json!(true));
            Ok(())
        });
        let mut ctx = RequestContext::builder(Method::GET, "/").build().unwrap();

        filter.filter(&mut ctx).await.unwrap();
        assert_eq!(filter.name(), "mark");
        assert_eq!(ctx.property("seen"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_fn_request_filter_abort() {
        let filter = FnRequestFilter::new("deny", |ctx: &mut RequestContext| {
            ctx.abort_with(ResponseDescriptor::status(StatusCode::FORBIDDEN));
            Ok(())
        });
        let mut ctx = RequestContext::builder(Method::GET, "/").build().unwrap();

        filter.filter(&mut ctx).await.unwrap();
        assert!(ctx.is_aborted());
    }

    #[tokio::test]
    async fn test_fn_response_filter_error() {
        let filter = FnResponseFilter::new(
            "broken",
            |_req: &RequestContext, _res: &mut ResponseContext| {
                Err(PylonError::internal("boom"))
            },
        );
        let ctx = RequestContext::builder(Method::GET, "/").build().unwrap();
        let mut res = ResponseContext::new(StatusCode::OK);

        assert!(filter.filter(&ctx, &mut res).await.is_err());
    }
}
