//! The request pipeline.
//!
//! [`Pipeline::execute`] drives one request through a fixed sequence of
//! phases. No phase runs twice, and every request leaves through exactly one
//! of three exits: an abort, the normal encode path or the error path.
//!
//! ```text
//! PreMatch → Match → Negotiate → RequestFilter → Bind → Decode → Invoke
//!                                                                  ↓
//!                           Send ← ResponseFilter ← Encode ←───────┘
//! ```
//!
//! | Exit | Response filters |
//! |------|------------------|
//! | abort in PreMatch or RequestFilter | none |
//! | failure before a route is known (PreMatch, Match) | global only, failures logged |
//! | negotiation failure (415, 406) | none |
//! | failure after Negotiate | operation's filters, failures logged |
//! | success | operation's filters, a failure is returned as `Err` |
//!
//! ## Example
//!
//! ```
//! use http::{Method, StatusCode};
//! use pylon_core::RequestContext;
//! use pylon_pipeline::{Operation, Pipeline, Registry};
//!
//! # tokio_test::block_on(async {
//! let registry = Registry::builder()
//!     .operation(Operation::get("/ping").to(|_| async { Ok("pong") }))
//!     .build()
//!     .unwrap();
//! let pipeline = Pipeline::new(registry);
//!
//! let ctx = RequestContext::builder(Method::GET, "/ping").build().unwrap();
//! let response = pipeline.execute(ctx).await.unwrap();
//! assert_eq!(response.status(), StatusCode::OK);
//! assert_eq!(response.body().as_ref(), br#""pong""#);
//! # });
//! ```

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use http::header::{HeaderName, HeaderValue, ALLOW, CONTENT_TYPE};
use http::{Method, Response, StatusCode};
use pylon_core::media::{accepts_content_type, negotiate};
use pylon_core::{
    MediaType, Outcome, PylonError, PylonResult, RequestContext, RequestScope, ResponseContext,
    ResponseDescriptor, RouteInfo,
};
use pylon_extract::{Binder, ParameterBinding};
use pylon_router::{join_methods, RouteMiss};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::filter::ResponseFilter;
use crate::interceptor::{encode_entity, ReadNext, WriteNext};
use crate::registry::Registry;
use crate::resolver::ExceptionResolver;

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// The phases of one execution, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Pre-matching filters.
    PreMatch,
    /// Route resolution.
    Match,
    /// Content-Type and Accept checks.
    Negotiate,
    /// Post-matching request filters.
    RequestFilter,
    /// Parameter binding.
    Bind,
    /// Entity decoding through reader interceptors.
    Decode,
    /// The operation call.
    Invoke,
    /// Outcome conversion and writer interceptors.
    Encode,
    /// Response filters.
    ResponseFilter,
    /// Serialization to the transport.
    Send,
}

impl Phase {
    /// Returns the name used in logs and metrics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PreMatch => "pre_match",
            Self::Match => "match",
            Self::Negotiate => "negotiate",
            Self::RequestFilter => "request_filter",
            Self::Bind => "bind",
            Self::Decode => "decode",
            Self::Invoke => "invoke",
            Self::Encode => "encode",
            Self::ResponseFilter => "response_filter",
            Self::Send => "send",
        }
    }

    /// Returns all phases in execution order.
    #[must_use]
    pub const fn all() -> [Self; 10] {
        [
            Self::PreMatch,
            Self::Match,
            Self::Negotiate,
            Self::RequestFilter,
            Self::Bind,
            Self::Decode,
            Self::Invoke,
            Self::Encode,
            Self::ResponseFilter,
            Self::Send,
        ]
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pipeline behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    expose_internal_errors: bool,
    default_media_type: MediaType,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            expose_internal_errors: false,
            default_media_type: MediaType::json(),
        }
    }
}

impl PipelineOptions {
    /// Default options: hidden 5xx messages, JSON by default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the original message in 5xx error envelopes.
    #[must_use]
    pub fn expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Media type used when negotiation leaves the choice open.
    #[must_use]
    pub fn default_media_type(mut self, media_type: MediaType) -> Self {
        self.default_media_type = media_type;
        self
    }

    /// Whether 5xx messages are exposed.
    #[must_use]
    pub const fn exposes_internal_errors(&self) -> bool {
        self.expose_internal_errors
    }

    /// The fallback media type.
    #[must_use]
    pub const fn fallback_media_type(&self) -> &MediaType {
        &self.default_media_type
    }
}

/// Where an execution ended and what it produced.
struct Finished {
    phase: Phase,
    response: ResponseContext,
}

/// Executes requests against a [`Registry`].
///
/// The pipeline is immutable and shared by all in-flight requests.
#[derive(Debug)]
pub struct Pipeline {
    registry: Registry,
    options: PipelineOptions,
}

impl Pipeline {
    /// Creates a pipeline with default options.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self::with_options(registry, PipelineOptions::default())
    }

    /// Creates a pipeline with `options`.
    #[must_use]
    pub const fn with_options(registry: Registry, options: PipelineOptions) -> Self {
        Self { registry, options }
    }

    /// The registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The options.
    #[must_use]
    pub const fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Runs one request to completion.
    ///
    /// Every failure is turned into a response, except a response filter
    /// failing on the success path, which is returned as `Err`.
    pub async fn execute(&self, mut ctx: RequestContext) -> PylonResult<Response<Bytes>> {
        let span = info_span!(
            "pylon.request",
            method = %ctx.method(),
            path = %ctx.path(),
            request_id = %ctx.request_id(),
        );
        let scope = RequestScope::new(&ctx);

        let finished = scope
            .run(self.run(&mut ctx, &scope))
            .instrument(span.clone())
            .await;

        span.in_scope(|| match finished {
            Ok(finished) => {
                let response = self.send(&ctx, finished.response);
                let status = response.status().as_u16();
                let elapsed = ctx.elapsed();
                info!(
                    status,
                    phase = finished.phase.name(),
                    duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "request completed"
                );
                pylon_telemetry::metrics::record_request(status, finished.phase.name(), elapsed);
                Ok(response)
            }
            Err(err) => {
                pylon_telemetry::metrics::record_request(
                    StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                    Phase::ResponseFilter.name(),
                    ctx.elapsed(),
                );
                Err(err)
            }
        })
    }

    async fn run(&self, ctx: &mut RequestContext, scope: &RequestScope) -> PylonResult<Finished> {
        // PreMatch
        for entry in self.registry.pre_match_filters() {
            let filter = entry.provider();
            debug!(phase = Phase::PreMatch.name(), provider = filter.name(), "running filter");
            let result = filter.filter(ctx).await;
            scope.publish(ctx);
            if let Err(err) = result {
                let filters = self.registry.global_response_filters();
                return Ok(self.fail(ctx, Phase::PreMatch, &err, &filters).await);
            }
            if let Some(abort) = ctx.take_abort() {
                return Ok(Self::aborted(Phase::PreMatch, abort));
            }
        }

        // Match
        let method = ctx.method().clone();
        let path = ctx.path().to_string();
        let resolved = self.registry.router().resolve(&method, &path);
        let route = match resolved {
            Ok(route) => route,
            Err(RouteMiss::MethodNotAllowed { allowed }) if method == Method::OPTIONS => {
                let mut response = ResponseContext::new(StatusCode::NO_CONTENT);
                response.append_header(ALLOW.as_str(), &join_methods(&allowed));
                let filters = self.registry.global_response_filters();
                Self::run_response_filters(ctx, &filters, &mut response).await?;
                return Ok(Finished {
                    phase: Phase::Match,
                    response,
                });
            }
            Err(miss) => {
                let err = match miss.allow_header() {
                    Some(allow) => {
                        PylonError::not_allowed(format!("{method} is not allowed on {path}"), &allow)
                    }
                    None => PylonError::not_found(format!("no operation matches {path}")),
                };
                let filters = self.registry.global_response_filters();
                return Ok(self.fail(ctx, Phase::Match, &err, &filters).await);
            }
        };
        let Some(operation) = self.registry.operations().get(*route.value) else {
            let err = PylonError::illegal_state("route points at an unknown operation");
            return Ok(self.fail(ctx, Phase::Match, &err, &[]).await);
        };
        let tags = &operation.tags;
        ctx.set_route(
            RouteInfo {
                operation_id: operation.id.clone(),
                template: operation.template.clone(),
                tags: tags.clone(),
            },
            route.params,
            route.matrix,
        );
        scope.publish(ctx);
        debug!(phase = Phase::Match.name(), operation_id = %operation.id, "route matched");

        // Negotiate
        let content_type = match ctx.declared_content_type() {
            Ok(content_type) => content_type,
            Err(err) => return Ok(self.fail(ctx, Phase::Negotiate, &err, &[]).await),
        };
        if !accepts_content_type(content_type.as_ref(), &operation.consumes) {
            let err = PylonError::not_supported(format!(
                "operation {} does not consume {}",
                operation.id,
                ctx.header("content-type").unwrap_or_default()
            ));
            return Ok(self.fail(ctx, Phase::Negotiate, &err, &[]).await);
        }
        let negotiated = negotiate(
            &ctx.acceptable_media_types(),
            &operation.produces,
            &self.options.default_media_type,
        );
        let Some(media_type) = negotiated else {
            let err = PylonError::not_acceptable(format!(
                "operation {} cannot produce any acceptable media type",
                operation.id
            ));
            return Ok(self.fail(ctx, Phase::Negotiate, &err, &[]).await);
        };

        let response_filters = self.registry.response_filters_for(tags);

        // RequestFilter
        for filter in self.registry.request_filters_for(tags) {
            debug!(phase = Phase::RequestFilter.name(), provider = filter.name(), "running filter");
            let result = filter.filter(ctx).await;
            scope.publish(ctx);
            if let Err(err) = result {
                return Ok(self
                    .fail(ctx, Phase::RequestFilter, &err, &response_filters)
                    .await);
            }
            if let Some(abort) = ctx.take_abort() {
                return Ok(Self::aborted(Phase::RequestFilter, abort));
            }
        }

        // Bind
        let bound = Binder::new(ctx).bind_all(&operation.bindings);
        let mut args = match bound {
            Ok(args) => args,
            Err(err) => return Ok(self.fail(ctx, Phase::Bind, &err, &response_filters).await),
        };

        // Decode
        let body_target = args
            .body_index()
            .and_then(|index| operation.bindings.get(index))
            .and_then(ParameterBinding::body_target);
        if let Some(target) = body_target {
            let readers = self.registry.reader_interceptors_for(tags);
            let decoded = ReadNext::new(&readers, self.registry.codecs())
                .proceed(ctx)
                .await
                .and_then(|value| {
                    let typed = target.decode(&value)?;
                    Ok((value, typed))
                });
            scope.publish(ctx);
            match decoded {
                Ok((value, typed)) => {
                    args.set_body(value);
                    if let Some(typed) = typed {
                        args.set_typed_body(typed);
                    }
                }
                Err(err) => {
                    return Ok(self.fail(ctx, Phase::Decode, &err, &response_filters).await)
                }
            }
        }

        // Invoke
        debug!(phase = Phase::Invoke.name(), operation_id = %operation.id, "invoking operation");
        let handler = Arc::clone(&operation.handler);
        let invoked = AssertUnwindSafe(async move { handler(args).await })
            .catch_unwind()
            .await;
        let outcome = match invoked {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                return Ok(self.fail(ctx, Phase::Invoke, &err, &response_filters).await)
            }
            Err(_) => {
                error!(operation_id = %operation.id, "operation panicked");
                let err = PylonError::failure("operation panicked");
                return Ok(self.fail(ctx, Phase::Invoke, &err, &response_filters).await);
            }
        };

        // Encode
        let mut response = match outcome {
            Outcome::Void => ResponseContext::new(StatusCode::NO_CONTENT),
            Outcome::Value(value) => {
                let mut response = ResponseContext::new(StatusCode::OK);
                response.set_entity(Some(value));
                response.set_media_type(Some(media_type));
                response
            }
            Outcome::Response(descriptor) => {
                let mut response = ResponseContext::from(descriptor);
                if response.has_entity() && response.media_type().is_none() {
                    response.set_media_type(Some(media_type));
                }
                response
            }
        };
        if response.has_entity() {
            let writers = self.registry.writer_interceptors_for(tags);
            let encoded = WriteNext::new(
                &writers,
                self.registry.codecs(),
                &self.options.default_media_type,
            )
            .proceed(ctx, &mut response)
            .await;
            if let Err(err) = encoded {
                return Ok(self.fail(ctx, Phase::Encode, &err, &response_filters).await);
            }
        }

        // ResponseFilter
        Self::run_response_filters(ctx, &response_filters, &mut response).await?;

        Ok(Finished {
            phase: Phase::Send,
            response,
        })
    }

    /// Runs response filters on the success path. The first failure stops
    /// the execution.
    async fn run_response_filters(
        ctx: &RequestContext,
        filters: &[Arc<dyn ResponseFilter>],
        response: &mut ResponseContext,
    ) -> PylonResult<()> {
        for filter in filters {
            debug!(phase = Phase::ResponseFilter.name(), provider = filter.name(), "running filter");
            if let Err(err) = filter.filter(ctx, response).await {
                error!(provider = filter.name(), error = %err, "response filter failed");
                return Err(err);
            }
        }
        Ok(())
    }

    /// The error path: resolve, then run `filters` with failures logged.
    async fn fail(
        &self,
        ctx: &RequestContext,
        phase: Phase,
        err: &PylonError,
        filters: &[Arc<dyn ResponseFilter>],
    ) -> Finished {
        debug!(
            phase = phase.name(),
            error_type = err.error_type().name(),
            "handling failure"
        );
        let request_id = ctx.request_id().to_string();
        let resolver = ExceptionResolver::new(&self.registry, self.options.expose_internal_errors);
        let mut response = resolver.resolve(err, &request_id).response;

        for filter in filters {
            if let Err(filter_error) = filter.filter(ctx, &mut response).await {
                warn!(
                    provider = filter.name(),
                    error = %filter_error,
                    "response filter failed while handling a failure"
                );
            }
        }

        Finished { phase, response }
    }

    fn aborted(phase: Phase, abort: ResponseDescriptor) -> Finished {
        debug!(
            phase = phase.name(),
            status = abort.status_code().as_u16(),
            "request aborted"
        );
        pylon_telemetry::metrics::record_abort(phase.name());
        Finished {
            phase,
            response: ResponseContext::from(abort),
        }
    }

    /// Serializes a response, encoding again if a filter replaced the entity.
    fn send(&self, ctx: &RequestContext, mut response: ResponseContext) -> Response<Bytes> {
        if response.encoded().is_none() && response.has_entity() {
            if let Err(err) = encode_entity(
                &mut response,
                self.registry.codecs(),
                &self.options.default_media_type,
            ) {
                error!(error = %err, "failed to encode response entity");
                response = ResponseContext::new(StatusCode::INTERNAL_SERVER_ERROR);
            }
        }

        let body = response.take_encoded().unwrap_or_default();
        let content_type = if body.is_empty() {
            None
        } else {
            response
                .media_type()
                .and_then(|m| HeaderValue::from_str(&m.to_string()).ok())
        };

        let mut http_response = Response::new(if *ctx.method() == Method::HEAD {
            Bytes::new()
        } else {
            body
        });
        *http_response.status_mut() = response.status();
        *http_response.headers_mut() = response.headers().clone();

        let headers = http_response.headers_mut();
        if let Some(value) = content_type {
            headers.insert(CONTENT_TYPE, value);
        }
        if let Ok(value) = HeaderValue::from_str(&ctx.request_id().to_string()) {
            headers.insert(X_REQUEST_ID, value);
        }
        http_response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FnRequestFilter, FnResponseFilter};
    use crate::operation::Operation;
    use crate::registry::Registration;
    use pylon_core::{ContextAccessor, ErrorType};
    use serde_json::{json, Value};

    fn request(method: Method, uri: &str) -> RequestContext {
        RequestContext::builder(method, uri).build().unwrap()
    }

    fn json_body(response: &Response<Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    fn widgets() -> Registry {
        Registry::builder()
            .operation(
                Operation::get("/widgets")
                    .produces("application/json")
                    .to(|_| async { Ok(json!([])) }),
            )
            .operation(Operation::delete("/widgets/{id}").to(|_| async { Ok(()) }))
            .build()
            .unwrap()
    }

    #[test]
    fn test_phase_order() {
        let names: Vec<_> = Phase::all().iter().map(|p| p.name()).collect();
        assert_eq!(names.first(), Some(&"pre_match"));
        assert_eq!(names.last(), Some(&"send"));
        assert_eq!(Phase::Decode.to_string(), "decode");
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let pipeline = Pipeline::new(widgets());
        let ctx = request(Method::GET, "/gadgets");
        let request_id = ctx.request_id().to_string();

        let response = pipeline.execute(ctx).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-request-id"], request_id.as_str());
        let body = json_body(&response);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["request_id"], request_id.as_str());
    }

    #[tokio::test]
    async fn test_method_not_allowed_has_allow() {
        let pipeline = Pipeline::new(widgets());
        let response = pipeline
            .execute(request(Method::POST, "/widgets"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, HEAD, OPTIONS");
    }

    #[tokio::test]
    async fn test_options_answers_allow() {
        let pipeline = Pipeline::new(widgets());
        let response = pipeline
            .execute(request(Method::OPTIONS, "/widgets/3"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[ALLOW], "DELETE, OPTIONS");
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_head_strips_body() {
        let pipeline = Pipeline::new(widgets());
        let response = pipeline
            .execute(request(Method::HEAD, "/widgets"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_void_is_no_content() {
        let pipeline = Pipeline::new(widgets());
        let response = pipeline
            .execute(request(Method::DELETE, "/widgets/3"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_unsupported_checked_before_acceptable() {
        let registry = Registry::builder()
            .operation(
                Operation::post("/widgets")
                    .consumes("application/json")
                    .produces("application/json")
                    .to(|_| async { Ok(()) }),
            )
            .build()
            .unwrap();
        let pipeline = Pipeline::new(registry);
        let ctx = RequestContext::builder(Method::POST, "/widgets")
            .header("content-type", "text/plain")
            .header("accept", "text/html")
            .entity("hi")
            .build()
            .unwrap();

        let response = pipeline.execute(ctx).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_pre_match_rewrite_reroutes() {
        let registry = Registry::builder()
            .pre_match_filter(
                FnRequestFilter::new("v1-alias", |ctx| {
                    if let Some(rest) = ctx.path().strip_prefix("/v1") {
                        let rewritten = rest.to_string();
                        ctx.set_request_uri(&rewritten)?;
                    }
                    Ok(())
                }),
                10,
            )
            .operation(Operation::get("/ping").to(|_| async { Ok("pong") }))
            .build()
            .unwrap();

        let response = Pipeline::new(registry)
            .execute(request(Method::GET, "/v1/ping"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rewrite_after_match_is_illegal_state() {
        let registry = Registry::builder()
            .request_filter(
                FnRequestFilter::new("late-rewrite", |ctx| ctx.set_request_uri("/other")),
                Registration::new(),
            )
            .operation(Operation::get("/ping").to(|_| async { Ok("pong") }))
            .build()
            .unwrap();
        let pipeline = Pipeline::with_options(
            registry,
            PipelineOptions::new().expose_internal_errors(true),
        );

        let response = pipeline.execute(request(Method::GET, "/ping")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(&response)["error"]["code"], "ILLEGAL_STATE");
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let registry = Registry::builder()
            .operation(Operation::get("/boom").to(|_| async {
                if true {
                    panic!("kaboom");
                }
                Ok(())
            }))
            .build()
            .unwrap();
        let pipeline = Pipeline::with_options(
            registry,
            PipelineOptions::new().expose_internal_errors(true),
        );

        let response = pipeline.execute(request(Method::GET, "/boom")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(&response);
        assert_eq!(body["error"]["code"], "FAILURE");
        assert_eq!(body["error"]["message"], "operation panicked");
    }

    #[tokio::test]
    async fn test_error_path_suppresses_filter_failure_and_sees_properties() {
        let registry = Registry::builder()
            .request_filter(
                FnRequestFilter::new("tenant", |ctx| {
                    ctx.set_property("tenant", json!("acme"));
                    Ok(())
                }),
                Registration::new(),
            )
            .response_filter(
                FnResponseFilter::new("explode", |_, _| Err(PylonError::internal("filter bug"))),
                Registration::new().priority(1),
            )
            .response_filter(
                FnResponseFilter::new("tenant-header", |req, res| {
                    let tenant = req
                        .property("tenant")
                        .and_then(Value::as_str)
                        .unwrap_or("none")
                        .to_string();
                    res.append_header("x-tenant", &tenant);
                    Ok(())
                }),
                Registration::new().priority(2),
            )
            .operation(Operation::get("/fail").to(|_| async {
                Err::<(), _>(PylonError::forbidden("no"))
            }))
            .build()
            .unwrap();

        let response = Pipeline::new(registry)
            .execute(request(Method::GET, "/fail"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers()["x-tenant"], "acme");
    }

    #[tokio::test]
    async fn test_success_path_filter_failure_propagates() {
        let registry = Registry::builder()
            .response_filter(
                FnResponseFilter::new("explode", |_, _| Err(PylonError::internal("filter bug"))),
                Registration::new(),
            )
            .operation(Operation::get("/ok").to(|_| async { Ok("fine") }))
            .build()
            .unwrap();

        let err = Pipeline::new(registry)
            .execute(request(Method::GET, "/ok"))
            .await
            .unwrap_err();
        assert!(err.is(&ErrorType::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_response_filter_entity_change_is_encoded() {
        let registry = Registry::builder()
            .response_filter(
                FnResponseFilter::new("wrap", |_, res| {
                    let inner = res.entity().cloned().unwrap_or_default();
                    res.set_entity(Some(json!({ "data": inner })));
                    Ok(())
                }),
                Registration::new(),
            )
            .operation(Operation::get("/n").to(|_| async { Ok(json!(1)) }))
            .build()
            .unwrap();

        let response = Pipeline::new(registry)
            .execute(request(Method::GET, "/n"))
            .await
            .unwrap();
        assert_eq!(json_body(&response), json!({"data": 1}));
    }

    #[tokio::test]
    async fn test_accessor_sees_route_inside_operation() {
        let accessor = ContextAccessor::new();
        let registry = Registry::builder()
            .operation(Operation::get("/whoami/{name}").id("whoami").to(move |_| async move {
                let view = accessor.current()?;
                Ok(json!({
                    "operation": view.route.map(|r| r.operation_id),
                    "name": view.path_params.get("name"),
                }))
            }))
            .build()
            .unwrap();

        let response = Pipeline::new(registry)
            .execute(request(Method::GET, "/whoami/ada"))
            .await
            .unwrap();
        assert_eq!(
            json_body(&response),
            json!({"operation": "whoami", "name": "ada"})
        );
    }

    #[tokio::test]
    async fn test_inbound_request_id_is_echoed() {
        let pipeline = Pipeline::new(widgets());
        let id = "01890a5d-ac96-774b-bcce-b302099a8057";
        let ctx = RequestContext::builder(Method::GET, "/widgets")
            .header("x-request-id", id)
            .build()
            .unwrap();

        let response = pipeline.execute(ctx).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], id);
    }
}
