//! Request and response context types.
//!
//! The [`RequestContext`] is the mutable view of one in-flight request. It is
//! created at pipeline entry, handed by `&mut` to each phase, and dropped
//! once the response is sent. The [`ResponseContext`] is created after
//! invocation (or after exception resolution) and is what response filters
//! edit before the response goes out.

use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE};
use http::{HeaderMap, Method, StatusCode, Uri};
use indexmap::IndexMap;
use pylon_router::Params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PylonError, PylonResult};
use crate::media::{parse_accept, MediaType};
use crate::response::ResponseDescriptor;
use crate::security::SecurityContext;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log correlation cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses an inbound `x-request-id`, falling back to a fresh ID.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map_or_else(Self::new, Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request-scoped property bag.
///
/// Keys keep insertion order so that debug output is stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    values: IndexMap<String, serde_json::Value>,
}

impl Properties {
    /// Returns a property.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name)
    }

    /// Sets a property, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.values.insert(name.into(), value)
    }

    /// Removes a property.
    pub fn remove(&mut self, name: &str) -> Option<serde_json::Value> {
        self.values.shift_remove(name)
    }

    /// Property names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns `true` if no properties are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// What the router resolved the request to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// Identifier of the matched operation.
    pub operation_id: String,
    /// The matched path template.
    pub template: String,
    /// The operation's binding tags.
    pub tags: BTreeSet<String>,
}

/// Mutable per-request state.
///
/// Method and URI may be rewritten only before routing; once the route is
/// resolved, [`set_method`](Self::set_method) and
/// [`set_request_uri`](Self::set_request_uri) fail with `illegal_state`.
///
/// # Example
///
/// ```
/// use pylon_core::RequestContext;
/// use http::Method;
///
/// let mut ctx = RequestContext::builder(Method::GET, "/widgets?color=red")
///     .header("accept", "application/json")
///     .build()
///     .unwrap();
///
/// assert_eq!(ctx.path(), "/widgets");
/// assert_eq!(ctx.query_values("color"), vec!["red"]);
///
/// ctx.set_request_uri("/v2/widgets").unwrap();
/// assert_eq!(ctx.path(), "/v2/widgets");
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    entity: Bytes,
    properties: Properties,
    security: SecurityContext,
    route: Option<RouteInfo>,
    path_params: Params,
    matrix_params: Params,
    abort: Option<ResponseDescriptor>,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a context from transport parts.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, entity: Bytes) -> Self {
        let request_id = RequestId::from_header(
            headers
                .get("x-request-id")
                .and_then(|v| v.to_str().ok()),
        );
        let query = parse_query(uri.query());
        let security = SecurityContext::anonymous().secure(is_https(&uri, &headers));
        Self {
            request_id,
            method,
            uri,
            headers,
            query,
            entity,
            properties: Properties::default(),
            security,
            route: None,
            path_params: Params::new(),
            matrix_params: Params::new(),
            abort: None,
            started_at: Instant::now(),
        }
    }

    /// Starts a builder, mostly for tests and the in-memory client.
    #[must_use]
    pub fn builder(method: Method, uri: &str) -> RequestContextBuilder {
        RequestContextBuilder {
            method,
            uri: uri.to_string(),
            headers: HeaderMap::new(),
            entity: Bytes::new(),
        }
    }

    /// The request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// The HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// The request URI.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The raw path, still percent-encoded, including matrix parameters.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Rewrites the method. Only allowed before routing.
    pub fn set_method(&mut self, method: Method) -> PylonResult<()> {
        self.ensure_unmatched("set_method")?;
        self.method = method;
        Ok(())
    }

    /// Rewrites the URI and re-parses its query. Only allowed before routing.
    pub fn set_request_uri(&mut self, uri: &str) -> PylonResult<()> {
        self.ensure_unmatched("set_request_uri")?;
        let uri: Uri = uri
            .parse()
            .map_err(|e| PylonError::bad_request(format!("invalid request URI: {e}")))?;
        self.query = parse_query(uri.query());
        self.uri = uri;
        Ok(())
    }

    fn ensure_unmatched(&self, operation: &str) -> PylonResult<()> {
        if self.route.is_some() {
            return Err(PylonError::illegal_state(format!(
                "{operation} is only permitted before the request is matched"
            )));
        }
        Ok(())
    }

    /// All request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The first value of a header, if it is valid text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every value of a header. Comma-separated values are split.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// The parsed `Content-Type`, if present and valid.
    ///
    /// Use [`RequestContext::declared_content_type`] to tell a missing header
    /// from a malformed one.
    #[must_use]
    pub fn content_type(&self) -> Option<MediaType> {
        self.declared_content_type().ok().flatten()
    }

    /// The `Content-Type` header: `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// A `not_supported` error (415) when the header is present but is not a
    /// valid media type.
    pub fn declared_content_type(&self) -> PylonResult<Option<MediaType>> {
        let Some(value) = self.headers.get(CONTENT_TYPE) else {
            return Ok(None);
        };
        value
            .to_str()
            .ok()
            .and_then(MediaType::parse)
            .map(Some)
            .ok_or_else(|| {
                PylonError::not_supported(format!(
                    "malformed content type '{}'",
                    String::from_utf8_lossy(value.as_bytes())
                ))
            })
    }

    /// The parsed `Accept` list, `*/*` when absent.
    #[must_use]
    pub fn acceptable_media_types(&self) -> Vec<MediaType> {
        parse_accept(self.headers.get(ACCEPT).and_then(|v| v.to_str().ok()))
    }

    /// Decoded query pairs in order.
    #[must_use]
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Every value of a query parameter, in order.
    #[must_use]
    pub fn query_values(&self, name: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Request cookies in header order. Surrounding quotes are removed.
    #[must_use]
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                Some((
                    name.trim().to_string(),
                    value.trim().trim_matches('"').to_string(),
                ))
            })
            .collect()
    }

    /// A cookie by name.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// The raw entity bytes.
    #[must_use]
    pub const fn entity(&self) -> &Bytes {
        &self.entity
    }

    /// Replaces the entity, e.g. after a filter decompresses it.
    pub fn set_entity(&mut self, entity: Bytes) {
        self.entity = entity;
    }

    /// Returns `true` if the request carries a body.
    #[must_use]
    pub fn has_entity(&self) -> bool {
        !self.entity.is_empty()
    }

    /// The property bag.
    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    /// The mutable property bag.
    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// Shorthand for `properties().get(name)`.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.get(name)
    }

    /// Shorthand for `properties_mut().insert(name, value)`.
    pub fn set_property(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.properties.insert(name, value);
    }

    /// The security context.
    #[must_use]
    pub const fn security(&self) -> &SecurityContext {
        &self.security
    }

    /// Installs a security context.
    pub fn set_security(&mut self, security: SecurityContext) {
        self.security = security;
    }

    /// The resolved route, once matched.
    #[must_use]
    pub const fn route(&self) -> Option<&RouteInfo> {
        self.route.as_ref()
    }

    /// Records the route match. Freezes method and URI.
    pub fn set_route(&mut self, route: RouteInfo, path_params: Params, matrix_params: Params) {
        self.route = Some(route);
        self.path_params = path_params;
        self.matrix_params = matrix_params;
    }

    /// Captured path parameters.
    #[must_use]
    pub const fn path_params(&self) -> &Params {
        &self.path_params
    }

    /// Matrix parameters of the last path segment.
    #[must_use]
    pub const fn matrix_params(&self) -> &Params {
        &self.matrix_params
    }

    /// Aborts the request with `response`. Remaining phases are skipped.
    pub fn abort_with(&mut self, response: ResponseDescriptor) {
        self.abort = Some(response);
    }

    /// Returns `true` once a filter has aborted.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.abort.is_some()
    }

    /// Takes the abort response, leaving the context un-aborted.
    pub fn take_abort(&mut self) -> Option<ResponseDescriptor> {
        self.abort.take()
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Builder for [`RequestContext`].
#[derive(Debug)]
pub struct RequestContextBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    entity: Bytes,
}

impl RequestContextBuilder {
    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the entity.
    #[must_use]
    pub fn entity(mut self, entity: impl Into<Bytes>) -> Self {
        self.entity = entity.into();
        self
    }

    /// Builds the context, failing on an unparsable URI.
    pub fn build(self) -> PylonResult<RequestContext> {
        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| PylonError::bad_request(format!("invalid request URI: {e}")))?;
        Ok(RequestContext::new(self.method, uri, self.headers, self.entity))
    }
}

/// Parses a query string into decoded pairs, dropping malformed input.
#[must_use]
pub fn parse_query(query: Option<&str>) -> Vec<(String, String)> {
    query
        .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
        .unwrap_or_default()
}

fn is_https(uri: &Uri, headers: &HeaderMap) -> bool {
    uri.scheme_str() == Some("https")
        || headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("https"))
}

/// Mutable response state seen by writer interceptors and response filters.
///
/// Setting a new entity discards any bytes encoded for the previous one, so
/// the pipeline knows to encode again before sending.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    status: StatusCode,
    headers: HeaderMap,
    entity: Option<serde_json::Value>,
    media_type: Option<MediaType>,
    encoded: Option<Bytes>,
}

impl ResponseContext {
    /// A response with `status` and nothing else.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            entity: None,
            media_type: None,
            encoded: None,
        }
    }

    /// The status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Changes the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// The response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Appends a header. Invalid names or values are ignored.
    pub fn append_header(&mut self, name: &str, value: &str) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
    }

    /// The entity, if any.
    #[must_use]
    pub const fn entity(&self) -> Option<&serde_json::Value> {
        self.entity.as_ref()
    }

    /// Replaces the entity and invalidates encoded bytes.
    pub fn set_entity(&mut self, entity: Option<serde_json::Value>) {
        self.entity = entity;
        self.encoded = None;
    }

    /// Returns `true` if an entity is present.
    #[must_use]
    pub const fn has_entity(&self) -> bool {
        self.entity.is_some()
    }

    /// The negotiated media type.
    #[must_use]
    pub const fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    /// Changes the media type and invalidates encoded bytes.
    pub fn set_media_type(&mut self, media_type: Option<MediaType>) {
        self.media_type = media_type;
        self.encoded = None;
    }

    /// Bytes produced by the encode phase, if still valid.
    #[must_use]
    pub const fn encoded(&self) -> Option<&Bytes> {
        self.encoded.as_ref()
    }

    /// Stores encoded bytes.
    pub fn set_encoded(&mut self, bytes: Bytes) {
        self.encoded = Some(bytes);
    }

    /// Takes the encoded bytes.
    pub fn take_encoded(&mut self) -> Option<Bytes> {
        self.encoded.take()
    }
}

impl From<ResponseDescriptor> for ResponseContext {
    fn from(descriptor: ResponseDescriptor) -> Self {
        let (status, headers, entity, media_type) = descriptor.into_parts();
        Self {
            status,
            headers,
            entity,
            media_type,
            encoded: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use serde_json::json;

    fn ctx(uri: &str) -> RequestContext {
        RequestContext::builder(Method::GET, uri).build().unwrap()
    }

    #[test]
    fn test_query_multi_values_and_decoding() {
        let ctx = ctx("/w?tag=a&tag=b%20c&x=1");
        assert_eq!(ctx.query_values("tag"), vec!["a", "b c"]);
        assert_eq!(ctx.query_values("missing"), Vec::<&str>::new());
    }

    #[test]
    fn test_rewrite_forbidden_after_match() {
        let mut ctx = ctx("/a");
        ctx.set_method(Method::POST).unwrap();
        ctx.set_route(
            RouteInfo {
                operation_id: "op".into(),
                template: "/a".into(),
                tags: BTreeSet::new(),
            },
            Params::new(),
            Params::new(),
        );
        let err = ctx.set_request_uri("/b").unwrap_err();
        assert!(err.is(&ErrorType::ILLEGAL_STATE));
        assert!(ctx.set_method(Method::GET).is_err());
        assert_eq!(ctx.method(), &Method::POST);
    }

    #[test]
    fn test_rewrite_reparses_query() {
        let mut ctx = ctx("/a?x=1");
        ctx.set_request_uri("/b?y=2").unwrap();
        assert!(ctx.query_values("x").is_empty());
        assert_eq!(ctx.query_values("y"), vec!["2"]);
    }

    #[test]
    fn test_malformed_content_type_is_not_supported() {
        assert_eq!(ctx("/").declared_content_type().unwrap(), None);

        let json = RequestContext::builder(Method::POST, "/")
            .header("content-type", "application/json")
            .build()
            .unwrap();
        assert_eq!(json.declared_content_type().unwrap(), Some(MediaType::json()));

        let garbage = RequestContext::builder(Method::POST, "/")
            .header("content-type", "garbage")
            .build()
            .unwrap();
        let err = garbage.declared_content_type().unwrap_err();
        assert!(err.is(&ErrorType::NOT_SUPPORTED));
        assert_eq!(garbage.content_type(), None);
    }

    #[test]
    fn test_cookies() {
        let ctx = RequestContext::builder(Method::GET, "/")
            .header("cookie", "session=abc; theme=\"dark\"")
            .header("cookie", "lang=en")
            .build()
            .unwrap();
        assert_eq!(ctx.cookie("theme").as_deref(), Some("dark"));
        assert_eq!(ctx.cookie("lang").as_deref(), Some("en"));
        assert_eq!(ctx.cookies().len(), 3);
    }

    #[test]
    fn test_header_values_split_commas() {
        let ctx = RequestContext::builder(Method::GET, "/")
            .header("x-tag", "a, b")
            .header("x-tag", "c")
            .build()
            .unwrap();
        assert_eq!(ctx.header_values("X-Tag"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_request_id_from_header() {
        let id = Uuid::now_v7();
        let ctx = RequestContext::builder(Method::GET, "/")
            .header("x-request-id", &id.to_string())
            .build()
            .unwrap();
        assert_eq!(ctx.request_id().as_uuid(), &id);

        let generated = RequestId::from_header(Some("not-a-uuid"));
        assert_ne!(generated.as_uuid(), &id);
    }

    #[test]
    fn test_forwarded_proto_marks_secure() {
        let ctx = RequestContext::builder(Method::GET, "/")
            .header("x-forwarded-proto", "HTTPS")
            .build()
            .unwrap();
        assert!(ctx.security().is_secure());
    }

    #[test]
    fn test_abort_roundtrip() {
        let mut ctx = ctx("/");
        assert!(!ctx.is_aborted());
        ctx.abort_with(ResponseDescriptor::status(StatusCode::UNAUTHORIZED));
        assert!(ctx.is_aborted());
        assert_eq!(ctx.take_abort().unwrap().status_code(), StatusCode::UNAUTHORIZED);
        assert!(!ctx.is_aborted());
    }

    #[test]
    fn test_properties_preserve_order() {
        let mut ctx = ctx("/");
        ctx.set_property("b", json!(1));
        ctx.set_property("a", json!(2));
        assert_eq!(ctx.properties().names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(ctx.properties_mut().remove("b"), Some(json!(1)));
        assert_eq!(ctx.property("a"), Some(&json!(2)));
    }

    #[test]
    fn test_response_entity_change_invalidates_encoding() {
        let mut response = ResponseContext::new(StatusCode::OK);
        response.set_encoded(Bytes::from_static(b"{}"));
        assert!(response.encoded().is_some());
        response.set_entity(Some(json!({"x": 1})));
        assert!(response.encoded().is_none());
    }
}
