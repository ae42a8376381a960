//! Request builder.

use bytes::Bytes;
use http::Method;
use pylon_core::RequestContext;
use pylon_pipeline::Pipeline;
use serde::Serialize;

use crate::error::TestError;
use crate::response::TestResponse;

/// A request being prepared for a [`TestClient`](crate::TestClient).
#[must_use = "a test request does nothing until sent"]
pub struct TestRequest<'a> {
    pipeline: &'a Pipeline,
    method: Method,
    uri: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Bytes,
    error: Option<TestError>,
}

impl<'a> TestRequest<'a> {
    pub(crate) fn new(pipeline: &'a Pipeline, method: Method, uri: &str) -> Self {
        Self {
            pipeline,
            method,
            uri: uri.to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Bytes::new(),
            error: None,
        }
    }

    /// Adds a header. Repeating a name adds another value.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.headers
            .push((name.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    /// Sets `Content-Type`.
    pub fn content_type(self, media_type: impl AsRef<str>) -> Self {
        self.header("content-type", media_type)
    }

    /// Appends a query parameter. The value is percent-encoded.
    pub fn query(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.query
            .push((name.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Serializes `value` as the body and sets a JSON content type.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.body = Bytes::from(bytes);
                self.content_type("application/json")
            }
            Err(e) => {
                self.error = Some(TestError::Json(e));
                self
            }
        }
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the pipeline returns `Err`.
    /// Use [`try_send`](Self::try_send) to inspect those cases.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request, returning build and pipeline failures.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let uri = self.full_uri();
        let mut builder = RequestContext::builder(self.method, &uri);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        let ctx = builder
            .entity(self.body)
            .build()
            .map_err(TestError::RequestBuild)?;

        let response = self
            .pipeline
            .execute(ctx)
            .await
            .map_err(TestError::Pipeline)?;
        Ok(TestResponse::from(response))
    }

    fn full_uri(&self) -> String {
        if self.query.is_empty() {
            return self.uri.clone();
        }
        let encoded = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let separator = if self.uri.contains('?') { '&' } else { '?' };
        format!("{}{separator}{encoded}", self.uri)
    }
}
