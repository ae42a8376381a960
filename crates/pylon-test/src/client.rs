//! The test client.

use std::sync::Arc;

use http::Method;
use pylon_pipeline::Pipeline;

use crate::request::TestRequest;

/// Sends requests straight into a pipeline.
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    pipeline: Arc<Pipeline>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client over `pipeline`.
    pub fn new(pipeline: Pipeline) -> Self {
        Self::shared(Arc::new(pipeline))
    }

    /// Creates a client over a pipeline that is also used elsewhere.
    pub fn shared(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// The pipeline under test.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Starts a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts a HEAD request.
    pub fn head(&self, uri: impl AsRef<str>) -> TestRequest<'_> {
        self.request(Method::HEAD, uri)
    }

    /// Starts an OPTIONS request.
    pub fn options(&self, uri: impl AsRef<str>) -> TestRequest<'_> {
        self.request(Method::OPTIONS, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestRequest<'_> {
        let mut request = TestRequest::new(&self.pipeline, method, uri.as_ref());
        for (name, value) in &self.default_headers {
            request = request.header(name, value);
        }
        request
    }
}
