//! Response descriptors.
//!
//! A [`ResponseDescriptor`] is a fully specified response: status, headers
//! and an optional entity. Operations return one for full control, filters
//! abort with one, and exception mappers produce one.

use http::header::{HeaderName, HeaderValue, LOCATION};
use http::{HeaderMap, StatusCode};
use serde::Serialize;

use crate::error::{PylonError, PylonResult};
use crate::media::MediaType;

/// Status, headers and entity for a response.
///
/// # Example
///
/// ```
/// use pylon_core::ResponseDescriptor;
/// use http::StatusCode;
/// use serde_json::json;
///
/// let response = ResponseDescriptor::status(StatusCode::CREATED)
///     .header("x-widget-id", "42")
///     .entity(json!({"id": 42}));
///
/// assert_eq!(response.status_code(), StatusCode::CREATED);
/// assert_eq!(response.headers()["x-widget-id"], "42");
/// assert_eq!(response.entity_value(), Some(&json!({"id": 42})));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDescriptor {
    status: StatusCode,
    headers: HeaderMap,
    entity: Option<serde_json::Value>,
    media_type: Option<MediaType>,
}

impl ResponseDescriptor {
    /// Starts a response with `status`.
    #[must_use]
    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            entity: None,
            media_type: None,
        }
    }

    /// 200 with no entity yet.
    #[must_use]
    pub fn ok() -> Self {
        Self::status(StatusCode::OK)
    }

    /// 204.
    #[must_use]
    pub fn no_content() -> Self {
        Self::status(StatusCode::NO_CONTENT)
    }

    /// 201 with a `Location` header.
    #[must_use]
    pub fn created(location: &str) -> Self {
        let response = Self::status(StatusCode::CREATED);
        match HeaderValue::from_str(location) {
            Ok(value) => response.header_value(LOCATION, value),
            Err(_) => response,
        }
    }

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

    /// Adds a typed header.
    #[must_use]
    pub fn header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the entity.
    #[must_use]
    pub fn entity(mut self, entity: serde_json::Value) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Serializes `value` as the entity.
    pub fn json<T: Serialize>(self, value: &T) -> PylonResult<Self> {
        let entity = serde_json::to_value(value)
            .map_err(|e| PylonError::internal_with_source("failed to serialize entity", e))?;
        Ok(self.entity(entity))
    }

    /// Fixes the response media type, bypassing negotiation.
    #[must_use]
    pub fn media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = Some(media_type);
        self
    }

    /// The status code.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.status
    }

    /// The headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The entity, if any.
    #[must_use]
    pub const fn entity_value(&self) -> Option<&serde_json::Value> {
        self.entity.as_ref()
    }

    /// The fixed media type, if any.
    #[must_use]
    pub const fn fixed_media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    /// Splits into parts.
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        StatusCode,
        HeaderMap,
        Option<serde_json::Value>,
        Option<MediaType>,
    ) {
        (self.status, self.headers, self.entity, self.media_type)
    }
}
