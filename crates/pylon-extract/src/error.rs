//! Binding error types.
//!
//! A [`BindingError`] records where a value came from and what went wrong.
//! It converts into a [`PylonError`] so the pipeline maps it like any other
//! failure: conversion problems become `param_conversion` (400), anything
//! else becomes `bad_request` (400). The original `BindingError` rides along
//! as the error detail for mappers that want the parameter name.

use std::fmt;

use pylon_core::{ErrorType, PylonError};

/// Where a bound value was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSource {
    /// A path template capture.
    Path,
    /// The query string.
    Query,
    /// A request header.
    Header,
    /// A cookie.
    Cookie,
    /// A matrix parameter of the last path segment.
    Matrix,
    /// A field of a form-urlencoded body.
    Form,
    /// The request entity.
    Body,
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Matrix => "matrix",
            Self::Form => "form",
            Self::Body => "body",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingErrorKind {
    /// The raw text does not parse as the declared type.
    Conversion,
    /// The form body is not valid `application/x-www-form-urlencoded`.
    MalformedForm,
    /// The entity does not have the declared body type.
    MalformedBody,
}

/// A failure while binding one parameter.
///
/// # Example
///
/// ```rust
/// use pylon_extract::{BindingError, ParamSource};
/// use pylon_core::{ErrorType, PylonError};
///
/// let err = BindingError::conversion(ParamSource::Path, "id", "abc", "i64");
/// assert_eq!(err.param_source(), ParamSource::Path);
/// assert_eq!(err.name(), "id");
///
/// let pylon: PylonError = err.into();
/// assert!(pylon.is(&ErrorType::PARAM_CONVERSION));
/// assert!(pylon.detail::<BindingError>().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingError {
    param_source: ParamSource,
    kind: BindingErrorKind,
    name: String,
    message: String,
}

impl BindingError {
    /// `raw` could not be converted to `target`.
    #[must_use]
    pub fn conversion(
        source: ParamSource,
        name: impl Into<String>,
        raw: &str,
        target: &str,
    ) -> Self {
        let name = name.into();
        Self {
            param_source: source,
            kind: BindingErrorKind::Conversion,
            message: format!("{source} parameter '{name}': cannot convert '{raw}' to {target}"),
            name,
        }
    }

    /// The form body could not be parsed.
    #[must_use]
    pub fn malformed_form(details: impl fmt::Display) -> Self {
        Self {
            param_source: ParamSource::Form,
            kind: BindingErrorKind::MalformedForm,
            message: format!("malformed form body: {details}"),
            name: String::new(),
        }
    }

    /// The entity could not be converted to the declared body type.
    #[must_use]
    pub fn malformed_body(type_name: &str, details: impl fmt::Display) -> Self {
        Self {
            param_source: ParamSource::Body,
            kind: BindingErrorKind::MalformedBody,
            message: format!("request body is not a valid {type_name}: {details}"),
            name: String::new(),
        }
    }

    /// Where the value came from.
    #[must_use]
    pub const fn param_source(&self) -> ParamSource {
        self.param_source
    }

    /// The parameter name. Empty for whole-body failures.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` for type conversion failures.
    #[must_use]
    pub fn is_conversion(&self) -> bool {
        self.kind == BindingErrorKind::Conversion
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BindingError {}

impl From<BindingError> for PylonError {
    fn from(err: BindingError) -> Self {
        let error_type = if err.is_conversion() {
            ErrorType::PARAM_CONVERSION
        } else {
            ErrorType::BAD_REQUEST
        };
        PylonError::new(&error_type, err.message.clone()).with_detail(err)
    }
}
