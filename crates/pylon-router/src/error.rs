//! Route registration errors.

use http::Method;
use thiserror::Error;

/// Errors raised while building a router.
///
/// Matching never fails with an error; a miss is reported through
/// [`RouteMiss`](crate::RouteMiss).
#[derive(Debug, Error)]
pub enum RouteError {
    /// The template text is malformed.
    #[error("invalid path template '{template}': {reason}")]
    InvalidTemplate {
        /// The offending template.
        template: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `{name: regex}` constraint failed to compile.
    #[error("invalid parameter pattern in '{template}'")]
    Pattern {
        /// The offending template.
        template: String,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// The same method and template were registered twice.
    #[error("duplicate route {method} {template}")]
    Duplicate {
        /// The HTTP method.
        method: Method,
        /// The normalized template.
        template: String,
    },
}

impl RouteError {
    pub(crate) fn invalid(template: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.to_string(),
            reason: reason.into(),
        }
    }
}
