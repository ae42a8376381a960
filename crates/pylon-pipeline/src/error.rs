//! Build-time registry errors.

use http::Method;
use pylon_router::RouteError;
use thiserror::Error;

/// A configuration mistake found while building a [`Registry`](crate::Registry).
///
/// These are reported once at startup and never at request time.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// An operation declares more than one body binding.
    #[error("operation '{operation}' declares {count} body bindings, at most one is allowed")]
    MultipleBodies {
        /// The operation identifier.
        operation: String,
        /// How many body bindings were declared.
        count: usize,
    },

    /// An operation reads the body both as an entity and as a form.
    #[error("operation '{operation}' combines a body binding with form bindings")]
    BodyAndForm {
        /// The operation identifier.
        operation: String,
    },

    /// A composite binding contains a field that cannot be bound per field.
    #[error("operation '{operation}' has a composite binding with a body or context field")]
    InvalidComposite {
        /// The operation identifier.
        operation: String,
    },

    /// A produced or consumed media type does not parse.
    #[error("operation '{operation}' declares invalid media type '{media_type}'")]
    InvalidMediaType {
        /// The operation identifier.
        operation: String,
        /// The offending value.
        media_type: String,
    },

    /// An operation was registered without a handler.
    #[error("operation {method} {path} has no handler")]
    MissingHandler {
        /// The HTTP method.
        method: Method,
        /// The declared path.
        path: String,
    },

    /// Two operations share an identifier.
    #[error("duplicate operation id '{0}'")]
    DuplicateId(String),

    /// The route table rejected the operation.
    #[error(transparent)]
    Route(#[from] RouteError),
}

/// Result type for registry construction.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = RegistryError::MultipleBodies {
            operation: "createWidget".into(),
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "operation 'createWidget' declares 2 body bindings, at most one is allowed"
        );
    }
}
