//! Operation return values.
//!
//! An operation returns anything that implements [`IntoOutcome`]. The
//! pipeline's encode phase turns the [`Outcome`] into a response:
//!
//! | Outcome | Response |
//! |---|---|
//! | `Void` | 204, no entity |
//! | `Value(v)` | 200, entity `v` |
//! | `Response(d)` | status, headers and entity copied from `d` |

use serde::Serialize;

use crate::error::{PylonError, PylonResult};
use crate::response::ResponseDescriptor;

/// What an operation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing to send.
    Void,
    /// A plain value sent with 200.
    Value(serde_json::Value),
    /// A fully specified response.
    Response(ResponseDescriptor),
}

/// Conversion into an [`Outcome`].
///
/// Implemented for `()`, [`Outcome`], [`ResponseDescriptor`],
/// `serde_json::Value`, strings, [`Json`] and `Option` of any of these
/// (where `None` becomes `Void`).
pub trait IntoOutcome {
    /// Performs the conversion.
    fn into_outcome(self) -> PylonResult<Outcome>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> PylonResult<Outcome> {
        Ok(Outcome::Void)
    }
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> PylonResult<Outcome> {
        Ok(self)
    }
}

impl IntoOutcome for ResponseDescriptor {
    fn into_outcome(self) -> PylonResult<Outcome> {
        Ok(Outcome::Response(self))
    }
}

impl IntoOutcome for serde_json::Value {
    fn into_outcome(self) -> PylonResult<Outcome> {
        Ok(Outcome::Value(self))
    }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> PylonResult<Outcome> {
        Ok(Outcome::Value(serde_json::Value::String(self)))
    }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> PylonResult<Outcome> {
        Ok(Outcome::Value(serde_json::Value::String(self.to_string())))
    }
}

impl<T: IntoOutcome> IntoOutcome for Option<T> {
    fn into_outcome(self) -> PylonResult<Outcome> {
        self.map_or(Ok(Outcome::Void), IntoOutcome::into_outcome)
    }
}

/// Wraps any serializable value as a 200 entity.
///
/// # Example
///
/// ```
/// use pylon_core::{IntoOutcome, Json, Outcome};
/// use serde_json::json;
///
/// let outcome = Json(vec![1, 2, 3]).into_outcome().unwrap();
/// assert_eq!(outcome, Outcome::Value(json!([1, 2, 3])));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoOutcome for Json<T> {
    fn into_outcome(self) -> PylonResult<Outcome> {
        serde_json::to_value(&self.0)
            .map(Outcome::Value)
            .map_err(|e| PylonError::internal_with_source("failed to serialize result", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_unit_is_void() {
        assert_eq!(().into_outcome().unwrap(), Outcome::Void);
    }

    #[test]
    fn test_option() {
        assert_eq!(None::<String>.into_outcome().unwrap(), Outcome::Void);
        assert_eq!(
            Some("hi").into_outcome().unwrap(),
            Outcome::Value(json!("hi"))
        );
    }

    #[test]
    fn test_descriptor_passthrough() {
        let outcome = ResponseDescriptor::status(StatusCode::ACCEPTED)
            .into_outcome()
            .unwrap();
        assert!(matches!(outcome, Outcome::Response(d) if d.status_code() == StatusCode::ACCEPTED));
    }
}
