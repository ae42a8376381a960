//! Parameter binding declarations.
//!
//! A [`ParameterBinding`] says where an operation argument comes from and
//! what type it has. Bindings are plain data: the [`Binder`](crate::Binder)
//! interprets them per request.
//!
//! ```rust
//! use pylon_extract::{ParameterBinding, ScalarType};
//!
//! let bindings = vec![
//!     ParameterBinding::path("id").scalar(ScalarType::I64),
//!     ParameterBinding::query("tag").set(ScalarType::String),
//!     ParameterBinding::query("limit").scalar(ScalarType::U32).default_value("5"),
//!     ParameterBinding::body(),
//! ];
//! assert_eq!(bindings[0].name(), Some("id"));
//! assert!(bindings[3].is_body());
//! ```

use std::any::{self, Any};
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Number, Value};

use crate::error::{BindingError, ParamSource};

/// Scalar types a raw string can be coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Passed through unchanged.
    String,
    /// `true` or `false`, case-insensitive.
    Bool,
    /// Exactly one character.
    Char,
    /// Signed 8-bit integer.
    I8,
    /// Signed 16-bit integer.
    I16,
    /// Signed 32-bit integer.
    I32,
    /// Signed 64-bit integer.
    I64,
    /// Unsigned 8-bit integer.
    U8,
    /// Unsigned 16-bit integer.
    U16,
    /// Unsigned 32-bit integer.
    U32,
    /// Unsigned 64-bit integer.
    U64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl ScalarType {
    /// The type name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    /// Coerces `raw` with locale-free, radix-10 rules.
    ///
    /// Returns `None` when `raw` is not a valid literal of this type. Nothing
    /// is trimmed, so `" 5"` is not an integer.
    ///
    /// ```rust
    /// use pylon_extract::ScalarType;
    /// use serde_json::json;
    ///
    /// assert_eq!(ScalarType::I64.coerce("42"), Some(json!(42)));
    /// assert_eq!(ScalarType::I64.coerce("abc"), None);
    /// assert_eq!(ScalarType::U8.coerce("256"), None);
    /// assert_eq!(ScalarType::Bool.coerce("TRUE"), Some(json!(true)));
    /// assert_eq!(ScalarType::Bool.coerce("yes"), None);
    /// ```
    #[must_use]
    pub fn coerce(self, raw: &str) -> Option<Value> {
        match self {
            Self::String => Some(Value::String(raw.to_string())),
            Self::Bool => {
                if raw.eq_ignore_ascii_case("true") {
                    Some(Value::Bool(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Some(Value::Bool(false))
                } else {
                    None
                }
            }
            Self::Char => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Value::String(c.to_string())),
                    _ => None,
                }
            }
            Self::I8 => raw.parse::<i8>().ok().map(Value::from),
            Self::I16 => raw.parse::<i16>().ok().map(Value::from),
            Self::I32 => raw.parse::<i32>().ok().map(Value::from),
            Self::I64 => raw.parse::<i64>().ok().map(Value::from),
            Self::U8 => raw.parse::<u8>().ok().map(Value::from),
            Self::U16 => raw.parse::<u16>().ok().map(Value::from),
            Self::U32 => raw.parse::<u32>().ok().map(Value::from),
            Self::U64 => raw.parse::<u64>().ok().map(Value::from),
            Self::F32 => raw
                .parse::<f32>()
                .ok()
                .and_then(|f| Number::from_f64(f64::from(f)))
                .map(Value::Number),
            Self::F64 => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The declared shape of a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    /// One value. Absent values bind to the default or `null`.
    Scalar(ScalarType),
    /// Every value in arrival order. Absent values bind to `[]`.
    List(ScalarType),
    /// Every distinct value, first occurrence kept. Absent values bind to `[]`.
    Set(ScalarType),
}

impl TargetType {
    /// The element type.
    #[must_use]
    pub const fn element(self) -> ScalarType {
        match self {
            Self::Scalar(t) | Self::List(t) | Self::Set(t) => t,
        }
    }

    /// Returns `true` for `List` and `Set`.
    #[must_use]
    pub const fn is_multi(self) -> bool {
        !matches!(self, Self::Scalar(_))
    }
}

impl Default for TargetType {
    fn default() -> Self {
        Self::Scalar(ScalarType::String)
    }
}

/// A named value read from one request source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// The name looked up in the source.
    pub name: String,
    /// The declared type.
    pub target: TargetType,
    /// Literal used when the source has no value.
    pub default: Option<String>,
}

impl Param {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: TargetType::default(),
            default: None,
        }
    }
}

/// A request entity converted to its declared type.
pub type TypedEntity = Box<dyn Any + Send>;

type DecodeFn = Arc<dyn Fn(&Value) -> Result<TypedEntity, serde_json::Error> + Send + Sync>;

/// The declared type of a body binding.
///
/// The decode phase runs [`BodyTarget::decode`] on the codec output, so an
/// entity of the wrong shape is rejected before the operation runs.
///
/// ```rust
/// use pylon_extract::BodyTarget;
/// use serde_json::json;
///
/// let target = BodyTarget::of::<Vec<u32>>();
/// assert!(target.decode(&json!([1, 2])).unwrap().is_some());
/// assert!(target.decode(&json!("x")).is_err());
/// assert!(BodyTarget::value().decode(&json!("x")).unwrap().is_none());
/// ```
#[derive(Clone)]
pub struct BodyTarget {
    type_name: &'static str,
    decode: Option<DecodeFn>,
}

impl BodyTarget {
    /// The entity is kept as a JSON value.
    #[must_use]
    pub fn value() -> Self {
        Self {
            type_name: any::type_name::<Value>(),
            decode: None,
        }
    }

    /// The entity is deserialized into `T`.
    #[must_use]
    pub fn of<T: DeserializeOwned + Send + 'static>() -> Self {
        Self {
            type_name: any::type_name::<T>(),
            decode: Some(Arc::new(|value: &Value| {
                T::deserialize(value).map(|typed| Box::new(typed) as TypedEntity)
            })),
        }
    }

    /// The declared type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Converts a decoded entity. `None` for [`BodyTarget::value`].
    ///
    /// # Errors
    ///
    /// A [`BindingError`] (bad request) when `value` does not have the
    /// declared shape.
    pub fn decode(&self, value: &Value) -> Result<Option<TypedEntity>, BindingError> {
        match &self.decode {
            None => Ok(None),
            Some(decode) => decode(value)
                .map(Some)
                .map_err(|e| BindingError::malformed_body(self.type_name, e)),
        }
    }
}

impl fmt::Debug for BodyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BodyTarget").field(&self.type_name).finish()
    }
}

impl PartialEq for BodyTarget {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

impl Eq for BodyTarget {}

/// Ambient request objects an operation can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// URI, path, query and matrix details as a [`UriInfo`](crate::UriInfo).
    UriInfo,
    /// The request headers.
    Headers,
    /// The [`SecurityContext`](pylon_core::SecurityContext).
    Security,
}

/// One field of a composite binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    /// The field name in the produced object.
    pub field: String,
    /// Where the field value comes from.
    pub binding: ParameterBinding,
}

/// Where an operation argument comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterBinding {
    /// A path template capture.
    Path(Param),
    /// A query parameter.
    Query(Param),
    /// A request header.
    Header(Param),
    /// A cookie.
    Cookie(Param),
    /// A matrix parameter of the last path segment.
    Matrix(Param),
    /// A form field of an `application/x-www-form-urlencoded` body.
    Form(Param),
    /// The decoded request entity.
    Body(BodyTarget),
    /// An ambient request object.
    Context(ContextKind),
    /// An object assembled from field bindings.
    Composite(Vec<FieldBinding>),
}

impl ParameterBinding {
    /// Binds a path capture as a string.
    #[must_use]
    pub fn path(name: impl Into<String>) -> Self {
        Self::Path(Param::new(name))
    }

    /// Binds a query parameter as a string.
    #[must_use]
    pub fn query(name: impl Into<String>) -> Self {
        Self::Query(Param::new(name))
    }

    /// Binds a header as a string.
    #[must_use]
    pub fn header(name: impl Into<String>) -> Self {
        Self::Header(Param::new(name))
    }

    /// Binds a cookie as a string.
    #[must_use]
    pub fn cookie(name: impl Into<String>) -> Self {
        Self::Cookie(Param::new(name))
    }

    /// Binds a matrix parameter as a string.
    #[must_use]
    pub fn matrix(name: impl Into<String>) -> Self {
        Self::Matrix(Param::new(name))
    }

    /// Binds a form field as a string.
    #[must_use]
    pub fn form(name: impl Into<String>) -> Self {
        Self::Form(Param::new(name))
    }

    /// Binds the request entity as a JSON value.
    #[must_use]
    pub fn body() -> Self {
        Self::Body(BodyTarget::value())
    }

    /// Binds the request entity as `T`, rejecting other shapes with 400.
    #[must_use]
    pub fn body_as<T: DeserializeOwned + Send + 'static>() -> Self {
        Self::Body(BodyTarget::of::<T>())
    }

    /// Binds an ambient request object.
    #[must_use]
    pub const fn context(kind: ContextKind) -> Self {
        Self::Context(kind)
    }

    /// Binds an object whose fields are bound individually.
    #[must_use]
    pub fn composite<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, ParameterBinding)>,
        S: Into<String>,
    {
        Self::Composite(
            fields
                .into_iter()
                .map(|(field, binding)| FieldBinding {
                    field: field.into(),
                    binding,
                })
                .collect(),
        )
    }

    fn param_mut(&mut self) -> Option<&mut Param> {
        match self {
            Self::Path(p)
            | Self::Query(p)
            | Self::Header(p)
            | Self::Cookie(p)
            | Self::Matrix(p)
            | Self::Form(p) => Some(p),
            Self::Body(_) | Self::Context(_) | Self::Composite(_) => None,
        }
    }

    /// The named parameter, for source bindings.
    #[must_use]
    pub const fn param(&self) -> Option<&Param> {
        match self {
            Self::Path(p)
            | Self::Query(p)
            | Self::Header(p)
            | Self::Cookie(p)
            | Self::Matrix(p)
            | Self::Form(p) => Some(p),
            Self::Body(_) | Self::Context(_) | Self::Composite(_) => None,
        }
    }

    /// Declares the value type. Ignored for non-source bindings.
    #[must_use]
    pub fn target(mut self, target: TargetType) -> Self {
        if let Some(p) = self.param_mut() {
            p.target = target;
        }
        self
    }

    /// Shorthand for `target(TargetType::Scalar(t))`.
    #[must_use]
    pub fn scalar(self, t: ScalarType) -> Self {
        self.target(TargetType::Scalar(t))
    }

    /// Shorthand for `target(TargetType::List(t))`.
    #[must_use]
    pub fn list(self, t: ScalarType) -> Self {
        self.target(TargetType::List(t))
    }

    /// Shorthand for `target(TargetType::Set(t))`.
    #[must_use]
    pub fn set(self, t: ScalarType) -> Self {
        self.target(TargetType::Set(t))
    }

    /// Declares the literal used when the value is absent.
    #[must_use]
    pub fn default_value(mut self, literal: impl Into<String>) -> Self {
        if let Some(p) = self.param_mut() {
            p.default = Some(literal.into());
        }
        self
    }

    /// The parameter name, for source bindings.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.param().map(|p| p.name.as_str())
    }

    /// The request source, for source bindings.
    #[must_use]
    pub const fn source(&self) -> Option<ParamSource> {
        match self {
            Self::Path(_) => Some(ParamSource::Path),
            Self::Query(_) => Some(ParamSource::Query),
            Self::Header(_) => Some(ParamSource::Header),
            Self::Cookie(_) => Some(ParamSource::Cookie),
            Self::Matrix(_) => Some(ParamSource::Matrix),
            Self::Form(_) => Some(ParamSource::Form),
            Self::Body(_) => Some(ParamSource::Body),
            Self::Context(_) | Self::Composite(_) => None,
        }
    }

    /// Returns `true` for [`ParameterBinding::Body`].
    #[must_use]
    pub const fn is_body(&self) -> bool {
        matches!(self, Self::Body(_))
    }

    /// The declared entity type, for body bindings.
    #[must_use]
    pub const fn body_target(&self) -> Option<&BodyTarget> {
        match self {
            Self::Body(target) => Some(target),
            _ => None,
        }
    }

    /// Returns `true` if this binding, or any nested field, reads the form body.
    #[must_use]
    pub fn reads_form(&self) -> bool {
        match self {
            Self::Form(_) => true,
            Self::Composite(fields) => fields.iter().any(|f| f.binding.reads_form()),
            _ => false,
        }
    }

    /// Returns `true` if a composite nests a binding that cannot be a field
    /// (body, ambient context).
    #[must_use]
    pub fn has_invalid_field(&self) -> bool {
        match self {
            Self::Composite(fields) => fields.iter().any(|f| {
                matches!(f.binding, Self::Body(_) | Self::Context(_)) || f.binding.has_invalid_field()
            }),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_ranges() {
        assert_eq!(ScalarType::I8.coerce("-128"), Some(json!(-128)));
        assert_eq!(ScalarType::I8.coerce("128"), None);
        assert_eq!(ScalarType::U64.coerce("-1"), None);
        assert_eq!(ScalarType::I32.coerce("+7"), Some(json!(7)));
        assert_eq!(ScalarType::I32.coerce(" 7"), None);
        assert_eq!(ScalarType::I32.coerce("0x10"), None);
    }

    #[test]
    fn test_floats() {
        assert_eq!(ScalarType::F64.coerce("2.5"), Some(json!(2.5)));
        assert_eq!(ScalarType::F64.coerce("NaN"), None);
        assert_eq!(ScalarType::F32.coerce("1e3"), Some(json!(1000.0)));
    }

    #[test]
    fn test_char() {
        assert_eq!(ScalarType::Char.coerce("é"), Some(json!("é")));
        assert_eq!(ScalarType::Char.coerce("ab"), None);
        assert_eq!(ScalarType::Char.coerce(""), None);
    }

    #[test]
    fn test_builder_only_touches_params() {
        let body = ParameterBinding::body().default_value("x").scalar(ScalarType::I32);
        assert_eq!(body, ParameterBinding::body());
        assert_ne!(body, ParameterBinding::body_as::<Vec<String>>());

        let q = ParameterBinding::query("n").list(ScalarType::U8).default_value("1");
        let p = q.param().unwrap();
        assert_eq!(p.target, TargetType::List(ScalarType::U8));
        assert_eq!(p.default.as_deref(), Some("1"));
    }

    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Widget {
        name: String,
        count: u32,
    }

    #[test]
    fn test_typed_body_target() {
        let binding = ParameterBinding::body_as::<Widget>();
        let target = binding.body_target().unwrap();
        assert!(target.type_name().ends_with("Widget"));

        let typed = target.decode(&json!({"name": "gear", "count": 2})).unwrap().unwrap();
        assert_eq!(
            *typed.downcast::<Widget>().unwrap(),
            Widget { name: "gear".into(), count: 2 }
        );

        let err = target.decode(&json!({"name": "gear"})).unwrap_err();
        assert_eq!(err.param_source(), ParamSource::Body);
        assert!(!err.is_conversion());
    }

    #[test]
    fn test_reads_form_recurses() {
        let nested = ParameterBinding::composite([(
            "inner",
            ParameterBinding::composite([("name", ParameterBinding::form("name"))]),
        )]);
        assert!(nested.reads_form());
        assert!(!ParameterBinding::query("q").reads_form());
    }

    #[test]
    fn test_invalid_composite_fields() {
        let bad = ParameterBinding::composite([("entity", ParameterBinding::body())]);
        assert!(bad.has_invalid_field());
        let ok = ParameterBinding::composite([("id", ParameterBinding::path("id"))]);
        assert!(!ok.has_invalid_field());
    }
}
