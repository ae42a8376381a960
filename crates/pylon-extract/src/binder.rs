//! Per-request parameter binding.
//!
//! A [`Binder`] lives for one binding pass. It reads every source lazily and
//! parses the form body at most once, no matter how many form fields (top
//! level or nested in composites) the operation declares. Only a body sent
//! as `application/x-www-form-urlencoded` is read as a form; form fields of
//! any other request are absent.

use std::cell::{Cell, OnceCell};

use pylon_core::{PylonResult, RequestContext};
use serde_json::{Map, Value};

use crate::arguments::{Argument, Arguments, UriInfo};
use crate::binding::{ContextKind, Param, ParameterBinding, TargetType};
use crate::error::{BindingError, ParamSource};

/// Binds declared parameters against one request.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use pylon_core::RequestContext;
/// use pylon_extract::{Binder, ParameterBinding, ScalarType};
/// use serde_json::json;
///
/// let ctx = RequestContext::builder(Method::GET, "/items?tag=a&tag=b&tag=a")
///     .build()
///     .unwrap();
/// let bindings = [
///     ParameterBinding::query("tag").set(ScalarType::String),
///     ParameterBinding::query("limit").scalar(ScalarType::U32).default_value("5"),
/// ];
///
/// let args = Binder::new(&ctx).bind_all(&bindings).unwrap();
/// assert_eq!(args.value(0), Some(&json!(["a", "b"])));
/// assert_eq!(args.value(1), Some(&json!(5)));
/// ```
#[derive(Debug)]
pub struct Binder<'r> {
    ctx: &'r RequestContext,
    form: OnceCell<Result<Vec<(String, String)>, BindingError>>,
    form_parses: Cell<usize>,
}

impl<'r> Binder<'r> {
    /// Creates a binder for `ctx`.
    #[must_use]
    pub fn new(ctx: &'r RequestContext) -> Self {
        Self {
            ctx,
            form: OnceCell::new(),
            form_parses: Cell::new(0),
        }
    }

    /// Binds every declaration in order.
    ///
    /// The body slot is left as `null`; the decode phase fills it.
    ///
    /// # Errors
    ///
    /// The first [`BindingError`], converted to a `PylonError`.
    pub fn bind_all(&self, bindings: &[ParameterBinding]) -> PylonResult<Arguments> {
        let mut values = Vec::with_capacity(bindings.len());
        let mut body_index = None;
        for (index, binding) in bindings.iter().enumerate() {
            if binding.is_body() {
                body_index = Some(index);
            }
            values.push(self.bind(binding)?);
        }
        Ok(Arguments::new(values, body_index))
    }

    /// Binds one declaration.
    ///
    /// # Errors
    ///
    /// Returns a [`BindingError`] when a raw value does not coerce or the
    /// form body is malformed.
    pub fn bind(&self, binding: &ParameterBinding) -> Result<Argument, BindingError> {
        match binding {
            ParameterBinding::Body(_) => Ok(Argument::Value(Value::Null)),
            ParameterBinding::Context(kind) => Ok(self.context_value(*kind)),
            other => self.bind_value(other).map(Argument::Value),
        }
    }

    /// Number of times the form body was parsed. Never more than one.
    #[must_use]
    pub fn form_parses(&self) -> usize {
        self.form_parses.get()
    }

    fn bind_value(&self, binding: &ParameterBinding) -> Result<Value, BindingError> {
        match binding {
            ParameterBinding::Path(p) => {
                let raw = self.ctx.path_params().get_all(&p.name);
                coerce(ParamSource::Path, p, raw)
            }
            ParameterBinding::Query(p) => {
                let raw = self.ctx.query_values(&p.name);
                coerce(ParamSource::Query, p, raw)
            }
            ParameterBinding::Header(p) => {
                let raw = if p.target.is_multi() {
                    self.ctx.header_values(&p.name)
                } else {
                    self.ctx
                        .header(&p.name)
                        .map(str::to_string)
                        .into_iter()
                        .collect()
                };
                coerce(ParamSource::Header, p, raw.iter().map(String::as_str))
            }
            ParameterBinding::Cookie(p) => {
                let cookies = self.ctx.cookies();
                let raw = cookies
                    .iter()
                    .filter(|(name, _)| *name == p.name)
                    .map(|(_, v)| v.as_str());
                coerce(ParamSource::Cookie, p, raw)
            }
            ParameterBinding::Matrix(p) => {
                let raw = self.ctx.matrix_params().get_all(&p.name);
                coerce(ParamSource::Matrix, p, raw)
            }
            ParameterBinding::Form(p) => {
                let form = self.form()?;
                let raw = form
                    .iter()
                    .filter(|(name, _)| *name == p.name)
                    .map(|(_, v)| v.as_str());
                coerce(ParamSource::Form, p, raw)
            }
            ParameterBinding::Composite(fields) => {
                let mut object = Map::with_capacity(fields.len());
                for field in fields {
                    object.insert(field.field.clone(), self.bind_value(&field.binding)?);
                }
                Ok(Value::Object(object))
            }
            // Rejected inside composites when the operation is registered.
            ParameterBinding::Body(_) | ParameterBinding::Context(_) => Ok(Value::Null),
        }
    }

    fn form(&self) -> Result<&[(String, String)], BindingError> {
        let parsed = self.form.get_or_init(|| {
            self.form_parses.set(self.form_parses.get() + 1);
            let is_form = self
                .ctx
                .content_type()
                .is_some_and(|ct| ct.essence() == "application/x-www-form-urlencoded");
            if !is_form {
                return Ok(Vec::new());
            }
            serde_urlencoded::from_bytes::<Vec<(String, String)>>(self.ctx.entity())
                .map_err(BindingError::malformed_form)
        });
        match parsed {
            Ok(pairs) => Ok(pairs.as_slice()),
            Err(e) => Err(e.clone()),
        }
    }

    fn context_value(&self, kind: ContextKind) -> Argument {
        match kind {
            ContextKind::UriInfo => Argument::Uri(UriInfo {
                uri: self.ctx.uri().clone(),
                path: self.ctx.path().to_string(),
                template: self.ctx.route().map(|r| r.template.clone()),
                path_params: self.ctx.path_params().clone(),
                query: self.ctx.query_pairs().to_vec(),
                matrix_params: self.ctx.matrix_params().clone(),
            }),
            ContextKind::Headers => Argument::Headers(self.ctx.headers().clone()),
            ContextKind::Security => Argument::Security(self.ctx.security().clone()),
        }
    }
}

/// Coerces raw values per the declared target.
fn coerce<'a, I>(source: ParamSource, param: &Param, raw: I) -> Result<Value, BindingError>
where
    I: IntoIterator<Item = &'a str>,
{
    let element = param.target.element();
    let convert = |text: &str| {
        element
            .coerce(text)
            .ok_or_else(|| BindingError::conversion(source, &param.name, text, element.name()))
    };

    let mut raw = raw.into_iter().peekable();
    if raw.peek().is_none() {
        return match (&param.default, param.target.is_multi()) {
            (Some(default), true) => Ok(Value::Array(vec![convert(default.as_str())?])),
            (Some(default), false) => convert(default.as_str()),
            (None, true) => Ok(Value::Array(Vec::new())),
            (None, false) => Ok(Value::Null),
        };
    }

    match param.target {
        TargetType::Scalar(_) => raw.next().map_or(Ok(Value::Null), convert),
        TargetType::List(_) => raw.map(convert).collect::<Result<Vec<_>, _>>().map(Value::Array),
        TargetType::Set(_) => {
            let mut items: Vec<Value> = Vec::new();
            for text in raw {
                let value = convert(text)?;
                if !items.contains(&value) {
                    items.push(value);
                }
            }
            Ok(Value::Array(items))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ScalarType;
    use http::Method;
    use pylon_core::{ErrorType, RouteInfo, SecurityContext};
    use pylon_router::Params;
    use serde_json::json;

    fn request(uri: &str) -> RequestContext {
        RequestContext::builder(Method::GET, uri).build().unwrap()
    }

    fn form_request(body: &'static str) -> RequestContext {
        RequestContext::builder(Method::POST, "/submit")
            .header("content-type", "application/x-www-form-urlencoded")
            .entity(body)
            .build()
            .unwrap()
    }

    #[test]
    fn test_set_deduplicates_in_order() {
        let ctx = request("/?t=a&t=b&t=a");
        let value = Binder::new(&ctx)
            .bind(&ParameterBinding::query("t").set(ScalarType::String))
            .unwrap();
        assert!(matches!(value, Argument::Value(v) if v == json!(["a", "b"])));
    }

    #[test]
    fn test_list_keeps_duplicates() {
        let ctx = request("/?n=1&n=2&n=1");
        let binder = Binder::new(&ctx);
        let args = binder
            .bind_all(&[ParameterBinding::query("n").list(ScalarType::I32)])
            .unwrap();
        assert_eq!(args.value(0), Some(&json!([1, 2, 1])));
    }

    #[test]
    fn test_absent_values() {
        let ctx = request("/");
        let args = Binder::new(&ctx)
            .bind_all(&[
                ParameterBinding::query("limit").scalar(ScalarType::U32).default_value("5"),
                ParameterBinding::query("missing"),
                ParameterBinding::query("tags").list(ScalarType::String),
                ParameterBinding::header("x-ids").list(ScalarType::I64).default_value("7"),
            ])
            .unwrap();
        assert_eq!(args.value(0), Some(&json!(5)));
        assert_eq!(args.value(1), Some(&Value::Null));
        assert_eq!(args.value(2), Some(&json!([])));
        assert_eq!(args.value(3), Some(&json!([7])));
    }

    #[test]
    fn test_conversion_failure_is_param_conversion() {
        let mut ctx = request("/widgets/abc");
        let mut params = Params::new();
        params.push("id", "abc");
        ctx.set_route(
            RouteInfo {
                operation_id: "get_widget".into(),
                template: "/widgets/{id}".into(),
                tags: Default::default(),
            },
            params,
            Params::new(),
        );
        let err = Binder::new(&ctx)
            .bind_all(&[ParameterBinding::path("id").scalar(ScalarType::I64)])
            .unwrap_err();
        assert!(err.is(&ErrorType::PARAM_CONVERSION));
        let detail = err.detail::<BindingError>().unwrap();
        assert_eq!(detail.param_source(), ParamSource::Path);
        assert_eq!(detail.name(), "id");
    }

    #[test]
    fn test_invalid_default_is_still_an_error() {
        let ctx = request("/");
        let err = Binder::new(&ctx)
            .bind(&ParameterBinding::query("n").scalar(ScalarType::I32).default_value("x"))
            .unwrap_err();
        assert!(err.is_conversion());
    }

    #[test]
    fn test_header_scalar_and_multi() {
        let ctx = RequestContext::builder(Method::GET, "/")
            .header("x-tag", "a, b")
            .build()
            .unwrap();
        let binder = Binder::new(&ctx);
        let args = binder
            .bind_all(&[
                ParameterBinding::header("x-tag"),
                ParameterBinding::header("x-tag").list(ScalarType::String),
            ])
            .unwrap();
        assert_eq!(args.value(0), Some(&json!("a, b")));
        assert_eq!(args.value(1), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_cookie_and_matrix() {
        let mut ctx = RequestContext::builder(Method::GET, "/cars;color=red")
            .header("cookie", "session=\"abc\"; theme=dark")
            .build()
            .unwrap();
        let mut matrix = Params::new();
        matrix.push("color", "red");
        ctx.set_route(
            RouteInfo {
                operation_id: "cars".into(),
                template: "/cars".into(),
                tags: Default::default(),
            },
            Params::new(),
            matrix,
        );
        let args = Binder::new(&ctx)
            .bind_all(&[
                ParameterBinding::cookie("session"),
                ParameterBinding::matrix("color"),
                ParameterBinding::matrix("size").default_value("m"),
            ])
            .unwrap();
        assert_eq!(args.value(0), Some(&json!("abc")));
        assert_eq!(args.value(1), Some(&json!("red")));
        assert_eq!(args.value(2), Some(&json!("m")));
    }

    #[test]
    fn test_form_parsed_once_across_composites() {
        let ctx = form_request("name=gear&qty=3&qty=4");
        let binder = Binder::new(&ctx);
        let args = binder
            .bind_all(&[
                ParameterBinding::form("name"),
                ParameterBinding::composite([
                    ("name", ParameterBinding::form("name")),
                    ("qty", ParameterBinding::form("qty").list(ScalarType::U32)),
                ]),
            ])
            .unwrap();
        assert_eq!(binder.form_parses(), 1);
        assert_eq!(args.value(0), Some(&json!("gear")));
        assert_eq!(args.value(1), Some(&json!({"name": "gear", "qty": [3, 4]})));
    }

    #[test]
    fn test_form_ignored_for_other_content_types() {
        let ctx = RequestContext::builder(Method::POST, "/submit")
            .header("content-type", "application/json")
            .entity("name=gear")
            .build()
            .unwrap();
        let args = Binder::new(&ctx)
            .bind_all(&[ParameterBinding::form("name")])
            .unwrap();
        assert_eq!(args.value(0), Some(&Value::Null));
    }

    #[test]
    fn test_form_requires_form_content_type() {
        let ctx = RequestContext::builder(Method::POST, "/submit")
            .entity("name=gear")
            .build()
            .unwrap();
        let args = Binder::new(&ctx)
            .bind_all(&[
                ParameterBinding::form("name"),
                ParameterBinding::form("qty").scalar(ScalarType::U32).default_value("1"),
            ])
            .unwrap();
        assert_eq!(args.value(0), Some(&Value::Null));
        assert_eq!(args.value(1), Some(&json!(1)));
    }

    #[test]
    fn test_context_values_and_body_slot() {
        let mut ctx = request("/me?x=1");
        ctx.set_security(SecurityContext::authenticated("ada", "Bearer"));
        let args = Binder::new(&ctx)
            .bind_all(&[
                ParameterBinding::context(ContextKind::Security),
                ParameterBinding::context(ContextKind::UriInfo),
                ParameterBinding::body(),
            ])
            .unwrap();
        assert_eq!(args.security().unwrap().principal(), Some("ada"));
        assert_eq!(args.uri_info().unwrap().query_param("x"), Some("1"));
        assert_eq!(args.body_index(), Some(2));
        assert_eq!(args.body_value(), Some(&Value::Null));
    }
}
