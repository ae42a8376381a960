//! # Pylon Extract
//!
//! Parameter binding for Pylon operations.
//!
//! Operations declare where each argument comes from with a
//! [`ParameterBinding`]. Per request, a [`Binder`] reads the raw strings,
//! coerces them to the declared [`ScalarType`] and aggregates collections:
//!
//! | Binding | Source | Absent value |
//! |---------|--------|--------------|
//! | `Path` | template capture | default or `null` |
//! | `Query` | query string, repeats kept | default, `null` or `[]` |
//! | `Header` | header, comma lists split for collections | default, `null` or `[]` |
//! | `Cookie` | `Cookie` header | default or `null` |
//! | `Matrix` | `;k=v` on the last path segment | default or `null` |
//! | `Form` | urlencoded body, parsed once | default or `null` |
//! | `Body` | decoded entity, filled by the decode phase | `null` |
//! | `Context` | URI info, headers, security | never absent |
//! | `Composite` | object built from field bindings | per field |
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use pylon_core::{ErrorType, RequestContext};
//! use pylon_extract::{Binder, ParameterBinding, ScalarType};
//!
//! let ctx = RequestContext::builder(Method::GET, "/search?page=two")
//!     .build()
//!     .unwrap();
//!
//! let err = Binder::new(&ctx)
//!     .bind_all(&[ParameterBinding::query("page").scalar(ScalarType::U32)])
//!     .unwrap_err();
//! assert!(err.is(&ErrorType::PARAM_CONVERSION));
//! ```

#![doc(html_root_url = "https://docs.rs/pylon-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod arguments;
mod binder;
mod binding;
mod error;

pub use arguments::{Argument, Arguments, UriInfo};
pub use binder::Binder;
pub use binding::{
    BodyTarget, ContextKind, FieldBinding, Param, ParameterBinding, ScalarType, TargetType,
    TypedEntity,
};
pub use error::{BindingError, ParamSource};

pub use pylon_router::Params;
