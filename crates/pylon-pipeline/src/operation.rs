//! Operation and resource declarations.
//!
//! An [`Operation`] is one endpoint: method, path template, media types,
//! parameter bindings, binding tags and a handler. A [`Resource`] groups
//! operations under a base path and hands down its media types and tags.
//!
//! # Example
//!
//! ```
//! use pylon_core::Json;
//! use pylon_extract::{Arguments, ParameterBinding, ScalarType};
//! use pylon_pipeline::{Operation, Resource};
//!
//! let widgets = Resource::new("/widgets")
//!     .produces("application/json")
//!     .operation(
//!         Operation::get("/{id}")
//!             .id("getWidget")
//!             .param(ParameterBinding::path("id").scalar(ScalarType::I64))
//!             .to(|args: Arguments| async move {
//!                 let id: i64 = args.get(0)?;
//!                 Ok(Json(serde_json::json!({ "id": id })))
//!             }),
//!     );
//! assert_eq!(widgets.operations().len(), 1);
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use http::Method;
use pylon_core::{IntoOutcome, MediaType, Outcome, PylonResult};
use pylon_extract::{Arguments, ParameterBinding};
use pylon_router::PathTemplate;

use crate::filter::BoxFuture;

/// A type-erased operation body.
pub type Handler = Arc<dyn Fn(Arguments) -> BoxFuture<'static, PylonResult<Outcome>> + Send + Sync>;

/// A declared endpoint.
#[derive(Clone)]
pub struct Operation {
    pub(crate) id: Option<String>,
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) produces: Vec<String>,
    pub(crate) consumes: Vec<String>,
    pub(crate) bindings: Vec<ParameterBinding>,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) handler: Option<Handler>,
}

impl Operation {
    /// Declares an operation for `method` and `path`.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: None,
            method,
            path: path.into(),
            produces: Vec::new(),
            consumes: Vec::new(),
            bindings: Vec::new(),
            tags: BTreeSet::new(),
            handler: None,
        }
    }

    /// `GET path`.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST path`.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT path`.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `DELETE path`.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// `PATCH path`.
    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// Sets the identifier. Defaults to `"METHOD template"`.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds a produced media type.
    #[must_use]
    pub fn produces(mut self, media_type: impl Into<String>) -> Self {
        self.produces.push(media_type.into());
        self
    }

    /// Adds a consumed media type.
    #[must_use]
    pub fn consumes(mut self, media_type: impl Into<String>) -> Self {
        self.consumes.push(media_type.into());
        self
    }

    /// Appends a parameter binding. Arguments follow declaration order.
    #[must_use]
    pub fn param(mut self, binding: ParameterBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Adds a binding tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Sets the handler.
    #[must_use]
    pub fn to<F, Fut, R>(mut self, handler: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PylonResult<R>> + Send + 'static,
        R: IntoOutcome,
    {
        self.handler = Some(Arc::new(move |args| {
            let fut = handler(args);
            Box::pin(async move { fut.await?.into_outcome() })
        }));
        self
    }

    /// The declared method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// The declared path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("produces", &self.produces)
            .field("consumes", &self.consumes)
            .field("bindings", &self.bindings)
            .field("tags", &self.tags)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// A group of operations under one base path.
///
/// Produced and consumed media types and tags are inherited by every
/// operation that declares none of its own.
#[derive(Debug, Clone)]
pub struct Resource {
    base: String,
    produces: Vec<String>,
    consumes: Vec<String>,
    tags: BTreeSet<String>,
    operations: Vec<Operation>,
}

impl Resource {
    /// Starts a resource at `base`.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            produces: Vec::new(),
            consumes: Vec::new(),
            tags: BTreeSet::new(),
            operations: Vec::new(),
        }
    }

    /// Adds a produced media type for every operation.
    #[must_use]
    pub fn produces(mut self, media_type: impl Into<String>) -> Self {
        self.produces.push(media_type.into());
        self
    }

    /// Adds a consumed media type for every operation.
    #[must_use]
    pub fn consumes(mut self, media_type: impl Into<String>) -> Self {
        self.consumes.push(media_type.into());
        self
    }

    /// Adds a binding tag for every operation.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Adds an operation whose path is relative to the base.
    #[must_use]
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// The operations declared so far, paths not yet joined.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Resolves every operation against the resource.
    pub(crate) fn into_operations(self) -> impl Iterator<Item = Operation> {
        let Self {
            base,
            produces,
            consumes,
            tags,
            operations,
        } = self;
        operations.into_iter().map(move |mut op| {
            op.path = PathTemplate::join(&base, &op.path);
            if op.produces.is_empty() {
                op.produces.clone_from(&produces);
            }
            if op.consumes.is_empty() {
                op.consumes.clone_from(&consumes);
            }
            if op.tags.is_empty() {
                op.tags.clone_from(&tags);
            }
            op
        })
    }
}

/// An operation as resolved by the registry.
pub struct RegisteredOperation {
    pub(crate) id: String,
    pub(crate) method: Method,
    pub(crate) template: String,
    pub(crate) produces: Vec<MediaType>,
    pub(crate) consumes: Vec<MediaType>,
    pub(crate) bindings: Vec<ParameterBinding>,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) handler: Handler,
}

impl RegisteredOperation {
    /// The operation identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// The normalized path template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Produced media types. Empty means any.
    #[must_use]
    pub fn produces(&self) -> &[MediaType] {
        &self.produces
    }

    /// Consumed media types. Empty means any.
    #[must_use]
    pub fn consumes(&self) -> &[MediaType] {
        &self.consumes
    }

    /// Parameter bindings in declaration order.
    #[must_use]
    pub fn bindings(&self) -> &[ParameterBinding] {
        &self.bindings
    }

    /// Binding tags.
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }
}

impl fmt::Debug for RegisteredOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredOperation")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("template", &self.template)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_inheritance() {
        let resource = Resource::new("/widgets")
            .produces("application/json")
            .tag("audited")
            .operation(Operation::get("/").to(|_| async { Ok(()) }))
            .operation(
                Operation::get("/{id}/label")
                    .produces("text/plain")
                    .tag("public")
                    .to(|_| async { Ok(()) }),
            );

        let ops: Vec<Operation> = resource.into_operations().collect();
        assert_eq!(ops[0].path, "/widgets");
        assert_eq!(ops[0].produces, vec!["application/json"]);
        assert!(ops[0].tags.contains("audited"));

        assert_eq!(ops[1].path, "/widgets/{id}/label");
        assert_eq!(ops[1].produces, vec!["text/plain"]);
        assert!(!ops[1].tags.contains("audited"));
    }

    #[tokio::test]
    async fn test_handler_converts_outcome() {
        let op = Operation::post("/echo").to(|args: Arguments| async move {
            Ok(args.value(0).cloned().unwrap_or_default())
        });
        let handler = op.handler.unwrap();

        let args = Arguments::new(
            vec![pylon_extract::Argument::Value(serde_json::json!("hi"))],
            None,
        );
        assert_eq!(handler(args).await.unwrap(), Outcome::Value(serde_json::json!("hi")));
        let empty = handler(Arguments::default()).await.unwrap();
        assert_eq!(empty, Outcome::Value(serde_json::Value::Null));
    }
}
