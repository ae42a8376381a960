//! Provider and operation registry.
//!
//! The [`Registry`] is built once at startup and is read-only afterwards.
//! Every provider list is sorted when the registry is built:
//!
//! | List | Order |
//! |------|-------|
//! | pre-matching filters | ascending priority, always global |
//! | request filters | ascending priority |
//! | reader / writer interceptors | ascending priority |
//! | response filters | descending priority |
//!
//! Equal priorities keep registration order, and response filters reverse
//! it. A provider without tags applies to every operation. A tagged provider
//! applies only to operations sharing at least one tag.
//!
//! # Example
//!
//! ```
//! use pylon_pipeline::{FnRequestFilter, Operation, Registration, Registry};
//!
//! let registry = Registry::builder()
//!     .request_filter(
//!         FnRequestFilter::new("audit", |_ctx| Ok(())),
//!         Registration::new().priority(100).tag("audited"),
//!     )
//!     .operation(Operation::get("/ping").tag("audited").to(|_| async { Ok("pong") }))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(registry.operations().len(), 1);
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use pylon_core::{Codec, DefaultCodec, ErrorType, MediaType, PylonError};
use pylon_router::Router;

use crate::error::{RegistryError, RegistryResult};
use crate::filter::{RequestFilter, ResponseFilter};
use crate::interceptor::{ReaderInterceptor, WriterInterceptor};
use crate::mapper::ExceptionMapper;
use crate::operation::{Operation, RegisteredOperation, Resource};

/// Priority used when none is given.
pub const DEFAULT_PRIORITY: i32 = 5000;

/// Priority and binding tags for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    priority: i32,
    tags: BTreeSet<String>,
}

impl Default for Registration {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            tags: BTreeSet::new(),
        }
    }
}

impl Registration {
    /// Default priority, no tags.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the priority. Lower runs earlier on the request side.
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Adds a binding tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// A registered provider.
pub struct Entry<P: ?Sized> {
    provider: Arc<P>,
    priority: i32,
    tags: BTreeSet<String>,
}

impl<P: ?Sized> Entry<P> {
    fn new(provider: Arc<P>, registration: Registration) -> Self {
        Self {
            provider,
            priority: registration.priority,
            tags: registration.tags,
        }
    }

    /// The provider.
    #[must_use]
    pub const fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// The priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// The binding tags. Empty means global.
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns `true` if the provider applies to an operation with `tags`.
    #[must_use]
    pub fn applies_to(&self, tags: &BTreeSet<String>) -> bool {
        self.tags.is_empty() || !self.tags.is_disjoint(tags)
    }
}

impl<P: ?Sized> fmt::Debug for Entry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("priority", &self.priority)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

struct MapperEntry {
    mapper: Arc<dyn ExceptionMapper>,
    error_type: ErrorType,
    priority: i32,
}

/// Everything the pipeline dispatches to.
pub struct Registry {
    pre_match_filters: Vec<Entry<dyn RequestFilter>>,
    request_filters: Vec<Entry<dyn RequestFilter>>,
    response_filters: Vec<Entry<dyn ResponseFilter>>,
    reader_interceptors: Vec<Entry<dyn ReaderInterceptor>>,
    writer_interceptors: Vec<Entry<dyn WriterInterceptor>>,
    mappers: Vec<MapperEntry>,
    codecs: Vec<Arc<dyn Codec>>,
    operations: Vec<RegisteredOperation>,
    router: Router<usize>,
}

impl Registry {
    /// Starts a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Pre-matching filters, ascending priority.
    #[must_use]
    pub fn pre_match_filters(&self) -> &[Entry<dyn RequestFilter>] {
        &self.pre_match_filters
    }

    /// Post-matching request filters, ascending priority.
    #[must_use]
    pub fn request_filters(&self) -> &[Entry<dyn RequestFilter>] {
        &self.request_filters
    }

    /// Response filters, descending priority.
    #[must_use]
    pub fn response_filters(&self) -> &[Entry<dyn ResponseFilter>] {
        &self.response_filters
    }

    /// Reader interceptors, ascending priority.
    #[must_use]
    pub fn reader_interceptors(&self) -> &[Entry<dyn ReaderInterceptor>] {
        &self.reader_interceptors
    }

    /// Writer interceptors, ascending priority.
    #[must_use]
    pub fn writer_interceptors(&self) -> &[Entry<dyn WriterInterceptor>] {
        &self.writer_interceptors
    }

    /// Request filters that apply to an operation with `tags`.
    #[must_use]
    pub fn request_filters_for(&self, tags: &BTreeSet<String>) -> Vec<Arc<dyn RequestFilter>> {
        applicable(&self.request_filters, tags)
    }

    /// Response filters that apply to an operation with `tags`.
    #[must_use]
    pub fn response_filters_for(&self, tags: &BTreeSet<String>) -> Vec<Arc<dyn ResponseFilter>> {
        applicable(&self.response_filters, tags)
    }

    /// Response filters without tags.
    #[must_use]
    pub fn global_response_filters(&self) -> Vec<Arc<dyn ResponseFilter>> {
        applicable(&self.response_filters, &BTreeSet::new())
    }

    /// Reader interceptors that apply to an operation with `tags`.
    #[must_use]
    pub fn reader_interceptors_for(
        &self,
        tags: &BTreeSet<String>,
    ) -> Vec<Arc<dyn ReaderInterceptor>> {
        applicable(&self.reader_interceptors, tags)
    }

    /// Writer interceptors that apply to an operation with `tags`.
    #[must_use]
    pub fn writer_interceptors_for(
        &self,
        tags: &BTreeSet<String>,
    ) -> Vec<Arc<dyn WriterInterceptor>> {
        applicable(&self.writer_interceptors, tags)
    }

    /// Finds the mapper for `error`.
    ///
    /// A mapper registered for the error's own type wins. Otherwise the
    /// mapper registered for the nearest ancestor is used. Ties go to the
    /// lower priority, then to the earlier registration.
    #[must_use]
    pub fn find_exception_mapper(&self, error: &PylonError) -> Option<&Arc<dyn ExceptionMapper>> {
        let error_type = error.error_type();
        self.mappers
            .iter()
            .filter_map(|entry| {
                error_type
                    .distance_to(&entry.error_type)
                    .map(|distance| (distance, entry))
            })
            .min_by_key(|(distance, entry)| (*distance, entry.priority))
            .map(|(_, entry)| &entry.mapper)
    }

    /// Codecs in lookup order. The default codec is always last.
    #[must_use]
    pub fn codecs(&self) -> &[Arc<dyn Codec>] {
        &self.codecs
    }

    /// All operations in registration order.
    #[must_use]
    pub fn operations(&self) -> &[RegisteredOperation] {
        &self.operations
    }

    /// The operation with `id`.
    #[must_use]
    pub fn operation(&self, id: &str) -> Option<&RegisteredOperation> {
        self.operations.iter().find(|op| op.id == id)
    }

    pub(crate) const fn router(&self) -> &Router<usize> {
        &self.router
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("pre_match_filters", &self.pre_match_filters.len())
            .field("request_filters", &self.request_filters.len())
            .field("response_filters", &self.response_filters.len())
            .field("reader_interceptors", &self.reader_interceptors.len())
            .field("writer_interceptors", &self.writer_interceptors.len())
            .field("mappers", &self.mappers.len())
            .field("codecs", &self.codecs.len())
            .field("operations", &self.operations)
            .finish()
    }
}

fn applicable<P: ?Sized>(entries: &[Entry<P>], tags: &BTreeSet<String>) -> Vec<Arc<P>> {
    entries
        .iter()
        .filter(|e| e.applies_to(tags))
        .map(|e| Arc::clone(&e.provider))
        .collect()
}

/// Builder for [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    pre_match_filters: Vec<Entry<dyn RequestFilter>>,
    request_filters: Vec<Entry<dyn RequestFilter>>,
    response_filters: Vec<Entry<dyn ResponseFilter>>,
    reader_interceptors: Vec<Entry<dyn ReaderInterceptor>>,
    writer_interceptors: Vec<Entry<dyn WriterInterceptor>>,
    mappers: Vec<MapperEntry>,
    codecs: Vec<Arc<dyn Codec>>,
    operations: Vec<Operation>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pre-matching filter. It is always global.
    #[must_use]
    pub fn pre_match_filter(mut self, filter: impl RequestFilter, priority: i32) -> Self {
        self.pre_match_filters.push(Entry::new(
            Arc::new(filter),
            Registration::new().priority(priority),
        ));
        self
    }

    /// Registers a post-matching request filter.
    #[must_use]
    pub fn request_filter(mut self, filter: impl RequestFilter, registration: Registration) -> Self {
        self.request_filters
            .push(Entry::new(Arc::new(filter), registration));
        self
    }

    /// Registers a response filter.
    #[must_use]
    pub fn response_filter(
        mut self,
        filter: impl ResponseFilter,
        registration: Registration,
    ) -> Self {
        self.response_filters
            .push(Entry::new(Arc::new(filter), registration));
        self
    }

    /// Registers a reader interceptor.
    #[must_use]
    pub fn reader_interceptor(
        mut self,
        interceptor: impl ReaderInterceptor,
        registration: Registration,
    ) -> Self {
        self.reader_interceptors
            .push(Entry::new(Arc::new(interceptor), registration));
        self
    }

    /// Registers a writer interceptor.
    #[must_use]
    pub fn writer_interceptor(
        mut self,
        interceptor: impl WriterInterceptor,
        registration: Registration,
    ) -> Self {
        self.writer_interceptors
            .push(Entry::new(Arc::new(interceptor), registration));
        self
    }

    /// Registers a mapper for `error_type` and its descendants.
    #[must_use]
    pub fn exception_mapper(
        mut self,
        error_type: &ErrorType,
        mapper: impl ExceptionMapper,
        priority: i32,
    ) -> Self {
        self.mappers.push(MapperEntry {
            mapper: Arc::new(mapper),
            error_type: *error_type,
            priority,
        });
        self
    }

    /// Registers a codec, consulted before the default one.
    #[must_use]
    pub fn codec(mut self, codec: impl Codec) -> Self {
        self.codecs.push(Arc::new(codec));
        self
    }

    /// Registers an operation.
    #[must_use]
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Registers every operation of a resource.
    #[must_use]
    pub fn resource(mut self, resource: Resource) -> Self {
        self.operations.extend(resource.into_operations());
        self
    }

    /// Validates declarations and freezes the registry.
    pub fn build(self) -> RegistryResult<Registry> {
        let Self {
            mut pre_match_filters,
            mut request_filters,
            mut response_filters,
            mut reader_interceptors,
            mut writer_interceptors,
            mappers,
            mut codecs,
            operations,
        } = self;

        pre_match_filters.sort_by_key(Entry::priority);
        request_filters.sort_by_key(Entry::priority);
        reader_interceptors.sort_by_key(Entry::priority);
        writer_interceptors.sort_by_key(Entry::priority);
        response_filters.sort_by_key(Entry::priority);
        response_filters.reverse();

        codecs.push(Arc::new(DefaultCodec));

        let mut router = Router::new();
        let mut registered = Vec::with_capacity(operations.len());
        for operation in operations {
            let resolved = resolve(operation)?;
            if registered
                .iter()
                .any(|op: &RegisteredOperation| op.id == resolved.id)
            {
                return Err(RegistryError::DuplicateId(resolved.id));
            }
            router.insert(resolved.method.clone(), &resolved.template, registered.len())?;
            registered.push(resolved);
        }

        Ok(Registry {
            pre_match_filters,
            request_filters,
            response_filters,
            reader_interceptors,
            writer_interceptors,
            mappers,
            codecs,
            operations: registered,
            router,
        })
    }
}

fn resolve(operation: Operation) -> RegistryResult<RegisteredOperation> {
    let Operation {
        id,
        method,
        path,
        produces,
        consumes,
        bindings,
        tags,
        handler,
    } = operation;

    let template = pylon_router::PathTemplate::parse(&path)?
        .as_str()
        .to_string();
    let id = id.unwrap_or_else(|| format!("{method} {template}"));

    let Some(handler) = handler else {
        return Err(RegistryError::MissingHandler { method, path });
    };

    let bodies = bindings.iter().filter(|b| b.is_body()).count();
    if bodies > 1 {
        return Err(RegistryError::MultipleBodies {
            operation: id,
            count: bodies,
        });
    }
    if bodies == 1 && bindings.iter().any(|b| b.reads_form()) {
        return Err(RegistryError::BodyAndForm { operation: id });
    }
    if bindings.iter().any(|b| b.has_invalid_field()) {
        return Err(RegistryError::InvalidComposite { operation: id });
    }

    let produces = parse_media_types(&id, produces)?;
    let consumes = parse_media_types(&id, consumes)?;

    Ok(RegisteredOperation {
        id,
        method,
        template,
        produces,
        consumes,
        bindings,
        tags,
        handler,
    })
}

fn parse_media_types(operation: &str, raw: Vec<String>) -> RegistryResult<Vec<MediaType>> {
    raw.into_iter()
        .map(|value| {
            MediaType::parse(&value).ok_or_else(|| RegistryError::InvalidMediaType {
                operation: operation.to_string(),
                media_type: value,
            })
        })
        .collect()
}
