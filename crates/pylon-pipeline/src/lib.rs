//! # Pylon Pipeline
//!
//! Declarative endpoints executed through a fixed request pipeline.
//!
//! A [`Registry`] is built once at startup from operations, filters,
//! interceptors, exception mappers and codecs. A [`Pipeline`] then executes
//! requests against it:
//!
//! ```text
//! PreMatch → Match → Negotiate → RequestFilter → Bind → Decode → Invoke
//!                                                                  ↓
//!                           Send ← ResponseFilter ← Encode ←───────┘
//! ```
//!
//! | Provider | Registered with | Order |
//! |----------|-----------------|-------|
//! | [`RequestFilter`] (pre-matching) | [`RegistryBuilder::pre_match_filter`] | ascending priority |
//! | [`RequestFilter`] | [`RegistryBuilder::request_filter`] | ascending priority |
//! | [`ReaderInterceptor`] | [`RegistryBuilder::reader_interceptor`] | ascending priority |
//! | [`WriterInterceptor`] | [`RegistryBuilder::writer_interceptor`] | ascending priority |
//! | [`ResponseFilter`] | [`RegistryBuilder::response_filter`] | descending priority |
//! | [`ExceptionMapper`] | [`RegistryBuilder::exception_mapper`] | exact type, then nearest ancestor |
//!
//! Failures without a mapper are answered from the built-in [`TAXONOMY`].
//!
//! ## Example
//!
//! ```
//! use http::{Method, StatusCode};
//! use pylon_core::RequestContext;
//! use pylon_extract::{Arguments, ParameterBinding, ScalarType};
//! use pylon_pipeline::{Operation, Pipeline, Registry};
//!
//! # tokio_test::block_on(async {
//! let registry = Registry::builder()
//!     .operation(
//!         Operation::get("/widgets/{id}")
//!             .param(ParameterBinding::path("id").scalar(ScalarType::I64))
//!             .to(|args: Arguments| async move {
//!                 let id: i64 = args.get(0)?;
//!                 Ok(serde_json::json!({ "id": id }))
//!             }),
//!     )
//!     .build()
//!     .unwrap();
//! let pipeline = Pipeline::new(registry);
//!
//! let ok = RequestContext::builder(Method::GET, "/widgets/42").build().unwrap();
//! assert_eq!(pipeline.execute(ok).await.unwrap().status(), StatusCode::OK);
//!
//! let bad = RequestContext::builder(Method::GET, "/widgets/abc").build().unwrap();
//! assert_eq!(pipeline.execute(bad).await.unwrap().status(), StatusCode::BAD_REQUEST);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/pylon-pipeline/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod filter;
pub mod interceptor;
pub mod mapper;
pub mod operation;
pub mod pipeline;
pub mod registry;
pub mod resolver;

pub use error::{RegistryError, RegistryResult};
pub use filter::{BoxFuture, FnRequestFilter, FnResponseFilter, RequestFilter, ResponseFilter};
pub use interceptor::{ReadNext, ReaderInterceptor, WriteNext, WriterInterceptor};
pub use mapper::ExceptionMapper;
pub use operation::{Handler, Operation, RegisteredOperation, Resource};
pub use pipeline::{Phase, Pipeline, PipelineOptions};
pub use registry::{Entry, Registration, Registry, RegistryBuilder, DEFAULT_PRIORITY};
pub use resolver::{classify, status_for, ExceptionResolver, Resolution, TAXONOMY};
