//! # Pylon
//!
//! Declarative HTTP endpoints executed by a fixed request pipeline.
//!
//! An application registers *operations* (method, path template, parameter
//! bindings, handler) and *providers* (filters, interceptors, exception
//! mappers, codecs) in a [`Registry`](pipeline::Registry). A
//! [`Pipeline`](pipeline::Pipeline) then runs every request through the
//! same phases:
//!
//! ```text
//! PreMatch → Match → Negotiate → RequestFilter → Bind → Decode → Invoke
//!                                                                  ↓
//!                           Send ← ResponseFilter ← Encode ←───────┘
//! ```
//!
//! Failures anywhere become responses through exception mappers or the
//! built-in taxonomy, never through a panic or a dropped connection.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pylon::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pylon::AppError> {
//!     let registry = Registry::builder()
//!         .operation(
//!             Operation::get("/widgets/{id}")
//!                 .param(ParameterBinding::path("id").scalar(ScalarType::I64))
//!                 .to(|args: Arguments| async move {
//!                     let id: i64 = args.get(0)?;
//!                     Ok(Json(serde_json::json!({ "id": id })))
//!                 }),
//!         )
//!         .build()?;
//!
//!     let config = ConfigLoader::new().with_optional_file("pylon.toml")?.load()?;
//!     App::new(registry, config).run().await
//! }
//! ```
//!
//! ## Crates
//!
//! | Module | Contents |
//! |---|---|
//! | [`core`] | Contexts, errors, media types, codec, context accessor |
//! | [`router`] | Path templates and route resolution |
//! | [`extract`] | Parameter bindings and the binder |
//! | [`pipeline`] | Registry, providers, exception resolver, executor |
//! | [`config`] | Layered configuration |
//! | [`telemetry`] | Logging and metrics |
//! | [`server`] | HTTP transport |

#![doc(html_root_url = "https://docs.rs/pylon/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;

pub use app::{pipeline_options, server_config, App, AppError};

pub use pylon_config as config;
pub use pylon_core as core;
pub use pylon_extract as extract;
pub use pylon_pipeline as pipeline;
pub use pylon_router as router;
pub use pylon_server as server;
pub use pylon_telemetry as telemetry;

/// Common imports.
///
/// ```rust
/// use pylon::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{App, AppError};

    pub use pylon_config::{ConfigLoader, PylonConfig};
    pub use pylon_core::{
        ContextAccessor, ErrorType, IntoOutcome, Json, MediaType, Outcome, PylonError,
        PylonResult, RequestContext, ResponseContext, ResponseDescriptor, SecurityContext,
    };
    pub use pylon_extract::{Arguments, ContextKind, ParameterBinding, ScalarType};
    pub use pylon_pipeline::{
        FnRequestFilter, FnResponseFilter, Operation, Pipeline, PipelineOptions, ReadNext,
        ReaderInterceptor, Registration, Registry, RequestFilter, Resource, ResponseFilter,
        WriteNext, WriterInterceptor,
    };
    pub use pylon_server::{Server, ShutdownSignal};
}
