//! # Pylon Core
//!
//! Core types shared by every Pylon crate:
//!
//! - [`PylonError`] and [`ErrorType`] - the failure currency and its ancestry tree
//! - [`RequestContext`] / [`ResponseContext`] - mutable in-flight request and response state
//! - [`ResponseDescriptor`] - a fully specified response
//! - [`MediaType`] and the [`media`] negotiation helpers
//! - [`Codec`] / [`DefaultCodec`] - entity marshalling
//! - [`SecurityContext`] - the caller query surface
//! - [`ContextAccessor`] - current-request lookup for shared providers
//! - [`Outcome`] / [`IntoOutcome`] - what operations return

#![doc(html_root_url = "https://docs.rs/pylon-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod accessor;
mod codec;
mod context;
mod error;
mod handler;
pub mod media;
mod response;
mod security;

pub use accessor::{ContextAccessor, RequestScope, RequestView};
pub use codec::{Codec, DefaultCodec};
pub use context::{
    parse_query, Properties, RequestContext, RequestContextBuilder, RequestId, ResponseContext,
    RouteInfo,
};
pub use error::{ErrorDetail, ErrorEnvelope, ErrorType, PylonError, PylonResult};
pub use handler::{IntoOutcome, Json, Outcome};
pub use media::MediaType;
pub use response::ResponseDescriptor;
pub use security::SecurityContext;
