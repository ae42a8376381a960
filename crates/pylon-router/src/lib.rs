//! Path template routing for Pylon.
//!
//! This crate resolves a request method and path to a registered value
//! (for Pylon, an operation index). Unlike a radix tree, templates are kept
//! in an explicit specificity order so that resolution is deterministic and
//! independent of registration order.
//!
//! # Features
//!
//! - **Templates**: literals, `{name}`, `{name: regex}` and a trailing `*rest`
//! - **Specificity**: literal segments outrank parameters position by position,
//!   then longer literal text wins, then the template text breaks ties
//! - **Method tables**: 405 detection with a ready-made `Allow` header,
//!   HEAD answered by GET
//! - **Matrix parameters**: `;k=v` stripped from segments and exposed for the
//!   final segment
//!
//! # Example
//!
//! ```rust
//! use pylon_router::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.insert(Method::GET, "/widgets/{id}", 0_usize).unwrap();
//! router.insert(Method::GET, "/widgets/{id}/parts", 1_usize).unwrap();
//!
//! let found = router.resolve(&Method::GET, "/widgets/42").unwrap();
//! assert_eq!(*found.value, 0);
//! assert_eq!(found.params.get("id"), Some("42"));
//! ```

#![doc(html_root_url = "https://docs.rs/pylon-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod method_router;
mod params;
mod router;
mod template;

pub use error::RouteError;
pub use method_router::{join_methods, MethodRouter};
pub use params::Params;
pub use router::{RouteMatch, RouteMiss, Router};
pub use template::{split_path, PathTemplate, Segment, SplitPath};
