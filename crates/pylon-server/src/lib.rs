//! # Pylon Server
//!
//! A thin HTTP/1.1 transport for a [`Pipeline`](pylon_pipeline::Pipeline).
//!
//! The server owns the socket work only: it accepts connections, collects
//! each request body up to a size limit and hands the request to
//! [`Pipeline::execute`](pylon_pipeline::Pipeline::execute). Routing,
//! binding, filters and error mapping all happen in the pipeline.
//!
//! - HTTP/1.1 via Hyper
//! - Body size limit (413) and request timeout
//! - Connection limit
//! - Graceful shutdown on SIGTERM/SIGINT or a programmatic signal
//!
//! ## Example
//!
//! ```rust,ignore
//! use pylon_pipeline::{Operation, Pipeline, Registry};
//! use pylon_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::builder()
//!         .operation(Operation::get("/ping").to(|_| async { Ok("pong") }))
//!         .build()?;
//!
//!     let config = ServerConfig::builder().http_addr("0.0.0.0:8080").build();
//!     Server::new(Pipeline::new(registry), config).run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/pylon-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::ServerError;
pub use server::{HttpResponse, Server};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
