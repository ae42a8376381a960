//! # Pylon Test
//!
//! Drives a [`Pipeline`](pylon_pipeline::Pipeline) in memory: no socket,
//! no port, the full phase sequence on every request.
//!
//! ## Example
//!
//! ```
//! use http::StatusCode;
//! use pylon_pipeline::{Operation, Pipeline, Registry};
//! use pylon_test::TestClient;
//! use serde_json::json;
//!
//! # tokio_test_block_on(async {
//! let registry = Registry::builder()
//!     .operation(Operation::get("/hello").to(|_| async { Ok(json!({"greeting": "hi"})) }))
//!     .build()
//!     .unwrap();
//! let client = TestClient::new(Pipeline::new(registry));
//!
//! let response = client.get("/hello").send().await;
//! response
//!     .assert_status(StatusCode::OK)
//!     .assert_header("content-type", "application/json");
//! assert_eq!(response.json::<serde_json::Value>().unwrap()["greeting"], "hi");
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/pylon-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::TestClient;
pub use error::TestError;
pub use request::TestRequest;
pub use response::TestResponse;
