//! A small web server with the admission gate in front of every handler.
//!
//! Routes are declared on a [`Router`], each with an optional size cap and gate
//! override. The [`Server`] decodes a request head, lets the gate judge the declared
//! payload size and only then reads the body and calls the [`RequestHandler`].
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use micro_gate::{DestinationOverride, PolicyStore};
//! use micro_gate_web::router::{Router, post};
//! use micro_gate_web::{HandlerError, Server, handler_fn};
//!
//! async fn accept(request: Request<Bytes>) -> Result<Response<Bytes>, HandlerError> {
//!     Ok(Response::new(Bytes::from(format!("{} bytes", request.body().len()))))
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let router = Router::builder()
//!     .route("/api/data", post())
//!     .route("/upload", post().limit_override(DestinationOverride::Limit(2000)))
//!     .build()?;
//!
//! Server::builder()
//!     .address("127.0.0.1:3000")
//!     .router(router)
//!     .policy(PolicyStore::builder().recognized(1000).unrecognized(500).build()?)
//!     .handler(handler_fn(accept))
//!     .build()?
//!     .start()
//!     .await;
//! # Ok(())
//! # }
//! ```

mod handler;
mod server;

pub mod router;

pub use handler::{FnHandler, HandlerError, RequestHandler, handler_fn};
pub use router::Router;
pub use server::{Server, ServerBuildError, ServerBuilder};
