//! HTTP/1.1 transport for the admission gate
//!
//! This crate puts a [`micro_gate::AdmissionGate`] in front of an HTTP/1.1 connection.
//! The request head is decoded, the gate decides, and only then is the body touched:
//! either by whoever receives the admitted connection, or not at all when the request is
//! rejected and the connection terminated.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use micro_gate::{AdmissionGate, DestinationDescriptor, DestinationResolver, PlainTextEmitter, PolicyStore, RequestFacts, ResolveError};
//! use micro_gate_http::connection::{AdmitOutcome, GatedConnection, TerminationMode};
//! use tokio::net::TcpListener;
//! use tracing::{error, info};
//!
//! /// Everything below `/files/` is one destination, identified by its route pattern
//! struct Files(Arc<DestinationDescriptor>);
//!
//! impl DestinationResolver for Files {
//!     fn resolve(&self, facts: &RequestFacts) -> Result<Option<Arc<DestinationDescriptor>>, ResolveError> {
//!         Ok(facts.path().starts_with("/files/").then(|| Arc::clone(&self.0)))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let policy = PolicyStore::builder().recognized(1024 * 1024).build().unwrap();
//!     let gate = Arc::new(AdmissionGate::new(Files(Arc::new(DestinationDescriptor::new("/files/{name}"))), policy));
//!     let tcp_listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!
//!     loop {
//!         let Ok((tcp_stream, _remote_addr)) = tcp_listener.accept().await else { continue };
//!         let gate = gate.clone();
//!
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             match GatedConnection::new(reader, writer).admit(&gate, &PlainTextEmitter, TerminationMode::Graceful).await {
//!                 Ok(AdmitOutcome::Admitted(request)) => info!(path = request.header().uri().path(), "admitted"),
//!                 Ok(_) => {}
//!                 Err(e) => error!(cause = %e, "connection error"),
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! # Limitations
//!
//! - HTTP/1.1 and HTTP/1.0 only
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
