//! Connection handling
//!
//! - [`GatedConnection`]: decodes the request head, runs the admission gate and either
//!   hands the connection over to the caller or carries out the rejection
//! - [`ConnectionTerminator`]: closes a rejected connection, immediately or after the
//!   rejection response has been flushed

mod gated_connection;
mod terminator;

pub use gated_connection::{AdmitOutcome, AdmittedParts, AdmittedRequest, GatedConnection};
pub use terminator::{ConnectionTerminator, TerminationMode};
