//! Protocol types shared by the codec and the connection.
//!
//! - [`RequestHeader`]: the decoded request head, before any body byte
//! - [`HttpError`]: top-level error of a connection
//! - [`ParseError`]: request head decoding errors
//! - [`SendError`]: response writing errors

mod request;
pub use request::RequestHeader;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
