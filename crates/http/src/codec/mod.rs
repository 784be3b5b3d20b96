//! Wire codecs for the gated connection
//!
//! - [`HeaderDecoder`]: decodes the request head and nothing more, the body stays
//!   in the read buffer until the gate has admitted the request
//! - [`ResponseEncoder`]: serializes a buffered response, used for rejections

mod header_decoder;
mod response_encoder;

pub use header_decoder::{HeaderDecoder, MAX_HEADER_BYTES, MAX_HEADER_NUM};
pub use response_encoder::ResponseEncoder;
