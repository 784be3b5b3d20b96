//! Response encoder
//!
//! Serializes a fully buffered `Response<Bytes>` (status line, header fields, body) into
//! the write buffer. Rejection responses are small and complete, so there is no
//! streaming or chunked framing here. `Content-Length` is always rewritten to match
//! the body actually sent.

use std::io;
use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderValue, Response, Version, header};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::protocol::SendError;

const INIT_HEADER_SIZE: usize = 1024;

#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseEncoder;

impl Encoder<Response<Bytes>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Response<Bytes>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut parts, body) = item.into_parts();

        let version = match parts.version {
            Version::HTTP_11 => "HTTP/1.1",
            Version::HTTP_10 => "HTTP/1.0",
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(SendError::UnsupportedVersion(v));
            }
        };

        dst.reserve(INIT_HEADER_SIZE + body.len());
        write!(FastWrite(dst), "{version} {} {}\r\n", parts.status.as_str(), parts.status.canonical_reason().unwrap_or(""))?;

        parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));

        for (header_name, header_value) in &parts.headers {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        dst.put_slice(&body);
        Ok(())
    }
}

/// Writes straight into the `BytesMut`, space has been reserved upfront.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
