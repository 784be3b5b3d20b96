//! Request head decoder
//!
//! Parses the request line and header fields out of the read buffer with `httparse` and
//! leaves everything after the blank line untouched in the buffer. The decoder never
//! interprets `Content-Length` or `Transfer-Encoding`; judging the declared body is the
//! gate's job, and a malformed length simply counts as undeclared there.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - HTTP/1.0 and HTTP/1.1 only
//!
//! Header names and values are not copied: the decoder records their byte ranges and
//! slices them out of the frozen header bytes.

use std::mem::MaybeUninit;

use bytes::BytesMut;
use http::{HeaderName, HeaderValue, Method, Request, Uri, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, RequestHeader};

/// Maximum number of headers allowed in a request
pub const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

// "GET / HTTP/1.1\r\n\r\n" without the trailing CRLF
const MIN_REQUEST_BYTES: usize = 14;

#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = RequestHeader;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < MIN_REQUEST_BYTES {
            return Ok(None);
        }

        let mut req = httparse::Request::new(&mut []);
        let mut headers: [MaybeUninit<httparse::Header>; MAX_HEADER_NUM] = [const { MaybeUninit::uninit() }; MAX_HEADER_NUM];

        let parsed_result = req.parse_with_uninit_headers(src, &mut headers).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        match parsed_result? {
            Status::Complete(body_offset) => {
                trace!(header_size = body_offset, "parsed request head");
                ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

                let header_count = req.headers.len();

                let mut header_index: [HeaderIndex; MAX_HEADER_NUM] = EMPTY_HEADER_INDEX_ARRAY;
                HeaderIndex::record(src, req.headers, &mut header_index);

                let version = match req.version {
                    Some(0) => Version::HTTP_10,
                    Some(1) => Version::HTTP_11,
                    v => return Err(ParseError::InvalidVersion(v)),
                };
                let method =
                    req.method.and_then(|method| Method::from_bytes(method.as_bytes()).ok()).ok_or(ParseError::InvalidMethod)?;
                let uri = req.path.and_then(|path| Uri::try_from(path).ok()).ok_or(ParseError::InvalidUri)?;

                let mut request = Request::new(());
                *request.method_mut() = method;
                *request.uri_mut() = uri;
                *request.version_mut() = version;

                let header_map = request.headers_mut();
                header_map.reserve(header_count);

                let header_bytes = src.split_to(body_offset).freeze();
                for index in &header_index[..header_count] {
                    let name = HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1]).map_err(ParseError::invalid_header)?;
                    let value = HeaderValue::from_maybe_shared(header_bytes.slice(index.value.0..index.value.1))
                        .map_err(ParseError::invalid_header)?;
                    header_map.append(name, value);
                }

                Ok(Some(RequestHeader::from(request)))
            }
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                Ok(None)
            }
        }
    }
}

/// Byte ranges of a header's name and value within the read buffer.
#[derive(Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

const EMPTY_HEADER_INDEX: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

const EMPTY_HEADER_INDEX_ARRAY: [HeaderIndex; MAX_HEADER_NUM] = [EMPTY_HEADER_INDEX; MAX_HEADER_NUM];

impl HeaderIndex {
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, indices) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            let name_end = name_start + header.name.len();
            indices.name = (name_start, name_end);
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            let value_end = value_start + header.value.len();
            indices.value = (value_start, value_end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
    use indoc::indoc;

    fn decode(str: &str) -> (RequestHeader, BytesMut) {
        let mut buf = BytesMut::from(str);
        let header = HeaderDecoder.decode(&mut buf).unwrap().unwrap();
        (header, buf)
    }

    #[test]
    fn body_bytes_stay_in_buffer() {
        let str = indoc! {r##"
        POST /upload HTTP/1.1
        Host: 127.0.0.1:8080
        Content-Length: 3

        123"##};

        let (header, rest) = decode(str);

        assert_eq!(header.method(), &Method::POST);
        assert_eq!(header.facts().declared_size(), Some(3));
        assert_eq!(&rest[..], &b"123"[..]);
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##};

        let (header, rest) = decode(str);

        assert!(rest.is_empty());
        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.version(), Version::HTTP_11);
        assert_eq!(header.uri().path(), "/index.html");
        assert_eq!(header.uri().query(), None);
        assert_eq!(header.headers().len(), 3);
        assert_eq!(header.headers().get(HOST), Some(&HeaderValue::from_static("127.0.0.1:8080")));
        assert_eq!(header.facts().declared_size(), None);
    }

    #[test]
    fn absolute_form_keeps_authority() {
        let str = indoc! {r##"
        PUT http://Files.Example.com/store?x=1 HTTP/1.0
        Content-Length: 10

        "##};

        let (header, _) = decode(str);

        assert_eq!(header.version(), Version::HTTP_10);
        assert_eq!(header.uri().path(), "/store");
        assert_eq!(header.facts().host(), Some("files.example.com"));
    }

    #[test]
    fn partial_head_needs_more() {
        let mut buf = BytesMut::from("POST /upload HTTP/1.1\r\nContent-Le");

        assert!(HeaderDecoder.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 33);
    }

    #[test]
    fn short_buffer_needs_more() {
        let mut buf = BytesMut::from("GET /");

        assert!(HeaderDecoder.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn malformed_length_is_left_to_the_gate() {
        let str = indoc! {r##"
        POST /upload HTTP/1.1
        Content-Length: lots

        "##};

        let (header, _) = decode(str);

        assert_eq!(header.headers().get(CONTENT_LENGTH), Some(&HeaderValue::from_static("lots")));
        assert_eq!(header.facts().declared_size(), None);
    }

    #[test]
    fn length_and_chunked_together() {
        let str = indoc! {r##"
        POST /upload HTTP/1.1
        Content-Length: 10
        Transfer-Encoding: chunked

        "##};

        let (header, _) = decode(str);

        assert!(header.headers().contains_key(TRANSFER_ENCODING));
        assert!(header.facts().has_transfer_encoding());
    }

    #[test]
    fn too_large_partial_head() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\n");
        buf.extend_from_slice(format!("X-Filler: {}\r\n", "a".repeat(MAX_HEADER_BYTES)).as_bytes());

        let result = HeaderDecoder.decode(&mut buf);

        assert!(matches!(result, Err(ParseError::TooLargeHeader { .. })));
    }

    #[test]
    fn too_many_headers() {
        let mut raw = String::from("GET / HTTP/1.1\r\n");
        for i in 0..=MAX_HEADER_NUM {
            raw.push_str(&format!("X-Header-{i}: v\r\n"));
        }
        raw.push_str("\r\n");
        let mut buf = BytesMut::from(raw.as_str());

        let result = HeaderDecoder.decode(&mut buf);

        assert!(matches!(result, Err(ParseError::TooManyHeaders { max_num: MAX_HEADER_NUM })));
    }

    #[test]
    fn invalid_request_line() {
        let mut buf = BytesMut::from("NOT A REQUEST LINE AT ALL\r\n\r\n");

        assert!(HeaderDecoder.decode(&mut buf).is_err());
    }
}
