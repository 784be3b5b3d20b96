//! Per-request facts the gate decides on.
//!
//! [`RequestFacts`] is built from the request head only. The body is never touched:
//! the declared size comes from `Content-Length`, and a `Transfer-Encoding` header
//! alone tells that a body will be streamed.

use http::header::{CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFacts {
    method: Method,
    path: String,
    host: Option<String>,
    declared_size: Option<u64>,
    has_transfer_encoding: bool,
}

impl RequestFacts {
    pub fn new(method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        Self {
            method: method.clone(),
            path: uri.path().to_owned(),
            host: parse_host(uri, headers),
            declared_size: parse_content_length(headers),
            has_transfer_encoding: headers.contains_key(TRANSFER_ENCODING),
        }
    }

    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::new(request.method(), request.uri(), request.headers())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// The parsed `Content-Length`, `None` when it is absent or unparsable
    pub fn declared_size(&self) -> Option<u64> {
        self.declared_size
    }

    pub fn has_transfer_encoding(&self) -> bool {
        self.has_transfer_encoding
    }

    /// Whether the request announced a body at all.
    ///
    /// A request with neither `Content-Length` nor `Transfer-Encoding` carries no body
    /// and is never evaluated against a limit.
    #[inline]
    pub fn expects_body(&self) -> bool {
        self.declared_size.is_some() || self.has_transfer_encoding
    }
}

impl From<&Parts> for RequestFacts {
    fn from(parts: &Parts) -> Self {
        Self::new(&parts.method, &parts.uri, &parts.headers)
    }
}

/// Duplicated `Content-Length` headers only count when they all agree.
fn parse_content_length(headers: &HeaderMap) -> Option<u64> {
    let mut declared = None;
    for value in headers.get_all(CONTENT_LENGTH) {
        let length = value.to_str().ok()?.trim().parse::<u64>().ok()?;
        match declared {
            Some(previous) if previous != length => return None,
            _ => declared = Some(length),
        }
    }
    declared
}

// refer: https://www.rfc-editor.org/rfc/rfc9112.html#name-reconstructing-the-target-u
fn parse_host(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    if let Some(host) = uri.host() {
        return Some(host.to_ascii_lowercase());
    }

    let value = headers.get(HOST)?.to_str().ok()?.trim();
    let host = match value.rsplit_once(':') {
        // a bare ipv6 literal keeps its colons unless it is bracketed
        Some((host, port)) if port.bytes().all(|b| b.is_ascii_digit()) && (!host.contains(':') || host.ends_with(']')) => host,
        _ => value,
    };

    if host.is_empty() { None } else { Some(host.to_ascii_lowercase()) }
}
