//! Turning a rejection into an HTTP response.
//!
//! The gate only decides that a request is rejected and with which status; building the
//! response is left to a [`ResponseEmitter`]. Writing it to the wire is the transport's job.

use bytes::Bytes;
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Response, StatusCode};

use crate::error::Rejection;

pub trait ResponseEmitter: Send + Sync {
    fn emit(&self, status: StatusCode, body: Bytes) -> Response<Bytes>;

    fn emit_rejection(&self, rejection: &Rejection) -> Response<Bytes> {
        self.emit(rejection.status_code(), Bytes::from(rejection.to_string()))
    }
}

/// Emits `text/plain` responses that announce the connection will be closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextEmitter;

impl ResponseEmitter for PlainTextEmitter {
    fn emit(&self, status: StatusCode, body: Bytes) -> Response<Bytes> {
        const TEXT_PLAIN: HeaderValue = HeaderValue::from_static("text/plain; charset=utf-8");
        const CLOSE: HeaderValue = HeaderValue::from_static("close");

        let content_length = HeaderValue::from(body.len());
        let mut response = Response::new(body);
        *response.status_mut() = status;

        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, TEXT_PLAIN);
        headers.insert(CONTENT_LENGTH, content_length);
        headers.insert(CONNECTION, CLOSE);
        response
    }
}
