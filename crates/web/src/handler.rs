use std::error::Error;
use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};

pub type HandlerError = Box<dyn Error + Send + Sync>;

/// Handles a request the gate has admitted to a recognized destination.
///
/// The body has been read in full by then. The matched
/// [`DestinationDescriptor`](micro_gate::DestinationDescriptor) is available as an
/// `Arc` in the request extensions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HandlerError>;
}

/// A `RequestHandler` made from an async function
#[derive(Debug)]
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Request<Bytes>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Bytes>, HandlerError>> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(Request<Bytes>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Bytes>, HandlerError>> + Send,
{
    async fn invoke(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HandlerError> {
        (self.f)(request).await
    }
}
