use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use bytes::Bytes;
use futures::SinkExt;
use http::header::{CONNECTION, CONTENT_LENGTH};
use http::{HeaderValue, Response, StatusCode};
use micro_gate::{Admission, AdmissionGate, PlainTextEmitter, PolicyStore, Rejection, ResponseEmitter};
use micro_gate_http::codec::ResponseEncoder;
use micro_gate_http::connection::{AdmitOutcome, AdmittedParts, GatedConnection, TerminationMode};
use micro_gate_http::protocol::{HttpError, ParseError, RequestHeader, SendError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::codec::FramedWrite;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::handler::RequestHandler;
use crate::router::Router;

// upper bound for the initial body buffer, the declared size is not trusted for allocation
const MAX_BODY_PREALLOC: usize = 64 * 1024;

pub struct ServerBuilder {
    router: Option<Router>,
    policy: PolicyStore,
    handler: Option<Arc<dyn RequestHandler>>,
    emitter: Arc<dyn ResponseEmitter>,
    termination: TerminationMode,
    address: Option<io::Result<Vec<SocketAddr>>>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self {
            router: None,
            policy: PolicyStore::unlimited(),
            handler: None,
            emitter: Arc::new(PlainTextEmitter),
            termination: TerminationMode::default(),
            address: None,
        }
    }

    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(Iterator::collect));
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn policy(mut self, policy: PolicyStore) -> Self {
        self.policy = policy;
        self
    }

    pub fn handler(mut self, request_handler: impl RequestHandler + 'static) -> Self {
        self.handler = Some(Arc::new(request_handler));
        self
    }

    pub fn emitter(mut self, emitter: impl ResponseEmitter + 'static) -> Self {
        self.emitter = Arc::new(emitter);
        self
    }

    pub fn termination(mut self, mode: TerminationMode) -> Self {
        self.termination = mode;
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        let handler = self.handler.ok_or(ServerBuildError::MissingHandler)?;
        let address = self.address.ok_or(ServerBuildError::MissingAddress)??;

        let gate = AdmissionGate::new(router, self.policy);
        gate.limits().cache().warm(gate.resolver().override_entries().iter().cloned());

        Ok(Server { gate, handler, emitter: self.emitter, termination: self.termination, address })
    }
}

pub struct Server {
    gate: AdmissionGate<Router>,
    handler: Arc<dyn RequestHandler>,
    emitter: Arc<dyn ResponseEmitter>,
    termination: TerminationMode,
    address: Vec<SocketAddr>,
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("gate", &self.gate)
            .field("termination", &self.termination)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
    #[error("handler must be set")]
    MissingHandler,
    #[error("address must be set")]
    MissingAddress,
    #[error("invalid address: {source}")]
    InvalidAddress {
        #[from]
        source: io::Error,
    },
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn gate(&self) -> &AdmissionGate<Router> {
        &self.gate
    }

    pub async fn start(self) {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            debug!("global subscriber already set, keeping it");
        }

        info!(address = ?self.address, "start listening");
        let tcp_listener = match TcpListener::bind(self.address.as_slice()).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return;
            }
        };

        self.serve(tcp_listener).await;
    }

    /// Accepts connections from `tcp_listener` until the task is dropped.
    pub async fn serve(self, tcp_listener: TcpListener) {
        let server = Arc::new(self);
        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let server = Arc::clone(&server);

            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                match server.process(reader, writer).await {
                    Ok(()) => debug!(%remote_addr, "finished process, connection shutdown"),
                    Err(e) => error!(%remote_addr, cause = %e, "service has error, connection shutdown"),
                }
            });
        }
    }

    /// Serves a single request on one connection, then closes it.
    pub async fn process<R, W>(&self, reader: R, writer: W) -> Result<(), HttpError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let connection = GatedConnection::new(reader, writer);
        let admitted = match connection.admit(&self.gate, self.emitter.as_ref(), self.termination).await? {
            AdmitOutcome::Admitted(admitted) => admitted,
            AdmitOutcome::Rejected(rejection) => {
                info!(status = %rejection.status_code(), "request rejected, connection closed");
                return Ok(());
            }
            AdmitOutcome::Closed => return Ok(()),
        };

        let AdmittedParts { header, admission, mut body, writer } = admitted.into_parts();
        let mut response = self.respond(header, admission, &mut body).await?;
        response.headers_mut().insert(CONNECTION, HeaderValue::from_static("close"));

        let mut framed_write = FramedWrite::new(writer, ResponseEncoder);
        framed_write.send(response).await?;
        framed_write.get_mut().shutdown().await.map_err(SendError::io)?;
        Ok(())
    }

    async fn respond<B>(&self, header: RequestHeader, admission: Admission, body: &mut B) -> Result<Response<Bytes>, HttpError>
    where
        B: AsyncRead + Unpin,
    {
        // the size was acceptable, but nothing serves this path
        let Some(destination) = admission.into_destination() else {
            return Ok(self.emitter.emit_rejection(&Rejection::UnrecognizedRejected));
        };

        let facts = header.facts();
        let body = match (facts.declared_size(), facts.has_transfer_encoding()) {
            (_, true) => return Ok(self.emitter.emit(StatusCode::LENGTH_REQUIRED, Bytes::from_static(b"Length Required"))),
            (None, false) if header.headers().contains_key(CONTENT_LENGTH) => {
                return Ok(self.emitter.emit(StatusCode::BAD_REQUEST, Bytes::from_static(b"Bad Request")));
            }
            (None, false) => Bytes::new(),
            (Some(size), false) => read_body(body, size).await?,
        };

        let mut request = header.body(body);
        request.extensions_mut().insert(destination);

        match self.handler.invoke(request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                error!(cause = %e, "handle request error");
                Ok(self.emitter.emit(StatusCode::INTERNAL_SERVER_ERROR, Bytes::from_static(b"Internal Server Error")))
            }
        }
    }
}

async fn read_body<B>(body: &mut B, size: u64) -> Result<Bytes, ParseError>
where
    B: AsyncRead + Unpin,
{
    let capacity = usize::try_from(size).unwrap_or(usize::MAX).min(MAX_BODY_PREALLOC);
    let mut buf = Vec::with_capacity(capacity);
    let read = body.take(size).read_to_end(&mut buf).await?;

    if u64::try_from(read).is_ok_and(|read| read == size) {
        Ok(Bytes::from(buf))
    } else {
        Err(ParseError::io(io::Error::new(io::ErrorKind::UnexpectedEof, format!("body ended after {read} of {size} bytes"))))
    }
}
