use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use http::{StatusCode, Version};
use micro_gate::{Admission, AdmissionGate, DestinationResolver, Rejection, ResponseEmitter};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, Chain};
use tokio_util::codec::{FramedParts, FramedRead};
use tracing::{error, info};

use crate::codec::HeaderDecoder;
use crate::connection::{ConnectionTerminator, TerminationMode};
use crate::protocol::{HttpError, RequestHeader, SendError};

const CONTINUE_RESPONSE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// A connection whose request is checked by an [`AdmissionGate`] between decoding the
/// head and reading the body.
///
/// Only the head is decoded here. Whatever the decoder read past the blank line stays in
/// the read buffer and is handed over with the [`AdmittedRequest`], so no body byte is
/// lost, and none is consumed before the gate has spoken.
#[derive(Debug)]
pub struct GatedConnection<R, W> {
    framed_read: FramedRead<R, HeaderDecoder>,
    writer: W,
}

#[derive(Debug)]
pub enum AdmitOutcome<R, W> {
    Admitted(AdmittedRequest<R, W>),
    /// The rejection has been carried out and the connection is closed
    Rejected(Rejection),
    /// The peer closed the connection before sending a request head
    Closed,
}

impl<R, W> GatedConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { framed_read: FramedRead::with_capacity(reader, HeaderDecoder, 8 * 1024), writer }
    }

    pub async fn admit<D, E>(mut self, gate: &AdmissionGate<D>, emitter: &E, mode: TerminationMode) -> Result<AdmitOutcome<R, W>, HttpError>
    where
        D: DestinationResolver,
        E: ResponseEmitter + ?Sized,
    {
        let header = match self.framed_read.next().await {
            Some(Ok(header)) => header,
            Some(Err(e)) => {
                error!(cause = %e, "can't decode request head");
                let response = emitter.emit(StatusCode::BAD_REQUEST, Bytes::from_static(b"Bad Request"));
                ConnectionTerminator::new(self.writer, TerminationMode::Graceful).reject(response).await?;
                return Err(e.into());
            }
            None => {
                info!("connection closed before a request head arrived");
                return Ok(AdmitOutcome::Closed);
            }
        };

        let admission = gate.check(&header.facts());

        if let Some(rejection) = admission.verdict().rejection() {
            let response = emitter.emit_rejection(&rejection);
            ConnectionTerminator::new(self.writer, mode).reject(response).await?;
            return Ok(AdmitOutcome::Rejected(rejection));
        }

        // the client holds its body back until told to go on, which only happens once admitted
        if header.version() == Version::HTTP_11 && header.expects_continue() {
            self.writer.write_all(CONTINUE_RESPONSE).await.map_err(SendError::io)?;
            self.writer.flush().await.map_err(SendError::io)?;
            info!("receive expect request header, sent continue response");
        }

        let FramedParts { io: reader, read_buf, .. } = self.framed_read.into_parts();
        Ok(AdmitOutcome::Admitted(AdmittedRequest { header, admission, reader, read_buf, writer: self.writer }))
    }
}

/// A request that passed the gate, together with the connection it arrived on.
#[derive(Debug)]
pub struct AdmittedRequest<R, W> {
    header: RequestHeader,
    admission: Admission,
    reader: R,
    read_buf: BytesMut,
    writer: W,
}

impl<R, W> AdmittedRequest<R, W>
where
    R: AsyncRead + Unpin,
{
    pub fn header(&self) -> &RequestHeader {
        &self.header
    }

    pub fn admission(&self) -> &Admission {
        &self.admission
    }

    /// Bytes already read from the socket past the request head
    pub fn buffered(&self) -> &[u8] {
        &self.read_buf
    }

    pub fn into_parts(self) -> AdmittedParts<R, W> {
        let buffered = Cursor::new(self.read_buf.freeze());
        AdmittedParts { header: self.header, admission: self.admission, body: buffered.chain(self.reader), writer: self.writer }
    }
}

#[derive(Debug)]
pub struct AdmittedParts<R, W> {
    pub header: RequestHeader,
    pub admission: Admission,
    /// The rest of the inbound stream, starting with the first body byte
    pub body: Chain<Cursor<Bytes>, R>,
    pub writer: W,
}
