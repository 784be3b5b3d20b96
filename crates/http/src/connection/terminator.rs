//! Closing a connection after a rejection.
//!
//! Two modes are supported, picked once by configuration and never by request content:
//!
//! - [`TerminationMode::Immediate`]: the write side is shut down without writing anything,
//!   the client sees the connection close with no response
//! - [`TerminationMode::Graceful`]: the rejection response is written and flushed, then the
//!   write side is shut down, so the client can read the error body
//!
//! Graceful is the default. Closing is idempotent: once closed, further calls are no-ops,
//! and a peer that already went away is not an error.

use std::io;

use bytes::Bytes;
use futures::SinkExt;
use http::Response;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedWrite;
use tracing::{debug, trace};

use crate::codec::ResponseEncoder;
use crate::protocol::SendError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationMode {
    Immediate,
    #[default]
    Graceful,
}

#[derive(Debug)]
pub struct ConnectionTerminator<W> {
    framed_write: FramedWrite<W, ResponseEncoder>,
    mode: TerminationMode,
    closed: bool,
}

impl<W> ConnectionTerminator<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W, mode: TerminationMode) -> Self {
        Self { framed_write: FramedWrite::new(writer, ResponseEncoder), mode, closed: false }
    }

    pub fn mode(&self) -> TerminationMode {
        self.mode
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Carries out a rejection: depending on the mode, writes `response` first, then closes.
    pub async fn reject(&mut self, response: Response<Bytes>) -> Result<(), SendError> {
        if self.closed {
            trace!("connection already closed, rejection dropped");
            return Ok(());
        }

        let sent = match self.mode {
            TerminationMode::Immediate => {
                debug!(status = %response.status(), "closing connection without response");
                Ok(())
            }
            TerminationMode::Graceful => {
                debug!(status = %response.status(), "sending rejection before closing connection");
                // send flushes, the body is on the wire before shutdown
                match self.framed_write.send(response).await {
                    Err(SendError::Io { source }) if is_disconnect(&source) => {
                        debug!(cause = %source, "peer went away before the rejection was sent");
                        Ok(())
                    }
                    result => result,
                }
            }
        };

        let closed = self.close().await;
        sent.and(closed)
    }

    pub async fn close(&mut self) -> Result<(), SendError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match self.framed_write.get_mut().shutdown().await {
            Ok(()) => Ok(()),
            Err(e) if is_disconnect(&e) => {
                trace!(cause = %e, "connection was already closed by peer");
                Ok(())
            }
            Err(e) => Err(SendError::io(e)),
        }
    }

    pub fn into_inner(self) -> W {
        self.framed_write.into_inner()
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::NotConnected | io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset)
}
