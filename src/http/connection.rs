use std::net::SocketAddr;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::http::parser::read_request;
use crate::http::request::Request;
use crate::http::response::HandlerError;
use crate::http::writer::ResponseWriter;
use crate::server::handler::Handler;

/// One accepted client connection, serving exactly one request.
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Responding(Request),
    Rejecting(HandlerError),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            state: ConnectionState::Reading,
        }
    }

    /// Reads one request, answers it, and shuts the stream down.
    ///
    /// The stream is shut down whether or not the handler succeeded.
    pub async fn run<H: Handler>(mut self, handler: &H) -> anyhow::Result<()> {
        let outcome = self.respond(handler).await;

        if let Err(e) = self.stream.shutdown().await {
            debug!(peer = %self.peer, error = %e, "Shutdown after response failed");
        }
        outcome
    }

    async fn respond<H: Handler>(&mut self, handler: &H) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match read_request(&mut self.stream).await {
                        Ok(request) => {
                            debug!(
                                peer = %self.peer,
                                method = %request.method(),
                                target = %request.target(),
                                "Request parsed"
                            );
                            ConnectionState::Responding(request)
                        }
                        Err(e) => {
                            warn!(peer = %self.peer, error = %e, "Rejecting request");
                            ConnectionState::Rejecting(HandlerError::bad_request(e.to_string()))
                        }
                    };
                }

                ConnectionState::Responding(request) => {
                    let mut writer = ResponseWriter::new(&mut self.stream);
                    handler
                        .handle(&mut writer, &request)
                        .await
                        .with_context(|| format!("handler failed for {}", request.target()))?;
                    writer.flush().await?;
                }

                ConnectionState::Rejecting(error) => {
                    let mut writer = ResponseWriter::new(&mut self.stream);
                    error.write(&mut writer).await?;
                    writer.flush().await?;
                }

                ConnectionState::Closed => return Ok(()),
            }
        }
    }
}
