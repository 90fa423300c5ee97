use std::fmt;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::{canonical_name, HeaderStore, CRLF};
use crate::http::response::StatusCode;

/// Where a [`ResponseWriter`] is in the response. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    StatusLine,
    Headers,
    Body,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriterState::StatusLine => "status line",
            WriterState::Headers => "headers",
            WriterState::Body => "body",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("cannot write {operation} in the {state} state")]
    InvalidState {
        operation: &'static str,
        state: WriterState,
    },

    #[error("failed writing response: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes a response to `W`, enforcing status line, headers, body order.
///
/// A call made in the wrong state fails with
/// [`WriterError::InvalidState`] before anything reaches the sink.
///
/// ```text
/// write_status_line -> write_headers -> write_body*
///                                    -> write_chunk* -> write_chunked_terminator
///                                    -> write_chunk* -> write_last_chunk -> write_trailers
/// ```
pub struct ResponseWriter<W> {
    inner: W,
    state: WriterState,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            state: WriterState::StatusLine,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), WriterError> {
        self.expect(WriterState::StatusLine, "status line")?;
        self.inner.write_all(status.status_line().as_bytes()).await?;
        self.state = WriterState::Headers;
        Ok(())
    }

    pub async fn write_headers(&mut self, headers: &HeaderStore) -> Result<(), WriterError> {
        self.expect(WriterState::Headers, "headers")?;
        self.inner.write_all(&serialize_fields(headers)).await?;
        self.state = WriterState::Body;
        Ok(())
    }

    /// Writes body bytes verbatim. May be called repeatedly.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<(), WriterError> {
        self.expect(WriterState::Body, "body")?;
        self.inner.write_all(body).await?;
        Ok(())
    }

    /// Writes one chunk of a chunked body.
    ///
    /// An empty `chunk` produces the zero-size chunk, which ends the body;
    /// use [`write_chunked_terminator`](Self::write_chunked_terminator) for
    /// that instead.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), WriterError> {
        self.expect(WriterState::Body, "chunked body")?;
        let mut buf = Vec::with_capacity(chunk.len() + 20);
        buf.extend_from_slice(format!("{:x}", chunk.len()).as_bytes());
        buf.extend_from_slice(CRLF);
        buf.extend_from_slice(chunk);
        buf.extend_from_slice(CRLF);
        self.inner.write_all(&buf).await?;
        Ok(())
    }

    /// Ends a chunked body that carries no trailers: `0\r\n\r\n`.
    pub async fn write_chunked_terminator(&mut self) -> Result<(), WriterError> {
        self.expect(WriterState::Body, "chunked body terminator")?;
        self.inner.write_all(b"0\r\n\r\n").await?;
        Ok(())
    }

    /// Writes the zero-size chunk line `0\r\n` that precedes trailers.
    pub async fn write_last_chunk(&mut self) -> Result<(), WriterError> {
        self.expect(WriterState::Body, "last chunk")?;
        self.inner.write_all(b"0\r\n").await?;
        Ok(())
    }

    /// Writes trailer fields and the blank line closing the chunked body.
    pub async fn write_trailers(&mut self, trailers: &HeaderStore) -> Result<(), WriterError> {
        self.expect(WriterState::Body, "trailers")?;
        self.inner.write_all(&serialize_fields(trailers)).await?;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), WriterError> {
        self.inner.flush().await?;
        Ok(())
    }

    fn expect(&self, state: WriterState, operation: &'static str) -> Result<(), WriterError> {
        if self.state != state {
            return Err(WriterError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}

/// `Name: value\r\n` per field, then the blank line.
fn serialize_fields(fields: &HeaderStore) -> Vec<u8> {
    let mut buf = Vec::new();
    for (name, value) in fields.iter() {
        buf.extend_from_slice(canonical_name(name).as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(CRLF);
    }
    buf.extend_from_slice(CRLF);
    buf
}
