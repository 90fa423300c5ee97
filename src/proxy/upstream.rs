//! Upstream connection and response streaming.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;
use url::Url;

use crate::config::UpstreamConfig;
use crate::http::headers::{find_crlf, HeaderStore, CRLF};

/// Read buffer size for upstream responses.
const BUFFER_SIZE: usize = 8192;

/// A plain-HTTP server that requests are forwarded to.
#[derive(Debug, Clone)]
pub struct Upstream {
    base: Url,
    connect_timeout: Duration,
}

impl Upstream {
    pub fn new(base: &str, connect_timeout: Duration) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid upstream URL {base:?}"))?;
        if base.scheme() != "http" {
            bail!("unsupported upstream scheme {:?}, only http is supported", base.scheme());
        }
        if base.host_str().is_none() {
            bail!("upstream URL {base} has no host");
        }
        Ok(Self {
            base,
            connect_timeout,
        })
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self> {
        Self::new(&config.url, Duration::from_secs(config.connect_timeout_secs))
    }

    /// Upstream path for `rest`, appended to the base URL's path.
    pub fn path_for(&self, rest: &str) -> String {
        let path = format!("{}{}", self.base.path().trim_end_matches('/'), rest);
        if path.starts_with('/') { path } else { format!("/{path}") }
    }

    /// `host[:port]` as it goes into the `Host` header.
    fn authority(&self) -> String {
        let host = self.base.host_str().unwrap_or_default();
        match self.base.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Request bytes for a `GET` of `rest` on this upstream.
    pub fn build_request(&self, rest: &str) -> Vec<u8> {
        format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: httpfromtcp\r\nAccept: */*\r\nConnection: close\r\n\r\n",
            self.path_for(rest),
            self.authority()
        )
        .into_bytes()
    }

    /// Sends a `GET` for `rest` and returns once the response head is in.
    pub async fn get(&self, rest: &str) -> Result<UpstreamResponse<TcpStream>> {
        let addr = format!(
            "{}:{}",
            self.base.host_str().unwrap_or_default(),
            self.base.port_or_known_default().unwrap_or(80)
        );
        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .context("Connection timeout")?
            .with_context(|| format!("failed to connect to upstream {addr}"))?;

        debug!(upstream = %addr, path = %self.path_for(rest), "Forwarding request");

        stream.write_all(&self.build_request(rest)).await?;
        stream.flush().await?;

        read_response(stream).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Length { remaining: usize },
    Chunked(ChunkPhase),
    UntilClose,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkPhase {
    Size,
    Data { remaining: usize },
    DataEnd,
    Trailers,
}

/// An upstream response whose head has been read and whose body is
/// pulled with [`next_chunk`](Self::next_chunk).
pub struct UpstreamResponse<R> {
    pub status: u16,
    pub headers: HeaderStore,
    reader: R,
    buf: BytesMut,
    framing: Framing,
}

/// Reads the status line and headers of a response from `reader`.
pub async fn read_response<R>(reader: R) -> Result<UpstreamResponse<R>>
where
    R: AsyncRead + Unpin,
{
    let mut resp = UpstreamResponse {
        status: 0,
        headers: HeaderStore::new(),
        reader,
        buf: BytesMut::with_capacity(BUFFER_SIZE),
        framing: Framing::UntilClose,
    };

    let status_line = resp.read_line().await?;
    resp.status = parse_status_line(&status_line)?;

    loop {
        let (n, done) = resp.headers.parse_one(&resp.buf)?;
        resp.buf.advance(n);
        if done {
            break;
        }
        if n == 0 && resp.fill().await? == 0 {
            bail!("upstream closed before the end of the response headers");
        }
    }

    resp.framing = framing_for(&resp.headers)?;
    Ok(resp)
}

impl<R> UpstreamResponse<R>
where
    R: AsyncRead + Unpin,
{
    /// Next piece of the decoded body, or `None` once it is complete.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.framing {
                Framing::Finished => return Ok(None),

                Framing::Length { remaining: 0 } => self.framing = Framing::Finished,

                Framing::Length { remaining } => {
                    if self.buf.is_empty() && self.fill().await? == 0 {
                        bail!("upstream closed with {remaining} body bytes outstanding");
                    }
                    let n = remaining.min(self.buf.len());
                    self.framing = Framing::Length {
                        remaining: remaining - n,
                    };
                    return Ok(Some(self.buf.split_to(n).freeze()));
                }

                Framing::UntilClose => {
                    if self.buf.is_empty() && self.fill().await? == 0 {
                        self.framing = Framing::Finished;
                        continue;
                    }
                    return Ok(Some(self.buf.split().freeze()));
                }

                Framing::Chunked(ChunkPhase::Size) => {
                    let line = self.read_line().await?;
                    let size = line.split(';').next().unwrap_or_default().trim();
                    let size = usize::from_str_radix(size, 16)
                        .with_context(|| format!("invalid chunk size line {line:?}"))?;
                    self.framing = if size == 0 {
                        Framing::Chunked(ChunkPhase::Trailers)
                    } else {
                        Framing::Chunked(ChunkPhase::Data { remaining: size })
                    };
                }

                Framing::Chunked(ChunkPhase::Data { remaining }) => {
                    if self.buf.is_empty() && self.fill().await? == 0 {
                        bail!("upstream closed in the middle of a chunk");
                    }
                    let n = remaining.min(self.buf.len());
                    self.framing = if n == remaining {
                        Framing::Chunked(ChunkPhase::DataEnd)
                    } else {
                        Framing::Chunked(ChunkPhase::Data {
                            remaining: remaining - n,
                        })
                    };
                    return Ok(Some(self.buf.split_to(n).freeze()));
                }

                Framing::Chunked(ChunkPhase::DataEnd) => {
                    if !self.read_line().await?.is_empty() {
                        bail!("chunk data not followed by CRLF");
                    }
                    self.framing = Framing::Chunked(ChunkPhase::Size);
                }

                // Upstream trailers are not forwarded.
                Framing::Chunked(ChunkPhase::Trailers) => {
                    if self.read_line().await?.is_empty() {
                        self.framing = Framing::Finished;
                    }
                }
            }
        }
    }

    async fn read_line(&mut self) -> Result<String> {
        loop {
            if let Some(idx) = find_crlf(&self.buf) {
                let line = self.buf.split_to(idx + CRLF.len());
                return Ok(String::from_utf8_lossy(&line[..idx]).into_owned());
            }
            if self.fill().await? == 0 {
                bail!("upstream closed in the middle of a line");
            }
        }
    }

    async fn fill(&mut self) -> std::io::Result<usize> {
        self.buf.reserve(BUFFER_SIZE);
        self.reader.read_buf(&mut self.buf).await
    }
}

/// Status code from `HTTP/1.1 200 OK`.
fn parse_status_line(line: &str) -> Result<u16> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        bail!("malformed upstream status line {line:?}");
    }
    parts
        .next()
        .and_then(|code| code.parse().ok())
        .with_context(|| format!("malformed upstream status line {line:?}"))
}

fn framing_for(headers: &HeaderStore) -> Result<Framing> {
    let chunked = headers
        .get("transfer-encoding")
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
    if chunked {
        return Ok(Framing::Chunked(ChunkPhase::Size));
    }

    match headers.get("content-length") {
        Some(v) => {
            let remaining = v
                .parse()
                .with_context(|| format!("invalid upstream content-length {v:?}"))?;
            Ok(Framing::Length { remaining })
        }
        None => Ok(Framing::UntilClose),
    }
}
