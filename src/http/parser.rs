use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::headers::{find_crlf, HeaderError, CRLF};
use crate::http::request::{Method, Request, RequestLine};

/// Starting size of the read buffer; it doubles whenever it fills up.
const INITIAL_BUFFER_SIZE: usize = 8;

const SUPPORTED_PROTOCOL: &str = "HTTP";
const SUPPORTED_VERSION: &str = "1.1";

/// Progress of a [`RequestParser`]. States only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Initial,
    ParsingHeaders,
    ParsingBody,
    Done,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    #[error("request method is not valid: {0:?}")]
    InvalidMethod(String),

    #[error("unsupported protocol {0:?}, this service is designed for HTTP")]
    UnsupportedProtocol(String),

    #[error("unsupported http version {0:?}, this service only supports HTTP/1.1")]
    UnsupportedVersion(String),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error("malformed content-length: {0:?}")]
    InvalidContentLength(String),

    #[error("body length exceeds stated content-length of {declared} bytes")]
    BodyTooLong { declared: usize },

    /// The peer closed the stream before a whole request arrived.
    #[error("incomplete request, connection closed in state {state:?}")]
    Incomplete { state: ParserState },

    #[error("trying to parse data in a done state")]
    AlreadyDone,

    #[error("error reading request: {0}")]
    Io(#[from] std::io::Error),
}

/// Incremental request parser.
///
/// Feed it whatever bytes have arrived so far with [`parse`](Self::parse);
/// it consumes as much as it can and reports how many bytes it used. Bytes
/// it did not consume must be offered again, followed by newly read data.
#[derive(Debug)]
pub struct RequestParser {
    state: ParserState,
    request: Request,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Initial,
            request: Request::default(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    /// Returns the request once parsing has reached [`ParserState::Done`].
    pub fn into_request(self) -> Option<Request> {
        self.is_done().then_some(self.request)
    }

    /// Runs state transitions over `data` until one needs more input or
    /// the request is complete. Returns the number of bytes consumed.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut total = 0;
        while self.state != ParserState::Done {
            let n = self.parse_single(&data[total..])?;
            total += n;
            if n == 0 {
                break;
            }
        }
        Ok(total)
    }

    fn parse_single(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match self.state {
            ParserState::Initial => {
                let Some(idx) = find_crlf(data) else {
                    return Ok(0);
                };
                self.request.request_line = parse_request_line(&data[..idx])?;
                self.state = ParserState::ParsingHeaders;
                Ok(idx + CRLF.len())
            }
            ParserState::ParsingHeaders => {
                let (n, done) = self.request.headers.parse_one(data)?;
                if done {
                    self.state = ParserState::ParsingBody;
                }
                Ok(n)
            }
            ParserState::ParsingBody => {
                let declared = match self.request.headers.get("content-length") {
                    Some(v) => v
                        .parse::<usize>()
                        .map_err(|_| ParseError::InvalidContentLength(v.to_string()))?,
                    None => {
                        self.state = ParserState::Done;
                        return Ok(data.len());
                    }
                };

                if self.request.body.len() + data.len() > declared {
                    return Err(ParseError::BodyTooLong { declared });
                }
                self.request.body.extend_from_slice(data);
                if self.request.body.len() == declared {
                    self.state = ParserState::Done;
                }
                Ok(data.len())
            }
            ParserState::Done => Err(ParseError::AlreadyDone),
        }
    }
}

/// Reads from `reader` until one complete request has been parsed.
///
/// Works with any fragmentation of the incoming stream, down to a single
/// byte per read. End of stream before the request is complete yields
/// [`ParseError::Incomplete`].
pub async fn read_request<R>(reader: &mut R) -> Result<Request, ParseError>
where
    R: AsyncRead + Unpin,
{
    let mut parser = RequestParser::new();
    let mut buf = vec![0u8; INITIAL_BUFFER_SIZE];
    let mut read_to_index = 0;

    while !parser.is_done() {
        if read_to_index >= buf.len() {
            buf.resize(buf.len() * 2, 0);
        }

        let n = reader.read(&mut buf[read_to_index..]).await?;
        if n == 0 {
            return Err(ParseError::Incomplete {
                state: parser.state(),
            });
        }
        read_to_index += n;

        let parsed = parser.parse(&buf[..read_to_index])?;
        buf.copy_within(parsed..read_to_index, 0);
        read_to_index -= parsed;
    }

    Ok(parser.request)
}

fn parse_request_line(line: &[u8]) -> Result<RequestLine, ParseError> {
    let line = std::str::from_utf8(line)
        .map_err(|_| ParseError::MalformedRequestLine(String::from_utf8_lossy(line).into_owned()))?;

    let parts: Vec<&str> = line.split(' ').collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(ParseError::MalformedRequestLine(line.to_string()));
    };

    let method = is_method_token(method)
        .then(|| Method::parse(method))
        .flatten()
        .ok_or_else(|| ParseError::InvalidMethod(method.to_string()))?;

    let (protocol, http_version) = version
        .split_once('/')
        .ok_or_else(|| ParseError::UnsupportedProtocol(version.to_string()))?;
    if protocol != SUPPORTED_PROTOCOL {
        return Err(ParseError::UnsupportedProtocol(protocol.to_string()));
    }
    if http_version != SUPPORTED_VERSION {
        return Err(ParseError::UnsupportedVersion(http_version.to_string()));
    }

    Ok(RequestLine {
        method,
        request_target: target.to_string(),
        http_version: http_version.to_string(),
    })
}

fn is_method_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_uppercase())
}
