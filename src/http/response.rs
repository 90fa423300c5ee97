use tokio::io::AsyncWrite;

use crate::http::headers::HeaderStore;
use crate::http::writer::{ResponseWriter, WriterError};

/// HTTP status codes the server knows a reason phrase for.
///
/// `Other` carries any other code; it is written with an empty reason
/// phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 500 Internal Server Error
    InternalServerError,
    Other(u16),
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use httpfromtcp::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::Other(404).as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::InternalServerError => 500,
            StatusCode::Other(code) => *code,
        }
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::Other(_) => "",
        }
    }

    /// `HTTP/1.1 <code> <reason>\r\n`
    pub(crate) fn status_line(&self) -> String {
        format!("HTTP/1.1 {} {}\r\n", self.as_u16(), self.reason_phrase())
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        match code {
            200 => StatusCode::Ok,
            400 => StatusCode::BadRequest,
            500 => StatusCode::InternalServerError,
            other => StatusCode::Other(other),
        }
    }
}

/// Headers for a fixed-length plain text response.
///
/// Callers adjust the result with [`HeaderStore::set`] and
/// [`HeaderStore::remove`], e.g. to switch to `text/html` or to drop
/// `Content-Length` for a chunked body.
pub fn default_headers(content_len: usize) -> HeaderStore {
    let mut headers = HeaderStore::new();
    headers.set("Content-Length", &content_len.to_string());
    headers.set("Connection", "close");
    headers.set("Content-Type", "text/plain");
    headers
}

/// A status code and message that can be turned into a complete response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    pub status: StatusCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BadRequest, message)
    }

    /// Writes status line, default headers and the message as body.
    pub async fn write<W>(&self, w: &mut ResponseWriter<W>) -> Result<(), WriterError>
    where
        W: AsyncWrite + Unpin,
    {
        let body = self.message.as_bytes();
        w.write_status_line(self.status).await?;
        w.write_headers(&default_headers(body.len())).await?;
        w.write_body(body).await
    }
}
