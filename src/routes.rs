//! Demo application served by the `httpfromtcp` binary.
//!
//! - `/yourproblem`: 400 with a fixed HTML page
//! - `/myproblem`: 500 with a fixed HTML page
//! - `/httpbin/...`: proxied to the upstream, streamed back chunked with
//!   `X-Content-SHA256` and `X-Content-Length` trailers
//! - anything else: 200 with a fixed HTML page

use sha2::{Digest, Sha256};
use tokio::io::AsyncWrite;
use tracing::{debug, warn};

use crate::http::headers::HeaderStore;
use crate::http::request::Request;
use crate::http::response::{default_headers, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::proxy::Upstream;
use crate::server::Handler;

pub const PROXY_PREFIX: &str = "/httpbin";

pub const OK_PAGE: &str = "<html>
<head>
<title>200 OK</title>
</head>
<body>
<h1>Success!</h1>
<p>Your request was an absolute banger.</p>
</body>
</html>
";

pub const BAD_REQUEST_PAGE: &str = "<html>
<head>
<title>400 Bad Request</title>
</head>
<body>
<h1>Bad Request</h1>
<p>Your request honestly kinda sucked.</p>
</body>
</html>
";

pub const INTERNAL_ERROR_PAGE: &str = "<html>
<head>
<title>500 Internal Server Error</title>
</head>
<body>
<h1>Internal Server Error</h1>
<p>Okay, you know what? This one is on me.</p>
</body>
</html>
";

pub struct Routes {
    upstream: Upstream,
}

impl Routes {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    async fn proxy<W>(&self, w: &mut ResponseWriter<W>, rest: &str) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut upstream = match self.upstream.get(rest).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Upstream request failed");
                return write_html(w, StatusCode::InternalServerError, INTERNAL_ERROR_PAGE).await;
            }
        };

        w.write_status_line(StatusCode::Ok).await?;
        let mut headers = default_headers(0);
        headers.remove("Content-Length");
        headers.set("Transfer-Encoding", "chunked");
        headers.set("Trailer", "X-Content-SHA256, X-Content-Length");
        w.write_headers(&headers).await?;

        let mut hasher = Sha256::new();
        let mut total = 0;
        // An upstream failure here leaves the chunked body unterminated.
        while let Some(chunk) = upstream.next_chunk().await? {
            if chunk.is_empty() {
                continue;
            }
            debug!(bytes = chunk.len(), "Forwarding chunk");
            w.write_chunk(&chunk).await?;
            hasher.update(&chunk);
            total += chunk.len();
        }
        w.write_last_chunk().await?;

        let mut trailers = HeaderStore::new();
        trailers.set("X-Content-SHA256", &format!("{:x}", hasher.finalize()));
        trailers.set("X-Content-Length", &total.to_string());
        w.write_trailers(&trailers).await?;
        Ok(())
    }
}

impl Handler for Routes {
    async fn handle<W>(&self, w: &mut ResponseWriter<W>, req: &Request) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let target = req.target();
        if let Some(rest) = target.strip_prefix(PROXY_PREFIX)
            && (rest.is_empty() || rest.starts_with(['/', '?']))
        {
            return self.proxy(w, rest).await;
        }

        match target {
            "/yourproblem" => write_html(w, StatusCode::BadRequest, BAD_REQUEST_PAGE).await,
            "/myproblem" => write_html(w, StatusCode::InternalServerError, INTERNAL_ERROR_PAGE).await,
            _ => write_html(w, StatusCode::Ok, OK_PAGE).await,
        }
    }
}

async fn write_html<W>(w: &mut ResponseWriter<W>, status: StatusCode, page: &str) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let body = page.as_bytes();
    let mut headers = default_headers(body.len());
    headers.set("Content-Type", "text/html");

    w.write_status_line(status).await?;
    w.write_headers(&headers).await?;
    w.write_body(body).await?;
    Ok(())
}
