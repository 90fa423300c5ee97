use std::future::Future;

use tokio::io::AsyncWrite;

use crate::http::request::Request;
use crate::http::writer::ResponseWriter;

/// Application logic invoked once per parsed request.
///
/// The handler must drive the writer through a complete response (status
/// line, headers, body). The server sends nothing on its behalf, and closes
/// the connection as soon as `handle` returns, whatever the outcome.
pub trait Handler: Send + Sync + 'static {
    fn handle<W>(
        &self,
        w: &mut ResponseWriter<W>,
        req: &Request,
    ) -> impl Future<Output = anyhow::Result<()>> + Send
    where
        W: AsyncWrite + Unpin + Send;
}
