use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::net::TcpListener;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::http::connection::Connection;
use crate::server::handler::Handler;

/// Handle to a running server.
///
/// The accept loop runs in its own task. Each accepted connection gets a
/// task of its own. Dropping the handle without calling [`close`](Self::close)
/// also stops the accept loop.
pub struct Server {
    local_addr: SocketAddr,
    closed: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
    accept_loop: JoinHandle<()>,
}

impl Server {
    /// Binds every interface on `port` and starts accepting, without a
    /// connection cap. Returns as soon as the socket is bound.
    pub async fn start<H: Handler>(port: u16, handler: H) -> anyhow::Result<Self> {
        let config = ServerConfig {
            port,
            ..ServerConfig::default()
        };
        Self::serve(&config, handler).await
    }

    /// Like [`start`](Self::start), with the bind host and connection cap
    /// taken from `config`.
    pub async fn serve<H: Handler>(config: &ServerConfig, handler: H) -> anyhow::Result<Self> {
        if config.max_connections == Some(0) {
            bail!("max_connections must be at least 1");
        }

        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let local_addr = listener.local_addr()?;

        info!(
            address = %local_addr,
            max_connections = ?config.max_connections,
            "Listening"
        );

        let closed = Arc::new(AtomicBool::new(false));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let limit = config.max_connections.map(|n| Arc::new(Semaphore::new(n)));

        let accept_loop = tokio::spawn(accept_loop(
            listener,
            Arc::new(handler),
            Arc::clone(&closed),
            shutdown_rx,
            limit,
        ));

        Ok(Self {
            local_addr,
            closed,
            shutdown,
            accept_loop,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stops accepting new connections. Calling it again does nothing.
    ///
    /// Connections already being served run to completion.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(address = %self.local_addr, "Closing server");
        // The receiver only goes away once the accept loop has exited.
        let _ = self.shutdown.send(true);
    }

    /// Waits for the accept loop to exit and the listening socket to be
    /// released. Only returns after [`close`](Self::close).
    pub async fn join(self) -> anyhow::Result<()> {
        let Self {
            accept_loop,
            shutdown: _shutdown,
            ..
        } = self;
        accept_loop.await.context("accept loop panicked")
    }
}

async fn accept_loop<H: Handler>(
    listener: TcpListener,
    handler: Arc<H>,
    closed: Arc<AtomicBool>,
    mut shutdown: watch::Receiver<bool>,
    limit: Option<Arc<Semaphore>>,
) {
    loop {
        let permit: Option<OwnedSemaphorePermit> = match &limit {
            Some(limit) => tokio::select! {
                permit = Arc::clone(limit).acquire_owned() => match permit {
                    Ok(permit) => Some(permit),
                    Err(_) => break,
                },
                _ = shutdown.changed() => break,
            },
            None => None,
        };

        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = shutdown.changed() => break,
        };

        match accepted {
            Ok((stream, peer)) => {
                if closed.load(Ordering::SeqCst) {
                    break;
                }
                debug!(peer = %peer, "Accepted connection");

                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(e) = Connection::new(stream, peer).run(handler.as_ref()).await {
                        error!(peer = %peer, error = %format!("{e:#}"), "Connection error");
                    }
                });
            }
            Err(e) => {
                if closed.load(Ordering::SeqCst) {
                    break;
                }
                warn!(error = %e, "Error accepting connection");
            }
        }
    }

    debug!("Accept loop stopped");
}
