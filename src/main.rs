use httpfromtcp::config::Config;
use httpfromtcp::proxy::Upstream;
use httpfromtcp::routes::Routes;
use httpfromtcp::server::Server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();

    let routes = Routes::new(Upstream::from_config(&cfg.upstream)?);
    let server = Server::serve(&cfg.server, routes).await?;
    tracing::info!(port = server.local_addr().port(), "Server started");

    shutdown_signal().await?;
    tracing::info!("Shutdown signal received");

    server.close();
    server.join().await?;
    tracing::info!("Server gracefully stopped");

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = term.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
