//! Prints every line received on TCP port 42069, one task per connection.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};

const LISTEN_ADDR: &str = "127.0.0.1:42069";

/// Bytes requested per read.
const READ_SIZE: usize = 8;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let listener = TcpListener::bind(LISTEN_ADDR).await?;
    info!("Listening on {}", LISTEN_ADDR);

    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Connection accepted from {}", peer);

        tokio::spawn(async move {
            let mut lines = lines_channel(socket);
            while let Some(line) = lines.recv().await {
                println!("{line}");
            }
            info!("Connection to {} closed", peer);
        });
    }
}

/// Splits the stream into lines on `\n`, sent over a channel as they
/// complete. A trailing partial line is sent when the stream ends.
fn lines_channel<R>(mut reader: R) -> mpsc::Receiver<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut current = Vec::new();
        let mut buf = [0u8; READ_SIZE];
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    error!("error: {}", e);
                    break;
                }
            };

            for &b in &buf[..n] {
                if b == b'\n' {
                    let line = String::from_utf8_lossy(&current).into_owned();
                    current.clear();
                    if tx.send(line).await.is_err() {
                        return;
                    }
                } else {
                    current.push(b);
                }
            }
        }
        if !current.is_empty() {
            let _ = tx.send(String::from_utf8_lossy(&current).into_owned()).await;
        }
    });
    rx
}
