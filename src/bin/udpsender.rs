//! Reads lines from stdin and sends each one as a UDP datagram.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;

const TARGET_ADDR: &str = "127.0.0.1:42069";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket
        .connect(TARGET_ADDR)
        .await
        .with_context(|| format!("failed to resolve {TARGET_ADDR}"))?;
    tracing::info!("Sending to {}", TARGET_ADDR);

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut line = String::new();
    loop {
        println!(">");
        line.clear();
        if stdin.read_line(&mut line).await? == 0 {
            break;
        }
        socket.send(line.as_bytes()).await.context("failed to send line")?;
    }

    Ok(())
}
