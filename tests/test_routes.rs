mod common;

use std::time::Duration;

use httpfromtcp::http::request::{Method, Request, RequestLine};
use httpfromtcp::http::writer::ResponseWriter;
use httpfromtcp::proxy::Upstream;
use httpfromtcp::routes::{Routes, BAD_REQUEST_PAGE, INTERNAL_ERROR_PAGE, OK_PAGE};
use httpfromtcp::server::{Handler, Server};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use common::{decode_chunked, split_head};

fn get(target: &str) -> Request {
    Request {
        request_line: RequestLine {
            method: Method::GET,
            request_target: target.to_string(),
            http_version: "1.1".to_string(),
        },
        ..Request::default()
    }
}

/// Routes whose upstream refuses connections.
async fn routes_without_upstream() -> Routes {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Routes::new(Upstream::new(&format!("http://{addr}"), Duration::from_secs(1)).unwrap())
}

/// Serves one canned response and returns the request it received.
async fn fake_upstream(response: &'static [u8]) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 512];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = sock.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        sock.write_all(response).await.unwrap();
        sock.shutdown().await.unwrap();
        String::from_utf8(request).unwrap()
    });

    (url, handle)
}

async fn respond(routes: &Routes, target: &str) -> Vec<u8> {
    let mut w = ResponseWriter::new(Vec::new());
    routes.handle(&mut w, &get(target)).await.unwrap();
    w.into_inner()
}

#[tokio::test]
async fn test_your_problem_is_a_400_page() {
    let server = Server::start(0, routes_without_upstream().await).await.unwrap();

    let mut stream = TcpStream::connect(("127.0.0.1", server.local_addr().port()))
        .await
        .unwrap();
    stream
        .write_all(b"GET /yourproblem HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();
    let mut out = String::new();
    stream.read_to_string(&mut out).await.unwrap();

    let expected = format!(
        "HTTP/1.1 400 Bad Request\r\nContent-Length: {}\r\nConnection: close\r\nContent-Type: text/html\r\n\r\n{}",
        BAD_REQUEST_PAGE.len(),
        BAD_REQUEST_PAGE
    );
    assert_eq!(out, expected);

    server.close();
    server.join().await.unwrap();
}

#[tokio::test]
async fn test_my_problem_is_a_500_page() {
    let out = respond(&routes_without_upstream().await, "/myproblem").await;
    let (head, body) = split_head(&out);
    let head = String::from_utf8_lossy(head);

    assert!(head.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(head.contains("Content-Type: text/html\r\n"));
    assert_eq!(body, INTERNAL_ERROR_PAGE.as_bytes());
}

#[tokio::test]
async fn test_everything_else_is_a_200_page() {
    let routes = routes_without_upstream().await;

    for target in ["/", "/anything", "/yourproblem/not-quite", "/httpbinfoo"] {
        let out = respond(&routes, target).await;
        let (head, body) = split_head(&out);

        assert!(head.starts_with(b"HTTP/1.1 200 OK\r\n"));
        assert_eq!(body, OK_PAGE.as_bytes());
    }
}

#[tokio::test]
async fn test_httpbin_proxy_streams_chunked_with_trailers() {
    let (url, upstream) = fake_upstream(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n\
          6\r\n{\"n\": \r\n3\r\n42}\r\n0\r\n\r\n",
    )
    .await;
    let routes = Routes::new(Upstream::new(&url, Duration::from_secs(1)).unwrap());

    let out = respond(&routes, "/httpbin/stream/2").await;
    let forwarded = upstream.await.unwrap();
    assert!(forwarded.starts_with("GET /stream/2 HTTP/1.1\r\n"));

    let (head, body) = split_head(&out);
    let head = String::from_utf8_lossy(head);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Transfer-Encoding: chunked\r\n"));
    assert!(head.contains("Trailer: X-Content-SHA256, X-Content-Length\r\n"));
    assert!(!head.contains("Content-Length:"));

    let (chunks, trailers) = decode_chunked(body);
    let payload = chunks.concat();
    assert_eq!(payload, b"{\"n\": 42}");
    assert_eq!(trailers.get("x-content-length"), Some("9"));

    let digest = format!("{:x}", Sha256::digest(&payload));
    assert_eq!(trailers.get("X-Content-SHA256"), Some(digest.as_str()));
}

#[tokio::test]
async fn test_httpbin_proxy_with_content_length_upstream() {
    let (url, upstream) =
        fake_upstream(b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\nhello world").await;
    let routes = Routes::new(Upstream::new(&url, Duration::from_secs(1)).unwrap());

    let out = respond(&routes, "/httpbin").await;
    assert!(upstream.await.unwrap().starts_with("GET / HTTP/1.1\r\n"));

    let (_, body) = split_head(&out);
    let (chunks, trailers) = decode_chunked(body);
    assert_eq!(chunks.concat(), b"hello world");
    assert_eq!(trailers.get("x-content-length"), Some("11"));
}

#[tokio::test]
async fn test_httpbin_proxy_unreachable_upstream_is_500() {
    let out = respond(&routes_without_upstream().await, "/httpbin/get").await;
    let (head, body) = split_head(&out);

    assert!(head.starts_with(b"HTTP/1.1 500 Internal Server Error\r\n"));
    assert_eq!(body, INTERNAL_ERROR_PAGE.as_bytes());
}

#[tokio::test]
async fn test_httpbin_query_only_is_proxied() {
    let (url, upstream) = fake_upstream(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok").await;
    let routes = Routes::new(Upstream::new(&url, Duration::from_secs(1)).unwrap());

    let out = respond(&routes, "/httpbin?x=1").await;
    assert!(upstream.await.unwrap().starts_with("GET /?x=1 HTTP/1.1\r\n"));

    let (_, body) = split_head(&out);
    let (chunks, _) = decode_chunked(body);
    assert_eq!(chunks.concat(), b"ok");
}
