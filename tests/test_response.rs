use httpfromtcp::http::response::{default_headers, HandlerError, StatusCode};
use httpfromtcp::http::writer::ResponseWriter;

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
    assert_eq!(StatusCode::Other(418).as_u16(), 418);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::BadRequest.reason_phrase(), "Bad Request");
    assert_eq!(
        StatusCode::InternalServerError.reason_phrase(),
        "Internal Server Error"
    );
    assert_eq!(StatusCode::Other(404).reason_phrase(), "");
}

#[test]
fn test_status_code_from_u16() {
    assert_eq!(StatusCode::from(200), StatusCode::Ok);
    assert_eq!(StatusCode::from(400), StatusCode::BadRequest);
    assert_eq!(StatusCode::from(500), StatusCode::InternalServerError);
    assert_eq!(StatusCode::from(301), StatusCode::Other(301));
}

#[test]
fn test_default_headers() {
    let headers = default_headers(42);

    let entries: Vec<_> = headers.iter().collect();
    assert_eq!(
        entries,
        vec![
            ("content-length", "42"),
            ("connection", "close"),
            ("content-type", "text/plain"),
        ]
    );
}

#[test]
fn test_default_headers_are_overridable() {
    let mut headers = default_headers(10);
    headers.set("Content-Type", "text/html");
    headers.remove("Content-Length");
    headers.set("Trailer", "X-Content-SHA256, X-Content-Length");

    assert_eq!(headers.len(), 3);
    assert_eq!(headers.get("content-type"), Some("text/html"));
    assert_eq!(headers.get("content-length"), None);
    assert_eq!(
        headers.get("trailer"),
        Some("X-Content-SHA256, X-Content-Length")
    );
}

#[tokio::test]
async fn test_handler_error_writes_full_response() {
    let err = HandlerError::bad_request("malformed request line: \"GET\"");
    let mut w = ResponseWriter::new(Vec::new());
    err.write(&mut w).await.unwrap();

    assert_eq!(
        String::from_utf8(w.into_inner()).unwrap(),
        "HTTP/1.1 400 Bad Request\r\n\
         Content-Length: 29\r\n\
         Connection: close\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         malformed request line: \"GET\""
    );
}

#[tokio::test]
async fn test_handler_error_after_status_line_fails() {
    let err = HandlerError::new(StatusCode::InternalServerError, "boom");
    let mut w = ResponseWriter::new(Vec::new());
    w.write_status_line(StatusCode::Ok).await.unwrap();

    assert!(err.write(&mut w).await.is_err());
    assert_eq!(w.into_inner(), b"HTTP/1.1 200 OK\r\n");
}
