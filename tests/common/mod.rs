#![allow(dead_code)]

use httpfromtcp::http::headers::HeaderStore;

/// Splits a response into its head (through the blank line) and body.
pub fn split_head(raw: &[u8]) -> (&[u8], &[u8]) {
    let idx = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no end of headers");
    (&raw[..idx + 4], &raw[idx + 4..])
}

/// Decodes a chunked body into its chunk payloads and trailer fields.
pub fn decode_chunked(mut body: &[u8]) -> (Vec<Vec<u8>>, HeaderStore) {
    let mut chunks = Vec::new();
    loop {
        let idx = body
            .windows(2)
            .position(|w| w == b"\r\n")
            .expect("missing chunk size line");
        let size = usize::from_str_radix(std::str::from_utf8(&body[..idx]).unwrap(), 16).unwrap();
        body = &body[idx + 2..];
        if size == 0 {
            break;
        }
        chunks.push(body[..size].to_vec());
        assert_eq!(&body[size..size + 2], b"\r\n");
        body = &body[size + 2..];
    }

    let mut trailers = HeaderStore::new();
    loop {
        let (n, done) = trailers.parse_one(body).unwrap();
        assert!(n > 0, "unterminated trailer section");
        body = &body[n..];
        if done {
            break;
        }
    }
    assert!(body.is_empty(), "bytes after chunked body");
    (chunks, trailers)
}
