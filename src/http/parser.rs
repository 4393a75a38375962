use crate::http::request::{Method, Request};
use std::collections::HashMap;

/// Largest request head (request line plus headers) accepted.
pub const MAX_HEAD_LEN: usize = 16 * 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed request line")]
    InvalidRequest,
    #[error("invalid method token")]
    InvalidMethod,
    #[error("malformed header line")]
    InvalidHeader,
    #[error("invalid Content-Length")]
    InvalidContentLength,
    #[error("invalid chunked body framing")]
    InvalidChunk,
    #[error("request head exceeds {MAX_HEAD_LEN} bytes")]
    HeadTooLarge,
    #[error("incomplete request")]
    Incomplete,
}

/// Parses a request head from the start of `buf`.
///
/// On success returns the request and the number of bytes consumed (the head
/// and its terminating blank line). Body bytes, if any, are left in the
/// buffer for [`crate::http::body::BodyReader`].
pub fn parse_request_head(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    // Look for header/body separator
    let headers_end = match find_headers_end(buf) {
        Some(end) => end,
        None if buf.len() > MAX_HEAD_LEN => return Err(ParseError::HeadTooLarge),
        None => return Err(ParseError::Incomplete),
    };
    if headers_end > MAX_HEAD_LEN {
        return Err(ParseError::HeadTooLarge);
    }
    let header_bytes = &buf[..headers_end];

    let headers_str = std::str::from_utf8(header_bytes)
        .map_err(|_| ParseError::InvalidRequest)?;

    let mut lines = headers_str.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let target = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;
    if parts.next().is_some() || !version.starts_with("HTTP/") {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_token(method_str).ok_or(ParseError::InvalidMethod)?;

    // Headers
    let mut headers = HashMap::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or(ParseError::InvalidHeader)?;

        headers.insert(
           key.trim().to_string(),
           value.trim().to_string(),
        );
    }

    let request = Request {
        method,
        path: decode_path(target),
        version: version.to_string(),
        headers,
    };

    // Reject a Content-Length we could never honour before any body is read
    if let Some(cl) = request.header("Content-Length") {
        cl.trim()
            .parse::<u64>()
            .map_err(|_| ParseError::InvalidContentLength)?;
    }

    Ok((request, headers_end + 4))
}

/// Strips the query and fragment from a request target and percent-decodes
/// what remains. Invalid UTF-8 after decoding is replaced, never rejected.
fn decode_path(target: &str) -> String {
    let raw = target
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let decoded = urlencoding::decode_binary(raw.as_bytes());
    String::from_utf8_lossy(&decoded).into_owned()
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let (parsed, consumed) = parse_request_head(req).unwrap();

        assert_eq!(parsed.path, "/");
        assert_eq!(parsed.headers.get("Host").unwrap(), "example.com");
        assert_eq!(consumed, req.len());
    }

    #[test]
    fn decode_path_unescapes_traversal_tokens() {
        assert_eq!(decode_path("/%2e%2e/etc/passwd"), "/../etc/passwd");
        assert_eq!(decode_path("/a%20b?x=%2e"), "/a b");
    }
}
