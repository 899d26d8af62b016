// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal HTTP/1.1 framing. We parse the request line and Content-Length,
// nothing more, and always answer with `Connection: close`.

use serde::Serialize;
use thiserror::Error;

/// Framing failures, each mapped to the status sent back (if any).
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("request exceeds {0} bytes")]
    TooLarge(usize),

    #[error("connection closed before the request was complete")]
    Incomplete,

    #[error("timed out reading request")]
    Timeout,

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

impl HttpError {
    /// Status to answer with, or `None` when the socket is unusable.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Malformed(_) | Self::Incomplete => Some(400),
            Self::Timeout => Some(408),
            Self::TooLarge(_) => Some(413),
            Self::Io(_) => None,
        }
    }
}

/// Request line and framing information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    /// Path without any query string.
    pub path: String,
    pub content_length: usize,
    /// Offset where the body begins.
    pub body_offset: usize,
}

/// A fully read request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: &str, path: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            body: body.into(),
        }
    }
}

/// Parse the request head once the blank line ending the headers has
/// arrived. `Ok(None)` means more bytes are needed.
pub fn parse_head(data: &[u8]) -> Result<Option<RequestHead>, HttpError> {
    let Some(header_end) = find_subsequence(data, b"\r\n\r\n") else {
        return Ok(None);
    };
    let head = std::str::from_utf8(&data[..header_end])
        .map_err(|_| HttpError::Malformed("request head is not UTF-8".into()))?;

    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(HttpError::Malformed(format!("bad request line {request_line:?}")));
    };
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::Malformed(format!("unsupported version {version}")));
    }

    let mut content_length = 0;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            content_length = value
                .trim()
                .parse()
                .map_err(|_| HttpError::Malformed(format!("bad Content-Length {value:?}")))?;
        }
    }

    let path = target.split('?').next().unwrap_or(target);
    Ok(Some(RequestHead {
        method: method.to_ascii_uppercase(),
        path: path.to_string(),
        content_length,
        body_offset: header_end + 4,
    }))
}

/// Find the first occurrence of `needle` in `haystack`.
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// An outgoing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    /// JSON response. Serialisation failures become a 500 with a JSON error.
    pub fn json(status: u16, value: &impl Serialize) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: "application/json",
                body,
            },
            Err(err) => Self::error(500, &err.to_string()),
        }
    }

    /// `{ "error": message }` with the given status.
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: serde_json::json!({ "error": message }).to_string().into_bytes(),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into().into_bytes(),
        }
    }

    /// Serialise status line, headers, and body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            self.body.len()
        );
        let mut out = Vec::with_capacity(head.len() + self.body.len());
        out.extend_from_slice(head.as_bytes());
        out.extend_from_slice(&self.body);
        out
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_needs_blank_line() {
        assert_eq!(parse_head(b"POST /api HTTP/1.1\r\nHost: x\r\n").unwrap(), None);
    }

    #[test]
    fn parses_request_line_and_length() {
        let data = b"post /api/verify/file?x=1 HTTP/1.1\r\nHost: localhost\r\ncontent-LENGTH: 17\r\n\r\n{\"file_path\":\"a\"}";
        let head = parse_head(data).unwrap().unwrap();
        assert_eq!(head.method, "POST");
        assert_eq!(head.path, "/api/verify/file");
        assert_eq!(head.content_length, 17);
        assert_eq!(&data[head.body_offset..], b"{\"file_path\":\"a\"}");
    }

    #[test]
    fn missing_length_means_empty_body() {
        let head = parse_head(b"GET / HTTP/1.1\r\n\r\n").unwrap().unwrap();
        assert_eq!(head.content_length, 0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_head(b"hello\r\n\r\n"),
            Err(HttpError::Malformed(_))
        ));
        assert!(matches!(
            parse_head(b"GET / HTTP/1.1\r\nContent-Length: lots\r\n\r\n"),
            Err(HttpError::Malformed(_))
        ));
    }

    #[test]
    fn response_has_length_and_close() {
        let bytes = Response::error(404, "nope").to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        let body = text.split("\r\n\r\n").nth(1).unwrap();
        assert!(text.contains(&format!("Content-Length: {}\r\n", body.len())));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(body).unwrap()["error"],
            "nope"
        );
    }

    #[test]
    fn error_statuses() {
        assert_eq!(HttpError::TooLarge(10).status(), Some(413));
        assert_eq!(HttpError::Incomplete.status(), Some(400));
        assert_eq!(
            HttpError::Io(std::io::Error::other("reset")).status(),
            None
        );
    }
}
