//! A deliberately minimal HTTP/1.1 GET client over a raw `TcpStream`.
//!
//! Spec scope excludes persistent connections, compression and anything
//! beyond plain HTML, so this hand-parses just enough of the response to
//! find the status line, the `Content-Length` header and the body.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::CrawlerError;
use crate::parse::PageUrl;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_CHUNK: usize = 4096;

/// Fetches `url`, returning the response body as bytes.
pub fn get(url: &PageUrl) -> Result<Vec<u8>, CrawlerError> {
    let addr = (url.host.as_str(), url.port);
    let mut stream = TcpStream::connect(addr).map_err(|why| CrawlerError::Connect {
        host: url.host.clone(),
        port: url.port,
        why,
    })?;
    stream.set_read_timeout(Some(CONNECT_TIMEOUT)).ok();
    stream.set_write_timeout(Some(CONNECT_TIMEOUT)).ok();

    let request = format!("GET {} HTTP/1.1\r\nHost: {}\r\n\r\n", url.path, url.host);
    stream
        .write_all(request.as_bytes())
        .map_err(|why| CrawlerError::Transfer { host: url.host.clone(), why })?;

    read_response(&mut stream, &url.host)
}

fn read_response(stream: &mut TcpStream, host: &str) -> Result<Vec<u8>, CrawlerError> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    let header_end = loop {
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        let n = stream
            .read(&mut chunk)
            .map_err(|why| CrawlerError::Transfer { host: host.to_owned(), why })?;
        if n == 0 {
            return Err(CrawlerError::BadStatusLine);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let header_text =
        std::str::from_utf8(&buf[..header_end]).map_err(|_| CrawlerError::BadStatusLine)?;
    if !header_text.starts_with("HTTP/1.1 200 OK") {
        return Err(CrawlerError::BadStatusLine);
    }

    let content_length = header_text
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .ok_or(CrawlerError::MissingContentLength)?;

    let body_start = header_end + 4;
    while buf.len() - body_start < content_length {
        let n = stream
            .read(&mut chunk)
            .map_err(|why| CrawlerError::Transfer { host: host.to_owned(), why })?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    buf.truncate(body_start + content_length.min(buf.len().saturating_sub(body_start)));
    Ok(buf.split_off(body_start))
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn fetches_body_of_a_well_formed_response() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut discard = [0u8; 1024];
            let _ = std::io::Read::read(&mut sock, &mut discard);
            sock.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello").unwrap();
        });

        let url = PageUrl { host: addr.ip().to_string(), port: addr.port(), path: "/".into() };
        let body = get(&url).unwrap();
        assert_eq!(body, b"hello");
        server.join().unwrap();
    }

    #[test]
    fn rejects_non_200_status() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut discard = [0u8; 1024];
            let _ = std::io::Read::read(&mut sock, &mut discard);
            sock.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n").unwrap();
        });

        let url = PageUrl { host: addr.ip().to_string(), port: addr.port(), path: "/".into() };
        assert!(get(&url).is_err());
        server.join().unwrap();
    }
}
