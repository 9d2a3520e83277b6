use std::io;

use failure_derive::Fail;

#[derive(Debug, Fail)]
pub enum CrawlerError {
    #[fail(display = "'{}' is not a valid http:// URL", _0)]
    InvalidUrl(String),
    #[fail(display = "host '{}' contains characters outside [a-zA-Z0-9./-]", _0)]
    InvalidHost(String),
    #[fail(display = "could not connect to {}:{}: {}", host, port, why)]
    Connect { host: String, port: u16, why: io::Error },
    #[fail(display = "i/o error talking to {}: {}", host, why)]
    Transfer { host: String, why: io::Error },
    #[fail(display = "response did not start with 'HTTP/1.1 200 OK'")]
    BadStatusLine,
    #[fail(display = "response had no (or an unparsable) Content-Length header")]
    MissingContentLength,
    #[fail(display = "i/o error: {}", _0)]
    Io(#[cause] io::Error),
    #[fail(display = "failed to spawn job executor: {}", _0)]
    Bridge(#[cause] io::Error),
}

impl From<io::Error> for CrawlerError {
    fn from(why: io::Error) -> Self {
        CrawlerError::Io(why)
    }
}
