//! Length-implicit record framing used by the indexer coordinator and its
//! worker processes to talk over a pair of named pipes.
//!
//! A *transmission* is one or more writes terminated by a single `ETX`
//! (`0x03`) byte. Everything written before the terminating `ETX` is one
//! logical message, with individual records separated by `NUL` (`0x00`).
//! Callers may split a transmission across several `send` calls (e.g. to
//! send a command word, then its arguments) as long as only the last call
//! sets `eot`.

use std::io::{self, Read, Write};

use failure_derive::Fail;

const ETX: u8 = 0x03;
const SEP: u8 = 0x00;
const INITIAL_BUF: usize = 256;
const READ_CHUNK: usize = 256;

#[derive(Debug, Fail)]
pub enum FramingError {
    #[fail(display = "i/o error while framing: {}", _0)]
    Io(#[cause] io::Error),
    #[fail(display = "peer closed the stream mid-transmission")]
    UnexpectedEof,
    #[fail(display = "transmission was not valid UTF-8: {}", _0)]
    Utf8(#[cause] std::str::Utf8Error),
}

impl From<io::Error> for FramingError {
    fn from(why: io::Error) -> Self {
        FramingError::Io(why)
    }
}

/// Result of a single `recv` call.
#[derive(Debug, PartialEq, Eq)]
pub enum RecvOutcome {
    /// A complete transmission, split on `NUL` into its component records.
    Records(Vec<String>),
    /// The peer closed its end before sending anything at all.
    PeerClosed,
}

/// Reads framed transmissions off of any [`Read`] (a FIFO read end, in
/// practice).
pub struct FramedReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: Read> FramedReader<R> {
    pub fn new(inner: R) -> Self {
        FramedReader { inner, buf: Vec::with_capacity(INITIAL_BUF) }
    }

    /// Gives multiplexing callers (`select()`-based aggregation loops)
    /// access to the underlying stream without exposing the read buffer.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Blocks until a full transmission (terminated by `ETX`) has been
    /// read, or the peer closes the stream.
    pub fn recv(&mut self) -> Result<RecvOutcome, FramingError> {
        self.buf.clear();
        let mut scanned = 0;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let n = self.inner.read(&mut chunk)?;
            if n == 0 {
                return if self.buf.is_empty() {
                    Ok(RecvOutcome::PeerClosed)
                } else {
                    Err(FramingError::UnexpectedEof)
                };
            }

            self.buf.extend_from_slice(&chunk[..n]);

            if let Some(pos) = self.buf[scanned..].iter().position(|&b| b == ETX) {
                let end = scanned + pos;
                self.buf.truncate(end);
                return split_records(&self.buf).map(RecvOutcome::Records);
            }
            scanned = self.buf.len();
        }
    }
}

fn split_records(buf: &[u8]) -> Result<Vec<String>, FramingError> {
    if buf.is_empty() {
        return Ok(Vec::new());
    }

    let text = std::str::from_utf8(buf).map_err(FramingError::Utf8)?;
    Ok(text.split(SEP as char).map(str::to_owned).collect())
}

/// Writes framed transmissions to any [`Write`] (a FIFO write end, in
/// practice).
pub struct FramedWriter<W> {
    inner: W,
}

impl<W: Write> FramedWriter<W> {
    pub fn new(inner: W) -> Self {
        FramedWriter { inner }
    }

    /// Writes a raw payload, optionally terminating the transmission with
    /// `ETX`. Loops until every byte (and the terminator, if any) has been
    /// accepted by the underlying stream.
    pub fn send_raw(&mut self, payload: &[u8], eot: bool) -> Result<(), FramingError> {
        let mut written = 0;
        while written < payload.len() {
            written += self.inner.write(&payload[written..])?;
        }
        if eot {
            let term = [ETX];
            self.inner.write_all(&term)?;
        }
        self.inner.flush()?;
        Ok(())
    }

    /// Convenience wrapper that `NUL`-joins `records` before sending.
    pub fn send_records(&mut self, records: &[&str], eot: bool) -> Result<(), FramingError> {
        let joined = records.join("\0");
        self.send_raw(joined.as_bytes(), eot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_multiple_records() {
        let mut buf = Vec::new();
        {
            let mut w = FramedWriter::new(&mut buf);
            w.send_records(&["one", "two", "three"], true).unwrap();
        }
        let mut r = FramedReader::new(Cursor::new(buf));
        assert_eq!(
            r.recv().unwrap(),
            RecvOutcome::Records(vec!["one".into(), "two".into(), "three".into()])
        );
    }

    #[test]
    fn split_transmission_across_writes() {
        let mut buf = Vec::new();
        {
            let mut w = FramedWriter::new(&mut buf);
            w.send_raw(b"CMD:SEARCH", false).unwrap();
            w.send_records(&["rust", "trie"], true).unwrap();
        }
        let mut r = FramedReader::new(Cursor::new(buf));
        assert_eq!(
            r.recv().unwrap(),
            RecvOutcome::Records(vec!["CMD:SEARCHrust".into(), "trie".into()])
        );
    }

    #[test]
    fn empty_transmission_is_empty_records() {
        let mut buf = Vec::new();
        FramedWriter::new(&mut buf).send_raw(b"", true).unwrap();
        let mut r = FramedReader::new(Cursor::new(buf));
        assert_eq!(r.recv().unwrap(), RecvOutcome::Records(Vec::new()));
    }

    #[test]
    fn peer_closed_before_any_data() {
        let mut r = FramedReader::new(Cursor::new(Vec::new()));
        assert_eq!(r.recv().unwrap(), RecvOutcome::PeerClosed);
    }

    #[test]
    fn eof_mid_transmission_is_an_error() {
        let mut r = FramedReader::new(Cursor::new(b"no terminator".to_vec()));
        assert!(r.recv().is_err());
    }
}
