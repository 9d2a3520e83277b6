use std::io;
use std::path::PathBuf;

use failure_derive::Fail;

#[derive(Debug, Fail)]
pub enum IndexerError {
    #[fail(display = "i/o error: {}", _0)]
    Io(#[cause] io::Error),
    #[fail(display = "framing error: {}", _0)]
    Framing(#[cause] framing::FramingError),
    #[fail(display = "failed to create FIFO at {}: {}", path, why)]
    Mkfifo { path: PathBuf, why: nix::Error },
    #[fail(display = "fork() failed: {}", _0)]
    Fork(nix::Error),
    #[fail(display = "docfile '{}' has no directories", path)]
    EmptyDocfile { path: String },
    #[fail(display = "invalid arguments: {}", _0)]
    InvalidArgs(String),
}

impl From<io::Error> for IndexerError {
    fn from(why: io::Error) -> Self {
        IndexerError::Io(why)
    }
}

impl From<framing::FramingError> for IndexerError {
    fn from(why: framing::FramingError) -> Self {
        IndexerError::Framing(why)
    }
}
