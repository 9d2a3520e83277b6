pub mod audit;
pub mod coordinator;
pub mod docfile;
pub mod error;
pub mod signals;
pub mod textfile;
pub mod worker;

pub use error::IndexerError;
