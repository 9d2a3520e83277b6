pub mod bridge;
pub mod config;
pub mod control;
pub mod docfile;
pub mod error;
pub mod http;
pub mod parse;
pub mod stats;
pub mod worker;

pub use error::CrawlerError;
