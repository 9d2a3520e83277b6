//! Optional `webcrawl.toml` defaults, layered under whatever flags are
//! given on the command line. Absence of the file is not an error — the
//! crawler is fully usable from flags alone.

use std::fs;
use std::io;
use std::path::Path;

use failure_derive::Fail;
use serde_derive::Deserialize;

#[derive(Debug, Fail)]
pub enum ConfigError {
    #[fail(display = "error reading '{}': {}", file, why)]
    File { file: String, why: io::Error },
    #[fail(display = "failed to parse TOML syntax in {}: {}", file, why)]
    Toml { file: String, why: toml::de::Error },
}

#[derive(Debug, Default, Deserialize)]
pub struct CrawlerConfig {
    pub host: Option<String>,
    pub serve_port: Option<u16>,
    pub command_port: Option<u16>,
    pub threads: Option<usize>,
    pub save_dir: Option<String>,
    pub index_workers: Option<usize>,
}

impl CrawlerConfig {
    /// Loads `path` if it exists; returns the all-`None` default
    /// otherwise.
    pub fn load(path: &Path) -> Result<CrawlerConfig, ConfigError> {
        if !path.exists() {
            return Ok(CrawlerConfig::default());
        }

        let file = path.display().to_string();
        let data = fs::read(path).map_err(|why| ConfigError::File { file: file.clone(), why })?;
        toml::from_slice(&data).map_err(|why| ConfigError::Toml { file, why })
    }
}
