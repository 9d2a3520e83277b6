//! The crawler's TCP control plane: `STATS`, `SEARCH` and `SHUTDOWN`.
//!
//! `SEARCH` only works once crawling has finished; until then it bounces
//! the client with "CRAWLING IN PROGRESS". The first successful `SEARCH`
//! lazily forks the indexer (`jobExecutor`) over the freshly written
//! docfile; later `SEARCH`/`STATS` calls reuse that same process.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::bridge::Bridge;
use crate::worker::CrawlContext;

const MAX_KEYWORDS: usize = 10;
const SEARCH_DEADLINE_SECS: u32 = 5;

pub struct ControlPlane {
    ctx: Arc<CrawlContext>,
    docfile_path: PathBuf,
    num_index_workers: usize,
    bridge: Mutex<Option<Arc<Bridge>>>,
}

impl ControlPlane {
    pub fn new(ctx: Arc<CrawlContext>, docfile_path: PathBuf, num_index_workers: usize) -> Self {
        ControlPlane { ctx, docfile_path, num_index_workers, bridge: Mutex::new(None) }
    }

    /// Accepts connections until a `SHUTDOWN` command is received.
    pub fn run(&self, listener: TcpListener) -> std::io::Result<()> {
        for incoming in listener.incoming() {
            let mut stream = match incoming {
                Ok(stream) => stream,
                Err(why) => {
                    warn!("control plane accept failed: {}", why);
                    continue;
                }
            };

            if self.handle_client(&mut stream) {
                break;
            }
        }

        if let Some(bridge) = self.bridge.lock().unwrap().take() {
            bridge.shutdown();
        }
        Ok(())
    }

    /// Returns `true` if the server should shut down after this client.
    fn handle_client(&self, stream: &mut TcpStream) -> bool {
        let mut buf = [0u8; 512];
        let n = match stream.read(&mut buf) {
            Ok(n) => n,
            Err(why) => {
                warn!("control plane read failed: {}", why);
                return false;
            }
        };
        let line = String::from_utf8_lossy(&buf[..n]);
        let mut words = line.split_whitespace();

        let response = match words.next() {
            Some("STATS") => self.ctx.stats.render(),
            Some("SHUTDOWN") => {
                let _ = stream.write_all(b"\n*** CRAWLER SHUTTING DOWN ***\n");
                return true;
            }
            Some("SEARCH") => self.search(words.collect()),
            Some("MAXCOUNT") => {
                let word = words.next().unwrap_or("").to_owned();
                self.dispatch(|b| b.maxcount(&word))
            }
            Some("MINCOUNT") => {
                let word = words.next().unwrap_or("").to_owned();
                self.dispatch(|b| b.mincount(&word))
            }
            Some("WC") => self.dispatch(|b| b.wc()),
            _ => "INVALID COMMAND\n".to_owned(),
        };

        let _ = stream.write_all(response.as_bytes());
        false
    }

    fn search(&self, keywords: Vec<&str>) -> String {
        if !self.ctx.frontier.is_stopped() {
            return "\nCRAWLING IN PROGRESS\n".to_owned();
        }

        let keywords: Vec<String> = keywords.into_iter().take(MAX_KEYWORDS).map(str::to_owned).collect();
        self.dispatch(|bridge| bridge.search(&keywords, SEARCH_DEADLINE_SECS))
    }

    fn dispatch<F: FnOnce(&Bridge) -> Vec<String>>(&self, f: F) -> String {
        match self.bridge_handle() {
            Some(bridge) => format!("{}\n", f(&bridge).join("\n")),
            None => "\nJOB EXECUTOR NOT READY YET\n".to_owned(),
        }
    }

    fn bridge_handle(&self) -> Option<Arc<Bridge>> {
        if !self.ctx.frontier.is_stopped() {
            return None;
        }

        let mut guard = self.bridge.lock().unwrap();
        if guard.is_none() {
            match Bridge::spawn(&self.docfile_path, self.num_index_workers) {
                Ok(bridge) => {
                    info!("indexer bridge started over {}", self.docfile_path.display());
                    *guard = Some(Arc::new(bridge));
                }
                Err(why) => {
                    warn!("failed to start indexer bridge: {}", why);
                    return None;
                }
            }
        }
        guard.clone()
    }
}
