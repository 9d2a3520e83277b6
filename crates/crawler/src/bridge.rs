//! Hands the crawl off to the indexer once crawling is done.
//!
//! Grounded in the teacher's `Command` wrapper (`command.rs`): spawn a
//! child with piped stdio and stream its stdout on a background thread.
//! The crawler's needs are interactive rather than one-shot, so the
//! stdout-streaming thread here feeds a channel the caller drains,
//! instead of just logging each line.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{info, warn};

use crate::error::CrawlerError;

/// A running `jobExecutor`, reachable over its stdin/stdout.
pub struct Bridge {
    child: Mutex<Child>,
    stdin: Mutex<std::process::ChildStdin>,
    stdout_lines: Receiver<String>,
}

impl Bridge {
    /// Forks and execs `jobExecutor -d <docfile> -w <num_workers>`.
    pub fn spawn(docfile: &Path, num_workers: usize) -> Result<Bridge, CrawlerError> {
        let mut child = Command::new("jobExecutor")
            .arg("-d")
            .arg(docfile)
            .arg("-w")
            .arg(num_workers.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(CrawlerError::Bridge)?;

        let stdin = child.stdin.take().expect("child stdin was piped");
        let stdout = child.stdout.take().expect("child stdout was piped");
        let stderr = child.stderr.take().expect("child stderr was piped");

        let (tx, rx) = crossbeam_channel::unbounded();
        thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(line.trim_end().to_owned()).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        thread::spawn(move || {
            let mut reader = BufReader::new(stderr);
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => warn!("jobExecutor: {}", line.trim_end()),
                }
            }
        });

        info!("started jobExecutor (pid {})", child.id());

        Ok(Bridge { child: Mutex::new(child), stdin: Mutex::new(stdin), stdout_lines: rx })
    }

    /// Forwards a `/search` command and collects the result lines
    /// `jobExecutor` streams back, giving up once `deadline_secs` plus a
    /// small grace period has elapsed with no further output.
    pub fn search(&self, keywords: &[String], deadline_secs: u32) -> Vec<String> {
        self.send_line(&format!("/search {} -d {}", keywords.join(" "), deadline_secs));
        self.drain_for(Duration::from_secs(u64::from(deadline_secs) + 2))
    }

    pub fn maxcount(&self, word: &str) -> Vec<String> {
        self.send_line(&format!("/maxcount {}", word));
        self.drain_for(Duration::from_secs(5))
    }

    pub fn mincount(&self, word: &str) -> Vec<String> {
        self.send_line(&format!("/mincount {}", word));
        self.drain_for(Duration::from_secs(5))
    }

    pub fn wc(&self) -> Vec<String> {
        self.send_line("/wc");
        self.drain_for(Duration::from_secs(5))
    }

    pub fn shutdown(&self) {
        self.send_line("/exit");
        if let Ok(mut child) = self.child.lock() {
            let _ = child.wait();
        }
    }

    fn send_line(&self, line: &str) {
        let mut stdin = self.stdin.lock().unwrap();
        let _ = writeln!(stdin, "{}", line);
        let _ = stdin.flush();
    }

    fn drain_for(&self, budget: Duration) -> Vec<String> {
        let deadline = Instant::now() + budget;
        let mut lines = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let poll = remaining.min(Duration::from_millis(300));
            match self.stdout_lines.recv_timeout(poll) {
                Ok(line) => lines.push(line),
                Err(RecvTimeoutError::Timeout) => {
                    if !lines.is_empty() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        lines
    }
}
