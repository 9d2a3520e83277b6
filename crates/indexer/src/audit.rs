//! Per-worker audit log: one timestamped line per command served, written
//! to `<log_dir>/Worker_<pid>`. Grounded in `JE/worker.c`'s `writeLog`.
//! Colons inside keywords are escaped so they can't be mistaken for the
//! log's own field separator.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct AuditLog {
    file: std::fs::File,
}

impl AuditLog {
    pub fn create(log_dir: &Path, pid: u32) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let path = log_dir.join(format!("Worker_{}", pid));
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(AuditLog { file })
    }

    pub fn log_search(&mut self, keywords: &[String]) -> io::Result<()> {
        let escaped: Vec<String> = keywords.iter().map(|k| escape_colons(k)).collect();
        self.entry("SEARCH", &escaped.join(" "))
    }

    pub fn log_maxmin(&mut self, kind: &str, word: &str, result: &str) -> io::Result<()> {
        self.entry(kind, &format!("{} {}", escape_colons(word), result))
    }

    pub fn log_wc(&mut self) -> io::Result<()> {
        self.entry("WC", "")
    }

    fn entry(&mut self, action: &str, detail: &str) -> io::Result<()> {
        writeln!(self.file, "{}: {} {}", timestamp(), action, detail)?;
        self.file.flush()
    }
}

fn escape_colons(s: &str) -> String {
    s.replace(':', " C ")
}

fn timestamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
