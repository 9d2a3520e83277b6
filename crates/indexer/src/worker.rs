//! The indexer worker process: builds an in-memory index over its shard
//! of directories, then answers SEARCH/MAXCOUNT/MINCOUNT/WC commands sent
//! by the coordinator over a pair of FIFOs. Grounded in `JE/worker.c`.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use framing::{FramedReader, FramedWriter, RecvOutcome};
use indextrie::{Extreme, Trie};
use nix::unistd::{getppid, pause};

use crate::audit::AuditLog;
use crate::error::IndexerError;
use crate::signals::{self, CMD_READY, PARENT_CHECK_DUE, SEARCH_ABORTED, SHOULD_EXIT};
use crate::textfile::{self, FileIndex};

const CMD_SEARCH: &str = "CMD:SEARCH";
const CMD_MAXCOUNT: &str = "CMD:MAXCOUNT";
const CMD_MINCOUNT: &str = "CMD:MINCOUNT";
const CMD_WC: &str = "CMD:WC";

const FIELD_SEP: char = '\u{4}';

pub struct WorkerState {
    trie: Trie,
    files: Vec<FileIndex>,
}

/// Walks each directory non-recursively (the original never descends into
/// subdirectories either) and indexes every regular file found.
pub fn build_index(directories: &[String]) -> Result<WorkerState, IndexerError> {
    let mut trie = Trie::new();
    let mut files = Vec::new();

    for dir in directories {
        let entries = fs::read_dir(dir)?;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() {
                let index = textfile::read_textfile(&path, &mut trie)?;
                files.push(index);
            }
        }
    }

    Ok(WorkerState { trie, files })
}

enum Command {
    Search(Vec<String>),
    MaxCount(String),
    MinCount(String),
    Wc,
}

fn parse_command(records: &[String]) -> Option<Command> {
    if records.is_empty() {
        return None;
    }
    if let Some(rest) = records[0].strip_prefix(CMD_SEARCH) {
        let mut keywords = Vec::new();
        if !rest.is_empty() {
            keywords.push(rest.to_owned());
        }
        keywords.extend(records[1..].iter().cloned());
        return Some(Command::Search(keywords));
    }
    if let Some(word) = records[0].strip_prefix(CMD_MAXCOUNT) {
        return Some(Command::MaxCount(word.to_owned()));
    }
    if let Some(word) = records[0].strip_prefix(CMD_MINCOUNT) {
        return Some(Command::MinCount(word.to_owned()));
    }
    if records[0].strip_prefix(CMD_WC).is_some() {
        return Some(Command::Wc);
    }
    None
}

impl WorkerState {
    fn line_text(&self, filename: &str, line_no: usize) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.path == filename)
            .and_then(|f| f.lines.get(line_no))
            .map(String::as_str)
    }

    fn search(&self, keywords: &[String]) -> Vec<String> {
        let words: Vec<&str> = keywords.iter().map(String::as_str).collect();
        let merged = Trie::merge(&words, &self.trie);

        let mut results = Vec::new();
        for posting in &merged {
            for &line in &posting.lines {
                let text = self.line_text(&posting.filename, line).unwrap_or("");
                // line numbers are 0-based while indexing, 1-based when reported
                results.push(format!("{}{}{}{}{}", posting.filename, FIELD_SEP, line + 1, FIELD_SEP, text));
            }
        }
        results
    }

    fn max_min(&self, word: &str, extreme: Extreme) -> String {
        match self.trie.max_min_count(word, extreme) {
            Some((filename, count)) => format!("{} {}", filename, count),
            None => "NOT_FOUND 0".to_owned(),
        }
    }

    fn word_count(&self) -> String {
        let bytes: usize = self.files.iter().map(|f| f.bytes).sum();
        let words: usize = self.files.iter().map(|f| f.words).sum();
        let lines: usize = self.files.iter().map(|f| f.lines.len()).sum();
        format!("{} {} {}", bytes, words, lines)
    }
}

/// Opens its end of both FIFOs (read end first, then write end — the
/// coordinator does the opposite to avoid the classic open-order
/// deadlock), builds its index, then serves commands until told to stop.
pub fn run(read_fifo: &Path, write_fifo: &Path, log_dir: &Path) -> Result<(), IndexerError> {
    signals::install_worker_handlers().map_err(|_| IndexerError::InvalidArgs("sigaction failed".into()))?;

    let read_end = File::open(read_fifo)?;
    let write_end = OpenOptions::new().write(true).open(write_fifo)?;

    let mut reader = FramedReader::new(read_end);
    let mut writer = FramedWriter::new(write_end);

    let directories = match reader.recv()? {
        RecvOutcome::Records(records) => records,
        RecvOutcome::PeerClosed => return Ok(()),
    };

    let state = build_index(&directories)?;
    let mut audit = AuditLog::create(log_dir, std::process::id())?;

    let parent_at_start = getppid();
    unsafe { libc::alarm(signals::PARENT_CHECK_SECS as libc::c_uint) };

    loop {
        pause();

        if signals::take(&SHOULD_EXIT) {
            break;
        }

        if signals::take(&PARENT_CHECK_DUE) {
            if getppid() != parent_at_start {
                break;
            }
            unsafe { libc::alarm(signals::PARENT_CHECK_SECS as libc::c_uint) };
        }

        if signals::take(&SEARCH_ABORTED) {
            writer.send_records(&[], true)?;
        }

        if signals::take(&CMD_READY) {
            let records = match reader.recv()? {
                RecvOutcome::Records(records) => records,
                RecvOutcome::PeerClosed => break,
            };

            match parse_command(&records) {
                Some(Command::Search(keywords)) => {
                    let results = state.search(&keywords);
                    let refs: Vec<&str> = results.iter().map(String::as_str).collect();
                    writer.send_records(&refs, true)?;
                    audit.log_search(&keywords)?;
                }
                Some(Command::MaxCount(word)) => {
                    let response = state.max_min(&word, Extreme::Max);
                    writer.send_records(&[&response], true)?;
                    audit.log_maxmin("MAXCOUNT", &word, &response)?;
                }
                Some(Command::MinCount(word)) => {
                    let response = state.max_min(&word, Extreme::Min);
                    writer.send_records(&[&response], true)?;
                    audit.log_maxmin("MINCOUNT", &word, &response)?;
                }
                Some(Command::Wc) => {
                    writer.send_records(&[&state.word_count()], true)?;
                    audit.log_wc()?;
                }
                None => {
                    writer.send_records(&[], true)?;
                }
            }
        }
    }

    Ok(())
}
