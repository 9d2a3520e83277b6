//! The indexer coordinator: forks one worker process per docfile shard,
//! hands each its slice of directories over a FIFO pair, and then serves
//! `/search`, `/maxcount`, `/mincount`, `/wc` and `/exit` commands read
//! from stdin by broadcasting to the workers and aggregating their
//! replies. Grounded in `JE/worker.c` and `JE/coordinator.c`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use framing::{FramedReader, FramedWriter, RecvOutcome};
use indextrie::Extreme;
use nix::sys::select::{select, FdSet};
use nix::sys::signal::{kill, Signal};
use nix::sys::time::{TimeVal, TimeValLike};
use nix::unistd::{fork, mkfifo, ForkResult, Pid};

use crate::error::IndexerError;
use crate::signals::{self, CHILD_EXITED, SEARCH_DEADLINE, SHOULD_EXIT};

const GRACE_PERIOD: Duration = Duration::from_millis(500);

struct Worker {
    pid: Pid,
    reader: FramedReader<File>,
    writer: FramedWriter<File>,
    shard: Vec<String>,
    restart_time: Instant,
}

pub struct Coordinator {
    workers: Vec<Worker>,
    fifo_dir: PathBuf,
    log_dir: PathBuf,
}

/// Splits `directories` into `num_workers` roughly equal shards; the last
/// shard absorbs whatever remainder doesn't divide evenly.
fn split_directories(directories: &[String], num_workers: usize) -> Vec<Vec<String>> {
    let chunk = directories.len() / num_workers;
    let mut shards = Vec::with_capacity(num_workers);
    let mut start = 0;
    for i in 0..num_workers {
        let end = if i == num_workers - 1 { directories.len() } else { start + chunk };
        shards.push(directories[start..end].to_vec());
        start = end;
    }
    shards
}

fn fifo_paths(fifo_dir: &Path, index: usize) -> (PathBuf, PathBuf) {
    (fifo_dir.join(format!("to_worker_{}", index)), fifo_dir.join(format!("from_worker_{}", index)))
}

impl Coordinator {
    /// Forks `num_workers` worker processes, each indexing its own shard
    /// of `directories`. The fifo open order is the mirror image of the
    /// worker's: write end first, then read end, so neither side can
    /// block forever waiting on the other.
    pub fn spawn(directories: Vec<String>, num_workers: usize, fifo_dir: PathBuf, log_dir: PathBuf) -> Result<Self, IndexerError> {
        fs::create_dir_all(&fifo_dir)?;
        fs::create_dir_all(&log_dir)?;

        let shards = split_directories(&directories, num_workers);
        let mut workers = Vec::with_capacity(num_workers);

        for (i, shard) in shards.into_iter().enumerate() {
            let (to_worker, from_worker) = fifo_paths(&fifo_dir, i);
            make_fifo(&to_worker)?;
            make_fifo(&from_worker)?;

            match unsafe { fork() }.map_err(IndexerError::Fork)? {
                ForkResult::Child => {
                    let result = crate::worker::run(&to_worker, &from_worker, &log_dir);
                    std::process::exit(if result.is_ok() { 0 } else { 1 });
                }
                ForkResult::Parent { child } => {
                    let writer_file = OpenOptions::new().write(true).open(&to_worker)?;
                    let reader_file = File::open(&from_worker)?;

                    let mut writer = FramedWriter::new(writer_file);
                    writer.send_records(&shard.iter().map(String::as_str).collect::<Vec<_>>(), true)?;

                    workers.push(Worker {
                        pid: child,
                        reader: FramedReader::new(reader_file),
                        writer,
                        shard,
                        restart_time: Instant::now(),
                    });
                }
            }
        }

        Ok(Coordinator { workers, fifo_dir, log_dir })
    }

    /// Restarts the worker at `index` after its process died unexpectedly:
    /// rebuilds its FIFOs and forks a fresh process over the same shard.
    fn restart_worker(&mut self, index: usize) -> Result<(), IndexerError> {
        let shard = self.workers[index].shard.clone();
        let (to_worker, from_worker) = fifo_paths(&self.fifo_dir, index);

        let _ = fs::remove_file(&to_worker);
        let _ = fs::remove_file(&from_worker);
        make_fifo(&to_worker)?;
        make_fifo(&from_worker)?;

        match unsafe { fork() }.map_err(IndexerError::Fork)? {
            ForkResult::Child => {
                let result = crate::worker::run(&to_worker, &from_worker, &self.log_dir);
                std::process::exit(if result.is_ok() { 0 } else { 1 });
            }
            ForkResult::Parent { child } => {
                let writer_file = OpenOptions::new().write(true).open(&to_worker)?;
                let reader_file = File::open(&from_worker)?;
                let mut writer = FramedWriter::new(writer_file);
                writer.send_records(&shard.iter().map(String::as_str).collect::<Vec<_>>(), true)?;

                self.workers[index] = Worker {
                    pid: child,
                    reader: FramedReader::new(reader_file),
                    writer,
                    shard,
                    restart_time: Instant::now(),
                };
            }
        }
        Ok(())
    }

    /// Reaps any children SIGCHLD told us about and restarts them. Kept
    /// out of the signal handler itself: forking inside a handler is not
    /// async-signal-safe, so the handler only flips `CHILD_EXITED` and
    /// this runs from ordinary control flow instead.
    ///
    /// A freshly-restarted worker was never sent the in-flight command, so
    /// its index is dropped from `pending` immediately instead of being
    /// left to time out the whole aggregation deadline.
    fn reap_and_restart(&mut self, pending: &mut Vec<usize>) -> Result<(), IndexerError> {
        use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};

        loop {
            match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(pid, _)) | Ok(WaitStatus::Signaled(pid, _, _)) => {
                    if let Some(index) = self.workers.iter().position(|w| w.pid == pid) {
                        log::warn!("[!] Ignoring results from terminated worker {}", pid);
                        self.restart_worker(index)?;
                        pending.retain(|&i| i != index);
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Broadcasts a command to every worker and aggregates their replies,
    /// bailing out unconditionally once `deadline` elapses: a search whose
    /// deadline has passed reports whatever came back in time, it does not
    /// keep the aggregation loop alive hoping for stragglers.
    fn aggregate(&mut self, deadline: Duration) -> Vec<String> {
        let started = Instant::now();
        let mut pending: Vec<usize> = (0..self.workers.len()).collect();
        let mut results = Vec::new();

        unsafe { libc::alarm(deadline.as_secs().max(1) as libc::c_uint) };

        while !pending.is_empty() {
            if signals::take(&SEARCH_DEADLINE) {
                for &index in &pending {
                    kill(self.workers[index].pid, Signal::SIGUSR2).ok();
                }
                self.drain_grace_period(&mut pending, &mut results);
                break;
            }
            if signals::take(&CHILD_EXITED) {
                let _ = self.reap_and_restart(&mut pending);
            }
            if signals::take(&SHOULD_EXIT) {
                break;
            }
            if started.elapsed() >= deadline {
                break;
            }

            let mut set = FdSet::new();
            for &index in &pending {
                set.insert(self.workers[index].reader.get_ref().as_raw_fd());
            }

            let mut timeout = TimeVal::milliseconds(200);
            match select(None, Some(&mut set), None, None, Some(&mut timeout)) {
                Ok(_) => {
                    let mut finished = Vec::new();
                    for (pos, &index) in pending.iter().enumerate() {
                        if set.contains(self.workers[index].reader.get_ref().as_raw_fd()) {
                            if let Ok(RecvOutcome::Records(records)) = self.workers[index].reader.recv() {
                                results.extend(records);
                            }
                            finished.push(pos);
                        }
                    }
                    for &pos in finished.iter().rev() {
                        pending.remove(pos);
                    }
                }
                Err(_) => continue,
            }
        }

        unsafe { libc::alarm(0) };
        results
    }

    fn drain_grace_period(&mut self, pending: &mut Vec<usize>, results: &mut Vec<String>) {
        let started = Instant::now();
        while !pending.is_empty() && started.elapsed() < GRACE_PERIOD {
            let mut set = FdSet::new();
            for &index in pending.iter() {
                set.insert(self.workers[index].reader.get_ref().as_raw_fd());
            }
            let mut timeout = TimeVal::milliseconds(100);
            if select(None, Some(&mut set), None, None, Some(&mut timeout)).is_ok() {
                let mut finished = Vec::new();
                for (pos, &index) in pending.iter().enumerate() {
                    if set.contains(self.workers[index].reader.get_ref().as_raw_fd()) {
                        if let Ok(RecvOutcome::Records(records)) = self.workers[index].reader.recv() {
                            results.extend(records);
                        }
                        finished.push(pos);
                    }
                }
                for &pos in finished.iter().rev() {
                    pending.remove(pos);
                }
            }
        }
    }

    pub fn search(&mut self, keywords: &[String], deadline_secs: u64) -> Vec<String> {
        let first = keywords.first().map(String::as_str).unwrap_or("");
        let rest = if keywords.is_empty() { &[] } else { &keywords[1..] };
        let command = format!("CMD:SEARCH{}", first);
        let _ = self.broadcast_raw(&command, rest);
        self.aggregate(Duration::from_secs(deadline_secs))
    }

    fn broadcast_raw(&mut self, command: &str, args: &[String]) -> Result<(), IndexerError> {
        for worker in &mut self.workers {
            worker.writer.send_raw(command.as_bytes(), false)?;
            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            worker.writer.send_records(&arg_refs, true)?;
            kill(worker.pid, Signal::SIGUSR1).ok();
        }
        Ok(())
    }

    pub fn maxcount(&mut self, word: &str) -> Vec<String> {
        let command = format!("CMD:MAXCOUNT{}", word);
        let _ = self.broadcast_raw(&command, &[]);
        let lines = self.aggregate(Duration::from_secs(5));
        vec![combine_max_min(&lines, Extreme::Max)]
    }

    pub fn mincount(&mut self, word: &str) -> Vec<String> {
        let command = format!("CMD:MINCOUNT{}", word);
        let _ = self.broadcast_raw(&command, &[]);
        let lines = self.aggregate(Duration::from_secs(5));
        vec![combine_max_min(&lines, Extreme::Min)]
    }

    pub fn wc(&mut self) -> Vec<String> {
        let _ = self.broadcast_raw("CMD:WC", &[]);
        let lines = self.aggregate(Duration::from_secs(5));
        vec![combine_wc(&lines)]
    }

    pub fn shutdown(mut self) {
        for worker in &mut self.workers {
            kill(worker.pid, Signal::SIGTERM).ok();
        }
        for worker in &self.workers {
            let _ = nix::sys::wait::waitpid(worker.pid, None);
        }
    }
}

/// Combines each worker's own `"<path> <count>"` (or `"NOT_FOUND 0"`) line
/// into one global answer, with an explicit lexicographic tie-break — the
/// order replies arrive in via `select()` is not deterministic and must
/// not be mistaken for one.
fn combine_max_min(lines: &[String], extreme: Extreme) -> String {
    let mut best: Option<(&str, usize)> = None;

    for line in lines {
        let mut parts = line.split_whitespace();
        let path = match parts.next() {
            Some(path) if path != "NOT_FOUND" => path,
            _ => continue,
        };
        let count: usize = match parts.next().and_then(|c| c.parse().ok()) {
            Some(count) => count,
            None => continue,
        };

        let improves = match (extreme, best) {
            (_, None) => true,
            (Extreme::Max, Some((best_path, best_count))) => {
                count > best_count || (count == best_count && path < best_path)
            }
            (Extreme::Min, Some((best_path, best_count))) => {
                count < best_count || (count == best_count && path < best_path)
            }
        };
        if improves {
            best = Some((path, count));
        }
    }

    match best {
        Some((path, count)) => format!("{} {}", path, count),
        None => "NOT_FOUND 0".to_owned(),
    }
}

/// Sums the `<bytes> <words> <lines>` triple from each worker into one
/// combined total.
fn combine_wc(lines: &[String]) -> String {
    let (mut bytes, mut words, mut total_lines) = (0usize, 0usize, 0usize);
    for line in lines {
        let mut parts = line.split_whitespace();
        let b: usize = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let w: usize = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let l: usize = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        bytes += b;
        words += w;
        total_lines += l;
    }
    format!("{} {} {}", bytes, words, total_lines)
}

fn make_fifo(path: &Path) -> Result<(), IndexerError> {
    mkfifo(path, nix::sys::stat::Mode::S_IRUSR | nix::sys::stat::Mode::S_IWUSR)
        .map_err(|why| IndexerError::Mkfifo { path: path.to_path_buf(), why })
}

/// Reads `/search keyword... -d deadline`, `/maxcount`, `/mincount`,
/// `/wc`, and `/exit` commands from stdin until EOF or `/exit`.
pub fn run_command_loop(mut coordinator: Coordinator) -> Result<(), IndexerError> {
    signals::install_coordinator_handlers().map_err(|_| IndexerError::InvalidArgs("sigaction failed".into()))?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if signals::take(&SHOULD_EXIT) {
            break;
        }

        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("/search") => {
                let mut keywords = Vec::new();
                let mut deadline = 5u64;
                let rest: Vec<&str> = parts.collect();
                let mut i = 0;
                while i < rest.len() {
                    if rest[i] == "-d" {
                        if let Some(value) = rest.get(i + 1).and_then(|s| s.parse().ok()) {
                            deadline = value;
                        }
                        i += 2;
                    } else {
                        keywords.push(rest[i].to_owned());
                        i += 1;
                    }
                }
                let results = coordinator.search(&keywords, deadline);
                print_results(&results);
            }
            Some("/maxcount") => {
                let word = parts.next().unwrap_or("").to_owned();
                print_results(&coordinator.maxcount(&word));
            }
            Some("/mincount") => {
                let word = parts.next().unwrap_or("").to_owned();
                print_results(&coordinator.mincount(&word));
            }
            Some("/wc") => print_results(&coordinator.wc()),
            Some("/exit") => break,
            _ => println!("INVALID COMMAND"),
        }
    }

    coordinator.shutdown();
    Ok(())
}

fn print_results(results: &[String]) {
    for line in results {
        println!("{}", line);
    }
    println!();
}
