//! The URL frontier shared by a crawl worker pool.
//!
//! A single `Mutex<FrontierState>` guards both the pending-URL queue and
//! the visited set, with the queue's `Condvar` doubling as the wake-up
//! signal for both "a URL arrived" and "everyone is done". Locking this
//! one mutex is the only synchronization a worker needs; there is no
//! separate lock for the visited set, so there is no ordering to get
//! wrong.

use std::collections::{HashSet, VecDeque};
use std::sync::{Condvar, Mutex};

struct FrontierState {
    queue: VecDeque<String>,
    visited: HashSet<String>,
    in_progress: usize,
    stopped: bool,
}

/// What a worker should do after calling [`Frontier::pop`].
#[derive(Debug, PartialEq, Eq)]
pub enum Pop {
    /// Fetch this URL, then report back with [`Frontier::finish`] or
    /// [`Frontier::fail`].
    Url(String),
    /// The crawl is over; every worker sees this exactly once and should
    /// exit.
    Stop,
}

pub struct Frontier {
    state: Mutex<FrontierState>,
    cond: Condvar,
}

impl Frontier {
    /// Builds a frontier seeded with a single starting URL.
    pub fn new(seed: String) -> Self {
        let mut visited = HashSet::new();
        visited.insert(seed.clone());
        let mut queue = VecDeque::new();
        queue.push_back(seed);

        Frontier {
            state: Mutex::new(FrontierState { queue, visited, in_progress: 0, stopped: false }),
            cond: Condvar::new(),
        }
    }

    /// Blocks until a URL is available or the crawl has ended. Marks the
    /// returned URL as in-progress so termination detection can see it.
    pub fn pop(&self) -> Pop {
        let mut guard = self.state.lock().unwrap();
        loop {
            if guard.stopped {
                return Pop::Stop;
            }
            if let Some(url) = guard.queue.pop_front() {
                guard.in_progress += 1;
                return Pop::Url(url);
            }
            guard = self.cond.wait(guard).unwrap();
        }
    }

    /// Reports that a fetch succeeded, enqueueing any newly-discovered
    /// links that pass the visited-set check. If nothing new was found
    /// and no other worker is in flight, this is the last finisher: the
    /// crawl is marked stopped and every waiting worker is woken so it
    /// can observe [`Pop::Stop`].
    pub fn finish<I: IntoIterator<Item = String>>(&self, discovered: I) {
        let mut guard = self.state.lock().unwrap();
        guard.in_progress -= 1;

        let mut added = false;
        for link in discovered {
            if guard.visited.insert(link.clone()) {
                guard.queue.push_back(link);
                added = true;
            }
        }

        if added {
            self.cond.notify_all();
        } else {
            self.maybe_terminate(&mut guard);
        }
    }

    /// Reports that a fetch failed outright (connection error, malformed
    /// response, ...). Equivalent to `finish` with no discovered links.
    pub fn fail(&self) {
        let mut guard = self.state.lock().unwrap();
        guard.in_progress -= 1;
        self.maybe_terminate(&mut guard);
    }

    fn maybe_terminate(&self, guard: &mut FrontierState) {
        if guard.in_progress == 0 && guard.queue.is_empty() {
            guard.stopped = true;
            self.cond.notify_all();
        }
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.state.lock().unwrap().visited.contains(url)
    }

    /// True once every worker has observed [`Pop::Stop`] (or is about to).
    pub fn is_stopped(&self) -> bool {
        self.state.lock().unwrap().stopped
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    pub fn visited_count(&self) -> usize {
        self.state.lock().unwrap().visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn single_worker_drains_then_stops() {
        let frontier = Frontier::new("http://seed/".into());
        match frontier.pop() {
            Pop::Url(u) => assert_eq!(u, "http://seed/"),
            Pop::Stop => panic!("expected a URL"),
        }
        frontier.finish(vec!["http://seed/a".into()]);

        match frontier.pop() {
            Pop::Url(u) => assert_eq!(u, "http://seed/a"),
            Pop::Stop => panic!("expected a URL"),
        }
        frontier.finish(Vec::new());

        assert_eq!(frontier.pop(), Pop::Stop);
    }

    #[test]
    fn duplicate_links_are_not_requeued() {
        let frontier = Frontier::new("http://seed/".into());
        frontier.pop();
        frontier.finish(vec!["http://seed/".into(), "http://seed/a".into()]);
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn last_finisher_wakes_every_blocked_worker() {
        let frontier = Arc::new(Frontier::new("http://seed/".into()));
        let mut handles = Vec::new();
        for _ in 0..3 {
            let frontier = Arc::clone(&frontier);
            handles.push(thread::spawn(move || frontier.pop()));
        }

        // Give the spawned threads a chance to block on the empty queue
        // before the only real URL is drained and finished with nothing.
        thread::sleep(std::time::Duration::from_millis(20));
        match frontier.pop() {
            Pop::Url(_) => frontier.finish(Vec::new()),
            Pop::Stop => panic!("seed should still be present"),
        }

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Pop::Stop);
        }
    }
}
