//! The bounded queue of accepted-but-not-yet-served requests, handed off
//! from the accept loop to the worker pool. Grounded in `req_queue.c`'s
//! fixed-capacity (32) producer/consumer queue; `crossbeam_channel`'s
//! bounded channel is exactly that structure; we don't need to hand-roll
//! the linked list the original used.

use std::net::TcpStream;

use crossbeam_channel::{Receiver, Sender};

pub const CAPACITY: usize = 32;

pub struct Job {
    pub path: String,
    pub client: TcpStream,
}

pub fn channel() -> (Sender<Job>, Receiver<Job>) {
    crossbeam_channel::bounded(CAPACITY)
}
