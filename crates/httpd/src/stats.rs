use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub struct Stats {
    started_at: Instant,
    pages_served: AtomicU64,
    bytes_served: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Stats { started_at: Instant::now(), pages_served: AtomicU64::new(0), bytes_served: AtomicU64::new(0) }
    }

    pub fn record(&self, bytes: usize) {
        self.pages_served.fetch_add(1, Ordering::Relaxed);
        self.bytes_served.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn render(&self) -> String {
        let elapsed = self.started_at.elapsed();
        let total_ms = elapsed.as_millis();
        format!(
            "Server up for {:02}:{:02}:{:02}.{:03}, served {} pages, {} bytes\n",
            total_ms / 3_600_000,
            (total_ms % 3_600_000) / 60_000,
            (total_ms % 60_000) / 1_000,
            total_ms % 1_000,
            self.pages_served.load(Ordering::Relaxed),
            self.bytes_served.load(Ordering::Relaxed),
        )
    }
}
