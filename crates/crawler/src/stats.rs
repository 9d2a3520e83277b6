use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters read by the `STATS` control-plane command.
pub struct Stats {
    started_at: Instant,
    pages_downloaded: AtomicU64,
    bytes_downloaded: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Stats { started_at: Instant::now(), pages_downloaded: AtomicU64::new(0), bytes_downloaded: AtomicU64::new(0) }
    }

    pub fn record_page(&self, bytes: usize) {
        self.pages_downloaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Renders the `STATS` command response:
    /// `Crawler up for HH:MM:SS.mmm, downloaded P pages, B bytes\n`.
    pub fn render(&self) -> String {
        let elapsed = self.started_at.elapsed();
        let total_ms = elapsed.as_millis();
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let seconds = (total_ms % 60_000) / 1_000;
        let millis = total_ms % 1_000;

        format!(
            "Crawler up for {:02}:{:02}:{:02}.{:03}, downloaded {} pages, {} bytes\n",
            hours,
            minutes,
            seconds,
            millis,
            self.pages_downloaded.load(Ordering::Relaxed),
            self.bytes_downloaded.load(Ordering::Relaxed),
        )
    }
}
